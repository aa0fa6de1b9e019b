//! Hash-based commitments over SHA-256.
use sha2::{Digest, Sha256};

/// The struct of Commitment.
pub struct Commitment;

impl Commitment {
    /// Commit to `input` under randomness (or binding context) `r`.
    pub fn commit(input: &[u8], r: &[u8]) -> [u8; 32] {
        Self::commit_parts(&[input], r)
    }

    /// Commit to a sequence of byte strings. Each part is length-prefixed so
    /// that different splits of the same bytes commit differently.
    pub fn commit_parts(parts: &[&[u8]], r: &[u8]) -> [u8; 32] {
        let mut hasher = Sha256::new();
        for part in parts {
            hasher.update((part.len() as u64).to_le_bytes());
            hasher.update(part);
        }
        hasher.update(r);

        let mut res = [0u8; 32];
        res.copy_from_slice(&hasher.finalize());
        res
    }

    /// Open and check commitment.
    pub fn check(input: &[u8], r: &[u8], com: &[u8; 32]) -> bool {
        Self::commit(input, r) == *com
    }
}
