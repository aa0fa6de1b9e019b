//! Proof backends that turn a policy witness into a publicly verifiable
//! artifact.
//!
//! Both backends publish the same three signals: the policy output (`"1"`
//! when satisfied), a commitment to the chosen labels and a binding to the
//! receiver key the released shares will be encrypted to.

pub mod snarkjs;
pub mod transparent;

pub use snarkjs::{SnarkjsConfig, SnarkjsToolchain};
pub use transparent::TransparentProofSystem;

use crypto_core::{Block, Commitment};
use pvss::PublicKey;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use crate::error::ProofError;
use crate::msgs::LabelPair;

pub const SIGNAL_OUTPUT: usize = 0;
pub const SIGNAL_COMMITMENT: usize = 1;
pub const SIGNAL_RECEIVER: usize = 2;
pub const NUM_SIGNALS: usize = 3;

/// Opaque proof object, as produced by the backend.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Proof(pub serde_json::Value);

/// Opaque verification key.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct VerificationKey(pub serde_json::Value);

pub type PublicSignals = Vec<String>;

/// The requester's private inputs: one attribute bit per requester wire and
/// the label pair returned for that same wire.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct PolicyWitness {
    pub circuit_id: String,
    pub attributes: Vec<bool>,
    pub labels: Vec<LabelPair>,
    pub receiver: PublicKey,
}

impl PolicyWitness {
    /// The label selected by each attribute bit.
    pub fn chosen_keys(&self) -> Vec<Block> {
        self.attributes
            .iter()
            .zip(self.labels.iter())
            .map(|(&a, pair)| pair[a as usize].key)
            .collect()
    }
}

/// Single-use evidence submitted to the gatekeeper.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProofArtifact {
    pub circuit_id: String,
    pub proof: Proof,
    pub public_signals: PublicSignals,
    pub verification_key: VerificationKey,
    pub receiver: PublicKey,
}

impl ProofArtifact {
    /// SHA-256 over the canonical JSON encoding, used for replay tracking.
    pub fn digest(&self) -> Result<[u8; 32], ProofError> {
        let bytes = serde_json::to_vec(self)?;
        let mut out = [0u8; 32];
        out.copy_from_slice(&Sha256::digest(&bytes));
        Ok(out)
    }
}

pub trait ProofSystem {
    fn prove(&self, witness: &PolicyWitness) -> Result<(Proof, PublicSignals), ProofError>;

    /// `Ok(true)` only for a valid proof whose policy output signal is `"1"`.
    /// `Ok(false)` for anything else; `Err` only when the verifier itself
    /// could not run.
    fn verify(
        &self,
        proof: &Proof,
        public_signals: &PublicSignals,
        verification_key: &VerificationKey,
    ) -> Result<bool, ProofError>;

    fn verification_key(&self) -> Result<VerificationKey, ProofError>;
}

impl<P: ProofSystem + ?Sized> ProofSystem for Box<P> {
    fn prove(&self, witness: &PolicyWitness) -> Result<(Proof, PublicSignals), ProofError> {
        (**self).prove(witness)
    }

    fn verify(
        &self,
        proof: &Proof,
        public_signals: &PublicSignals,
        verification_key: &VerificationKey,
    ) -> Result<bool, ProofError> {
        (**self).verify(proof, public_signals, verification_key)
    }

    fn verification_key(&self) -> Result<VerificationKey, ProofError> {
        (**self).verification_key()
    }
}

/// Decimal rendering of the first 16 bytes of `SHA-256(receiver)`, small
/// enough to be a field element of any SNARK-friendly curve.
pub fn receiver_binding(receiver: &PublicKey) -> String {
    let digest = Sha256::digest(&receiver.to_bytes());
    let mut head = [0u8; 16];
    head.copy_from_slice(&digest[..16]);
    u128::from_be_bytes(head).to_string()
}

/// Hex commitment to the chosen labels, bound to the receiver key.
pub fn label_commitment(chosen: &[Block], receiver: &PublicKey) -> String {
    let parts: Vec<&[u8]> = chosen.iter().map(|b| b.as_ref()).collect();
    Commitment::commit_parts(&parts, &receiver.to_bytes())
        .iter()
        .map(|b| format!("{:02x}", b))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crypto_core::AesRng;
    use pvss::{Keypair, SharingParameters};

    #[test]
    fn receiver_binding_differs_per_key() {
        let mut rng = AesRng::new();
        let params = SharingParameters::generate(&mut rng);
        let a = Keypair::generate(&mut rng, &params, "a").public;
        let b = Keypair::generate(&mut rng, &params, "b").public;
        assert_eq!(receiver_binding(&a), receiver_binding(&a));
        assert_ne!(receiver_binding(&a), receiver_binding(&b));
        assert!(receiver_binding(&a).parse::<u128>().is_ok());

        let keys = [Block::from(1u128), Block::from(2u128)];
        assert_ne!(label_commitment(&keys, &a), label_commitment(&keys, &b));
        assert_eq!(label_commitment(&keys, &a).len(), 64);
    }
}
