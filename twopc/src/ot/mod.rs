//! 1-out-of-2 oblivious transfer of wire labels. The garbler holds the
//! `[zero, one]` label pair of every evaluator-controlled wire; the
//! evaluator learns exactly the label its input bit selects.

pub mod co;
pub mod errors;

pub use co::*;
pub use errors::{OTReceiverError, OTSenderError};

use crypto_core::{AbstractChannel, Block};
use curve25519_dalek::ristretto::RistrettoPoint;
use rand::{CryptoRng, Rng};
use sha2::{Digest, Sha256};

pub trait OtSender {
    /// Transfer one label of each pair, chosen by the receiver.
    fn send<C: AbstractChannel, R: CryptoRng + Rng>(
        &mut self,
        channel: &mut C,
        pairs: &[[Block; 2]],
        rng: &mut R,
    ) -> Result<(), OTSenderError>;
}

pub trait OtReceiver {
    /// Receive the label selected by each choice bit.
    fn receive<C: AbstractChannel, R: CryptoRng + Rng>(
        &mut self,
        channel: &mut C,
        choices: &[bool],
        rng: &mut R,
    ) -> Result<Vec<Block>, OTReceiverError>;
}

/// Key for transfer `index`: `H(S, index, R, P)` truncated to a block.
pub(crate) fn hash_to_block(
    mut hasher: Sha256,
    index: usize,
    r: &RistrettoPoint,
    p: &RistrettoPoint,
) -> Block {
    hasher.update((index as u64).to_le_bytes());
    hasher.update(r.compress().as_bytes());
    hasher.update(p.compress().as_bytes());

    let mut res = [0u8; 16];
    res.copy_from_slice(&hasher.finalize()[..16]);
    Block::new(res)
}
