//! Chou-Orlandi "simplest OT" over Ristretto, cf. <https://eprint.iacr.org/2015/267>.
//!
//! The sender publishes `S = y·G`. For choice `c` the receiver sends
//! `R = c·S + x·G` and derives its key from `x·S`; the sender derives the two
//! candidate keys from `y·R` and `y·R - y·S`.

use crypto_core::{AbstractChannel, Block};
use curve25519_dalek::constants::RISTRETTO_BASEPOINT_TABLE;
use curve25519_dalek::ristretto::{RistrettoBasepointTable, RistrettoPoint};
use curve25519_dalek::scalar::Scalar;
use curve25519_dalek::traits::Identity;
use rand::{CryptoRng, Rng};
use sha2::{Digest, Sha256};

use super::errors::{OTReceiverError, OTSenderError};
use super::{hash_to_block, OtReceiver, OtSender};

fn transcript(s: &RistrettoPoint) -> Sha256 {
    let mut hasher = Sha256::new();
    hasher.update(s.compress().as_bytes());
    hasher
}

#[derive(Copy, Clone, Debug, Default)]
pub struct COSender;

impl OtSender for COSender {
    fn send<C: AbstractChannel, R: CryptoRng + Rng>(
        &mut self,
        channel: &mut C,
        pairs: &[[Block; 2]],
        rng: &mut R,
    ) -> Result<(), OTSenderError> {
        let y = Scalar::random(rng);
        let s = &y * &RISTRETTO_BASEPOINT_TABLE;
        channel.write_point(&s)?;
        channel.flush()?;

        let hasher = transcript(&s);
        let t = y * s;

        let mut keys = Vec::with_capacity(pairs.len());
        for i in 0..pairs.len() {
            let r = channel.read_point()?;
            let yr = y * r;
            keys.push([
                hash_to_block(hasher.clone(), i, &r, &yr),
                hash_to_block(hasher.clone(), i, &r, &(yr - t)),
            ]);
        }

        for ([zero, one], [k0, k1]) in pairs.iter().zip(keys) {
            channel.write_block(&(*zero ^ k0))?;
            channel.write_block(&(*one ^ k1))?;
        }
        channel.flush()?;
        Ok(())
    }
}

#[derive(Copy, Clone, Debug, Default)]
pub struct COReceiver;

impl OtReceiver for COReceiver {
    fn receive<C: AbstractChannel, R: CryptoRng + Rng>(
        &mut self,
        channel: &mut C,
        choices: &[bool],
        rng: &mut R,
    ) -> Result<Vec<Block>, OTReceiverError> {
        let s = channel.read_point()?;
        let s_table = RistrettoBasepointTable::create(&s);
        let hasher = transcript(&s);

        let mut keys = Vec::with_capacity(choices.len());
        for (i, &choice) in choices.iter().enumerate() {
            let x = Scalar::random(rng);
            let cs = if choice { s } else { RistrettoPoint::identity() };
            let r = cs + &x * &RISTRETTO_BASEPOINT_TABLE;
            channel.write_point(&r)?;
            keys.push(hash_to_block(hasher.clone(), i, &r, &(&x * &s_table)));
        }
        channel.flush()?;

        choices
            .iter()
            .zip(keys)
            .map(|(&choice, k)| {
                let c0 = channel.read_block()?;
                let c1 = channel.read_block()?;
                Ok(k ^ if choice { c1 } else { c0 })
            })
            .collect()
    }
}
