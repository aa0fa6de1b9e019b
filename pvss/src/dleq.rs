//! Non-interactive proof that `log_{g1} h1 == log_{g2} h2` (Chaum-Pedersen
//! with a Fiat-Shamir challenge).

use curve25519_dalek::{ristretto::RistrettoPoint, scalar::Scalar};
use rand::{CryptoRng, Rng};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha512};

const DLEQ_DOMAIN: &[u8] = b"gated-release/pvss/dleq";

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct DleqProof {
    pub challenge: Scalar,
    pub response: Scalar,
}

fn challenge(points: [&RistrettoPoint; 6], context: &[u8]) -> Scalar {
    let mut hasher = Sha512::new();
    hasher.update(DLEQ_DOMAIN);
    hasher.update((context.len() as u64).to_le_bytes());
    hasher.update(context);
    for p in points.iter() {
        hasher.update(p.compress().as_bytes());
    }
    Scalar::from_hash(hasher)
}

impl DleqProof {
    /// Prove knowledge of `x` with `h1 = x·g1` and `h2 = x·g2`.
    pub fn prove<R: Rng + CryptoRng>(
        rng: &mut R,
        x: &Scalar,
        g1: &RistrettoPoint,
        h1: &RistrettoPoint,
        g2: &RistrettoPoint,
        h2: &RistrettoPoint,
        context: &[u8],
    ) -> Self {
        let w = Scalar::random(rng);
        let a1 = w * g1;
        let a2 = w * g2;
        let c = challenge([g1, h1, g2, h2, &a1, &a2], context);
        Self {
            challenge: c,
            response: w - c * x,
        }
    }

    pub fn verify(
        &self,
        g1: &RistrettoPoint,
        h1: &RistrettoPoint,
        g2: &RistrettoPoint,
        h2: &RistrettoPoint,
        context: &[u8],
    ) -> bool {
        let a1 = self.response * g1 + self.challenge * h1;
        let a2 = self.response * g2 + self.challenge * h2;
        challenge([g1, h1, g2, h2, &a1, &a2], context) == self.challenge
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::SharingParameters;
    use crypto_core::AesRng;

    #[test]
    fn dleq_proof_test() {
        let mut rng = AesRng::new();
        let params = SharingParameters::generate(&mut rng);
        let x = Scalar::random(&mut rng);
        let (h1, h2) = (x * params.g, x * params.h);

        let proof = DleqProof::prove(&mut rng, &x, &params.g, &h1, &params.h, &h2, b"ctx");
        assert!(proof.verify(&params.g, &h1, &params.h, &h2, b"ctx"));
        assert!(!proof.verify(&params.g, &h1, &params.h, &h2, b"other"));

        // Different exponents on the two sides.
        let y = Scalar::random(&mut rng);
        let bad = DleqProof::prove(&mut rng, &x, &params.g, &h1, &params.h, &(y * params.h), b"ctx");
        assert!(!bad.verify(&params.g, &h1, &params.h, &(y * params.h), b"ctx"));
    }
}
