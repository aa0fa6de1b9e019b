use curve25519_dalek::{constants::RISTRETTO_BASEPOINT_POINT, ristretto::RistrettoPoint};
use rand::{CryptoRng, Rng};
use serde::{Deserialize, Serialize};
use sha2::Sha512;

const H_DOMAIN: &[u8] = b"gated-release/pvss/h";

/// The two independent generators of a sharing session. Coefficient
/// commitments live on `g`, identity keys and the secret on `h`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SharingParameters {
    pub g: RistrettoPoint,
    pub h: RistrettoPoint,
}

impl SharingParameters {
    /// `g` is the Ristretto basepoint and `h` is hashed from a fresh seed,
    /// so nobody knows `log_g h`.
    pub fn generate<R: Rng + CryptoRng>(rng: &mut R) -> Self {
        let mut seed = [0u8; 32];
        rng.fill_bytes(&mut seed);
        Self::from_seed(&seed)
    }

    pub fn from_seed(seed: &[u8]) -> Self {
        let h = RistrettoPoint::hash_from_bytes::<Sha512>(&[H_DOMAIN, seed].concat());
        Self {
            g: RISTRETTO_BASEPOINT_POINT,
            h,
        }
    }
}
