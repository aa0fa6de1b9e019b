use std::fmt;

use curve25519_dalek::{
    ristretto::{CompressedRistretto, RistrettoPoint},
    scalar::Scalar,
};
use rand::{CryptoRng, Rng};
use serde::{Deserialize, Serialize};

use crate::params::SharingParameters;

/// An identity's public key `x·h`.
#[derive(Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PublicKey(pub RistrettoPoint);

impl PublicKey {
    pub fn compress(&self) -> CompressedRistretto {
        self.0.compress()
    }

    pub fn to_bytes(&self) -> [u8; 32] {
        self.0.compress().to_bytes()
    }
}

impl fmt::Debug for PublicKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "PublicKey(")?;
        for b in self.to_bytes()[..8].iter() {
            write!(f, "{:02x}", b)?;
        }
        write!(f, "..)")
    }
}

/// A named identity. The private scalar never leaves its owner and has no
/// serialized form.
#[derive(Clone)]
pub struct Keypair {
    pub name: String,
    private: Scalar,
    pub public: PublicKey,
}

impl Keypair {
    pub fn generate<R: Rng + CryptoRng>(
        rng: &mut R,
        params: &SharingParameters,
        name: impl Into<String>,
    ) -> Self {
        let private = Scalar::random(rng);
        Self {
            name: name.into(),
            private,
            public: PublicKey(private * params.h),
        }
    }

    pub(crate) fn private(&self) -> &Scalar {
        &self.private
    }
}

impl fmt::Debug for Keypair {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Keypair")
            .field("name", &self.name)
            .field("public", &self.public)
            .finish_non_exhaustive()
    }
}
