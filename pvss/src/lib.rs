//! Publicly verifiable secret sharing over Ristretto with reencryption of
//! decrypted shares towards a receiver key.

pub mod dleq;
pub mod errors;
pub mod keys;
pub mod params;
pub mod share;

pub use dleq::DleqProof;
pub use errors::PvssError;
pub use keys::{Keypair, PublicKey};
pub use params::SharingParameters;
pub use share::{
    reconstruct, reencrypt, share_secret, DecryptedShare, EncryptedShare, ReencryptedShare,
    Secret, SharingInstance,
};
