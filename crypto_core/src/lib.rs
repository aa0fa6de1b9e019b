pub mod block;
pub mod channel;
pub mod commitment;
pub mod hash_aes;
pub mod rand_aes;
pub mod utils;

pub use crate::{
    block::Block,
    commitment::Commitment,
    hash_aes::{AesHash, AES_HASH},
    rand_aes::AesRng,
};

pub use channel::*;
