//! Correlation-robust hash functions based on fixed-key AES.

use crate::block::Block;
use aes::Aes128;
use cipher::{generic_array::GenericArray, BlockEncrypt, KeyInit};
use once_cell::sync::Lazy;

pub struct AesHash {
    aes: Aes128,
}

pub static AES_HASH: Lazy<AesHash> = Lazy::new(|| AesHash::new(Block::ZERO));

impl AesHash {
    /// Initialize the hash function using `key`.
    #[inline]
    pub fn new(key: Block) -> Self {
        let key_byte: [u8; 16] = key.into();
        let aes = Aes128::new(&GenericArray::from(key_byte));
        AesHash { aes }
    }

    #[inline]
    fn permute(&self, x: Block) -> Block {
        let y: [u8; 16] = x.into();
        let mut y = GenericArray::from(y);
        self.aes.encrypt_block(&mut y);
        let mut out = [0u8; 16];
        out.copy_from_slice(&y);
        Block::from(out)
    }

    /// Tweakable circular correlation robust hash function (cf.
    /// <https://eprint.iacr.org/2019/074>, §7.4).
    ///
    /// The function computes `π(π(x) ⊕ i) ⊕ π(x)`.
    #[inline]
    pub fn tccr_hash(&self, i: Block, x: Block) -> Block {
        let y = self.permute(x);
        let z = self.permute(y ^ i);
        y ^ z
    }
}
