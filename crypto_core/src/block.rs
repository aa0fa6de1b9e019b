//! A 128-bit block, the unit of wire labels, OT messages and AES inputs.

use core::ops::{BitAnd, BitXor, BitXorAssign};
use rand::distributions::{Distribution, Standard};
use rand::Rng;
use serde::{Deserialize, Serialize};

/// Number of bytes in a `Block`.
pub const BLOCK_LEN: usize = 16;

#[repr(transparent)]
#[derive(Copy, Clone, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Block([u8; BLOCK_LEN]);

/// `SELECT_MASK[b]` is all zeros for `b = 0` and all ones for `b = 1`.
pub const SELECT_MASK: [Block; 2] = [Block::ZERO, Block::ONES];

impl Block {
    pub const ZERO: Block = Block([0u8; BLOCK_LEN]);
    pub const ONES: Block = Block([0xFFu8; BLOCK_LEN]);

    #[inline]
    pub fn new(bytes: [u8; BLOCK_LEN]) -> Self {
        Self(bytes)
    }

    /// Build a block from a slice of exactly 16 bytes.
    #[inline]
    pub fn try_from_slice(bytes: &[u8]) -> Option<Self> {
        let bytes: [u8; BLOCK_LEN] = bytes.try_into().ok()?;
        Some(Self(bytes))
    }

    #[inline]
    pub fn to_u128(self) -> u128 {
        u128::from_le_bytes(self.0)
    }

    #[inline]
    pub fn lsb(&self) -> bool {
        (self.0[0] & 1) == 1
    }

    #[inline]
    pub fn set_lsb(mut self) -> Self {
        self.0[0] |= 1;
        self
    }

    /// Flip every bit of the block.
    #[inline]
    pub fn flip(self) -> Self {
        self ^ Self::ONES
    }
}

impl core::fmt::Debug for Block {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(f, "Block({:032x})", self.to_u128())
    }
}

impl From<u128> for Block {
    #[inline]
    fn from(x: u128) -> Self {
        Self(x.to_le_bytes())
    }
}

impl From<[u8; BLOCK_LEN]> for Block {
    #[inline]
    fn from(bytes: [u8; BLOCK_LEN]) -> Self {
        Self(bytes)
    }
}

impl From<Block> for [u8; BLOCK_LEN] {
    #[inline]
    fn from(blk: Block) -> Self {
        blk.0
    }
}

impl AsRef<[u8]> for Block {
    fn as_ref(&self) -> &[u8] {
        &self.0
    }
}

impl AsMut<[u8]> for Block {
    fn as_mut(&mut self) -> &mut [u8] {
        &mut self.0
    }
}

impl BitXor for Block {
    type Output = Self;

    #[inline]
    fn bitxor(self, rhs: Self) -> Self::Output {
        Self::from(self.to_u128() ^ rhs.to_u128())
    }
}

impl BitXorAssign for Block {
    #[inline]
    fn bitxor_assign(&mut self, rhs: Self) {
        *self = *self ^ rhs;
    }
}

impl BitAnd for Block {
    type Output = Self;

    #[inline]
    fn bitand(self, rhs: Self) -> Self::Output {
        Self::from(self.to_u128() & rhs.to_u128())
    }
}

impl Distribution<Block> for Standard {
    #[inline]
    fn sample<R: Rng + ?Sized>(&self, rng: &mut R) -> Block {
        Block::from(rng.gen::<u128>())
    }
}
