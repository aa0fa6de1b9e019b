//! Useful utility functions.

/// Pack a bit slice into bytes.
pub fn pack_bits(bits: &[bool]) -> Vec<u8> {
    let nbytes = (bits.len() + 7) / 8;
    let mut bytes = vec![0; nbytes];
    for (i, bit) in bits.iter().enumerate() {
        bytes[i / 8] |= (*bit as u8) << (i % 8);
    }
    bytes
}

/// Unpack a bit vector from a slice of bytes.
pub fn unpack_bits(bytes: &[u8], size: usize) -> Vec<bool> {
    let mut bits = Vec::with_capacity(size);
    for (i, byte) in bytes.iter().enumerate() {
        for j in 0..8 {
            if 8 * i + j >= size {
                break;
            }
            bits.push(((byte >> j) & 1) != 0);
        }
    }
    bits
}

/// The `n`-bit big-endian expansion of `x`: bit `0` of the result is the most
/// significant of the `n` bits.
pub fn int_to_bits(x: u64, n: usize) -> Vec<bool> {
    (0..n).map(|i| (x >> (n - 1 - i)) & 1 == 1).collect()
}

/// Render bits as a space separated string of `0`/`1`.
pub fn bits_to_string(bits: &[bool]) -> String {
    bits.iter()
        .map(|b| (*b as u8).to_string())
        .collect::<Vec<_>>()
        .join(" ")
}
