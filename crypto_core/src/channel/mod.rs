pub mod local_channel;
pub mod net_channel;

pub use local_channel::*;
pub use net_channel::*;

use std::io::{Error, ErrorKind, Read, Result, Write};

use curve25519_dalek::ristretto::{CompressedRistretto, RistrettoPoint};
use serde::{de::DeserializeOwned, Serialize};

use crate::utils::{pack_bits, unpack_bits};
use crate::Block;

/// Upper bound on the size of a single framed message.
pub const MAX_MESSAGE_LEN: usize = 1 << 26;

/// A trait for a blocking, ordered I/O channel between two parties.
pub trait AbstractChannel {
    /// Write bytes slice to the channel.
    fn write_bytes(&mut self, bytes: &[u8]) -> Result<()>;
    /// Read bytes slice from the channel.
    fn read_bytes(&mut self, bytes: &mut [u8]) -> Result<()>;
    /// Flush the channel.
    fn flush(&mut self) -> Result<()>;

    /// Write a `bool` to the channel.
    #[inline(always)]
    fn write_bool(&mut self, b: bool) -> Result<()> {
        self.write_bytes(&[b as u8])
    }

    /// Read a 'bool' from the channel.
    #[inline(always)]
    fn read_bool(&mut self) -> Result<bool> {
        let mut data = [0u8; 1];
        self.read_bytes(&mut data)?;
        Ok(data[0] != 0)
    }

    /// Write a slice of `bool`s packed into bytes.
    fn write_bools(&mut self, bits: &[bool]) -> Result<()> {
        self.write_bytes(&pack_bits(bits))
    }

    /// Read `n` packed `bool`s.
    fn read_bools(&mut self, n: usize) -> Result<Vec<bool>> {
        let mut bytes = vec![0u8; (n + 7) / 8];
        self.read_bytes(&mut bytes)?;
        Ok(unpack_bits(&bytes, n))
    }

    /// Write a `usize` as 8 little-endian bytes.
    #[inline(always)]
    fn write_usize(&mut self, x: usize) -> Result<()> {
        self.write_bytes(&(x as u64).to_le_bytes())
    }

    /// Read a `usize` written by `write_usize`.
    #[inline(always)]
    fn read_usize(&mut self) -> Result<usize> {
        let mut data = [0u8; 8];
        self.read_bytes(&mut data)?;
        usize::try_from(u64::from_le_bytes(data))
            .map_err(|e| Error::new(ErrorKind::InvalidData, e))
    }

    /// Write a `Block` to the channel.
    #[inline(always)]
    fn write_block(&mut self, blk: &Block) -> Result<()> {
        self.write_bytes(blk.as_ref())
    }

    /// Read a `Block` from the channel.
    #[inline(always)]
    fn read_block(&mut self) -> Result<Block> {
        let mut blk = Block::default();
        self.read_bytes(blk.as_mut())?;
        Ok(blk)
    }

    /// Write a compressed Ristretto point to the channel.
    #[inline(always)]
    fn write_point(&mut self, pt: &RistrettoPoint) -> Result<()> {
        self.write_bytes(pt.compress().as_bytes())
    }

    /// Read a compressed Ristretto point, rejecting invalid encodings.
    #[inline(always)]
    fn read_point(&mut self) -> Result<RistrettoPoint> {
        let mut data = [0u8; 32];
        self.read_bytes(&mut data)?;
        CompressedRistretto(data)
            .decompress()
            .ok_or_else(|| Error::new(ErrorKind::InvalidData, "invalid ristretto point"))
    }

    /// Send a structured message as a length-prefixed JSON frame and flush.
    fn send_msg<T: Serialize>(&mut self, msg: &T) -> Result<()> {
        let body = serde_json::to_vec(msg).map_err(|e| Error::new(ErrorKind::InvalidData, e))?;
        if body.len() > MAX_MESSAGE_LEN {
            return Err(Error::new(ErrorKind::InvalidInput, "message too large"));
        }
        self.write_bytes(&(body.len() as u32).to_le_bytes())?;
        self.write_bytes(&body)?;
        self.flush()
    }

    /// Receive a structured message sent by `send_msg`.
    fn recv_msg<T: DeserializeOwned>(&mut self) -> Result<T> {
        let mut len = [0u8; 4];
        self.read_bytes(&mut len)?;
        let len = u32::from_le_bytes(len) as usize;
        if len > MAX_MESSAGE_LEN {
            return Err(Error::new(ErrorKind::InvalidData, "message too large"));
        }
        let mut body = vec![0u8; len];
        self.read_bytes(&mut body)?;
        serde_json::from_slice(&body).map_err(|e| Error::new(ErrorKind::InvalidData, e))
    }
}

/// A channel over a separate reader and writer, counting the traffic.
pub struct SyncChannel<R, W> {
    reader: R,
    writer: W,

    read_bytes: usize,
    write_bytes: usize,
}

impl<R: Read, W: Write> SyncChannel<R, W> {
    /// New a `SyncChannel`
    pub fn new(reader: R, writer: W) -> Self {
        Self {
            reader,
            writer,
            read_bytes: 0,
            write_bytes: 0,
        }
    }

    /// Number of bytes written so far.
    pub fn bytes_written(&self) -> usize {
        self.write_bytes
    }

    /// Number of bytes read so far.
    pub fn bytes_read(&self) -> usize {
        self.read_bytes
    }
}

impl<R: Read, W: Write> AbstractChannel for SyncChannel<R, W> {
    #[inline(always)]
    fn write_bytes(&mut self, bytes: &[u8]) -> Result<()> {
        self.writer.write_all(bytes)?;
        self.write_bytes += bytes.len();
        Ok(())
    }

    #[inline(always)]
    fn read_bytes(&mut self, bytes: &mut [u8]) -> Result<()> {
        self.reader.read_exact(bytes)?;
        self.read_bytes += bytes.len();
        Ok(())
    }

    #[inline(always)]
    fn flush(&mut self) -> Result<()> {
        self.writer.flush()
    }
}

impl<C: AbstractChannel + ?Sized> AbstractChannel for &mut C {
    #[inline(always)]
    fn write_bytes(&mut self, bytes: &[u8]) -> Result<()> {
        (**self).write_bytes(bytes)
    }

    #[inline(always)]
    fn read_bytes(&mut self, bytes: &mut [u8]) -> Result<()> {
        (**self).read_bytes(bytes)
    }

    #[inline(always)]
    fn flush(&mut self) -> Result<()> {
        (**self).flush()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use curve25519_dalek::{constants::RISTRETTO_BASEPOINT_POINT, scalar::Scalar};
    use serde::Deserialize;
    use std::thread;

    #[derive(Debug, PartialEq, Serialize, Deserialize)]
    struct Hello {
        name: String,
        wires: Vec<usize>,
    }

    #[test]
    fn channel_primitives_test() {
        let (mut sender, mut receiver) = local_channel_pair().unwrap();

        let send_bools = rand::random::<[bool; 10]>();
        let send_block = rand::random::<Block>();
        let send_point = Scalar::from(rand::random::<u64>()) * RISTRETTO_BASEPOINT_POINT;
        let msg = Hello {
            name: "Smart".to_string(),
            wires: vec![3, 4],
        };

        let bools = send_bools;
        let handle = thread::spawn(move || {
            sender.write_bools(&bools).unwrap();
            sender.write_block(&send_block).unwrap();
            sender.write_point(&send_point).unwrap();
            sender.write_usize(42).unwrap();
            sender
                .send_msg(&Hello {
                    name: "Smart".to_string(),
                    wires: vec![3, 4],
                })
                .unwrap();
        });

        assert_eq!(receiver.read_bools(10).unwrap(), send_bools.to_vec());
        assert_eq!(receiver.read_block().unwrap(), send_block);
        assert_eq!(receiver.read_point().unwrap(), send_point);
        assert_eq!(receiver.read_usize().unwrap(), 42);
        assert_eq!(receiver.recv_msg::<Hello>().unwrap(), msg);

        handle.join().unwrap();
    }

    #[test]
    fn closed_channel_reports_eof() {
        let (sender, mut receiver) = local_channel_pair().unwrap();
        drop(sender);
        let err = receiver.recv_msg::<Hello>().unwrap_err();
        assert_eq!(err.kind(), ErrorKind::UnexpectedEof);
    }
}
