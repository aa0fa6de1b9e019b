use std::{
    io::{BufReader, BufWriter, Result},
    os::unix::net::UnixStream,
};

use crate::SyncChannel;

pub type LocalChannel = SyncChannel<BufReader<UnixStream>, BufWriter<UnixStream>>;

/// A connected pair of in-process channels backed by a Unix socket pair.
pub fn local_channel_pair() -> Result<(LocalChannel, LocalChannel)> {
    let (tx, rx) = UnixStream::pair()?;
    let sender = SyncChannel::new(BufReader::new(tx.try_clone()?), BufWriter::new(tx));
    let receiver = SyncChannel::new(BufReader::new(rx.try_clone()?), BufWriter::new(rx));
    Ok((sender, receiver))
}
