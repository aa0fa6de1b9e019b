use std::{
    io::{BufReader, BufWriter, Result},
    net::{TcpListener, TcpStream, ToSocketAddrs},
    time::Duration,
};

use crate::SyncChannel;

pub type NetChannel = SyncChannel<BufReader<TcpStream>, BufWriter<TcpStream>>;

impl SyncChannel<BufReader<TcpStream>, BufWriter<TcpStream>> {
    /// Wrap a connected stream. `timeout` bounds every blocking read.
    pub fn from_stream(socket: TcpStream, timeout: Option<Duration>) -> Result<Self> {
        socket.set_read_timeout(timeout)?;
        socket.set_nodelay(true)?;
        Ok(Self::new(
            BufReader::new(socket.try_clone()?),
            BufWriter::new(socket),
        ))
    }

    /// Connect to a listening peer.
    pub fn connect<A: ToSocketAddrs>(addr: A, timeout: Option<Duration>) -> Result<Self> {
        let socket = TcpStream::connect(addr)?;
        Self::from_stream(socket, timeout)
    }

    /// Accept the next peer on `listener`.
    pub fn accept(listener: &TcpListener, timeout: Option<Duration>) -> Result<Self> {
        let (socket, _) = listener.accept()?;
        Self::from_stream(socket, timeout)
    }
}
