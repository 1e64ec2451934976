use std::io::{Read, Write};

use crate::error::EndpointError;

/// One connected peer's byte stream. Blocking, like the teacher's
/// `TransportStream`: transport I/O runs on a dedicated blocking thread, not
/// the async runtime.
pub trait TransportStream: Read + Write + Send {
    /// Human-readable peer description for logging (address, socket path, …).
    fn peer_info(&self) -> String {
        "unknown".to_string()
    }

    /// Splits the stream into an independent read half and write half so a
    /// reader task and a writer task can each own one without sharing a
    /// lock. Transports that can't duplicate their handle return `Io`.
    fn try_clone(&self) -> Result<Box<dyn TransportStream>, EndpointError> {
        Err(EndpointError::Io(std::io::Error::new(std::io::ErrorKind::Unsupported, "stream does not support cloning")))
    }
}

impl TransportStream for std::net::TcpStream {
    fn peer_info(&self) -> String {
        self.peer_addr()
            .map(|a| a.to_string())
            .unwrap_or_else(|_| "unknown".to_string())
    }

    fn try_clone(&self) -> Result<Box<dyn TransportStream>, EndpointError> {
        std::net::TcpStream::try_clone(self).map(|s| Box::new(s) as Box<dyn TransportStream>).map_err(EndpointError::Io)
    }
}

/// A connection-oriented transport: accepts or opens `TransportStream`s.
///
/// All methods are blocking; endpoints drive them from a `spawn_blocking`
/// thread, never from async code directly.
pub trait Transport: Send {
    fn start(&mut self) -> Result<(), EndpointError>;

    /// Blocks until a new connection is available, the transport is closed
    /// (`Ok(None)`), or an error occurs. A server transport loops; a client
    /// transport returns `Ok(None)` after its single connection.
    fn next_connection(&mut self) -> Result<Option<Box<dyn TransportStream>>, EndpointError>;

    fn stop(&mut self) -> Result<(), EndpointError>;
}

/// A connectionless, message-oriented transport (UDP). One `send`/`recv`
/// call transfers exactly one datagram.
pub trait DatagramTransport: Send {
    fn bind(&mut self, local_addr: std::net::SocketAddr) -> Result<(), EndpointError>;
    fn connect(&mut self, remote_addr: std::net::SocketAddr) -> Result<(), EndpointError>;

    /// Blocks until one datagram arrives. Returns the payload and the
    /// sender's address.
    fn recv_from(&mut self, buf: &mut [u8]) -> Result<(usize, std::net::SocketAddr), EndpointError>;

    /// Sends to `addr` if given, else to the address passed to `connect`.
    fn send_to(&mut self, buf: &[u8], addr: Option<std::net::SocketAddr>) -> Result<usize, EndpointError>;

    fn stop(&mut self) -> Result<(), EndpointError>;

    /// Duplicates the underlying socket handle so a receive loop and a send
    /// path can each own one, mirroring `TransportStream::try_clone`.
    fn try_clone(&self) -> Result<Box<dyn DatagramTransport>, EndpointError> {
        Err(EndpointError::Io(std::io::Error::new(std::io::ErrorKind::Unsupported, "transport does not support cloning")))
    }

    /// The address actually bound, useful when `bind` used an ephemeral
    /// port. `None` until bound.
    fn local_addr(&self) -> Option<std::net::SocketAddr> {
        None
    }
}
