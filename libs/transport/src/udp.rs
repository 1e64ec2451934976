use std::net::{SocketAddr, UdpSocket};

use endpoint_api::{DatagramTransport, EndpointError};

/// UDP datagram transport — spec.md §4.7. New relative to the teacher's
/// plugin pack (which only carries stream transports); shaped to match
/// `endpoint_api::DatagramTransport`'s bind/connect/recv_from/send_to seam.
pub struct UdpDatagramTransport {
    socket: Option<UdpSocket>,
    connected_to: Option<SocketAddr>,
}

impl UdpDatagramTransport {
    pub fn new() -> Self {
        Self { socket: None, connected_to: None }
    }

    fn socket(&self) -> Result<&UdpSocket, EndpointError> {
        self.socket.as_ref().ok_or_else(|| EndpointError::InvalidConfiguration("datagram transport not bound".into()))
    }
}

impl Default for UdpDatagramTransport {
    fn default() -> Self {
        Self::new()
    }
}

impl DatagramTransport for UdpDatagramTransport {
    fn bind(&mut self, local_addr: SocketAddr) -> Result<(), EndpointError> {
        let socket = UdpSocket::bind(local_addr).map_err(EndpointError::Io)?;
        tracing::info!(addr = %local_addr, "udp transport bound");
        self.socket = Some(socket);
        Ok(())
    }

    fn connect(&mut self, remote_addr: SocketAddr) -> Result<(), EndpointError> {
        if self.socket.is_none() {
            // Picking an ephemeral local port matching the remote's address
            // family, mirroring a client socket that never explicitly binds.
            let local: SocketAddr = if remote_addr.is_ipv4() { "0.0.0.0:0".parse().unwrap() } else { "[::]:0".parse().unwrap() };
            self.socket = Some(UdpSocket::bind(local).map_err(EndpointError::Io)?);
        }
        self.socket().unwrap().connect(remote_addr).map_err(EndpointError::Io)?;
        self.connected_to = Some(remote_addr);
        Ok(())
    }

    fn recv_from(&mut self, buf: &mut [u8]) -> Result<(usize, SocketAddr), EndpointError> {
        self.socket()?.recv_from(buf).map_err(EndpointError::Io)
    }

    fn send_to(&mut self, buf: &[u8], addr: Option<SocketAddr>) -> Result<usize, EndpointError> {
        let socket = self.socket()?;
        match addr.or(self.connected_to) {
            Some(addr) => socket.send_to(buf, addr).map_err(EndpointError::Io),
            None => Err(EndpointError::InvalidConfiguration("no destination address: neither connected nor passed explicitly".into())),
        }
    }

    fn stop(&mut self) -> Result<(), EndpointError> {
        self.socket = None;
        self.connected_to = None;
        Ok(())
    }

    fn try_clone(&self) -> Result<Box<dyn DatagramTransport>, EndpointError> {
        let socket = self.socket()?.try_clone().map_err(EndpointError::Io)?;
        Ok(Box::new(Self { socket: Some(socket), connected_to: self.connected_to }))
    }

    fn local_addr(&self) -> Option<SocketAddr> {
        self.socket.as_ref().and_then(|s| s.local_addr().ok())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn round_trips_a_datagram_between_two_bound_sockets() {
        let mut a = UdpDatagramTransport::new();
        a.bind("127.0.0.1:0".parse().unwrap()).unwrap();
        let a_addr = a.socket.as_ref().unwrap().local_addr().unwrap();

        let mut b = UdpDatagramTransport::new();
        b.bind("127.0.0.1:0".parse().unwrap()).unwrap();
        let b_addr = b.socket.as_ref().unwrap().local_addr().unwrap();

        a.send_to(b"hello", Some(b_addr)).unwrap();
        let mut buf = [0u8; 16];
        let (n, from) = b.recv_from(&mut buf).unwrap();
        assert_eq!(&buf[..n], b"hello");
        assert_eq!(from, a_addr);
    }

    #[test]
    fn connect_fixes_the_default_destination() {
        let mut a = UdpDatagramTransport::new();
        a.bind("127.0.0.1:0".parse().unwrap()).unwrap();

        let mut b = UdpDatagramTransport::new();
        b.bind("127.0.0.1:0".parse().unwrap()).unwrap();
        let b_addr = b.socket.as_ref().unwrap().local_addr().unwrap();

        a.connect(b_addr).unwrap();
        a.send_to(b"ping", None).unwrap();
        let mut buf = [0u8; 16];
        let (n, _) = b.recv_from(&mut buf).unwrap();
        assert_eq!(&buf[..n], b"ping");
    }
}
