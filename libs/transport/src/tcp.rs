use std::net::{TcpListener, TcpStream, ToSocketAddrs};

use endpoint_api::{EndpointError, Transport, TransportStream};

/// Accepting TCP transport: binds once in `start`, then `next_connection`
/// loops over `TcpListener::accept` — spec.md §4.8's server-mode stream
/// endpoint. Grounded on `plugins/transport/tcp-server/src/lib.rs`.
pub struct TcpServerTransport {
    addr: String,
    listener: Option<TcpListener>,
}

impl TcpServerTransport {
    pub fn new(addr: impl Into<String>) -> Self {
        Self { addr: addr.into(), listener: None }
    }

    /// The address actually bound, useful when `addr` used an ephemeral
    /// port (`:0`). `None` before `start`.
    pub fn local_addr(&self) -> Option<std::net::SocketAddr> {
        self.listener.as_ref().and_then(|l| l.local_addr().ok())
    }
}

impl Transport for TcpServerTransport {
    fn start(&mut self) -> Result<(), EndpointError> {
        let listener = TcpListener::bind(&self.addr).map_err(EndpointError::Io)?;
        tracing::info!(addr = %self.addr, "tcp server listening");
        self.listener = Some(listener);
        Ok(())
    }

    fn next_connection(&mut self) -> Result<Option<Box<dyn TransportStream>>, EndpointError> {
        let listener = self
            .listener
            .as_ref()
            .ok_or_else(|| EndpointError::InvalidConfiguration("transport not started".into()))?;
        let (stream, addr) = listener.accept().map_err(EndpointError::Io)?;
        tracing::info!(peer = %addr, "tcp server accepted connection");
        Ok(Some(Box::new(stream)))
    }

    fn stop(&mut self) -> Result<(), EndpointError> {
        self.listener = None;
        Ok(())
    }
}

/// Connecting TCP transport: `next_connection` opens exactly one connection
/// and returns `Ok(None)` afterward — the reconnect loop lives in the
/// endpoint, which re-drives `start`/`next_connection` on failure — spec.md
/// §4.6. Grounded on `plugins/transport/tcp-client/src/lib.rs`.
pub struct TcpClientTransport {
    addr: String,
    connected: bool,
}

impl TcpClientTransport {
    pub fn new(addr: impl Into<String>) -> Self {
        Self { addr: addr.into(), connected: false }
    }
}

impl Transport for TcpClientTransport {
    fn start(&mut self) -> Result<(), EndpointError> {
        self.connected = false;
        Ok(())
    }

    fn next_connection(&mut self) -> Result<Option<Box<dyn TransportStream>>, EndpointError> {
        if self.connected {
            return Ok(None);
        }
        let mut last_err = None;
        let addrs = self
            .addr
            .to_socket_addrs()
            .map_err(EndpointError::Io)?;
        for addr in addrs {
            match TcpStream::connect(addr) {
                Ok(stream) => {
                    self.connected = true;
                    tracing::info!(addr = %self.addr, "tcp client connected");
                    return Ok(Some(Box::new(stream)));
                }
                Err(e) => last_err = Some(e),
            }
        }
        Err(EndpointError::ConnectRefused(
            last_err.map(|e| e.to_string()).unwrap_or_else(|| format!("could not resolve {}", self.addr)),
        ))
    }

    fn stop(&mut self) -> Result<(), EndpointError> {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::{Read, Write};

    #[test]
    fn server_accepts_and_client_connects() {
        let mut server = TcpServerTransport::new("127.0.0.1:0");
        server.start().unwrap();
        let local_addr = server.listener.as_ref().unwrap().local_addr().unwrap();

        let mut client = TcpClientTransport::new(local_addr.to_string());
        client.start().unwrap();
        let mut client_stream = client.next_connection().unwrap().unwrap();
        let mut server_stream = server.next_connection().unwrap().unwrap();

        client_stream.write_all(b"ping").unwrap();
        let mut buf = [0u8; 4];
        server_stream.read_exact(&mut buf).unwrap();
        assert_eq!(&buf, b"ping");

        assert!(client.next_connection().unwrap().is_none());
    }

    #[test]
    fn client_reports_connect_refused() {
        let mut client = TcpClientTransport::new("127.0.0.1:1");
        client.start().unwrap();
        let err = client.next_connection().unwrap_err();
        assert!(matches!(err, EndpointError::ConnectRefused(_)));
    }
}
