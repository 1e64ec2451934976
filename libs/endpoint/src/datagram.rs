use std::net::SocketAddr;
use std::sync::Arc;

use endpoint_api::{DatagramFraming, DatagramTransport, EndpointError, FrameOptions, PeerId};
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

use crate::event::{new_peer_id, StreamEvent};

/// Datagram endpoint — spec.md §4.8. Exactly one of `local_addr` (bind) or
/// `remote_addr` (connect) must be supplied. There is a single protocol
/// instance whose `peer_id` stands for the endpoint itself; UDP has no
/// connection lifecycle, so no reconnect loop runs. Grounded on the
/// teacher's blocking `Transport` acceptor pattern, applied to
/// `DatagramTransport` instead of stream connections.
pub struct DatagramEndpoint {
    send_half: Box<dyn DatagramTransport>,
    framing: Arc<dyn DatagramFraming>,
    default_addr: Option<SocketAddr>,
    bound_addr: Option<SocketAddr>,
    peer_id: PeerId,
    token: CancellationToken,
}

impl DatagramEndpoint {
    pub fn start(
        mut transport: Box<dyn DatagramTransport>,
        framing: Arc<dyn DatagramFraming>,
        local_addr: Option<SocketAddr>,
        remote_addr: Option<SocketAddr>,
        events_buffer: usize,
    ) -> Result<(Self, mpsc::Receiver<StreamEvent>), EndpointError> {
        match (local_addr, remote_addr) {
            (Some(_), Some(_)) | (None, None) => {
                return Err(EndpointError::InvalidConfiguration("exactly one of local_addr or remote_addr must be supplied".into()));
            }
            _ => {}
        }
        if let Some(addr) = local_addr {
            transport.bind(addr)?;
        }
        if let Some(addr) = remote_addr {
            transport.connect(addr)?;
        }

        let recv_half = transport.try_clone()?;
        let bound_addr = transport.local_addr();
        let peer_id = new_peer_id();
        let (events_tx, events_rx) = mpsc::channel(events_buffer);
        let token = CancellationToken::new();

        let recv_framing = framing.clone();
        let recv_token = token.clone();
        tokio::task::spawn_blocking(move || run_recv_loop(peer_id, recv_half, &*recv_framing, &events_tx, &recv_token));

        Ok((
            Self { send_half: transport, framing, default_addr: remote_addr, bound_addr, peer_id, token },
            events_rx,
        ))
    }

    /// Sends a datagram to `addr`, or to the bound/connected default when
    /// `None` — spec.md §4.8.
    pub fn send(&mut self, data: &[u8], options: &FrameOptions, addr: Option<SocketAddr>) -> Result<(), EndpointError> {
        let wire = self.framing.encode(data, options)?;
        self.send_half.send_to(&wire, addr.or(self.default_addr))?;
        Ok(())
    }

    pub fn peer_id(&self) -> PeerId {
        self.peer_id
    }

    /// The address actually bound, when this endpoint was started with
    /// `local_addr`. `None` for a connect-mode endpoint, or if the
    /// transport doesn't report one.
    pub fn local_addr(&self) -> Option<SocketAddr> {
        self.bound_addr
    }

    pub fn stop(&mut self) -> Result<(), EndpointError> {
        self.token.cancel();
        self.send_half.stop()
    }
}

fn run_recv_loop(
    peer_id: PeerId,
    mut transport: Box<dyn DatagramTransport>,
    framing: &dyn DatagramFraming,
    events_tx: &mpsc::Sender<StreamEvent>,
    token: &CancellationToken,
) {
    let mut buf = vec![0u8; 65536];
    let _ = events_tx.blocking_send(StreamEvent::PeerUp { peer_id });
    loop {
        if token.is_cancelled() {
            break;
        }
        match transport.recv_from(&mut buf) {
            Ok((n, _from)) => match framing.decode(&buf[..n]) {
                Ok((payload, options)) => {
                    if events_tx.blocking_send(StreamEvent::Message { peer_id, bytes: payload, options }).is_err() {
                        break;
                    }
                }
                Err(e) => tracing::warn!(%peer_id, error = ?e, "malformed datagram, skipping"),
            },
            Err(e) => {
                tracing::error!(%peer_id, error = ?e, "datagram receive error");
                break;
            }
        }
    }
    let _ = events_tx.blocking_send(StreamEvent::PeerDown { peer_id });
}

#[cfg(test)]
mod tests {
    use super::*;
    use framing::LengthPrefixedDatagramFraming;
    use transport::UdpDatagramTransport;

    #[tokio::test]
    async fn rejects_both_local_and_remote() {
        let transport = Box::new(UdpDatagramTransport::new());
        let err = DatagramEndpoint::start(
            transport,
            Arc::new(LengthPrefixedDatagramFraming),
            Some("127.0.0.1:0".parse().unwrap()),
            Some("127.0.0.1:9".parse().unwrap()),
            16,
        )
        .unwrap_err();
        assert!(matches!(err, EndpointError::InvalidConfiguration(_)));
    }

    #[tokio::test]
    async fn sends_and_receives_between_two_bound_endpoints() {
        let (mut a, mut a_events) = DatagramEndpoint::start(
            Box::new(UdpDatagramTransport::new()),
            Arc::new(LengthPrefixedDatagramFraming),
            Some("127.0.0.1:0".parse().unwrap()),
            None,
            16,
        )
        .unwrap();

        let (mut b, mut b_events) = DatagramEndpoint::start(
            Box::new(UdpDatagramTransport::new()),
            Arc::new(LengthPrefixedDatagramFraming),
            Some("127.0.0.1:0".parse().unwrap()),
            None,
            16,
        )
        .unwrap();

        assert!(matches!(a_events.recv().await.unwrap(), StreamEvent::PeerUp { .. }));
        assert!(matches!(b_events.recv().await.unwrap(), StreamEvent::PeerUp { .. }));

        let b_local = b.local_addr().unwrap();
        a.send(b"ping", &FrameOptions::default(), Some(b_local)).unwrap();
        match b_events.recv().await.unwrap() {
            StreamEvent::Message { bytes, .. } => assert_eq!(bytes, b"ping"),
            other => panic!("unexpected event: {other:?}"),
        }
    }
}
