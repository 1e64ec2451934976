use std::io::{Read, Write};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use endpoint_api::{EndpointError, FrameOptions, Framing, PeerId, Transport, TransportStream};
use tokio::sync::{mpsc, oneshot};
use tokio_util::sync::CancellationToken;

use crate::backoff::Backoff;
use crate::event::{new_peer_id, StreamEvent};
use crate::stream_server::{run_writer, WriteItem};

/// Client-mode stream endpoint — spec.md §4.6. Drives the
/// `IDLE/CONNECTING/CONNECTED/BACKING_OFF/STOPPING` lifecycle: connect,
/// run the single peer connection to completion, then — if `reconnect` is
/// set — wait out a jittered backoff and try again. `stop` cancels both an
/// in-flight backoff wait and an in-flight connection.
pub struct StreamClientEndpoint {
    write_tx: Arc<Mutex<Option<mpsc::UnboundedSender<WriteItem>>>>,
    token: CancellationToken,
}

impl StreamClientEndpoint {
    pub fn start(
        mut transport: Box<dyn Transport>,
        framing: Arc<dyn Framing>,
        reconnect: bool,
        backoff_maximum: Duration,
        events_buffer: usize,
    ) -> (Self, mpsc::Receiver<StreamEvent>) {
        let (events_tx, events_rx) = mpsc::channel(events_buffer);
        let write_tx_slot: Arc<Mutex<Option<mpsc::UnboundedSender<WriteItem>>>> = Arc::new(Mutex::new(None));
        let token = CancellationToken::new();

        let driver_slot = write_tx_slot.clone();
        let driver_token = token.clone();
        tokio::spawn(async move {
            let mut backoff = Backoff::new(backoff_maximum);

            loop {
                if driver_token.is_cancelled() {
                    break;
                }

                let wait = backoff.next_wait();
                if !wait.is_zero() {
                    tokio::select! {
                        _ = tokio::time::sleep(wait) => {}
                        _ = driver_token.cancelled() => break,
                    }
                }
                if driver_token.is_cancelled() {
                    break;
                }

                let (returned_transport, result) = match tokio::task::spawn_blocking(move || {
                    let r = transport.start().and_then(|_| transport.next_connection());
                    (transport, r)
                })
                .await
                {
                    Ok(pair) => pair,
                    Err(_) => break,
                };
                transport = returned_transport;

                let stream = match result {
                    Ok(Some(stream)) => stream,
                    Ok(None) => {
                        if !reconnect {
                            break;
                        }
                        continue;
                    }
                    Err(e) => {
                        tracing::warn!(error = ?e, "connect failed, backing off");
                        if !reconnect {
                            break;
                        }
                        continue;
                    }
                };

                backoff.reset();
                let peer_id = new_peer_id();

                let write_half = match stream.try_clone() {
                    Ok(w) => w,
                    Err(e) => {
                        tracing::error!(error = ?e, "stream does not support duplex cloning, dropping connection");
                        if !reconnect {
                            break;
                        }
                        continue;
                    }
                };

                let (write_tx, write_rx) = mpsc::unbounded_channel::<WriteItem>();
                *driver_slot.lock().unwrap() = Some(write_tx);
                if events_tx.send(StreamEvent::PeerUp { peer_id }).await.is_err() {
                    break;
                }
                tracing::info!(%peer_id, "client connected");

                let writer_framing = framing.clone();
                tokio::task::spawn_blocking(move || run_writer(write_half, write_rx, &*writer_framing));

                let (done_tx, done_rx) = oneshot::channel();
                let reader_framing = framing.clone();
                let reader_events = events_tx.clone();
                tokio::task::spawn_blocking(move || run_client_reader(peer_id, stream, reader_framing, reader_events, done_tx));

                tokio::select! {
                    _ = done_rx => {}
                    _ = driver_token.cancelled() => {
                        *driver_slot.lock().unwrap() = None;
                        break;
                    }
                }
                *driver_slot.lock().unwrap() = None;

                if !reconnect {
                    break;
                }
            }
        });

        (Self { write_tx: write_tx_slot, token }, events_rx)
    }

    pub fn send(&self, data: Vec<u8>, options: FrameOptions) -> Result<(), EndpointError> {
        let guard = self.write_tx.lock().unwrap();
        match guard.as_ref() {
            Some(tx) => tx.send((data, options)).map_err(|_| EndpointError::Undeliverable),
            None => Err(EndpointError::Undeliverable),
        }
    }

    pub fn is_connected(&self) -> bool {
        self.write_tx.lock().unwrap().is_some()
    }

    pub fn stop(&self) {
        self.token.cancel();
        *self.write_tx.lock().unwrap() = None;
    }
}

fn run_client_reader(
    peer_id: PeerId,
    mut stream: Box<dyn TransportStream>,
    framing: Arc<dyn Framing>,
    events_tx: mpsc::Sender<StreamEvent>,
    done_tx: oneshot::Sender<()>,
) {
    let mut buf = Vec::with_capacity(8192);
    let mut tmp = [0u8; 4096];

    'outer: loop {
        loop {
            match framing.decode(&buf) {
                Ok(Some((payload, options, consumed))) => {
                    buf.drain(..consumed);
                    if events_tx.blocking_send(StreamEvent::Message { peer_id, bytes: payload, options }).is_err() {
                        break 'outer;
                    }
                }
                Ok(None) => break,
                Err(e) => {
                    tracing::error!(%peer_id, error = ?e, "framing decode error, disconnecting");
                    break 'outer;
                }
            }
        }

        match stream.read(&mut tmp) {
            Ok(0) => break,
            Ok(n) => buf.extend_from_slice(&tmp[..n]),
            Err(e) => {
                tracing::error!(%peer_id, error = %e, "read error, disconnecting");
                break;
            }
        }
    }

    let _ = events_tx.blocking_send(StreamEvent::PeerDown { peer_id });
    let _ = done_tx.send(());
}

#[cfg(test)]
mod tests {
    use super::*;
    use endpoint_api::Transport;
    use framing::LengthPrefixedFraming;
    use transport::{TcpClientTransport, TcpServerTransport};

    #[tokio::test]
    async fn connects_sends_and_receives() {
        let mut server_transport = TcpServerTransport::new("127.0.0.1:0");
        server_transport.start().unwrap();
        let server_addr = server_transport.local_addr().unwrap();

        let (_server, mut server_events) = crate::stream_server::StreamServerEndpoint::start(
            Box::new(server_transport),
            Arc::new(LengthPrefixedFraming),
            16,
        )
        .unwrap();

        let (client, mut client_events) = StreamClientEndpoint::start(
            Box::new(TcpClientTransport::new(server_addr.to_string())),
            Arc::new(LengthPrefixedFraming),
            false,
            Duration::from_secs(1),
            16,
        );

        let server_peer_up = server_events.recv().await.unwrap();
        assert!(matches!(server_peer_up, StreamEvent::PeerUp { .. }));
        let client_peer_up = client_events.recv().await.unwrap();
        assert!(matches!(client_peer_up, StreamEvent::PeerUp { .. }));

        client.send(b"hello".to_vec(), FrameOptions::default()).unwrap();
        match server_events.recv().await.unwrap() {
            StreamEvent::Message { bytes, .. } => assert_eq!(bytes, b"hello"),
            other => panic!("unexpected event: {other:?}"),
        }
    }
}
