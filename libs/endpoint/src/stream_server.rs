use std::collections::HashMap;
use std::io::{Read, Write};
use std::sync::{Arc, Mutex};

use endpoint_api::{EndpointError, FrameOptions, Framing, PeerId, Transport, TransportStream};
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

use crate::event::{new_peer_id, StreamEvent};

pub(crate) type WriteItem = (Vec<u8>, FrameOptions);

/// Server-mode stream endpoint — spec.md §4.7. Binds a listener via
/// `transport`, instantiates a fresh peer for each accepted connection, and
/// routes outbound sends by peer id (unicast) or to every peer (broadcast,
/// `peer_id = None`). Grounded on `libs/pipeline/src/endpoint.rs`'s
/// transport-acceptor / per-connection blocking-reader structure, with a
/// symmetric blocking writer added per connection for full duplex.
pub struct StreamServerEndpoint {
    peers: Arc<Mutex<HashMap<PeerId, mpsc::UnboundedSender<WriteItem>>>>,
    token: CancellationToken,
}

impl StreamServerEndpoint {
    pub fn start(mut transport: Box<dyn Transport>, framing: Arc<dyn Framing>, events_buffer: usize) -> Result<(Self, mpsc::Receiver<StreamEvent>), EndpointError> {
        transport.start()?;

        let (events_tx, events_rx) = mpsc::channel(events_buffer);
        let peers: Arc<Mutex<HashMap<PeerId, mpsc::UnboundedSender<WriteItem>>>> = Arc::new(Mutex::new(HashMap::new()));
        let token = CancellationToken::new();

        let (conn_tx, mut conn_rx) = mpsc::channel::<Box<dyn TransportStream>>(16);
        let accept_token = token.clone();
        tokio::task::spawn_blocking(move || {
            loop {
                if accept_token.is_cancelled() {
                    break;
                }
                match transport.next_connection() {
                    Ok(Some(stream)) => {
                        if conn_tx.blocking_send(stream).is_err() {
                            break;
                        }
                    }
                    Ok(None) => break,
                    Err(e) => {
                        tracing::error!(error = ?e, "stream server accept error");
                        break;
                    }
                }
            }
            let _ = transport.stop();
        });

        let conn_peers = peers.clone();
        let conn_events = events_tx.clone();
        let conn_token = token.clone();
        tokio::spawn(async move {
            loop {
                tokio::select! {
                    maybe_stream = conn_rx.recv() => {
                        match maybe_stream {
                            Some(stream) => spawn_connection(stream, framing.clone(), conn_peers.clone(), conn_events.clone()).await,
                            None => break,
                        }
                    }
                    _ = conn_token.cancelled() => break,
                }
            }
        });

        Ok((Self { peers, token }, events_rx))
    }

    /// Sends `data` to `peer_id`, or to every connected peer when `None` —
    /// spec.md §4.7.
    pub fn send(&self, peer_id: Option<PeerId>, data: Vec<u8>, options: FrameOptions) -> Result<(), EndpointError> {
        let peers = self.peers.lock().unwrap();
        match peer_id {
            Some(id) => {
                let tx = peers.get(&id).ok_or(EndpointError::Undeliverable)?;
                tx.send((data, options)).map_err(|_| EndpointError::Undeliverable)
            }
            None => {
                for tx in peers.values() {
                    let _ = tx.send((data.clone(), options.clone()));
                }
                Ok(())
            }
        }
    }

    pub fn peer_count(&self) -> usize {
        self.peers.lock().unwrap().len()
    }

    /// Closes the listener (no new peers), then disconnects all peers —
    /// spec.md §4.7. Dropping each peer's writer channel ends its writer
    /// task; its reader task ends on the next read returning EOF.
    pub fn stop(&self) {
        self.token.cancel();
        self.peers.lock().unwrap().clear();
    }
}

async fn spawn_connection(
    stream: Box<dyn TransportStream>,
    framing: Arc<dyn Framing>,
    peers: Arc<Mutex<HashMap<PeerId, mpsc::UnboundedSender<WriteItem>>>>,
    events_tx: mpsc::Sender<StreamEvent>,
) {
    let peer_id = new_peer_id();
    let peer_info = stream.peer_info();

    let write_half = match stream.try_clone() {
        Ok(w) => w,
        Err(e) => {
            tracing::error!(error = ?e, %peer_info, "stream does not support duplex cloning, dropping connection");
            return;
        }
    };

    let (write_tx, write_rx) = mpsc::unbounded_channel::<WriteItem>();
    peers.lock().unwrap().insert(peer_id, write_tx);

    if events_tx.send(StreamEvent::PeerUp { peer_id }).await.is_err() {
        return;
    }
    tracing::info!(%peer_id, %peer_info, "peer connected");

    let writer_framing = framing.clone();
    tokio::task::spawn_blocking(move || run_writer(write_half, write_rx, &*writer_framing));

    let reader_peers = peers.clone();
    let reader_events = events_tx.clone();
    tokio::task::spawn_blocking(move || run_reader(peer_id, stream, &*framing, &reader_events, &reader_peers));
}

pub(crate) fn run_writer(mut stream: Box<dyn TransportStream>, mut rx: mpsc::UnboundedReceiver<WriteItem>, framing: &dyn Framing) {
    while let Some((data, options)) = rx.blocking_recv() {
        let mut buf = Vec::new();
        if let Err(e) = framing.encode(&data, &options, &mut buf) {
            tracing::error!(error = ?e, "framing encode error, closing connection");
            break;
        }
        if let Err(e) = stream.write_all(&buf) {
            tracing::error!(error = %e, "write error, closing connection");
            break;
        }
    }
}

fn run_reader(
    peer_id: PeerId,
    mut stream: Box<dyn TransportStream>,
    framing: &dyn Framing,
    events_tx: &mpsc::Sender<StreamEvent>,
    peers: &Arc<Mutex<HashMap<PeerId, mpsc::UnboundedSender<WriteItem>>>>,
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
                    tracing::error!(%peer_id, error = ?e, "framing decode error, disconnecting peer");
                    break 'outer;
                }
            }
        }

        match stream.read(&mut tmp) {
            Ok(0) => break,
            Ok(n) => buf.extend_from_slice(&tmp[..n]),
            Err(e) => {
                tracing::error!(%peer_id, error = %e, "read error, disconnecting peer");
                break;
            }
        }
    }

    peers.lock().unwrap().remove(&peer_id);
    let _ = events_tx.blocking_send(StreamEvent::PeerDown { peer_id });
}
