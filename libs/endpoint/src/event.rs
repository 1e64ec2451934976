use endpoint_api::{FrameOptions, PeerId};
use rand::Rng;

/// Upward events a stream or datagram endpoint emits, replacing the
/// callback triad `on_peer_up`/`on_peer_down`/`on_message` spec.md §4 names
/// with a channel the caller drains — the natural async-Rust shape for the
/// same protocol.
#[derive(Debug)]
pub enum StreamEvent {
    PeerUp { peer_id: PeerId },
    PeerDown { peer_id: PeerId },
    Message { peer_id: PeerId, bytes: Vec<u8>, options: FrameOptions },
}

pub fn new_peer_id() -> PeerId {
    let bytes: [u8; 5] = rand::thread_rng().gen();
    PeerId::from_bytes(bytes)
}
