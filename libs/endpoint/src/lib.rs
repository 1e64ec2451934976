pub mod backoff;
pub mod datagram;
pub mod event;
pub mod stream_client;
pub mod stream_server;

pub use backoff::Backoff;
pub use datagram::DatagramEndpoint;
pub use event::{new_peer_id, StreamEvent};
pub use stream_client::StreamClientEndpoint;
pub use stream_server::StreamServerEndpoint;
