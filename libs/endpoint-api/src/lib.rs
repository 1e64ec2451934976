pub mod error;
pub mod format;
pub mod framing;
pub mod outcome;
pub mod overflow;
pub mod peer;
pub mod transport;

pub use error::EndpointError;
pub use format::{CodecId, ContentEncoding};
pub use framing::{DatagramFraming, FrameOptions, Framing};
pub use outcome::Outcome;
pub use overflow::OverflowPolicy;
pub use peer::PeerId;
pub use transport::{DatagramTransport, Transport, TransportStream};
