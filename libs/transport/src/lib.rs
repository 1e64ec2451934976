pub mod tcp;
pub mod udp;

pub use tcp::{TcpClientTransport, TcpServerTransport};
pub use udp::UdpDatagramTransport;
