use crate::error::EndpointError;

/// Message options that ride alongside a frame, carried upward from the
/// framing protocol to the endpoint and down again on send. The `type_id`
/// field is populated only by the length+id ("mti") protocol.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FrameOptions {
    pub type_id: Option<u32>,
}

/// A stateless stream framing protocol: recovers message boundaries from an
/// ordered byte stream. `decode` never blocks and never allocates beyond the
/// returned frame; callers keep accumulating bytes into `buf` and calling
/// `decode` until it returns `Ok(None)`, exactly the teacher's
/// `length-prefixed`/`lines` framing plugins.
pub trait Framing: Send + Sync {
    /// Attempts to recover one frame from the front of `buf`. Returns
    /// `Some((payload, options, consumed))` when a full frame is present —
    /// the caller must drain `consumed` bytes from the front of its buffer
    /// before calling again (a single call may have more than one frame
    /// waiting, so callers loop).
    fn decode(&self, buf: &[u8]) -> Result<Option<(Vec<u8>, FrameOptions, usize)>, EndpointError>;

    /// Appends the framed encoding of `data` (header plus payload, or
    /// payload plus delimiter) to `out`.
    fn encode(&self, data: &[u8], options: &FrameOptions, out: &mut Vec<u8>) -> Result<(), EndpointError>;
}

/// The datagram counterpart: one call wraps/unwraps exactly one datagram,
/// with no buffering across calls (UDP is already message-oriented).
pub trait DatagramFraming: Send + Sync {
    fn decode(&self, datagram: &[u8]) -> Result<(Vec<u8>, FrameOptions), EndpointError>;
    fn encode(&self, data: &[u8], options: &FrameOptions) -> Result<Vec<u8>, EndpointError>;
}
