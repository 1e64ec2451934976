use endpoint_api::{DatagramFraming, EndpointError, FrameOptions, Framing};

const HEADER_SIZE: usize = 4;
const MAX_MSG_SIZE: usize = 2usize.pow(31) - 1;

/// Length-prefixed framing: a 4-byte little-endian length header followed by
/// the payload. `length == 0` is invalid (distinguishes it from "mti", where
/// a zero-length frame is a valid id-only signal) — spec.md §4.4. Grounded on
/// `plugins/framing/length-prefixed/src/lib.rs`'s WAIT_HEADER/WAIT_PAYLOAD
/// buffered decode loop, narrowed to the spec's fixed 4-byte LE header.
pub struct LengthPrefixedFraming;

impl Framing for LengthPrefixedFraming {
    fn decode(&self, buf: &[u8]) -> Result<Option<(Vec<u8>, FrameOptions, usize)>, EndpointError> {
        if buf.len() < HEADER_SIZE {
            return Ok(None);
        }
        let len = u32::from_le_bytes([buf[0], buf[1], buf[2], buf[3]]) as usize;
        if len == 0 {
            return Err(EndpointError::InvalidFrame("length-prefixed frame length must not be zero".into()));
        }
        if len > MAX_MSG_SIZE {
            return Err(EndpointError::InvalidFrame(format!("frame length {len} exceeds maximum of {MAX_MSG_SIZE}")));
        }
        let total = HEADER_SIZE + len;
        if buf.len() < total {
            return Ok(None);
        }
        Ok(Some((buf[HEADER_SIZE..total].to_vec(), FrameOptions::default(), total)))
    }

    fn encode(&self, data: &[u8], _options: &FrameOptions, out: &mut Vec<u8>) -> Result<(), EndpointError> {
        if data.is_empty() {
            return Err(EndpointError::InvalidFrame("length-prefixed frame length must not be zero".into()));
        }
        if data.len() > MAX_MSG_SIZE {
            return Err(EndpointError::InvalidFrame(format!("frame length {} exceeds maximum of {MAX_MSG_SIZE}", data.len())));
        }
        out.extend_from_slice(&(data.len() as u32).to_le_bytes());
        out.extend_from_slice(data);
        Ok(())
    }
}

/// Datagram counterpart: the length header is redundant (UDP already
/// delivers one datagram per call) but kept for wire compatibility with the
/// stream protocol; a truncated datagram is an error rather than "need more
/// bytes", since there is no next call to supply them.
pub struct LengthPrefixedDatagramFraming;

impl DatagramFraming for LengthPrefixedDatagramFraming {
    fn decode(&self, datagram: &[u8]) -> Result<(Vec<u8>, FrameOptions), EndpointError> {
        if datagram.len() < HEADER_SIZE {
            return Err(EndpointError::InvalidFrame("datagram shorter than length-prefixed header".into()));
        }
        let len = u32::from_le_bytes([datagram[0], datagram[1], datagram[2], datagram[3]]) as usize;
        if len == 0 {
            return Err(EndpointError::InvalidFrame("length-prefixed frame length must not be zero".into()));
        }
        if datagram.len() != HEADER_SIZE + len {
            return Err(EndpointError::InvalidFrame("datagram length does not match its header".into()));
        }
        Ok((datagram[HEADER_SIZE..].to_vec(), FrameOptions::default()))
    }

    fn encode(&self, data: &[u8], _options: &FrameOptions) -> Result<Vec<u8>, EndpointError> {
        if data.is_empty() {
            return Err(EndpointError::InvalidFrame("length-prefixed frame length must not be zero".into()));
        }
        let mut out = Vec::with_capacity(HEADER_SIZE + data.len());
        out.extend_from_slice(&(data.len() as u32).to_le_bytes());
        out.extend_from_slice(data);
        Ok(out)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn round_trips_a_frame() {
        let framing = LengthPrefixedFraming;
        let mut buf = Vec::new();
        framing.encode(b"hello", &FrameOptions::default(), &mut buf).unwrap();
        let (payload, _, consumed) = framing.decode(&buf).unwrap().unwrap();
        assert_eq!(payload, b"hello");
        assert_eq!(consumed, buf.len());
    }

    #[test]
    fn waits_for_more_bytes() {
        let framing = LengthPrefixedFraming;
        let mut buf = Vec::new();
        framing.encode(b"hello", &FrameOptions::default(), &mut buf).unwrap();
        assert!(framing.decode(&buf[..3]).unwrap().is_none());
    }

    #[test]
    fn zero_length_is_invalid() {
        let framing = LengthPrefixedFraming;
        assert!(framing.encode(b"", &FrameOptions::default(), &mut Vec::new()).is_err());
        let header = 0u32.to_le_bytes().to_vec();
        assert!(framing.decode(&header).is_err());
    }

    #[test]
    fn datagram_rejects_truncated_input() {
        let framing = LengthPrefixedDatagramFraming;
        let wire = framing.encode(b"abc", &FrameOptions::default()).unwrap();
        assert!(framing.decode(&wire[..wire.len() - 1]).is_err());
        assert_eq!(framing.decode(&wire).unwrap().0, b"abc");
    }
}
