use endpoint_api::{DatagramFraming, EndpointError, FrameOptions, Framing};

const HEADER_SIZE: usize = 8;
const MAX_MSG_SIZE: usize = 2usize.pow(31) - 1;

fn read_header(buf: &[u8]) -> (usize, u32) {
    let len = u32::from_le_bytes([buf[0], buf[1], buf[2], buf[3]]) as usize;
    let type_id = u32::from_le_bytes([buf[4], buf[5], buf[6], buf[7]]);
    (len, type_id)
}

/// "mti" framing: an 8-byte little-endian header (4-byte length, 4-byte
/// message type identifier) followed by the payload. Unlike plain
/// length-prefixed framing, `length == 0` is valid — it signals an
/// id-only message with no body — spec.md §4.4. Grounded on
/// `original_source/src/gestalt/comms/stream/protocols/mti.py`'s
/// WAIT_HEADER/WAIT_PAYLOAD state machine.
pub struct MtiFraming;

impl Framing for MtiFraming {
    fn decode(&self, buf: &[u8]) -> Result<Option<(Vec<u8>, FrameOptions, usize)>, EndpointError> {
        if buf.len() < HEADER_SIZE {
            return Ok(None);
        }
        let (len, type_id) = read_header(buf);
        if len > MAX_MSG_SIZE {
            return Err(EndpointError::InvalidFrame(format!("frame length {len} exceeds maximum of {MAX_MSG_SIZE}")));
        }
        if len == 0 {
            return Ok(Some((Vec::new(), FrameOptions { type_id: Some(type_id) }, HEADER_SIZE)));
        }
        let total = HEADER_SIZE + len;
        if buf.len() < total {
            return Ok(None);
        }
        Ok(Some((buf[HEADER_SIZE..total].to_vec(), FrameOptions { type_id: Some(type_id) }, total)))
    }

    fn encode(&self, data: &[u8], options: &FrameOptions, out: &mut Vec<u8>) -> Result<(), EndpointError> {
        if data.len() > MAX_MSG_SIZE {
            return Err(EndpointError::InvalidFrame(format!("frame length {} exceeds maximum of {MAX_MSG_SIZE}", data.len())));
        }
        let type_id = options.type_id.unwrap_or(0);
        out.extend_from_slice(&(data.len() as u32).to_le_bytes());
        out.extend_from_slice(&type_id.to_le_bytes());
        out.extend_from_slice(data);
        Ok(())
    }
}

/// Datagram counterpart — one mti frame per datagram, no buffering.
pub struct MtiDatagramFraming;

impl DatagramFraming for MtiDatagramFraming {
    fn decode(&self, datagram: &[u8]) -> Result<(Vec<u8>, FrameOptions), EndpointError> {
        if datagram.len() < HEADER_SIZE {
            return Err(EndpointError::InvalidFrame("datagram shorter than mti header".into()));
        }
        let (len, type_id) = read_header(datagram);
        if datagram.len() != HEADER_SIZE + len {
            return Err(EndpointError::InvalidFrame("datagram length does not match its header".into()));
        }
        Ok((datagram[HEADER_SIZE..].to_vec(), FrameOptions { type_id: Some(type_id) }))
    }

    fn encode(&self, data: &[u8], options: &FrameOptions) -> Result<Vec<u8>, EndpointError> {
        let type_id = options.type_id.unwrap_or(0);
        let mut out = Vec::with_capacity(HEADER_SIZE + data.len());
        out.extend_from_slice(&(data.len() as u32).to_le_bytes());
        out.extend_from_slice(&type_id.to_le_bytes());
        out.extend_from_slice(data);
        Ok(out)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn round_trips_a_frame_with_type_id() {
        let framing = MtiFraming;
        let mut buf = Vec::new();
        let options = FrameOptions { type_id: Some(42) };
        framing.encode(b"hello", &options, &mut buf).unwrap();
        let (payload, opts, consumed) = framing.decode(&buf).unwrap().unwrap();
        assert_eq!(payload, b"hello");
        assert_eq!(opts.type_id, Some(42));
        assert_eq!(consumed, buf.len());
    }

    #[test]
    fn zero_length_frame_is_an_id_only_signal() {
        let framing = MtiFraming;
        let mut buf = Vec::new();
        let options = FrameOptions { type_id: Some(7) };
        framing.encode(b"", &options, &mut buf).unwrap();
        assert_eq!(buf.len(), HEADER_SIZE);
        let (payload, opts, consumed) = framing.decode(&buf).unwrap().unwrap();
        assert!(payload.is_empty());
        assert_eq!(opts.type_id, Some(7));
        assert_eq!(consumed, HEADER_SIZE);
    }

    #[test]
    fn waits_for_more_bytes() {
        let framing = MtiFraming;
        let mut buf = Vec::new();
        framing.encode(b"hello", &FrameOptions { type_id: Some(1) }, &mut buf).unwrap();
        assert!(framing.decode(&buf[..5]).unwrap().is_none());
    }
}
