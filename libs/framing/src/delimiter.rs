use endpoint_api::{DatagramFraming, EndpointError, FrameOptions, Framing};

/// Delimiter framing: messages are separated by an arbitrary byte sequence
/// (not just `\n`) — spec.md §4.4. Grounded on
/// `plugins/framing/lines/src/lib.rs`'s buffer-scan decode loop, generalized
/// from a single `\n` byte to an arbitrary `delimiter` sequence via
/// `windows(delimiter.len())`.
pub struct DelimiterFraming {
    pub delimiter: Vec<u8>,
}

impl DelimiterFraming {
    pub fn new(delimiter: impl Into<Vec<u8>>) -> Result<Self, EndpointError> {
        let delimiter = delimiter.into();
        if delimiter.is_empty() {
            return Err(EndpointError::InvalidConfiguration("delimiter must not be empty".into()));
        }
        Ok(Self { delimiter })
    }

    fn find(&self, buf: &[u8]) -> Option<usize> {
        buf.windows(self.delimiter.len()).position(|w| w == self.delimiter.as_slice())
    }
}

impl Default for DelimiterFraming {
    fn default() -> Self {
        Self { delimiter: vec![b'\n'] }
    }
}

impl Framing for DelimiterFraming {
    fn decode(&self, buf: &[u8]) -> Result<Option<(Vec<u8>, FrameOptions, usize)>, EndpointError> {
        match self.find(buf) {
            Some(pos) => Ok(Some((buf[..pos].to_vec(), FrameOptions::default(), pos + self.delimiter.len()))),
            None => Ok(None),
        }
    }

    fn encode(&self, data: &[u8], _options: &FrameOptions, out: &mut Vec<u8>) -> Result<(), EndpointError> {
        out.extend_from_slice(data);
        out.extend_from_slice(&self.delimiter);
        Ok(())
    }
}

/// Datagram counterpart: a datagram missing its trailing delimiter, or
/// carrying more than one, is malformed — there is no buffering across
/// calls to recover a partial frame.
pub struct DelimiterDatagramFraming {
    pub delimiter: Vec<u8>,
}

impl DatagramFraming for DelimiterDatagramFraming {
    fn decode(&self, datagram: &[u8]) -> Result<(Vec<u8>, FrameOptions), EndpointError> {
        if !datagram.ends_with(self.delimiter.as_slice()) {
            return Err(EndpointError::InvalidFrame("datagram missing its trailing delimiter".into()));
        }
        let payload = &datagram[..datagram.len() - self.delimiter.len()];
        if payload.windows(self.delimiter.len()).any(|w| w == self.delimiter.as_slice()) {
            return Err(EndpointError::InvalidFrame("datagram contains more than one delimited frame".into()));
        }
        Ok((payload.to_vec(), FrameOptions::default()))
    }

    fn encode(&self, data: &[u8], _options: &FrameOptions) -> Result<Vec<u8>, EndpointError> {
        let mut out = data.to_vec();
        out.extend_from_slice(&self.delimiter);
        Ok(out)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn splits_on_multi_byte_delimiter() {
        let framing = DelimiterFraming::new(b"\r\n\r\n".to_vec()).unwrap();
        let mut buf = Vec::new();
        framing.encode(b"first", &FrameOptions::default(), &mut buf).unwrap();
        framing.encode(b"second", &FrameOptions::default(), &mut buf).unwrap();

        let (first, _, consumed1) = framing.decode(&buf).unwrap().unwrap();
        assert_eq!(first, b"first");
        let (second, _, consumed2) = framing.decode(&buf[consumed1..]).unwrap().unwrap();
        assert_eq!(second, b"second");
        assert_eq!(consumed1 + consumed2, buf.len());
    }

    #[test]
    fn retains_a_trailing_partial_frame() {
        let framing = DelimiterFraming::default();
        let mut buf = Vec::new();
        framing.encode(b"complete", &FrameOptions::default(), &mut buf).unwrap();
        buf.extend_from_slice(b"partial-no-delimiter");

        let (first, _, consumed) = framing.decode(&buf).unwrap().unwrap();
        assert_eq!(first, b"complete");
        assert!(framing.decode(&buf[consumed..]).unwrap().is_none());
    }

    #[test]
    fn rejects_empty_delimiter() {
        assert!(DelimiterFraming::new(Vec::new()).is_err());
    }
}
