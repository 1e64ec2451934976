use std::fmt;

/// Opaque peer identifier: 5 random bytes rendered as 10 hex characters,
/// assigned at `connection_made` — spec.md §3, §9. Never transmitted on the
/// wire; used only as a routing key in the endpoint's in-memory peer table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct PeerId([u8; 5]);

impl PeerId {
    pub fn from_bytes(bytes: [u8; 5]) -> Self {
        Self(bytes)
    }

    pub fn as_bytes(&self) -> &[u8; 5] {
        &self.0
    }
}

impl fmt::Display for PeerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for b in &self.0 {
            write!(f, "{b:02x}")?;
        }
        Ok(())
    }
}
