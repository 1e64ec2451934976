/// Convenience name / MIME type pair shared by the compression and
/// serialization registries. Mirrors the teacher's `DataFormat` enum
/// (`libs/api/src/types.rs`) but is generic over any registered name rather
/// than a fixed set of variants, since the spec requires eight compression
/// codecs and seven serializers, open to further registration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CodecId {
    /// `None` is the identity codec (compression) — spec.md §3.
    pub name: Option<String>,
    pub mime_type: Option<String>,
}

impl CodecId {
    pub fn named(name: impl Into<String>, mime_type: impl Into<String>) -> Self {
        Self { name: Some(name.into()), mime_type: Some(mime_type.into()) }
    }

    pub fn identity() -> Self {
        Self { name: None, mime_type: None }
    }
}

/// Whether a serializer's encoded bytes are human-readable text or opaque
/// binary — spec.md §3's `content_encoding`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ContentEncoding {
    Utf8,
    Binary,
}

impl ContentEncoding {
    pub fn as_str(&self) -> &'static str {
        match self {
            ContentEncoding::Utf8 => "utf-8",
            ContentEncoding::Binary => "binary",
        }
    }
}
