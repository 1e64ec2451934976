use std::collections::HashMap;
use std::sync::Arc;

use endpoint_api::EndpointError;

use crate::codec::CompressionCodec;

struct Entry {
    name: Option<String>,
    mime_type: Option<String>,
    codec: Arc<dyn CompressionCodec>,
}

/// Named byte-to-byte codec registry — spec.md §4.1. `name ↔ mime_type` is a
/// bijection on populated entries; lookups accept either key.
pub struct CompressionRegistry {
    entries: Vec<Entry>,
    by_name: HashMap<String, usize>,
    by_mime: HashMap<String, usize>,
}

impl CompressionRegistry {
    pub fn new() -> Self {
        let mut reg = Self { entries: Vec::new(), by_name: HashMap::new(), by_mime: HashMap::new() };
        reg.register_identity(Arc::new(crate::codec::IdentityCodec));
        reg
    }

    fn register_identity(&mut self, codec: Arc<dyn CompressionCodec>) {
        self.entries.push(Entry { name: None, mime_type: None, codec });
    }

    /// Registers a named codec under both its convenience name and MIME
    /// type. Re-registering an existing name or MIME type replaces the
    /// previous entry, keeping the bijection intact.
    pub fn register(&mut self, name: impl Into<String>, mime_type: impl Into<String>, codec: Arc<dyn CompressionCodec>) {
        let name = name.into();
        let mime_type = mime_type.into();
        let idx = self.entries.len();
        self.entries.push(Entry { name: Some(name.clone()), mime_type: Some(mime_type.clone()), codec });
        self.by_name.insert(name, idx);
        self.by_mime.insert(mime_type, idx);
    }

    fn resolve(&self, name_or_mime: &str) -> Result<&Entry, EndpointError> {
        if let Some(&idx) = self.by_name.get(name_or_mime).or_else(|| self.by_mime.get(name_or_mime)) {
            return Ok(&self.entries[idx]);
        }
        Err(EndpointError::UnknownCodec(name_or_mime.to_string()))
    }

    pub fn get_codec(&self, name_or_mime: &str) -> Result<Arc<dyn CompressionCodec>, EndpointError> {
        self.resolve(name_or_mime).map(|e| e.codec.clone())
    }

    /// Returns `(mime_type, bytes)`; the identity codec reports `mime_type =
    /// None`.
    pub fn compress(&self, data: &[u8], name_or_mime: &str) -> Result<(Option<String>, Vec<u8>), EndpointError> {
        let entry = self.resolve(name_or_mime)?;
        Ok((entry.mime_type.clone(), entry.codec.compress(data)?))
    }

    pub fn decompress(&self, data: &[u8], name_or_mime: &str) -> Result<(Option<String>, Vec<u8>), EndpointError> {
        let entry = self.resolve(name_or_mime)?;
        Ok((entry.mime_type.clone(), entry.codec.decompress(data)?))
    }
}

impl Default for CompressionRegistry {
    fn default() -> Self {
        Self::new()
    }
}

/// Builds a `CompressionRegistry` carrying all eight codecs spec.md §4.1
/// names: identity (built in), zlib, deflate, gzip, bzip2, lzma, brotli,
/// snappy.
pub fn default_registry() -> CompressionRegistry {
    use crate::codec::{Bzip2Codec, BrotliCodec, DeflateFamilyCodec, DeflateFraming, LzmaCodec, SnappyCodec};

    let mut reg = CompressionRegistry::new();
    reg.register(
        "zlib",
        "application/zlib",
        Arc::new(DeflateFamilyCodec { framing: DeflateFraming::Zlib, level: flate2::Compression::default() }),
    );
    reg.register(
        "deflate",
        "application/deflate",
        Arc::new(DeflateFamilyCodec { framing: DeflateFraming::Raw, level: flate2::Compression::default() }),
    );
    reg.register(
        "gzip",
        "application/gzip",
        Arc::new(DeflateFamilyCodec { framing: DeflateFraming::Gzip, level: flate2::Compression::default() }),
    );
    reg.register("bzip2", "application/x-bzip2", Arc::new(Bzip2Codec { level: bzip2::Compression::best() }));
    reg.register("lzma", "application/x-lzma", Arc::new(LzmaCodec { preset: 6 }));
    reg.register("brotli", "application/x-brotli", Arc::new(BrotliCodec { quality: 11 }));
    reg.register("snappy", "application/x-snappy", Arc::new(SnappyCodec));
    reg
}
