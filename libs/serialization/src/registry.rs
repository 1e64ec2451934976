use std::collections::HashMap;
use std::sync::Arc;

use endpoint_api::{ContentEncoding, EndpointError};

use crate::avro::AvroSerializer;
use crate::protobuf::ProtobufSerializer;
use crate::serializer::{JsonSerializer, MsgpackSerializer, RawSerializer, Serializer, TextSerializer, YamlSerializer};
use crate::value::PayloadValue;

struct Entry {
    name: String,
    mime_type: String,
    content_encoding: ContentEncoding,
    serializer: Arc<dyn Serializer>,
}

/// Named value-to-bytes codec registry — spec.md §4.2. Shape mirrors
/// `compression_registry::CompressionRegistry`; `dumps`/`loads` add the
/// default-selection and empty-payload rules spec.md §4.2 specifies.
pub struct SerializationRegistry {
    entries: Vec<Entry>,
    by_name: HashMap<String, usize>,
    by_mime: HashMap<String, usize>,
    default_name: String,
    /// Kept alongside `entries` so callers can register Protobuf
    /// descriptors/Avro schemas after construction without downcasting the
    /// trait object — spec.md §3's type-identifier registry needs a
    /// concrete handle, not just `Arc<dyn Serializer>`.
    protobuf: Option<Arc<ProtobufSerializer>>,
    avro: Option<Arc<AvroSerializer>>,
}

impl SerializationRegistry {
    pub fn new(default_name: impl Into<String>) -> Self {
        Self {
            entries: Vec::new(),
            by_name: HashMap::new(),
            by_mime: HashMap::new(),
            default_name: default_name.into(),
            protobuf: None,
            avro: None,
        }
    }

    /// Registers a Protobuf message descriptor under `id` (or auto-assigns
    /// one). Panics if no `protobuf` codec is registered — call after
    /// `default_registry()`, which always includes one.
    pub fn register_protobuf_type(&self, id: Option<u32>, descriptor: prost_reflect::MessageDescriptor) -> u32 {
        self.protobuf.as_ref().expect("protobuf codec not registered").register(id, descriptor)
    }

    /// Registers an Avro schema under `id` (or auto-assigns one).
    pub fn register_avro_type(&self, id: Option<u32>, schema: apache_avro::Schema) -> u32 {
        self.avro.as_ref().expect("avro codec not registered").register(id, schema)
    }

    pub fn register(&mut self, name: impl Into<String>, mime_type: impl Into<String>, content_encoding: ContentEncoding, serializer: Arc<dyn Serializer>) {
        let name = name.into();
        let mime_type = mime_type.into();
        let idx = self.entries.len();
        self.entries.push(Entry { name: name.clone(), mime_type: mime_type.clone(), content_encoding, serializer });
        self.by_name.insert(name, idx);
        self.by_mime.insert(mime_type, idx);
    }

    fn resolve_by_name(&self, name: &str) -> Result<&Entry, EndpointError> {
        self.by_name.get(name).map(|&i| &self.entries[i]).ok_or_else(|| EndpointError::UnknownCodec(name.to_string()))
    }

    fn resolve_by_mime(&self, mime_type: &str) -> Result<&Entry, EndpointError> {
        self.by_mime.get(mime_type).map(|&i| &self.entries[i]).ok_or_else(|| EndpointError::UnknownCodec(mime_type.to_string()))
    }

    pub fn get_codec(&self, name_or_mime: &str) -> Result<Arc<dyn Serializer>, EndpointError> {
        self.resolve_by_name(name_or_mime).or_else(|_| self.resolve_by_mime(name_or_mime)).map(|e| e.serializer.clone())
    }

    /// Encodes `value`, selecting a serializer by `name` if given, else by
    /// `value`'s shape, else the registry's configured default — spec.md
    /// §4.2. Returns `(mime_type, content_encoding, bytes)`.
    pub fn dumps(&self, value: &PayloadValue, name: Option<&str>, type_identifier: Option<u32>) -> Result<(String, ContentEncoding, Vec<u8>), EndpointError> {
        let name = name.unwrap_or_else(|| match value {
            PayloadValue::Bytes(_) => "raw",
            PayloadValue::Text(_) => "text",
            PayloadValue::Json(_) => self.default_name.as_str(),
        });
        let entry = self.resolve_by_name(name)?;
        let bytes = entry.serializer.encode(value, type_identifier)?;
        Ok((entry.mime_type.clone(), entry.content_encoding, bytes))
    }

    /// Decodes `bytes` using the serializer registered under `mime_type`.
    /// An empty payload returns empty bytes unchanged, without dispatching
    /// to any serializer — spec.md §4.2.
    pub fn loads(&self, bytes: &[u8], mime_type: &str, type_identifier: Option<u32>) -> Result<PayloadValue, EndpointError> {
        if bytes.is_empty() {
            return Ok(PayloadValue::Bytes(Vec::new()));
        }
        let entry = self.resolve_by_mime(mime_type)?;
        entry.serializer.decode(bytes, type_identifier)
    }
}

/// Builds a `SerializationRegistry` carrying all seven codecs spec.md §4.2
/// names: raw, text, json (default), msgpack, yaml, protobuf, avro.
pub fn default_registry() -> SerializationRegistry {
    let mut reg = SerializationRegistry::new("json");
    reg.register("raw", "application/data", ContentEncoding::Binary, Arc::new(RawSerializer));
    reg.register("text", "text/plain", ContentEncoding::Utf8, Arc::new(TextSerializer));
    reg.register("json", "application/json", ContentEncoding::Utf8, Arc::new(JsonSerializer));
    reg.register("msgpack", "application/msgpack", ContentEncoding::Binary, Arc::new(MsgpackSerializer));
    reg.register("yaml", "application/yaml", ContentEncoding::Utf8, Arc::new(YamlSerializer));
    let protobuf = Arc::new(ProtobufSerializer::new());
    reg.register("protobuf", "application/protobuf", ContentEncoding::Binary, protobuf.clone());
    reg.protobuf = Some(protobuf);

    let avro = Arc::new(AvroSerializer::new());
    reg.register("avro", "application/avro", ContentEncoding::Binary, avro.clone());
    reg.avro = Some(avro);

    reg
}
