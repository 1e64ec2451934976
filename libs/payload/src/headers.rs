use std::collections::HashMap;

/// A single header value — either the schema-bound `x-type-id` (an
/// integer) or the `compression` MIME label (a string) — spec.md §4.3, §6.
#[derive(Debug, Clone, PartialEq)]
pub enum HeaderValue {
    Int(i64),
    Str(String),
}

/// Caller-owned header mapping threaded through the payload pipeline: input
/// to decode (carries the Avro/Protobuf `x-type-id` read off the wire or
/// broker message), output from encode (receives `x-type-id` and
/// `compression`) — spec.md §4.3.
#[derive(Debug, Clone, Default)]
pub struct Headers(HashMap<String, HeaderValue>);

impl Headers {
    pub fn new() -> Self {
        Self(HashMap::new())
    }

    pub fn set_type_id(&mut self, id: u32) {
        self.0.insert("x-type-id".to_string(), HeaderValue::Int(id as i64));
    }

    pub fn type_id(&self) -> Option<u32> {
        match self.0.get("x-type-id") {
            Some(HeaderValue::Int(i)) => Some(*i as u32),
            _ => None,
        }
    }

    pub fn set_compression(&mut self, mime_type: impl Into<String>) {
        self.0.insert("compression".to_string(), HeaderValue::Str(mime_type.into()));
    }

    pub fn compression(&self) -> Option<&str> {
        match self.0.get("compression") {
            Some(HeaderValue::Str(s)) => Some(s.as_str()),
            _ => None,
        }
    }

    pub fn insert(&mut self, key: impl Into<String>, value: HeaderValue) {
        self.0.insert(key.into(), value);
    }

    pub fn get(&self, key: &str) -> Option<&HeaderValue> {
        self.0.get(key)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &HeaderValue)> {
        self.0.iter()
    }
}
