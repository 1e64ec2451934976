/// The value a serializer accepts or produces. Three shapes exist because
/// spec.md §4.2's default-selection rule distinguishes bytes, text, and
/// "everything else" (structured values bound for JSON/msgpack/YAML or a
/// schema-bound format) — a distinction Python's dynamic typing makes at
/// runtime that this enum makes explicit.
#[derive(Debug, Clone, PartialEq)]
pub enum PayloadValue {
    Bytes(Vec<u8>),
    Text(String),
    Json(serde_json::Value),
}

impl PayloadValue {
    /// The `dumps(value)` default-serializer name when none is given —
    /// spec.md §4.2.
    pub fn default_codec_name(&self) -> &'static str {
        match self {
            PayloadValue::Bytes(_) => "raw",
            PayloadValue::Text(_) => "text",
            PayloadValue::Json(_) => "json",
        }
    }

    pub fn as_bytes(&self) -> Option<&[u8]> {
        match self {
            PayloadValue::Bytes(b) => Some(b),
            _ => None,
        }
    }

    pub fn as_text(&self) -> Option<&str> {
        match self {
            PayloadValue::Text(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_json(&self) -> Option<&serde_json::Value> {
        match self {
            PayloadValue::Json(v) => Some(v),
            _ => None,
        }
    }
}

impl From<Vec<u8>> for PayloadValue {
    fn from(v: Vec<u8>) -> Self {
        PayloadValue::Bytes(v)
    }
}

impl From<String> for PayloadValue {
    fn from(v: String) -> Self {
        PayloadValue::Text(v)
    }
}

impl From<serde_json::Value> for PayloadValue {
    fn from(v: serde_json::Value) -> Self {
        PayloadValue::Json(v)
    }
}
