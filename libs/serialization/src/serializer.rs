use endpoint_api::{ContentEncoding, EndpointError};

use crate::value::PayloadValue;

/// A named value-to-bytes codec — spec.md §4.2. `type_identifier` is only
/// consulted by the schema-bound codecs (Protobuf, Avro); the others ignore
/// it.
pub trait Serializer: Send + Sync {
    fn content_encoding(&self) -> ContentEncoding;
    fn encode(&self, value: &PayloadValue, type_identifier: Option<u32>) -> Result<Vec<u8>, EndpointError>;
    fn decode(&self, bytes: &[u8], type_identifier: Option<u32>) -> Result<PayloadValue, EndpointError>;
}

/// Passes bytes through unchanged. Any non-`Bytes` value is a
/// `TypeMismatch` — spec.md §4.1's identity-codec rule, reused here for the
/// raw serializer which plays the same role in the serialization registry.
pub struct RawSerializer;

impl Serializer for RawSerializer {
    fn content_encoding(&self) -> ContentEncoding {
        ContentEncoding::Binary
    }

    fn encode(&self, value: &PayloadValue, _type_identifier: Option<u32>) -> Result<Vec<u8>, EndpointError> {
        match value {
            PayloadValue::Bytes(b) => Ok(b.clone()),
            _ => Err(EndpointError::TypeMismatch("raw serializer requires a byte sequence".into())),
        }
    }

    fn decode(&self, bytes: &[u8], _type_identifier: Option<u32>) -> Result<PayloadValue, EndpointError> {
        if bytes.is_empty() {
            return Ok(PayloadValue::Bytes(Vec::new()));
        }
        Ok(PayloadValue::Bytes(bytes.to_vec()))
    }
}

/// UTF-8 text passthrough.
pub struct TextSerializer;

impl Serializer for TextSerializer {
    fn content_encoding(&self) -> ContentEncoding {
        ContentEncoding::Utf8
    }

    fn encode(&self, value: &PayloadValue, _type_identifier: Option<u32>) -> Result<Vec<u8>, EndpointError> {
        match value {
            PayloadValue::Text(s) => Ok(s.clone().into_bytes()),
            _ => Err(EndpointError::TypeMismatch("text serializer requires a string".into())),
        }
    }

    fn decode(&self, bytes: &[u8], _type_identifier: Option<u32>) -> Result<PayloadValue, EndpointError> {
        if bytes.is_empty() {
            return Ok(PayloadValue::Text(String::new()));
        }
        let s = std::str::from_utf8(bytes).map_err(|e| EndpointError::DecodeError(e.to_string()))?;
        Ok(PayloadValue::Text(s.to_string()))
    }
}

/// JSON via `serde_json`, matching the teacher's `codec-json` plugin.
pub struct JsonSerializer;

impl Serializer for JsonSerializer {
    fn content_encoding(&self) -> ContentEncoding {
        ContentEncoding::Utf8
    }

    fn encode(&self, value: &PayloadValue, _type_identifier: Option<u32>) -> Result<Vec<u8>, EndpointError> {
        let json = value.as_json().ok_or_else(|| EndpointError::TypeMismatch("json serializer requires a structured value".into()))?;
        serde_json::to_vec(json).map_err(|e| EndpointError::EncodeError(e.to_string()))
    }

    fn decode(&self, bytes: &[u8], _type_identifier: Option<u32>) -> Result<PayloadValue, EndpointError> {
        if bytes.is_empty() {
            return Ok(PayloadValue::Bytes(Vec::new()));
        }
        let value: serde_json::Value = serde_json::from_slice(bytes).map_err(|e| EndpointError::DecodeError(e.to_string()))?;
        Ok(PayloadValue::Json(value))
    }
}

/// MessagePack via `rmp-serde`.
pub struct MsgpackSerializer;

impl Serializer for MsgpackSerializer {
    fn content_encoding(&self) -> ContentEncoding {
        ContentEncoding::Binary
    }

    fn encode(&self, value: &PayloadValue, _type_identifier: Option<u32>) -> Result<Vec<u8>, EndpointError> {
        let json = value.as_json().ok_or_else(|| EndpointError::TypeMismatch("msgpack serializer requires a structured value".into()))?;
        rmp_serde::to_vec(json).map_err(|e| EndpointError::EncodeError(e.to_string()))
    }

    fn decode(&self, bytes: &[u8], _type_identifier: Option<u32>) -> Result<PayloadValue, EndpointError> {
        if bytes.is_empty() {
            return Ok(PayloadValue::Bytes(Vec::new()));
        }
        let value: serde_json::Value = rmp_serde::from_slice(bytes).map_err(|e| EndpointError::DecodeError(e.to_string()))?;
        Ok(PayloadValue::Json(value))
    }
}

/// YAML via `serde_yaml`.
pub struct YamlSerializer;

impl Serializer for YamlSerializer {
    fn content_encoding(&self) -> ContentEncoding {
        ContentEncoding::Utf8
    }

    fn encode(&self, value: &PayloadValue, _type_identifier: Option<u32>) -> Result<Vec<u8>, EndpointError> {
        let json = value.as_json().ok_or_else(|| EndpointError::TypeMismatch("yaml serializer requires a structured value".into()))?;
        serde_yaml::to_string(json).map(String::into_bytes).map_err(|e| EndpointError::EncodeError(e.to_string()))
    }

    fn decode(&self, bytes: &[u8], _type_identifier: Option<u32>) -> Result<PayloadValue, EndpointError> {
        if bytes.is_empty() {
            return Ok(PayloadValue::Bytes(Vec::new()));
        }
        let value: serde_json::Value = serde_yaml::from_slice(bytes).map_err(|e| EndpointError::DecodeError(e.to_string()))?;
        Ok(PayloadValue::Json(value))
    }
}
