//! Encode/decode pipeline tying the serialization and compression registries
//! together: serialize a value, optionally compress it, and record what was
//! done in a caller-owned header mapping — spec.md §4.3. Grounded on the
//! teacher's `libs/pipeline/src/endpoint.rs` `decode_frame`/`encode_to_wire`
//! free functions, which compose a fixed codec with a middleware chain; here
//! the codec and middleware are looked up by name in the registries instead
//! of being wired in at compile time.

pub mod headers;

pub use headers::{HeaderValue, Headers};

use compression_registry::CompressionRegistry;
use endpoint_api::EndpointError;
use serialization_registry::{PayloadValue, SerializationRegistry};

/// Serializes `value`, places its `x-type-id` into `headers` when
/// schema-bound, then optionally compresses the result and records the
/// compression MIME type under `headers["compression"]`. Returns the
/// content-type MIME of the serialized form (pre-compression) alongside the
/// final bytes, mirroring `encode_to_wire`'s `(content_type, bytes)` return.
pub fn encode(
    serializers: &SerializationRegistry,
    compressors: &CompressionRegistry,
    value: &PayloadValue,
    serializer_name: Option<&str>,
    type_identifier: Option<u32>,
    compression_name: Option<&str>,
    headers: &mut Headers,
) -> Result<(String, Vec<u8>), EndpointError> {
    if let Some(id) = type_identifier {
        headers.set_type_id(id);
    }
    let (mime_type, _encoding, mut bytes) = serializers.dumps(value, serializer_name, type_identifier)?;
    if let Some(name) = compression_name {
        let (mime, compressed) = compressors.compress(&bytes, name)?;
        bytes = compressed;
        headers.set_compression(mime.unwrap_or_else(|| name.to_string()));
    }
    Ok((mime_type, bytes))
}

/// Reverses `encode`: decompresses `bytes` if `headers` names a
/// `compression`, then deserializes using the codec registered for
/// `mime_type`, passing along the `x-type-id` from `headers` when present —
/// mirrors `decode_frame`'s middleware-then-codec order (the inverse of
/// encode's codec-then-middleware).
pub fn decode(
    serializers: &SerializationRegistry,
    compressors: &CompressionRegistry,
    bytes: &[u8],
    mime_type: &str,
    headers: &Headers,
) -> Result<PayloadValue, EndpointError> {
    let bytes = match headers.compression() {
        Some(name) => compressors.decompress(bytes, name)?.1,
        None => bytes.to_vec(),
    };
    serializers.loads(&bytes, mime_type, headers.type_id())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn round_trips_json_without_compression() {
        let serializers = serialization_registry::default_registry();
        let compressors = compression_registry::default_registry();
        let value = PayloadValue::Json(json!({"a": 1}));
        let mut headers = Headers::new();

        let (mime, bytes) = encode(&serializers, &compressors, &value, None, None, None, &mut headers).unwrap();
        assert_eq!(mime, "application/json");
        assert!(headers.compression().is_none());

        let decoded = decode(&serializers, &compressors, &bytes, &mime, &headers).unwrap();
        assert_eq!(decoded, value);
    }

    #[test]
    fn round_trips_with_compression_header_set() {
        let serializers = serialization_registry::default_registry();
        let compressors = compression_registry::default_registry();
        let value = PayloadValue::Json(json!({"a": [1, 2, 3], "b": "hello"}));
        let mut headers = Headers::new();

        let (mime, bytes) = encode(&serializers, &compressors, &value, None, None, Some("gzip"), &mut headers).unwrap();
        assert_eq!(headers.compression(), Some("application/gzip"));

        let decoded = decode(&serializers, &compressors, &bytes, &mime, &headers).unwrap();
        assert_eq!(decoded, value);
    }

    #[test]
    fn schema_bound_type_identifier_round_trips_through_headers() {
        let serializers = serialization_registry::default_registry();
        let compressors = compression_registry::default_registry();
        let schema = apache_avro::Schema::parse_str(
            r#"{"type":"record","name":"Point","fields":[{"name":"x","type":"long"}]}"#,
        )
        .unwrap();
        let id = serializers.register_avro_type(Some(7), schema);

        let value = PayloadValue::Json(json!({"x": 42}));
        let mut headers = Headers::new();
        let (mime, bytes) = encode(&serializers, &compressors, &value, Some("avro"), Some(id), None, &mut headers).unwrap();
        assert_eq!(headers.type_id(), Some(7));

        let decoded = decode(&serializers, &compressors, &bytes, &mime, &headers).unwrap();
        assert_eq!(decoded, value);
    }
}
