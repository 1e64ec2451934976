use std::sync::Mutex;

use apache_avro::types::Value as AvroValue;
use apache_avro::Schema;
use base64::Engine;
use endpoint_api::{ContentEncoding, EndpointError};

use crate::serializer::Serializer;
use crate::type_registry::TypeRegistry;
use crate::value::PayloadValue;

/// Avro serializer bound to a type-identifier registry of parsed `Schema`s,
/// mirroring the teacher's `codec-avro` plugin's `avro_to_value`/
/// `value_to_avro` conversion but keyed by id instead of one schema fixed at
/// load time.
pub struct AvroSerializer {
    registry: Mutex<TypeRegistry<Schema>>,
}

impl AvroSerializer {
    pub fn new() -> Self {
        Self { registry: Mutex::new(TypeRegistry::new()) }
    }

    pub fn register(&self, id: Option<u32>, schema: Schema) -> u32 {
        self.registry.lock().unwrap().register(id, schema)
    }
}

impl Default for AvroSerializer {
    fn default() -> Self {
        Self::new()
    }
}

impl Serializer for AvroSerializer {
    fn content_encoding(&self) -> ContentEncoding {
        ContentEncoding::Binary
    }

    fn encode(&self, value: &PayloadValue, type_identifier: Option<u32>) -> Result<Vec<u8>, EndpointError> {
        let id = type_identifier.ok_or_else(|| EndpointError::EncodeError("avro serializer requires a type_identifier".into()))?;
        let schema = self
            .registry
            .lock()
            .unwrap()
            .get(id)
            .cloned()
            .ok_or_else(|| EndpointError::UnknownCodec(format!("no avro schema registered for type_id {id}")))?;
        let json = value.as_json().ok_or_else(|| EndpointError::TypeMismatch("avro serializer requires a structured value".into()))?;
        let avro_value = json_to_avro(json, &schema)?;
        apache_avro::to_avro_datum(&schema, avro_value).map_err(|e| EndpointError::EncodeError(e.to_string()))
    }

    fn decode(&self, bytes: &[u8], type_identifier: Option<u32>) -> Result<PayloadValue, EndpointError> {
        let id = type_identifier.ok_or_else(|| EndpointError::DecodeError("avro serializer requires a type_identifier".into()))?;
        let schema = self
            .registry
            .lock()
            .unwrap()
            .get(id)
            .cloned()
            .ok_or_else(|| EndpointError::UnknownCodec(format!("no avro schema registered for type_id {id}")))?;
        let mut reader = bytes;
        let value = apache_avro::from_avro_datum(&schema, &mut reader, None)
            .map_err(|e| EndpointError::DecodeError(e.to_string()))?;
        Ok(PayloadValue::Json(avro_to_json(&value)))
    }
}

/// Recursively converts a decoded `apache_avro::types::Value` into JSON,
/// following the teacher's `avro_to_value` (`plugins/format/avro/src/
/// lib.rs`): numeric kinds map directly, bytes/fixed are base64-encoded,
/// unions recurse into their inner value.
fn avro_to_json(value: &AvroValue) -> serde_json::Value {
    use serde_json::json;
    match value {
        AvroValue::Null => serde_json::Value::Null,
        AvroValue::Boolean(b) => json!(b),
        AvroValue::Int(i) => json!(i),
        AvroValue::Long(i) => json!(i),
        AvroValue::Float(f) => json!(f),
        AvroValue::Double(f) => json!(f),
        AvroValue::Bytes(b) | AvroValue::Fixed(_, b) => json!(base64::engine::general_purpose::STANDARD.encode(b)),
        AvroValue::String(s) | AvroValue::Enum(_, s) => json!(s),
        AvroValue::Union(_, inner) => avro_to_json(inner),
        AvroValue::Array(items) => serde_json::Value::Array(items.iter().map(avro_to_json).collect()),
        AvroValue::Map(map) => {
            let obj = map.iter().map(|(k, v)| (k.clone(), avro_to_json(v))).collect();
            serde_json::Value::Object(obj)
        }
        AvroValue::Record(fields) => {
            let obj = fields.iter().map(|(k, v)| (k.clone(), avro_to_json(v))).collect();
            serde_json::Value::Object(obj)
        }
        AvroValue::Date(d) => json!(d),
        AvroValue::TimeMillis(t) => json!(t),
        AvroValue::TimeMicros(t) => json!(t),
        AvroValue::TimestampMillis(t) | AvroValue::LocalTimestampMillis(t) => json!(t),
        AvroValue::TimestampMicros(t) | AvroValue::LocalTimestampMicros(t) => json!(t),
        AvroValue::Decimal(_) => serde_json::Value::Null,
        AvroValue::BigDecimal(d) => json!(d.to_string()),
        AvroValue::Uuid(u) => json!(u.to_string()),
        AvroValue::Duration(_) => serde_json::Value::Null,
    }
}

/// Converts a JSON value into an `apache_avro::types::Value` matching
/// `schema`, trying each union branch in turn — the teacher's
/// `value_to_avro`.
fn json_to_avro(value: &serde_json::Value, schema: &Schema) -> Result<AvroValue, EndpointError> {
    match schema {
        Schema::Null => Ok(AvroValue::Null),
        Schema::Boolean => value.as_bool().map(AvroValue::Boolean).ok_or_else(|| mismatch("boolean")),
        Schema::Int => value.as_i64().map(|i| AvroValue::Int(i as i32)).ok_or_else(|| mismatch("int")),
        Schema::Long => value.as_i64().map(AvroValue::Long).ok_or_else(|| mismatch("long")),
        Schema::Float => value.as_f64().map(|f| AvroValue::Float(f as f32)).ok_or_else(|| mismatch("float")),
        Schema::Double => value.as_f64().map(AvroValue::Double).ok_or_else(|| mismatch("double")),
        Schema::Bytes | Schema::Fixed(_) => {
            let s = value.as_str().ok_or_else(|| mismatch("base64 bytes"))?;
            let bytes = base64::engine::general_purpose::STANDARD
                .decode(s)
                .map_err(|e| EndpointError::DecodeError(e.to_string()))?;
            Ok(if matches!(schema, Schema::Fixed(_)) {
                AvroValue::Fixed(bytes.len(), bytes)
            } else {
                AvroValue::Bytes(bytes)
            })
        }
        Schema::String | Schema::Uuid => value.as_str().map(|s| AvroValue::String(s.to_string())).ok_or_else(|| mismatch("string")),
        Schema::Array(inner) => {
            let items = value.as_array().ok_or_else(|| mismatch("array"))?;
            let converted = items.iter().map(|v| json_to_avro(v, &inner.items)).collect::<Result<Vec<_>, _>>()?;
            Ok(AvroValue::Array(converted))
        }
        Schema::Map(inner) => {
            let obj = value.as_object().ok_or_else(|| mismatch("map"))?;
            let converted = obj
                .iter()
                .map(|(k, v)| json_to_avro(v, &inner.types).map(|av| (k.clone(), av)))
                .collect::<Result<_, _>>()?;
            Ok(AvroValue::Map(converted))
        }
        Schema::Record(record) => {
            let obj = value.as_object().ok_or_else(|| mismatch("record"))?;
            let fields = record
                .fields
                .iter()
                .map(|f| {
                    let v = obj.get(&f.name).unwrap_or(&serde_json::Value::Null);
                    json_to_avro(v, &f.schema).map(|av| (f.name.clone(), av))
                })
                .collect::<Result<Vec<_>, _>>()?;
            Ok(AvroValue::Record(fields))
        }
        Schema::Union(union) => {
            for (idx, variant) in union.variants().iter().enumerate() {
                if let Ok(converted) = json_to_avro(value, variant) {
                    return Ok(AvroValue::Union(idx as u32, Box::new(converted)));
                }
            }
            Err(mismatch("union"))
        }
        Schema::Enum(e) => {
            let s = value.as_str().ok_or_else(|| mismatch("enum"))?;
            let idx = e.symbols.iter().position(|sym| sym == s).ok_or_else(|| mismatch("enum symbol"))?;
            Ok(AvroValue::Enum(idx as u32, s.to_string()))
        }
        _ => Err(EndpointError::EncodeError(format!("unsupported avro schema variant: {schema:?}"))),
    }
}

fn mismatch(expected: &str) -> EndpointError {
    EndpointError::TypeMismatch(format!("expected a value convertible to avro {expected}"))
}
