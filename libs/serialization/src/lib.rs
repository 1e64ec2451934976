pub mod avro;
pub mod protobuf;
pub mod registry;
pub mod serializer;
pub mod type_registry;
pub mod value;

pub use protobuf::ProtobufSerializer;
pub use registry::{default_registry, SerializationRegistry};
pub use serializer::Serializer;
pub use type_registry::TypeRegistry;
pub use value::PayloadValue;

#[cfg(test)]
mod tests {
    use super::*;
    use endpoint_api::EndpointError;
    use serde_json::json;

    #[test]
    fn raw_round_trips_and_rejects_non_bytes() {
        let reg = default_registry();
        let value = PayloadValue::Bytes(vec![1, 2, 3]);
        let (mime, _, bytes) = reg.dumps(&value, None, None).unwrap();
        assert_eq!(mime, "application/data");
        let decoded = reg.loads(&bytes, &mime, None).unwrap();
        assert_eq!(decoded, value);

        let err = reg.get_codec("raw").unwrap().encode(&PayloadValue::Text("x".into()), None);
        assert!(matches!(err, Err(EndpointError::TypeMismatch(_))));
    }

    #[test]
    fn text_defaults_for_strings() {
        let reg = default_registry();
        let value = PayloadValue::Text("hello".into());
        let (mime, _, bytes) = reg.dumps(&value, None, None).unwrap();
        assert_eq!(mime, "text/plain");
        assert_eq!(reg.loads(&bytes, &mime, None).unwrap(), value);
    }

    #[test]
    fn json_is_the_default_for_structured_values() {
        let reg = default_registry();
        let value = PayloadValue::Json(json!({"latitude": 130.0, "longitude": -30.0, "altitude": 50.0}));
        let (mime, _, bytes) = reg.dumps(&value, None, None).unwrap();
        assert_eq!(mime, "application/json");
        assert_eq!(reg.loads(&bytes, &mime, None).unwrap(), value);
    }

    #[test]
    fn msgpack_and_yaml_round_trip() {
        let reg = default_registry();
        let value = PayloadValue::Json(json!({"a": 1, "b": [1, 2, 3]}));
        for name in ["msgpack", "yaml"] {
            let (mime, _, bytes) = reg.dumps(&value, Some(name), None).unwrap();
            assert_eq!(reg.loads(&bytes, &mime, None).unwrap(), value);
        }
    }

    #[test]
    fn empty_payload_is_returned_unchanged() {
        let reg = default_registry();
        let decoded = reg.loads(&[], "application/json", None).unwrap();
        assert_eq!(decoded, PayloadValue::Bytes(Vec::new()));
    }

    #[test]
    fn unknown_codec_fails() {
        let reg = default_registry();
        assert!(matches!(reg.get_codec("nope"), Err(EndpointError::UnknownCodec(_))));
    }

    #[test]
    fn avro_round_trips_with_registered_schema() {
        let reg = default_registry();
        let schema = apache_avro::Schema::parse_str(
            r#"{"type":"record","name":"Position","fields":[
                {"name":"latitude","type":"double"},
                {"name":"longitude","type":"double"},
                {"name":"altitude","type":"double"}
            ]}"#,
        )
        .unwrap();
        let id = reg.register_avro_type(Some(1), schema);
        let value = PayloadValue::Json(json!({"latitude": 130.0, "longitude": -30.0, "altitude": 50.0}));
        let (mime, _, bytes) = reg.dumps(&value, Some("avro"), Some(id)).unwrap();
        let decoded = reg.loads(&bytes, &mime, Some(id)).unwrap();
        assert_eq!(decoded, value);
    }
}
