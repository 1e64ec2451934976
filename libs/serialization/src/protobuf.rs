use std::sync::Mutex;

use endpoint_api::{ContentEncoding, EndpointError};
use prost::Message;
use prost_reflect::{DynamicMessage, MessageDescriptor};

use crate::serializer::Serializer;
use crate::type_registry::TypeRegistry;
use crate::value::PayloadValue;

/// Protobuf serializer bound to a process-wide type-identifier registry of
/// `MessageDescriptor`s, resolved by `prost-reflect` the same way the
/// teacher's `codec-protobuf` plugin resolves a single descriptor at load
/// time — generalized here to many descriptors keyed by id instead of one
/// fixed at construction (spec.md §3, §9).
pub struct ProtobufSerializer {
    registry: Mutex<TypeRegistry<MessageDescriptor>>,
}

impl ProtobufSerializer {
    pub fn new() -> Self {
        Self { registry: Mutex::new(TypeRegistry::new()) }
    }

    /// Registers a message descriptor under `id` (or auto-assigns one).
    pub fn register(&self, id: Option<u32>, descriptor: MessageDescriptor) -> u32 {
        self.registry.lock().unwrap().register(id, descriptor)
    }
}

impl Default for ProtobufSerializer {
    fn default() -> Self {
        Self::new()
    }
}

impl Serializer for ProtobufSerializer {
    fn content_encoding(&self) -> ContentEncoding {
        ContentEncoding::Binary
    }

    fn encode(&self, value: &PayloadValue, type_identifier: Option<u32>) -> Result<Vec<u8>, EndpointError> {
        let id = type_identifier.ok_or_else(|| EndpointError::EncodeError("protobuf serializer requires a type_identifier".into()))?;
        let json = value.as_json().ok_or_else(|| EndpointError::TypeMismatch("protobuf serializer requires a structured value".into()))?;
        let descriptor = self
            .registry
            .lock()
            .unwrap()
            .get(id)
            .cloned()
            .ok_or_else(|| EndpointError::UnknownCodec(format!("no protobuf descriptor registered for type_id {id}")))?;
        let message = DynamicMessage::deserialize(descriptor, json.clone())
            .map_err(|e| EndpointError::EncodeError(e.to_string()))?;
        Ok(message.encode_to_vec())
    }

    fn decode(&self, bytes: &[u8], type_identifier: Option<u32>) -> Result<PayloadValue, EndpointError> {
        let id = type_identifier.ok_or_else(|| EndpointError::DecodeError("protobuf serializer requires a type_identifier".into()))?;
        let descriptor = self
            .registry
            .lock()
            .unwrap()
            .get(id)
            .cloned()
            .ok_or_else(|| EndpointError::UnknownCodec(format!("no protobuf descriptor registered for type_id {id}")))?;
        let message = DynamicMessage::decode(descriptor, bytes).map_err(|e| EndpointError::DecodeError(e.to_string()))?;
        let json = serde_json::to_value(&message).map_err(|e| EndpointError::DecodeError(e.to_string()))?;
        Ok(PayloadValue::Json(json))
    }
}
