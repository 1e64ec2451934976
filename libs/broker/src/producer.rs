use std::sync::Arc;
use std::time::Duration;

use compression_registry::CompressionRegistry;
use endpoint_api::EndpointError;
use payload_pipeline::Headers;
use serialization_registry::{PayloadValue, SerializationRegistry};
use tokio_util::sync::CancellationToken;

use crate::channel::{BrokerChannel, BrokerConnection, ExchangeKind, OutgoingMessage};
use crate::lapin_channel::{connect_robust, LapinConnection};
use crate::url::{build_broker_url, BrokerUrlOptions};

/// Configuration for [`Producer::start`]. `amqp_url: None` falls back to
/// [`build_broker_url`] with default options.
pub struct ProducerConfig {
    pub amqp_url: Option<String>,
    pub exchange_name: String,
    pub routing_key: String,
    pub serializer_name: Option<String>,
    pub compression_name: Option<String>,
    pub backoff_maximum: Duration,
}

impl Default for ProducerConfig {
    fn default() -> Self {
        Self {
            amqp_url: None,
            exchange_name: "amq.topic".to_string(),
            routing_key: String::new(),
            serializer_name: None,
            compression_name: None,
            backoff_maximum: Duration::from_secs(30),
        }
    }
}

/// Publishes messages to a topic exchange — spec.md §4.9, grounded in
/// `gestalt/amq/producer.py`.
pub struct Producer {
    connection: LapinConnection,
    channel: Arc<dyn BrokerChannel>,
    exchange_name: String,
    routing_key: String,
    serializer_name: Option<String>,
    compression_name: Option<String>,
}

impl Producer {
    pub async fn start(config: ProducerConfig, token: &CancellationToken) -> Result<Self, EndpointError> {
        let url = config.amqp_url.unwrap_or_else(|| build_broker_url(&BrokerUrlOptions::default()));
        let connection = connect_robust(&url, config.backoff_maximum, token).await?;
        let channel = connection.channel().await?;

        let durable = config.exchange_name == "amq.topic";
        channel.declare_exchange(&config.exchange_name, ExchangeKind::Topic, durable, false).await?;

        Ok(Self {
            connection,
            channel,
            exchange_name: config.exchange_name,
            routing_key: config.routing_key,
            serializer_name: config.serializer_name,
            compression_name: config.compression_name,
        })
    }

    /// Runs the payload pipeline over `value` and publishes the result,
    /// defaulting to this producer's routing key when `routing_key` is
    /// `None` — mirrors `Producer.publish_message`. Publishes
    /// non-mandatory: an unroutable message is silently dropped by the
    /// broker, matching the original's "don't care if no routes are
    /// actively consuming".
    pub async fn publish_message(
        &self,
        serializers: &SerializationRegistry,
        compressors: &CompressionRegistry,
        value: &PayloadValue,
        routing_key: Option<&str>,
        type_identifier: Option<u32>,
    ) -> Result<(), EndpointError> {
        let mut headers = Headers::new();
        let (content_type, body) = payload_pipeline::encode(
            serializers,
            compressors,
            value,
            self.serializer_name.as_deref(),
            type_identifier,
            self.compression_name.as_deref(),
            &mut headers,
        )?;

        let message = OutgoingMessage {
            body,
            content_type: Some(content_type),
            content_encoding: None,
            headers,
            correlation_id: None,
            reply_to: None,
            expiration_ms: None,
            delivery_mode: 1,
            timestamp: Some(now_epoch_seconds()),
        };

        self.channel.publish(&self.exchange_name, routing_key.unwrap_or(&self.routing_key), message, false).await
    }

    pub async fn stop(&self) -> Result<(), EndpointError> {
        self.channel.close().await?;
        self.connection.close().await
    }
}

fn now_epoch_seconds() -> u64 {
    std::time::SystemTime::now().duration_since(std::time::UNIX_EPOCH).map(|d| d.as_secs()).unwrap_or(0)
}
