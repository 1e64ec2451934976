use std::sync::Arc;
use std::time::Duration;

use compression_registry::CompressionRegistry;
use endpoint_api::{EndpointError, Outcome};
use payload_pipeline::Headers;
use serialization_registry::{PayloadValue, SerializationRegistry};
use tokio_util::sync::CancellationToken;

use crate::channel::{Acker, BrokerChannel, BrokerConnection, ExchangeKind, IncomingMessage, QueueSpec};
use crate::lapin_channel::{connect_robust, LapinConnection};
use crate::url::{build_broker_url, BrokerUrlOptions};

/// User callback invoked for every decoded message — may resolve
/// immediately or return a pending future via [`Outcome`], matching
/// `Consumer.on_message`'s acceptance of a plain or `async` handler.
pub type MessageHandler = Arc<dyn Fn(PayloadValue, &Headers) -> Outcome<()> + Send + Sync>;

pub struct ConsumerConfig {
    pub amqp_url: Option<String>,
    pub exchange_name: String,
    pub routing_key: String,
    pub prefetch_count: u16,
    pub backoff_maximum: Duration,
}

impl Default for ConsumerConfig {
    fn default() -> Self {
        Self {
            amqp_url: None,
            exchange_name: "amq.topic".to_string(),
            routing_key: String::new(),
            prefetch_count: 1,
            backoff_maximum: Duration::from_secs(30),
        }
    }
}

/// Subscribes to a topic exchange through a fresh exclusive, auto-deleted
/// queue — spec.md §4.9, grounded in `gestalt/amq/consumer.py`.
pub struct Consumer {
    connection: LapinConnection,
    channel: Arc<dyn BrokerChannel>,
    queue_name: String,
}

impl Consumer {
    pub async fn start(config: ConsumerConfig, token: &CancellationToken) -> Result<Self, EndpointError> {
        let url = config.amqp_url.unwrap_or_else(|| build_broker_url(&BrokerUrlOptions::default()));
        let connection = connect_robust(&url, config.backoff_maximum, token).await?;
        let channel = connection.channel().await?;
        channel.set_qos(config.prefetch_count).await?;

        let durable = config.exchange_name == "amq.topic";
        channel.declare_exchange(&config.exchange_name, ExchangeKind::Topic, durable, false).await?;

        let spec = QueueSpec { name: None, durable: false, exclusive: true, auto_delete: true, arguments: Headers::new() };
        let queue_name = channel.declare_queue(&spec).await?;
        channel.bind_queue(&queue_name, &config.exchange_name, &config.routing_key, &Headers::new()).await?;

        Ok(Self { connection, channel, queue_name })
    }

    /// Runs `handler` for every message until `token` cancels or the
    /// broker closes the subscription. Acks on every exit path — success,
    /// decode failure, or handler error — mirroring the original's
    /// `async with message.process()` context manager, which acks on
    /// normal exit regardless of whether the inner handler logged and
    /// swallowed an error.
    pub async fn run(
        &self,
        serializers: &SerializationRegistry,
        compressors: &CompressionRegistry,
        handler: MessageHandler,
        token: &CancellationToken,
    ) -> Result<(), EndpointError> {
        let mut consumer = self.channel.consume(&self.queue_name).await?;
        loop {
            let next = tokio::select! {
                next = consumer.recv() => next,
                _ = token.cancelled() => break,
            };
            let (message, acker) = match next {
                Some(Ok(pair)) => pair,
                Some(Err(e)) => {
                    tracing::error!(error = ?e, "consumer channel error");
                    break;
                }
                None => break,
            };
            self.handle_message(serializers, compressors, &handler, message, acker).await;
        }
        Ok(())
    }

    async fn handle_message(
        &self,
        serializers: &SerializationRegistry,
        compressors: &CompressionRegistry,
        handler: &MessageHandler,
        message: IncomingMessage,
        acker: Box<dyn Acker>,
    ) {
        let mime_type = message.content_type.clone().unwrap_or_default();
        match payload_pipeline::decode(serializers, compressors, &message.body, &mime_type, &message.headers) {
            Ok(value) => {
                handler(value, &message.headers).resolve().await;
            }
            Err(e) => {
                tracing::error!(error = ?e, "problem decoding consumed message");
            }
        }
        if let Err(e) = acker.ack().await {
            tracing::error!(error = ?e, "failed to ack consumed message");
        }
    }

    pub async fn stop(&self) -> Result<(), EndpointError> {
        self.channel.delete_queue(&self.queue_name).await?;
        self.channel.close().await?;
        self.connection.close().await
    }
}
