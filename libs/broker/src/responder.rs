use std::sync::Arc;
use std::time::Duration;

use compression_registry::CompressionRegistry;
use endpoint_api::{EndpointError, Outcome};
use payload_pipeline::Headers;
use serialization_registry::{PayloadValue, SerializationRegistry};
use tokio_util::sync::CancellationToken;

use crate::channel::{BrokerChannel, BrokerConnection, ExchangeKind, IncomingMessage, OutgoingMessage, QueueSpec};
use crate::lapin_channel::{connect_robust, LapinConnection};
use crate::url::{build_broker_url, BrokerUrlOptions};

const DEFAULT_DLX_NAME: &str = "rpc.dlx";

/// User callback producing a response for a request — may resolve
/// immediately or via [`Outcome::Pending`], matching `Responder`'s
/// acceptance of a plain or `async` handler.
pub type RequestHandler = Arc<dyn Fn(PayloadValue, &Headers) -> Outcome<PayloadValue> + Send + Sync>;

pub struct ResponderConfig {
    pub amqp_url: Option<String>,
    pub exchange_name: String,
    pub service_name: String,
    pub prefetch_count: u16,
    pub dlx_name: String,
    pub backoff_maximum: Duration,
}

impl Default for ResponderConfig {
    fn default() -> Self {
        Self {
            amqp_url: None,
            exchange_name: String::new(),
            service_name: String::new(),
            prefetch_count: 1,
            dlx_name: DEFAULT_DLX_NAME.to_string(),
            backoff_maximum: Duration::from_secs(30),
        }
    }
}

/// Serves requests from a non-durable, auto-deleted service queue whose
/// `x-dead-letter-exchange` sends unhandled/expired requests back to the
/// requester — spec.md §4.10, grounded in `gestalt/amq/responder.py`.
pub struct Responder {
    connection: LapinConnection,
    channel: Arc<dyn BrokerChannel>,
    queue_name: String,
}

impl Responder {
    pub async fn start(config: ResponderConfig, token: &CancellationToken) -> Result<Self, EndpointError> {
        let url = config.amqp_url.unwrap_or_else(|| build_broker_url(&BrokerUrlOptions::default()));
        let connection = connect_robust(&url, config.backoff_maximum, token).await?;
        let channel = connection.channel().await?;
        channel.set_qos(config.prefetch_count).await?;

        if !config.exchange_name.is_empty() {
            channel.declare_exchange(&config.exchange_name, ExchangeKind::Direct, true, false).await?;
        }

        let mut arguments = Headers::new();
        arguments.insert("x-dead-letter-exchange", payload_pipeline::HeaderValue::Str(config.dlx_name.clone()));
        let spec = QueueSpec { name: Some(config.service_name.clone()), durable: false, exclusive: false, auto_delete: true, arguments };
        let queue_name = channel.declare_queue(&spec).await?;

        if !config.exchange_name.is_empty() {
            channel.bind_queue(&queue_name, &config.exchange_name, &config.service_name, &Headers::new()).await?;
        }

        Ok(Self { connection, channel, queue_name })
    }

    /// Serves requests until `token` cancels or the broker closes the
    /// subscription — mirrors `Responder._on_request_message`: decode
    /// failures and handler errors reject the message without requeue so
    /// it routes to the dead-letter exchange; a successful response is
    /// published to the request's `reply_to` with the original
    /// `correlation_id`/`delivery_mode` copied across, then the original
    /// request is acked last.
    pub async fn run(
        &self,
        serializers: &SerializationRegistry,
        compressors: &CompressionRegistry,
        handler: RequestHandler,
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
                    tracing::error!(error = ?e, "responder channel error");
                    break;
                }
                None => break,
            };

            let Some(reply_to) = message.reply_to.clone() else {
                tracing::warn!("received request without reply_to, acking and dropping");
                let _ = acker.ack().await;
                continue;
            };

            let mime_type = message.content_type.clone().unwrap_or_default();
            let decoded = payload_pipeline::decode(serializers, compressors, &message.body, &mime_type, &message.headers);
            let value = match decoded {
                Ok(value) => value,
                Err(e) => {
                    tracing::error!(error = ?e, "problem decoding request payload");
                    let _ = acker.reject(false).await;
                    continue;
                }
            };

            let response = handler(value, &message.headers).resolve().await;

            let mut response_headers = Headers::new();
            let encoded = payload_pipeline::encode(serializers, compressors, &response, None, None, None, &mut response_headers);
            let (content_type, body) = match encoded {
                Ok(pair) => pair,
                Err(e) => {
                    tracing::error!(error = ?e, "error encoding response payload");
                    let _ = acker.reject(false).await;
                    continue;
                }
            };

            let response_message = OutgoingMessage {
                body,
                content_type: Some(content_type),
                content_encoding: None,
                headers: response_headers,
                correlation_id: message.correlation_id.clone(),
                reply_to: None,
                expiration_ms: None,
                delivery_mode: 1,
                timestamp: Some(now_epoch_seconds()),
            };

            if let Err(e) = self.channel.publish("", &reply_to, response_message, false).await {
                tracing::error!(error = ?e, "failed to send response");
                let _ = acker.reject(false).await;
                continue;
            }

            if let Err(e) = acker.ack().await {
                tracing::error!(error = ?e, "failed to ack served request");
            }
        }
        Ok(())
    }

    pub async fn stop(&self) -> Result<(), EndpointError> {
        self.channel.delete_queue(&self.queue_name).await?;
        self.channel.close().await?;
        self.connection.close().await
    }
}

fn now_epoch_seconds() -> u64 {
    std::time::SystemTime::now().duration_since(std::time::UNIX_EPOCH).map(|d| d.as_secs()).unwrap_or(0)
}
