use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use compression_registry::CompressionRegistry;
use endpoint_api::EndpointError;
use payload_pipeline::{HeaderValue, Headers};
use serialization_registry::{PayloadValue, SerializationRegistry};
use tokio::sync::oneshot;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

use crate::channel::{Acker, BrokerChannel, BrokerConnection, ExchangeKind, IncomingMessage, OutgoingMessage, QueueSpec};
use crate::lapin_channel::{connect_robust, LapinConnection};
use crate::url::{build_broker_url, BrokerUrlOptions};

const DEFAULT_DLX_NAME: &str = "rpc.dlx";

pub struct RequesterConfig {
    pub amqp_url: Option<String>,
    /// `""` routes through the default exchange, matching a bare
    /// `service_name` routing key straight to a same-named queue.
    pub exchange_name: String,
    pub prefetch_count: u16,
    pub dlx_name: String,
    pub backoff_maximum: Duration,
}

impl Default for RequesterConfig {
    fn default() -> Self {
        Self {
            amqp_url: None,
            exchange_name: String::new(),
            prefetch_count: 1,
            dlx_name: DEFAULT_DLX_NAME.to_string(),
            backoff_maximum: Duration::from_secs(30),
        }
    }
}

type PendingMap = Arc<Mutex<HashMap<String, oneshot::Sender<Result<PayloadValue, EndpointError>>>>>;

/// Initiates request/response calls against a named service queue —
/// spec.md §4.10, grounded in `gestalt/amq/requester.py`. A request that
/// is never consumed within its expiration is returned by the broker
/// through a headers-match dead-letter exchange this requester's response
/// queue is also bound to; its `x-death` marker resolves the pending call
/// with [`EndpointError::Timeout`] instead of a decoded payload. A request
/// sent to a service with no active queue is returned directly by the
/// broker (`mandatory` publish) and resolves with
/// [`EndpointError::Undeliverable`].
pub struct Requester {
    connection: LapinConnection,
    channel: Arc<dyn BrokerChannel>,
    exchange_name: String,
    response_queue: String,
    dlx_name: String,
    pending: PendingMap,
    listener: JoinHandle<()>,
}

impl Requester {
    pub async fn start(
        config: RequesterConfig,
        serializers: Arc<SerializationRegistry>,
        compressors: Arc<CompressionRegistry>,
        token: CancellationToken,
    ) -> Result<Self, EndpointError> {
        let url = config.amqp_url.unwrap_or_else(|| build_broker_url(&BrokerUrlOptions::default()));
        let connection = connect_robust(&url, config.backoff_maximum, &token).await?;
        let channel = connection.channel().await?;
        channel.set_qos(config.prefetch_count).await?;

        if !config.exchange_name.is_empty() {
            channel.declare_exchange(&config.exchange_name, ExchangeKind::Direct, true, false).await?;
        }
        channel.declare_exchange(&config.dlx_name, ExchangeKind::Headers, false, true).await?;

        let spec = QueueSpec { name: None, durable: false, exclusive: true, auto_delete: true, arguments: Headers::new() };
        let response_queue = channel.declare_queue(&spec).await?;

        let mut dlx_match = Headers::new();
        dlx_match.insert("From", HeaderValue::Str(response_queue.clone()));
        dlx_match.insert("x-match", HeaderValue::Str("any".to_string()));
        channel.bind_queue(&response_queue, &config.dlx_name, "", &dlx_match).await?;

        let pending: PendingMap = Arc::new(Mutex::new(HashMap::new()));
        let mut consumer = channel.consume(&response_queue).await?;

        let listener_pending = pending.clone();
        let listener_token = token.clone();
        let listener = tokio::spawn(async move {
            loop {
                let next = tokio::select! {
                    next = consumer.recv() => next,
                    _ = listener_token.cancelled() => break,
                };
                match next {
                    Some(Ok((message, acker))) => {
                        handle_response(&listener_pending, &serializers, &compressors, message, acker).await;
                    }
                    Some(Err(e)) => {
                        tracing::error!(error = ?e, "requester response channel error");
                        break;
                    }
                    None => break,
                }
            }
            discard_pending(&listener_pending);
        });

        Ok(Self { connection, channel, exchange_name: config.exchange_name, response_queue, dlx_name: config.dlx_name, pending, listener })
    }

    /// Sends `value` to `service_name` and awaits the matching response,
    /// or a [`EndpointError::Timeout`]/[`EndpointError::Undeliverable`] —
    /// mirrors `Requester.request`.
    pub async fn request(
        &self,
        serializers: &SerializationRegistry,
        compressors: &CompressionRegistry,
        value: &PayloadValue,
        service_name: &str,
        expiration_ms: Option<u64>,
    ) -> Result<PayloadValue, EndpointError> {
        let correlation_id = Uuid::new_v4().to_string();
        let (tx, rx) = oneshot::channel();
        self.pending.lock().unwrap().insert(correlation_id.clone(), tx);

        let mut headers = Headers::new();
        let (content_type, body) = payload_pipeline::encode(serializers, compressors, value, None, None, None, &mut headers)?;
        headers.insert("From", HeaderValue::Str(self.response_queue.clone()));

        let message = OutgoingMessage {
            body,
            content_type: Some(content_type),
            content_encoding: None,
            headers,
            correlation_id: Some(correlation_id.clone()),
            reply_to: Some(self.response_queue.clone()),
            expiration_ms,
            delivery_mode: 1,
            timestamp: Some(now_epoch_seconds()),
        };

        let returned_pending = self.pending.clone();
        let returned_correlation = correlation_id.clone();
        self.channel.set_return_handler(Arc::new(move |returned: IncomingMessage| {
            if returned.correlation_id.as_deref() == Some(returned_correlation.as_str()) {
                if let Some(tx) = returned_pending.lock().unwrap().remove(&returned_correlation) {
                    let _ = tx.send(Err(EndpointError::Undeliverable));
                }
            }
        }));

        if let Err(e) = self.channel.publish(&self.exchange_name, service_name, message, true).await {
            self.pending.lock().unwrap().remove(&correlation_id);
            return Err(e);
        }

        rx.await.unwrap_or(Err(EndpointError::Cancelled))
    }

    pub async fn stop(&self) -> Result<(), EndpointError> {
        self.listener.abort();
        discard_pending(&self.pending);
        self.channel.unbind_queue(&self.response_queue, &self.dlx_name, "", &Headers::new()).await?;
        self.channel.delete_queue(&self.response_queue).await?;
        self.channel.close().await?;
        self.connection.close().await
    }
}

async fn handle_response(
    pending: &PendingMap,
    serializers: &SerializationRegistry,
    compressors: &CompressionRegistry,
    message: IncomingMessage,
    acker: Box<dyn Acker>,
) {
    if let Err(e) = acker.ack().await {
        tracing::error!(error = ?e, "failed to ack requester response");
    }

    let Some(correlation_id) = message.correlation_id.clone() else {
        tracing::warn!("response message had no correlation_id");
        return;
    };

    let Some(sender) = pending.lock().unwrap().remove(&correlation_id) else {
        tracing::warn!(%correlation_id, "unrecognized correlation_id on response");
        return;
    };

    if message.has_x_death {
        let _ = sender.send(Err(EndpointError::Timeout));
        return;
    }

    let mime_type = message.content_type.clone().unwrap_or_default();
    let result = payload_pipeline::decode(serializers, compressors, &message.body, &mime_type, &message.headers);
    let _ = sender.send(result);
}

fn discard_pending(pending: &PendingMap) {
    for (_, sender) in pending.lock().unwrap().drain() {
        let _ = sender.send(Err(EndpointError::Cancelled));
    }
}

fn now_epoch_seconds() -> u64 {
    std::time::SystemTime::now().duration_since(std::time::UNIX_EPOCH).map(|d| d.as_secs()).unwrap_or(0)
}
