use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use endpoint_api::EndpointError;
use payload_pipeline::Headers;

/// Exchange kind a queue can be bound to — spec.md §4.9-4.10: `Topic` for
/// pub/sub, `Direct`/default for RPC requests, `Headers` for the RPC
/// timeout dead-letter exchange.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExchangeKind {
    Topic,
    Direct,
    Headers,
    Fanout,
}

/// Declaration arguments for a queue. Leaving `name` unset lets the broker
/// allocate one, mirroring the teacher's exclusive response/service queues.
#[derive(Debug, Clone, Default)]
pub struct QueueSpec {
    pub name: Option<String>,
    pub durable: bool,
    pub exclusive: bool,
    pub auto_delete: bool,
    pub arguments: Headers,
}

/// A message about to be published.
#[derive(Debug, Clone, Default)]
pub struct OutgoingMessage {
    pub body: Vec<u8>,
    pub content_type: Option<String>,
    pub content_encoding: Option<String>,
    pub headers: Headers,
    pub correlation_id: Option<String>,
    pub reply_to: Option<String>,
    /// Message TTL in milliseconds, encoded as the AMQP `expiration`
    /// property — spec.md §4.10's request timeout.
    pub expiration_ms: Option<u64>,
    pub delivery_mode: u8,
    pub timestamp: Option<u64>,
}

/// A message as delivered by the broker, either to a consumer or — for
/// `mandatory` publishes that found no route — returned to the publisher.
#[derive(Debug, Clone, Default)]
pub struct IncomingMessage {
    pub delivery_tag: u64,
    pub exchange: String,
    pub routing_key: String,
    pub redelivered: bool,
    pub body: Vec<u8>,
    pub content_type: Option<String>,
    pub content_encoding: Option<String>,
    pub headers: Headers,
    pub correlation_id: Option<String>,
    pub reply_to: Option<String>,
    /// Set when the broker's `x-death` header is present — spec.md §4.10's
    /// marker for a request returned unprocessed through the DLX.
    pub has_x_death: bool,
}

/// Finalizes a delivery: ack on success, reject (optionally requeued) on
/// failure. Boxed and consumed so a handler can't double-finalize.
pub trait Acker: Send {
    fn ack(self: Box<Self>) -> Pin<Box<dyn Future<Output = Result<(), EndpointError>> + Send>>;
    fn reject(self: Box<Self>, requeue: bool) -> Pin<Box<dyn Future<Output = Result<(), EndpointError>> + Send>>;
}

/// A running subscription; `recv` yields `None` once the broker closes the
/// underlying stream.
pub trait BrokerConsumer: Send {
    #[allow(clippy::type_complexity)]
    fn recv(&mut self) -> Pin<Box<dyn Future<Output = Option<Result<(IncomingMessage, Box<dyn Acker>), EndpointError>>> + Send + '_>>;
}

/// The broker adapter boundary — spec.md §9's "broker adapter boundary",
/// mirroring the narrow `Transport`/`Framing` seams elsewhere in this
/// workspace. `lapin_channel` ships the only concrete implementation.
pub trait BrokerChannel: Send + Sync {
    fn declare_exchange<'a>(
        &'a self,
        name: &'a str,
        kind: ExchangeKind,
        durable: bool,
        auto_delete: bool,
    ) -> Pin<Box<dyn Future<Output = Result<(), EndpointError>> + Send + 'a>>;

    /// Returns the queue's actual name — the broker may have allocated it.
    fn declare_queue<'a>(&'a self, spec: &'a QueueSpec) -> Pin<Box<dyn Future<Output = Result<String, EndpointError>> + Send + 'a>>;

    fn bind_queue<'a>(
        &'a self,
        queue: &'a str,
        exchange: &'a str,
        routing_key: &'a str,
        arguments: &'a Headers,
    ) -> Pin<Box<dyn Future<Output = Result<(), EndpointError>> + Send + 'a>>;

    fn unbind_queue<'a>(
        &'a self,
        queue: &'a str,
        exchange: &'a str,
        routing_key: &'a str,
        arguments: &'a Headers,
    ) -> Pin<Box<dyn Future<Output = Result<(), EndpointError>> + Send + 'a>>;

    fn delete_queue<'a>(&'a self, queue: &'a str) -> Pin<Box<dyn Future<Output = Result<(), EndpointError>> + Send + 'a>>;

    fn set_qos<'a>(&'a self, prefetch_count: u16) -> Pin<Box<dyn Future<Output = Result<(), EndpointError>> + Send + 'a>>;

    /// `mandatory` requests the broker return the message instead of
    /// silently dropping it when no queue is bound — spec.md §4.10's "an
    /// unknown service is returned, not dropped". Delivery of that return
    /// surfaces through [`BrokerChannel::set_return_handler`], not this
    /// future, since the broker reports it asynchronously.
    fn publish<'a>(
        &'a self,
        exchange: &'a str,
        routing_key: &'a str,
        message: OutgoingMessage,
        mandatory: bool,
    ) -> Pin<Box<dyn Future<Output = Result<(), EndpointError>> + Send + 'a>>;

    fn consume<'a>(&'a self, queue: &'a str) -> Pin<Box<dyn Future<Output = Result<Box<dyn BrokerConsumer>, EndpointError>> + Send + 'a>>;

    /// Registers the handler invoked for unroutable `mandatory` publishes.
    /// Synchronous, matching the teacher's on-reconnect/on-close callback
    /// registration style (`add_close_callback`, `add_on_return_callback`).
    fn set_return_handler(&self, handler: Arc<dyn Fn(IncomingMessage) + Send + Sync>);

    fn close<'a>(&'a self) -> Pin<Box<dyn Future<Output = Result<(), EndpointError>> + Send + 'a>>;
}

/// A connection a [`BrokerChannel`] can be opened on.
pub trait BrokerConnection: Send + Sync {
    fn channel<'a>(&'a self) -> Pin<Box<dyn Future<Output = Result<Arc<dyn BrokerChannel>, EndpointError>> + Send + 'a>>;
    fn close<'a>(&'a self) -> Pin<Box<dyn Future<Output = Result<(), EndpointError>> + Send + 'a>>;
}
