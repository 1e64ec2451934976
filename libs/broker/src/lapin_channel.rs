use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::time::Duration;

use endpoint_api::EndpointError;
use futures_util::StreamExt;
use lapin::message::Delivery;
use lapin::options::{
    BasicAckOptions, BasicConsumeOptions, BasicPublishOptions, BasicQosOptions, BasicRejectOptions, ExchangeDeclareOptions, QueueBindOptions,
    QueueDeclareOptions, QueueDeleteOptions, QueueUnbindOptions,
};
use lapin::types::{AMQPValue, FieldTable, LongString, ShortString};
use lapin::{BasicProperties, Connection, ConnectionProperties};
use payload_pipeline::{HeaderValue, Headers};
use tokio_util::sync::CancellationToken;

use crate::channel::{Acker, BrokerChannel, BrokerConnection, BrokerConsumer, ExchangeKind, IncomingMessage, OutgoingMessage, QueueSpec};

fn to_endpoint_error(e: lapin::Error) -> EndpointError {
    EndpointError::Io(std::io::Error::other(e.to_string()))
}

fn headers_to_field_table(headers: &Headers) -> FieldTable {
    let mut table = FieldTable::default();
    for (key, value) in headers.iter() {
        let amqp_value = match value {
            HeaderValue::Int(i) => AMQPValue::LongLongInt(*i),
            HeaderValue::Str(s) => AMQPValue::LongString(LongString::from(s.clone())),
        };
        table.insert(ShortString::from(key.clone()), amqp_value);
    }
    table
}

fn field_table_to_headers(table: &FieldTable) -> Headers {
    let mut headers = Headers::new();
    for (key, value) in table.inner().iter() {
        let header_value = match value {
            AMQPValue::LongLongInt(i) => Some(HeaderValue::Int(*i)),
            AMQPValue::LongInt(i) => Some(HeaderValue::Int(*i as i64)),
            AMQPValue::ShortInt(i) => Some(HeaderValue::Int(*i as i64)),
            AMQPValue::LongString(s) => Some(HeaderValue::Str(s.to_string())),
            AMQPValue::ShortString(s) => Some(HeaderValue::Str(s.to_string())),
            AMQPValue::Boolean(b) => Some(HeaderValue::Str(b.to_string())),
            _ => None,
        };
        if let Some(header_value) = header_value {
            headers.insert(key.to_string(), header_value);
        }
    }
    headers
}

fn incoming_message_from_delivery(delivery: &Delivery) -> IncomingMessage {
    let headers = delivery.properties.headers().as_ref().map(field_table_to_headers).unwrap_or_default();
    IncomingMessage {
        delivery_tag: delivery.delivery_tag,
        exchange: delivery.exchange.to_string(),
        routing_key: delivery.routing_key.to_string(),
        redelivered: delivery.redelivered,
        body: delivery.data.clone(),
        content_type: delivery.properties.content_type().as_ref().map(|s| s.to_string()),
        content_encoding: delivery.properties.content_encoding().as_ref().map(|s| s.to_string()),
        has_x_death: delivery.properties.headers().as_ref().is_some_and(|t| t.inner().contains_key(&ShortString::from("x-death"))),
        headers,
        correlation_id: delivery.properties.correlation_id().as_ref().map(|s| s.to_string()),
        reply_to: delivery.properties.reply_to().as_ref().map(|s| s.to_string()),
    }
}

fn incoming_message_from_return(returned: &lapin::message::BasicReturnMessage) -> IncomingMessage {
    let headers = returned.properties.headers().as_ref().map(field_table_to_headers).unwrap_or_default();
    IncomingMessage {
        delivery_tag: 0,
        exchange: returned.exchange.to_string(),
        routing_key: returned.routing_key.to_string(),
        redelivered: false,
        body: returned.data.clone(),
        content_type: returned.properties.content_type().as_ref().map(|s| s.to_string()),
        content_encoding: returned.properties.content_encoding().as_ref().map(|s| s.to_string()),
        has_x_death: false,
        headers,
        correlation_id: returned.properties.correlation_id().as_ref().map(|s| s.to_string()),
        reply_to: returned.properties.reply_to().as_ref().map(|s| s.to_string()),
    }
}

struct LapinAcker(lapin::acker::Acker);

impl Acker for LapinAcker {
    fn ack(self: Box<Self>) -> Pin<Box<dyn Future<Output = Result<(), EndpointError>> + Send>> {
        Box::pin(async move { self.0.ack(BasicAckOptions::default()).await.map_err(to_endpoint_error) })
    }

    fn reject(self: Box<Self>, requeue: bool) -> Pin<Box<dyn Future<Output = Result<(), EndpointError>> + Send>> {
        Box::pin(async move { self.0.reject(BasicRejectOptions { requeue }).await.map_err(to_endpoint_error) })
    }
}

struct LapinConsumer {
    inner: lapin::Consumer,
}

impl BrokerConsumer for LapinConsumer {
    fn recv(&mut self) -> Pin<Box<dyn Future<Output = Option<Result<(IncomingMessage, Box<dyn Acker>), EndpointError>>> + Send + '_>> {
        Box::pin(async move {
            match self.inner.next().await {
                Some(Ok(delivery)) => {
                    let message = incoming_message_from_delivery(&delivery);
                    let acker: Box<dyn Acker> = Box::new(LapinAcker(delivery.acker));
                    Some(Ok((message, acker)))
                }
                Some(Err(e)) => Some(Err(to_endpoint_error(e))),
                None => None,
            }
        })
    }
}

/// `lapin`-backed [`BrokerChannel`] — the workspace's only AMQP client
/// usage, grounded in `strut_rabbitmq`'s `Delivery`/`Acker` idiom.
pub struct LapinChannel {
    inner: lapin::Channel,
}

impl LapinChannel {
    pub fn new(inner: lapin::Channel) -> Self {
        Self { inner }
    }
}

impl BrokerChannel for LapinChannel {
    fn declare_exchange<'a>(
        &'a self,
        name: &'a str,
        kind: ExchangeKind,
        durable: bool,
        auto_delete: bool,
    ) -> Pin<Box<dyn Future<Output = Result<(), EndpointError>> + Send + 'a>> {
        Box::pin(async move {
            let kind = match kind {
                ExchangeKind::Topic => lapin::ExchangeKind::Topic,
                ExchangeKind::Direct => lapin::ExchangeKind::Direct,
                ExchangeKind::Headers => lapin::ExchangeKind::Headers,
                ExchangeKind::Fanout => lapin::ExchangeKind::Fanout,
            };
            self.inner
                .exchange_declare(name, kind, ExchangeDeclareOptions { durable, auto_delete, ..Default::default() }, FieldTable::default())
                .await
                .map_err(to_endpoint_error)
        })
    }

    fn declare_queue<'a>(&'a self, spec: &'a QueueSpec) -> Pin<Box<dyn Future<Output = Result<String, EndpointError>> + Send + 'a>> {
        Box::pin(async move {
            let name = spec.name.clone().unwrap_or_default();
            let arguments = headers_to_field_table(&spec.arguments);
            let queue = self
                .inner
                .queue_declare(
                    &name,
                    QueueDeclareOptions { durable: spec.durable, exclusive: spec.exclusive, auto_delete: spec.auto_delete, ..Default::default() },
                    arguments,
                )
                .await
                .map_err(to_endpoint_error)?;
            Ok(queue.name().to_string())
        })
    }

    fn bind_queue<'a>(
        &'a self,
        queue: &'a str,
        exchange: &'a str,
        routing_key: &'a str,
        arguments: &'a Headers,
    ) -> Pin<Box<dyn Future<Output = Result<(), EndpointError>> + Send + 'a>> {
        Box::pin(async move {
            self.inner
                .queue_bind(queue, exchange, routing_key, QueueBindOptions::default(), headers_to_field_table(arguments))
                .await
                .map_err(to_endpoint_error)
        })
    }

    fn unbind_queue<'a>(
        &'a self,
        queue: &'a str,
        exchange: &'a str,
        routing_key: &'a str,
        arguments: &'a Headers,
    ) -> Pin<Box<dyn Future<Output = Result<(), EndpointError>> + Send + 'a>> {
        Box::pin(async move {
            self.inner
                .queue_unbind(queue, exchange, routing_key, headers_to_field_table(arguments))
                .await
                .map_err(to_endpoint_error)
        })
    }

    fn delete_queue<'a>(&'a self, queue: &'a str) -> Pin<Box<dyn Future<Output = Result<(), EndpointError>> + Send + 'a>> {
        Box::pin(async move {
            self.inner.queue_delete(queue, QueueDeleteOptions::default()).await.map_err(to_endpoint_error)?;
            Ok(())
        })
    }

    fn set_qos<'a>(&'a self, prefetch_count: u16) -> Pin<Box<dyn Future<Output = Result<(), EndpointError>> + Send + 'a>> {
        Box::pin(async move { self.inner.basic_qos(prefetch_count, BasicQosOptions::default()).await.map_err(to_endpoint_error) })
    }

    fn publish<'a>(
        &'a self,
        exchange: &'a str,
        routing_key: &'a str,
        message: OutgoingMessage,
        mandatory: bool,
    ) -> Pin<Box<dyn Future<Output = Result<(), EndpointError>> + Send + 'a>> {
        Box::pin(async move {
            let mut properties = BasicProperties::default()
                .with_delivery_mode(message.delivery_mode)
                .with_headers(headers_to_field_table(&message.headers));
            if let Some(ct) = &message.content_type {
                properties = properties.with_content_type(ShortString::from(ct.clone()));
            }
            if let Some(ce) = &message.content_encoding {
                properties = properties.with_content_encoding(ShortString::from(ce.clone()));
            }
            if let Some(cid) = &message.correlation_id {
                properties = properties.with_correlation_id(ShortString::from(cid.clone()));
            }
            if let Some(rt) = &message.reply_to {
                properties = properties.with_reply_to(ShortString::from(rt.clone()));
            }
            if let Some(exp) = message.expiration_ms {
                properties = properties.with_expiration(ShortString::from(exp.to_string()));
            }
            if let Some(ts) = message.timestamp {
                properties = properties.with_timestamp(ts);
            }

            let confirm = self
                .inner
                .basic_publish(exchange, routing_key, BasicPublishOptions { mandatory, immediate: false }, &message.body, properties)
                .await
                .map_err(to_endpoint_error)?;
            confirm.await.map_err(to_endpoint_error)?;
            Ok(())
        })
    }

    fn consume<'a>(&'a self, queue: &'a str) -> Pin<Box<dyn Future<Output = Result<Box<dyn BrokerConsumer>, EndpointError>> + Send + 'a>> {
        Box::pin(async move {
            let consumer = self
                .inner
                .basic_consume(queue, "", BasicConsumeOptions::default(), FieldTable::default())
                .await
                .map_err(to_endpoint_error)?;
            Ok(Box::new(LapinConsumer { inner: consumer }) as Box<dyn BrokerConsumer>)
        })
    }

    fn set_return_handler(&self, handler: Arc<dyn Fn(IncomingMessage) + Send + Sync>) {
        self.inner.on_return(move |returned| {
            handler(incoming_message_from_return(&returned));
        });
    }

    fn close<'a>(&'a self) -> Pin<Box<dyn Future<Output = Result<(), EndpointError>> + Send + 'a>> {
        Box::pin(async move { self.inner.close(200, "normal shutdown").await.map_err(to_endpoint_error) })
    }
}

/// A live AMQP connection. One per producer/consumer/requester/responder,
/// matching the teacher's one-connection-per-component pattern.
pub struct LapinConnection {
    inner: Connection,
}

impl LapinConnection {
    pub async fn connect(url: &str) -> Result<Self, EndpointError> {
        let inner = Connection::connect(url, ConnectionProperties::default()).await.map_err(to_endpoint_error)?;
        Ok(Self { inner })
    }
}

impl BrokerConnection for LapinConnection {
    fn channel<'a>(&'a self) -> Pin<Box<dyn Future<Output = Result<Arc<dyn BrokerChannel>, EndpointError>> + Send + 'a>> {
        Box::pin(async move {
            let channel = self.inner.create_channel().await.map_err(to_endpoint_error)?;
            Ok(Arc::new(LapinChannel::new(channel)) as Arc<dyn BrokerChannel>)
        })
    }

    fn close<'a>(&'a self) -> Pin<Box<dyn Future<Output = Result<(), EndpointError>> + Send + 'a>> {
        Box::pin(async move { self.inner.close(200, "normal shutdown").await.map_err(to_endpoint_error) })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn header_values_round_trip_through_field_table() {
        let mut headers = Headers::new();
        headers.set_type_id(7);
        headers.set_compression("application/gzip");
        headers.insert("From", HeaderValue::Str("amq.gen-response-queue".to_string()));

        let table = headers_to_field_table(&headers);
        let round_tripped = field_table_to_headers(&table);

        assert_eq!(round_tripped.type_id(), Some(7));
        assert_eq!(round_tripped.compression(), Some("application/gzip"));
        assert_eq!(round_tripped.get("From"), Some(&HeaderValue::Str("amq.gen-response-queue".to_string())));
    }

    #[test]
    fn dlx_match_headers_are_preserved_as_strings() {
        let mut headers = Headers::new();
        headers.insert("x-match", HeaderValue::Str("any".to_string()));

        let table = headers_to_field_table(&headers);
        let round_tripped = field_table_to_headers(&table);

        assert_eq!(round_tripped.get("x-match"), Some(&HeaderValue::Str("any".to_string())));
    }
}

/// Connects with a jittered reconnect backoff in place of `aio_pika`'s
/// `connect_robust`, reusing the same [`endpoint::Backoff`] the stream
/// client endpoint drives its reconnect loop with — spec.md §4.9's
/// `reconnect_interval`, generalized to the workspace's shared backoff
/// formula.
pub async fn connect_robust(url: &str, backoff_maximum: Duration, token: &CancellationToken) -> Result<LapinConnection, EndpointError> {
    let mut backoff = endpoint::Backoff::new(backoff_maximum);
    loop {
        if token.is_cancelled() {
            return Err(EndpointError::Cancelled);
        }
        match LapinConnection::connect(url).await {
            Ok(connection) => return Ok(connection),
            Err(e) => {
                tracing::warn!(error = ?e, "broker connect failed, backing off");
                tokio::select! {
                    _ = tokio::time::sleep(backoff.next_wait()) => {}
                    _ = token.cancelled() => return Err(EndpointError::Cancelled),
                }
            }
        }
    }
}
