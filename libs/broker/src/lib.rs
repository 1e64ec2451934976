//! AMQP-backed pub/sub and request/response messaging — spec.md
//! §4.9-4.10. No direct analog in the teacher (whose topic system is
//! in-process); grounded in `strut_rabbitmq`'s `lapin` delivery idiom and
//! `gestalt/amq`'s producer/consumer/requester/responder sequence.

pub mod channel;
pub mod consumer;
pub mod lapin_channel;
pub mod producer;
pub mod requester;
pub mod responder;
pub mod url;

pub use channel::{Acker, BrokerChannel, BrokerConnection, BrokerConsumer, ExchangeKind, IncomingMessage, OutgoingMessage, QueueSpec};
pub use consumer::{Consumer, ConsumerConfig, MessageHandler};
pub use lapin_channel::{connect_robust, LapinChannel, LapinConnection};
pub use producer::{Producer, ProducerConfig};
pub use requester::{Requester, RequesterConfig};
pub use responder::{RequestHandler, Responder, ResponderConfig};
pub use url::{build_broker_url, BrokerUrlOptions};
