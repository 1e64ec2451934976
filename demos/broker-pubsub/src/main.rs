//! Publishes one JSON message to a topic exchange and consumes it back
//! through a second subscription. Needs a reachable AMQP broker — point
//! `RABBITMQ_HOST`/`RABBITMQ_USER`/`RABBITMQ_PASS` at one (defaults to
//! `guest:guest@localhost:5672`).

use std::sync::Arc;
use std::time::Duration;

use broker::{Consumer, ConsumerConfig, Producer, ProducerConfig};
use endpoint_api::Outcome;
use runner::Runner;
use serialization_registry::PayloadValue;
use tokio_util::sync::CancellationToken;

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .init();

    let serializers = Arc::new(serialization_registry::default_registry());
    let compressors = Arc::new(compression_registry::default_registry());
    let token = CancellationToken::new();

    let consumer_config = ConsumerConfig {
        routing_key: "demo.greeting".to_string(),
        ..ConsumerConfig::default()
    };
    let consumer = Consumer::start(consumer_config, &token).await.expect("start consumer");

    let mut runner = Runner::new(Duration::from_secs(2));
    runner.spawn("consumer-loop", {
        let serializers = serializers.clone();
        let compressors = compressors.clone();
        let token = token.clone();
        async move {
            let handler = Arc::new(|value: PayloadValue, _headers: &payload_pipeline::Headers| {
                tracing::info!(?value, "consumed message");
                Outcome::Value(())
            });
            consumer.run(&serializers, &compressors, handler, &token).await?;
            consumer.stop().await
        }
    });

    let producer = Producer::start(ProducerConfig::default(), &token).await.expect("start producer");
    let greeting = PayloadValue::Json(serde_json::json!({"greeting": "hello"}));
    producer
        .publish_message(&serializers, &compressors, &greeting, Some("demo.greeting"), None)
        .await
        .expect("publish greeting");

    tokio::time::sleep(Duration::from_millis(500)).await;
    producer.stop().await.expect("stop producer");

    token.cancel();
    runner.run_until_shutdown::<std::future::Ready<()>>(None).await.expect("shutdown");
}
