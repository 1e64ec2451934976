//! Spins up a length-prefixed TCP stream endpoint server, connects a
//! client endpoint to it, round-trips one JSON payload through the
//! serialization/compression pipeline, and shuts down via `Runner`.

use std::sync::Arc;
use std::time::Duration;

use endpoint_api::FrameOptions;
use endpoint::{StreamClientEndpoint, StreamServerEndpoint};
use framing::LengthPrefixedFraming;
use payload_pipeline::Headers;
use runner::Runner;
use serialization_registry::PayloadValue;
use transport::{TcpClientTransport, TcpServerTransport};

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .init();

    let serializers = Arc::new(serialization_registry::default_registry());
    let compressors = Arc::new(compression_registry::default_registry());

    let server_transport = Box::new(TcpServerTransport::new("127.0.0.1:17321"));
    let framing = Arc::new(LengthPrefixedFraming::default());
    let (server, mut server_events) = StreamServerEndpoint::start(server_transport, framing.clone(), 16)
        .expect("bind stream-echo-demo server");

    let mut runner = Runner::new(Duration::from_secs(2));

    runner.spawn("server-echo", {
        let serializers = serializers.clone();
        let compressors = compressors.clone();
        async move {
            while let Some(event) = server_events.recv().await {
                if let endpoint::StreamEvent::Message { peer_id, bytes, .. } = event {
                    let value = payload_pipeline::decode(&serializers, &compressors, &bytes, "application/json", &Headers::new())?;
                    tracing::info!(%peer_id, ?value, "server received");
                    let _ = server.send(Some(peer_id), bytes, FrameOptions::default());
                }
            }
            Ok(())
        }
    });

    let client_transport = Box::new(TcpClientTransport::new("127.0.0.1:17321"));
    let (client, mut client_events) = StreamClientEndpoint::start(client_transport, framing, false, Duration::from_secs(5), 16);

    let mut headers = Headers::new();
    let greeting = PayloadValue::Json(serde_json::json!({"greeting": "hello"}));
    let (_, bytes) = payload_pipeline::encode(&serializers, &compressors, &greeting, None, None, None, &mut headers)
        .expect("encode greeting");
    client.send(bytes, FrameOptions::default()).expect("send greeting");

    if let Some(endpoint::StreamEvent::Message { bytes, .. }) = client_events.recv().await {
        let echoed = payload_pipeline::decode(&serializers, &compressors, &bytes, "application/json", &Headers::new())
            .expect("decode echo");
        tracing::info!(?echoed, "client received echo");
    }

    client.stop();
    let token = runner.token();
    token.cancel();
    runner.run_until_shutdown::<std::future::Ready<()>>(None).await.expect("shutdown");
}
