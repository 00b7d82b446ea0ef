//! Per-connection bridge between a hub subscription and a duplex transport.

use futures::{Sink, SinkExt, Stream, StreamExt};
use std::fmt::Display;

use super::Hub;

/// Serve one subscriber until either side finishes.
///
/// Registers with `hub`, then runs two loops concurrently: the outbound loop
/// writes every delivered message to `sink` as JSON text, and the inbound loop
/// reads `stream` (client messages are ignored) until it ends or errors.
/// Whichever loop finishes first ends the session, and the subscription is
/// released.
pub async fn serve_subscriber<S, R, T, E>(hub: Hub, sink: S, stream: R)
where
    S: Sink<String>,
    S::Error: Display,
    R: Stream<Item = std::result::Result<T, E>>,
    E: Display,
{
    let subscription = hub.register();
    let id = subscription.id;
    let mut receiver = subscription.receiver;
    let mut sink = std::pin::pin!(sink);
    let mut stream = std::pin::pin!(stream);

    let outbound = async {
        while let Some(message) = receiver.recv().await {
            let text = match message.to_json() {
                Ok(text) => text,
                Err(e) => {
                    tracing::warn!(subscriber_id = %id, error = %e, "Failed to encode message");
                    continue;
                }
            };
            if let Err(e) = sink.as_mut().send(text).await {
                tracing::debug!(subscriber_id = %id, error = %e, "Write to subscriber failed");
                return;
            }
        }
        tracing::debug!(subscriber_id = %id, "Subscriber buffer closed");
    };

    let inbound = async {
        while let Some(frame) = stream.next().await {
            if let Err(e) = frame {
                tracing::debug!(subscriber_id = %id, error = %e, "Read from subscriber failed");
                return;
            }
        }
        tracing::debug!(subscriber_id = %id, "Subscriber disconnected");
    };

    tokio::select! {
        _ = outbound => {}
        _ = inbound => {}
    }

    hub.unregister(id);
    let _ = sink.as_mut().close().await;
}
