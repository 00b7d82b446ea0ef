//! System handlers: health, OpenAPI, live task events.

use crate::api::AppState;
use crate::hub::{Hub, Message, SubscriberId, serve_subscriber};
use axum::{
    Json,
    extract::{
        State,
        ws::{Message as WsMessage, WebSocket, WebSocketUpgrade},
    },
    response::{
        IntoResponse, Response,
        sse::{Event as SseEvent, KeepAlive, Sse},
    },
};
use futures::{SinkExt, future};
use serde_json::json;
use std::convert::Infallible;
use std::pin::Pin;
use std::task::{Context, Poll};
use tokio_stream::wrappers::ReceiverStream;
use tokio_stream::{Stream, StreamExt};

/// GET /health - Health check
#[utoipa::path(
    get,
    path = "/health",
    tag = "system",
    responses(
        (status = 200, description = "Service is healthy")
    )
)]
pub async fn health_check() -> impl IntoResponse {
    Json(json!({
        "status": "ok",
        "version": env!("CARGO_PKG_VERSION")
    }))
}

/// GET /openapi.json - OpenAPI specification
#[utoipa::path(
    get,
    path = "/openapi.json",
    tag = "system",
    responses(
        (status = 200, description = "OpenAPI 3.1 specification in JSON format")
    )
)]
pub async fn openapi_spec() -> impl IntoResponse {
    use crate::api::openapi::ApiDoc;
    use utoipa::OpenApi;

    Json(ApiDoc::openapi())
}

/// GET /ws - WebSocket task event stream
///
/// Every hub message is sent as a JSON text frame
/// `{"id", "event", "data"}`. Frames from the client are read and ignored;
/// the session ends when the client disconnects or falls behind.
#[utoipa::path(
    get,
    path = "/ws",
    tag = "system",
    responses(
        (status = 101, description = "Switching to the WebSocket protocol")
    )
)]
pub async fn websocket(State(state): State<AppState>, ws: WebSocketUpgrade) -> Response {
    let hub = state.manager.hub().clone();
    ws.on_upgrade(move |socket| serve_websocket(hub, socket))
}

async fn serve_websocket(hub: Hub, socket: WebSocket) {
    let (sink, stream) = futures::StreamExt::split(socket);
    let sink = sink.with(|text: String| future::ready(Ok::<_, axum::Error>(WsMessage::Text(text))));
    serve_subscriber(hub, sink, stream).await;
}

/// GET /events - Server-sent task event stream
#[utoipa::path(
    get,
    path = "/events",
    tag = "system",
    responses(
        (status = 200, description = "Server-sent events stream (text/event-stream)", content_type = "text/event-stream")
    )
)]
pub async fn event_stream(
    State(state): State<AppState>,
) -> Sse<impl Stream<Item = Result<SseEvent, Infallible>>> {
    let events = HubEvents::register(state.manager.hub().clone());

    let sse_stream = events.filter_map(|message| match message.to_json() {
        Ok(json_data) => Some(Ok(SseEvent::default()
            .event(message.event.as_str())
            .id(message.id.to_string())
            .data(json_data))),
        Err(e) => {
            tracing::warn!(error = %e, "Failed to serialize hub message");
            None
        }
    });

    Sse::new(sse_stream).keep_alive(KeepAlive::default())
}

/// Hub subscription as a stream; unregisters when the client goes away.
struct HubEvents {
    hub: Hub,
    id: SubscriberId,
    inner: ReceiverStream<Message>,
}

impl HubEvents {
    fn register(hub: Hub) -> Self {
        let subscription = hub.register();
        Self {
            hub,
            id: subscription.id,
            inner: ReceiverStream::new(subscription.receiver),
        }
    }
}

impl Stream for HubEvents {
    type Item = Message;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Message>> {
        Pin::new(&mut self.inner).poll_next(cx)
    }
}

impl Drop for HubEvents {
    fn drop(&mut self) {
        tracing::debug!(subscriber_id = %self.id, "SSE client disconnected");
        self.hub.unregister(self.id);
    }
}
