//! WebSocket subscribers
//!
//! Each connection to `/ws/traffic` becomes one registered subscriber. The
//! write half of the socket is the subscriber's sink; the read half only
//! watches for the peer going away. A subscriber evicted by the broadcaster
//! has its connection closed here, releasing its connection slot.

use std::fmt::Display;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use axum::extract::ws::{Message, Utf8Bytes, WebSocket, WebSocketUpgrade};
use axum::extract::State;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use bytes::Bytes;
use futures_util::{Sink, SinkExt, StreamExt};
use serde_json::json;
use tokio::sync::Mutex;

use super::state::{AppState, ConnectionPermit};
use crate::error::DeliveryError;
use crate::registry::{SubscriberHandle, SubscriberSink};

/// Upper bound on flushing the close frame to a peer that stopped reading
const CLOSE_TIMEOUT: Duration = Duration::from_secs(1);

/// Sink that writes each payload as one text frame
///
/// The write half is behind an async mutex so concurrent deliveries to the
/// same socket are serialized.
pub struct WebSocketSink<S> {
    sender: Mutex<S>,
}

impl<S> WebSocketSink<S>
where
    S: Sink<Message> + Unpin + Send + 'static,
    S::Error: Display,
{
    /// Wrap the write half of a socket
    pub fn new(sender: S) -> Self {
        Self {
            sender: Mutex::new(sender),
        }
    }

    /// Send a close frame and flush
    pub async fn close(&self) {
        let mut sender = self.sender.lock().await;
        if let Err(e) = sender.close().await {
            tracing::trace!(error = %e, "WebSocket close failed");
        }
    }
}

#[async_trait]
impl<S> SubscriberSink for WebSocketSink<S>
where
    S: Sink<Message> + Unpin + Send + 'static,
    S::Error: Display,
{
    async fn send(&self, payload: Bytes) -> Result<(), DeliveryError> {
        let text = Utf8Bytes::try_from(payload)
            .map_err(|e| DeliveryError::Transport(format!("payload is not UTF-8: {e}")))?;

        let mut sender = self.sender.lock().await;
        sender
            .send(Message::Text(text))
            .await
            .map_err(|e| DeliveryError::Transport(e.to_string()))
    }
}

/// `GET /ws/traffic`
pub async fn upgrade(ws: WebSocketUpgrade, State(state): State<AppState>) -> Response {
    let Some(permit) = state.try_acquire_connection() else {
        tracing::warn!("WebSocket rejected: connection limit reached");
        return (
            StatusCode::SERVICE_UNAVAILABLE,
            Json(json!({"error": "connection limit reached"})),
        )
            .into_response();
    };

    ws.on_upgrade(move |socket| handle_socket(socket, state, permit))
}

async fn handle_socket(socket: WebSocket, state: AppState, _permit: ConnectionPermit) {
    let (sender, mut receiver) = socket.split();
    let sink = Arc::new(WebSocketSink::new(sender));
    let handle = SubscriberHandle::new(Arc::clone(&sink));
    let id = handle.id();

    state.registry.register(handle.clone());
    tracing::info!(
        subscriber = %id,
        subscribers = state.registry.len(),
        "WebSocket subscriber connected"
    );

    let mut closing = state.closing();
    loop {
        tokio::select! {
            msg = receiver.next() => match msg {
                Some(Ok(Message::Close(_))) | None => break,
                Some(Ok(_)) => {}
                Some(Err(e)) => {
                    tracing::debug!(subscriber = %id, error = %e, "WebSocket read error");
                    break;
                }
            },
            _ = closing.changed() => break,
            _ = handle.retired() => {
                tracing::debug!(subscriber = %id, "Subscriber evicted, closing WebSocket");
                break;
            }
        }
    }

    state.registry.unregister(&handle);
    if tokio::time::timeout(CLOSE_TIMEOUT, sink.close()).await.is_err() {
        tracing::debug!(subscriber = %id, "WebSocket close timed out");
    }

    tracing::info!(
        subscriber = %id,
        subscribers = state.registry.len(),
        "WebSocket subscriber disconnected"
    );
}
