//! Live order-status updates over WebSocket

use axum::{
    extract::{
        ws::{Message, WebSocket, WebSocketUpgrade},
        State,
    },
    response::IntoResponse,
};
use futures::{SinkExt, StreamExt};
use tokio::sync::broadcast::error::RecvError;

use crate::services::notification::{LiveEnvelope, OrderEventHub};
use crate::AppState;

/// GET /orders/events: upgrade and stream `orderStatusUpdate` events
pub async fn order_events(
    State(state): State<AppState>,
    ws: WebSocketUpgrade,
) -> impl IntoResponse {
    let hub = state.order_events.clone();
    ws.on_upgrade(move |socket| stream_events(socket, hub))
}

async fn stream_events(socket: WebSocket, hub: OrderEventHub) {
    let (mut sink, mut stream) = socket.split();
    let mut events = hub.subscribe();

    tracing::debug!(subscribers = hub.subscriber_count(), "Live client connected");

    loop {
        tokio::select! {
            received = events.recv() => match received {
                Ok(event) => {
                    let json = match serde_json::to_string(&LiveEnvelope::order_status(&event)) {
                        Ok(json) => json,
                        Err(e) => {
                            tracing::error!(error = %e, "Failed to encode order event");
                            continue;
                        }
                    };
                    if sink.send(Message::Text(json)).await.is_err() {
                        break;
                    }
                }
                Err(RecvError::Lagged(skipped)) => {
                    tracing::warn!(skipped, "Live client lagged, events dropped");
                }
                Err(RecvError::Closed) => break,
            },
            incoming = stream.next() => match incoming {
                Some(Ok(Message::Close(_))) | None | Some(Err(_)) => break,
                // Clients only listen; anything else they send is ignored
                Some(Ok(_)) => {}
            },
        }
    }

    tracing::debug!("Live client disconnected");
}
