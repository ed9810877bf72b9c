//! The push channel: WebSocket delivery of event reports.

use std::sync::Arc;

use axum::{
    extract::{
        ws::{Message, WebSocket},
        Path, State, WebSocketUpgrade,
    },
    response::Response,
    routing::get,
    Router,
};
use futures::{SinkExt, StreamExt};
use tokio::sync::mpsc;

use upsrs_core::ChannelRegistry;

use crate::AppState;

/// Push channel routes.
pub fn routes() -> Router<AppState> {
    Router::new().route("/ws/subscribers/:aet", get(ws_subscriber))
}

/// WebSocket upgrade handler for a subscriber's push channel.
async fn ws_subscriber(
    ws: WebSocketUpgrade,
    State(state): State<AppState>,
    Path(aet): Path<String>,
) -> Response {
    let registry = state.registry.clone();
    ws.on_upgrade(move |socket| serve_push_channel(socket, registry, aet))
}

/// Pump frames from the registry's outbound queue onto the socket and
/// drain (ignore) inbound traffic until the peer goes away.
///
/// Registering the sender half with the registry triggers the connect
/// callbacks, which deliver the subscriber's queued events before any
/// newly generated ones.
async fn serve_push_channel(socket: WebSocket, registry: Arc<ChannelRegistry>, aet: String) {
    let (outbound_tx, mut outbound_rx) = mpsc::unbounded_channel();
    let channel_id = outbound_tx.clone();
    registry.accept(&aet, outbound_tx);

    let (mut sink, mut stream) = socket.split();
    loop {
        tokio::select! {
            frame = outbound_rx.recv() => {
                match frame {
                    Some(frame) => {
                        if let Err(err) = sink.send(Message::Text(frame)).await {
                            tracing::warn!(subscriber = %aet, error = %err, "push write failed");
                            registry.disconnect_channel(&aet, &channel_id);
                            break;
                        }
                    }
                    // The registry replaced this channel with a newer one.
                    None => break,
                }
            }
            inbound = stream.next() => {
                match inbound {
                    Some(Ok(Message::Close(_))) | None => {
                        registry.disconnect_channel(&aet, &channel_id);
                        break;
                    }
                    Some(Ok(_)) => {
                        // Inbound frames carry nothing the event router
                        // needs; consume and move on.
                    }
                    Some(Err(err)) => {
                        tracing::warn!(subscriber = %aet, error = %err, "push read failed");
                        registry.disconnect_channel(&aet, &channel_id);
                        break;
                    }
                }
            }
        }
    }
}
