use std::net::SocketAddr;

use axum::{
    extract::ws::{Message, WebSocket, WebSocketUpgrade},
    extract::{ConnectInfo, State},
    response::IntoResponse,
    routing::get,
    Router,
};
use futures::{SinkExt, StreamExt};
use tracing::{debug, info};

use crate::relay::Relay;

/// Connection lifecycle as reported in logs. Only `Open` connections are
/// registered and receive broadcasts.
#[derive(Debug, Clone, Copy)]
enum ConnectionState {
    Connecting,
    Open,
    Closed(CloseReason),
}

#[derive(Debug, Clone, Copy)]
enum CloseReason {
    Normal,
    Error,
}

/// WebSocket endpoint for subscribers, on `/` and `/ws`.
///
/// Must be served with `into_make_service_with_connect_info::<SocketAddr>()`.
pub fn router(relay: Relay) -> Router {
    Router::new()
        .route("/", get(ws_handler))
        .route("/ws", get(ws_handler))
        .with_state(relay)
}

async fn ws_handler(
    State(relay): State<Relay>,
    ConnectInfo(peer): ConnectInfo<SocketAddr>,
    ws: WebSocketUpgrade,
) -> impl IntoResponse {
    debug!(%peer, state = ?ConnectionState::Connecting, "subscriber upgrading");
    ws.on_upgrade(move |socket| handle_ws(relay, socket, Some(peer)))
}

/// Serve one subscriber until it disconnects, fails a write or is evicted.
pub async fn handle_ws(relay: Relay, socket: WebSocket, peer: Option<SocketAddr>) {
    let (mut sender, mut receiver) = socket.split();

    let mut subscription = relay.subscribe(peer);
    let id = subscription.id();
    info!(
        subscriber = %id,
        ?peer,
        state = ?ConnectionState::Open,
        subscribers = relay.subscriber_count(),
        "subscriber connected"
    );

    // Forward queued frames. The subscription moves in here so the entry
    // leaves the registry as soon as this task ends or is aborted.
    let mut send_task = tokio::spawn(async move {
        while let Some(frame) = subscription.recv().await {
            if let Err(err) = sender.send(Message::Binary(frame.into_bytes())).await {
                debug!(subscriber = %id, "send failed: {err}");
                return CloseReason::Error;
            }
        }
        // Queue closed: the registry evicted us.
        let _ = sender.close().await;
        CloseReason::Error
    });

    // Client messages are not part of the protocol; log and move on.
    let mut recv_task = tokio::spawn(async move {
        while let Some(msg) = receiver.next().await {
            match msg {
                Ok(Message::Text(text)) => {
                    debug!(subscriber = %id, "received: {}", text.as_str());
                }
                Ok(Message::Binary(bin)) => {
                    debug!(subscriber = %id, bytes = bin.len(), "received binary message");
                }
                Ok(Message::Close(_)) => return CloseReason::Normal,
                Ok(Message::Ping(_)) | Ok(Message::Pong(_)) => {}
                Err(err) => {
                    debug!(subscriber = %id, "receive failed: {err}");
                    return CloseReason::Error;
                }
            }
        }
        CloseReason::Normal
    });

    let reason = tokio::select! {
        reason = &mut send_task => {
            recv_task.abort();
            reason.unwrap_or(CloseReason::Error)
        }
        reason = &mut recv_task => {
            send_task.abort();
            // Wait for the abort so the subscription is dropped before we report.
            let _ = (&mut send_task).await;
            reason.unwrap_or(CloseReason::Error)
        }
    };

    info!(
        subscriber = %id,
        state = ?ConnectionState::Closed(reason),
        subscribers = relay.subscriber_count(),
        "subscriber disconnected"
    );
}
