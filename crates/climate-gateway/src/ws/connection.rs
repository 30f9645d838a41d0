use axum::{
    extract::{ws::Message, ws::WebSocket, State, WebSocketUpgrade},
    response::IntoResponse,
};
use climate_protocol::EventFrame;
use futures_util::{SinkExt, StreamExt};
use std::sync::Arc;
use tracing::{debug, info};

use crate::app::AppState;

/// Axum handler: upgrades HTTP to WebSocket at GET /ws/.
pub async fn ws_handler(
    ws: WebSocketUpgrade,
    State(state): State<Arc<AppState>>,
) -> impl IntoResponse {
    ws.on_upgrade(|socket| run_connection(socket, state))
}

/// Per-connection loop. The observer is registered once the upgrade is
/// accepted and removed when either side goes away.
async fn run_connection(socket: WebSocket, state: Arc<AppState>) {
    let (mut sink, mut stream) = socket.split();
    let (tx, mut queue) = state.fanout.queue();
    let conn_id = state.fanout.connect(tx);

    let hello = EventFrame::connected(&conn_id).to_text();
    if sink.send(Message::Text(hello.into())).await.is_err() {
        state.fanout.disconnect(&conn_id);
        return;
    }

    loop {
        tokio::select! {
            msg = stream.next() => {
                match msg {
                    Some(Ok(Message::Ping(data))) => {
                        if sink.send(Message::Pong(data)).await.is_err() {
                            break;
                        }
                    }
                    Some(Ok(Message::Close(_))) | Some(Err(_)) | None => break,
                    // Client payloads carry no meaning on this channel.
                    Some(Ok(_)) => debug!(conn_id = %conn_id, "ignoring client message"),
                }
            }

            outgoing = queue.recv() => {
                match outgoing {
                    Some(text) => {
                        if sink.send(Message::Text(text.into())).await.is_err() {
                            break;
                        }
                    }
                    // Evicted by the fanout.
                    None => break,
                }
            }
        }
    }

    state.fanout.disconnect(&conn_id);
    let _ = sink.close().await;
    info!(conn_id = %conn_id, "WS connection closed");
}
