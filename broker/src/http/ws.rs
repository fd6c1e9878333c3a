//! `GET /ws` -- bidirectional full-duplex socket.
//!
//! A single `tokio::select!` loop races the inbound frame (wrapped in a read
//! deadline), the heartbeat ping interval, and the outbound queue, rather
//! than splitting the socket into a separate reader/writer task pair --
//! axum's `WebSocket` doesn't split cleanly without pulling in
//! `futures_util::StreamExt::split`.

use std::time::Duration;

use axum::extract::ws::{Message, WebSocket, WebSocketUpgrade};
use axum::extract::State;
use axum::response::IntoResponse;
use tracing::{debug, warn};

use signer_protocol::WsMessage;

use crate::AppState;

/// Ping interval.
const PING_INTERVAL: Duration = Duration::from_secs(54);
/// Read deadline, extended on each pong.
const READ_DEADLINE: Duration = Duration::from_secs(60);

pub async fn ws_handler(ws: WebSocketUpgrade, State(state): State<AppState>) -> impl IntoResponse {
    ws.on_upgrade(move |socket| handle_socket(socket, state))
}

async fn handle_socket(mut socket: WebSocket, state: AppState) {
    let mut handle = state.socket_hub.register().await;
    let client_id = handle.client_id;
    debug!(client_id = %client_id, "socket client connected");

    let mut ping_interval = tokio::time::interval(PING_INTERVAL);
    ping_interval.tick().await;

    loop {
        tokio::select! {
            frame = tokio::time::timeout(READ_DEADLINE, socket.recv()) => {
                match frame {
                    Ok(Some(Ok(Message::Text(text)))) => {
                        match serde_json::from_str::<WsMessage>(&text) {
                            Ok(WsMessage::Subscribe { uuid }) => {
                                handle.subscribe(uuid).await;
                            }
                            Ok(WsMessage::Heartbeat) => {}
                            Ok(_) => warn!(client_id = %client_id, "unexpected client->server message kind"),
                            Err(e) => warn!(client_id = %client_id, error = %e, "invalid JSON frame"),
                        }
                    }
                    Ok(Some(Ok(Message::Ping(data)))) => {
                        if socket.send(Message::Pong(data)).await.is_err() {
                            break;
                        }
                    }
                    Ok(Some(Ok(Message::Pong(_)))) => {} // read deadline resets on the next select iteration
                    Ok(Some(Ok(Message::Close(_)))) | Ok(None) => {
                        debug!(client_id = %client_id, "socket client closed");
                        break;
                    }
                    Ok(Some(Ok(Message::Binary(_)))) => {
                        warn!(client_id = %client_id, "binary frames are not part of the socket protocol");
                    }
                    Ok(Some(Err(e))) => {
                        warn!(client_id = %client_id, error = %e, "socket read error");
                        break;
                    }
                    Err(_) => {
                        warn!(client_id = %client_id, "no pong within the read deadline");
                        break;
                    }
                }
            }
            _ = ping_interval.tick() => {
                if socket.send(Message::Ping(Vec::new().into())).await.is_err() {
                    break;
                }
            }
            outbound = handle.receiver.recv() => {
                let Some(message) = outbound else { break };
                let Ok(json) = serde_json::to_string(&message) else { continue };
                if socket.send(Message::Text(json.into())).await.is_err() {
                    break;
                }
            }
        }
    }

    state.socket_hub.unregister(client_id).await;
    debug!(client_id = %client_id, "socket client unregistered");
}
