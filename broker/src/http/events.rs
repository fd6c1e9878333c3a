//! `GET /events/{id}` -- one-way event stream pinned to a single identifier.
//!
//! The fan-out from the hub's `broadcast::Sender` into the client's SSE
//! stream is relayed through a small spawned task and an `mpsc` channel (the
//! same "hub owns state, connection task only holds a send handle" shape
//! `socket_hub` uses), rather than composing `BroadcastStream` combinators
//! directly, so the heartbeat ticker and the "stop after the terminal event"
//! rule are easy to express with `tokio::select!`.

use std::convert::Infallible;
use std::time::Duration;

use axum::extract::{Path, State};
use axum::response::sse::{Event, KeepAlive, Sse};
use axum::response::{IntoResponse, Response};
use tokio_stream::wrappers::ReceiverStream;
use uuid::Uuid;

use signer_protocol::{error_codes, ConnectedPayload, SignedMetadata, StreamEventName};

use crate::http::response::bad_request;
use crate::AppState;

const HEARTBEAT_INTERVAL: Duration = Duration::from_secs(30);
const OUT_QUEUE_DEPTH: usize = 16;

pub async fn event_stream(State(state): State<AppState>, Path(id): Path<String>) -> Response {
    let id: Uuid = match id.parse() {
        Ok(id) => id,
        Err(_) => return bad_request(error_codes::BAD_IDENTIFIER, "malformed identifier"),
    };

    let (tx_out, rx_out) = tokio::sync::mpsc::channel::<Result<Event, Infallible>>(OUT_QUEUE_DEPTH);

    let consumer_id = Uuid::new_v4();
    let connected = ConnectedPayload { uuid: id, consumer_id };
    let connected_json = serde_json::to_string(&connected).unwrap_or_default();
    let _ = tx_out
        .send(Ok(Event::default().event(StreamEventName::Connected.as_str()).data(connected_json)))
        .await;

    // Already signed at registration time: emit `signed` immediately and
    // close the stream.
    if let Some(request) = state.store.get(id).await {
        if let Some(signed_at) = request.signed_at {
            let metadata = SignedMetadata { uuid: id, success: true, signed_at: signed_at.timestamp() };
            if let Ok(json) = serde_json::to_string(&metadata) {
                let _ = tx_out
                    .send(Ok(Event::default().event(StreamEventName::Signed.as_str()).data(json)))
                    .await;
            }
            drop(tx_out);
            return sse_response(ReceiverStream::new(rx_out));
        }
    }

    let rx = state.event_hub.get_or_create(id).await.subscribe();
    tokio::spawn(forward_events(rx, tx_out));

    sse_response(ReceiverStream::new(rx_out))
}

async fn forward_events(
    mut rx: tokio::sync::broadcast::Receiver<crate::event_hub::StreamEvent>,
    tx_out: tokio::sync::mpsc::Sender<Result<Event, Infallible>>,
) {
    let mut heartbeat = tokio::time::interval(HEARTBEAT_INTERVAL);
    heartbeat.tick().await; // first tick fires immediately; the client just got `connected`.

    loop {
        tokio::select! {
            event = rx.recv() => {
                let Ok(event) = event else { break };
                let terminal = matches!(event.name, StreamEventName::Signed | StreamEventName::Error);
                if tx_out
                    .send(Ok(Event::default().event(event.name.as_str()).data(event.json)))
                    .await
                    .is_err()
                {
                    break;
                }
                if terminal {
                    break;
                }
            }
            _ = heartbeat.tick() => {
                if tx_out
                    .send(Ok(Event::default().event(StreamEventName::Heartbeat.as_str()).data("{}")))
                    .await
                    .is_err()
                {
                    break;
                }
            }
        }
    }
}

fn sse_response(stream: ReceiverStream<Result<Event, Infallible>>) -> Response {
    let mut response = Sse::new(stream).keep_alive(KeepAlive::default()).into_response();
    response.headers_mut().insert(
        axum::http::header::CACHE_CONTROL,
        axum::http::HeaderValue::from_static("no-cache"),
    );
    response
}
