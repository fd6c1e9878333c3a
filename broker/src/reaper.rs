//! Schedules the one-shot expiry timer for a pending signing request.
//!
//! On fire: take the store's write lock just long enough to remove the
//! entry, release it, then broadcast an `expired`/`error` event on both
//! hubs. The store lock is never held across the broadcast.

use std::time::Duration;

use signer_protocol::{error_codes, ErrorPayload, StreamEventName, WsMessage};
use uuid::Uuid;

use crate::event_hub::StreamEvent;
use crate::store::ReapOutcome;
use crate::AppState;

pub fn schedule(state: AppState, id: Uuid, timeout: Duration) {
    tokio::spawn(async move {
        tokio::time::sleep(timeout).await;
        if state.store.reap(id).await == ReapOutcome::Reaped {
            tracing::info!(uuid = %id, "signing request expired");
            let payload = ErrorPayload {
                uuid: id,
                code: error_codes::EXPIRED.to_owned(),
                reason: "signing request expired".to_owned(),
            };
            state
                .socket_hub
                .broadcast(id, WsMessage::Error(payload.clone()))
                .await;
            if let Ok(json) = serde_json::to_string(&payload) {
                state
                    .event_hub
                    .broadcast(id, StreamEvent { name: StreamEventName::Error, json })
                    .await;
            }
            state.event_hub.remove(id).await;
        }
    });
}
