//! `GET /status` -- aggregate counters and a configuration echo.

use axum::extract::State;
use axum::Json;
use signer_protocol::StatusResponse;

use crate::AppState;

pub async fn status(State(state): State<AppState>) -> Json<StatusResponse> {
    let requests = state.store.list().await;
    let signed = requests.iter().filter(|r| r.is_signed()).count() as u64;
    let total = requests.len() as u64;

    Json(StatusResponse {
        total,
        pending: total - signed,
        signed,
        connected_clients: state.socket_hub.connected_count().await as u64,
        max_data_size: state.config.max_data_size,
        signing_timeout_secs: state.config.signing_timeout_secs,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::BrokerConfig;
    use bytes::Bytes;

    #[tokio::test]
    async fn status_counts_pending_and_signed_separately() {
        let state = AppState::new(BrokerConfig::default());
        let pending = state.store.create(Bytes::from_static(b"a"), None, None).await.unwrap();
        let signed = state.store.create(Bytes::from_static(b"b"), None, None).await.unwrap();
        state.store.mark_signed(signed.id, Bytes::from_static(b"c")).await.unwrap();
        let _ = pending;

        let Json(body) = status(State(state)).await;
        assert_eq!(body.total, 2);
        assert_eq!(body.pending, 1);
        assert_eq!(body.signed, 1);
    }

    #[tokio::test]
    async fn status_echoes_the_configured_limits() {
        let state = AppState::new(BrokerConfig {
            max_data_size: 4096,
            signing_timeout_secs: 60,
            ..BrokerConfig::default()
        });
        let Json(body) = status(State(state)).await;
        assert_eq!(body.max_data_size, 4096);
        assert_eq!(body.signing_timeout_secs, 60);
    }
}
