//! Remote data-signing broker: a network service that accepts opaque byte
//! payloads from a submitting client, hands them to a human at a browser who
//! signs them with a wallet extension, and returns the signed bytes back to
//! the submitter in near real time.
//!
//! A `state`-shaped `AppState` is threaded through axum extractors, one
//! module per subsystem, and `build_router` wires routes to that state.

pub mod config;
pub mod event_hub;
pub mod http;
pub mod lifecycle;
pub mod reaper;
pub mod signer_url;
pub mod socket_hub;
pub mod store;
pub mod ui;

use std::sync::Arc;

use axum::middleware;
use axum::routing::get;
use axum::Router;
use tower_http::catch_panic::CatchPanicLayer;
use tower_http::trace::TraceLayer;

use config::BrokerConfig;
use event_hub::EventHub;
use signer_url::SignerUrlBuilder;
use socket_hub::SocketHub;
use store::RequestStore;

/// Shared application state, cloned into every handler. Every field is
/// itself cheaply cloneable (`Arc`-backed).
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<BrokerConfig>,
    pub store: RequestStore,
    pub socket_hub: SocketHub,
    pub event_hub: EventHub,
    pub signer_url: Arc<SignerUrlBuilder>,
}

impl AppState {
    pub fn new(config: BrokerConfig) -> Self {
        let store = RequestStore::new(config.max_data_size);
        let signer_url = SignerUrlBuilder::new(config.public_url(), config.frontend_url.as_deref());
        Self {
            config: Arc::new(config),
            store,
            socket_hub: SocketHub::new(),
            event_hub: EventHub::new(),
            signer_url: Arc::new(signer_url),
        }
    }
}

/// Builds the full route table and wires the CORS and panic-recovery
/// middleware.
pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/", axum::routing::post(http::submit::submit))
        .route(
            "/{id}",
            get(http::read::read_unsigned).post(http::sign::submit_signed),
        )
        .route("/signed/{id}", get(http::signed::read_signed))
        .route("/sign/{id}", get(http::sign_page::sign_page))
        .route("/static/{*path}", get(http::sign_page::static_asset))
        .route("/ws", get(http::ws::ws_handler))
        .route("/events/{id}", get(http::events::event_stream))
        .route("/health", get(http::health::health))
        .route("/status", get(http::status::status))
        .layer(CatchPanicLayer::new())
        .layer(TraceLayer::new_for_http())
        .layer(middleware::from_fn_with_state(
            state.clone(),
            http::cors::cors_layer,
        ))
        .with_state(state)
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;
    use axum::http::{Request, StatusCode};
    use tower::ServiceExt;

    #[tokio::test]
    async fn unknown_route_is_404_not_a_panic() {
        let router = build_router(AppState::new(BrokerConfig::default()));
        let response = router
            .oneshot(
                Request::builder()
                    .uri("/nope/not/a/route")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn health_route_is_reachable_through_the_full_router() {
        let router = build_router(AppState::new(BrokerConfig::default()));
        let response = router
            .oneshot(
                Request::builder()
                    .uri("/health")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
    }
}
