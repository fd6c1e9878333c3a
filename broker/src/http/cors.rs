//! CORS middleware driven by the configured allowed-origins list: `*`
//! permits all, otherwise each request's `Origin` is checked against the
//! list. Implemented as an axum `from_fn_with_state` layer rather than
//! `tower_http::cors::CorsLayer` because the allow-list needs to be
//! evaluated per-request against runtime config, not baked in at
//! router-build time.

use axum::extract::{Request, State};
use axum::http::{HeaderValue, Method, StatusCode};
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};

use crate::AppState;

pub async fn cors_layer(
    State(state): State<AppState>,
    request: Request,
    next: Next,
) -> Response {
    let origin = request
        .headers()
        .get(axum::http::header::ORIGIN)
        .and_then(|v| v.to_str().ok())
        .map(str::to_owned);

    if request.method() == Method::OPTIONS {
        return preflight_response(&state, origin.as_deref());
    }

    let mut response = next.run(request).await;
    apply_cors_headers(&state, origin.as_deref(), &mut response);
    response
}

fn preflight_response(state: &AppState, origin: Option<&str>) -> Response {
    let mut response = StatusCode::NO_CONTENT.into_response();
    apply_cors_headers(state, origin, &mut response);
    response
}

fn apply_cors_headers(state: &AppState, origin: Option<&str>, response: &mut Response) {
    let Some(origin) = origin else { return };
    if !state.config.allows_origin(origin) {
        return;
    }
    let headers = response.headers_mut();
    if let Ok(value) = HeaderValue::from_str(origin) {
        headers.insert(axum::http::header::ACCESS_CONTROL_ALLOW_ORIGIN, value);
    }
    headers.insert(
        axum::http::header::ACCESS_CONTROL_ALLOW_METHODS,
        HeaderValue::from_static("GET, POST, OPTIONS"),
    );
    headers.insert(
        axum::http::header::ACCESS_CONTROL_ALLOW_HEADERS,
        HeaderValue::from_static("content-type, authorization"),
    );
}
