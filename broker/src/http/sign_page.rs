//! `GET /sign/{id}` and `GET /static/*path` -- the signing SPA shell and its
//! bundled assets.
//!
//! The shell is a single embedded `index.html` served verbatim, not
//! synthesized per-request by scanning the assets directory (DESIGN.md
//! records this choice). Identifier validation happens before the shell is
//! returned, but the shell is served regardless of the request's
//! pending/signed/expired state -- the SPA itself (out of scope here) is
//! responsible for rendering each state.

use axum::extract::{Path, State};
use axum::http::{Method, Uri};
use axum::response::{IntoResponse, Response};
use signer_protocol::error_codes;

use crate::http::response::bad_request;
use crate::AppState;

pub async fn sign_page(State(_state): State<AppState>, Path(id): Path<String>) -> Response {
    if id.parse::<uuid::Uuid>().is_err() {
        return bad_request(error_codes::BAD_IDENTIFIER, "malformed identifier");
    }
    shell()
}

pub async fn static_asset(method: Method, uri: Uri) -> Response {
    match ui_assets::validate_ui_request(&method, &uri, &["/sign"]) {
        Ok(path) => serve_static(path),
        Err(err) => err.into_response(),
    }
}

#[cfg(feature = "embed-ui")]
fn shell() -> Response {
    ui_assets::serve_embedded_ui::<crate::ui::UiAssets>("index.html")
}

#[cfg(not(feature = "embed-ui"))]
fn shell() -> Response {
    ui_assets::non_embedded_placeholder("signing")
}

#[cfg(feature = "embed-ui")]
fn serve_static(path: &str) -> Response {
    let trimmed = path.strip_prefix("/static/").unwrap_or(path);
    ui_assets::serve_embedded_ui::<crate::ui::UiAssets>(trimmed)
}

#[cfg(not(feature = "embed-ui"))]
fn serve_static(_path: &str) -> Response {
    ui_assets::non_embedded_placeholder("signing")
}
