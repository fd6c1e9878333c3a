//! `GET /{id}` -- fetch the unsigned payload for a pending request.

use axum::extract::{Path, State};
use axum::http::header;
use axum::response::{IntoResponse, Response};

use signer_protocol::error_codes;

use crate::http::response::{bad_request, conflict, not_found};
use crate::AppState;

pub async fn read_unsigned(State(state): State<AppState>, Path(id): Path<String>) -> Response {
    let id = match id.parse() {
        Ok(id) => id,
        Err(_) => return bad_request(error_codes::BAD_IDENTIFIER, "malformed identifier"),
    };

    match state.store.get(id).await {
        None => not_found("no signing request with that identifier"),
        Some(request) if request.is_signed() => {
            conflict("signing request has already been signed")
        }
        Some(request) => (
            [(header::CONTENT_TYPE, "application/octet-stream")],
            request.data,
        )
            .into_response(),
    }
}
