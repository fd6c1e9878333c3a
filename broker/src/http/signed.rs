//! `GET /signed/{id}` -- fetch the signed bytes once the round-trip
//! completes.

use axum::extract::{Path, State};
use axum::http::header;
use axum::response::{IntoResponse, Response};

use signer_protocol::error_codes;

use crate::http::response::{bad_request, not_found};
use crate::AppState;

pub async fn read_signed(State(state): State<AppState>, Path(id): Path<String>) -> Response {
    let id = match id.parse() {
        Ok(id) => id,
        Err(_) => return bad_request(error_codes::BAD_IDENTIFIER, "malformed identifier"),
    };

    match state.store.get(id).await {
        Some(request) if request.is_signed() => (
            [
                (header::CONTENT_TYPE, "application/octet-stream".to_owned()),
                (
                    header::CONTENT_DISPOSITION,
                    format!("attachment; filename=\"{id}.signed\""),
                ),
            ],
            request.signed_data,
        )
            .into_response(),
        _ => not_found("no signed data for that identifier"),
    }
}
