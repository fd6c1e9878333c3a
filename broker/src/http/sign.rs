//! `POST /{id}` -- accept the signed payload and complete the
//! pending-to-signed transition.

use axum::body::Body;
use axum::extract::{Path, State};
use axum::http::{header, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::Json;
use base64::Engine;
use signer_protocol::{
    error_codes, SignSubmitJsonRequest, SignSubmitResponse, SignedMetadata, StreamEventName, WsMessage,
};

use crate::event_hub::StreamEvent;
use crate::http::response::{bad_request, conflict, not_found, payload_too_large};
use crate::store::MarkSignedError;
use crate::AppState;

pub async fn submit_signed(
    State(state): State<AppState>,
    Path(id): Path<String>,
    headers: axum::http::HeaderMap,
    body: Body,
) -> Response {
    let id = match id.parse() {
        Ok(id) => id,
        Err(_) => return bad_request(error_codes::BAD_IDENTIFIER, "malformed identifier"),
    };

    let is_json = headers
        .get(header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .is_some_and(|ct| ct.starts_with("application/json"));

    let bytes = if is_json {
        match read_json_envelope(&state, body).await {
            Ok(bytes) => bytes,
            Err(response) => return response,
        }
    } else {
        let limit = state.config.max_data_size as usize + 1;
        match axum::body::to_bytes(body, limit).await {
            Ok(bytes) if bytes.len() as u64 > state.config.max_data_size => {
                return payload_too_large("signed payload exceeds the configured max_data_size");
            }
            Ok(bytes) => bytes.to_vec(),
            Err(_) => {
                return payload_too_large("signed payload exceeds the configured max_data_size")
            }
        }
    };

    match state.store.mark_signed(id, bytes::Bytes::from(bytes)).await {
        Ok(request) => {
            let signed_at = request.signed_at.expect("mark_signed sets signed_at").timestamp();
            let metadata = SignedMetadata {
                uuid: id,
                success: true,
                signed_at,
            };
            state
                .socket_hub
                .broadcast(id, WsMessage::Signed(metadata.clone()))
                .await;
            if let Ok(json) = serde_json::to_string(&metadata) {
                state
                    .event_hub
                    .broadcast(id, StreamEvent { name: StreamEventName::Signed, json })
                    .await;
            }

            (
                StatusCode::OK,
                Json(SignSubmitResponse {
                    message: "Data signed successfully".to_owned(),
                    uuid: id,
                    signed_at,
                }),
            )
                .into_response()
        }
        Err(MarkSignedError::NotFound) => not_found("no signing request with that identifier"),
        Err(MarkSignedError::AlreadySigned) => {
            conflict("signing request has already been signed")
        }
        Err(MarkSignedError::EmptyPayload) => {
            bad_request(error_codes::EMPTY_PAYLOAD, "signed payload must not be empty")
        }
    }
}

async fn read_json_envelope(state: &AppState, body: Body) -> Result<Vec<u8>, Response> {
    let json_cap = (state.config.max_data_size as usize)
        .saturating_mul(2)
        .saturating_add(4096);
    let bytes = axum::body::to_bytes(body, json_cap)
        .await
        .map_err(|_| payload_too_large("request body exceeds the configured max_data_size"))?;

    let envelope: SignSubmitJsonRequest = serde_json::from_slice(&bytes)
        .map_err(|e| bad_request(error_codes::INVALID_REQUEST, format!("invalid JSON: {e}")))?;

    let data = base64::engine::general_purpose::STANDARD
        .decode(envelope.signed_data.as_bytes())
        .map_err(|e| bad_request(error_codes::INVALID_REQUEST, format!("invalid base64 signed_data: {e}")))?;

    if data.len() as u64 > state.config.max_data_size {
        return Err(payload_too_large(
            "signed payload exceeds the configured max_data_size",
        ));
    }

    Ok(data)
}
