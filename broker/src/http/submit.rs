//! `POST /` -- accept a payload and create a pending signing request.

use axum::body::Body;
use axum::extract::{Query, State};
use axum::http::{header, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::Json;
use base64::Engine;
use serde::Deserialize;
use signer_protocol::{error_codes, SubmitJsonRequest, SubmitResponse};

use crate::http::response::{bad_request, payload_too_large};
use crate::store::CreateError;
use crate::{reaper, AppState};

#[derive(Debug, Deserialize, Default)]
pub struct SubmitQuery {
    pub client_id: Option<String>,
    pub callback_url: Option<String>,
}

pub async fn submit(
    State(state): State<AppState>,
    headers: axum::http::HeaderMap,
    Query(query): Query<SubmitQuery>,
    body: Body,
) -> Response {
    let is_json = headers
        .get(header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .is_some_and(|ct| ct.starts_with("application/json"));

    let (data, client_id, callback_url) = if is_json {
        match read_json_envelope(&state, body).await {
            Ok(parsed) => parsed,
            Err(response) => return response,
        }
    } else {
        match read_raw_body(&state, body).await {
            Ok(bytes) => (bytes, query.client_id, query.callback_url),
            Err(response) => return response,
        }
    };

    match state
        .store
        .create(bytes::Bytes::from(data), client_id, callback_url)
        .await
    {
        Ok(request) => {
            reaper::schedule(state.clone(), request.id, state.config.signing_timeout());
            let signing_url = state.signer_url.build(request.id);
            (
                StatusCode::CREATED,
                Json(SubmitResponse {
                    uuid: request.id,
                    signing_url,
                    message: "Data submitted for signing".to_owned(),
                }),
            )
                .into_response()
        }
        Err(CreateError::EmptyPayload) => bad_request(error_codes::EMPTY_PAYLOAD, "payload must not be empty"),
        Err(CreateError::PayloadTooLarge) => {
            payload_too_large("payload exceeds the configured max_data_size")
        }
    }
}

/// Raw bodies are streamed into a buffer capped one byte past the limit, so
/// an oversized upload is rejected without holding the whole thing in memory.
async fn read_raw_body(state: &AppState, body: Body) -> Result<Vec<u8>, Response> {
    let limit = state.config.max_data_size as usize + 1;
    match axum::body::to_bytes(body, limit).await {
        Ok(bytes) if bytes.len() as u64 > state.config.max_data_size => {
            Err(payload_too_large("payload exceeds the configured max_data_size"))
        }
        Ok(bytes) => Ok(bytes.to_vec()),
        Err(_) => Err(payload_too_large("payload exceeds the configured max_data_size")),
    }
}

/// JSON bodies are decoded then length-checked: the raw JSON bytes are still
/// capped, generously, to account for base64 overhead, but the authoritative
/// size check happens against the decoded payload.
async fn read_json_envelope(
    state: &AppState,
    body: Body,
) -> Result<(Vec<u8>, Option<String>, Option<String>), Response> {
    let json_cap = (state.config.max_data_size as usize)
        .saturating_mul(2)
        .saturating_add(4096);
    let bytes = axum::body::to_bytes(body, json_cap)
        .await
        .map_err(|_| payload_too_large("request body exceeds the configured max_data_size"))?;

    let envelope: SubmitJsonRequest = serde_json::from_slice(&bytes)
        .map_err(|e| bad_request(error_codes::INVALID_REQUEST, format!("invalid JSON: {e}")))?;

    let data = base64::engine::general_purpose::STANDARD
        .decode(envelope.data.as_bytes())
        .map_err(|e| bad_request(error_codes::INVALID_REQUEST, format!("invalid base64 data: {e}")))?;

    if data.len() as u64 > state.config.max_data_size {
        return Err(payload_too_large(
            "payload exceeds the configured max_data_size",
        ));
    }

    Ok((data, envelope.client_id, envelope.callback_url))
}
