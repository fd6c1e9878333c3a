// signer-protocol: wire types shared by the broker and the uploader.
//
// WebSocket messages use a top-level `type` field for discriminated
// deserialization. Event-stream payloads are plain structs serialized as the
// `data:` line of an SSE frame; the event name itself travels out-of-band in
// the `event:` line.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

// ---------------------------------------------------------------------------
// Shared sub-types
// ---------------------------------------------------------------------------

/// Metadata describing a signed transition, broadcast on both hubs.
///
/// Bytes are never carried here -- consumers fetch them via
/// `GET /signed/{id}`. See DESIGN.md for why the two hubs were unified on
/// this shape.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SignedMetadata {
    pub uuid: Uuid,
    pub success: bool,
    pub signed_at: i64,
}

/// Current status of a signing request, as broadcast to socket subscribers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatusPayload {
    pub uuid: Uuid,
    pub is_signed: bool,
}

/// Human-readable failure payload shared by both push channels.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorPayload {
    pub uuid: Uuid,
    /// One of the constants in [`error_codes`].
    pub code: String,
    pub reason: String,
}

/// Payload for the event-stream `connected` event.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConnectedPayload {
    pub uuid: Uuid,
    pub consumer_id: Uuid,
}

// ---------------------------------------------------------------------------
// Socket hub protocol (bidirectional, JSON text frames)
// ---------------------------------------------------------------------------

/// All socket-hub message kinds.
///
/// Serializes/deserializes using the `type` field as a tag:
///
/// ```json
/// { "type": "subscribe", "uuid": "..." }
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type")]
#[serde(rename_all = "snake_case")]
pub enum WsMessage {
    /// broker -> client: current state for an identifier.
    Status(StatusPayload),
    /// broker -> client: the signed-submission transition completed.
    Signed(SignedMetadata),
    /// broker -> client: a human-readable failure.
    Error(ErrorPayload),
    /// client -> broker: add an identifier to this client's subscription set.
    Subscribe { uuid: Uuid },
    /// bidirectional keepalive.
    Heartbeat,
}

/// Frozen error codes used in [`WsMessage::Error`] and HTTP error bodies.
pub mod error_codes {
    pub const NOT_FOUND: &str = "NOT_FOUND";
    pub const ALREADY_SIGNED: &str = "ALREADY_SIGNED";
    pub const EXPIRED: &str = "EXPIRED";
    pub const PAYLOAD_TOO_LARGE: &str = "PAYLOAD_TOO_LARGE";
    pub const EMPTY_PAYLOAD: &str = "EMPTY_PAYLOAD";
    pub const BAD_IDENTIFIER: &str = "BAD_IDENTIFIER";
    pub const INVALID_REQUEST: &str = "INVALID_REQUEST";
    pub const INTERNAL_ERROR: &str = "INTERNAL_ERROR";
}

// ---------------------------------------------------------------------------
// Event-stream hub protocol (one-way, text/event-stream)
// ---------------------------------------------------------------------------

/// Recognized event-stream event names. Unknown names must be treated as
/// no-ops by consumers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StreamEventName {
    Connected,
    Status,
    Signed,
    Error,
    Heartbeat,
}

impl StreamEventName {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Connected => "connected",
            Self::Status => "status",
            Self::Signed => "signed",
            Self::Error => "error",
            Self::Heartbeat => "heartbeat",
        }
    }
}

// ---------------------------------------------------------------------------
// HTTP API request/response shapes
// ---------------------------------------------------------------------------

/// `POST /` request body when `Content-Type: application/json`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SubmitJsonRequest {
    /// Base64-encoded payload bytes.
    pub data: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub client_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub callback_url: Option<String>,
}

/// `POST /` response body on success (201).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SubmitResponse {
    pub uuid: Uuid,
    pub signing_url: String,
    pub message: String,
}

/// `POST /{id}` request body when `Content-Type: application/json`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SignSubmitJsonRequest {
    /// Base64-encoded signed payload bytes.
    pub signed_data: String,
}

/// `POST /{id}` response body on success (200).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SignSubmitResponse {
    pub message: String,
    pub uuid: Uuid,
    pub signed_at: i64,
}

/// `GET /health` response body.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub timestamp: i64,
    pub version: String,
}

/// `GET /status` response body.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StatusResponse {
    pub total: u64,
    pub pending: u64,
    pub signed: u64,
    pub connected_clients: u64,
    pub max_data_size: u64,
    pub signing_timeout_secs: u64,
}

/// Frozen HTTP error envelope used by all non-2xx responses.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HttpErrorEnvelope {
    /// One of the constants in [`error_codes`].
    pub code: String,
    pub error: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<String>,
}
