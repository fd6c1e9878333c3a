//! Upload orchestrator: ensure a broker is reachable, submit a payload, open
//! the browser, consume the signed result, forward it to the bundler.
//!
//! `ensure_broker` probes health first and only spawns an in-process broker,
//! with bounded retry, when nothing external answers. The event-stream
//! consumption loop below waits, under its own inactivity timeout, for a
//! single terminal response from that broker.

use std::time::Duration;

use base64::Engine;
use bytes::Bytes;
use futures_util::StreamExt;
use serde::Serialize;
use thiserror::Error;
use uuid::Uuid;

use broker::config::BrokerConfig;
use broker::lifecycle::Broker;
use broker::AppState;
use signer_protocol::{StreamEventName, SubmitResponse};

use crate::bundle_item::{parse_leading_identifier, BundleItemDecoder, DataItemIdentifier, RawPrefixDecoder};

const HEALTH_PROBE_TIMEOUT: Duration = Duration::from_millis(800);
const BROKER_SPAWN_TIMEOUT: Duration = Duration::from_secs(5);
const BROKER_SPAWN_BACKOFF: Duration = Duration::from_millis(500);
const SUBMIT_TIMEOUT: Duration = Duration::from_secs(10);
const FETCH_TIMEOUT: Duration = Duration::from_secs(10);
const EVENT_STREAM_INACTIVITY_TIMEOUT: Duration = Duration::from_secs(30);
const BUNDLER_TIMEOUT: Duration = Duration::from_secs(30);

/// Convention for the (out-of-scope) bundle format's signature-type field.
/// The broker never interprets this value -- it travels only inside the
/// opaque envelope body.
const SIGNATURE_TYPE: &str = "1";

#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct Tag {
    pub name: String,
    pub value: String,
}

#[derive(Debug, Clone, Serialize)]
struct UnsignedEnvelope {
    signature_type: &'static str,
    owner: &'static str,
    target: String,
    anchor: String,
    tags: Vec<Tag>,
    /// Base64-encoded payload bytes, so the envelope stays JSON-serializable
    /// even though the broker treats the serialized envelope itself as an
    /// opaque raw body.
    data: String,
}

#[derive(Debug, Clone)]
pub struct UploadResult {
    pub uuid: Uuid,
    pub item_id: DataItemIdentifier,
    pub bundler_status: u16,
    pub bundler_body: String,
}

#[derive(Debug, Error)]
pub enum UploadError {
    #[error("broker is unavailable")]
    BrokerUnavailable,
    #[error("submit failed: {status} {body}")]
    SubmitFailed { status: u16, body: String },
    #[error("timed out waiting for the signing to complete")]
    SigningTimeout,
    #[error("failed to fetch the signed bytes")]
    SignedFetchFailed,
    #[error("bundler rejected the upload: {status} {body}")]
    BundlerRejected { status: u16, body: String, item_id: DataItemIdentifier },
}

/// Which broker the orchestrator is talking to, and whether it owns that
/// broker's lifecycle.
enum BrokerHandle {
    External,
    Owned(Box<Broker>),
}

pub async fn upload(
    broker_base_url: &str,
    bundler_url: &str,
    payload: Bytes,
    tags: Vec<Tag>,
    target: Option<String>,
    anchor: Option<String>,
) -> Result<UploadResult, UploadError> {
    upload_with_decoder(broker_base_url, bundler_url, payload, tags, target, anchor, &RawPrefixDecoder).await
}

pub async fn upload_with_decoder(
    broker_base_url: &str,
    bundler_url: &str,
    payload: Bytes,
    tags: Vec<Tag>,
    target: Option<String>,
    anchor: Option<String>,
    decoder: &dyn BundleItemDecoder,
) -> Result<UploadResult, UploadError> {
    let client = reqwest::Client::new();
    let (base_url, owned_broker) = ensure_broker(&client, broker_base_url).await?;

    let anchor = anchor.unwrap_or_else(random_anchor);
    let envelope = UnsignedEnvelope {
        signature_type: SIGNATURE_TYPE,
        owner: "",
        target: target.unwrap_or_default(),
        anchor,
        tags,
        data: base64::engine::general_purpose::STANDARD.encode(&payload),
    };
    let envelope_bytes = serde_json::to_vec(&envelope).expect("envelope is always serializable");

    let result = run(&client, &base_url, bundler_url, &envelope_bytes, decoder).await;

    if let BrokerHandle::Owned(broker) = owned_broker {
        let _ = broker.stop().await;
    }
    result
}

async fn run(
    client: &reqwest::Client,
    base_url: &str,
    bundler_url: &str,
    envelope_bytes: &[u8],
    decoder: &dyn BundleItemDecoder,
) -> Result<UploadResult, UploadError> {
    let submitted = submit(client, base_url, envelope_bytes).await?;
    crate::browser::open_signing_url(&submitted.signing_url);

    consume_until_signed(client, base_url, submitted.uuid).await?;

    let signed_bytes = fetch_signed(client, base_url, submitted.uuid).await?;
    let item_id = parse_leading_identifier(&signed_bytes, decoder);

    match forward_to_bundler(client, bundler_url, &signed_bytes).await {
        Ok((status, body)) if (200..300).contains(&status) => {
            Ok(UploadResult { uuid: submitted.uuid, item_id, bundler_status: status, bundler_body: body })
        }
        Ok((status, body)) => Err(UploadError::BundlerRejected { status, body, item_id }),
        Err(()) => Err(UploadError::BundlerRejected {
            status: 0,
            body: "bundler request failed".to_owned(),
            item_id,
        }),
    }
}

/// Probes `/health` on the configured address; if unreachable, spawns an
/// in-process broker and polls its `/health` with bounded retry.
async fn ensure_broker(client: &reqwest::Client, base_url: &str) -> Result<(String, BrokerHandle), UploadError> {
    if probe_health(client, base_url).await {
        return Ok((base_url.to_owned(), BrokerHandle::External));
    }

    let config = BrokerConfig { host: "127.0.0.1".to_owned(), port: 0, ..BrokerConfig::default() };
    let spawned = Broker::start(AppState::new(config)).await.map_err(|_| UploadError::BrokerUnavailable)?;
    let owned_base = format!("http://{}", spawned.local_addr);

    let deadline = tokio::time::Instant::now() + BROKER_SPAWN_TIMEOUT;
    loop {
        if probe_health(client, &owned_base).await {
            return Ok((owned_base, BrokerHandle::Owned(Box::new(spawned))));
        }
        if tokio::time::Instant::now() >= deadline {
            let _ = spawned.stop().await;
            return Err(UploadError::BrokerUnavailable);
        }
        tokio::time::sleep(BROKER_SPAWN_BACKOFF).await;
    }
}

async fn probe_health(client: &reqwest::Client, base_url: &str) -> bool {
    client
        .get(format!("{base_url}/health"))
        .timeout(HEALTH_PROBE_TIMEOUT)
        .send()
        .await
        .is_ok_and(|response| response.status().is_success())
}

async fn submit(client: &reqwest::Client, base_url: &str, envelope_bytes: &[u8]) -> Result<SubmitResponse, UploadError> {
    let response = client
        .post(format!("{base_url}/"))
        .header("content-type", "application/octet-stream")
        .timeout(SUBMIT_TIMEOUT)
        .body(envelope_bytes.to_vec())
        .send()
        .await
        .map_err(|_| UploadError::BrokerUnavailable)?;

    let status = response.status();
    if !status.is_success() {
        let body = response.text().await.unwrap_or_default();
        return Err(UploadError::SubmitFailed { status: status.as_u16(), body });
    }
    response
        .json::<SubmitResponse>()
        .await
        .map_err(|e| UploadError::SubmitFailed { status: status.as_u16(), body: format!("invalid JSON response: {e}") })
}

/// Opens the event stream and reads it until a terminal `signed` event
/// arrives, an `error` event arrives, the stream closes, or the inactivity
/// timeout elapses.
async fn consume_until_signed(client: &reqwest::Client, base_url: &str, uuid: Uuid) -> Result<(), UploadError> {
    let response = client
        .get(format!("{base_url}/events/{uuid}"))
        .send()
        .await
        .map_err(|_| UploadError::SigningTimeout)?;
    if !response.status().is_success() {
        return Err(UploadError::SigningTimeout);
    }

    let mut stream = response.bytes_stream();
    let mut buffer = String::new();
    loop {
        let chunk = match tokio::time::timeout(EVENT_STREAM_INACTIVITY_TIMEOUT, stream.next()).await {
            Ok(Some(Ok(bytes))) => bytes,
            Ok(Some(Err(_))) | Ok(None) => return Err(UploadError::SigningTimeout),
            Err(_) => return Err(UploadError::SigningTimeout),
        };
        buffer.push_str(&String::from_utf8_lossy(&chunk));

        while let Some(pos) = buffer.find("\n\n") {
            let frame = buffer[..pos].to_owned();
            buffer.drain(..=pos + 1);
            let name = frame_event_name(&frame);
            if name == Some(StreamEventName::Signed.as_str()) {
                return Ok(());
            }
            if name == Some(StreamEventName::Error.as_str()) {
                return Err(UploadError::SigningTimeout);
            }
            // connected/status/heartbeat/unknown: keep reading.
        }
    }
}

fn frame_event_name(frame: &str) -> Option<&str> {
    frame.lines().find_map(|line| line.strip_prefix("event: "))
}

async fn fetch_signed(client: &reqwest::Client, base_url: &str, uuid: Uuid) -> Result<Bytes, UploadError> {
    let response = client
        .get(format!("{base_url}/signed/{uuid}"))
        .timeout(FETCH_TIMEOUT)
        .send()
        .await
        .map_err(|_| UploadError::SignedFetchFailed)?;
    if !response.status().is_success() {
        return Err(UploadError::SignedFetchFailed);
    }
    response.bytes().await.map_err(|_| UploadError::SignedFetchFailed)
}

/// Posts the signed bytes to the external bundler. `Ok` carries the raw
/// status/body regardless of success so the caller can classify 2xx vs.
/// rejection; `Err` means the request itself never completed (network
/// failure, not an HTTP-level rejection).
async fn forward_to_bundler(client: &reqwest::Client, bundler_url: &str, bytes: &Bytes) -> Result<(u16, String), ()> {
    let response = client
        .post(bundler_url)
        .header("content-type", "application/octet-stream")
        .header("content-length", bytes.len().to_string())
        .timeout(BUNDLER_TIMEOUT)
        .body(bytes.clone())
        .send()
        .await
        .map_err(|_| ())?;
    let status = response.status().as_u16();
    let body = response.text().await.unwrap_or_default();
    Ok((status, body))
}

/// 16 random bytes, hex-encoded to a 32-character string.
fn random_anchor() -> String {
    let mut bytes = [0u8; 16];
    getrandom::fill(&mut bytes).expect("the OS RNG is always available");
    hex::encode(bytes)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn random_anchor_is_32_lowercase_hex_characters() {
        let anchor = random_anchor();
        assert_eq!(anchor.len(), 32);
        assert!(anchor.chars().all(|c| c.is_ascii_hexdigit()));
    }

    #[test]
    fn frame_event_name_reads_the_event_line() {
        let frame = "event: signed\ndata: {\"uuid\":\"x\"}";
        assert_eq!(frame_event_name(frame), Some("signed"));
    }

    #[test]
    fn frame_event_name_is_none_without_an_event_line() {
        assert_eq!(frame_event_name("data: {}"), None);
    }

    #[tokio::test]
    async fn probe_health_is_false_for_an_address_nothing_is_listening_on() {
        let client = reqwest::Client::new();
        assert!(!probe_health(&client, "http://127.0.0.1:1").await);
    }

    #[tokio::test]
    async fn ensure_broker_spawns_and_reaches_an_owned_broker_when_nothing_external_is_listening() {
        let client = reqwest::Client::new();
        let (base_url, handle) = ensure_broker(&client, "http://127.0.0.1:1").await.unwrap();
        assert!(probe_health(&client, &base_url).await);
        assert!(matches!(handle, BrokerHandle::Owned(_)));
        if let BrokerHandle::Owned(broker) = handle {
            broker.stop().await.unwrap();
        }
    }
}
