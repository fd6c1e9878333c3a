//! Signing-request lifecycle store: a process-local, concurrent map keyed by
//! request identifier, with pending / signed / expired states.
//!
//! A single `RwLock` guards the whole map. Transitions take the write lock
//! briefly and release it before any broadcast is issued -- callers are
//! responsible for broadcasting *after* the store call returns, never while
//! holding the lock themselves (see `socket_hub`/`event_hub` callers in
//! `http::submit`/`http::sign`).

use std::collections::HashMap;
use std::sync::Arc;

use bytes::Bytes;
use chrono::{DateTime, Utc};
use thiserror::Error;
use tokio::sync::RwLock;
use uuid::Uuid;

/// One in-memory record per submitted payload.
#[derive(Debug, Clone)]
pub struct SigningRequest {
    pub id: Uuid,
    pub data: Bytes,
    pub signed_data: Bytes,
    pub created_at: DateTime<Utc>,
    pub signed_at: Option<DateTime<Utc>>,
    pub client_id: Option<String>,
    pub callback_url: Option<String>,
}

impl SigningRequest {
    pub fn is_signed(&self) -> bool {
        self.signed_at.is_some()
    }
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum CreateError {
    #[error("payload exceeds the maximum allowed size")]
    PayloadTooLarge,
    #[error("payload must not be empty")]
    EmptyPayload,
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum MarkSignedError {
    #[error("no signing request with that identifier")]
    NotFound,
    #[error("signing request was already signed")]
    AlreadySigned,
    #[error("signed payload must not be empty")]
    EmptyPayload,
}

/// Outcome of an expiry sweep for a single identifier: `Reaped` if a pending
/// entry was removed, `NoOp` if the entry had already transitioned to
/// signed (or no longer exists).
#[derive(Debug, PartialEq, Eq)]
pub enum ReapOutcome {
    Reaped,
    NoOp,
}

#[derive(Clone)]
pub struct RequestStore {
    inner: Arc<RwLock<HashMap<Uuid, SigningRequest>>>,
    max_data_size: u64,
}

impl RequestStore {
    pub fn new(max_data_size: u64) -> Self {
        Self {
            inner: Arc::new(RwLock::new(HashMap::new())),
            max_data_size,
        }
    }

    pub fn max_data_size(&self) -> u64 {
        self.max_data_size
    }

    /// Allocates a fresh identifier, inserts a pending record, and returns
    /// both the identifier and the record. The caller is responsible for
    /// scheduling the expiry reaper and any broadcast.
    pub async fn create(
        &self,
        data: Bytes,
        client_id: Option<String>,
        callback_url: Option<String>,
    ) -> Result<SigningRequest, CreateError> {
        if data.is_empty() {
            return Err(CreateError::EmptyPayload);
        }
        if data.len() as u64 > self.max_data_size {
            return Err(CreateError::PayloadTooLarge);
        }

        let request = SigningRequest {
            id: Uuid::new_v4(),
            data,
            signed_data: Bytes::new(),
            created_at: Utc::now(),
            signed_at: None,
            client_id,
            callback_url,
        };

        let mut map = self.inner.write().await;
        map.insert(request.id, request.clone());
        Ok(request)
    }

    /// Returns a consistent snapshot, or `None` if unknown (the HTTP layer
    /// turns that into 404).
    pub async fn get(&self, id: Uuid) -> Option<SigningRequest> {
        self.inner.read().await.get(&id).cloned()
    }

    /// Atomic pending -> signed transition. On success, returns the
    /// resulting record with `signed_at` set.
    pub async fn mark_signed(
        &self,
        id: Uuid,
        bytes: Bytes,
    ) -> Result<SigningRequest, MarkSignedError> {
        if bytes.is_empty() {
            return Err(MarkSignedError::EmptyPayload);
        }

        let mut map = self.inner.write().await;
        let request = map.get_mut(&id).ok_or(MarkSignedError::NotFound)?;
        if request.is_signed() {
            return Err(MarkSignedError::AlreadySigned);
        }
        request.signed_data = bytes;
        request.signed_at = Some(Utc::now());
        Ok(request.clone())
    }

    /// Snapshot copy for status reporting.
    pub async fn list(&self) -> Vec<SigningRequest> {
        self.inner.read().await.values().cloned().collect()
    }

    /// Removes a pending entry. No-op if the entry has already transitioned
    /// to signed, or no longer exists. Never removes a signed entry --
    /// completed requests are retained until process shutdown.
    pub async fn reap(&self, id: Uuid) -> ReapOutcome {
        let mut map = self.inner.write().await;
        match map.get(&id) {
            Some(request) if !request.is_signed() => {
                map.remove(&id);
                ReapOutcome::Reaped
            }
            _ => ReapOutcome::NoOp,
        }
    }
}
