//! Extracts a data-item identifier from signed bundle bytes.
//!
//! The real bundle-item format (and its decoder) is an out-of-scope external
//! collaborator: cryptographic verification of signatures and the bundle
//! format itself are someone else's library. `RawPrefixDecoder` is the one
//! trivial built-in: it always declines, so the orchestrator's fallback path
//! -- "first 32 bytes as a synthetic identifier" -- is what actually runs in
//! this repo, and is exercised the same way a real decoder's failure path
//! would be.

/// Identifier for a signed bundle item, hex-encoded.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DataItemIdentifier(pub String);

impl std::fmt::Display for DataItemIdentifier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A pluggable parser for the external bundle-item wire format. Swap in a
/// real implementation without touching the orchestrator's control flow.
pub trait BundleItemDecoder {
    fn decode(&self, bytes: &[u8]) -> Option<DataItemIdentifier>;
}

/// Built-in stand-in for the out-of-scope real decoder. Always declines,
/// forcing callers onto the documented fallback.
pub struct RawPrefixDecoder;

impl BundleItemDecoder for RawPrefixDecoder {
    fn decode(&self, _bytes: &[u8]) -> Option<DataItemIdentifier> {
        None
    }
}

/// Tries `decoder` first; on failure, falls back to hex-encoding the first
/// 32 bytes of `bytes` (or all of it, if shorter) as a synthetic identifier.
pub fn parse_leading_identifier(bytes: &[u8], decoder: &dyn BundleItemDecoder) -> DataItemIdentifier {
    if let Some(id) = decoder.decode(bytes) {
        return id;
    }
    let prefix_len = bytes.len().min(32);
    DataItemIdentifier(hex::encode(&bytes[..prefix_len]))
}
