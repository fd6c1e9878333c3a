//! Client-side orchestrator for the remote data-signing broker. Submits an
//! opaque payload to a broker (spawning one in-process if none is
//! reachable), opens a browser at the signing URL, waits for the signed
//! bytes, and forwards them to an external bundler.

pub mod browser;
pub mod bundle_item;
pub mod orchestrator;

pub use bundle_item::{BundleItemDecoder, DataItemIdentifier, RawPrefixDecoder};
pub use orchestrator::{upload, upload_with_decoder, Tag, UploadError, UploadResult};
