//! Embedded signing-SPA shell. The signing UI itself is someone else's
//! concern; this module only embeds whatever static shell lives under
//! `assets/` when built with `--features embed-ui`.

#[cfg(feature = "embed-ui")]
#[derive(rust_embed::Embed)]
#[folder = "assets"]
pub struct UiAssets;
