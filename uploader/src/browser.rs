//! Opens the platform URL handler at the signing URL. Failing to open a
//! browser automatically is non-fatal: the caller falls back to printing
//! the URL.

pub fn open_signing_url(url: &str) {
    if let Err(e) = open::that(url) {
        tracing::warn!(error = %e, %url, "could not open a browser automatically");
        println!("Open this URL in a browser to sign: {url}");
    }
}
