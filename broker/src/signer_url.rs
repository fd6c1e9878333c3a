//! Composes the URL handed to the browser for a signing request.
//!
//! The broker and the SPA may be co-hosted or separately hosted (SPA on a
//! CDN, broker on an API host). The `server` query parameter is always
//! included so the SPA knows where to issue its unsigned-data GETs,
//! signed-data POSTs, and event-stream subscriptions, regardless of which
//! host served the SPA itself.

use uuid::Uuid;

pub struct SignerUrlBuilder {
    /// Host used for the `/sign/{id}` link -- the configured frontend URL if
    /// set, otherwise the broker's own public URL.
    host_for_ui: String,
    /// The broker's own public URL, always passed through to the SPA.
    public_broker_url: String,
}

impl SignerUrlBuilder {
    pub fn new(public_broker_url: impl Into<String>, frontend_url: Option<&str>) -> Self {
        let public_broker_url = public_broker_url.into();
        let host_for_ui = frontend_url
            .map(str::to_owned)
            .unwrap_or_else(|| public_broker_url.clone());
        Self {
            host_for_ui,
            public_broker_url,
        }
    }

    pub fn build(&self, id: Uuid) -> String {
        format!(
            "{}/sign/{}?server={}",
            trim_trailing_slash(&self.host_for_ui),
            id,
            self.public_broker_url
        )
    }
}

fn trim_trailing_slash(url: &str) -> &str {
    url.strip_suffix('/').unwrap_or(url)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn co_hosted_uses_the_broker_url_for_both_host_and_server_param() {
        let builder = SignerUrlBuilder::new("https://broker.example", None);
        let id = Uuid::nil();
        assert_eq!(
            builder.build(id),
            "https://broker.example/sign/00000000-0000-0000-0000-000000000000?server=https://broker.example"
        );
    }

    #[test]
    fn separately_hosted_frontend_wins_for_the_link_host_but_server_param_is_still_the_broker() {
        let builder = SignerUrlBuilder::new("https://broker.example", Some("https://cdn.example/app"));
        let id = Uuid::nil();
        let url = builder.build(id);
        assert!(url.starts_with("https://cdn.example/app/sign/"));
        assert!(url.ends_with("server=https://broker.example"));
    }

    #[test]
    fn trailing_slash_on_the_configured_host_is_not_doubled() {
        let builder = SignerUrlBuilder::new("https://broker.example/", None);
        let url = builder.build(Uuid::nil());
        assert!(!url.contains("example//sign"));
    }
}
