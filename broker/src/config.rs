//! Broker configuration: enumerated options passed to the server at
//! construction. A TOML file may supply defaults; CLI flags (in `main.rs`)
//! override them.

use std::time::Duration;

use serde::Deserialize;

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct BrokerConfig {
    pub host: String,
    pub port: u16,
    pub allowed_origins: Vec<String>,
    pub max_data_size: u64,
    pub signing_timeout_secs: u64,
    pub frontend_url: Option<String>,
    /// The broker's own externally-reachable URL, used both as the host for
    /// `/sign/{id}` links (when `frontend_url` is unset) and as the
    /// `server=` query parameter the SPA uses to call back in to this
    /// broker. Defaults to `http://{host}:{port}`, which is only correct
    /// for local/loopback use -- deployments behind a reverse proxy should
    /// set this explicitly.
    pub public_url: Option<String>,
}

impl Default for BrokerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_owned(),
            port: 1984,
            allowed_origins: vec!["*".to_owned()],
            max_data_size: 10 * 1024 * 1024,
            signing_timeout_secs: 30 * 60,
            frontend_url: None,
            public_url: None,
        }
    }
}

impl BrokerConfig {
    pub fn signing_timeout(&self) -> Duration {
        Duration::from_secs(self.signing_timeout_secs)
    }

    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    pub fn public_url(&self) -> String {
        self.public_url
            .clone()
            .unwrap_or_else(|| format!("http://{}:{}", self.host, self.port))
    }

    /// Loads a config from a TOML file, falling back to defaults for any
    /// field the file doesn't set. Returns an error string suitable for a
    /// CLI diagnostic -- intentionally not a typed error, since this path
    /// only runs in the `broker` binary's startup, never the library.
    pub fn from_toml_file(path: &std::path::Path) -> Result<Self, String> {
        let text = std::fs::read_to_string(path)
            .map_err(|e| format!("failed to read config file {}: {e}", path.display()))?;
        toml::from_str(&text).map_err(|e| format!("invalid config file {}: {e}", path.display()))
    }

    pub fn allows_origin(&self, origin: &str) -> bool {
        self.allowed_origins
            .iter()
            .any(|allowed| allowed == "*" || allowed == origin)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_matches_the_documented_defaults() {
        let config = BrokerConfig::default();
        assert_eq!(config.max_data_size, 10 * 1024 * 1024);
        assert_eq!(config.signing_timeout_secs, 30 * 60);
        assert_eq!(config.allowed_origins, vec!["*".to_owned()]);
    }

    #[test]
    fn public_url_defaults_to_host_and_port_when_unset() {
        let config = BrokerConfig {
            host: "127.0.0.1".to_owned(),
            port: 1984,
            ..BrokerConfig::default()
        };
        assert_eq!(config.public_url(), "http://127.0.0.1:1984");
    }

    #[test]
    fn allows_origin_treats_star_as_wildcard() {
        let config = BrokerConfig::default();
        assert!(config.allows_origin("https://anything.example"));
    }

    #[test]
    fn allows_origin_matches_an_explicit_allow_list() {
        let config = BrokerConfig {
            allowed_origins: vec!["https://app.example".to_owned()],
            ..BrokerConfig::default()
        };
        assert!(config.allows_origin("https://app.example"));
        assert!(!config.allows_origin("https://evil.example"));
    }

    #[test]
    fn from_toml_file_parses_a_partial_file_over_defaults() {
        let dir = std::env::temp_dir();
        let path = dir.join(format!("broker-config-test-{}.toml", uuid::Uuid::new_v4()));
        std::fs::write(&path, "port = 9000\nmax_data_size = 2048\n").unwrap();

        let config = BrokerConfig::from_toml_file(&path).unwrap();
        assert_eq!(config.port, 9000);
        assert_eq!(config.max_data_size, 2048);
        assert_eq!(config.host, "0.0.0.0");

        std::fs::remove_file(&path).ok();
    }
}
