//! Broker binary entry point. CLI argument parsing and config-file loading
//! are layered on top of the `broker` library's programmatically-constructed
//! `BrokerConfig` using `clap`.

use std::path::PathBuf;

use clap::Parser;
use tracing_subscriber::EnvFilter;

use broker::config::BrokerConfig;
use broker::lifecycle::{wait_for_process_signal, Broker};
use broker::AppState;

#[derive(Debug, Parser)]
#[command(name = "broker", about = "Remote data-signing broker")]
struct Args {
    /// Optional TOML config file; CLI flags below override its values.
    #[arg(long)]
    config: Option<PathBuf>,

    #[arg(long)]
    host: Option<String>,

    #[arg(long)]
    port: Option<u16>,

    #[arg(long)]
    frontend_url: Option<String>,

    #[arg(long)]
    public_url: Option<String>,

    #[arg(long)]
    max_data_size: Option<u64>,

    #[arg(long)]
    signing_timeout_secs: Option<u64>,
}

fn build_config(args: Args) -> BrokerConfig {
    let mut config = match &args.config {
        Some(path) => BrokerConfig::from_toml_file(path).unwrap_or_else(|e| {
            tracing::warn!(error = %e, "falling back to defaults");
            BrokerConfig::default()
        }),
        None => BrokerConfig::default(),
    };

    if let Some(host) = args.host {
        config.host = host;
    }
    if let Some(port) = args.port {
        config.port = port;
    }
    if let Some(frontend_url) = args.frontend_url {
        config.frontend_url = Some(frontend_url);
    }
    if let Some(public_url) = args.public_url {
        config.public_url = Some(public_url);
    }
    if let Some(max_data_size) = args.max_data_size {
        config.max_data_size = max_data_size;
    }
    if let Some(signing_timeout_secs) = args.signing_timeout_secs {
        config.signing_timeout_secs = signing_timeout_secs;
    }
    config
}

#[tokio::main]
async fn main() {
    let log_level = std::env::var("LOG_LEVEL").unwrap_or_else(|_| "info".to_owned());
    tracing_subscriber::fmt().with_env_filter(EnvFilter::new(log_level)).init();

    let config = build_config(Args::parse());
    let broker = Broker::start(AppState::new(config))
        .await
        .unwrap_or_else(|e| panic!("failed to start broker: {e}"));

    wait_for_process_signal().await;

    broker.stop().await.expect("graceful shutdown failed");
    tracing::info!("broker shut down gracefully");
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cli_flags_override_defaults() {
        let args = Args::parse_from([
            "broker",
            "--port",
            "9999",
            "--max-data-size",
            "2048",
        ]);
        let config = build_config(args);
        assert_eq!(config.port, 9999);
        assert_eq!(config.max_data_size, 2048);
        assert_eq!(config.host, BrokerConfig::default().host);
    }
}
