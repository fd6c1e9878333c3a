//! `upload` binary: submits a file's bytes to a signing broker and, once
//! signed, forwards them to a bundler. Uses the same `clap`-derived
//! argument layout as the `broker` binary (`broker/src/main.rs`).

use std::path::PathBuf;
use std::process::ExitCode;

use clap::Parser;
use tracing_subscriber::EnvFilter;

use uploader::{upload, Tag, UploadError};

#[derive(Debug, Parser)]
#[command(name = "upload", about = "Submit a payload to a signing broker and forward the signed result to a bundler")]
struct Args {
    /// File whose bytes are the payload to sign.
    payload: PathBuf,

    /// Bundler endpoint the signed bytes are posted to.
    #[arg(long)]
    bundler_url: String,

    /// Broker base URL to try first; a broker is spawned in-process if
    /// nothing answers here.
    #[arg(long, default_value = "http://127.0.0.1:1984")]
    broker_url: String,

    /// Target identifier recorded on the unsigned envelope.
    #[arg(long)]
    target: Option<String>,

    /// Anchor value recorded on the unsigned envelope; a random one is
    /// generated when omitted.
    #[arg(long)]
    anchor: Option<String>,

    /// Repeatable `name:value` tag.
    #[arg(long = "tag", value_parser = parse_tag)]
    tags: Vec<Tag>,
}

fn parse_tag(raw: &str) -> Result<Tag, String> {
    let (name, value) = raw.split_once(':').ok_or_else(|| format!("expected name:value, got {raw:?}"))?;
    Ok(Tag { name: name.to_owned(), value: value.to_owned() })
}

#[tokio::main]
async fn main() -> ExitCode {
    let log_level = std::env::var("LOG_LEVEL").unwrap_or_else(|_| "info".to_owned());
    tracing_subscriber::fmt().with_env_filter(EnvFilter::new(log_level)).init();

    let args = Args::parse();
    let payload = match std::fs::read(&args.payload) {
        Ok(bytes) => bytes::Bytes::from(bytes),
        Err(e) => {
            eprintln!("could not read {}: {e}", args.payload.display());
            return ExitCode::FAILURE;
        }
    };

    match upload(&args.broker_url, &args.bundler_url, payload, args.tags, args.target, args.anchor).await {
        Ok(result) => {
            println!("signed and bundled as {} ({})", result.item_id, result.bundler_status);
            ExitCode::SUCCESS
        }
        Err(e) => {
            eprintln!("{}", describe(&e));
            ExitCode::FAILURE
        }
    }
}

fn describe(error: &UploadError) -> String {
    match error {
        UploadError::BrokerUnavailable => "no broker is reachable and none could be started".to_owned(),
        UploadError::SubmitFailed { status, body } => format!("broker rejected the submission: {status} {body}"),
        UploadError::SigningTimeout => "timed out waiting for the payload to be signed".to_owned(),
        UploadError::SignedFetchFailed => "could not fetch the signed bytes from the broker".to_owned(),
        UploadError::BundlerRejected { status, body, item_id } => {
            format!("bundler rejected item {item_id}: {status} {body}")
        }
    }
}
