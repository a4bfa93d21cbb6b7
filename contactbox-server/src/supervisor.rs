//! Top-level supervision of unrecoverable store errors
//!
//! The connection manager never panics on an error it does not recognize.
//! It sends a [`FatalError`] here instead, and whoever owns the
//! [`Supervisor`] (the HTTP server) decides to shut the process down.

use std::future::Future;

use thiserror::Error;
use tokio::sync::mpsc;

/// An error the store reported that is not a connection loss.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("unrecognized store error on connection generation {generation}: {reason}")]
pub struct FatalError {
    pub generation: u64,
    pub reason: String,
}

/// How supervision ended
#[derive(Debug, PartialEq, Eq)]
pub enum Outcome {
    /// Ctrl+C / SIGTERM
    Shutdown,
    /// A fatal error was signalled
    Fatal(FatalError),
}

/// Sending half, held by the connection manager.
#[derive(Debug, Clone)]
pub struct FatalSender {
    tx: mpsc::UnboundedSender<FatalError>,
}

impl FatalSender {
    pub fn signal(&self, err: FatalError) {
        tracing::error!(error = %err, "fatal store error, requesting shutdown");
        if self.tx.send(err).is_err() {
            tracing::warn!("supervisor is gone, fatal error dropped");
        }
    }
}

/// Receiving half, owned by the top-level runner.
#[derive(Debug)]
pub struct Supervisor {
    rx: mpsc::UnboundedReceiver<FatalError>,
}

impl Supervisor {
    pub fn new() -> (Self, FatalSender) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self { rx }, FatalSender { tx })
    }

    /// Wait for Ctrl+C / SIGTERM or the first fatal error.
    pub async fn wait(self) -> Outcome {
        self.wait_with(shutdown_signal()).await
    }

    /// Wait for `shutdown` or the first fatal error.
    pub async fn wait_with<F>(mut self, shutdown: F) -> Outcome
    where
        F: Future<Output = ()>,
    {
        tokio::select! {
            _ = shutdown => Outcome::Shutdown,
            Some(err) = self.rx.recv() => Outcome::Fatal(err),
        }
    }
}

/// Wait for shutdown signal (Ctrl+C or SIGTERM).
async fn shutdown_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c()
            .await
            .expect("failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            tracing::info!("Received Ctrl+C, starting shutdown");
        }
        _ = terminate => {
            tracing::info!("Received SIGTERM, starting shutdown");
        }
    }
}
