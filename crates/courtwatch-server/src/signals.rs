//! Termination signals.
//!
//! SIGTERM and SIGINT (Ctrl+C off unix) flip a watch flag. The scheduler
//! selects on [`ShutdownSignal::wait`] during cycles and between them, and
//! code paths that need to stop the monitor without a signal call
//! [`SignalHandler::trigger_shutdown`].

use std::sync::Arc;

use tokio::sync::watch;
use tracing::{debug, info};

use crate::error::ServerResult;

/// Owns the shutdown flag and the OS signal listener.
pub struct SignalHandler {
    stop_tx: Arc<watch::Sender<bool>>,
    stop_rx: watch::Receiver<bool>,
}

impl Default for SignalHandler {
    fn default() -> Self {
        Self::new()
    }
}

impl SignalHandler {
    /// Creates a handler with the flag cleared.
    pub fn new() -> Self {
        let (stop_tx, stop_rx) = watch::channel(false);
        Self {
            stop_tx: Arc::new(stop_tx),
            stop_rx,
        }
    }

    /// Installs SIGTERM and SIGINT handlers on a background task.
    ///
    /// # Errors
    ///
    /// Returns an IO error if a handler cannot be installed.
    #[cfg(unix)]
    pub fn spawn_listener(&self) -> ServerResult<()> {
        use tokio::signal::unix::{SignalKind, signal};

        let mut term = signal(SignalKind::terminate())?;
        let mut int = signal(SignalKind::interrupt())?;
        let stop_tx = self.stop_tx.clone();

        tokio::spawn(async move {
            let name = tokio::select! {
                _ = term.recv() => "SIGTERM",
                _ = int.recv() => "SIGINT",
            };
            info!(signal = name, "Stopping monitor");
            stop_tx.send_replace(true);
            debug!("Signal listener finished");
        });
        Ok(())
    }

    /// Installs a Ctrl+C handler on a background task.
    #[cfg(not(unix))]
    pub fn spawn_listener(&self) -> ServerResult<()> {
        let stop_tx = self.stop_tx.clone();

        tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                info!(signal = "ctrl-c", "Stopping monitor");
                stop_tx.send_replace(true);
            }
        });
        Ok(())
    }

    /// Returns a waiter for the shutdown flag.
    pub fn shutdown(&self) -> ShutdownSignal {
        ShutdownSignal {
            rx: self.stop_rx.clone(),
        }
    }

    /// Returns true once shutdown was requested.
    pub fn is_shutdown(&self) -> bool {
        *self.stop_rx.borrow()
    }

    /// Requests shutdown as if a signal had arrived.
    pub fn trigger_shutdown(&self) {
        self.stop_tx.send_replace(true);
    }
}

/// Resolves once shutdown is requested.
pub struct ShutdownSignal {
    rx: watch::Receiver<bool>,
}

impl ShutdownSignal {
    /// Waits for the shutdown flag.
    ///
    /// Also resolves when the [`SignalHandler`] is dropped, since nothing
    /// could request shutdown any more.
    pub async fn wait(mut self) {
        // Err: handler dropped.
        let _ = self.rx.wait_for(|stopped| *stopped).await;
    }
}
