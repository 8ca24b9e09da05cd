//! Shutdown signalling.
//!
//! SIGINT and SIGTERM (Ctrl+C elsewhere) flip a shared `watch` flag that the
//! HTTP server awaits to begin a graceful shutdown.

use std::io;
use std::sync::Arc;

use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{debug, info};

/// A handle for triggering or checking shutdown status.
#[derive(Debug, Clone)]
pub struct ShutdownHandle {
    tx: Arc<watch::Sender<bool>>,
    rx: watch::Receiver<bool>,
}

impl Default for ShutdownHandle {
    fn default() -> Self {
        Self::new()
    }
}

impl ShutdownHandle {
    pub fn new() -> Self {
        let (tx, rx) = watch::channel(false);
        Self {
            tx: Arc::new(tx),
            rx,
        }
    }

    pub fn trigger(&self) {
        let _ = self.tx.send(true);
    }

    /// Returns a future that completes when shutdown is triggered.
    pub fn signal(&self) -> ShutdownSignal {
        ShutdownSignal {
            rx: self.rx.clone(),
        }
    }

    /// Installs process signal handlers that trigger this handle.
    ///
    /// # Errors
    ///
    /// Fails if a handler cannot be registered with the OS.
    #[cfg(unix)]
    pub fn listen_for_signals(&self) -> io::Result<JoinHandle<()>> {
        use tokio::signal::unix::{SignalKind, signal};

        let mut sigterm = signal(SignalKind::terminate())?;
        let mut sigint = signal(SignalKind::interrupt())?;
        let handle = self.clone();

        Ok(tokio::spawn(async move {
            tokio::select! {
                _ = sigterm.recv() => info!("Received SIGTERM, initiating shutdown"),
                _ = sigint.recv() => info!("Received SIGINT, initiating shutdown"),
                _ = handle.signal().wait() => {}
            }
            handle.trigger();
            debug!("Signal listener stopped");
        }))
    }

    #[cfg(not(unix))]
    pub fn listen_for_signals(&self) -> io::Result<JoinHandle<()>> {
        let handle = self.clone();
        Ok(tokio::spawn(async move {
            tokio::select! {
                Ok(()) = tokio::signal::ctrl_c() => info!("Received Ctrl+C, initiating shutdown"),
                _ = handle.signal().wait() => {}
            }
            handle.trigger();
        }))
    }
}

/// A future-like value that completes when shutdown is signaled.
#[derive(Debug)]
pub struct ShutdownSignal {
    rx: watch::Receiver<bool>,
}

impl ShutdownSignal {
    /// Waits for the shutdown signal. Also returns if every handle is gone.
    pub async fn wait(mut self) {
        let _ = self.rx.wait_for(|shutdown| *shutdown).await;
    }
}
