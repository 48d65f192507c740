//! Cooperative shutdown.
//!
//! The replication loop checks a [`ShutdownSignal`] once per iteration.
//! Nothing is interrupted mid-record: a signal that arrives while the loop
//! is polling or producing takes effect at the next iteration boundary.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tracing::{info, warn};

/// Owns the process-wide "stop requested" flag.
#[derive(Debug, Clone, Default)]
pub struct ShutdownController {
    flag: Arc<AtomicBool>,
}

/// Read side of the flag, handed to the replication loop.
#[derive(Debug, Clone)]
pub struct ShutdownSignal {
    flag: Arc<AtomicBool>,
}

impl ShutdownController {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn signal(&self) -> ShutdownSignal {
        ShutdownSignal {
            flag: Arc::clone(&self.flag),
        }
    }

    pub fn trigger(&self) {
        if !self.flag.swap(true, Ordering::SeqCst) {
            info!("Shutdown requested");
        }
    }

    pub fn is_triggered(&self) -> bool {
        self.flag.load(Ordering::SeqCst)
    }

    /// Triggers shutdown on SIGINT and, on Unix, SIGTERM.
    pub fn listen_for_signals(&self) -> tokio::task::JoinHandle<()> {
        let controller = self.clone();
        tokio::spawn(async move {
            wait_for_termination().await;
            controller.trigger();
        })
    }
}

impl ShutdownSignal {
    pub fn is_triggered(&self) -> bool {
        self.flag.load(Ordering::SeqCst)
    }
}

#[cfg(unix)]
async fn wait_for_termination() {
    use tokio::signal::unix::{signal, SignalKind};

    let mut sigterm = match signal(SignalKind::terminate()) {
        Ok(stream) => stream,
        Err(e) => {
            warn!("Failed to install SIGTERM handler: {}", e);
            wait_for_ctrl_c().await;
            return;
        }
    };

    let interrupted = tokio::select! {
        result = tokio::signal::ctrl_c() => Some(result),
        _ = sigterm.recv() => None,
    };

    match interrupted {
        Some(Ok(())) => info!("Received SIGINT"),
        Some(Err(e)) => {
            warn!("Failed to listen for Ctrl+C: {}", e);
            sigterm.recv().await;
            info!("Received SIGTERM");
        }
        None => info!("Received SIGTERM"),
    }
}

#[cfg(not(unix))]
async fn wait_for_termination() {
    wait_for_ctrl_c().await;
}

async fn wait_for_ctrl_c() {
    match tokio::signal::ctrl_c().await {
        Ok(()) => info!("Received SIGINT"),
        Err(e) => {
            // Without any signal source the process runs until killed.
            warn!("Failed to listen for Ctrl+C: {}", e);
            std::future::pending::<()>().await;
        }
    }
}
