// Signal handling module
//
// Supported signals:
// - SIGHUP:  Reload configuration and rebuild the asset snapshot
// - SIGTERM: Graceful shutdown
// - SIGINT:  Graceful shutdown (Ctrl+C)

use std::sync::Arc;
use tokio::sync::Notify;

use crate::logger;

/// Notifications raised by process signals
#[derive(Default)]
pub struct SignalHandler {
    /// SIGTERM, SIGINT
    pub shutdown: Notify,
    /// SIGHUP
    pub reload: Notify,
}

impl SignalHandler {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    fn request_shutdown(&self, signal: &str) {
        logger::log_info(&format!("[SIGNAL] {signal} received, shutting down"));
        // notify_one stores a permit if the accept loop is busy
        self.shutdown.notify_one();
    }
}

/// Spawn the task that turns Unix signals into notifications
///
/// | Signal  | Action            |
/// |---------|-------------------|
/// | SIGHUP  | Reload config     |
/// | SIGTERM | Graceful stop     |
/// | SIGINT  | Graceful stop     |
#[cfg(unix)]
pub fn start_signal_handler(handler: Arc<SignalHandler>) {
    use tokio::signal::unix::{signal, SignalKind};

    tokio::spawn(async move {
        let registered = (|| {
            Ok::<_, std::io::Error>((
                signal(SignalKind::hangup())?,
                signal(SignalKind::terminate())?,
                signal(SignalKind::interrupt())?,
            ))
        })();
        let (mut sighup, mut sigterm, mut sigint) = match registered {
            Ok(signals) => signals,
            Err(e) => {
                logger::log_error(&format!("Failed to register signal handlers: {e}"));
                return;
            }
        };

        logger::log_info(&format!(
            "[SIGNAL] Process ID {}: SIGHUP reloads, SIGTERM/SIGINT stop",
            std::process::id()
        ));

        loop {
            tokio::select! {
                _ = sighup.recv() => {
                    logger::log_info("[SIGNAL] SIGHUP received, reloading configuration");
                    handler.reload.notify_one();
                }
                _ = sigterm.recv() => {
                    handler.request_shutdown("SIGTERM");
                    break;
                }
                _ = sigint.recv() => {
                    handler.request_shutdown("SIGINT");
                    break;
                }
            }
        }
    });
}

/// Non-Unix fallback: only Ctrl+C, no reload
#[cfg(not(unix))]
pub fn start_signal_handler(handler: Arc<SignalHandler>) {
    tokio::spawn(async move {
        match tokio::signal::ctrl_c().await {
            Ok(()) => handler.request_shutdown("Ctrl+C"),
            Err(e) => logger::log_error(&format!("Failed to listen for Ctrl+C: {e}")),
        }
    });
}
