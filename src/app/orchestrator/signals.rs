//! Cancellation signal wiring
//!
//! A `watch` channel carries a single "cancel requested" flag. The CLI spawns
//! [`listen_for_shutdown`] so Ctrl+C or SIGTERM flips it; the orchestrator
//! checks it between states and during the streaming copy.

use tokio::signal;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{info, warn};

/// Create a cancellation channel with the flag cleared
pub fn cancellation_channel() -> (watch::Sender<bool>, watch::Receiver<bool>) {
    watch::channel(false)
}

/// Flip `cancel` on Ctrl+C or SIGTERM
pub fn listen_for_shutdown(cancel: watch::Sender<bool>) -> JoinHandle<()> {
    tokio::spawn(async move {
        let ctrl_c = async {
            match signal::ctrl_c().await {
                Ok(()) => info!("Ctrl+C signal received"),
                Err(e) => {
                    warn!("Cannot listen for Ctrl+C: {}", e);
                    std::future::pending::<()>().await;
                }
            }
        };

        #[cfg(unix)]
        let terminate = async {
            match signal::unix::signal(signal::unix::SignalKind::terminate()) {
                Ok(mut stream) => {
                    stream.recv().await;
                    info!("SIGTERM signal received");
                }
                Err(e) => {
                    warn!("Cannot listen for SIGTERM: {}", e);
                    std::future::pending::<()>().await;
                }
            }
        };

        #[cfg(not(unix))]
        let terminate = std::future::pending::<()>();

        tokio::select! {
            _ = ctrl_c => {},
            _ = terminate => {},
        }

        info!("Cancelling download");
        let _ = cancel.send(true);
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;
    use tokio::time::timeout;

    #[tokio::test]
    async fn test_cancellation_channel_propagates() {
        let (tx, mut rx) = cancellation_channel();
        assert!(!*rx.borrow());

        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(10)).await;
            let _ = tx.send(true);
        });

        let changed = timeout(Duration::from_millis(500), rx.changed()).await;
        assert!(changed.is_ok());
        assert!(*rx.borrow());
    }

    #[tokio::test]
    async fn test_listener_can_be_spawned() {
        let (tx, rx) = cancellation_channel();
        let handle = listen_for_shutdown(tx);
        tokio::time::sleep(Duration::from_millis(10)).await;

        assert!(!*rx.borrow());
        handle.abort();
    }
}
