use tokio::sync::watch;
use tracing::{error, info};

/// Broadcasts a single shutdown request to the cycle loop.
///
/// The loop checks the flag between cycles only, so an in-flight cycle
/// always finishes and persists its decisions before the process exits.
#[derive(Debug, Clone)]
pub struct ShutdownService {
    tx: watch::Sender<bool>,
}

impl ShutdownService {
    pub fn new() -> (Self, watch::Receiver<bool>) {
        let (tx, rx) = watch::channel(false);
        (Self { tx }, rx)
    }

    pub fn subscribe(&self) -> watch::Receiver<bool> {
        self.tx.subscribe()
    }

    pub fn is_requested(&self) -> bool {
        *self.tx.borrow()
    }

    pub fn request(&self, reason: &str) {
        if self.is_requested() {
            return;
        }
        info!("Initiating graceful shutdown: {}", reason);
        self.tx.send_replace(true);
    }

    /// Requests shutdown on the first Ctrl+C.
    pub fn listen_for_ctrl_c(&self) -> tokio::task::JoinHandle<()> {
        let service = self.clone();
        tokio::spawn(async move {
            match tokio::signal::ctrl_c().await {
                Ok(()) => {
                    info!("Received Ctrl+C signal. Finishing the current cycle...");
                    service.request("Ctrl+C");
                }
                Err(err) => {
                    error!("Unable to listen for shutdown signal: {}", err);
                }
            }
        })
    }
}
