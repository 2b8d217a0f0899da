//! Cooperative shutdown signal

use tokio::sync::watch;

/// Create a linked trigger and signal
pub fn channel() -> (ShutdownTrigger, Shutdown) {
    let (tx, rx) = watch::channel(false);
    (ShutdownTrigger { tx }, Shutdown { rx })
}

/// Fires the shutdown signal
#[derive(Debug, Clone)]
pub struct ShutdownTrigger {
    tx: watch::Sender<bool>,
}

impl ShutdownTrigger {
    pub fn trigger(&self) {
        self.tx.send_replace(true);
    }

    /// A new signal linked to this trigger
    pub fn subscribe(&self) -> Shutdown {
        Shutdown {
            rx: self.tx.subscribe(),
        }
    }
}

/// Awaitable shutdown signal
///
/// Clones observe the same trigger. Dropping every trigger counts as
/// shutdown.
#[derive(Debug, Clone)]
pub struct Shutdown {
    rx: watch::Receiver<bool>,
}

impl Shutdown {
    /// Resolve once shutdown is triggered
    pub async fn wait(&mut self) {
        // Err means every trigger is gone.
        let _ = self.rx.wait_for(|triggered| *triggered).await;
    }
}
