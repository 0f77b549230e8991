//! Graceful shutdown handling.

use tokio::sync::broadcast;
use tracing::debug;

/// Broadcasts a single shutdown notification to every running task.
#[derive(Clone)]
pub struct ShutdownSignal {
    sender: broadcast::Sender<()>,
}

impl ShutdownSignal {
    /// Create a new shutdown signal manager.
    pub fn new() -> Self {
        let (sender, _) = broadcast::channel(1);
        Self { sender }
    }

    /// Subscribe to shutdown notifications.
    pub fn subscribe(&self) -> broadcast::Receiver<()> {
        self.sender.subscribe()
    }

    /// Trigger shutdown, returning how many tasks were notified.
    pub fn shutdown(&self) -> usize {
        let notified = self.sender.send(()).unwrap_or(0);
        debug!(notified, "shutdown signal sent");
        notified
    }
}

impl Default for ShutdownSignal {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_all_subscribers_notified() {
        let signal = ShutdownSignal::new();
        let mut rx1 = signal.subscribe();
        let mut rx2 = signal.subscribe();

        assert_eq!(signal.shutdown(), 2);
        assert!(rx1.recv().await.is_ok());
        assert!(rx2.recv().await.is_ok());
    }

    #[test]
    fn test_shutdown_without_subscribers() {
        assert_eq!(ShutdownSignal::new().shutdown(), 0);
    }
}
