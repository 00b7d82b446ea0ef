//! Shutdown coordination.

use std::time::Duration;

use super::FileManager;

/// How long shutdown waits for in-progress tasks
pub const SHUTDOWN_TIMEOUT: Duration = Duration::from_secs(30);

impl FileManager {
    /// Gracefully shut down the file manager
    ///
    /// 1. Stops accepting new batches (they fail with `ShuttingDown`)
    /// 2. Waits for in-progress tasks to end, up to 30 seconds
    /// 3. Stops the broadcast hub, closing every subscriber
    pub async fn shutdown(&self) -> crate::Result<()> {
        self.shutdown_within(SHUTDOWN_TIMEOUT).await
    }

    /// [`FileManager::shutdown`] with a custom wait for in-progress tasks
    pub async fn shutdown_within(&self, timeout: Duration) -> crate::Result<()> {
        tracing::info!("Initiating graceful shutdown");

        self.operations.stop_accepting();
        tracing::info!("Stopped accepting new batches");

        match tokio::time::timeout(timeout, self.wait_for_in_progress()).await {
            Ok(()) => tracing::info!("All in-progress tasks ended"),
            Err(_) => {
                let remaining = self.operations.in_flight();
                tracing::warn!(
                    remaining,
                    "Timeout waiting for tasks to end, proceeding with shutdown"
                );
            }
        }

        self.hub.shutdown();
        tracing::info!("Graceful shutdown complete");
        Ok(())
    }

    async fn wait_for_in_progress(&self) {
        loop {
            // Items of an accepted batch count before their task is registered
            let dispatched = self.operations.in_flight();
            let in_progress = self.registry.in_progress().await;
            if dispatched == 0 && in_progress == 0 {
                return;
            }

            tracing::debug!(dispatched, in_progress, "Waiting for tasks to end");
            tokio::time::sleep(Duration::from_millis(100)).await;
        }
    }
}
