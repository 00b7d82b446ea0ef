//! # filebrowser
//!
//! Backend for a browser-based file manager.
//!
//! Clients list directories, create folders, upload and download files, and
//! copy, move or delete many items in one request. Every item of a batch runs
//! as its own task, concurrently and bounded by a shared limit; the request
//! answers once all items have settled. Task lifecycle changes ("task added",
//! "task ended") are pushed to every connected client over WebSocket or
//! server-sent events.
//!
//! ## Quick Start
//!
//! ```no_run
//! use filebrowser::{Config, FileManager};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = Config {
//!         base_path: "/srv/files".into(),
//!         ..Default::default()
//!     };
//!
//!     let manager = FileManager::new(config).await?;
//!
//!     // Subscribe to task events
//!     let mut events = manager.subscribe();
//!     tokio::spawn(async move {
//!         while let Some(message) = events.receiver.recv().await {
//!             println!("{}: {}", message.event, message.data);
//!         }
//!     });
//!
//!     let copied = manager
//!         .copy("/inbox", &["report.pdf".to_string()], "/archive")
//!         .await?;
//!     println!("copied {} bytes", copied[0]);
//!
//!     Ok(())
//! }
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::unwrap_used)]
#![warn(clippy::expect_used)]

/// REST API module
pub mod api;
/// Concurrent batch dispatch and aggregation
pub mod batch;
/// Configuration types
pub mod config;
/// Error types
pub mod error;
/// Filesystem port and local-disk implementation
pub mod fs;
/// Broadcast hub and subscriber sessions
pub mod hub;
/// Top-level file manager service
pub mod manager;
/// Task registry and observers
pub mod registry;
/// Single-operation task state machine
pub mod task;
/// Core types
pub mod types;
/// Utility functions
pub mod utils;

// unwrap/expect are acceptable in tests for concise failure-on-error assertions
#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
pub(crate) mod test_helpers;

// Re-export commonly used types
pub use batch::{BatchOrchestrator, UploadItem};
pub use config::Config;
pub use error::{ApiError, Error, ErrorDetail, Result, ToHttpStatus};
pub use fs::{FilesystemPort, LocalFilesystem};
pub use hub::{Hub, HubNotifier, Message, Subscription};
pub use manager::FileManager;
pub use registry::{TaskEvent, TaskObserver, TaskRegistry};
pub use task::Task;
pub use types::{FileEntry, FileType, TaskId, TaskInfo, TaskKind, TaskStatus};

/// Helper function to run the file manager with graceful signal handling.
///
/// Waits for a termination signal and then calls the manager's `shutdown()` method.
///
/// - **Unix:** listens for SIGTERM and SIGINT, with fallbacks if signal registration fails.
/// - **Windows/other:** listens for Ctrl+C via `tokio::signal::ctrl_c()`.
///
/// # Example
///
/// ```no_run
/// use filebrowser::{Config, FileManager, run_with_shutdown};
///
/// #[tokio::main]
/// async fn main() -> Result<(), Box<dyn std::error::Error>> {
///     let manager = FileManager::new(Config::default()).await?;
///
///     // Run with automatic signal handling
///     run_with_shutdown(&manager).await?;
///
///     Ok(())
/// }
/// ```
pub async fn run_with_shutdown(manager: &FileManager) -> Result<()> {
    wait_for_signal().await;
    manager.shutdown().await
}

#[cfg(unix)]
async fn wait_for_signal() {
    use tokio::signal::unix::{Signal, SignalKind, signal};

    async fn recv(mut stream: Signal, name: &str) {
        stream.recv().await;
        tracing::info!(signal = name, "Shutdown signal received");
    }

    // Registration can fail in sandboxes; fall back to whatever is available
    match (signal(SignalKind::terminate()), signal(SignalKind::interrupt())) {
        (Ok(term), Ok(int)) => {
            tokio::select! {
                _ = recv(term, "SIGTERM") => {}
                _ = recv(int, "SIGINT") => {}
            }
        }
        (Ok(term), Err(e)) => {
            tracing::warn!(error = %e, "SIGINT handler unavailable, listening for SIGTERM");
            recv(term, "SIGTERM").await;
        }
        (Err(e), Ok(int)) => {
            tracing::warn!(error = %e, "SIGTERM handler unavailable, listening for SIGINT");
            recv(int, "SIGINT").await;
        }
        (Err(term), Err(int)) => {
            tracing::error!(
                sigterm = %term,
                sigint = %int,
                "No signal handlers available, falling back to ctrl_c"
            );
            if let Err(e) = tokio::signal::ctrl_c().await {
                tracing::error!(error = %e, "ctrl_c listener failed");
            }
        }
    }
}

#[cfg(not(unix))]
async fn wait_for_signal() {
    match tokio::signal::ctrl_c().await {
        Ok(()) => tracing::info!(signal = "ctrl_c", "Shutdown signal received"),
        Err(e) => tracing::error!(error = %e, "ctrl_c listener failed"),
    }
}
