//! Application state for the API server

use crate::{Config, FileManager};
use std::sync::Arc;

/// Shared application state accessible to all route handlers
///
/// Cloned for each request (cheap Arc clone).
#[derive(Clone)]
pub struct AppState {
    /// The file manager every handler delegates to
    pub manager: Arc<FileManager>,

    /// Configuration snapshot the router was built with
    pub config: Arc<Config>,
}

impl AppState {
    /// Create a new AppState
    pub fn new(manager: Arc<FileManager>, config: Arc<Config>) -> Self {
        Self { manager, config }
    }
}
