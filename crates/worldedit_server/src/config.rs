//! Server configuration.

/// Configuration for the world server.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Maximum number of deltas accepted in one PATCH.
    pub max_deltas_per_patch: usize,
    /// Whether a PATCH must carry a non-empty author CUID.
    pub require_author: bool,
}

impl ServerConfig {
    /// Creates a new server configuration.
    pub fn new() -> Self {
        Self {
            max_deltas_per_patch: 1000,
            require_author: true,
        }
    }

    /// Sets the maximum batch size.
    pub fn with_max_deltas_per_patch(mut self, max: usize) -> Self {
        self.max_deltas_per_patch = max;
        self
    }

    /// Sets whether an author is required.
    pub fn with_require_author(mut self, require: bool) -> Self {
        self.require_author = require;
        self
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self::new()
    }
}
