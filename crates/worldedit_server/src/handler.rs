//! Request handlers for world endpoints.

use crate::config::ServerConfig;
use crate::error::{ServerError, ServerResult};
use crate::store::WorldStore;
use std::sync::Arc;
use tracing::{info, warn};
use worldedit_world::{PatchWorldBody, WorldDelta};

/// Context for request handling.
pub struct HandlerContext {
    /// Server configuration.
    pub config: ServerConfig,
    /// World store (shared across all handlers).
    pub store: Arc<WorldStore>,
}

impl HandlerContext {
    /// Creates a new handler context.
    pub fn new(config: ServerConfig, store: Arc<WorldStore>) -> Self {
        Self { config, store }
    }
}

/// Handler for world requests.
pub struct RequestHandler {
    context: Arc<HandlerContext>,
}

impl RequestHandler {
    /// Creates a new request handler.
    pub fn new(context: Arc<HandlerContext>) -> Self {
        Self { context }
    }

    /// Handles `PATCH /api/worlds/{id}`.
    ///
    /// Returns the world's new revision.
    pub fn handle_patch(&self, world_id: u64, body: &[u8]) -> ServerResult<u64> {
        let patch: PatchWorldBody<WorldDelta> = serde_json::from_slice(body)
            .map_err(|e| ServerError::InvalidRequest(format!("malformed body: {e}")))?;

        if self.context.config.require_author {
            patch.validate()?;
        } else if patch.deltas.is_empty() {
            return Err(ServerError::InvalidRequest(
                "deltas must contain at least one item".into(),
            ));
        }

        let max = self.context.config.max_deltas_per_patch;
        if patch.deltas.len() > max {
            return Err(ServerError::PatchTooLarge {
                len: patch.deltas.len(),
                max,
            });
        }

        match self
            .context
            .store
            .apply(world_id, &patch.author.cuid, &patch.deltas)
        {
            Ok(revision) => {
                info!(
                    world = world_id,
                    author = %patch.author.cuid,
                    deltas = patch.deltas.len(),
                    revision,
                    "applied patch"
                );
                Ok(revision)
            }
            Err(err) => {
                warn!(
                    world = world_id,
                    author = %patch.author.cuid,
                    error = %err,
                    "rejected patch"
                );
                Err(err)
            }
        }
    }

    /// Handles `GET /api/worlds/{id}`.
    ///
    /// Returns the world snapshot as JSON.
    pub fn handle_get(&self, world_id: u64) -> ServerResult<Vec<u8>> {
        let world = self
            .context
            .store
            .get(world_id)
            .ok_or(ServerError::UnknownWorld(world_id))?;
        serde_json::to_vec(&world).map_err(|e| ServerError::Internal(e.to_string()))
    }
}
