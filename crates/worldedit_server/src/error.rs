//! Error types for the world server.

use thiserror::Error;
use worldedit_world::WorldError;

/// Result type for server operations.
pub type ServerResult<T> = Result<T, ServerError>;

/// Errors that can occur in the world server.
#[derive(Error, Debug)]
pub enum ServerError {
    /// Invalid request format.
    #[error("invalid request: {0}")]
    InvalidRequest(String),

    /// No world with this id.
    #[error("unknown world: {0}")]
    UnknownWorld(u64),

    /// No route for this path.
    #[error("not found: {0}")]
    RouteNotFound(String),

    /// The route exists but not for this method.
    #[error("method not allowed: {0}")]
    MethodNotAllowed(String),

    /// The batch exceeds the configured limit.
    #[error("patch too large: {len} deltas, limit is {max}")]
    PatchTooLarge {
        /// Deltas in the request.
        len: usize,
        /// Configured maximum.
        max: usize,
    },

    /// A delta in the batch does not apply to the stored world.
    #[error("delta rejected: {0}")]
    DeltaRejected(#[source] WorldError),

    /// Internal server error.
    #[error("internal error: {0}")]
    Internal(String),
}

impl ServerError {
    /// Returns true if this is a client error (4xx).
    pub fn is_client_error(&self) -> bool {
        !self.is_server_error()
    }

    /// Returns true if this is a server error (5xx).
    pub fn is_server_error(&self) -> bool {
        matches!(self, ServerError::Internal(_))
    }

    /// The HTTP status for this error.
    pub fn status_code(&self) -> u16 {
        match self {
            ServerError::InvalidRequest(_) => 400,
            ServerError::UnknownWorld(_) | ServerError::RouteNotFound(_) => 404,
            ServerError::MethodNotAllowed(_) => 405,
            ServerError::DeltaRejected(_) => 409,
            ServerError::PatchTooLarge { .. } => 413,
            ServerError::Internal(_) => 500,
        }
    }
}

impl From<WorldError> for ServerError {
    fn from(err: WorldError) -> Self {
        match err {
            WorldError::InvalidPatch(message) => ServerError::InvalidRequest(message),
            WorldError::Serialization(e) => ServerError::InvalidRequest(e.to_string()),
            other => ServerError::DeltaRejected(other),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use worldedit_world::{EntityKind, Identifier};

    #[test]
    fn error_classification() {
        assert!(ServerError::InvalidRequest("bad".into()).is_client_error());
        assert!(ServerError::Internal("oops".into()).is_server_error());
        assert!(!ServerError::UnknownWorld(3).is_server_error());
    }

    #[test]
    fn status_codes() {
        assert_eq!(ServerError::InvalidRequest("x".into()).status_code(), 400);
        assert_eq!(ServerError::UnknownWorld(1).status_code(), 404);
        assert_eq!(ServerError::MethodNotAllowed("PUT".into()).status_code(), 405);
        assert_eq!(ServerError::PatchTooLarge { len: 5, max: 2 }.status_code(), 413);
        assert_eq!(ServerError::Internal("x".into()).status_code(), 500);
    }

    #[test]
    fn world_errors_map_by_cause() {
        let err: ServerError = WorldError::InvalidPatch("no deltas".into()).into();
        assert_eq!(err.status_code(), 400);

        let err: ServerError = WorldError::not_found(EntityKind::Point, &Identifier::Id(9)).into();
        assert_eq!(err.status_code(), 409);
        assert!(err.to_string().contains("delta rejected"));
    }
}
