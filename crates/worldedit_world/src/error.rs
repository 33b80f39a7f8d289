//! Error types for the world model.

use crate::identifier::Identifier;
use crate::world::Edge;
use std::fmt;
use thiserror::Error;

/// Result type for world operations.
pub type WorldResult<T> = Result<T, WorldError>;

/// Kind of entity referenced by an edit.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntityKind {
    /// A point.
    Point,
    /// A polygon.
    Polygon,
    /// A network.
    Network,
}

impl fmt::Display for EntityKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EntityKind::Point => write!(f, "point"),
            EntityKind::Polygon => write!(f, "polygon"),
            EntityKind::Network => write!(f, "network"),
        }
    }
}

/// Errors that can occur while editing a world.
#[derive(Error, Debug)]
pub enum WorldError {
    /// A referenced entity does not exist.
    #[error("{kind} {id} not found")]
    EntityNotFound {
        /// Kind of entity.
        kind: EntityKind,
        /// Identifier that failed to resolve.
        id: Identifier,
    },

    /// An entity with the same identifier already exists.
    #[error("{kind} {id} already exists")]
    DuplicateEntity {
        /// Kind of entity.
        kind: EntityKind,
        /// Conflicting identifier.
        id: Identifier,
    },

    /// A polygon index is outside the polygon.
    #[error("index {index} out of range for polygon {polygon} with {len} points")]
    IndexOutOfRange {
        /// The polygon.
        polygon: Identifier,
        /// Requested index.
        index: usize,
        /// Number of points in the polygon.
        len: usize,
    },

    /// A network does not contain the edge.
    #[error("edge {edge} not found in network {network}")]
    EdgeNotFound {
        /// The network.
        network: Identifier,
        /// The missing edge.
        edge: Edge,
    },

    /// A network already contains the edge.
    #[error("edge {edge} already present in network {network}")]
    DuplicateEdge {
        /// The network.
        network: Identifier,
        /// The duplicated edge.
        edge: Edge,
    },

    /// A point cannot be deleted while polygons or networks use it.
    #[error("point {0} is still referenced")]
    PointInUse(Identifier),

    /// A PATCH body failed validation.
    #[error("invalid patch: {0}")]
    InvalidPatch(String),

    /// JSON encoding or decoding failed.
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl WorldError {
    /// Creates a not-found error.
    pub fn not_found(kind: EntityKind, id: &Identifier) -> Self {
        Self::EntityNotFound {
            kind,
            id: id.clone(),
        }
    }

    /// Returns true if the edit referenced something that is gone.
    ///
    /// These are the failures an undo or redo runs into when the world
    /// changed underneath the history.
    pub fn is_missing_reference(&self) -> bool {
        matches!(
            self,
            WorldError::EntityNotFound { .. }
                | WorldError::EdgeNotFound { .. }
                | WorldError::IndexOutOfRange { .. }
        )
    }
}
