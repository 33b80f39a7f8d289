//! In-memory world store.

use crate::error::{ServerError, ServerResult};
use parking_lot::RwLock;
use std::collections::HashMap;
use worldedit_world::{apply_batch, World, WorldDelta};

/// A world as held by the store.
#[derive(Debug, Clone, PartialEq)]
pub struct StoredWorld {
    /// Current state.
    pub world: World,
    /// Number of batches applied since the world was stored.
    pub revision: u64,
    /// CUID of the editor that sent the last batch.
    pub last_author: Option<String>,
}

/// Thread-safe map of worlds by id.
#[derive(Debug, Default)]
pub struct WorldStore {
    worlds: RwLock<HashMap<u64, StoredWorld>>,
}

impl WorldStore {
    /// Creates an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Stores a world, replacing any world with the same id.
    pub fn insert(&self, world: World) {
        let stored = StoredWorld {
            world,
            revision: 0,
            last_author: None,
        };
        self.worlds.write().insert(stored.world.id(), stored);
    }

    /// Returns a copy of a world.
    pub fn get(&self, id: u64) -> Option<World> {
        self.worlds.read().get(&id).map(|stored| stored.world.clone())
    }

    /// Returns a copy of a world with its bookkeeping.
    pub fn stored(&self, id: u64) -> Option<StoredWorld> {
        self.worlds.read().get(&id).cloned()
    }

    /// Applies a batch to a world, all-or-nothing.
    ///
    /// Returns the new revision.
    pub fn apply(&self, id: u64, author: &str, deltas: &[WorldDelta]) -> ServerResult<u64> {
        let mut worlds = self.worlds.write();
        let stored = worlds.get_mut(&id).ok_or(ServerError::UnknownWorld(id))?;

        apply_batch(&mut stored.world, deltas).map_err(ServerError::DeltaRejected)?;
        stored.revision += 1;
        stored.last_author = Some(author.to_string());
        Ok(stored.revision)
    }

    /// Number of worlds.
    pub fn len(&self) -> usize {
        self.worlds.read().len()
    }

    /// Returns true if the store holds no worlds.
    pub fn is_empty(&self) -> bool {
        self.worlds.read().is_empty()
    }

    /// World ids in ascending order.
    pub fn ids(&self) -> Vec<u64> {
        let mut ids: Vec<u64> = self.worlds.read().keys().copied().collect();
        ids.sort_unstable();
        ids
    }
}
