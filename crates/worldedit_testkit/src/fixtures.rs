//! Test fixtures and replay helpers.

use serde::Serialize;
use std::io::Write;
use tempfile::NamedTempFile;
use worldedit_world::{
    apply_batch, Edge, Identifier, Position, World, WorldDelta, WorldResult,
};

/// Id of the polygon in [`sample_world`].
pub const SAMPLE_POLYGON: u64 = 10;

/// Id of the network in [`sample_world`].
pub const SAMPLE_NETWORK: u64 = 20;

/// Point ids in [`sample_world`].
pub const SAMPLE_POINTS: [u64; 4] = [1, 2, 3, 4];

/// A small world with four points, one triangle and one edge.
///
/// Point 4 is not referenced by anything.
pub fn sample_world() -> World {
    World::new(1, "harbor")
        .with_point(Identifier::Id(1), Position::new(0.0, 0.0))
        .with_point(Identifier::Id(2), Position::new(4.0, 0.0))
        .with_point(Identifier::Id(3), Position::new(4.0, 3.0))
        .with_point(Identifier::Id(4), Position::new(-2.0, 5.0))
        .with_polygon(
            Identifier::Id(SAMPLE_POLYGON),
            vec![Identifier::Id(1), Identifier::Id(2), Identifier::Id(3)],
        )
        .with_network(
            Identifier::Id(SAMPLE_NETWORK),
            vec![Edge::new(Identifier::Id(1), Identifier::Id(2))],
        )
}

/// Replays uploaded batches in order, as the remote store would.
pub fn replay_batches(initial: &World, batches: &[Vec<WorldDelta>]) -> WorldResult<World> {
    let mut world = initial.clone();
    for batch in batches {
        apply_batch(&mut world, batch)?;
    }
    Ok(world)
}

/// Writes a value as JSON to a temporary file.
///
/// The file is deleted when the handle is dropped.
pub fn temp_json_file<T: Serialize>(value: &T) -> NamedTempFile {
    let mut file = NamedTempFile::new().expect("Failed to create temp file");
    serde_json::to_writer_pretty(&mut file, value).expect("Failed to write JSON");
    file.flush().expect("Failed to flush temp file");
    file
}
