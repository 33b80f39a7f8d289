//! Builders that turn high-level edits into reversible changes.
//!
//! Each builder reads the current state of the world to capture what the
//! backward delta must restore. Builders validate their references up front
//! so an edit that could never apply is rejected before it reaches the
//! history. They do not mutate the world.

use crate::delta::{DeltaOp, PointPosition, WorldDelta};
use crate::error::{EntityKind, WorldError, WorldResult};
use crate::identifier::Identifier;
use crate::world::{Edge, Position, World};
use worldedit_history::Change;

/// A change over a [`World`].
pub type WorldChange = Change<WorldDelta>;

fn change(forward: DeltaOp, backward: DeltaOp) -> WorldChange {
    Change::new(WorldDelta::new(forward), WorldDelta::new(backward))
}

/// Moves points to new positions.
pub fn set_point_positions(
    world: &World,
    moves: &[(Identifier, Position)],
) -> WorldResult<WorldChange> {
    let mut forward = Vec::with_capacity(moves.len());
    let mut backward = Vec::with_capacity(moves.len());
    for (point, position) in moves {
        let old = world.require_point(point)?;
        forward.push(PointPosition {
            point: point.clone(),
            position: *position,
        });
        backward.push(PointPosition {
            point: point.clone(),
            position: old,
        });
    }

    Ok(change(
        DeltaOp::SetPointPositions { positions: forward },
        DeltaOp::SetPointPositions {
            positions: backward,
        },
    ))
}

/// Renames the world.
pub fn rename_world(world: &World, name: impl Into<String>) -> WorldChange {
    change(
        DeltaOp::SetWorldName { name: name.into() },
        DeltaOp::SetWorldName {
            name: world.name().to_owned(),
        },
    )
}

/// Creates a point.
pub fn create_point(
    world: &World,
    point: Identifier,
    position: Position,
) -> WorldResult<WorldChange> {
    if world.point(&point).is_some() {
        return Err(WorldError::DuplicateEntity {
            kind: EntityKind::Point,
            id: point,
        });
    }
    Ok(change(
        DeltaOp::CreatePoint {
            point: point.clone(),
            position,
        },
        DeltaOp::DeletePoint { point },
    ))
}

/// Deletes a point that no polygon or network uses.
pub fn delete_point(world: &World, point: Identifier) -> WorldResult<WorldChange> {
    let position = world.require_point(&point)?;
    if world.is_point_referenced(&point) {
        return Err(WorldError::PointInUse(point));
    }
    Ok(change(
        DeltaOp::DeletePoint {
            point: point.clone(),
        },
        DeltaOp::CreatePoint { point, position },
    ))
}

/// Inserts a point into a polygon at `index`.
pub fn insert_polygon_point(
    world: &World,
    polygon: Identifier,
    index: usize,
    point: Identifier,
) -> WorldResult<WorldChange> {
    world.require_point(&point)?;
    let len = world.require_polygon(&polygon)?.len();
    if index > len {
        return Err(WorldError::IndexOutOfRange {
            polygon,
            index,
            len,
        });
    }
    Ok(change(
        DeltaOp::InsertPolygonPoint {
            polygon: polygon.clone(),
            index,
            point,
        },
        DeltaOp::RemovePolygonPoint { polygon, index },
    ))
}

/// Removes the point at `index` from a polygon.
pub fn remove_polygon_point(
    world: &World,
    polygon: Identifier,
    index: usize,
) -> WorldResult<WorldChange> {
    let points = world.require_polygon(&polygon)?;
    let point = points
        .get(index)
        .cloned()
        .ok_or_else(|| WorldError::IndexOutOfRange {
            polygon: polygon.clone(),
            index,
            len: points.len(),
        })?;
    Ok(change(
        DeltaOp::RemovePolygonPoint {
            polygon: polygon.clone(),
            index,
        },
        DeltaOp::InsertPolygonPoint {
            polygon,
            index,
            point,
        },
    ))
}

/// Connects two points of a network.
pub fn insert_network_edge(
    world: &World,
    network: Identifier,
    edge: Edge,
) -> WorldResult<WorldChange> {
    world.require_point(&edge.from)?;
    world.require_point(&edge.to)?;
    if world.require_network(&network)?.contains(&edge) {
        return Err(WorldError::DuplicateEdge { network, edge });
    }
    Ok(change(
        DeltaOp::InsertNetworkEdge {
            network: network.clone(),
            edge: edge.clone(),
        },
        DeltaOp::RemoveNetworkEdge { network, edge },
    ))
}

/// Disconnects two points of a network.
pub fn remove_network_edge(
    world: &World,
    network: Identifier,
    edge: Edge,
) -> WorldResult<WorldChange> {
    if !world.require_network(&network)?.contains(&edge) {
        return Err(WorldError::EdgeNotFound { network, edge });
    }
    Ok(change(
        DeltaOp::RemoveNetworkEdge {
            network: network.clone(),
            edge: edge.clone(),
        },
        DeltaOp::InsertNetworkEdge { network, edge },
    ))
}
