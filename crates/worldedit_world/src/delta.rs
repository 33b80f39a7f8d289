//! Edit operations over a [`World`].

use crate::error::{EntityKind, WorldError, WorldResult};
use crate::identifier::Identifier;
use crate::world::{Edge, Position, World};
use serde::{Deserialize, Serialize};
use std::time::{SystemTime, UNIX_EPOCH};
use tracing::debug;
use uuid::Uuid;
use worldedit_history::Delta;

/// New position for one point.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PointPosition {
    /// The point.
    pub point: Identifier,
    /// Where it goes.
    pub position: Position,
}

/// What a delta does.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum DeltaOp {
    /// Renames the world.
    SetWorldName {
        /// New name.
        name: String,
    },
    /// Moves points.
    SetPointPositions {
        /// New positions.
        positions: Vec<PointPosition>,
    },
    /// Creates a point.
    CreatePoint {
        /// Id of the new point.
        point: Identifier,
        /// Initial position.
        position: Position,
    },
    /// Deletes an unreferenced point.
    DeletePoint {
        /// The point.
        point: Identifier,
    },
    /// Inserts a point into a polygon's outline.
    InsertPolygonPoint {
        /// The polygon.
        polygon: Identifier,
        /// Insertion index.
        index: usize,
        /// The inserted point.
        point: Identifier,
    },
    /// Removes a point from a polygon's outline.
    RemovePolygonPoint {
        /// The polygon.
        polygon: Identifier,
        /// Index to remove.
        index: usize,
    },
    /// Adds an edge to a network.
    InsertNetworkEdge {
        /// The network.
        network: Identifier,
        /// The edge.
        edge: Edge,
    },
    /// Removes an edge from a network.
    RemoveNetworkEdge {
        /// The network.
        network: Identifier,
        /// The edge.
        edge: Edge,
    },
}

impl DeltaOp {
    /// Applies the operation.
    ///
    /// Every lookup is checked before anything is written, so a failed
    /// apply leaves the world untouched.
    pub fn apply(&self, world: &mut World) -> WorldResult<()> {
        match self {
            DeltaOp::SetWorldName { name } => {
                world.set_name(name.clone());
            }
            DeltaOp::SetPointPositions { positions } => {
                for entry in positions {
                    world.require_point(&entry.point)?;
                }
                let points = world.points_mut();
                for entry in positions {
                    points.insert(entry.point.clone(), entry.position);
                }
            }
            DeltaOp::CreatePoint { point, position } => {
                if world.point(point).is_some() {
                    return Err(WorldError::DuplicateEntity {
                        kind: EntityKind::Point,
                        id: point.clone(),
                    });
                }
                world.points_mut().insert(point.clone(), *position);
            }
            DeltaOp::DeletePoint { point } => {
                world.require_point(point)?;
                if world.is_point_referenced(point) {
                    return Err(WorldError::PointInUse(point.clone()));
                }
                world.points_mut().remove(point);
            }
            DeltaOp::InsertPolygonPoint {
                polygon,
                index,
                point,
            } => {
                world.require_point(point)?;
                let points = world.polygon_mut(polygon)?;
                if *index > points.len() {
                    return Err(WorldError::IndexOutOfRange {
                        polygon: polygon.clone(),
                        index: *index,
                        len: points.len(),
                    });
                }
                points.insert(*index, point.clone());
            }
            DeltaOp::RemovePolygonPoint { polygon, index } => {
                let points = world.polygon_mut(polygon)?;
                if *index >= points.len() {
                    return Err(WorldError::IndexOutOfRange {
                        polygon: polygon.clone(),
                        index: *index,
                        len: points.len(),
                    });
                }
                points.remove(*index);
            }
            DeltaOp::InsertNetworkEdge { network, edge } => {
                world.require_point(&edge.from)?;
                world.require_point(&edge.to)?;
                let edges = world.network_mut(network)?;
                if edges.contains(edge) {
                    return Err(WorldError::DuplicateEdge {
                        network: network.clone(),
                        edge: edge.clone(),
                    });
                }
                edges.push(edge.clone());
            }
            DeltaOp::RemoveNetworkEdge { network, edge } => {
                let edges = world.network_mut(network)?;
                let position = edges.iter().position(|e| e == edge).ok_or_else(|| {
                    WorldError::EdgeNotFound {
                        network: network.clone(),
                        edge: edge.clone(),
                    }
                })?;
                edges.remove(position);
            }
        }
        Ok(())
    }

    /// Short name of the operation, as used on the wire.
    pub fn kind(&self) -> &'static str {
        match self {
            DeltaOp::SetWorldName { .. } => "setWorldName",
            DeltaOp::SetPointPositions { .. } => "setPointPositions",
            DeltaOp::CreatePoint { .. } => "createPoint",
            DeltaOp::DeletePoint { .. } => "deletePoint",
            DeltaOp::InsertPolygonPoint { .. } => "insertPolygonPoint",
            DeltaOp::RemovePolygonPoint { .. } => "removePolygonPoint",
            DeltaOp::InsertNetworkEdge { .. } => "insertNetworkEdge",
            DeltaOp::RemoveNetworkEdge { .. } => "removeNetworkEdge",
        }
    }
}

/// A uniquely identified edit operation.
///
/// The id lets the store recognise a delta it has already seen.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WorldDelta {
    /// Unique delta id.
    pub id: Uuid,
    /// Creation time in milliseconds since the Unix epoch.
    pub created_at_ms: u64,
    /// The operation.
    #[serde(flatten)]
    pub op: DeltaOp,
}

impl WorldDelta {
    /// Creates a delta with a fresh id, stamped with the current time.
    pub fn new(op: DeltaOp) -> Self {
        let created_at_ms = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|elapsed| elapsed.as_millis() as u64)
            .unwrap_or_default();
        Self {
            id: Uuid::new_v4(),
            created_at_ms,
            op,
        }
    }
}

impl Delta for WorldDelta {
    type Model = World;
    type Error = WorldError;

    fn apply(&self, world: &mut World) -> WorldResult<()> {
        self.op.apply(world)
    }
}

/// Applies a batch of deltas all-or-nothing.
///
/// The batch runs against a copy of the world, which replaces the original
/// only if every delta applied.
pub fn apply_batch(world: &mut World, deltas: &[WorldDelta]) -> WorldResult<()> {
    let mut staged = world.clone();
    for delta in deltas {
        delta.apply(&mut staged)?;
    }
    *world = staged;
    debug!(world = world.id(), deltas = deltas.len(), "applied delta batch");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use Identifier::Id;

    fn world() -> World {
        World::new(1, "harbor")
            .with_point(Id(1), Position::new(0.0, 0.0))
            .with_point(Id(2), Position::new(2.0, 0.0))
            .with_point(Id(3), Position::new(2.0, 2.0))
            .with_point(Id(4), Position::new(9.0, 9.0))
            .with_polygon(Id(10), vec![Id(1), Id(2)])
            .with_network(Id(20), vec![Edge::new(Id(1), Id(2))])
    }

    #[test]
    fn set_point_positions_is_atomic() {
        let mut world = world();
        let op = DeltaOp::SetPointPositions {
            positions: vec![
                PointPosition {
                    point: Id(1),
                    position: Position::new(5.0, 5.0),
                },
                PointPosition {
                    point: Id(99),
                    position: Position::new(6.0, 6.0),
                },
            ],
        };

        let err = op.apply(&mut world).unwrap_err();
        assert!(err.is_missing_reference());
        assert_eq!(world.point(&Id(1)), Some(Position::new(0.0, 0.0)));
    }

    #[test]
    fn create_and_delete_point() {
        let mut world = world();
        let point = Identifier::temporary("new");
        DeltaOp::CreatePoint {
            point: point.clone(),
            position: Position::new(1.0, 1.0),
        }
        .apply(&mut world)
        .unwrap();
        assert_eq!(world.point(&point), Some(Position::new(1.0, 1.0)));

        let duplicate = DeltaOp::CreatePoint {
            point: point.clone(),
            position: Position::default(),
        };
        assert!(matches!(
            duplicate.apply(&mut world),
            Err(WorldError::DuplicateEntity { .. })
        ));

        DeltaOp::DeletePoint { point: point.clone() }
            .apply(&mut world)
            .unwrap();
        assert_eq!(world.point(&point), None);
    }

    #[test]
    fn referenced_point_cannot_be_deleted() {
        let mut world = world();
        let result = DeltaOp::DeletePoint { point: Id(1) }.apply(&mut world);
        assert!(matches!(result, Err(WorldError::PointInUse(_))));
        assert!(world.point(&Id(1)).is_some());
    }

    #[test]
    fn polygon_insert_and_remove() {
        let mut world = world();
        DeltaOp::InsertPolygonPoint {
            polygon: Id(10),
            index: 2,
            point: Id(3),
        }
        .apply(&mut world)
        .unwrap();
        assert_eq!(world.polygon(&Id(10)).unwrap(), &[Id(1), Id(2), Id(3)]);

        DeltaOp::RemovePolygonPoint {
            polygon: Id(10),
            index: 0,
        }
        .apply(&mut world)
        .unwrap();
        assert_eq!(world.polygon(&Id(10)).unwrap(), &[Id(2), Id(3)]);

        let result = DeltaOp::RemovePolygonPoint {
            polygon: Id(10),
            index: 2,
        }
        .apply(&mut world);
        assert!(matches!(
            result,
            Err(WorldError::IndexOutOfRange { len: 2, .. })
        ));
    }

    #[test]
    fn network_edges() {
        let mut world = world();
        let edge = Edge::new(Id(2), Id(3));
        DeltaOp::InsertNetworkEdge {
            network: Id(20),
            edge: edge.clone(),
        }
        .apply(&mut world)
        .unwrap();
        assert_eq!(world.network(&Id(20)).unwrap().len(), 2);

        let again = DeltaOp::InsertNetworkEdge {
            network: Id(20),
            edge: edge.clone(),
        };
        assert!(matches!(
            again.apply(&mut world),
            Err(WorldError::DuplicateEdge { .. })
        ));

        DeltaOp::RemoveNetworkEdge {
            network: Id(20),
            edge: edge.clone(),
        }
        .apply(&mut world)
        .unwrap();
        let missing = DeltaOp::RemoveNetworkEdge {
            network: Id(20),
            edge,
        };
        assert!(matches!(
            missing.apply(&mut world),
            Err(WorldError::EdgeNotFound { .. })
        ));
    }

    #[test]
    fn unknown_network_is_reported() {
        let mut world = world();
        let result = DeltaOp::InsertNetworkEdge {
            network: Id(21),
            edge: Edge::new(Id(1), Id(3)),
        }
        .apply(&mut world);
        match result {
            Err(WorldError::EntityNotFound { kind, id }) => {
                assert_eq!(kind, EntityKind::Network);
                assert_eq!(id, Id(21));
            }
            other => panic!("unexpected result: {other:?}"),
        }
    }

    #[test]
    fn wire_format() {
        let delta = WorldDelta::new(DeltaOp::SetWorldName {
            name: "bay".into(),
        });
        let value = serde_json::to_value(&delta).unwrap();
        assert_eq!(value["type"], "setWorldName");
        assert_eq!(value["name"], "bay");
        assert!(value["createdAtMs"].as_u64().is_some());

        let parsed: WorldDelta = serde_json::from_value(value).unwrap();
        assert_eq!(parsed, delta);
    }

    #[test]
    fn batch_is_all_or_nothing() {
        let mut world = world();
        let batch = vec![
            WorldDelta::new(DeltaOp::SetWorldName {
                name: "renamed".into(),
            }),
            WorldDelta::new(DeltaOp::DeletePoint { point: Id(42) }),
        ];
        assert!(apply_batch(&mut world, &batch).is_err());
        assert_eq!(world.name(), "harbor");

        apply_batch(&mut world, &batch[..1]).unwrap();
        assert_eq!(world.name(), "renamed");
    }

    #[test]
    fn delta_ids_are_unique() {
        let a = WorldDelta::new(DeltaOp::DeletePoint { point: Id(4) });
        let b = WorldDelta::new(DeltaOp::DeletePoint { point: Id(4) });
        assert_ne!(a.id, b.id);
        assert_eq!(a.op.kind(), "deletePoint");
    }
}
