//! Property-based test generators using proptest.
//!
//! Edit steps carry seeds rather than concrete ids. A step is resolved
//! against the world at the moment it runs, so any generated script is
//! valid no matter what earlier steps did.

use crate::fixtures::{SAMPLE_NETWORK, SAMPLE_POLYGON};
use proptest::prelude::*;
use serde::{Deserialize, Serialize};
use worldedit_world::{
    create_point, delete_point, insert_network_edge, insert_polygon_point, remove_network_edge,
    remove_polygon_point, rename_world, set_point_positions, Edge, Identifier, Position, World,
    WorldChange,
};

/// One step of a generated editing session.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "step", rename_all = "camelCase")]
pub enum EditStep {
    /// Moves the n-th point.
    MovePoint {
        /// Point seed.
        point: usize,
        /// New position.
        position: Position,
    },
    /// Renames the world.
    Rename {
        /// New name.
        name: String,
    },
    /// Creates a point with a temporary id.
    CreatePoint {
        /// Initial position.
        position: Position,
    },
    /// Deletes the n-th point, if nothing uses it.
    DeletePoint {
        /// Point seed.
        point: usize,
    },
    /// Inserts the n-th point into the sample polygon.
    InsertPolygonPoint {
        /// Point seed.
        point: usize,
        /// Index seed.
        index: usize,
    },
    /// Removes a point from the sample polygon.
    RemovePolygonPoint {
        /// Index seed.
        index: usize,
    },
    /// Adds the edge to the sample network, or removes it if present.
    ToggleEdge {
        /// Start point seed.
        from: usize,
        /// End point seed.
        to: usize,
    },
    /// Undoes one change.
    Undo,
    /// Redoes one change.
    Redo,
    /// Lets time pass, then re-checks the flush thresholds.
    Wait {
        /// Elapsed milliseconds.
        millis: u64,
    },
}

impl EditStep {
    /// Builds the change this step makes to `world`.
    ///
    /// Returns `None` for steps that are not edits and for edits that do not
    /// apply to the current world (deleting a referenced point, editing an
    /// empty polygon, and so on).
    pub fn change(&self, world: &World) -> Option<WorldChange> {
        match self {
            EditStep::MovePoint { point, position } => {
                let point = nth_point(world, *point)?;
                set_point_positions(world, &[(point, *position)]).ok()
            }
            EditStep::Rename { name } => Some(rename_world(world, name.clone())),
            EditStep::CreatePoint { position } => {
                create_point(world, Identifier::new_temporary(), *position).ok()
            }
            EditStep::DeletePoint { point } => delete_point(world, nth_point(world, *point)?).ok(),
            EditStep::InsertPolygonPoint { point, index } => {
                let polygon = Identifier::Id(SAMPLE_POLYGON);
                let len = world.polygon(&polygon)?.len();
                let point = nth_point(world, *point)?;
                insert_polygon_point(world, polygon, index % (len + 1), point).ok()
            }
            EditStep::RemovePolygonPoint { index } => {
                let polygon = Identifier::Id(SAMPLE_POLYGON);
                let len = world.polygon(&polygon)?.len();
                if len == 0 {
                    return None;
                }
                remove_polygon_point(world, polygon, index % len).ok()
            }
            EditStep::ToggleEdge { from, to } => {
                let network = Identifier::Id(SAMPLE_NETWORK);
                let edge = Edge::new(nth_point(world, *from)?, nth_point(world, *to)?);
                if world.network(&network)?.contains(&edge) {
                    remove_network_edge(world, network, edge).ok()
                } else {
                    insert_network_edge(world, network, edge).ok()
                }
            }
            EditStep::Undo | EditStep::Redo | EditStep::Wait { .. } => None,
        }
    }

    /// Returns true for steps that build a change.
    pub fn is_edit(&self) -> bool {
        !matches!(self, EditStep::Undo | EditStep::Redo | EditStep::Wait { .. })
    }
}

fn nth_point(world: &World, seed: usize) -> Option<Identifier> {
    let count = world.point_count();
    if count == 0 {
        return None;
    }
    world.points().nth(seed % count).map(|(id, _)| id.clone())
}

/// Strategy for generating finite positions.
pub fn position_strategy() -> impl Strategy<Value = Position> {
    (-1000.0..1000.0f64, -1000.0..1000.0f64).prop_map(|(x, y)| Position::new(x, y))
}

/// Strategy for generating world names.
pub fn world_name_strategy() -> impl Strategy<Value = String> {
    prop::string::string_regex("[a-z][a-z0-9 ]{0,15}").expect("Invalid regex")
}

/// Strategy for generating a single edit step.
///
/// Undo and redo are weighted up so scripts regularly prune history.
pub fn edit_step_strategy() -> impl Strategy<Value = EditStep> {
    prop_oneof![
        3 => (any::<usize>(), position_strategy())
            .prop_map(|(point, position)| EditStep::MovePoint { point, position }),
        1 => world_name_strategy().prop_map(|name| EditStep::Rename { name }),
        1 => position_strategy().prop_map(|position| EditStep::CreatePoint { position }),
        1 => any::<usize>().prop_map(|point| EditStep::DeletePoint { point }),
        1 => (any::<usize>(), any::<usize>())
            .prop_map(|(point, index)| EditStep::InsertPolygonPoint { point, index }),
        1 => any::<usize>().prop_map(|index| EditStep::RemovePolygonPoint { index }),
        1 => (any::<usize>(), any::<usize>())
            .prop_map(|(from, to)| EditStep::ToggleEdge { from, to }),
        3 => Just(EditStep::Undo),
        2 => Just(EditStep::Redo),
        1 => (0u64..3000).prop_map(|millis| EditStep::Wait { millis }),
    ]
}

/// Strategy for generating edit scripts of up to `max_len` steps.
pub fn edit_script_strategy(max_len: usize) -> impl Strategy<Value = Vec<EditStep>> {
    prop::collection::vec(edit_step_strategy(), 0..=max_len)
}
