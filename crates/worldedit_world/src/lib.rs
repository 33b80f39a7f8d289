//! # WorldEdit World
//!
//! The spatial world model edited through the history.
//!
//! This crate provides:
//! - `World`: points, polygons and networks keyed by `Identifier`
//! - `WorldDelta`: serializable edit operations implementing `Delta`
//! - Change builders that capture old state for the backward delta
//! - `PatchWorldBody`: the JSON body shipped to the remote store
//!
//! ## Key Invariants
//!
//! - Applying a delta is all-or-nothing: a missing reference leaves the world untouched
//! - Every change's backward delta restores exactly the state it was built from
//! - Identifiers are either permanent store ids or temporary client ids

#![deny(unsafe_code)]
#![warn(missing_docs)]

mod api;
mod change;
mod delta;
mod error;
mod identifier;
mod world;

pub use api::{Author, PatchWorldBody};
pub use change::{
    create_point, delete_point, insert_network_edge, insert_polygon_point, remove_network_edge,
    remove_polygon_point, rename_world, set_point_positions, WorldChange,
};
pub use delta::{apply_batch, DeltaOp, PointPosition, WorldDelta};
pub use error::{EntityKind, WorldError, WorldResult};
pub use identifier::Identifier;
pub use world::{Edge, NetworkRecord, PointRecord, PolygonRecord, Position, World, WorldSnapshot};
