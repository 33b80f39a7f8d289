//! The editable world model.

use crate::error::{EntityKind, WorldError, WorldResult};
use crate::identifier::Identifier;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// A 2D position.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Position {
    /// Horizontal coordinate.
    pub x: f64,
    /// Vertical coordinate.
    pub y: f64,
}

impl Position {
    /// Creates a position.
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }
}

/// A directed connection between two points of a network.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Edge {
    /// Start point.
    pub from: Identifier,
    /// End point.
    pub to: Identifier,
}

impl Edge {
    /// Creates an edge.
    pub fn new(from: Identifier, to: Identifier) -> Self {
        Self { from, to }
    }
}

impl fmt::Display for Edge {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}->{}", self.from, self.to)
    }
}

/// A world: named collections of points, polygons and networks.
///
/// Polygons and networks reference points by identifier. The model is owned
/// by the editor; the history only mutates it through deltas.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(into = "WorldSnapshot", from = "WorldSnapshot")]
pub struct World {
    id: u64,
    name: String,
    points: BTreeMap<Identifier, Position>,
    polygons: BTreeMap<Identifier, Vec<Identifier>>,
    networks: BTreeMap<Identifier, Vec<Edge>>,
}

impl World {
    /// Creates an empty world.
    pub fn new(id: u64, name: impl Into<String>) -> Self {
        Self {
            id,
            name: name.into(),
            points: BTreeMap::new(),
            polygons: BTreeMap::new(),
            networks: BTreeMap::new(),
        }
    }

    /// Adds a point.
    pub fn with_point(mut self, id: Identifier, position: Position) -> Self {
        self.points.insert(id, position);
        self
    }

    /// Adds a polygon over existing points.
    pub fn with_polygon(mut self, id: Identifier, points: Vec<Identifier>) -> Self {
        self.polygons.insert(id, points);
        self
    }

    /// Adds a network.
    pub fn with_network(mut self, id: Identifier, edges: Vec<Edge>) -> Self {
        self.networks.insert(id, edges);
        self
    }

    /// Returns the world id.
    pub fn id(&self) -> u64 {
        self.id
    }

    /// Returns the world name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Returns a point's position.
    pub fn point(&self, id: &Identifier) -> Option<Position> {
        self.points.get(id).copied()
    }

    /// Iterates over all points.
    pub fn points(&self) -> impl Iterator<Item = (&Identifier, Position)> + '_ {
        self.points.iter().map(|(id, position)| (id, *position))
    }

    /// Returns a polygon's points in order.
    pub fn polygon(&self, id: &Identifier) -> Option<&[Identifier]> {
        self.polygons.get(id).map(Vec::as_slice)
    }

    /// Returns a network's edges.
    pub fn network(&self, id: &Identifier) -> Option<&[Edge]> {
        self.networks.get(id).map(Vec::as_slice)
    }

    /// Returns the number of points.
    pub fn point_count(&self) -> usize {
        self.points.len()
    }

    /// Returns true if any polygon or network references the point.
    pub fn is_point_referenced(&self, point: &Identifier) -> bool {
        self.polygons.values().any(|points| points.contains(point))
            || self
                .networks
                .values()
                .flatten()
                .any(|edge| &edge.from == point || &edge.to == point)
    }

    pub(crate) fn require_point(&self, id: &Identifier) -> WorldResult<Position> {
        self.point(id)
            .ok_or_else(|| WorldError::not_found(EntityKind::Point, id))
    }

    pub(crate) fn require_polygon(&self, id: &Identifier) -> WorldResult<&[Identifier]> {
        self.polygon(id)
            .ok_or_else(|| WorldError::not_found(EntityKind::Polygon, id))
    }

    pub(crate) fn require_network(&self, id: &Identifier) -> WorldResult<&[Edge]> {
        self.network(id)
            .ok_or_else(|| WorldError::not_found(EntityKind::Network, id))
    }

    pub(crate) fn set_name(&mut self, name: String) {
        self.name = name;
    }

    pub(crate) fn points_mut(&mut self) -> &mut BTreeMap<Identifier, Position> {
        &mut self.points
    }

    pub(crate) fn polygon_mut(&mut self, id: &Identifier) -> WorldResult<&mut Vec<Identifier>> {
        self.polygons
            .get_mut(id)
            .ok_or_else(|| WorldError::not_found(EntityKind::Polygon, id))
    }

    pub(crate) fn network_mut(&mut self, id: &Identifier) -> WorldResult<&mut Vec<Edge>> {
        self.networks
            .get_mut(id)
            .ok_or_else(|| WorldError::not_found(EntityKind::Network, id))
    }
}

/// A point as it appears in a world snapshot.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PointRecord {
    /// Point id.
    #[serde(flatten)]
    pub id: Identifier,
    /// Point position.
    pub position: Position,
}

/// A polygon as it appears in a world snapshot.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PolygonRecord {
    /// Polygon id.
    #[serde(flatten)]
    pub id: Identifier,
    /// Ordered point ids.
    pub points: Vec<Identifier>,
}

/// A network as it appears in a world snapshot.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NetworkRecord {
    /// Network id.
    #[serde(flatten)]
    pub id: Identifier,
    /// Edges.
    pub edges: Vec<Edge>,
}

/// Serialized form of a [`World`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WorldSnapshot {
    /// World id.
    pub id: u64,
    /// World name.
    pub name: String,
    /// Points.
    #[serde(default)]
    pub points: Vec<PointRecord>,
    /// Polygons.
    #[serde(default)]
    pub polygons: Vec<PolygonRecord>,
    /// Networks.
    #[serde(default)]
    pub networks: Vec<NetworkRecord>,
}

impl From<World> for WorldSnapshot {
    fn from(world: World) -> Self {
        Self {
            id: world.id,
            name: world.name,
            points: world
                .points
                .into_iter()
                .map(|(id, position)| PointRecord { id, position })
                .collect(),
            polygons: world
                .polygons
                .into_iter()
                .map(|(id, points)| PolygonRecord { id, points })
                .collect(),
            networks: world
                .networks
                .into_iter()
                .map(|(id, edges)| NetworkRecord { id, edges })
                .collect(),
        }
    }
}

impl From<WorldSnapshot> for World {
    fn from(snapshot: WorldSnapshot) -> Self {
        Self {
            id: snapshot.id,
            name: snapshot.name,
            points: snapshot
                .points
                .into_iter()
                .map(|record| (record.id, record.position))
                .collect(),
            polygons: snapshot
                .polygons
                .into_iter()
                .map(|record| (record.id, record.points))
                .collect(),
            networks: snapshot
                .networks
                .into_iter()
                .map(|record| (record.id, record.edges))
                .collect(),
        }
    }
}
