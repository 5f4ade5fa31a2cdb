//! Resource node graph extracted from a map.

use std::collections::BTreeMap;

use log::debug;
use serde::Serialize;

use crate::error::RouteError;
use crate::grid::{Point, TileType};
use crate::scan::{Connection, Scanner};

/// Outgoing connections of a single resource node
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct Adjacency {
    pub tile: TileType,
    pub connections: Vec<Connection>,
}

/// Every resource node of a map and the nodes it can reach within the step
/// budget. Rebuilt wholesale whenever the budget, the weights or the boss
/// restriction change; never patched.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct AdjacencyTable {
    goal: Point,
    budget: u32,
    nodes: BTreeMap<Point, Adjacency>,
}

impl AdjacencyTable {
    /// Scans from every bonfire, fountain and the boss.
    ///
    /// With `boss_only_through_bonfires` set, fountains are dropped from the
    /// boss's connections so the boss can only be approached from a bonfire.
    pub fn build(
        scanner: &Scanner<'_>,
        budget: u32,
        boss_only_through_bonfires: bool,
    ) -> Result<Self, RouteError> {
        let grid = scanner.grid();
        let mut nodes = BTreeMap::new();

        for (point, tile) in grid.resource_nodes() {
            let mut connections = scanner.scan(point, budget)?;

            if tile == TileType::Boss && boss_only_through_bonfires {
                connections.retain(|c| grid.get(c.target) != Some(TileType::Fountain));
            }

            nodes.insert(point, Adjacency { tile, connections });
        }

        let table = Self {
            goal: grid.boss(),
            budget,
            nodes,
        };

        debug!(
            "built graph with {} nodes and {} connections (budget {})",
            table.len(),
            table.connection_count(),
            budget
        );

        Ok(table)
    }

    /// Position of the boss node
    pub fn goal(&self) -> Point {
        self.goal
    }

    /// The step budget the table was built with
    pub fn budget(&self) -> u32 {
        self.budget
    }

    pub fn tile(&self, point: Point) -> Option<TileType> {
        self.nodes.get(&point).map(|node| node.tile)
    }

    /// Outgoing connections of a node, empty for unknown positions
    pub fn connections(&self, point: Point) -> &[Connection] {
        self.nodes
            .get(&point)
            .map(|node| node.connections.as_slice())
            .unwrap_or(&[])
    }

    /// Nodes in row-major order
    pub fn iter(&self) -> impl Iterator<Item = (Point, &Adjacency)> {
        self.nodes.iter().map(|(point, node)| (*point, node))
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn connection_count(&self) -> usize {
        self.nodes.values().map(|node| node.connections.len()).sum()
    }
}
