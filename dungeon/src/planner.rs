//! Planning session over a single map.
//!
//! A [`Planner`] owns the grid, the settings and the disabled tiles, and keeps
//! the last built [`AdjacencyTable`] until a change invalidates it. Every
//! change that affects reachability or cost trips the [`RecalculationGate`];
//! the next query rebuilds the graph from scratch before answering.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use log::debug;

use crate::error::RouteError;
use crate::graph::AdjacencyTable;
use crate::grid::{DisabledSet, GridMap, Point, TileType};
use crate::scan::{ScanLimits, Scanner};
use crate::settings::{Multipliers, Settings, Weights, DEFAULT_MAX_STEPS};
use crate::solve::{self, NodeTable, Route};

/// Latch set by parameter changes and cleared by a successful rebuild
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct RecalculationGate {
    tripped: bool,
}

impl Default for RecalculationGate {
    /// Nothing has been built yet, so a fresh gate starts tripped
    fn default() -> Self {
        Self { tripped: true }
    }
}

impl RecalculationGate {
    pub fn trip(&mut self) {
        self.tripped = true;
    }

    pub fn is_tripped(&self) -> bool {
        self.tripped
    }

    pub fn clear(&mut self) {
        self.tripped = false;
    }
}

pub struct Planner {
    grid: GridMap,
    settings: Settings,
    disabled: DisabledSet,
    gate: RecalculationGate,
    adjacency: Option<Arc<AdjacencyTable>>,
    distances: Option<Arc<NodeTable>>,
    cancel: Arc<AtomicBool>,
}

impl Planner {
    pub fn new(grid: GridMap, settings: Settings) -> Self {
        Self {
            grid,
            settings: settings.sanitized(),
            disabled: DisabledSet::new(),
            gate: RecalculationGate::default(),
            adjacency: None,
            distances: None,
            cancel: Arc::new(AtomicBool::new(false)),
        }
    }

    pub fn grid(&self) -> &GridMap {
        &self.grid
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    pub fn disabled(&self) -> &DisabledSet {
        &self.disabled
    }

    pub fn gate(&self) -> &RecalculationGate {
        &self.gate
    }

    /// Raising the returned flag from another thread makes the running scan
    /// fail with [`RouteError::Cancelled`]. The flag is lowered again once the
    /// cancellation has been reported.
    pub fn cancel_handle(&self) -> Arc<AtomicBool> {
        Arc::clone(&self.cancel)
    }

    fn trip(&mut self, reason: &str) {
        debug!("recalculation gate tripped: {}", reason);
        self.gate.trip();
    }

    /// Sets the step budget, zero selecting the default
    pub fn set_max_steps(&mut self, max_steps: u32) {
        let max_steps = if max_steps == 0 {
            DEFAULT_MAX_STEPS
        } else {
            max_steps
        };
        if self.settings.max_steps != max_steps {
            self.settings.max_steps = max_steps;
            self.trip("step budget changed");
        }
    }

    pub fn set_weights(&mut self, weights: Weights) {
        let mut settings = self.settings;
        settings.boss.weights = weights;
        let weights = settings.sanitized().boss.weights;

        if self.settings.boss.weights != weights {
            self.settings.boss.weights = weights;
            self.trip("weights changed");
        }
    }

    pub fn set_boss_only_through_bonfires(&mut self, enabled: bool) {
        if self.settings.boss.only_through_bonfires != enabled {
            self.settings.boss.only_through_bonfires = enabled;
            self.trip("boss restriction changed");
        }
    }

    pub fn set_fountains_only(&mut self, enabled: bool) {
        if self.settings.treasure.fountains_only != enabled {
            self.settings.treasure.fountains_only = enabled;
            self.trip("fountains-only restriction changed");
        }
    }

    /// Multipliers only enter the value solve, which always runs fresh
    pub fn set_multipliers(&mut self, multipliers: Multipliers) {
        let mut settings = self.settings;
        settings.treasure.multipliers = multipliers;
        self.settings.treasure.multipliers = settings.sanitized().treasure.multipliers;
    }

    pub fn set_limits(&mut self, limits: ScanLimits) {
        if self.settings.limits != limits {
            self.settings.limits = limits;
            self.trip("scan limits changed");
        }
    }

    /// Returns `true` if the tile was not disabled before
    pub fn disable(&mut self, point: Point) -> bool {
        let changed = self.disabled.insert(point);
        if changed {
            self.trip("tile disabled");
        }
        changed
    }

    /// Returns `true` if the tile was disabled before
    pub fn enable(&mut self, point: Point) -> bool {
        let changed = self.disabled.remove(point);
        if changed {
            self.trip("tile enabled");
        }
        changed
    }

    pub fn clear_disabled(&mut self) {
        if !self.disabled.is_empty() {
            self.disabled.clear();
            self.trip("disabled tiles cleared");
        }
    }

    /// Marks everything a treasure run consumes: the monsters and treasures
    /// along its path and the fountains it stops at. Returns how many tiles
    /// were newly disabled.
    pub fn disable_route(&mut self, route: &Route) -> usize {
        let consumed: Vec<Point> = route
            .path
            .iter()
            .filter(|&&point| {
                matches!(
                    self.grid.get(point),
                    Some(TileType::Monster | TileType::Treasure)
                )
            })
            .chain(
                route
                    .stops
                    .iter()
                    .filter(|&&point| self.grid.get(point) == Some(TileType::Fountain)),
            )
            .copied()
            .collect();

        let added = consumed
            .into_iter()
            .filter(|&point| self.disabled.insert(point))
            .count();
        if added > 0 {
            self.trip("route consumed");
        }
        added
    }

    fn scanner(&self) -> Scanner<'_> {
        Scanner::new(&self.grid, self.settings.boss.weights, &self.disabled)
            .with_limits(self.settings.limits)
            .with_cancel(&self.cancel)
    }

    /// Lowers the cancel flag once a cancellation has surfaced
    fn acknowledge<T>(&self, result: Result<T, RouteError>) -> Result<T, RouteError> {
        if let Err(RouteError::Cancelled) = result {
            self.cancel.store(false, Ordering::Relaxed);
        }
        result
    }

    /// Rebuilds the graph if the gate is tripped and returns the current one.
    ///
    /// The gate is only cleared by a successful rebuild, so an aborted or
    /// cancelled build is retried by the next query.
    pub fn refresh(&mut self) -> Result<Arc<AdjacencyTable>, RouteError> {
        if !self.gate.is_tripped() {
            if let Some(adjacency) = &self.adjacency {
                return Ok(Arc::clone(adjacency));
            }
        }

        let result = AdjacencyTable::build(
            &self.scanner(),
            self.settings.max_steps,
            self.settings.boss.only_through_bonfires,
        );
        let adjacency = Arc::new(self.acknowledge(result)?);

        self.adjacency = Some(Arc::clone(&adjacency));
        self.distances = None;
        self.gate.clear();

        Ok(adjacency)
    }

    /// Cost of every node to the boss, solved once per graph
    pub fn distances(&mut self) -> Result<Arc<NodeTable>, RouteError> {
        let adjacency = self.refresh()?;

        if let Some(distances) = &self.distances {
            return Ok(Arc::clone(distances));
        }

        let distances = Arc::new(solve::solve_to_goal(&adjacency));
        self.distances = Some(Arc::clone(&distances));
        Ok(distances)
    }

    fn resolve_start(&self, start: Point) -> Result<Point, RouteError> {
        let result = solve::resolve_start(&self.scanner(), self.settings.max_steps, start);
        self.acknowledge(result)
    }

    /// Cheapest route from `start` to the boss
    pub fn shortest_route(&mut self, start: Point) -> Result<Route, RouteError> {
        let distances = self.distances()?;
        let from = self.resolve_start(start)?;

        let route = solve::shortest_route(&distances, from)?;
        debug!(
            "route from {} to the goal costs {} over {} tiles",
            from,
            route.total,
            route.path.len()
        );
        Ok(route)
    }

    /// Value labels of every node reachable from `start`
    pub fn value_table(&mut self, start: Point) -> Result<NodeTable, RouteError> {
        let adjacency = self.refresh()?;
        let from = self.resolve_start(start)?;
        let treasure = self.settings.treasure;

        Ok(solve::solve_max_value(
            &adjacency,
            from,
            treasure.fountains_only,
            treasure.multipliers,
        ))
    }

    /// Most valuable treasure run from `start`
    pub fn treasure_route(&mut self, start: Point) -> Result<Route, RouteError> {
        let adjacency = self.refresh()?;
        let from = self.resolve_start(start)?;
        let treasure = self.settings.treasure;

        let nodes = solve::solve_max_value(
            &adjacency,
            from,
            treasure.fountains_only,
            treasure.multipliers,
        );
        let route = solve::max_value_route(&nodes, from)?;
        debug!(
            "treasure run from {} collects {} over {} tiles",
            from,
            route.total,
            route.path.len()
        );
        Ok(route)
    }
}
