//! Bounded reachability scan from a single tile.
//!
//! The scan walks depth-first in the four cardinal directions and branches at
//! every tile, so it reports every fountain and bonfire reachable within the
//! step budget, not only the nearest one. A tile may appear on many
//! independent walks but never twice on the same walk.

use std::collections::HashMap;
use std::iter;
use std::sync::atomic::{AtomicBool, Ordering};

use log::{trace, warn};
use serde::{Deserialize, Serialize};

use crate::error::RouteError;
use crate::grid::{DisabledSet, Direction, GridMap, Point, TileType};
use crate::settings::Weights;

/// How many branches are explored between two polls of the cancel flag
const CANCEL_POLL_INTERVAL: u64 = 1024;

/// Monsters and treasures tallied along a single walk
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Contents {
    pub monsters: u32,
    pub treasures: u32,
}

/// A resource node reachable from the scan origin
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Connection {
    pub target: Point,
    /// Monster penalties along the path plus the weight of the target itself
    pub weight: u64,
    /// Walked positions from the origin to the target, both inclusive
    pub path: Vec<Point>,
    pub contents: Contents,
}

/// Caps a single scan, which is exponential in the step budget on open maps
#[derive(Copy, Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScanLimits {
    pub max_branches: u64,
}

impl Default for ScanLimits {
    fn default() -> Self {
        Self {
            max_branches: 5_000_000,
        }
    }
}

/// One tile on the current walk
#[derive(Copy, Clone, Debug)]
struct Step {
    point: Point,
    cost: u64,
    contents: Contents,
    // index into Direction::ALL of the next branch to try
    next: usize,
}

#[derive(Clone, Debug)]
pub struct Scanner<'a> {
    grid: &'a GridMap,
    weights: Weights,
    disabled: &'a DisabledSet,
    limits: ScanLimits,
    cancel: Option<&'a AtomicBool>,
}

impl<'a> Scanner<'a> {
    pub fn new(grid: &'a GridMap, weights: Weights, disabled: &'a DisabledSet) -> Self {
        Self {
            grid,
            weights,
            disabled,
            limits: ScanLimits::default(),
            cancel: None,
        }
    }

    pub fn with_limits(mut self, limits: ScanLimits) -> Self {
        self.limits = limits;
        self
    }

    /// Polls the flag between branches and fails with [`RouteError::Cancelled`]
    /// once it is raised
    pub fn with_cancel(mut self, cancel: &'a AtomicBool) -> Self {
        self.cancel = Some(cancel);
        self
    }

    pub fn grid(&self) -> &'a GridMap {
        self.grid
    }

    /// Finds every fountain and bonfire reachable from `origin` within `budget` steps.
    ///
    /// The origin itself is never part of the result. Walks that reach the same
    /// target with the same contents are collapsed into the one with the fewest
    /// steps, the first one found winning ties; walks with different contents
    /// are all kept. An origin outside the map or on a wall reaches nothing.
    pub fn scan(&self, origin: Point, budget: u32) -> Result<Vec<Connection>, RouteError> {
        let mut found: Vec<Connection> = Vec::new();
        let mut best: HashMap<(Point, Contents), usize> = HashMap::new();

        match self.grid.get(origin) {
            None | Some(TileType::Wall) => return Ok(found),
            Some(_) => {}
        }

        let max_depth = usize::try_from(budget).unwrap_or(usize::MAX);
        let mut on_walk = self.grid.create_storage(false);
        let mut walk: Vec<Step> = Vec::new();
        let mut branches: u64 = 0;

        let (cost, contents) = self.account(origin, 0, Contents::default());
        *on_walk.get_mut(origin) = true;
        walk.push(Step {
            point: origin,
            cost,
            contents,
            next: 0,
        });

        loop {
            let depth = walk.len();
            let Some(top) = walk.last_mut() else {
                break;
            };

            // out of branches, or one more step would overdraw the budget
            if top.next == Direction::ALL.len() || depth > max_depth {
                *on_walk.get_mut(top.point) = false;
                walk.pop();
                continue;
            }

            let direction = Direction::ALL[top.next];
            top.next += 1;
            let Step {
                point,
                cost,
                contents,
                ..
            } = *top;

            let Some(next) = self.grid.step(point, direction) else {
                continue;
            };
            if on_walk.get(next) {
                continue;
            }
            let tile = match self.grid.get(next) {
                Some(TileType::Wall) | None => continue,
                Some(tile) => tile,
            };

            branches += 1;
            self.check_limits(branches, budget)?;

            let (cost, contents) = self.account(next, cost, contents);

            if matches!(tile, TileType::Fountain | TileType::Bonfire) && !self.disabled.contains(next)
            {
                let connection = Connection {
                    target: next,
                    weight: cost + self.weights.of(tile),
                    path: Vec::new(),
                    contents,
                };
                record(&mut found, &mut best, &walk, connection);
            }

            *on_walk.get_mut(next) = true;
            walk.push(Step {
                point: next,
                cost,
                contents,
                next: 0,
            });
        }

        trace!(
            "scan from {} with budget {}: {} connections, {} branches",
            origin,
            budget,
            found.len(),
            branches
        );

        Ok(found)
    }

    /// Adds the cost and content of entering `point`. Disabled tiles add nothing.
    fn account(&self, point: Point, cost: u64, mut contents: Contents) -> (u64, Contents) {
        if self.disabled.contains(point) {
            return (cost, contents);
        }
        match self.grid.get(point) {
            Some(TileType::Monster) => {
                contents.monsters += 1;
                (cost + self.weights.of(TileType::Monster), contents)
            }
            Some(TileType::Treasure) => {
                contents.treasures += 1;
                (cost, contents)
            }
            _ => (cost, contents),
        }
    }

    fn check_limits(&self, branches: u64, budget: u32) -> Result<(), RouteError> {
        if branches > self.limits.max_branches {
            warn!(
                "scan aborted after {} branches with a step budget of {}",
                branches, budget
            );
            return Err(RouteError::SearchAborted { branches, budget });
        }

        if branches % CANCEL_POLL_INTERVAL == 0 {
            if let Some(cancel) = self.cancel {
                if cancel.load(Ordering::Relaxed) {
                    warn!("scan cancelled after {} branches", branches);
                    return Err(RouteError::Cancelled);
                }
            }
        }

        Ok(())
    }
}

/// Keeps the walk to `connection.target` unless an equally valuable walk with
/// no more steps is already known
fn record(
    found: &mut Vec<Connection>,
    best: &mut HashMap<(Point, Contents), usize>,
    walk: &[Step],
    mut connection: Connection,
) {
    let steps = walk.len() + 1;
    let key = (connection.target, connection.contents);

    if let Some(&index) = best.get(&key) {
        if found[index].path.len() <= steps {
            return;
        }
    }

    connection.path = walk
        .iter()
        .map(|step| step.point)
        .chain(iter::once(connection.target))
        .collect();

    match best.get(&key) {
        Some(&index) => found[index] = connection,
        None => {
            best.insert(key, found.len());
            found.push(connection);
        }
    }
}
