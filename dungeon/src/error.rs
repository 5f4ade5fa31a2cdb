use thiserror::Error;

use crate::grid::Point;

/// Why a start position was rejected before any search ran
#[derive(Copy, Clone, Debug, PartialEq, Eq, Error)]
pub enum StartProblem {
    #[error("it lies outside the map")]
    OutsideMap,
    #[error("it is a wall")]
    Wall,
}

/// Why a search finished without a usable route
#[derive(Copy, Clone, Debug, PartialEq, Eq, Error)]
pub enum NoRouteReason {
    #[error("no fountain or bonfire is within reach")]
    NoResourceInReach,
    #[error("it is not connected to the goal")]
    Disconnected,
}

/// Errors raised by the scanner, the graph builder and both solvers.
///
/// None of these are retried internally. A caller must never present an empty
/// or partial route in place of one of these errors.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RouteError {
    #[error("invalid start position {start}: {reason}")]
    InvalidStart { start: Point, reason: StartProblem },

    #[error("no route from {from}: {reason}")]
    NoRoute { from: Point, reason: NoRouteReason },

    #[error(
        "search aborted after exploring {branches} branches with a step budget of {budget}; \
         lower the step budget for a map of this size"
    )]
    SearchAborted { branches: u64, budget: u32 },

    #[error("search cancelled")]
    Cancelled,
}

/// Errors raised while loading a map
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum GridError {
    #[error("the map contains no tiles")]
    Empty,

    #[error("row {row} has {found} tiles but the map is {expected} tiles wide")]
    Ragged {
        row: usize,
        expected: usize,
        found: usize,
    },

    #[error("the map has no boss tile")]
    MissingBoss,

    #[error("the map has more than one boss tile: {first} and {second}")]
    MultipleBosses { first: Point, second: Point },

    #[error("unrecognized map token {token:?} at row {row}, column {col}")]
    UnknownToken { token: char, row: usize, col: usize },
}

/// Errors raised by the position locator
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PatternError {
    #[error("a pattern needs at least 3x3 tiles to locate a position, got {columns}x{rows}")]
    TooSmall { rows: usize, columns: usize },

    #[error("pattern row {row} has {found} tiles but the first row has {expected}")]
    Ragged {
        row: usize,
        expected: usize,
        found: usize,
    },

    #[error("unrecognized pattern token {token:?} at row {row}, column {col}")]
    UnknownToken { token: char, row: usize, col: usize },

    #[error("the pattern does not occur anywhere on the map")]
    NotFound,
}
