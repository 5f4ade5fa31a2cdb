//! Route planning on dungeon maps.
//!
//! A map is a rectangular grid of tiles with exactly one boss. Fountains,
//! bonfires and the boss are the resource nodes: a bounded scan from every
//! resource node finds the others it can reach, and two label-setting solvers
//! turn that graph into either the cheapest route to the boss or the most
//! valuable treasure run.

pub mod graph;
pub mod grid;
pub mod locate;
pub mod planner;
pub mod scan;
pub mod settings;
pub mod solve;
pub mod util;

mod error;

pub use error::{GridError, NoRouteReason, PatternError, RouteError, StartProblem};
pub use graph::AdjacencyTable;
pub use grid::{DisabledSet, GridMap, Point, TileType};
pub use locate::{locate, Pattern};
pub use planner::{Planner, RecalculationGate};
pub use scan::{Connection, Contents, ScanLimits, Scanner};
pub use settings::Settings;
pub use solve::{GraphNode, NodeTable, Route};
