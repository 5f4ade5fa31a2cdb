//! Label-setting relaxation over the resource node graph.
//!
//! Both solvers share one loop: settle the best unsettled node, then relax its
//! outgoing connections. [`solve_to_goal`] minimises cost with the boss as the
//! single source; [`solve_max_value`] maximises collected value outward from a
//! start node.
//!
//! The maximising variant keeps the greedy "settle the best label first" rule
//! of the minimising one. That is only exact on acyclic structure; on general
//! maps it is a heuristic and may miss the true maximum-value route.

use std::cmp::Ordering;
use std::collections::{BTreeMap, BinaryHeap, HashSet};

use log::debug;
use serde::Serialize;

use crate::error::{NoRouteReason, RouteError, StartProblem};
use crate::graph::AdjacencyTable;
use crate::grid::{Point, TileType};
use crate::scan::{Connection, Scanner};
use crate::settings::Multipliers;

/// A resource node with its current label.
///
/// `label` is `None` while the node is unreached, which stands for +∞ when
/// minimising cost and −∞ when maximising value.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct GraphNode {
    pub position: Point,
    pub tile: TileType,
    pub label: Option<i64>,
    pub previous: Option<Point>,
    /// Positions from this node back to `previous`, both inclusive
    pub path_to_previous: Vec<Point>,
}

impl GraphNode {
    fn unreached(position: Point, tile: TileType) -> Self {
        Self {
            position,
            tile,
            label: None,
            previous: None,
            path_to_previous: Vec::new(),
        }
    }
}

/// Solver output keyed by node position, in row-major order
pub type NodeTable = BTreeMap<Point, GraphNode>;

/// A route ready to be drawn
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct Route {
    /// Resource node the route starts from
    pub start: Point,
    /// Resource nodes visited in travel order, `start` first
    pub stops: Vec<Point>,
    /// Every tile walked in travel order
    pub path: Vec<Point>,
    /// Total cost for a route to the boss, collected value for a treasure run
    pub total: i64,
}

/// What a relaxation optimises
trait Objective {
    /// Heap priority of a label; the highest priority is settled first
    fn priority(&self, label: i64) -> i64;

    /// Label change along a connection
    fn gain(&self, connection: &Connection) -> i64;

    /// Whether the connections of a settled node are relaxed at all
    fn expands(&self, node: &GraphNode) -> bool;

    /// Whether a node of this type may receive a label through a connection
    fn admits(&self, target: TileType) -> bool;
}

/// Minimum cost to the boss
struct ShortestToGoal;

impl Objective for ShortestToGoal {
    fn priority(&self, label: i64) -> i64 {
        label.saturating_neg()
    }

    fn gain(&self, connection: &Connection) -> i64 {
        i64::try_from(connection.weight).unwrap_or(i64::MAX)
    }

    fn expands(&self, _node: &GraphNode) -> bool {
        true
    }

    fn admits(&self, _target: TileType) -> bool {
        true
    }
}

/// Maximum monster and treasure value collected from a start node
struct MostValue {
    multipliers: Multipliers,
    fountains_only: bool,
}

impl Objective for MostValue {
    fn priority(&self, label: i64) -> i64 {
        label
    }

    fn gain(&self, connection: &Connection) -> i64 {
        self.multipliers.value(connection.contents)
    }

    /// The boss ends a run, and so does a bonfire when only fountains count.
    /// This holds for the start node too.
    fn expands(&self, node: &GraphNode) -> bool {
        node.tile != TileType::Boss
            && (!self.fountains_only || node.tile == TileType::Fountain)
    }

    fn admits(&self, target: TileType) -> bool {
        !self.fountains_only || target == TileType::Fountain
    }
}

/// The objects that we store in the priority queue
#[derive(Debug, PartialEq, Eq)]
struct ToVisit {
    priority: i64,
    point: Point,
}

impl Ord for ToVisit {
    fn cmp(&self, other: &Self) -> Ordering {
        // equal priorities settle in row-major order
        self.priority
            .cmp(&other.priority)
            .then_with(|| other.point.cmp(&self.point))
    }
}

impl PartialOrd for ToVisit {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

fn relax<O: Objective>(adjacency: &AdjacencyTable, source: Point, objective: &O) -> NodeTable {
    let mut nodes: NodeTable = adjacency
        .iter()
        .map(|(point, node)| (point, GraphNode::unreached(point, node.tile)))
        .collect();

    let mut settled: HashSet<Point> = HashSet::with_capacity(nodes.len());
    let mut visit_list = BinaryHeap::new();

    if let Some(node) = nodes.get_mut(&source) {
        node.label = Some(0);
        visit_list.push(ToVisit {
            priority: objective.priority(0),
            point: source,
        });
    }

    while let Some(visit) = visit_list.pop() {
        if !settled.insert(visit.point) {
            continue;
        }

        let Some(current) = nodes.get(&visit.point) else {
            continue;
        };
        let Some(label) = current.label else {
            continue;
        };
        if !objective.expands(current) {
            continue;
        }

        for connection in adjacency.connections(visit.point) {
            if settled.contains(&connection.target) {
                continue;
            }
            let Some(target) = nodes.get_mut(&connection.target) else {
                continue;
            };
            if !objective.admits(target.tile) {
                continue;
            }

            let candidate = label.saturating_add(objective.gain(connection));
            let improves = match target.label {
                None => true,
                Some(existing) => match objective
                    .priority(candidate)
                    .cmp(&objective.priority(existing))
                {
                    Ordering::Greater => true,
                    // equally good, keep the one with fewer steps
                    Ordering::Equal => target.path_to_previous.len() > connection.path.len(),
                    Ordering::Less => false,
                },
            };
            if !improves {
                continue;
            }

            let relabelled = target.label != Some(candidate);
            target.label = Some(candidate);
            target.previous = Some(visit.point);
            target.path_to_previous = connection.path.iter().rev().copied().collect();

            if relabelled {
                visit_list.push(ToVisit {
                    priority: objective.priority(candidate),
                    point: connection.target,
                });
            }
        }
    }

    nodes
}

/// Labels every node with its minimum cost to the boss.
///
/// Connections are stored as "from X the scan reached Y", so relaxing from the
/// boss outward gives each node a predecessor one step closer to the boss.
pub fn solve_to_goal(adjacency: &AdjacencyTable) -> NodeTable {
    let nodes = relax(adjacency, adjacency.goal(), &ShortestToGoal);

    debug!(
        "solved distances to the goal at {}: {} of {} nodes connected",
        adjacency.goal(),
        nodes.values().filter(|node| node.label.is_some()).count(),
        nodes.len()
    );

    nodes
}

/// Labels every node with the most value collectable on the way from `start`.
///
/// With `fountains_only`, only fountains receive labels or lead anywhere, so a
/// run from a bonfire stays where it started. The boss is never passed through.
pub fn solve_max_value(
    adjacency: &AdjacencyTable,
    start: Point,
    fountains_only: bool,
    multipliers: Multipliers,
) -> NodeTable {
    let objective = MostValue {
        multipliers,
        fountains_only,
    };
    let nodes = relax(adjacency, start, &objective);

    debug!(
        "solved treasure values from {}: {} nodes reachable",
        start,
        nodes.values().filter(|node| node.label.is_some()).count()
    );

    nodes
}

/// Picks the resource node a route starts from.
///
/// Resource tiles start at themselves. Any other tile scans for reachable
/// fountains and bonfires and picks the closest fountain, or the closest
/// bonfire when no fountain is in reach.
pub fn resolve_start(scanner: &Scanner<'_>, budget: u32, start: Point) -> Result<Point, RouteError> {
    let tile = scanner.grid().get(start).ok_or(RouteError::InvalidStart {
        start,
        reason: StartProblem::OutsideMap,
    })?;

    match tile {
        TileType::Wall => Err(RouteError::InvalidStart {
            start,
            reason: StartProblem::Wall,
        }),
        tile if tile.is_resource() => Ok(start),
        _ => {
            let grid = scanner.grid();
            scanner
                .scan(start, budget)?
                .into_iter()
                .min_by_key(|c| (grid.get(c.target) != Some(TileType::Fountain), c.path.len()))
                .map(|c| c.target)
                .ok_or(RouteError::NoRoute {
                    from: start,
                    reason: NoRouteReason::NoResourceInReach,
                })
        }
    }
}

/// Appends a segment, dropping the first tile if the path already ends on it
fn extend_path(path: &mut Vec<Point>, segment: &[Point]) {
    let skip = match (path.last(), segment.first()) {
        (Some(last), Some(first)) if last == first => 1,
        _ => 0,
    };
    path.extend(segment.iter().skip(skip).copied());
}

/// Follows the predecessor chain from `start` until the boss is reached
pub fn shortest_route(nodes: &NodeTable, start: Point) -> Result<Route, RouteError> {
    let disconnected = RouteError::NoRoute {
        from: start,
        reason: NoRouteReason::Disconnected,
    };

    let first = nodes.get(&start).ok_or(disconnected.clone())?;
    let total = first.label.ok_or(disconnected.clone())?;

    let mut stops = vec![start];
    let mut path = Vec::new();
    let mut node = first;

    while node.tile != TileType::Boss {
        // a chain is never longer than the table
        if stops.len() > nodes.len() {
            return Err(disconnected);
        }
        let previous = node.previous.ok_or(disconnected.clone())?;
        extend_path(&mut path, &node.path_to_previous);
        node = nodes.get(&previous).ok_or(disconnected.clone())?;
        stops.push(previous);
    }

    if path.is_empty() {
        path.push(start);
    }

    Ok(Route {
        start,
        stops,
        path,
        total,
    })
}

/// Builds the treasure run ending at the highest labelled node.
///
/// Among equally valued nodes the first in row-major order wins. The chain is
/// walked back from that endpoint to `start` and then reversed, so the route
/// reads in travel order.
pub fn max_value_route(nodes: &NodeTable, start: Point) -> Result<Route, RouteError> {
    let unreachable = RouteError::NoRoute {
        from: start,
        reason: NoRouteReason::Disconnected,
    };

    let mut endpoint: Option<(&GraphNode, i64)> = None;
    for node in nodes.values() {
        let Some(label) = node.label else {
            continue;
        };
        if endpoint.map_or(true, |(_, best)| label > best) {
            endpoint = Some((node, label));
        }
    }
    let (mut node, total) = endpoint.ok_or(unreachable.clone())?;

    let mut stops = vec![node.position];
    let mut path = Vec::new();

    while node.position != start {
        if stops.len() > nodes.len() {
            return Err(unreachable);
        }
        let previous = node.previous.ok_or(unreachable.clone())?;
        extend_path(&mut path, &node.path_to_previous);
        node = nodes.get(&previous).ok_or(unreachable.clone())?;
        stops.push(previous);
    }

    if path.is_empty() {
        path.push(start);
    }
    path.reverse();
    stops.reverse();

    Ok(Route {
        start,
        stops,
        path,
        total,
    })
}

#[cfg(test)]
mod test {

    use super::*;
    use crate::grid::{DisabledSet, GridMap};
    use crate::settings::Weights;
    use crate::util::parse_map;

    fn build(map: &GridMap, budget: u32, only_through_bonfires: bool) -> AdjacencyTable {
        let disabled = DisabledSet::new();
        let scanner = Scanner::new(map, Weights::default(), &disabled);
        AdjacencyTable::build(&scanner, budget, only_through_bonfires).unwrap()
    }

    /// A fountain in one corner, the boss in the other and a single monster
    /// on the only corridor between them
    fn create_corridor_map() -> GridMap {
        parse_map(
            "F.M..\n\
             XXXX.\n\
             XXXX.\n\
             XXXX.\n\
             XXXXZ\n",
        )
        .unwrap()
    }

    #[test]
    fn test_corridor_route() {
        let map = create_corridor_map();
        let table = build(&map, 10, false);
        let nodes = solve_to_goal(&table);

        let fountain = Point { row: 0, col: 0 };
        let route = shortest_route(&nodes, fountain).unwrap();

        // fountain weight plus one monster
        assert_eq!(route.total, 4);
        assert_eq!(route.path.len(), 9);
        assert_eq!(route.path.first(), Some(&fountain));
        assert_eq!(route.path.last(), Some(&map.boss()));
        assert_eq!(route.stops, vec![fountain, map.boss()]);
    }

    #[test]
    fn test_boss_only_through_bonfires_without_bonfires() {
        let map = create_corridor_map();
        let table = build(&map, 10, true);
        let nodes = solve_to_goal(&table);

        assert!(matches!(
            shortest_route(&nodes, Point { row: 0, col: 0 }),
            Err(RouteError::NoRoute {
                reason: NoRouteReason::Disconnected,
                ..
            })
        ));
    }

    #[test]
    fn test_route_through_intermediate_stop() {
        // the fountain is too far from the boss for a single hop
        let map = parse_map("F....B....Z\n").unwrap();
        let table = build(&map, 5, false);
        let nodes = solve_to_goal(&table);

        let route = shortest_route(&nodes, Point { row: 0, col: 0 }).unwrap();
        assert_eq!(
            route.stops,
            vec![
                Point { row: 0, col: 0 },
                Point { row: 0, col: 5 },
                Point { row: 0, col: 10 }
            ]
        );
        // bonfire 5 + fountain 1
        assert_eq!(route.total, 6);
        // joints are not repeated
        assert_eq!(route.path.len(), 11);
        assert!(route.path.windows(2).all(|w| w[0] != w[1]));
    }

    #[test]
    fn test_route_from_boss_is_trivial() {
        let map = create_corridor_map();
        let nodes = solve_to_goal(&build(&map, 10, false));

        let route = shortest_route(&nodes, map.boss()).unwrap();
        assert_eq!(route.total, 0);
        assert_eq!(route.path, vec![map.boss()]);
        assert_eq!(route.stops, vec![map.boss()]);
    }

    #[test]
    fn test_equal_cost_prefers_fewer_steps() {
        // the boss reaches the fountain over a long walk with a treasure,
        // found first, and over a single step; both cost the same
        let map = parse_map(
            "Z.T\n\
             FX.\n\
             ...\n",
        )
        .unwrap();
        let table = build(&map, 8, false);
        let nodes = solve_to_goal(&table);

        let fountain = Point { row: 1, col: 0 };
        assert_eq!(table.connections(map.boss()).len(), 2);

        let route = shortest_route(&nodes, fountain).unwrap();
        assert_eq!(route.total, 1);
        assert_eq!(route.path, vec![fountain, map.boss()]);
    }

    #[test]
    fn test_idempotent_solve() {
        let map = parse_map(
            "F.M.B\n\
             .X.X.\n\
             T.Z.F\n\
             .X.X.\n\
             B.T.F\n",
        )
        .unwrap();
        let table = build(&map, 6, false);

        assert_eq!(solve_to_goal(&table), solve_to_goal(&table));
    }

    #[test]
    fn test_resolve_start() {
        let map = parse_map(
            "B..X\n\
             ...F\n\
             XZ..\n",
        )
        .unwrap();
        let disabled = DisabledSet::new();
        let scanner = Scanner::new(&map, Weights::default(), &disabled);

        // resource tiles start at themselves
        let bonfire = Point { row: 0, col: 0 };
        assert_eq!(resolve_start(&scanner, 5, bonfire), Ok(bonfire));

        // fountains win over a closer bonfire
        assert_eq!(
            resolve_start(&scanner, 5, Point { row: 0, col: 1 }),
            Ok(Point { row: 1, col: 3 })
        );

        // only the bonfire is within a single step
        assert_eq!(
            resolve_start(&scanner, 1, Point { row: 0, col: 1 }),
            Ok(bonfire)
        );

        assert!(matches!(
            resolve_start(&scanner, 5, Point { row: 0, col: 3 }),
            Err(RouteError::InvalidStart {
                reason: StartProblem::Wall,
                ..
            })
        ));
        assert!(matches!(
            resolve_start(&scanner, 5, Point { row: 7, col: 0 }),
            Err(RouteError::InvalidStart {
                reason: StartProblem::OutsideMap,
                ..
            })
        ));
    }

    #[test]
    fn test_resolve_start_nothing_in_reach() {
        let map = parse_map("..X.F\nZ.X..\n").unwrap();
        let disabled = DisabledSet::new();
        let scanner = Scanner::new(&map, Weights::default(), &disabled);

        assert!(matches!(
            resolve_start(&scanner, 10, Point { row: 0, col: 0 }),
            Err(RouteError::NoRoute {
                reason: NoRouteReason::NoResourceInReach,
                ..
            })
        ));
    }

    /// Minimum summed hop cost over all chains of resource nodes, where every
    /// hop is a simple walk of at most `budget` steps
    fn brute_force_cost(map: &GridMap, budget: u32, from: Point) -> Option<i64> {
        let weights = Weights::default();

        // cheapest single hop between every ordered pair of nodes
        let mut hops: BTreeMap<(Point, Point), i64> = BTreeMap::new();
        for (origin, _) in map.resource_nodes() {
            let mut walk = vec![origin];
            enumerate_walks(map, &weights, budget, &mut walk, 0, &mut |target, cost| {
                let entry = hops.entry((origin, target)).or_insert(i64::MAX);
                *entry = (*entry).min(cost);
            });
        }

        // the boss only connects through its own walks
        let boss = map.boss();
        let mut best: BTreeMap<Point, i64> = BTreeMap::new();
        best.insert(boss, 0);
        // Bellman-Ford over the tiny node set
        let node_count = map.resource_nodes().count();
        for _ in 0..node_count {
            for (&(origin, target), &cost) in &hops {
                if let Some(&known) = best.get(&origin) {
                    let candidate = known + cost;
                    let entry = best.entry(target).or_insert(i64::MAX);
                    *entry = (*entry).min(candidate);
                }
            }
        }
        best.get(&from).copied()
    }

    fn enumerate_walks(
        map: &GridMap,
        weights: &Weights,
        budget: u32,
        walk: &mut Vec<Point>,
        cost: i64,
        emit: &mut dyn FnMut(Point, i64),
    ) {
        if walk.len() > budget as usize {
            return;
        }
        let current = *walk.last().unwrap();
        for direction in crate::grid::Direction::ALL {
            let Some(next) = map.step(current, direction) else {
                continue;
            };
            if walk.contains(&next) {
                continue;
            }
            let tile = map.get(next).unwrap();
            if tile == TileType::Wall {
                continue;
            }
            let cost = cost + weights.of(tile) as i64 * (tile == TileType::Monster) as i64;
            if matches!(tile, TileType::Fountain | TileType::Bonfire) {
                emit(next, cost + weights.of(tile) as i64);
            }
            walk.push(next);
            enumerate_walks(map, weights, budget, walk, cost, emit);
            walk.pop();
        }
    }

    #[test]
    fn test_matches_brute_force() {
        let maps = [
            "F.M.B\n\
             .X.X.\n\
             T.Z.F\n\
             .X.X.\n\
             B.T.F\n",
            "FM..B.\n\
             .XXM.X\n\
             ..MZ..\n\
             BX.XMF\n\
             .M..X.\n\
             F..M.B\n",
            "B.M.F\n\
             MXXX.\n\
             .M.MZ\n",
        ];

        for text in maps {
            let map = parse_map(text).unwrap();
            for budget in [3, 4, 6] {
                let nodes = solve_to_goal(&build(&map, budget, false));
                for (point, tile) in map.resource_nodes() {
                    let expected = brute_force_cost(&map, budget, point);
                    let actual = nodes[&point].label;
                    assert_eq!(
                        actual, expected,
                        "cost of {:?} at {} with budget {} on\n{}",
                        tile, point, budget, map
                    );
                }
            }
        }
    }

    /// The start fountain splits into an upper branch with three treasures and
    /// a lower branch with a monster and a treasure
    fn create_treasure_map() -> GridMap {
        parse_map(
            ".TTTF\n\
             FXXXX\n\
             .MTFZ\n",
        )
        .unwrap()
    }

    #[test]
    fn test_max_value_picks_richest_branch() {
        let map = create_treasure_map();
        let table = build(&map, 5, false);
        let start = Point { row: 1, col: 0 };

        let nodes = solve_max_value(&table, start, true, Multipliers::default());
        assert_eq!(nodes[&Point { row: 2, col: 3 }].label, Some(2));

        let route = max_value_route(&nodes, start).unwrap();
        assert_eq!(route.total, 3);
        assert_eq!(route.stops, vec![start, Point { row: 0, col: 4 }]);
        assert_eq!(route.path.first(), Some(&start));
        assert_eq!(route.path.last(), Some(&Point { row: 0, col: 4 }));
        assert_eq!(route.path.len(), 6);
    }

    #[test]
    fn test_max_value_fountains_only() {
        let map = parse_map("FTTB\nXXXZ\n").unwrap();
        let table = build(&map, 4, false);
        let start = Point { row: 0, col: 0 };

        let only_fountains = solve_max_value(&table, start, true, Multipliers::default());
        assert_eq!(only_fountains[&Point { row: 0, col: 3 }].label, None);
        let route = max_value_route(&only_fountains, start).unwrap();
        assert_eq!(route.total, 0);
        assert_eq!(route.path, vec![start]);

        let any_stop = solve_max_value(&table, start, false, Multipliers::default());
        let route = max_value_route(&any_stop, start).unwrap();
        assert_eq!(route.total, 2);
        assert_eq!(route.stops, vec![start, Point { row: 0, col: 3 }]);
    }

    #[test]
    fn test_boss_is_never_a_stop() {
        let map = parse_map("F.Z.TTF\n").unwrap();
        let table = build(&map, 6, false);
        let start = Point { row: 0, col: 0 };

        let nodes = solve_max_value(&table, start, false, Multipliers::default());
        assert_eq!(nodes[&map.boss()].label, None);
        // walks may still cross the boss tile
        assert_eq!(nodes[&Point { row: 0, col: 6 }].label, Some(2));
    }

    #[test]
    fn test_max_value_uses_multipliers() {
        let map = create_treasure_map();
        let table = build(&map, 5, false);
        let start = Point { row: 1, col: 0 };
        let multipliers = Multipliers {
            monster: 5,
            treasure: 1,
        };

        let nodes = solve_max_value(&table, start, true, multipliers);
        let route = max_value_route(&nodes, start).unwrap();

        assert_eq!(route.total, 6);
        assert_eq!(route.stops, vec![start, Point { row: 2, col: 3 }]);
    }

    #[test]
    fn test_dead_end_starts_collect_nothing() {
        let map = parse_map("BTTF\nXXXZ\n").unwrap();
        let table = build(&map, 4, false);
        let bonfire = Point { row: 0, col: 0 };

        let nodes = solve_max_value(&table, bonfire, true, Multipliers::default());
        let route = max_value_route(&nodes, bonfire).unwrap();
        assert_eq!(route.total, 0);
        assert_eq!(route.path, vec![bonfire]);
        assert_eq!(route.stops, vec![bonfire]);

        // bonfires lead on once they count as stops
        let nodes = solve_max_value(&table, bonfire, false, Multipliers::default());
        assert_eq!(max_value_route(&nodes, bonfire).unwrap().total, 2);

        for fountains_only in [true, false] {
            let nodes = solve_max_value(&table, map.boss(), fountains_only, Multipliers::default());
            let route = max_value_route(&nodes, map.boss()).unwrap();
            assert_eq!(route.total, 0);
            assert_eq!(route.path, vec![map.boss()]);
        }
    }

    #[test]
    fn test_equal_value_prefers_fewer_steps() {
        // a monster on the direct way down and a treasure on the detour,
        // the detour being found first
        let map = parse_map(
            "F.T\n\
             MX.\n\
             F..\n\
             XXZ\n",
        )
        .unwrap();
        let table = build(&map, 6, false);
        let start = Point { row: 0, col: 0 };
        let target = Point { row: 2, col: 0 };
        assert_eq!(table.connections(start).len(), 2);

        let nodes = solve_max_value(&table, start, true, Multipliers::default());
        let route = max_value_route(&nodes, start).unwrap();

        assert_eq!(route.total, 1);
        assert_eq!(route.path, vec![start, Point { row: 1, col: 0 }, target]);
    }
}
