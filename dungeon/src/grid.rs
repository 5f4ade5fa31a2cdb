use std::collections::HashSet;
use std::fmt::Display;

use serde::{Deserialize, Serialize};

use crate::error::GridError;

/// The closed set of tile types a dungeon map is made of
#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash, Serialize, Deserialize)]
pub enum TileType {
    Path,
    Wall,
    Bonfire,
    Fountain,
    Treasure,
    Monster,
    FamousPlace,
    Boss,
}

impl TileType {
    /// Parses a single map token (case-insensitive)
    pub fn from_token(token: char) -> Option<Self> {
        match token.to_ascii_uppercase() {
            'X' | '+' => Some(TileType::Wall),
            '.' | ' ' => Some(TileType::Path),
            'B' => Some(TileType::Bonfire),
            'F' => Some(TileType::Fountain),
            'T' => Some(TileType::Treasure),
            'M' => Some(TileType::Monster),
            'P' => Some(TileType::FamousPlace),
            'Z' => Some(TileType::Boss),
            _ => None,
        }
    }

    pub fn token(&self) -> char {
        match self {
            TileType::Path => '.',
            TileType::Wall => 'X',
            TileType::Bonfire => 'B',
            TileType::Fountain => 'F',
            TileType::Treasure => 'T',
            TileType::Monster => 'M',
            TileType::FamousPlace => 'P',
            TileType::Boss => 'Z',
        }
    }

    /// Resource nodes are the only tiles that take part in the graph
    pub fn is_resource(&self) -> bool {
        matches!(
            self,
            TileType::Bonfire | TileType::Fountain | TileType::Boss
        )
    }
}

impl Display for TileType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.token())
    }
}

/// A tile position. Ordering is row-major, which is also the order the graph
/// builder discovers nodes in.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Point {
    pub row: usize,
    pub col: usize,
}

impl Display for Point {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "({},{})", self.col, self.row)
    }
}

#[derive(Copy, Clone, Debug, Eq, PartialEq, Serialize, Deserialize)]
pub enum Direction {
    Up,
    Down,
    Left,
    Right,
}

impl Direction {
    /// The order in which a walk branches out of a tile
    pub const ALL: [Direction; 4] = [
        Direction::Left,
        Direction::Right,
        Direction::Up,
        Direction::Down,
    ];
}

/// An immutable rectangular dungeon map with exactly one boss tile.
///
/// A new map replaces the old one wholesale; there is no way to edit tiles in
/// place.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct GridMap {
    rows: usize,
    columns: usize,
    cells: Vec<Vec<TileType>>,
    boss: Point,
}

impl GridMap {
    /// Validates the rows and locates the boss tile
    pub fn new(cells: Vec<Vec<TileType>>) -> Result<Self, GridError> {
        let rows = cells.len();
        let columns = cells.first().map(Vec::len).unwrap_or(0);
        if rows == 0 || columns == 0 {
            return Err(GridError::Empty);
        }

        let mut boss: Option<Point> = None;
        for (row, tiles) in cells.iter().enumerate() {
            if tiles.len() != columns {
                return Err(GridError::Ragged {
                    row,
                    expected: columns,
                    found: tiles.len(),
                });
            }
            for (col, tile) in tiles.iter().enumerate() {
                if *tile != TileType::Boss {
                    continue;
                }
                let point = Point { row, col };
                if let Some(first) = boss {
                    return Err(GridError::MultipleBosses {
                        first,
                        second: point,
                    });
                }
                boss = Some(point);
            }
        }

        let boss = boss.ok_or(GridError::MissingBoss)?;

        Ok(Self {
            rows,
            columns,
            cells,
            boss,
        })
    }

    pub fn rows(&self) -> usize {
        self.rows
    }

    pub fn columns(&self) -> usize {
        self.columns
    }

    /// Position of the goal tile
    pub fn boss(&self) -> Point {
        self.boss
    }

    pub fn is_valid(&self, point: Point) -> bool {
        point.row < self.rows && point.col < self.columns
    }

    /// Returns the tile at the point, or `None` outside the map
    pub fn get(&self, point: Point) -> Option<TileType> {
        self.cells
            .get(point.row)
            .and_then(|row| row.get(point.col))
            .copied()
    }

    /// The neighbouring point in the given direction, if it lies inside the map
    pub fn step(&self, point: Point, direction: Direction) -> Option<Point> {
        let next = match direction {
            Direction::Up => Point {
                row: point.row.checked_sub(1)?,
                col: point.col,
            },
            Direction::Down => Point {
                row: point.row + 1,
                col: point.col,
            },
            Direction::Left => Point {
                row: point.row,
                col: point.col.checked_sub(1)?,
            },
            Direction::Right => Point {
                row: point.row,
                col: point.col + 1,
            },
        };
        self.is_valid(next).then_some(next)
    }

    /// All resource nodes in row-major order
    pub fn resource_nodes(&self) -> impl Iterator<Item = (Point, TileType)> + '_ {
        self.cells.iter().enumerate().flat_map(|(row, tiles)| {
            tiles
                .iter()
                .enumerate()
                .filter(|(_, tile)| tile.is_resource())
                .map(move |(col, tile)| (Point { row, col }, *tile))
        })
    }

    /// Create a flat per-tile storage for values of type T
    pub fn create_storage<T: Copy>(&self, value: T) -> CellStorage<T> {
        CellStorage {
            columns: self.columns,
            cells: vec![value; self.rows * self.columns],
        }
    }
}

impl Display for GridMap {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        for row in &self.cells {
            for cell in row {
                write!(f, "{}", cell)?;
            }
            writeln!(f)?;
        }

        Ok(())
    }
}

/// Per-tile storage in a single row-major vec, indexed by `row * columns + col`
#[derive(Clone, Debug)]
pub struct CellStorage<T> {
    columns: usize,
    cells: Vec<T>,
}

impl<T: Copy> CellStorage<T> {
    pub fn get(&self, point: Point) -> T {
        self.cells[point.row * self.columns + point.col]
    }

    pub fn get_mut(&mut self, point: Point) -> &mut T {
        &mut self.cells[point.row * self.columns + point.col]
    }
}

/// Tiles the player has already consumed or cleared.
///
/// Disabled tiles stay walkable but add neither cost nor content to a walk.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DisabledSet(HashSet<Point>);

impl DisabledSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns `true` if the point was not disabled before
    pub fn insert(&mut self, point: Point) -> bool {
        self.0.insert(point)
    }

    /// Returns `true` if the point was disabled before
    pub fn remove(&mut self, point: Point) -> bool {
        self.0.remove(&point)
    }

    pub fn contains(&self, point: Point) -> bool {
        self.0.contains(&point)
    }

    pub fn clear(&mut self) {
        self.0.clear();
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl FromIterator<Point> for DisabledSet {
    fn from_iter<I: IntoIterator<Item = Point>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}
