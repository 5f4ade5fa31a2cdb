//! Finds where a hand-drawn map sketch lies on the full map.

use crate::error::PatternError;
use crate::grid::{GridMap, Point, TileType};

const FLAVOR_TEXTS: [&str; 2] = [
    "You stopped and tried to mark your way on paper. You got a map like this:",
    "Unfortunately, you ran out of space on a piece of paper. There's nowhere to draw some of the places you have visited",
];

const EMOJI_TOKENS: [(char, char); 9] = [
    ('\u{1F532}', '?'),
    ('\u{2B1B}', 'X'),
    ('\u{2B1C}', '.'),
    ('\u{1F7E9}', 'U'),
    ('\u{1F7E6}', 'P'),
    ('\u{1F7EA}', 'M'),
    ('\u{1F7E5}', 'Z'),
    ('\u{1F7E7}', 'B'),
    ('\u{1F7E8}', 'N'),
];

const VARIATION_SELECTOR: char = '\u{FE0F}';

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum PatternTile {
    Exact(TileType),
    /// Not drawn, matches anything
    Unknown,
    FountainOrTreasure,
    NotWall,
}

impl PatternTile {
    pub fn from_token(token: char) -> Option<Self> {
        match token.to_ascii_uppercase() {
            '?' => Some(PatternTile::Unknown),
            'U' => Some(PatternTile::FountainOrTreasure),
            'N' => Some(PatternTile::NotWall),
            other => TileType::from_token(other).map(PatternTile::Exact),
        }
    }

    pub fn matches(&self, tile: TileType) -> bool {
        match self {
            PatternTile::Exact(expected) => *expected == tile,
            PatternTile::Unknown => true,
            PatternTile::FountainOrTreasure => {
                matches!(tile, TileType::Fountain | TileType::Treasure)
            }
            PatternTile::NotWall => tile != TileType::Wall,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Pattern {
    rows: Vec<Vec<PatternTile>>,
}

impl Pattern {
    /// Parses a sketch in map tokens or the game's emoji squares.
    ///
    /// The game's flavor sentences around a copied sketch are ignored.
    pub fn parse(text: &str) -> Result<Self, PatternError> {
        let mut text = text.to_string();
        for flavor in FLAVOR_TEXTS {
            text = text.replace(flavor, "");
        }

        let text: String = text
            .chars()
            .filter(|&c| c != VARIATION_SELECTOR)
            .map(|c| {
                EMOJI_TOKENS
                    .iter()
                    .find(|(emoji, _)| *emoji == c)
                    .map_or(c, |(_, token)| *token)
            })
            .collect();

        let mut rows = Vec::new();
        for (row, line) in text
            .trim_matches(|c| c == '\n' || c == '\r')
            .lines()
            .filter(|line| !line.is_empty())
            .enumerate()
        {
            let tiles = line
                .chars()
                .enumerate()
                .map(|(col, token)| {
                    PatternTile::from_token(token).ok_or(PatternError::UnknownToken {
                        token,
                        row,
                        col,
                    })
                })
                .collect::<Result<Vec<_>, _>>()?;
            rows.push(tiles);
        }

        let columns = rows.first().map_or(0, Vec::len);
        if let Some((row, tiles)) = rows
            .iter()
            .enumerate()
            .find(|(_, tiles)| tiles.len() != columns)
        {
            return Err(PatternError::Ragged {
                row,
                expected: columns,
                found: tiles.len(),
            });
        }

        if rows.len() < 3 || columns < 3 {
            return Err(PatternError::TooSmall {
                rows: rows.len(),
                columns,
            });
        }

        Ok(Self { rows })
    }

    pub fn rows(&self) -> usize {
        self.rows.len()
    }

    pub fn columns(&self) -> usize {
        self.rows.first().map_or(0, Vec::len)
    }

    fn matches_at(&self, grid: &GridMap, offset: Point) -> bool {
        self.rows.iter().enumerate().all(|(row, tiles)| {
            tiles.iter().enumerate().all(|(col, pattern)| {
                let point = Point {
                    row: offset.row + row,
                    col: offset.col + col,
                };
                grid.get(point).map_or(false, |tile| pattern.matches(tile))
            })
        })
    }
}

/// Every top-left offset at which the pattern matches, in row-major order
pub fn locate(grid: &GridMap, pattern: &Pattern) -> Result<Vec<Point>, PatternError> {
    let mut found = Vec::new();

    if pattern.rows() <= grid.rows() && pattern.columns() <= grid.columns() {
        for row in 0..=grid.rows() - pattern.rows() {
            for col in 0..=grid.columns() - pattern.columns() {
                let offset = Point { row, col };
                if pattern.matches_at(grid, offset) {
                    found.push(offset);
                }
            }
        }
    }

    if found.is_empty() {
        return Err(PatternError::NotFound);
    }
    Ok(found)
}

#[cfg(test)]
mod test {

    use super::*;
    use crate::util::parse_map;

    fn create_basic_map() -> GridMap {
        parse_map(
            "XXXXXX\n\
             XF.MBX\n\
             X.XX.X\n\
             XT.Z.X\n\
             XXXXXX\n",
        )
        .unwrap()
    }

    #[test]
    fn test_locate_exact_sketch() {
        let map = create_basic_map();
        let pattern = Pattern::parse("F.M\n.XX\nT.Z\n").unwrap();

        assert_eq!(locate(&map, &pattern), Ok(vec![Point { row: 1, col: 1 }]));
    }

    #[test]
    fn test_wildcards() {
        let map = create_basic_map();

        // '?' anywhere, 'U' fountain or treasure, 'N' no wall
        let pattern = Pattern::parse("?X?\nUNN\n???\n").unwrap();
        assert_eq!(
            locate(&map, &pattern),
            Ok(vec![Point { row: 0, col: 1 }, Point { row: 2, col: 1 }])
        );

        let everything = Pattern::parse("???\n???\n???\n").unwrap();
        assert_eq!(locate(&map, &everything).unwrap().len(), 3 * 4);
    }

    #[test]
    fn test_emoji_sketch_with_flavor_text() {
        let map = create_basic_map();
        let text = "You stopped and tried to mark your way on paper. You got a map like this:\n\
                    \u{1F7E9}\u{2B1C}\u{FE0F}\u{1F7EA}\n\
                    \u{2B1C}\u{FE0F}\u{2B1B}\u{FE0F}\u{2B1B}\u{FE0F}\n\
                    \u{1F7E9}\u{1F532}\u{1F7E5}\n\
                    Unfortunately, you ran out of space on a piece of paper. There's nowhere to draw some of the places you have visited";
        let pattern = Pattern::parse(text).unwrap();

        assert_eq!(pattern.rows(), 3);
        assert_eq!(pattern.columns(), 3);
        assert_eq!(locate(&map, &pattern), Ok(vec![Point { row: 1, col: 1 }]));
    }

    #[test]
    fn test_sketch_must_fit_the_map() {
        let map = create_basic_map();
        // matches the bottom rows only if the sketch could run past the edge
        let pattern = Pattern::parse("XXX\nXXX\n???\n").unwrap();
        assert_eq!(locate(&map, &pattern), Err(PatternError::NotFound));
    }

    #[test]
    fn test_invalid_patterns() {
        assert_eq!(
            Pattern::parse("F.\n.X\n"),
            Err(PatternError::TooSmall {
                rows: 2,
                columns: 2
            })
        );
        assert!(matches!(
            Pattern::parse("F.M\n.X\nT.Z\n"),
            Err(PatternError::Ragged {
                row: 1,
                expected: 3,
                found: 2
            })
        ));
        assert!(matches!(
            Pattern::parse("F.M\n.Q.\nT.Z\n"),
            Err(PatternError::UnknownToken {
                token: 'Q',
                row: 1,
                col: 1
            })
        ));
    }
}
