use crate::error::GridError;
use crate::grid::{GridMap, TileType};

/// Parses a map written one row per line using the map tokens
/// (`X` wall, `.` path, `B` bonfire, `F` fountain, `T` treasure, `M` monster,
/// `P` famous place, `Z` boss). Empty lines are skipped.
pub fn parse_map(text: &str) -> Result<GridMap, GridError> {
    let mut cells = Vec::new();

    for (row, line) in text.lines().filter(|line| !line.is_empty()).enumerate() {
        let tiles = line
            .chars()
            .enumerate()
            .map(|(col, token)| {
                TileType::from_token(token).ok_or(GridError::UnknownToken { token, row, col })
            })
            .collect::<Result<Vec<_>, _>>()?;
        cells.push(tiles);
    }

    GridMap::new(cells)
}
