//! Board geometry: cell grids, directions and pipe connector masks

use serde::{Deserialize, Serialize};

use crate::error::GridError;

/// Cardinal direction on a board (row 0 is the top row)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Direction {
    North,
    East,
    South,
    West,
}

impl Direction {
    /// Fixed scan order used wherever a deterministic choice is needed
    pub const ALL: [Direction; 4] = [
        Direction::North,
        Direction::East,
        Direction::South,
        Direction::West,
    ];

    pub fn reverse(self) -> Direction {
        match self {
            Direction::North => Direction::South,
            Direction::East => Direction::West,
            Direction::South => Direction::North,
            Direction::West => Direction::East,
        }
    }

    /// (dcol, drow) of one step
    pub fn delta(self) -> (i64, i64) {
        match self {
            Direction::North => (0, -1),
            Direction::East => (1, 0),
            Direction::South => (0, 1),
            Direction::West => (-1, 0),
        }
    }

    fn bit(self) -> u8 {
        match self {
            Direction::North => 1,
            Direction::East => 2,
            Direction::South => 4,
            Direction::West => 8,
        }
    }
}

/// Set of sides a pipe piece opens onto
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct ConnectorMask(u8);

impl ConnectorMask {
    pub const NONE: ConnectorMask = ConnectorMask(0);
    pub const HORIZONTAL: ConnectorMask = ConnectorMask(2 | 8);
    pub const VERTICAL: ConnectorMask = ConnectorMask(1 | 4);
    pub const NORTH_EAST: ConnectorMask = ConnectorMask(1 | 2);
    pub const EAST_SOUTH: ConnectorMask = ConnectorMask(2 | 4);
    pub const SOUTH_WEST: ConnectorMask = ConnectorMask(4 | 8);
    pub const WEST_NORTH: ConnectorMask = ConnectorMask(8 | 1);
    pub const CROSS: ConnectorMask = ConnectorMask(15);

    /// Mask opening onto exactly the given sides
    pub fn from_dirs(dirs: &[Direction]) -> Self {
        ConnectorMask(dirs.iter().fold(0, |acc, d| acc | d.bit()))
    }

    pub fn contains(self, dir: Direction) -> bool {
        self.0 & dir.bit() != 0
    }

    pub fn with(self, dir: Direction) -> Self {
        ConnectorMask(self.0 | dir.bit())
    }

    pub fn without(self, dir: Direction) -> Self {
        ConnectorMask(self.0 & !dir.bit())
    }

    pub fn is_empty(self) -> bool {
        self.0 == 0
    }

    pub fn count(self) -> u32 {
        self.0.count_ones()
    }

    pub fn is_cross(self) -> bool {
        self == Self::CROSS
    }

    /// Open sides in N, E, S, W order
    pub fn dirs(self) -> impl Iterator<Item = Direction> {
        Direction::ALL.into_iter().filter(move |d| self.contains(*d))
    }

    /// Box-drawing glyph for logs and text renderers
    pub fn glyph(self) -> char {
        match self.0 {
            0 => '·',
            10 => '─',
            5 => '│',
            3 => '└',
            6 => '┌',
            12 => '┐',
            9 => '┘',
            15 => '┼',
            _ => '?',
        }
    }
}

/// Dense 2-D board stored row-major
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Grid<T> {
    cols: usize,
    rows: usize,
    cells: Vec<T>,
}

impl<T: Clone> Grid<T> {
    pub fn new(cols: usize, rows: usize, fill: T) -> Self {
        Self {
            cols,
            rows,
            cells: vec![fill; cols * rows],
        }
    }
}

impl<T> Grid<T> {
    pub fn cols(&self) -> usize {
        self.cols
    }

    pub fn rows(&self) -> usize {
        self.rows
    }

    pub fn len(&self) -> usize {
        self.cells.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cells.is_empty()
    }

    /// Flat index of a signed coordinate, if it lies on the board
    pub fn index(&self, col: i64, row: i64) -> Option<usize> {
        if col < 0 || row < 0 || col as usize >= self.cols || row as usize >= self.rows {
            return None;
        }
        Some(row as usize * self.cols + col as usize)
    }

    pub fn coords(&self, index: usize) -> (usize, usize) {
        (index % self.cols, index / self.cols)
    }

    pub fn get(&self, col: usize, row: usize) -> Option<&T> {
        self.index(col as i64, row as i64).map(|i| &self.cells[i])
    }

    pub fn get_mut(&mut self, col: usize, row: usize) -> Option<&mut T> {
        self.index(col as i64, row as i64).map(|i| &mut self.cells[i])
    }

    /// Checked access that reports the bad coordinate
    pub fn try_get(&self, col: i64, row: i64) -> Result<&T, GridError> {
        self.index(col, row)
            .map(|i| &self.cells[i])
            .ok_or(GridError {
                col,
                row,
                cols: self.cols,
                rows: self.rows,
            })
    }

    /// Neighbor one step away, if it is on the board
    pub fn neighbor(&self, col: usize, row: usize, dir: Direction) -> Option<(usize, usize)> {
        let (dc, dr) = dir.delta();
        let (c, r) = (col as i64 + dc, row as i64 + dr);
        self.index(c, r).map(|_| (c as usize, r as usize))
    }

    /// Cells with their coordinates, row-major
    pub fn iter(&self) -> impl Iterator<Item = ((usize, usize), &T)> {
        let cols = self.cols;
        self.cells
            .iter()
            .enumerate()
            .map(move |(i, cell)| ((i % cols, i / cols), cell))
    }

    pub fn cells(&self) -> &[T] {
        &self.cells
    }

    pub fn cells_mut(&mut self) -> &mut [T] {
        &mut self.cells
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mask_ops() {
        let mask = ConnectorMask::from_dirs(&[Direction::West, Direction::South]);
        assert_eq!(mask, ConnectorMask::SOUTH_WEST);
        assert!(mask.contains(Direction::West));
        assert!(!mask.contains(Direction::North));
        assert_eq!(
            mask.without(Direction::West).dirs().collect::<Vec<_>>(),
            vec![Direction::South]
        );
        assert_eq!(ConnectorMask::CROSS.count(), 4);
        assert_eq!(ConnectorMask::HORIZONTAL.glyph(), '─');
    }

    #[test]
    fn test_neighbors_respect_edges() {
        let grid = Grid::new(3, 2, 0u8);
        assert_eq!(grid.neighbor(0, 0, Direction::West), None);
        assert_eq!(grid.neighbor(0, 0, Direction::East), Some((1, 0)));
        assert_eq!(grid.neighbor(2, 1, Direction::South), None);
        assert_eq!(grid.coords(4), (1, 1));
    }

    #[test]
    fn test_try_get_reports_coordinate() {
        let grid = Grid::new(2, 2, 'x');
        let err = grid.try_get(5, -1).unwrap_err();
        assert_eq!((err.col, err.row), (5, -1));
        assert_eq!(grid.try_get(1, 1), Ok(&'x'));
    }

    #[test]
    fn test_reverse_is_involution() {
        for dir in Direction::ALL {
            assert_eq!(dir.reverse().reverse(), dir);
        }
    }
}
