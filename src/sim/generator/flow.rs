//! Pipe boards and flow-fill
//!
//! Water enters the source cell from a fixed side and walks from tile to
//! tile along connector masks. A step is taken only when the neighbour has a
//! piece and that piece opens back toward the current cell. The walk never
//! backtracks: reaching the sink is success, anything else is a leak.

use std::collections::VecDeque;

use rand::seq::SliceRandom;
use serde::{Deserialize, Serialize};

use super::{ProceduralGenerator, max_tier};
use crate::sim::grid::{ConnectorMask, Direction, Grid};

/// One board cell
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct PipeCell {
    pub mask: ConnectorMask,
    /// Fixed by the level (source, sink, rock); cannot be built on
    pub locked: bool,
    /// Water reached this cell
    pub filled: bool,
}

impl PipeCell {
    pub fn is_open(&self) -> bool {
        !self.locked && self.mask.is_empty()
    }
}

/// A board and its fixed endpoints
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PipeBoard {
    pub grid: Grid<PipeCell>,
    pub source: (usize, usize),
    /// Side of the source cell the water comes in from
    pub entry: Direction,
    pub sink: (usize, usize),
}

impl PipeBoard {
    /// Drop a piece on an open cell; false if the cell is taken or locked
    pub fn place(&mut self, col: usize, row: usize, mask: ConnectorMask) -> bool {
        match self.grid.get_mut(col, row) {
            Some(cell) if cell.is_open() => {
                cell.mask = mask;
                true
            }
            _ => false,
        }
    }

    /// Mark the cells water went through
    pub fn fill(&mut self, path: &[(usize, usize)]) {
        for &(col, row) in path {
            if let Some(cell) = self.grid.get_mut(col, row) {
                cell.filled = true;
            }
        }
    }

    /// Text rendering, one line per row
    pub fn to_ascii(&self) -> String {
        let mut out = String::with_capacity((self.grid.cols() + 1) * self.grid.rows());
        for row in 0..self.grid.rows() {
            for col in 0..self.grid.cols() {
                let ch = match self.grid.get(col, row) {
                    _ if (col, row) == self.source => 'S',
                    _ if (col, row) == self.sink => 'E',
                    Some(cell) if cell.locked && cell.mask.is_empty() => '#',
                    Some(cell) => cell.mask.glyph(),
                    None => ' ',
                };
                out.push(ch);
            }
            out.push('\n');
        }
        out
    }
}

/// Outcome of a flow-fill walk
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum FlowResult {
    /// Water reached the sink through `path` (source first, sink last)
    Reached { path: Vec<(usize, usize)> },
    /// Water escaped at `at` after filling `path`
    Leak {
        path: Vec<(usize, usize)>,
        at: (usize, usize),
    },
}

impl FlowResult {
    pub fn is_reached(&self) -> bool {
        matches!(self, FlowResult::Reached { .. })
    }

    pub fn path(&self) -> &[(usize, usize)] {
        match self {
            FlowResult::Reached { path } | FlowResult::Leak { path, .. } => path,
        }
    }
}

/// Walk the board from the source
///
/// Cross pieces pass water straight through. Any other piece sends it out
/// the first open side (N, E, S, W) that leads into a connecting neighbour.
/// Entering a cell twice is a leak.
pub fn flow_fill(board: &PipeBoard) -> FlowResult {
    let grid = &board.grid;
    let mut visited = vec![false; grid.len()];
    let mut path = Vec::new();
    let (mut col, mut row) = board.source;
    let mut entered_from = board.entry;

    loop {
        let here = (col, row);
        let Some(idx) = grid.index(col as i64, row as i64) else {
            return FlowResult::Leak { path, at: here };
        };
        let mask = grid.cells()[idx].mask;
        if mask.is_empty() || !mask.contains(entered_from) || visited[idx] {
            return FlowResult::Leak { path, at: here };
        }
        visited[idx] = true;
        path.push(here);

        if here == board.sink {
            return FlowResult::Reached { path };
        }

        let next = if mask.is_cross() {
            let straight = entered_from.reverse();
            connects(grid, col, row, straight).map(|pos| (pos, straight))
        } else {
            mask.dirs()
                .filter(|d| *d != entered_from)
                .find_map(|d| connects(grid, col, row, d).map(|pos| (pos, d)))
        };

        match next {
            Some(((ncol, nrow), dir)) => {
                col = ncol;
                row = nrow;
                entered_from = dir.reverse();
            }
            None => return FlowResult::Leak { path, at: here },
        }
    }
}

/// Neighbour in `dir` if it holds a piece that opens back toward us
fn connects(grid: &Grid<PipeCell>, col: usize, row: usize, dir: Direction) -> Option<(usize, usize)> {
    let (ncol, nrow) = grid.neighbor(col, row, dir)?;
    let cell = grid.get(ncol, nrow)?;
    (!cell.mask.is_empty() && cell.mask.contains(dir.reverse())).then_some((ncol, nrow))
}

/// A dealt level: the board, the pieces to place and one known solution
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PipeLevel {
    pub board: PipeBoard,
    /// Pieces in the order the player receives them
    pub queue: VecDeque<ConnectorMask>,
    /// Cells and pieces that connect source to sink
    pub solution: Vec<((usize, usize), ConnectorMask)>,
}

impl PipeLevel {
    /// Board with the solution pieces placed
    pub fn solved_board(&self) -> PipeBoard {
        let mut board = self.board.clone();
        for &((col, row), mask) in &self.solution {
            board.place(col, row, mask);
        }
        board
    }
}

const SPARE_PIECES: [ConnectorMask; 6] = [
    ConnectorMask::HORIZONTAL,
    ConnectorMask::VERTICAL,
    ConnectorMask::NORTH_EAST,
    ConnectorMask::EAST_SOUTH,
    ConnectorMask::SOUTH_WEST,
    ConnectorMask::WEST_NORTH,
];

fn step_dir(from: (usize, usize), to: (usize, usize)) -> Direction {
    if to.0 > from.0 {
        Direction::East
    } else if to.0 < from.0 {
        Direction::West
    } else if to.1 > from.1 {
        Direction::South
    } else {
        Direction::North
    }
}

/// Source-to-sink route moving column by column with short vertical runs
fn random_route(generator: &mut ProceduralGenerator, cols: usize, rows: usize) -> Vec<(usize, usize)> {
    let mut route = Vec::new();
    let mut row = generator.index(rows);
    for col in 0..cols {
        route.push((col, row));
        let shift = generator.index(5) as i64 - 2;
        let target = (row as i64 + shift).clamp(0, rows as i64 - 1) as usize;
        while row != target {
            row = if target > row { row + 1 } else { row - 1 };
            route.push((col, row));
        }
    }
    route
}

fn route_masks(route: &[(usize, usize)]) -> Vec<ConnectorMask> {
    let last = route.len().saturating_sub(1);
    route
        .iter()
        .enumerate()
        .map(|(i, &cell)| {
            let inlet = if i == 0 {
                Direction::West
            } else {
                step_dir(cell, route[i - 1])
            };
            let outlet = if i == last {
                Direction::East
            } else {
                step_dir(cell, route[i + 1])
            };
            ConnectorMask::from_dirs(&[inlet, outlet])
        })
        .collect()
}

fn build_level(generator: &mut ProceduralGenerator, cols: usize, rows: usize, route: Vec<(usize, usize)>, tier: u32) -> PipeLevel {
    let masks = route_masks(&route);
    let source = route[0];
    let sink = route[route.len() - 1];

    let mut grid = Grid::new(cols, rows, PipeCell::default());
    for &(end, mask) in [(source, masks[0]), (sink, masks[masks.len() - 1])].iter() {
        if let Some(cell) = grid.get_mut(end.0, end.1) {
            cell.mask = mask;
            cell.locked = true;
        }
    }

    // Rocks go anywhere off the route
    let mut free: Vec<(usize, usize)> = grid
        .iter()
        .map(|(pos, _)| pos)
        .filter(|pos| !route.contains(pos))
        .collect();
    free.shuffle(generator.rng());
    for &(col, row) in free.iter().take(tier as usize + 1) {
        if let Some(cell) = grid.get_mut(col, row) {
            cell.locked = true;
        }
    }

    let solution: Vec<((usize, usize), ConnectorMask)> = route
        .iter()
        .copied()
        .zip(masks.iter().copied())
        .skip(1)
        .take(route.len().saturating_sub(2))
        .collect();

    let mut queue: Vec<ConnectorMask> = solution.iter().map(|(_, m)| *m).collect();
    for _ in 0..(5u32.saturating_sub(tier)).max(1) {
        let piece = if tier >= 3 && generator.index(4) == 0 {
            ConnectorMask::CROSS
        } else {
            SPARE_PIECES[generator.index(SPARE_PIECES.len())]
        };
        queue.push(piece);
    }
    queue.shuffle(generator.rng());

    PipeLevel {
        board: PipeBoard {
            grid,
            source,
            entry: Direction::West,
            sink,
        },
        queue: queue.into(),
        solution,
    }
}

/// Board size for a tier
pub fn board_size(tier: u32) -> (usize, usize) {
    (6 + tier as usize, 4 + tier as usize / 2)
}

pub(super) fn generate_pipe_level(generator: &mut ProceduralGenerator, level: u32) -> PipeLevel {
    let tier = max_tier(level);
    let (cols, rows) = board_size(tier);
    let route = random_route(generator, cols, rows);
    let candidate = build_level(generator, cols, rows, route.clone(), tier);

    match flow_fill(&candidate.solved_board()) {
        FlowResult::Reached { path } if path == route => candidate,
        other => {
            log::warn!("rejected pipe board ({other:?}), dealing a straight one");
            let straight: Vec<(usize, usize)> = (0..cols).map(|c| (c, 0)).collect();
            build_level(generator, cols, rows, straight, tier)
        }
    }
}
