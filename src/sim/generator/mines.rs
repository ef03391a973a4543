//! Mine shaft layouts

use rand::seq::SliceRandom;
use serde::{Deserialize, Serialize};

use super::{Challenge, ProceduralGenerator, max_tier};
use crate::sim::grid::Grid;

pub const MINE_COLS: usize = 8;
pub const MINE_ROWS: usize = 6;

/// Ore grades, each unlocked at its own tier
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum OreKind {
    Copper,
    Silver,
    Gold,
    Diamond,
}

impl OreKind {
    const ALL: [OreKind; 4] = [OreKind::Copper, OreKind::Silver, OreKind::Gold, OreKind::Diamond];

    /// Category bonus added on top of the base score
    pub fn value(self) -> u64 {
        match self {
            OreKind::Copper => 10,
            OreKind::Silver => 25,
            OreKind::Gold => 50,
            OreKind::Diamond => 100,
        }
    }

    pub fn tier(self) -> u32 {
        match self {
            OreKind::Copper => 1,
            OreKind::Silver => 2,
            OreKind::Gold => 3,
            OreKind::Diamond => 4,
        }
    }
}

/// What is under a tile
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Tile {
    Ore(OreKind),
    Rock,
    Hazard,
    Challenge(Challenge),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MineCell {
    pub tile: Tile,
    pub revealed: bool,
}

impl Default for MineCell {
    fn default() -> Self {
        Self {
            tile: Tile::Rock,
            revealed: false,
        }
    }
}

/// A dealt shaft
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MineField {
    pub grid: Grid<MineCell>,
    /// Ore tiles on the board
    pub ore_total: u32,
}

impl MineField {
    /// Ore tiles not yet revealed
    pub fn ore_remaining(&self) -> u32 {
        self.grid
            .cells()
            .iter()
            .filter(|c| !c.revealed && matches!(c.tile, Tile::Ore(_)))
            .count() as u32
    }
}

pub(super) fn generate_mine_field(generator: &mut ProceduralGenerator, level: u32) -> MineField {
    let tier = max_tier(level);
    let ores = 5 + tier as usize;
    let hazards = 2 + 2 * tier as usize;
    let challenges = 1 + tier as usize / 2;

    let unlocked: Vec<OreKind> = OreKind::ALL.into_iter().filter(|o| o.tier() <= tier).collect();

    let mut tiles: Vec<Tile> = Vec::with_capacity(MINE_COLS * MINE_ROWS);
    for _ in 0..ores {
        tiles.push(Tile::Ore(unlocked[generator.index(unlocked.len())]));
    }
    tiles.extend(std::iter::repeat_n(Tile::Hazard, hazards));
    for _ in 0..challenges {
        tiles.push(Tile::Challenge(generator.challenge(level)));
    }
    tiles.resize(MINE_COLS * MINE_ROWS, Tile::Rock);
    tiles.shuffle(generator.rng());

    let mut grid = Grid::new(MINE_COLS, MINE_ROWS, MineCell::default());
    for (cell, tile) in grid.cells_mut().iter_mut().zip(tiles) {
        cell.tile = tile;
    }

    MineField {
        grid,
        ore_total: ores as u32,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn count(field: &MineField, pred: impl Fn(&Tile) -> bool) -> usize {
        field.grid.cells().iter().filter(|c| pred(&c.tile)).count()
    }

    #[test]
    fn test_counts_scale_with_tier() {
        let mut generator = ProceduralGenerator::new(4);
        let easy = generator.mine_field(1);
        let hard = generator.mine_field(8);
        assert_eq!(easy.ore_total, 6);
        assert_eq!(hard.ore_total, 9);
        assert_eq!(count(&easy, |t| matches!(t, Tile::Hazard)), 4);
        assert_eq!(count(&hard, |t| matches!(t, Tile::Hazard)), 10);
        assert_eq!(count(&hard, |t| matches!(t, Tile::Challenge(_))), 3);
        assert_eq!(easy.ore_remaining(), 6);
    }

    #[test]
    fn test_ore_grades_gated() {
        let mut generator = ProceduralGenerator::new(12);
        for _ in 0..20 {
            let field = generator.mine_field(1);
            assert_eq!(
                count(&field, |t| matches!(t, Tile::Ore(o) if *o != OreKind::Copper)),
                0
            );
        }
    }

    #[test]
    fn test_everything_starts_hidden() {
        let mut generator = ProceduralGenerator::new(1);
        let field = generator.mine_field(3);
        assert!(field.grid.cells().iter().all(|c| !c.revealed));
        assert_eq!(field.grid.len(), MINE_COLS * MINE_ROWS);
    }
}
