//! Mine shaft: reveal hidden tiles for ore while energy lasts

use super::RuleEnv;
use crate::audio::AudioCue;
use crate::sim::collision::grid_hit;
use crate::sim::generator::{MineField, Tile};
use crate::sim::grid::Grid;
use crate::sim::intent::IntentKind;
use crate::sim::particle::Effect;
use crate::sim::scoring::ScoreEvent;
use crate::sim::snapshot::{BoardView, ChallengeView, MineTileView};
use crate::{cell_center, point_to_cell};

#[derive(Debug, Clone)]
pub struct MineShaft {
    field: MineField,
    /// Challenge tile waiting for an answer
    pending: Option<(usize, usize)>,
}

impl Default for MineShaft {
    fn default() -> Self {
        Self {
            field: MineField {
                grid: Grid::new(0, 0, Default::default()),
                ore_total: 0,
            },
            pending: None,
        }
    }
}

impl MineShaft {
    pub fn setup_level(&mut self, env: &mut RuleEnv) {
        self.field = env.generator.mine_field(env.state.level);
        self.pending = None;
    }

    pub fn field(&self) -> &MineField {
        &self.field
    }

    pub fn on_intent(&mut self, intent: &IntentKind, env: &mut RuleEnv) -> bool {
        match *intent {
            IntentKind::Cell { col, row } => self.reveal(col, row, env),
            IntentKind::Pointer { pos } => match point_to_cell(pos) {
                Some((col, row)) if col < self.field.grid.cols() && row < self.field.grid.rows() => {
                    self.reveal(col as i64, row as i64, env)
                }
                _ => env.out.no_hit += 1,
            },
            IntentKind::Answer { choice } => self.answer(choice, env),
            _ => return false,
        }
        true
    }

    fn reveal(&mut self, col: i64, row: i64, env: &mut RuleEnv) {
        if self.pending.is_some() {
            log::debug!("reveal blocked by open challenge");
            env.out.no_hit += 1;
            return;
        }
        let Some((col, row)) = grid_hit(&self.field.grid, col, row) else {
            if let Err(err) = self.field.grid.try_get(col, row) {
                env.out.violation(err.to_string());
            }
            return;
        };
        let Some(cell) = self.field.grid.get_mut(col, row) else {
            return;
        };
        if cell.revealed {
            env.out.already_resolved += 1;
            return;
        }
        cell.revealed = true;
        let tile = cell.tile.clone();
        let at = cell_center(col, row);

        env.out.event(ScoreEvent::Spend { cost: env.tuning.reveal_cost }, None);
        env.cue(AudioCue::Place);

        match tile {
            Tile::Ore(ore) => {
                env.out.event(
                    ScoreEvent::Correct {
                        tier: ore.tier(),
                        bonus: ore.value(),
                    },
                    Some(at),
                );
                env.burst(Effect::Correct, at);
                env.cue(AudioCue::Success);
                if self.field.ore_remaining() == 0 {
                    env.out.event(
                        ScoreEvent::LevelClear {
                            units: self.field.ore_total,
                            tier: env.state.tier(),
                        },
                        Some(at),
                    );
                    env.out.level_complete = true;
                    env.burst(Effect::LevelClear, at);
                    env.cue(AudioCue::LevelUp);
                }
            }
            Tile::Hazard => {
                env.out.event(
                    ScoreEvent::Incorrect {
                        cost: Some(env.tuning.hazard_cost),
                    },
                    Some(at),
                );
                env.burst(Effect::Incorrect, at);
                env.cue(AudioCue::Error);
            }
            Tile::Rock => env.burst(Effect::Collision, at),
            Tile::Challenge(_) => self.pending = Some((col, row)),
        }
    }

    fn answer(&mut self, choice: usize, env: &mut RuleEnv) {
        let Some((col, row)) = self.pending.take() else {
            env.out.no_hit += 1;
            return;
        };
        let Some(Tile::Challenge(challenge)) = self.field.grid.get(col, row).map(|c| &c.tile) else {
            env.out.violation(format!("pending cell ({col}, {row}) holds no challenge"));
            return;
        };
        let at = cell_center(col, row);
        if challenge.is_correct(choice) {
            env.out.event(
                ScoreEvent::Correct {
                    tier: challenge.tier,
                    bonus: env.tuning.challenge_bonus,
                },
                Some(at),
            );
            env.burst(Effect::Correct, at);
            env.cue(AudioCue::Success);
        } else {
            env.out.event(ScoreEvent::Incorrect { cost: None }, Some(at));
            env.burst(Effect::Incorrect, at);
            env.cue(AudioCue::Error);
        }
    }

    pub fn board_view(&self) -> BoardView {
        let grid = &self.field.grid;
        let cells = grid
            .cells()
            .iter()
            .map(|c| match (&c.tile, c.revealed) {
                (_, false) => MineTileView::Hidden,
                (Tile::Ore(ore), true) => MineTileView::Ore(*ore),
                (Tile::Rock, true) => MineTileView::Rock,
                (Tile::Hazard, true) => MineTileView::Hazard,
                (Tile::Challenge(_), true) => MineTileView::Challenge,
            })
            .collect();
        let challenge = self
            .pending
            .and_then(|(col, row)| grid.get(col, row))
            .and_then(|c| match &c.tile {
                Tile::Challenge(ch) => Some(ChallengeView {
                    prompt: ch.prompt.clone(),
                    choices: ch.choices.clone(),
                }),
                _ => None,
            });
        BoardView::Mines {
            cols: grid.cols(),
            rows: grid.rows(),
            cells,
            ore_remaining: self.field.ore_remaining(),
            challenge,
        }
    }
}
