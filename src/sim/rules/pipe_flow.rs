//! Pipe flow: lay the queued pieces so water reaches the sink when the
//! valve opens

use std::collections::VecDeque;

use super::RuleEnv;
use crate::audio::AudioCue;
use crate::cell_center;
use crate::point_to_cell;
use crate::sim::collision::grid_hit;
use crate::sim::generator::{FlowResult, PipeBoard, flow_fill};
use crate::sim::grid::{ConnectorMask, Direction, Grid};
use crate::sim::intent::IntentKind;
use crate::sim::particle::Effect;
use crate::sim::phase::Failure;
use crate::sim::scoring::ScoreEvent;
use crate::sim::snapshot::BoardView;
use crate::sim::timer::TimerKind;

/// How many upcoming pieces the HUD shows
const QUEUE_PREVIEW: usize = 5;

#[derive(Debug, Clone)]
pub struct PipeFlow {
    board: PipeBoard,
    queue: VecDeque<ConnectorMask>,
    seconds_left: u32,
    valve_open: bool,
}

impl Default for PipeFlow {
    fn default() -> Self {
        Self {
            board: PipeBoard {
                grid: Grid::new(0, 0, Default::default()),
                source: (0, 0),
                entry: Direction::West,
                sink: (0, 0),
            },
            queue: VecDeque::new(),
            seconds_left: 0,
            valve_open: false,
        }
    }
}

impl PipeFlow {
    pub fn setup_level(&mut self, env: &mut RuleEnv) {
        let dealt = env.generator.pipe_level(env.state.level);
        log::debug!("pipe board:\n{}", dealt.board.to_ascii());
        self.board = dealt.board;
        self.queue = dealt.queue;
        self.seconds_left = env.tuning.countdown_secs;
        self.valve_open = false;
        env.timers.cancel_kind(TimerKind::Countdown);
        env.timers.arm_repeating(TimerKind::Countdown, 1000.0);
    }

    pub fn board(&self) -> &PipeBoard {
        &self.board
    }

    pub fn on_intent(&mut self, intent: &IntentKind, env: &mut RuleEnv) -> bool {
        match *intent {
            IntentKind::Place { col, row } => self.place(col, row, env),
            IntentKind::Pointer { pos } => match point_to_cell(pos) {
                Some((col, row)) if col < self.board.grid.cols() && row < self.board.grid.rows() => {
                    self.place(col as i64, row as i64, env)
                }
                _ => env.out.no_hit += 1,
            },
            IntentKind::Flow => self.open_valve(env),
            _ => return false,
        }
        true
    }

    fn place(&mut self, col: i64, row: i64, env: &mut RuleEnv) {
        if self.valve_open {
            env.out.already_resolved += 1;
            return;
        }
        let Some((col, row)) = grid_hit(&self.board.grid, col, row) else {
            if let Err(err) = self.board.grid.try_get(col, row) {
                env.out.violation(err.to_string());
            }
            return;
        };
        let Some(&piece) = self.queue.front() else {
            log::debug!("no pieces left to place");
            env.out.no_hit += 1;
            return;
        };
        if self.board.place(col, row, piece) {
            self.queue.pop_front();
            env.cue(AudioCue::Place);
            env.burst(Effect::Collision, cell_center(col, row));
        } else {
            env.out.no_hit += 1;
        }
    }

    pub fn on_timer(&mut self, kind: TimerKind, env: &mut RuleEnv) {
        if kind != TimerKind::Countdown || self.valve_open {
            return;
        }
        self.seconds_left = self.seconds_left.saturating_sub(1);
        if self.seconds_left == 0 {
            self.open_valve(env);
        }
    }

    fn open_valve(&mut self, env: &mut RuleEnv) {
        if self.valve_open {
            env.out.already_resolved += 1;
            return;
        }
        self.valve_open = true;
        env.timers.cancel_kind(TimerKind::Countdown);

        let result = flow_fill(&self.board);
        self.board.fill(result.path());
        let tier = env.state.tier();

        match result {
            FlowResult::Reached { path } => {
                log::info!("flow reached the sink through {} cells", path.len());
                for &(col, row) in &path {
                    if (col, row) == self.board.source || (col, row) == self.board.sink {
                        continue;
                    }
                    env.out
                        .event(ScoreEvent::Correct { tier, bonus: 0 }, Some(cell_center(col, row)));
                }
                let sink = cell_center(self.board.sink.0, self.board.sink.1);
                env.out.event(
                    ScoreEvent::LevelClear {
                        units: path.len() as u32,
                        tier,
                    },
                    Some(sink),
                );
                env.out.level_complete = true;
                env.burst(Effect::LevelClear, sink);
                env.cue(AudioCue::LevelUp);
            }
            FlowResult::Leak { path, at } => {
                log::info!("leak at {at:?} after {} cells", path.len());
                env.burst(Effect::Incorrect, cell_center(at.0, at.1));
                env.cue(AudioCue::Error);
                env.out.fail(Failure::Leak);
            }
        }
    }

    pub fn board_view(&self) -> BoardView {
        BoardView::Pipes {
            cols: self.board.grid.cols(),
            rows: self.board.grid.rows(),
            cells: self.board.grid.cells().to_vec(),
            source: self.board.source,
            sink: self.board.sink,
            upcoming: self.queue.iter().take(QUEUE_PREVIEW).copied().collect(),
            seconds_left: self.seconds_left,
            valve_open: self.valve_open,
        }
    }
}
