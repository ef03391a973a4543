//! Snake: the head steps on a timer, eats food and must not hit a wall or
//! itself
//!
//! Each body segment is a registry object. A step spawns a new head and
//! retires the tail, so segment ids keep increasing from tail to head.

use std::collections::VecDeque;

use glam::Vec2;

use super::RuleEnv;
use crate::audio::AudioCue;
use crate::cell_center;
use crate::consts::{ARENA_HEIGHT, ARENA_WIDTH, CELL_SIZE};
use crate::sim::collision::overlapping;
use crate::sim::entity::{ObjectId, Outcome, Payload, RegistryEvent};
use crate::sim::grid::Direction;
use crate::sim::intent::IntentKind;
use crate::sim::particle::Effect;
use crate::sim::phase::Failure;
use crate::sim::scoring::ScoreEvent;
use crate::sim::snapshot::BoardView;
use crate::sim::state::GameState;
use crate::sim::timer::TimerKind;

pub const SNAKE_COLS: usize = (ARENA_WIDTH / CELL_SIZE) as usize;
pub const SNAKE_ROWS: usize = (ARENA_HEIGHT / CELL_SIZE) as usize;

const START_LENGTH: usize = 3;
const SEGMENT_HALF: Vec2 = Vec2::new(CELL_SIZE / 2.0 - 2.0, CELL_SIZE / 2.0 - 2.0);
const FOOD_HALF: Vec2 = Vec2::new(15.0, 15.0);
const FOOD_POINTS_PER_TIER: u64 = 10;
const MIN_STEP_MS: f32 = 60.0;
const STEP_SPEEDUP_MS: f32 = 20.0;

#[derive(Debug, Clone)]
pub struct Snake {
    /// Head first
    body: VecDeque<ObjectId>,
    cells: VecDeque<(usize, usize)>,
    heading: Direction,
    next_heading: Direction,
    food: Option<ObjectId>,
    /// Steps left during which the tail stays put
    grow: u32,
}

impl Default for Snake {
    fn default() -> Self {
        Self {
            body: VecDeque::new(),
            cells: VecDeque::new(),
            heading: Direction::East,
            next_heading: Direction::East,
            food: None,
            grow: 0,
        }
    }
}

impl Snake {
    pub fn setup_level(&mut self, env: &mut RuleEnv) {
        if self.body.is_empty() {
            let (col, row) = (SNAKE_COLS / 2, SNAKE_ROWS / 2);
            // Tail first so the head gets the highest id
            for i in (0..START_LENGTH).rev() {
                self.spawn_head((col - i, row), env);
            }
        }
        if self.food.is_none() {
            self.spawn_food(env);
        }

        let tier = env.state.tier();
        let step_ms = (env.tuning.snake_step_ms - STEP_SPEEDUP_MS * (tier - 1) as f32).max(MIN_STEP_MS);
        env.timers.cancel_kind(TimerKind::AutoStep);
        env.timers.arm_repeating(TimerKind::AutoStep, step_ms);
    }

    pub fn len(&self) -> usize {
        self.body.len()
    }

    pub fn is_empty(&self) -> bool {
        self.body.is_empty()
    }

    pub fn head(&self) -> Option<(usize, usize)> {
        self.cells.front().copied()
    }

    pub fn on_intent(&mut self, intent: &IntentKind, env: &mut RuleEnv) -> bool {
        let IntentKind::Steer(dir) = *intent else {
            return false;
        };
        if dir == self.heading.reverse() {
            log::debug!("cannot reverse into the body");
            env.out.no_hit += 1;
        } else {
            self.next_heading = dir;
        }
        true
    }

    pub fn on_timer(&mut self, kind: TimerKind, env: &mut RuleEnv) {
        if kind == TimerKind::AutoStep {
            self.step(env);
        }
    }

    fn spawn_head(&mut self, cell: (usize, usize), env: &mut RuleEnv) -> ObjectId {
        let id = env.registry.spawn(
            Payload::SnakeSegment {
                col: cell.0,
                row: cell.1,
            },
            cell_center(cell.0, cell.1),
            None,
            SEGMENT_HALF,
        );
        self.body.push_front(id);
        self.cells.push_front(cell);
        id
    }

    fn spawn_food(&mut self, env: &mut RuleEnv) {
        let free: Vec<(usize, usize)> = (0..SNAKE_ROWS)
            .flat_map(|row| (0..SNAKE_COLS).map(move |col| (col, row)))
            .filter(|c| !self.cells.contains(c))
            .collect();
        if free.is_empty() {
            log::info!("snake fills the board");
            env.out.level_complete = true;
            return;
        }
        let (col, row) = free[env.generator.index(free.len())];
        let value = FOOD_POINTS_PER_TIER * u64::from(env.state.tier());
        let id = env.registry.spawn(
            Payload::Food { col, row, value },
            cell_center(col, row),
            None,
            FOOD_HALF,
        );
        self.food = Some(id);
    }

    fn crash(&mut self, env: &mut RuleEnv) {
        if let Some((col, row)) = self.head() {
            env.burst(Effect::Collision, cell_center(col, row));
        }
        env.cue(AudioCue::Error);
        env.out.fail(Failure::InvalidStructure);
    }

    fn step(&mut self, env: &mut RuleEnv) {
        self.heading = self.next_heading;
        let Some((col, row)) = self.head() else {
            env.out.violation("snake has no head");
            return;
        };

        let (dc, dr) = self.heading.delta();
        let (nc, nr) = (col as i64 + dc, row as i64 + dr);
        if nc < 0 || nr < 0 || nc >= SNAKE_COLS as i64 || nr >= SNAKE_ROWS as i64 {
            log::info!("snake hit the wall at ({nc}, {nr})");
            self.crash(env);
            return;
        }
        let next = (nc as usize, nr as usize);

        // The tail cell frees up this step unless the snake is growing
        let solid = if self.grow > 0 {
            self.cells.len()
        } else {
            self.cells.len().saturating_sub(1)
        };
        if self.cells.iter().take(solid).any(|c| *c == next) {
            log::info!("snake bit itself at {next:?}");
            self.crash(env);
            return;
        }

        let head = self.spawn_head(next, env);
        if self.grow > 0 {
            self.grow -= 1;
        } else if let (Some(tail), Some(_)) = (self.body.pop_back(), self.cells.pop_back()) {
            if let Err(err) = env.registry.retire(tail) {
                env.out.registry_error(err);
            }
        }

        let eaten: Vec<ObjectId> = overlapping(env.registry, head)
            .into_iter()
            .filter(|id| Some(*id) == self.food)
            .collect();
        for food in eaten {
            match env.registry.resolve(food, Outcome::Correct) {
                Ok(()) => {
                    self.grow += 1;
                    self.food = None;
                    self.spawn_food(env);
                }
                Err(err) => env.out.registry_error(err),
            }
        }
    }

    pub fn score_event(event: &RegistryEvent, state: &GameState) -> Option<ScoreEvent> {
        match event {
            RegistryEvent::Resolved {
                outcome: Outcome::Correct,
                payload: Payload::Food { value, .. },
                ..
            } => Some(ScoreEvent::Correct {
                tier: state.tier(),
                bonus: *value,
            }),
            _ => None,
        }
    }

    pub fn board_view(&self) -> BoardView {
        BoardView::Snake {
            cols: SNAKE_COLS,
            rows: SNAKE_ROWS,
            heading: self.heading,
            length: self.body.len(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sim::rules::GameKind;
    use crate::sim::rules::test_env::Harness;

    fn started(h: &mut Harness) -> Snake {
        let mut snake = Snake::default();
        snake.setup_level(&mut h.env());
        h.step();
        snake
    }

    fn step(snake: &mut Snake, h: &mut Harness) {
        snake.on_timer(TimerKind::AutoStep, &mut h.env());
        h.step();
    }

    /// Move the food right in front of the head
    fn place_food_ahead(snake: &Snake, h: &mut Harness) {
        let (col, row) = snake.head().unwrap();
        let food = snake.food.unwrap();
        let obj = h.registry.get_mut(food).unwrap();
        obj.pos = cell_center(col + 1, row);
    }

    #[test]
    fn test_step_moves_head_and_keeps_length() {
        let mut h = Harness::new(GameKind::Snake, 1);
        let mut snake = started(&mut h);
        let (col, row) = snake.head().unwrap();
        let ids_before: Vec<_> = snake.body.iter().copied().collect();
        step(&mut snake, &mut h);
        assert_eq!(snake.head(), Some((col + 1, row)));
        assert_eq!(snake.len(), START_LENGTH);
        // Tail retired, new head has a fresh id
        assert!(h.registry.get(ids_before[START_LENGTH - 1]).is_none());
        assert!(snake.body[0] > ids_before[0]);
    }

    #[test]
    fn test_eating_grows_and_scores() {
        let mut h = Harness::new(GameKind::Snake, 1);
        let mut snake = started(&mut h);
        let old_food = snake.food.unwrap();
        place_food_ahead(&snake, &mut h);
        step(&mut snake, &mut h);
        let events = h.registry.drain_events();
        assert_eq!(events.len(), 1);
        assert_eq!(
            Snake::score_event(&events[0], &h.state),
            Some(ScoreEvent::Correct { tier: 1, bonus: 10 })
        );
        assert_ne!(snake.food, Some(old_food));
        step(&mut snake, &mut h);
        assert_eq!(snake.len(), START_LENGTH + 1);
    }

    #[test]
    fn test_reverse_steer_ignored() {
        let mut h = Harness::new(GameKind::Snake, 1);
        let mut snake = started(&mut h);
        snake.on_intent(&IntentKind::Steer(Direction::West), &mut h.env());
        assert_eq!(h.take_out().no_hit, 1);
        snake.on_intent(&IntentKind::Steer(Direction::North), &mut h.env());
        let (col, row) = snake.head().unwrap();
        step(&mut snake, &mut h);
        assert_eq!(snake.head(), Some((col, row - 1)));
    }

    #[test]
    fn test_wall_is_invalid_structure() {
        let mut h = Harness::new(GameKind::Snake, 1);
        let mut snake = started(&mut h);
        for _ in 0..SNAKE_COLS {
            step(&mut snake, &mut h);
        }
        assert_eq!(h.take_out().failures, vec![Failure::InvalidStructure]);
    }

    #[test]
    fn test_biting_itself_is_invalid_structure() {
        let mut h = Harness::new(GameKind::Snake, 1);
        let mut snake = started(&mut h);
        // Grow to five so a tight loop hits the body
        snake.grow = 2;
        step(&mut snake, &mut h);
        step(&mut snake, &mut h);
        for dir in [Direction::South, Direction::West, Direction::North] {
            snake.on_intent(&IntentKind::Steer(dir), &mut h.env());
            step(&mut snake, &mut h);
        }
        let out = h.take_out();
        assert_eq!(out.failures, vec![Failure::InvalidStructure]);
    }
}
