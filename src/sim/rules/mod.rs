//! Game rule sets
//!
//! Every game shares the scheduler, registry, scoring and state machine.
//! What differs is the payload each game puts in the registry and a handful
//! of rule functions: how a level is set up, how an intent or timer is
//! judged, and how a registry event is scored. [`GameRules`] dispatches to
//! the per-game implementation by variant.

mod call_stack;
mod mine_shaft;
mod pipe_flow;
mod snake;
mod token_rain;

use glam::Vec2;
use serde::{Deserialize, Serialize};

pub use call_stack::CallStack;
pub use mine_shaft::MineShaft;
pub use pipe_flow::PipeFlow;
pub use snake::Snake;
pub use token_rain::TokenRain;

use super::entity::{EntityRegistry, Outcome, RegistryEvent};
use super::generator::ProceduralGenerator;
use super::intent::IntentKind;
use super::particle::{Effect, ParticleSystem};
use super::phase::Failure;
use super::scoring::ScoreEvent;
use super::snapshot::BoardView;
use super::state::{GameState, ResourceKind};
use super::timer::{TimerKind, TimerSet};
use crate::audio::AudioCue;
use crate::error::RegistryError;
use crate::settings::Tuning;

/// Which game is running
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum GameKind {
    /// Tap the well-formed code snippets before they hit the floor
    TokenRain,
    /// Dig for ore on a hidden grid with limited energy
    MineShaft,
    /// Lay pipe from source to sink before the valve opens
    PipeFlow,
    /// Return stack frames in LIFO order before they time out
    CallStack,
    Snake,
}

impl GameKind {
    pub const ALL: [GameKind; 5] = [
        GameKind::TokenRain,
        GameKind::MineShaft,
        GameKind::PipeFlow,
        GameKind::CallStack,
        GameKind::Snake,
    ];

    pub fn name(self) -> &'static str {
        match self {
            GameKind::TokenRain => "token-rain",
            GameKind::MineShaft => "mine-shaft",
            GameKind::PipeFlow => "pipe-flow",
            GameKind::CallStack => "call-stack",
            GameKind::Snake => "snake",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        GameKind::ALL
            .into_iter()
            .find(|g| g.name().eq_ignore_ascii_case(s))
    }

    pub fn resource_kind(self) -> ResourceKind {
        match self {
            GameKind::MineShaft => ResourceKind::Energy,
            _ => ResourceKind::Lives,
        }
    }

    /// Board games finish a level by clearing the board rather than by score
    pub fn is_board(self) -> bool {
        matches!(self, GameKind::MineShaft | GameKind::PipeFlow)
    }
}

/// What rule code produced during one step of a tick
#[derive(Debug, Default)]
pub struct RuleOutput {
    /// Economy events not tied to a registry event, with an optional origin
    /// for the floating score label
    pub events: Vec<(ScoreEvent, Option<Vec2>)>,
    pub failures: Vec<Failure>,
    pub cues: Vec<AudioCue>,
    pub level_complete: bool,
    /// Intents that hit nothing
    pub no_hit: u64,
    /// Intents aimed at something already judged
    pub already_resolved: u64,
    /// Intents the current game has no use for
    pub ignored: u64,
    /// Broken internal contracts (bad ids, off-board cells)
    pub violations: Vec<String>,
}

impl RuleOutput {
    pub fn event(&mut self, event: ScoreEvent, at: Option<Vec2>) {
        self.events.push((event, at));
    }

    pub fn fail(&mut self, failure: Failure) {
        if !self.failures.contains(&failure) {
            self.failures.push(failure);
        }
    }

    pub fn violation(&mut self, message: impl Into<String>) {
        self.violations.push(message.into());
    }

    /// Sort a registry rejection into benign or contract violation
    pub fn registry_error(&mut self, err: RegistryError) {
        if err.is_benign() {
            log::debug!("{err}");
            self.already_resolved += 1;
        } else {
            self.violation(err.to_string());
        }
    }
}

/// Everything a rule function may touch during a tick
pub struct RuleEnv<'a> {
    pub registry: &'a mut EntityRegistry,
    pub particles: &'a mut ParticleSystem,
    pub generator: &'a mut ProceduralGenerator,
    pub timers: &'a mut TimerSet,
    pub state: &'a GameState,
    pub tuning: &'a Tuning,
    pub out: &'a mut RuleOutput,
}

impl RuleEnv<'_> {
    pub fn burst(&mut self, effect: Effect, at: Vec2) {
        self.particles.emit(effect, at);
    }

    pub fn cue(&mut self, cue: AudioCue) {
        self.out.cues.push(cue);
    }

    /// Burst and cue for a scored registry event
    pub fn feedback(&mut self, event: &RegistryEvent) {
        match event {
            RegistryEvent::Resolved {
                outcome: Outcome::Correct,
                pos,
                ..
            } => {
                self.burst(Effect::Correct, *pos);
                self.cue(AudioCue::Success);
            }
            RegistryEvent::Resolved { pos, .. } => {
                self.burst(Effect::Incorrect, *pos);
                self.cue(AudioCue::Error);
            }
            RegistryEvent::Missed { pos, .. } => {
                self.burst(Effect::Miss, *pos);
                self.cue(AudioCue::Miss);
            }
        }
    }
}

/// Per-game rules, dispatched by variant
#[derive(Debug, Clone)]
pub enum GameRules {
    TokenRain(TokenRain),
    MineShaft(MineShaft),
    PipeFlow(PipeFlow),
    CallStack(CallStack),
    Snake(Snake),
}

impl GameRules {
    pub fn new(kind: GameKind) -> Self {
        match kind {
            GameKind::TokenRain => GameRules::TokenRain(TokenRain::default()),
            GameKind::MineShaft => GameRules::MineShaft(MineShaft::default()),
            GameKind::PipeFlow => GameRules::PipeFlow(PipeFlow::default()),
            GameKind::CallStack => GameRules::CallStack(CallStack::default()),
            GameKind::Snake => GameRules::Snake(Snake::default()),
        }
    }

    pub fn kind(&self) -> GameKind {
        match self {
            GameRules::TokenRain(_) => GameKind::TokenRain,
            GameRules::MineShaft(_) => GameKind::MineShaft,
            GameRules::PipeFlow(_) => GameKind::PipeFlow,
            GameRules::CallStack(_) => GameKind::CallStack,
            GameRules::Snake(_) => GameKind::Snake,
        }
    }

    /// Deal the current level (start of run or after a level advance)
    pub fn setup_level(&mut self, env: &mut RuleEnv) {
        log::info!("{} level {}", self.kind().name(), env.state.level);
        match self {
            GameRules::TokenRain(g) => g.setup_level(env),
            GameRules::MineShaft(g) => g.setup_level(env),
            GameRules::PipeFlow(g) => g.setup_level(env),
            GameRules::CallStack(g) => g.setup_level(env),
            GameRules::Snake(g) => g.setup_level(env),
        }
    }

    /// Apply one gameplay intent atomically
    pub fn on_intent(&mut self, intent: &IntentKind, env: &mut RuleEnv) {
        if let IntentKind::SkipLevel = intent {
            log::debug!("skip level requested");
            env.out.level_complete = true;
            return;
        }
        let handled = match self {
            GameRules::TokenRain(g) => g.on_intent(intent, env),
            GameRules::MineShaft(g) => g.on_intent(intent, env),
            GameRules::PipeFlow(g) => g.on_intent(intent, env),
            GameRules::CallStack(g) => g.on_intent(intent, env),
            GameRules::Snake(g) => g.on_intent(intent, env),
        };
        if !handled {
            log::debug!("{} ignores {intent:?}", self.kind().name());
            env.out.ignored += 1;
        }
    }

    pub fn on_timer(&mut self, kind: TimerKind, env: &mut RuleEnv) {
        match self {
            GameRules::TokenRain(g) => g.on_timer(kind, env),
            GameRules::MineShaft(_) => {}
            GameRules::PipeFlow(g) => g.on_timer(kind, env),
            GameRules::CallStack(g) => g.on_timer(kind, env),
            GameRules::Snake(g) => g.on_timer(kind, env),
        }
    }

    /// Per-tick work after the registry has moved (spawning, capacity checks)
    pub fn advance(&mut self, env: &mut RuleEnv) {
        if let GameRules::TokenRain(g) = self {
            g.advance(env);
        }
    }

    /// Economy event for a registry event, if it has one
    pub fn score_event(&self, event: &RegistryEvent, state: &GameState) -> Option<ScoreEvent> {
        match self {
            GameRules::TokenRain(_) => TokenRain::score_event(event),
            GameRules::MineShaft(_) | GameRules::PipeFlow(_) => None,
            GameRules::CallStack(_) => CallStack::score_event(event, state),
            GameRules::Snake(_) => Snake::score_event(event, state),
        }
    }

    /// Whether the current level is done after this tick
    pub fn level_complete(&self, state: &GameState, tuning: &Tuning, out: &RuleOutput) -> bool {
        if out.level_complete {
            return true;
        }
        let kind = self.kind();
        !kind.is_board() && state.score >= tuning.completion_threshold(state.level, false)
    }

    pub fn board_view(&self) -> BoardView {
        match self {
            GameRules::TokenRain(_) => BoardView::None,
            GameRules::MineShaft(g) => g.board_view(),
            GameRules::PipeFlow(g) => g.board_view(),
            GameRules::CallStack(g) => g.board_view(),
            GameRules::Snake(g) => g.board_view(),
        }
    }
}


#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_game_kind_names_round_trip() {
        for kind in GameKind::ALL {
            assert_eq!(GameKind::parse(kind.name()), Some(kind));
        }
        assert_eq!(GameKind::parse("SNAKE"), Some(GameKind::Snake));
        assert_eq!(GameKind::parse("tetris"), None);
    }

    #[test]
    fn test_board_games() {
        assert!(GameKind::MineShaft.is_board());
        assert!(GameKind::PipeFlow.is_board());
        assert!(!GameKind::Snake.is_board());
        assert_eq!(GameKind::MineShaft.resource_kind(), ResourceKind::Energy);
    }

    #[test]
    fn test_skip_level_marks_complete() {
        let mut h = test_env::Harness::new(GameKind::TokenRain, 1);
        let mut rules = GameRules::new(GameKind::TokenRain);
        rules.on_intent(&IntentKind::SkipLevel, &mut h.env());
        let out = h.take_out();
        assert!(rules.level_complete(&h.state, &h.tuning, &out));
    }

    #[test]
    fn test_stream_level_complete_by_score() {
        let h = test_env::Harness::new(GameKind::Snake, 1);
        let rules = GameRules::new(GameKind::Snake);
        let mut state = h.state.clone();
        assert!(!rules.level_complete(&state, &h.tuning, &RuleOutput::default()));
        state.score = h.tuning.level_score_step;
        assert!(rules.level_complete(&state, &h.tuning, &RuleOutput::default()));
        let board = GameRules::new(GameKind::MineShaft);
        assert!(!board.level_complete(&state, &h.tuning, &RuleOutput::default()));
    }
}
