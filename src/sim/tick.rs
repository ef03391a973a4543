//! Simulation scheduler
//!
//! One [`SimulationScheduler::tick`] is the only place state changes. Inside a
//! tick the order is fixed:
//!
//! 1. Drain intents in arrival order; control intents go to the state machine
//! 2. Stop here unless playing
//! 3. Advance timers and run their handlers
//! 4. Move the registry, let the rules spawn, expire what left the arena
//! 5. Score registry events, then direct rule events
//! 6. Integrate particles once
//! 7. Evaluate failures, level completion and victory
//! 8. Hand queued audio cues to the sink
//!
//! Player intents are applied before timers, so an input arriving in the
//! same tick as a deadline still gets judged first.

use glam::Vec2;
use serde::{Deserialize, Serialize};

use super::entity::{EntityRegistry, RegistryEvent};
use super::generator::ProceduralGenerator;
use super::intent::{IntentKind, IntentQueue};
use super::particle::{Effect, ParticleSystem};
use super::phase::{Failure, GameMode, GameStateMachine, Transition};
use super::rules::{GameKind, GameRules, RuleEnv, RuleOutput};
use super::scoring::{ScoreEvent, ScoringEngine};
use super::snapshot::{BoardView, Snapshot};
use super::state::GameState;
use super::timer::TimerSet;
use crate::arena_center;
use crate::audio::{AudioCue, AudioSink, NullAudio};
use crate::consts::{MAX_FRAME_MS, MAX_SUBSTEPS, SIM_DT_MS};
use crate::highscores::{AlwaysOpen, ScoreSubmitter, SessionGate, Submission};
use crate::settings::Settings;

/// Color of the floating "+N" labels
const SCORE_TEXT_COLOR: u32 = 0xfacc15;
/// Keeps the level generator stream apart from the particle stream
const GENERATOR_SALT: u64 = 0x5eed_a2ca_de00_0f0f;

/// Counters for input and contract problems that did not stop the run
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Diagnostics {
    /// Gameplay intents that arrived while not playing
    pub dropped_intents: u64,
    /// Intents refused because the queue was full
    pub overflowed_intents: u64,
    /// Intents the running game has no use for
    pub ignored_intents: u64,
    /// Intents that hit nothing
    pub no_hit: u64,
    /// Intents aimed at something already judged
    pub already_resolved: u64,
    /// Timer events from before a teardown
    pub stale_timer_events: u64,
    /// Broken internal contracts logged instead of panicking
    pub contract_violations: u64,
    /// Ticks simulated while playing
    pub ticks_run: u64,
    /// State machine transitions taken
    pub transitions: u64,
}

/// The live run: authoritative state plus the rules judging it
#[derive(Debug, Clone)]
pub struct Session {
    pub state: GameState,
    pub rules: GameRules,
}

/// Every subsystem the scheduler owns
#[derive(Debug, Clone)]
pub struct SimulationContext {
    pub settings: Settings,
    pub session: Option<Session>,
    pub registry: EntityRegistry,
    pub particles: ParticleSystem,
    pub generator: ProceduralGenerator,
    pub scoring: ScoringEngine,
    pub timers: TimerSet,
    pub machine: GameStateMachine,
}

impl SimulationContext {
    pub fn new(settings: Settings) -> Self {
        Self {
            particles: ParticleSystem::new(0, settings.max_particles(), settings.burst_scale()),
            generator: ProceduralGenerator::new(0),
            scoring: ScoringEngine::from_tuning(&settings.tuning),
            registry: EntityRegistry::default(),
            timers: TimerSet::new(),
            machine: GameStateMachine::new(),
            session: None,
            settings,
        }
    }

    /// Borrow the rules and the environment they act on
    fn split<'a>(&'a mut self, out: &'a mut RuleOutput) -> Option<(&'a mut GameRules, RuleEnv<'a>)> {
        let session = self.session.as_mut()?;
        Some((
            &mut session.rules,
            RuleEnv {
                registry: &mut self.registry,
                particles: &mut self.particles,
                generator: &mut self.generator,
                timers: &mut self.timers,
                state: &session.state,
                tuning: &self.settings.tuning,
                out,
            },
        ))
    }

    /// Tear down the run: no timer, object or particle survives
    fn teardown(&mut self) {
        self.timers.cancel_all();
        self.registry.clear();
        self.particles.clear();
        self.session = None;
    }
}

/// Fixed-timestep driver around a [`SimulationContext`]
pub struct SimulationScheduler {
    ctx: SimulationContext,
    intents: IntentQueue,
    accumulator: f32,
    diagnostics: Diagnostics,
    audio: Box<dyn AudioSink>,
    submitter: Option<Box<dyn ScoreSubmitter>>,
    gate: Box<dyn SessionGate>,
    cues: Vec<AudioCue>,
    last_submission: Option<Submission>,
}

impl SimulationScheduler {
    pub fn new(settings: Settings) -> Self {
        Self {
            intents: IntentQueue::new(settings.intent_capacity),
            ctx: SimulationContext::new(settings),
            accumulator: 0.0,
            diagnostics: Diagnostics::default(),
            audio: Box::new(NullAudio),
            submitter: None,
            gate: Box::new(AlwaysOpen),
            cues: Vec::new(),
            last_submission: None,
        }
    }

    pub fn with_audio(mut self, audio: impl AudioSink + 'static) -> Self {
        self.audio = Box::new(audio);
        self
    }

    pub fn with_submitter(mut self, submitter: impl ScoreSubmitter + 'static) -> Self {
        self.submitter = Some(Box::new(submitter));
        self
    }

    pub fn with_gate(mut self, gate: impl SessionGate + 'static) -> Self {
        self.gate = Box::new(gate);
        self
    }

    /// Queue an intent for the next tick; `None` if the queue is full
    pub fn submit(&mut self, at_ms: f64, kind: IntentKind) -> Option<u64> {
        self.intents.submit(at_ms, kind)
    }

    pub fn mode(&self) -> GameMode {
        self.ctx.machine.mode()
    }

    pub fn state(&self) -> Option<&GameState> {
        self.ctx.session.as_ref().map(|s| &s.state)
    }

    pub fn context(&self) -> &SimulationContext {
        &self.ctx
    }

    pub fn settings(&self) -> &Settings {
        &self.ctx.settings
    }

    /// Result handed to the submitter when the last run ended
    pub fn last_submission(&self) -> Option<&Submission> {
        self.last_submission.as_ref()
    }

    pub fn diagnostics(&self) -> Diagnostics {
        Diagnostics {
            overflowed_intents: self.intents.overflowed(),
            transitions: self.ctx.machine.transitions(),
            ..self.diagnostics
        }
    }

    /// Account for `elapsed_ms` of wall-clock time and run the ticks it buys
    ///
    /// Long gaps are clamped, and at most [`MAX_SUBSTEPS`] ticks run per call.
    pub fn frame(&mut self, elapsed_ms: f32) -> Snapshot {
        self.accumulator += elapsed_ms.clamp(0.0, MAX_FRAME_MS);
        let mut substeps = 0;
        while self.accumulator >= SIM_DT_MS && substeps < MAX_SUBSTEPS {
            self.tick(SIM_DT_MS);
            self.accumulator -= SIM_DT_MS;
            substeps += 1;
        }
        if substeps == MAX_SUBSTEPS {
            // Drop the backlog rather than spiral
            self.accumulator = self.accumulator.min(SIM_DT_MS);
        }
        self.snapshot()
    }

    /// Read-only view of the last finished tick
    pub fn snapshot(&self) -> Snapshot {
        let session = self.ctx.session.as_ref();
        Snapshot {
            tick: session.map(|s| s.state.time_ticks).unwrap_or(0),
            mode: self.ctx.machine.mode(),
            state: session.map(|s| s.state.clone()),
            objects: self.ctx.registry.iter().cloned().collect(),
            particles: self.ctx.particles.iter().cloned().collect(),
            board: session.map(|s| s.rules.board_view()).unwrap_or(BoardView::None),
        }
    }

    /// Run exactly one simulation step of `dt_ms`
    pub fn tick(&mut self, dt_ms: f32) {
        let mut out = RuleOutput::default();
        let playing_at_start = self.ctx.machine.is_playing();
        if playing_at_start {
            self.open_step();
        }

        for intent in self.intents.drain() {
            if intent.kind.is_control() {
                self.control(&intent.kind, &mut out);
                continue;
            }
            if !self.ctx.machine.is_playing() || !out.failures.is_empty() {
                log::debug!("dropping {:?} in {:?}", intent.kind, self.ctx.machine.mode());
                self.diagnostics.dropped_intents += 1;
                continue;
            }
            if let Some((rules, mut env)) = self.ctx.split(&mut out) {
                rules.on_intent(&intent.kind, &mut env);
            }
        }

        if !self.ctx.machine.is_playing() {
            self.finish_tick(out);
            return;
        }
        if !playing_at_start {
            self.open_step();
        }

        for event in self.ctx.timers.advance(dt_ms) {
            if !self.ctx.timers.is_current(&event) {
                log::warn!(
                    "stale {:?} from epoch {} (now {})",
                    event.kind,
                    event.epoch,
                    self.ctx.timers.epoch()
                );
                self.diagnostics.stale_timer_events += 1;
                continue;
            }
            if let Some((rules, mut env)) = self.ctx.split(&mut out) {
                rules.on_timer(event.kind, &mut env);
            }
        }

        let dt = dt_ms / 1000.0;
        let tick = match self.ctx.session.as_mut() {
            Some(session) => {
                session.state.time_ticks += 1;
                session.state.time_ticks
            }
            None => return self.finish_tick(out),
        };
        self.ctx.registry.advance(dt);
        if let Some((rules, mut env)) = self.ctx.split(&mut out) {
            rules.advance(&mut env);
        }
        self.ctx.registry.expire_out_of_bounds();

        self.settle(&mut out);

        if !self.ctx.particles.integrate(dt, tick) {
            out.violation(format!("particles integrated twice for tick {tick}"));
        }
        self.diagnostics.ticks_run += 1;

        self.evaluate(&mut out);
        self.finish_tick(out);
    }

    /// Purge last tick's retired objects and stamp new spawns with this tick
    fn open_step(&mut self) {
        if let Some(session) = &self.ctx.session {
            self.ctx.registry.begin_tick(session.state.time_ticks + 1);
        }
    }

    fn control(&mut self, kind: &IntentKind, out: &mut RuleOutput) {
        match *kind {
            IntentKind::Start { game, seed } => match self.ctx.machine.apply(Transition::Start) {
                Ok(_) => self.start_run(game, seed, out),
                Err(err) => {
                    log::warn!("{err}");
                    self.diagnostics.dropped_intents += 1;
                }
            },
            IntentKind::Pause => {
                // A failure already decided this tick cannot be paused away
                if !out.failures.is_empty() {
                    self.diagnostics.dropped_intents += 1;
                    return;
                }
                let transition = if self.ctx.machine.mode() == GameMode::Paused {
                    Transition::Resume
                } else {
                    Transition::Pause
                };
                match self.ctx.machine.apply(transition) {
                    Ok(GameMode::Paused) => {
                        self.ctx.timers.suspend();
                        out.cues.push(AudioCue::Pause);
                    }
                    Ok(_) => {
                        self.ctx.timers.resume();
                        out.cues.push(AudioCue::Pause);
                    }
                    Err(err) => {
                        log::debug!("{err}");
                        self.diagnostics.dropped_intents += 1;
                    }
                }
            }
            IntentKind::Reset => {
                if self.ctx.machine.apply(Transition::Reset).is_ok() {
                    self.ctx.teardown();
                    self.accumulator = 0.0;
                    *out = RuleOutput::default();
                }
            }
            _ => {}
        }
    }

    fn start_run(&mut self, game: GameKind, seed: u64, out: &mut RuleOutput) {
        log::info!("starting {} with seed {seed}", game.name());
        let ctx = &mut self.ctx;
        ctx.timers.cancel_all();
        ctx.registry.clear();
        ctx.particles.reseed(seed);
        ctx.generator.reseed(seed ^ GENERATOR_SALT);
        ctx.session = Some(Session {
            state: GameState::new(game, seed, &ctx.settings.tuning),
            rules: GameRules::new(game),
        });
        if let Some((rules, mut env)) = ctx.split(out) {
            rules.setup_level(&mut env);
        }
        out.cues.push(AudioCue::Start);
    }

    /// Turn this tick's events into score, resource and streak changes
    ///
    /// Registry events go first in emission order, then direct events.
    fn settle(&mut self, out: &mut RuleOutput) {
        let events = self.ctx.registry.drain_events();
        let mut scored: Vec<(ScoreEvent, Option<Vec2>)> = Vec::with_capacity(events.len());
        if let Some((rules, mut env)) = self.ctx.split(out) {
            for event in &events {
                if let Some(score_event) = rules.score_event(event, env.state) {
                    env.feedback(event);
                    scored.push((score_event, Some(event_pos(event))));
                }
            }
        }
        scored.append(&mut out.events);

        let ctx = &mut self.ctx;
        let Some(session) = ctx.session.as_mut() else {
            return;
        };
        for (event, at) in scored {
            let delta = ctx.scoring.evaluate(&event, &session.state);
            session.state.apply(&event, &delta);
            if delta.points > 0 {
                if let Some(at) = at {
                    ctx.particles
                        .spawn_text(at, format!("+{}", delta.points), SCORE_TEXT_COLOR);
                }
            }
            if delta.depleted {
                log::info!("{:?} depleted", session.state.resource_kind);
                out.fail(Failure::ResourceDepleted);
            }
        }
    }

    /// Failures first, then level completion and victory
    fn evaluate(&mut self, out: &mut RuleOutput) {
        let mut victory = false;
        if out.failures.is_empty() {
            let ctx = &mut self.ctx;
            let tuning = &ctx.settings.tuning;
            let Some(session) = ctx.session.as_mut() else {
                return;
            };
            if session.rules.level_complete(&session.state, tuning, out) {
                let state = &mut session.state;
                let game = state.game;
                if state.level < tuning.final_level {
                    state.advance_level();
                    log::info!("level {} reached", state.level);
                    ctx.particles.emit(Effect::LevelClear, arena_center());
                    out.cues.push(AudioCue::LevelUp);
                    if let Some((rules, mut env)) = ctx.split(out) {
                        rules.setup_level(&mut env);
                    }
                } else if state.score >= tuning.completion_threshold(state.level, game.is_board()) {
                    victory = true;
                } else {
                    log::info!("final level cleared below threshold, dealing again");
                    if let Some((rules, mut env)) = ctx.split(out) {
                        rules.setup_level(&mut env);
                    }
                }
            }
        }

        let ended = self.ctx.machine.evaluate(&out.failures, victory);
        if let Some(mode) = ended {
            self.end_run(mode, out);
        }
    }

    fn end_run(&mut self, mode: GameMode, out: &mut RuleOutput) {
        self.ctx.timers.cancel_all();
        out.cues.push(match mode {
            GameMode::Victory => AudioCue::Victory,
            _ => AudioCue::GameOver,
        });
        let Some(session) = &self.ctx.session else {
            return;
        };
        let state = &session.state;
        let submission = Submission {
            game: state.game,
            score: state.score,
            secondary: state.level,
            tertiary: state.best_streak,
            victory: mode == GameMode::Victory,
        };
        log::info!("run over ({mode:?}): score {} level {}", state.score, state.level);
        if self.gate.can_submit() {
            if let Some(submitter) = self.submitter.as_mut() {
                submitter.submit(&submission);
            }
        } else {
            log::info!("no session, score not submitted");
        }
        self.last_submission = Some(submission);
    }

    /// Fold counters, report violations, flush audio
    fn finish_tick(&mut self, out: RuleOutput) {
        let diag = &mut self.diagnostics;
        diag.no_hit += out.no_hit;
        diag.already_resolved += out.already_resolved;
        diag.ignored_intents += out.ignored;

        for violation in &out.violations {
            if self.ctx.settings.strict_contracts {
                panic!("contract violation: {violation}");
            }
            log::error!("contract violation: {violation}");
            self.diagnostics.contract_violations += 1;
        }

        self.cues.extend(out.cues);
        for cue in self.cues.drain(..) {
            self.audio.play(cue);
        }
    }
}

fn event_pos(event: &RegistryEvent) -> Vec2 {
    match event {
        RegistryEvent::Resolved { pos, .. } | RegistryEvent::Missed { pos, .. } => *pos,
    }
}

#[cfg(test)]
mod tests {
    use std::cell::RefCell;
    use std::rc::Rc;

    use super::*;
    use crate::highscores::Offline;
    use crate::sim::entity::{GameObject, Lifecycle, ObjectId, Payload};

    #[derive(Clone, Default)]
    struct Recorder(Rc<RefCell<Vec<Submission>>>);

    impl ScoreSubmitter for Recorder {
        fn submit(&mut self, submission: &Submission) {
            self.0.borrow_mut().push(*submission);
        }
    }

    #[derive(Clone, Default)]
    struct CueLog(Rc<RefCell<Vec<AudioCue>>>);

    impl AudioSink for CueLog {
        fn play(&mut self, cue: AudioCue) {
            self.0.borrow_mut().push(cue);
        }
    }

    fn started(game: GameKind, seed: u64, settings: Settings) -> SimulationScheduler {
        let mut sim = SimulationScheduler::new(settings);
        sim.submit(0.0, IntentKind::Start { game, seed });
        sim.tick(SIM_DT_MS);
        sim
    }

    fn run(sim: &mut SimulationScheduler, ticks: u32) {
        for _ in 0..ticks {
            sim.tick(SIM_DT_MS);
        }
    }

    fn is_valid_snippet(obj: &GameObject) -> bool {
        matches!(&obj.payload, Payload::Snippet { class, .. } if class.is_valid())
    }

    fn object(sim: &SimulationScheduler, id: ObjectId) -> Option<GameObject> {
        sim.snapshot().objects.into_iter().find(|o| o.id == id)
    }

    /// Ticks after `started` until `done` first holds
    fn ticks_until(mut sim: SimulationScheduler, done: impl Fn(&SimulationScheduler) -> bool) -> u32 {
        for n in 1..=2000 {
            sim.tick(SIM_DT_MS);
            if done(&sim) {
                return n;
            }
        }
        panic!("condition never held within 2000 ticks");
    }

    #[test]
    fn test_tick_start_to_playing() {
        let sim = started(GameKind::TokenRain, 7, Settings::default());
        assert_eq!(sim.mode(), GameMode::Playing);
        let state = sim.state().unwrap();
        assert_eq!(state.time_ticks, 1);
        assert_eq!(state.level, 1);
        assert_eq!(state.resource, 3);
    }

    #[test]
    fn test_gameplay_intents_dropped_while_idle() {
        let mut sim = SimulationScheduler::new(Settings::default());
        sim.submit(0.0, IntentKind::Flow);
        sim.submit(0.0, IntentKind::SkipLevel);
        sim.tick(SIM_DT_MS);
        assert_eq!(sim.mode(), GameMode::Idle);
        assert_eq!(sim.diagnostics().dropped_intents, 2);
        assert!(sim.state().is_none());
    }

    #[test]
    fn test_tick_pause_freezes_everything() {
        let mut sim = started(GameKind::Snake, 3, Settings::default());
        run(&mut sim, 30);
        sim.submit(0.0, IntentKind::Pause);
        sim.tick(SIM_DT_MS);
        assert_eq!(sim.mode(), GameMode::Paused);
        let frozen = sim.snapshot();
        run(&mut sim, 120);
        let later = sim.snapshot();
        assert_eq!(later.tick, frozen.tick);
        assert_eq!(later.state, frozen.state);
        assert_eq!(later.objects.len(), frozen.objects.len());

        sim.submit(0.0, IntentKind::Pause);
        run(&mut sim, 1);
        assert_eq!(sim.mode(), GameMode::Playing);
        assert_eq!(sim.state().unwrap().time_ticks, frozen.tick + 1);
    }

    #[test]
    fn test_gameplay_intent_while_paused_is_dropped() {
        let mut sim = started(GameKind::CallStack, 1, Settings::default());
        sim.submit(0.0, IntentKind::Pause);
        sim.submit(0.0, IntentKind::ReturnFrame { id: None });
        sim.tick(SIM_DT_MS);
        assert_eq!(sim.diagnostics().dropped_intents, 1);
    }

    #[test]
    fn test_determinism() {
        let script = |sim: &mut SimulationScheduler| {
            for i in 0..600u32 {
                if i % 40 == 0 {
                    sim.submit(f64::from(i), IntentKind::Pointer { pos: Vec2::new(400.0, 300.0) });
                }
                sim.tick(SIM_DT_MS);
            }
        };
        let mut a = started(GameKind::TokenRain, 12345, Settings::default());
        let mut b = started(GameKind::TokenRain, 12345, Settings::default());
        script(&mut a);
        script(&mut b);

        let (sa, sb) = (a.snapshot(), b.snapshot());
        assert_eq!(sa.state, sb.state);
        assert_eq!(sa.mode, sb.mode);
        assert_eq!(sa.objects, sb.objects);
        assert_eq!(sa.particles.len(), sb.particles.len());
    }

    #[test]
    fn test_overflow_ends_run_and_submits() {
        let mut settings = Settings::default();
        settings.tuning.max_unresolved = 0;
        let recorder = Recorder::default();
        let mut sim = SimulationScheduler::new(settings).with_submitter(recorder.clone());
        sim.submit(0.0, IntentKind::Start { game: GameKind::TokenRain, seed: 5 });
        sim.tick(SIM_DT_MS);

        assert_eq!(sim.mode(), GameMode::GameOver(Failure::Overflow));
        let submitted = recorder.0.borrow();
        assert_eq!(submitted.len(), 1);
        assert!(!submitted[0].victory);
        assert_eq!(submitted[0].game, GameKind::TokenRain);
        assert_eq!(sim.context().timers.armed_count(), 0);
    }

    #[test]
    fn test_offline_gate_skips_submission() {
        let mut settings = Settings::default();
        settings.tuning.max_unresolved = 0;
        let recorder = Recorder::default();
        let mut sim = SimulationScheduler::new(settings)
            .with_submitter(recorder.clone())
            .with_gate(Offline);
        sim.submit(0.0, IntentKind::Start { game: GameKind::TokenRain, seed: 5 });
        sim.tick(SIM_DT_MS);
        assert!(sim.mode().is_terminal());
        assert!(recorder.0.borrow().is_empty());
        assert!(sim.last_submission().is_some());
    }

    #[test]
    fn test_terminal_only_leaves_by_reset() {
        let mut settings = Settings::default();
        settings.tuning.max_unresolved = 0;
        let mut sim = started(GameKind::TokenRain, 5, settings);
        assert!(sim.mode().is_terminal());

        sim.submit(0.0, IntentKind::Pause);
        sim.submit(0.0, IntentKind::Start { game: GameKind::Snake, seed: 1 });
        sim.tick(SIM_DT_MS);
        assert!(sim.mode().is_terminal());
        assert_eq!(sim.diagnostics().dropped_intents, 2);

        sim.submit(0.0, IntentKind::Reset);
        sim.tick(SIM_DT_MS);
        assert_eq!(sim.mode(), GameMode::Idle);
        assert!(sim.state().is_none());
        assert_eq!(sim.snapshot().objects.len(), 0);
        assert_eq!(sim.snapshot().particles.len(), 0);
    }

    #[test]
    fn test_levels_advance_to_victory() {
        let mut settings = Settings::default();
        settings.tuning.level_score_step = 0;
        settings.tuning.final_level = 2;
        let cues = CueLog::default();
        let recorder = Recorder::default();
        let mut sim = SimulationScheduler::new(settings)
            .with_audio(cues.clone())
            .with_submitter(recorder.clone());
        sim.submit(0.0, IntentKind::Start { game: GameKind::Snake, seed: 9 });
        sim.tick(SIM_DT_MS);
        assert_eq!(sim.state().unwrap().level, 2);
        sim.tick(SIM_DT_MS);

        assert_eq!(sim.mode(), GameMode::Victory);
        let submitted = recorder.0.borrow();
        assert_eq!(submitted[0].secondary, 2);
        assert!(submitted[0].victory);
        let cues = cues.0.borrow();
        assert_eq!(cues.first(), Some(&AudioCue::Start));
        assert!(cues.contains(&AudioCue::LevelUp));
        assert_eq!(cues.last(), Some(&AudioCue::Victory));
    }

    #[test]
    fn test_skip_level_on_board_game() {
        let mut sim = started(GameKind::MineShaft, 4, Settings::default());
        sim.submit(0.0, IntentKind::SkipLevel);
        sim.tick(SIM_DT_MS);
        assert_eq!(sim.state().unwrap().level, 2);
        assert_eq!(sim.mode(), GameMode::Playing);
    }

    #[test]
    fn test_frame_clamps_and_caps_substeps() {
        let mut sim = started(GameKind::Snake, 2, Settings::default());
        let before = sim.state().unwrap().time_ticks;
        let snap = sim.frame(SIM_DT_MS * 3.0 + 1.0);
        assert_eq!(snap.tick, before + 3);
        // A long stall only buys one clamped frame
        let snap = sim.frame(5000.0);
        assert_eq!(snap.tick, before + 9);
        // Less than one step waits in the accumulator
        let snap = sim.frame(1.0);
        assert_eq!(snap.tick, before + 9);
    }

    #[test]
    fn test_contract_violation_counted_when_lenient() {
        let mut settings = Settings::default();
        settings.strict_contracts = false;
        let mut sim = started(GameKind::MineShaft, 4, settings);
        sim.submit(0.0, IntentKind::Cell { col: 99, row: 99 });
        sim.tick(SIM_DT_MS);
        assert_eq!(sim.diagnostics().contract_violations, 1);
        assert_eq!(sim.mode(), GameMode::Playing);
    }

    #[test]
    #[should_panic(expected = "contract violation")]
    fn test_contract_violation_panics_when_strict() {
        let mut settings = Settings::default();
        settings.strict_contracts = true;
        let mut sim = started(GameKind::MineShaft, 4, settings);
        sim.submit(0.0, IntentKind::Cell { col: -1, row: 0 });
        sim.tick(SIM_DT_MS);
    }

    #[test]
    fn test_unused_intent_is_ignored() {
        let mut sim = started(GameKind::Snake, 4, Settings::default());
        sim.submit(0.0, IntentKind::Flow);
        sim.tick(SIM_DT_MS);
        assert_eq!(sim.diagnostics().ignored_intents, 1);
    }

    #[test]
    fn test_full_queue_counts_overflow() {
        let mut settings = Settings::default();
        settings.intent_capacity = 2;
        let mut sim = SimulationScheduler::new(settings);
        assert!(sim.submit(0.0, IntentKind::Flow).is_some());
        assert!(sim.submit(0.0, IntentKind::Flow).is_some());
        assert!(sim.submit(0.0, IntentKind::Flow).is_none());
        assert_eq!(sim.diagnostics().overflowed_intents, 1);
    }

    #[test]
    fn test_correct_token_scores_once() {
        let mut sim = started(GameKind::TokenRain, 21, Settings::default());
        // Let the first snippet become active and fall into view
        run(&mut sim, 30);
        let snap = sim.snapshot();
        let target = snap
            .objects
            .iter()
            .find(|o| matches!(&o.payload, Payload::Snippet { class, .. } if class.is_valid()))
            .map(|o| o.pos);
        let pos = target.expect("seed 21 drops a valid snippet within 30 ticks");
        sim.submit(0.0, IntentKind::Pointer { pos });
        sim.submit(0.0, IntentKind::Pointer { pos });
        sim.tick(SIM_DT_MS);
        let state = sim.state().unwrap();
        assert_eq!(state.resolved, 1);
        assert!(state.score >= 100);
    }

    #[test]
    fn test_restart_after_reset_activates_next_tick() {
        let mut sim = started(GameKind::CallStack, 8, Settings::default());
        run(&mut sim, 400);
        assert!(!sim.snapshot().objects.is_empty());

        sim.submit(0.0, IntentKind::Reset);
        sim.submit(0.0, IntentKind::Start { game: GameKind::Snake, seed: 8 });
        sim.tick(SIM_DT_MS);

        assert_eq!(sim.mode(), GameMode::Playing);
        assert_eq!(sim.context().registry.current_tick(), 1);
        let objects = sim.snapshot().objects;
        // Three body segments and the food
        assert_eq!(objects.len(), 4);
        for obj in &objects {
            assert_eq!(obj.lifecycle, Lifecycle::Active, "{:?} stuck spawning", obj.id);
        }
    }

    #[test]
    fn test_particles_never_change_state() {
        let mut quiet = Settings::default();
        quiet.particles = false;
        let mut on = started(GameKind::TokenRain, 404, Settings::default());
        let mut off = started(GameKind::TokenRain, 404, quiet);

        let mut saw_particles = false;
        for i in 0..600u32 {
            for sim in [&mut on, &mut off] {
                if i % 20 == 0 {
                    let lowest = sim
                        .snapshot()
                        .objects
                        .iter()
                        .filter(|o| is_valid_snippet(o))
                        .max_by(|a, b| a.pos.y.total_cmp(&b.pos.y))
                        .map(|o| o.pos);
                    if let Some(pos) = lowest {
                        sim.submit(f64::from(i), IntentKind::Pointer { pos });
                    }
                }
                sim.tick(SIM_DT_MS);
            }
            saw_particles |= !on.snapshot().particles.is_empty();
            assert!(off.snapshot().particles.is_empty());
        }

        assert!(saw_particles);
        let (a, b) = (on.snapshot(), off.snapshot());
        assert!(a.state.as_ref().unwrap().resolved > 0);
        assert_eq!(a.state, b.state);
        assert_eq!(a.mode, b.mode);
        assert_eq!(a.objects, b.objects);
    }

    #[test]
    fn test_return_beats_deadline_in_same_tick() {
        let mut settings = Settings::default();
        settings.tuning.frame_push_ms = 2500.0;
        settings.tuning.frame_deadline_ms = 1000.0;

        // Tick on which the first frame times out when left alone
        let scout = started(GameKind::CallStack, 6, settings.clone());
        let n = ticks_until(scout, |sim| sim.state().unwrap().failures == 1);

        let mut sim = started(GameKind::CallStack, 6, settings);
        run(&mut sim, n - 1);
        assert_eq!(sim.state().unwrap().failures, 0);
        assert!(matches!(&sim.snapshot().board, BoardView::Stack { frames, .. } if frames.len() == 1));

        sim.submit(0.0, IntentKind::ReturnFrame { id: None });
        sim.tick(SIM_DT_MS);
        let state = sim.state().unwrap();
        assert_eq!(state.failures, 0);
        assert_eq!(state.resolved, 1);
        assert_eq!(sim.mode(), GameMode::Playing);

        // Nothing left to fire for the returned frame
        run(&mut sim, 120);
        assert_eq!(sim.state().unwrap().failures, 0);
    }

    #[test]
    fn test_tap_beats_floor_in_same_tick() {
        let seed = 31;
        let mut sim = started(GameKind::TokenRain, seed, Settings::default());
        let target = ticks_until_valid(&mut sim);

        // Tick on which the snippet falls past the floor when left alone
        let waited = sim.state().unwrap().time_ticks as u32 - 1;
        let n = waited
            + ticks_until(sim, |s| {
                object(s, target).is_some_and(|o| o.lifecycle == Lifecycle::Expired)
            });

        let mut sim = started(GameKind::TokenRain, seed, Settings::default());
        run(&mut sim, n - 1);
        let before = object(&sim, target).expect("snippet still falling");
        assert_eq!(before.lifecycle, Lifecycle::Active);

        sim.submit(0.0, IntentKind::Pointer { pos: before.pos });
        sim.tick(SIM_DT_MS);
        let after = object(&sim, target).expect("retired objects linger until the next tick");
        assert_eq!(after.lifecycle, Lifecycle::Resolved);
        let state = sim.state().unwrap();
        assert_eq!(state.resolved, 1);
        assert_eq!(state.failures, 0);
        assert_eq!(state.resource, 3);
    }

    /// Run until a valid snippet is on screen and return the first one
    fn ticks_until_valid(sim: &mut SimulationScheduler) -> ObjectId {
        for _ in 0..2000 {
            if let Some(obj) = sim.snapshot().objects.iter().find(|o| is_valid_snippet(o)) {
                return obj.id;
            }
            sim.tick(SIM_DT_MS);
        }
        panic!("no valid snippet within 2000 ticks");
    }
}
