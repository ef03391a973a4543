//! Whole-crate properties and scenarios, driven through the public API

use arcade_core::Settings;
use arcade_core::consts::SIM_DT_MS;
use arcade_core::settings::Tuning;
use arcade_core::sim::generator::grammar::literals;
use arcade_core::sim::generator::{
    FlowResult, PipeBoard, PipeCell, ProceduralGenerator, flow_fill, tokenize, validate,
    validate_str,
};
use arcade_core::sim::{
    Boundary, ConnectorMask, Direction, Effect, EntityRegistry, GameKind, GameMode, GameState,
    GameStateMachine, IntentKind, Outcome, ParticleSystem, Payload, RegistryEvent, ScoreEvent,
    ScoringEngine, SimulationScheduler, SnippetClass, SpawnRate, Transition,
};
use glam::Vec2;
use proptest::prelude::*;

const EFFECTS: [Effect; 5] = [
    Effect::Correct,
    Effect::Incorrect,
    Effect::Miss,
    Effect::Collision,
    Effect::LevelClear,
];

fn arb_event() -> impl Strategy<Value = ScoreEvent> {
    prop_oneof![
        (1u32..=4, 0u64..100).prop_map(|(tier, bonus)| ScoreEvent::Correct { tier, bonus }),
        prop::option::of(0u32..3).prop_map(|cost| ScoreEvent::Incorrect { cost }),
        prop::option::of(0u32..3).prop_map(|cost| ScoreEvent::Miss { cost }),
        (0u32..20, 1u32..=4).prop_map(|(units, tier)| ScoreEvent::LevelClear { units, tier }),
        (0u32..4).prop_map(|cost| ScoreEvent::Spend { cost }),
        (0u32..4).prop_map(|amount| ScoreEvent::Restore { amount }),
        any::<bool>().prop_map(ScoreEvent::Double),
    ]
}

fn arb_transition() -> impl Strategy<Value = Transition> {
    prop_oneof![
        Just(Transition::Start),
        Just(Transition::Pause),
        Just(Transition::Resume),
        Just(Transition::Fail(arcade_core::sim::Failure::Leak)),
        Just(Transition::Win),
        Just(Transition::Reset),
    ]
}

/// Score, resource and streak after each event
fn trajectory(events: &[ScoreEvent]) -> Vec<(u64, u32, u32)> {
    let tuning = Tuning::default();
    let engine = ScoringEngine::from_tuning(&tuning);
    let mut state = GameState::new(GameKind::TokenRain, 1, &tuning);
    events
        .iter()
        .map(|event| {
            let delta = engine.evaluate(event, &state);
            state.apply(event, &delta);
            (state.score, state.resource, state.streak)
        })
        .collect()
}

fn snippet(reg: &mut EntityRegistry, y: f32) -> arcade_core::sim::ObjectId {
    reg.spawn(
        Payload::Snippet {
            text: "let x = 5;".into(),
            class: SnippetClass::Valid,
            tier: 1,
        },
        Vec2::new(100.0, y),
        Some(Vec2::new(0.0, 60.0)),
        Vec2::new(40.0, 10.0),
    )
}

/// Straight row of horizontal pieces from (0, 0) to (len - 1, 0)
fn straight_board(len: usize) -> PipeBoard {
    let mut grid = arcade_core::sim::Grid::new(len, 2, PipeCell::default());
    for col in 0..len {
        if let Some(cell) = grid.get_mut(col, 0) {
            cell.mask = ConnectorMask::HORIZONTAL;
        }
    }
    PipeBoard {
        grid,
        source: (0, 0),
        entry: Direction::West,
        sink: (len - 1, 0),
    }
}

proptest! {
    #[test]
    fn particle_life_only_goes_down(seed in any::<u64>(), effect in 0usize..5, ticks in 1u64..200) {
        let mut particles = ParticleSystem::new(seed, 512, 1.0);
        particles.emit(EFFECTS[effect], Vec2::new(400.0, 300.0));
        particles.spawn_text(Vec2::new(400.0, 300.0), "+100", 0xffffff);

        for tick in 1..=ticks {
            let before: Vec<f32> = particles.iter().map(|p| p.life).collect();
            prop_assert!(particles.integrate(SIM_DT_MS / 1000.0, tick));
            let after: Vec<f32> = particles.iter().map(|p| p.life).collect();

            prop_assert!(after.len() <= before.len());
            prop_assert!(after.iter().all(|life| *life > 0.0));
            if after.len() == before.len() {
                for (a, b) in after.iter().zip(&before) {
                    prop_assert!(a < b);
                }
            }
        }
    }

    #[test]
    fn scoring_is_deterministic(events in prop::collection::vec(arb_event(), 0..64)) {
        let first = trajectory(&events);
        let second = trajectory(&events);
        prop_assert_eq!(&first, &second);
        let max = Tuning::default().lives;
        for (_, resource, _) in first {
            prop_assert!(resource <= max);
        }
    }

    #[test]
    fn terminal_modes_only_leave_through_reset(transitions in prop::collection::vec(arb_transition(), 0..40)) {
        let mut machine = GameStateMachine::new();
        for transition in transitions {
            let before = machine.mode();
            let result = machine.apply(transition);
            if before.is_terminal() && transition != Transition::Reset {
                prop_assert!(result.is_err());
                prop_assert_eq!(machine.mode(), before);
            }
            if before.is_terminal() && result.is_ok() {
                prop_assert_eq!(machine.mode(), GameMode::Idle);
            }
        }
    }

    #[test]
    fn generated_pipe_levels_are_solvable(seed in any::<u64>(), level in 1u32..10) {
        let mut generator = ProceduralGenerator::new(seed);
        let dealt = generator.pipe_level(level);
        let solved = dealt.solved_board();
        let result = flow_fill(&solved);
        prop_assert!(result.is_reached(), "{}", solved.to_ascii());

        // Every solution cell is on the path, in path order
        let path = result.path();
        let inner: Vec<(usize, usize)> = path[1..path.len() - 1].to_vec();
        let cells: Vec<(usize, usize)> = dealt.solution.iter().map(|(pos, _)| *pos).collect();
        prop_assert_eq!(inner, cells);

        // An empty board leaks right after the source
        prop_assert!(!flow_fill(&dealt.board).is_reached());
    }

    #[test]
    fn pausing_freezes_the_tick_count(paused_ticks in 1u32..240, seed in any::<u64>()) {
        let mut sim = SimulationScheduler::new(Settings::default());
        sim.submit(0.0, IntentKind::Start { game: GameKind::CallStack, seed });
        for _ in 0..10 {
            sim.tick(SIM_DT_MS);
        }
        sim.submit(0.0, IntentKind::Pause);
        sim.tick(SIM_DT_MS);
        let frozen = sim.snapshot();
        for _ in 0..paused_ticks {
            sim.tick(SIM_DT_MS);
        }
        let later = sim.snapshot();
        prop_assert_eq!(later.tick, frozen.tick);
        prop_assert_eq!(later.state, frozen.state);
        prop_assert_eq!(later.objects, frozen.objects);
    }
}

#[test]
fn resolve_beats_expire_in_the_same_tick() {
    let mut reg = EntityRegistry::new(Boundary::Below(600.0), SpawnRate::Never);
    let id = snippet(&mut reg, 590.0);
    reg.begin_tick(1);
    reg.advance(0.0);

    // Past the floor and tapped in the same tick
    reg.advance(1.0);
    assert!(reg.resolve(id, Outcome::Correct).is_ok());
    assert_eq!(reg.expire_out_of_bounds(), 0);
    assert!(reg.expire(id).is_err());

    let events = reg.drain_events();
    assert_eq!(events.len(), 1);
    assert!(matches!(
        events[0],
        RegistryEvent::Resolved { outcome: Outcome::Correct, .. }
    ));
}

#[test]
fn flow_fill_walks_the_only_path() {
    let board = straight_board(5);
    assert_eq!(
        flow_fill(&board),
        FlowResult::Reached {
            path: vec![(0, 0), (1, 0), (2, 0), (3, 0), (4, 0)],
        }
    );

    let mut gap = straight_board(5);
    if let Some(cell) = gap.grid.get_mut(2, 0) {
        cell.mask = ConnectorMask::NONE;
    }
    assert_eq!(
        flow_fill(&gap),
        FlowResult::Leak {
            path: vec![(0, 0), (1, 0)],
            at: (1, 0),
        }
    );
}

#[test]
fn every_literal_validates_and_fails_without_terminator() {
    for (text, _tier) in literals() {
        assert!(validate_str(text), "{text} should be valid");
        let tokens = tokenize(text);
        let cut = &tokens[..tokens.len() - 1];
        assert!(!validate(cut), "{text} without its terminator should be invalid");
    }
}

#[test]
fn three_correct_then_a_miss() {
    let tuning = Tuning::default();
    let engine = ScoringEngine::from_tuning(&tuning);
    let mut state = GameState::new(GameKind::TokenRain, 1, &tuning);
    assert_eq!((state.level, state.streak, state.resource), (1, 0, 3));

    let correct = ScoreEvent::Correct { tier: 1, bonus: 0 };
    let mut gained = Vec::new();
    for _ in 0..3 {
        let delta = engine.evaluate(&correct, &state);
        gained.push(delta.points);
        state.apply(&correct, &delta);
    }
    assert_eq!(gained, vec![100, 120, 140]);
    assert_eq!(state.score, 360);
    assert_eq!(state.streak, 3);
    assert_eq!(state.resource, 3);

    let miss = ScoreEvent::Miss { cost: None };
    let delta = engine.evaluate(&miss, &state);
    state.apply(&miss, &delta);
    assert_eq!(state.streak, 0);
    assert_eq!(state.resource, 2);
    assert_eq!(state.score, 360);
}

#[test]
fn same_seed_same_run() {
    let play = |seed: u64| {
        let mut sim = SimulationScheduler::new(Settings::default());
        sim.submit(0.0, IntentKind::Start { game: GameKind::Snake, seed });
        for i in 0..400u32 {
            if i % 50 == 25 {
                let dir = [Direction::South, Direction::East, Direction::North, Direction::East]
                    [(i / 50) as usize % 4];
                sim.submit(f64::from(i), IntentKind::Steer(dir));
            }
            sim.frame(SIM_DT_MS);
        }
        sim.snapshot()
    };
    let (a, b) = (play(77), play(77));
    assert_eq!(a.state, b.state);
    assert_eq!(a.mode, b.mode);
    assert_eq!(a.objects, b.objects);
}

#[test]
fn lost_run_is_submitted_once_and_needs_reset() {
    let mut settings = Settings::default();
    settings.tuning.countdown_secs = 1;
    let mut sim = SimulationScheduler::new(settings);
    sim.submit(0.0, IntentKind::Start { game: GameKind::PipeFlow, seed: 3 });
    // Let the valve open on an empty board
    for _ in 0..90 {
        sim.tick(SIM_DT_MS);
    }
    assert_eq!(
        sim.mode(),
        GameMode::GameOver(arcade_core::sim::Failure::Leak)
    );
    let submission = *sim.last_submission().unwrap();
    assert_eq!(submission.secondary, 1);
    assert!(!submission.victory);

    let ticks = sim.diagnostics().ticks_run;
    sim.submit(0.0, IntentKind::Flow);
    sim.tick(SIM_DT_MS);
    assert_eq!(sim.diagnostics().ticks_run, ticks);
    assert_eq!(sim.diagnostics().dropped_intents, 1);

    sim.submit(0.0, IntentKind::Reset);
    sim.submit(0.0, IntentKind::Start { game: GameKind::PipeFlow, seed: 4 });
    sim.tick(SIM_DT_MS);
    assert_eq!(sim.mode(), GameMode::Playing);
    assert_eq!(sim.state().unwrap().seed, 4);
}
