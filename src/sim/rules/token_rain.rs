//! Token rain: code snippets fall down the well; tap the well-formed ones

use glam::Vec2;

use super::RuleEnv;
use crate::consts::{ARENA_HEIGHT, ARENA_WIDTH};
use crate::sim::collision::hit_test;
use crate::sim::entity::{Boundary, Outcome, Payload, RegistryEvent, SnippetClass, SpawnRate};
use crate::sim::intent::IntentKind;
use crate::sim::scoring::ScoreEvent;
use crate::sim::timer::TimerKind;

/// Horizontal margin kept clear of spawns
const SPAWN_MARGIN: f32 = 80.0;
/// Approximate glyph width used for hit boxes
const GLYPH_WIDTH: f32 = 8.0;
const SNIPPET_HALF_HEIGHT: f32 = 14.0;

#[derive(Debug, Clone, Default)]
pub struct TokenRain;

impl TokenRain {
    pub fn setup_level(&mut self, env: &mut RuleEnv) {
        let t = env.tuning;
        env.registry.configure(
            Boundary::Below(ARENA_HEIGHT),
            SpawnRate::Interval {
                base_ticks: t.spawn_interval_ticks,
                min_ticks: t.min_spawn_interval_ticks,
                step_per_tier: t.spawn_interval_step,
            },
        );
    }

    pub fn on_intent(&mut self, intent: &IntentKind, env: &mut RuleEnv) -> bool {
        let IntentKind::Pointer { pos } = intent else {
            return false;
        };
        let Some(id) = hit_test(env.registry, *pos) else {
            env.out.no_hit += 1;
            return true;
        };
        let class = match env.registry.get(id).map(|o| &o.payload) {
            Some(Payload::Snippet { class, .. }) => *class,
            _ => {
                env.out.violation(format!("object {id} in the well is not a snippet"));
                return true;
            }
        };

        let outcome = if class.is_valid() {
            Outcome::Correct
        } else {
            Outcome::Incorrect
        };
        if let Err(err) = env.registry.resolve(id, outcome) {
            env.out.registry_error(err);
            return true;
        }

        if class == SnippetClass::Bonus {
            env.out.event(ScoreEvent::Double(true), Some(*pos));
            env.timers.cancel_kind(TimerKind::DoublePoints);
            env.timers
                .arm_once(TimerKind::DoublePoints, env.tuning.double_points_ms);
        }
        true
    }

    pub fn on_timer(&mut self, kind: TimerKind, env: &mut RuleEnv) {
        if kind == TimerKind::DoublePoints {
            env.out.event(ScoreEvent::Double(false), None);
        }
    }

    /// Spawn on cadence and check the well has not overflowed
    pub fn advance(&mut self, env: &mut RuleEnv) {
        let tier = env.state.tier();
        if env.registry.spawn_due(env.state.time_ticks, tier) {
            let snippet = env.generator.snippet(env.state.level);
            let x = env
                .generator
                .range_f32(SPAWN_MARGIN, ARENA_WIDTH - SPAWN_MARGIN);
            let speed = env.tuning.fall_speed + env.tuning.fall_speed_step * (tier - 1) as f32;
            let half_width = (snippet.text.chars().count() as f32 * GLYPH_WIDTH / 2.0).max(24.0);
            let id = env.registry.spawn(
                Payload::Snippet {
                    text: snippet.text,
                    class: snippet.class,
                    tier: snippet.tier,
                },
                Vec2::new(x, -SNIPPET_HALF_HEIGHT),
                Some(Vec2::new(0.0, speed)),
                Vec2::new(half_width, SNIPPET_HALF_HEIGHT),
            );
            log::debug!("spawned snippet {id} ({:?})", snippet.class);
        }

        let unresolved = env.registry.unresolved_count();
        if unresolved > env.tuning.max_unresolved {
            log::info!("well overflowed with {unresolved} snippets");
            env.out.fail(crate::sim::phase::Failure::Overflow);
        }
    }

    pub fn score_event(event: &RegistryEvent) -> Option<ScoreEvent> {
        match event {
            RegistryEvent::Resolved {
                outcome: Outcome::Correct,
                payload: Payload::Snippet { tier, .. },
                ..
            } => Some(ScoreEvent::Correct {
                tier: *tier,
                bonus: 0,
            }),
            RegistryEvent::Resolved {
                outcome: Outcome::Incorrect,
                ..
            } => Some(ScoreEvent::Incorrect { cost: None }),
            // Broken snippets may fall away freely
            RegistryEvent::Missed {
                payload: Payload::Snippet { class, .. },
                ..
            } if class.is_valid() => Some(ScoreEvent::Miss { cost: None }),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sim::phase::Failure;
    use crate::sim::rules::GameKind;
    use crate::sim::rules::test_env::Harness;

    fn drop_snippet(h: &mut Harness, class: SnippetClass, x: f32, y: f32) -> crate::sim::entity::ObjectId {
        h.registry.spawn(
            Payload::Snippet {
                text: "let x = 5;".into(),
                class,
                tier: 1,
            },
            Vec2::new(x, y),
            Some(Vec2::new(0.0, 60.0)),
            Vec2::new(40.0, 14.0),
        )
    }

    #[test]
    fn test_tap_valid_is_correct_and_broken_is_incorrect() {
        let mut h = Harness::new(GameKind::TokenRain, 1);
        let mut rules = TokenRain;
        let good = drop_snippet(&mut h, SnippetClass::Valid, 100.0, 100.0);
        let bad = drop_snippet(&mut h, SnippetClass::Broken, 400.0, 100.0);
        h.step();

        rules.on_intent(&IntentKind::Pointer { pos: Vec2::new(100.0, 100.0) }, &mut h.env());
        rules.on_intent(&IntentKind::Pointer { pos: Vec2::new(400.0, 100.0) }, &mut h.env());
        let events = h.registry.drain_events();
        assert_eq!(
            TokenRain::score_event(&events[0]),
            Some(ScoreEvent::Correct { tier: 1, bonus: 0 })
        );
        assert_eq!(
            TokenRain::score_event(&events[1]),
            Some(ScoreEvent::Incorrect { cost: None })
        );
        assert!(h.registry.get(good).unwrap().lifecycle.is_retired());
        assert!(h.registry.get(bad).unwrap().lifecycle.is_retired());
    }

    #[test]
    fn test_resolved_snippet_no_longer_hit() {
        let mut h = Harness::new(GameKind::TokenRain, 1);
        let mut rules = TokenRain;
        drop_snippet(&mut h, SnippetClass::Valid, 100.0, 100.0);
        h.step();
        let tap = IntentKind::Pointer { pos: Vec2::new(100.0, 100.0) };
        rules.on_intent(&tap, &mut h.env());
        rules.on_intent(&tap, &mut h.env());
        rules.on_intent(&IntentKind::Pointer { pos: Vec2::new(700.0, 500.0) }, &mut h.env());
        let out = h.take_out();
        // Resolved objects are no longer hit-testable
        assert_eq!(out.no_hit, 2);
        assert!(out.violations.is_empty());
    }

    #[test]
    fn test_broken_snippet_falls_freely() {
        let missed_broken = RegistryEvent::Missed {
            id: crate::sim::entity::ObjectId(1),
            pos: Vec2::ZERO,
            payload: Payload::Snippet {
                text: "let = ;".into(),
                class: SnippetClass::Broken,
                tier: 1,
            },
        };
        assert_eq!(TokenRain::score_event(&missed_broken), None);
    }

    #[test]
    fn test_bonus_turns_on_double_points() {
        let mut h = Harness::new(GameKind::TokenRain, 1);
        let mut rules = TokenRain;
        drop_snippet(&mut h, SnippetClass::Bonus, 100.0, 100.0);
        h.step();
        rules.on_intent(&IntentKind::Pointer { pos: Vec2::new(100.0, 100.0) }, &mut h.env());
        let out = h.take_out();
        assert_eq!(out.events[0].0, ScoreEvent::Double(true));
        assert_eq!(h.timers.armed_count(), 1);
    }

    #[test]
    fn test_spawns_on_cadence_and_overflows() {
        let mut h = Harness::new(GameKind::TokenRain, 5);
        h.tuning.max_unresolved = 2;
        let mut rules = TokenRain;
        rules.setup_level(&mut h.env());
        for tick in 0..400 {
            h.state.time_ticks = tick;
            rules.advance(&mut h.env());
        }
        assert!(h.registry.len() >= 3);
        let out = h.take_out();
        assert_eq!(out.failures, vec![Failure::Overflow]);
    }
}
