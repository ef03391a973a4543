//! Call stack: frames get pushed on a timer; return them top first before
//! their deadlines run out

use std::collections::HashMap;

use glam::Vec2;

use super::RuleEnv;
use crate::audio::AudioCue;
use crate::consts::{ARENA_HEIGHT, ARENA_WIDTH};
use crate::sim::collision::{hit_test, stack_top};
use crate::sim::entity::{ObjectId, Outcome, Payload, RegistryEvent};
use crate::sim::intent::IntentKind;
use crate::sim::particle::Effect;
use crate::sim::phase::Failure;
use crate::sim::scoring::ScoreEvent;
use crate::sim::snapshot::BoardView;
use crate::sim::state::GameState;
use crate::sim::timer::{TimerHandle, TimerKind};

const FRAME_HALF: Vec2 = Vec2::new(160.0, 20.0);
const FRAME_PITCH: f32 = 44.0;
const STACK_BASE_Y: f32 = ARENA_HEIGHT - 40.0;

/// Fastest push cadence
const MIN_PUSH_MS: f32 = 800.0;
/// Push cadence gained per tier
const PUSH_STEP_MS: f32 = 300.0;

#[derive(Debug, Clone, Default)]
pub struct CallStack {
    /// Bottom frame first
    stack: Vec<ObjectId>,
    deadlines: HashMap<ObjectId, TimerHandle>,
    capacity: usize,
}

fn frame_pos(depth: usize) -> Vec2 {
    Vec2::new(ARENA_WIDTH / 2.0, STACK_BASE_Y - depth as f32 * FRAME_PITCH)
}

impl CallStack {
    pub fn setup_level(&mut self, env: &mut RuleEnv) {
        // A new level starts with an empty stack
        for id in self.stack.drain(..) {
            if let Err(err) = env.registry.retire(id) {
                env.out.registry_error(err);
            }
        }
        for (_, handle) in self.deadlines.drain() {
            env.timers.cancel(handle);
        }
        self.capacity = env.tuning.stack_capacity;

        let tier = env.state.tier();
        let push_ms = (env.tuning.frame_push_ms - PUSH_STEP_MS * (tier - 1) as f32).max(MIN_PUSH_MS);
        env.timers.cancel_kind(TimerKind::PeriodicSpawn);
        env.timers.arm_repeating(TimerKind::PeriodicSpawn, push_ms);
    }

    pub fn frames(&self) -> &[ObjectId] {
        &self.stack
    }

    pub fn on_intent(&mut self, intent: &IntentKind, env: &mut RuleEnv) -> bool {
        match *intent {
            IntentKind::ReturnFrame { id } => match id.or_else(|| stack_top(&self.stack)) {
                Some(target) => self.return_frame(target, env),
                None => env.out.no_hit += 1,
            },
            IntentKind::Pointer { pos } => match hit_test(env.registry, pos) {
                Some(target) => self.return_frame(target, env),
                None => env.out.no_hit += 1,
            },
            _ => return false,
        }
        true
    }

    fn return_frame(&mut self, target: ObjectId, env: &mut RuleEnv) {
        if stack_top(&self.stack) == Some(target) {
            match env.registry.resolve(target, Outcome::Correct) {
                Ok(()) => {
                    self.stack.pop();
                    if let Some(handle) = self.deadlines.remove(&target) {
                        env.timers.cancel(handle);
                    }
                }
                Err(err) => env.out.registry_error(err),
            }
            return;
        }

        if self.stack.contains(&target) {
            // Out of order: judged wrong but the frame stays on the stack
            let at = env.registry.get(target).map(|o| o.pos).unwrap_or_default();
            log::debug!("frame {target} returned out of order");
            env.out.event(ScoreEvent::Incorrect { cost: None }, Some(at));
            env.burst(Effect::Incorrect, at);
            env.cue(AudioCue::Error);
        } else if env.registry.get(target).is_some() {
            env.out.already_resolved += 1;
        } else {
            env.out.violation(format!("frame {target} not found in registry"));
        }
    }

    pub fn on_timer(&mut self, kind: TimerKind, env: &mut RuleEnv) {
        match kind {
            TimerKind::PeriodicSpawn => self.push_frame(env),
            TimerKind::Deadline(id) => self.deadline(id, env),
            _ => {}
        }
    }

    fn push_frame(&mut self, env: &mut RuleEnv) {
        if self.stack.len() >= self.capacity {
            log::info!("stack overflow at depth {}", self.stack.len());
            env.out.fail(Failure::Overflow);
            return;
        }
        let (signature, _tier) = env.generator.signature(env.state.level);
        let depth = self.stack.len();
        let id = env.registry.spawn(
            Payload::StackFrame {
                signature,
                depth: depth as u32,
            },
            frame_pos(depth),
            None,
            FRAME_HALF,
        );
        self.stack.push(id);
        let handle = env
            .timers
            .arm_once(TimerKind::Deadline(id), env.tuning.frame_deadline_ms);
        self.deadlines.insert(id, handle);
        env.cue(AudioCue::Place);
    }

    fn deadline(&mut self, id: ObjectId, env: &mut RuleEnv) {
        self.deadlines.remove(&id);
        let Some(idx) = self.stack.iter().position(|f| *f == id) else {
            return;
        };
        match env.registry.expire(id) {
            Ok(()) => {
                self.stack.remove(idx);
                self.relayout(env);
            }
            // Still spawning: give it until the next push
            Err(err) if err.is_benign() => {
                let handle = env.timers.arm_once(TimerKind::Deadline(id), 0.0);
                self.deadlines.insert(id, handle);
            }
            Err(err) => env.out.registry_error(err),
        }
    }

    /// Slide frames above a removed one down
    fn relayout(&mut self, env: &mut RuleEnv) {
        for (depth, id) in self.stack.iter().enumerate() {
            if let Some(obj) = env.registry.get_mut(*id) {
                obj.pos = frame_pos(depth);
                if let Payload::StackFrame { depth: d, .. } = &mut obj.payload {
                    *d = depth as u32;
                }
            }
        }
    }

    pub fn score_event(event: &RegistryEvent, state: &GameState) -> Option<ScoreEvent> {
        match event {
            RegistryEvent::Resolved {
                outcome: Outcome::Correct,
                payload: Payload::StackFrame { .. },
                ..
            } => Some(ScoreEvent::Correct {
                tier: state.tier(),
                bonus: 0,
            }),
            RegistryEvent::Missed {
                payload: Payload::StackFrame { .. },
                ..
            } => Some(ScoreEvent::Miss { cost: None }),
            _ => None,
        }
    }

    pub fn board_view(&self) -> BoardView {
        BoardView::Stack {
            frames: self.stack.clone(),
            capacity: self.capacity,
        }
    }
}
