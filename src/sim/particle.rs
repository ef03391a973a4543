//! Particle effects
//!
//! Purely observational: nothing in scoring or the state machine reads a
//! particle, so the whole system can be cleared at any time without changing
//! the outcome of a run. Particles draw from their own RNG stream for the
//! same reason.

use glam::Vec2;
use rand::{Rng, SeedableRng};
use rand_pcg::Pcg32;
use serde::{Deserialize, Serialize};

/// Slowest allowed decay so life always strictly decreases
const MIN_DECAY: f32 = 0.05;

/// Shape drawn for a particle
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum ParticleKind {
    Circle,
    /// Floating label such as "+120"
    Text(String),
}

/// A particle for visual effects
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Particle {
    pub pos: Vec2,
    pub vel: Vec2,
    /// 0-1, decreases every tick
    pub life: f32,
    /// Life lost per second
    pub decay: f32,
    pub gravity: Vec2,
    /// Velocity multiplier applied each tick
    pub friction: f32,
    pub color: u32,
    pub size: f32,
    pub kind: ParticleKind,
}

/// Direction range for a burst
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Cone {
    /// Center direction (radians, 0 = +x, y grows downward)
    pub direction: f32,
    /// Full opening angle (radians); TAU for a ring
    pub spread: f32,
    pub min_speed: f32,
    pub max_speed: f32,
}

impl Cone {
    /// Full circle burst
    pub fn ring(min_speed: f32, max_speed: f32) -> Self {
        Self {
            direction: 0.0,
            spread: std::f32::consts::TAU,
            min_speed,
            max_speed,
        }
    }

    /// Fountain opening upward
    pub fn up(spread: f32, min_speed: f32, max_speed: f32) -> Self {
        Self {
            direction: -std::f32::consts::FRAC_PI_2,
            spread,
            min_speed,
            max_speed,
        }
    }
}

/// Gameplay moments that trigger a burst
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Effect {
    Correct,
    Incorrect,
    Miss,
    Collision,
    LevelClear,
}

impl Effect {
    fn palette(self) -> &'static [u32] {
        match self {
            Effect::Correct => &[0x4ade80, 0x86efac, 0xfacc15],
            Effect::Incorrect => &[0xef4444, 0xf97316],
            Effect::Miss => &[0x64748b, 0x94a3b8],
            Effect::Collision => &[0xe2e8f0, 0x38bdf8],
            Effect::LevelClear => &[0xa855f7, 0x38bdf8, 0xfacc15, 0x4ade80],
        }
    }

    fn count(self) -> usize {
        match self {
            Effect::Correct => 16,
            Effect::Incorrect => 12,
            Effect::Miss => 8,
            Effect::Collision => 6,
            Effect::LevelClear => 64,
        }
    }

    fn cone(self) -> Cone {
        match self {
            Effect::Correct | Effect::LevelClear => Cone::ring(60.0, 220.0),
            Effect::Incorrect | Effect::Collision => Cone::ring(40.0, 140.0),
            Effect::Miss => Cone::up(1.2, 40.0, 100.0),
        }
    }
}

/// Owner of all live particles
#[derive(Debug, Clone)]
pub struct ParticleSystem {
    particles: Vec<Particle>,
    rng: Pcg32,
    max_particles: usize,
    burst_scale: f32,
    gravity: Vec2,
    friction: f32,
    last_integrated: Option<u64>,
}

impl ParticleSystem {
    pub fn new(seed: u64, max_particles: usize, burst_scale: f32) -> Self {
        Self {
            particles: Vec::with_capacity(max_particles),
            rng: Pcg32::seed_from_u64(seed ^ 0x9e37_79b9_7f4a_7c15),
            max_particles,
            burst_scale,
            gravity: Vec2::new(0.0, 240.0),
            friction: 0.98,
            last_integrated: None,
        }
    }

    /// Restart the stream for a new run
    pub fn reseed(&mut self, seed: u64) {
        self.rng = Pcg32::seed_from_u64(seed ^ 0x9e37_79b9_7f4a_7c15);
        self.clear();
    }

    pub fn clear(&mut self) {
        self.particles.clear();
        self.last_integrated = None;
    }

    /// Spawn `count` circles with random velocities inside `cone`
    ///
    /// Dead particles are purged first. Returns how many were spawned after
    /// the cap.
    pub fn spawn_burst(&mut self, origin: Vec2, count: usize, palette: &[u32], cone: Cone) -> usize {
        self.purge();
        let room = self.max_particles.saturating_sub(self.particles.len());
        let count = count.min(room);
        if palette.is_empty() {
            return 0;
        }

        for _ in 0..count {
            let offset = if cone.spread > 0.0 {
                self.rng.random_range(-0.5..0.5) * cone.spread
            } else {
                0.0
            };
            let angle = cone.direction + offset;
            let speed = if cone.max_speed > cone.min_speed {
                self.rng.random_range(cone.min_speed..cone.max_speed)
            } else {
                cone.min_speed
            };
            let color = palette[self.rng.random_range(0..palette.len())];
            let decay = self.rng.random_range(0.8..1.6);
            let size = self.rng.random_range(2.0..5.0);
            self.particles.push(Particle {
                pos: origin,
                vel: Vec2::new(angle.cos(), angle.sin()) * speed,
                life: 1.0,
                decay,
                gravity: self.gravity,
                friction: self.friction,
                color,
                size,
                kind: ParticleKind::Circle,
            });
        }
        count
    }

    /// Floating score label drifting upward without gravity
    pub fn spawn_text(&mut self, origin: Vec2, text: impl Into<String>, color: u32) -> bool {
        self.purge();
        if self.particles.len() >= self.max_particles {
            return false;
        }
        self.particles.push(Particle {
            pos: origin,
            vel: Vec2::new(0.0, -50.0),
            life: 1.0,
            decay: 0.8,
            gravity: Vec2::ZERO,
            friction: 1.0,
            color,
            size: 14.0,
            kind: ParticleKind::Text(text.into()),
        });
        true
    }

    /// Burst preset for a gameplay moment
    pub fn emit(&mut self, effect: Effect, origin: Vec2) -> usize {
        let count = (effect.count() as f32 * self.burst_scale).round() as usize;
        self.spawn_burst(origin, count, effect.palette(), effect.cone())
    }

    /// Advance every particle once for simulation tick `tick`
    ///
    /// A second call for the same tick is refused and returns false.
    pub fn integrate(&mut self, dt: f32, tick: u64) -> bool {
        if self.last_integrated == Some(tick) {
            log::warn!("particles already integrated for tick {tick}");
            return false;
        }
        self.last_integrated = Some(tick);

        for p in self.particles.iter_mut() {
            p.vel += p.gravity * dt;
            p.vel *= p.friction;
            p.pos += p.vel * dt;
            p.life -= p.decay.max(MIN_DECAY) * dt;
        }
        self.purge();
        true
    }

    fn purge(&mut self) {
        self.particles.retain(|p| p.life > 0.0);
    }

    pub fn iter(&self) -> impl Iterator<Item = &Particle> {
        self.particles.iter()
    }

    pub fn len(&self) -> usize {
        self.particles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.particles.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_burst_respects_cap() {
        let mut ps = ParticleSystem::new(1, 10, 1.0);
        let spawned = ps.spawn_burst(Vec2::ZERO, 25, &[0xffffff], Cone::ring(10.0, 20.0));
        assert_eq!(spawned, 10);
        assert_eq!(ps.len(), 10);
        assert!(ps.iter().all(|p| p.life == 1.0));
    }

    #[test]
    fn test_life_strictly_decreases_until_purged() {
        let mut ps = ParticleSystem::new(7, 64, 1.0);
        ps.emit(Effect::Correct, Vec2::new(100.0, 100.0));
        let mut tick = 0;
        while !ps.is_empty() {
            let before: Vec<f32> = ps.iter().map(|p| p.life).collect();
            tick += 1;
            assert!(ps.integrate(1.0 / 60.0, tick));
            assert!(ps.iter().all(|p| p.life > 0.0));
            // Survivors keep their order after retain
            let after: Vec<f32> = ps.iter().map(|p| p.life).collect();
            assert!(after.len() <= before.len());
            assert!(after.iter().all(|l| *l < 1.0));
            assert!(tick < 10_000);
        }
    }

    #[test]
    fn test_double_integrate_refused() {
        let mut ps = ParticleSystem::new(3, 64, 1.0);
        ps.emit(Effect::Miss, Vec2::ZERO);
        assert!(ps.integrate(0.016, 5));
        let lives: Vec<f32> = ps.iter().map(|p| p.life).collect();
        assert!(!ps.integrate(0.016, 5));
        let again: Vec<f32> = ps.iter().map(|p| p.life).collect();
        assert_eq!(lives, again);
    }

    #[test]
    fn test_physics_step() {
        let mut ps = ParticleSystem::new(3, 4, 1.0);
        ps.spawn_text(Vec2::new(0.0, 0.0), "+100", 0xffffff);
        ps.integrate(0.5, 1);
        let p = ps.iter().next().unwrap();
        assert!((p.pos.y - (-25.0)).abs() < 1e-4);
        assert!((p.life - 0.6).abs() < 1e-4);
    }

    #[test]
    fn test_disabled_system_spawns_nothing() {
        let mut ps = ParticleSystem::new(3, 0, 1.0);
        assert_eq!(ps.emit(Effect::LevelClear, Vec2::ZERO), 0);
        assert!(!ps.spawn_text(Vec2::ZERO, "x", 0));
    }
}
