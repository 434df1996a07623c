//! Particle field around the orb
//!
//! Particles are spawned opportunistically while the orb is active and decay
//! over roughly a hundred ticks. The population is hard-capped to bound
//! memory; the oldest particles beyond the cap are dropped.

use std::f32::consts::TAU;

use rand::Rng;

/// Hard cap on the particle population
pub const MAX_PARTICLES: usize = 800;

/// Life lost per tick
const LIFE_DECAY: f32 = 0.01;

/// Velocity damping per tick
const DAMPING: f32 = 0.99;

/// A single glow particle
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Particle {
    /// Horizontal position
    pub x: f32,
    /// Vertical position
    pub y: f32,
    /// Horizontal velocity per tick
    pub vx: f32,
    /// Vertical velocity per tick
    pub vy: f32,
    /// Remaining life in [0, 1]
    pub life: f32,
    /// Render size hint
    pub size: f32,
}

impl Particle {
    fn spawn<R: Rng>(x: f32, y: f32, rng: &mut R) -> Self {
        Self {
            x,
            y,
            vx: (rng.gen::<f32>() - 0.5) * 2.0,
            vy: (rng.gen::<f32>() - 0.5) * 2.0,
            life: 1.0,
            size: rng.gen::<f32>() * 3.0 + 1.0,
        }
    }

    fn step(&mut self) {
        self.x += self.vx;
        self.y += self.vy;
        self.life -= LIFE_DECAY;
        self.vx *= DAMPING;
        self.vy *= DAMPING;
    }

    /// Whether the particle still has life left
    #[must_use]
    pub fn alive(&self) -> bool {
        self.life > 0.0
    }
}

/// Bounded collection of live particles
#[derive(Debug, Default)]
pub struct ParticleField {
    particles: Vec<Particle>,
}

impl ParticleField {
    /// Create an empty field
    #[must_use]
    pub const fn new() -> Self {
        Self {
            particles: Vec::new(),
        }
    }

    /// Spawn `count` particles on an annulus between 0.5 and 1.0 of `radius`
    /// around `(cx, cy)`, dropping the oldest particles beyond the cap
    pub fn spawn_ring<R: Rng>(&mut self, cx: f32, cy: f32, radius: f32, count: usize, rng: &mut R) {
        for _ in 0..count {
            let angle = rng.gen::<f32>() * TAU;
            let distance = radius * (0.5 + rng.gen::<f32>() * 0.5);
            let x = cx + angle.cos() * distance;
            let y = cy + angle.sin() * distance;
            self.particles.push(Particle::spawn(x, y, rng));
        }

        let excess = self.particles.len().saturating_sub(MAX_PARTICLES);
        if excess > 0 {
            self.particles.drain(..excess);
        }
    }

    /// Advance every particle one tick and remove the expired ones
    pub fn step(&mut self) {
        for particle in &mut self.particles {
            particle.step();
        }
        self.particles.retain(Particle::alive);
    }

    /// Current population
    #[must_use]
    pub fn len(&self) -> usize {
        self.particles.len()
    }

    /// Whether the field is empty
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.particles.is_empty()
    }

    /// Live particles, oldest first
    #[must_use]
    pub fn as_slice(&self) -> &[Particle] {
        &self.particles
    }
}
