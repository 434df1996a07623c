//! Per-tick animation driver for the orb
//!
//! One [`AnimationDriver::tick`] call advances the orb by one frame: the
//! amplitude eases toward a mood-dependent target, the color eases toward the
//! mood color, the pulse phase advances, and particles are spawned and aged.
//! Each tick corresponds to one frame at the nominal 60 fps cadence.

use rand::rngs::SmallRng;
use rand::{Rng, SeedableRng};

use super::mood::{Mood, Rgb};
use super::particles::{Particle, ParticleField};

/// Fraction of the remaining amplitude gap closed per tick
pub const AMPLITUDE_STEP: f32 = 0.15;

/// Fraction of the remaining color gap closed per tick
pub const COLOR_STEP: f32 = 0.05;

/// Pulse phase advance per tick while processing
const PULSE_FAST: f32 = 0.2;

/// Pulse phase advance per tick otherwise
const PULSE_SLOW: f32 = 0.05;

/// Oscillator rate for the speaking amplitude wave
const SPEAK_OSC_RATE: f32 = 0.16;

/// Oscillator rate for the processing amplitude wave
const PROCESS_OSC_RATE: f32 = 0.08;

/// Particles spawned per tick while processing
const SPAWN_PROCESSING: usize = 5;

/// Particles spawned per tick while the orb is otherwise active
const SPAWN_ACTIVE: usize = 2;

/// Amplitude above which the orb counts as active for particle spawn
const ACTIVE_AMPLITUDE: f32 = 0.1;

/// Source of the ambient amplitude target while listening
pub trait AmplitudeSource: Send {
    /// Sample the next ambient amplitude target in `[0, 1]`
    fn sample(&mut self) -> f32;
}

/// Simulated ambient microphone level
///
/// Stands in for real level metering: a uniform wander in `[0.2, 0.5]` that
/// keeps the orb gently alive while listening.
#[derive(Debug)]
pub struct AmbientSimulation {
    rng: SmallRng,
}

impl AmbientSimulation {
    /// Create a simulation seeded from entropy
    #[must_use]
    pub fn new() -> Self {
        Self {
            rng: SmallRng::from_entropy(),
        }
    }

    /// Create a deterministic simulation for tests
    #[must_use]
    pub fn with_seed(seed: u64) -> Self {
        Self {
            rng: SmallRng::seed_from_u64(seed),
        }
    }
}

impl Default for AmbientSimulation {
    fn default() -> Self {
        Self::new()
    }
}

impl AmplitudeSource for AmbientSimulation {
    fn sample(&mut self) -> f32 {
        0.2 + self.rng.gen::<f32>() * 0.3
    }
}

/// Smoothed orb parameters
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct VisualState {
    /// Current color
    pub color: Rgb,
    /// Color being eased toward
    pub target_color: Rgb,
    /// Current amplitude in `[0, 1]`
    pub amplitude: f32,
    /// Amplitude being eased toward
    pub target_amplitude: f32,
    /// Pulse phase in radians
    pub pulse: f32,
}

impl Default for VisualState {
    fn default() -> Self {
        Self {
            color: Mood::Listening.color(),
            target_color: Mood::Listening.color(),
            amplitude: 0.0,
            target_amplitude: 0.0,
            pulse: 0.0,
        }
    }
}

/// One rendered frame of the orb, published to the host each tick
#[derive(Debug, Clone, PartialEq)]
pub struct FrameSnapshot {
    /// Orb color
    pub color: Rgb,
    /// Orb amplitude in `[0, 1]`
    pub amplitude: f32,
    /// Pulse phase in radians
    pub pulse: f32,
    /// Orb radius in viewport units
    pub radius: f32,
    /// Viewport dimensions the radius was computed against
    pub viewport: (f32, f32),
    /// Live particles
    pub particles: Vec<Particle>,
}

impl Default for FrameSnapshot {
    fn default() -> Self {
        Self {
            color: Mood::Listening.color(),
            amplitude: 0.0,
            pulse: 0.0,
            radius: 0.0,
            viewport: (0.0, 0.0),
            particles: Vec::new(),
        }
    }
}

/// Drives the orb one frame at a time
pub struct AnimationDriver {
    visual: VisualState,
    particles: ParticleField,
    ambient: Box<dyn AmplitudeSource>,
    rng: SmallRng,
    mood: Mood,
    viewport: (f32, f32),
    oscillator: f32,
}

impl AnimationDriver {
    /// Create a driver with the ambient simulation attached
    #[must_use]
    pub fn new(viewport: (f32, f32)) -> Self {
        Self::with_ambient(viewport, Box::new(AmbientSimulation::new()))
    }

    /// Create a driver with a caller-supplied ambient source
    #[must_use]
    pub fn with_ambient(viewport: (f32, f32), ambient: Box<dyn AmplitudeSource>) -> Self {
        Self {
            visual: VisualState::default(),
            particles: ParticleField::new(),
            ambient,
            rng: SmallRng::from_entropy(),
            mood: Mood::Listening,
            viewport,
            oscillator: 0.0,
        }
    }

    /// Current mood
    #[must_use]
    pub const fn mood(&self) -> Mood {
        self.mood
    }

    /// Current smoothed parameters
    #[must_use]
    pub const fn visual(&self) -> &VisualState {
        &self.visual
    }

    /// Live particle count
    #[must_use]
    pub fn particle_count(&self) -> usize {
        self.particles.len()
    }

    /// Switch the orb to a new mood
    ///
    /// Retargets the color and, for moods that pin one, the amplitude. The
    /// eased values carry over so the orb glides rather than snaps.
    pub fn set_mood(&mut self, mood: Mood) {
        self.mood = mood;
        self.visual.target_color = mood.color();
        if let Some(amplitude) = mood.base_amplitude() {
            self.visual.target_amplitude = amplitude;
        }
    }

    /// Pin the amplitude target directly (e.g. the synthesis-start boost)
    pub fn set_target_amplitude(&mut self, amplitude: f32) {
        self.visual.target_amplitude = amplitude.clamp(0.0, 1.0);
    }

    /// Update the viewport dimensions the radius is computed against
    pub fn set_viewport(&mut self, width: f32, height: f32) {
        self.viewport = (width, height);
    }

    /// Advance the orb by one frame
    pub fn tick(&mut self) {
        self.oscillator += 1.0;

        match self.mood {
            Mood::Listening => {
                self.visual.target_amplitude = self.ambient.sample();
            }
            Mood::Speaking => {
                self.visual.target_amplitude =
                    0.4 + (self.oscillator * SPEAK_OSC_RATE).sin() * 0.2;
            }
            Mood::Processing => {
                self.visual.target_amplitude =
                    0.3 + (self.oscillator * PROCESS_OSC_RATE).sin() * 0.1;
            }
            Mood::Error => {
                self.visual.target_amplitude = 0.0;
            }
        }

        self.visual.amplitude +=
            (self.visual.target_amplitude - self.visual.amplitude) * AMPLITUDE_STEP;

        if self.visual.color != self.visual.target_color {
            self.visual.color = self.visual.color.lerp(self.visual.target_color, COLOR_STEP);
        }

        self.visual.pulse += if self.mood == Mood::Processing {
            PULSE_FAST
        } else {
            PULSE_SLOW
        };

        let spawn = if self.mood == Mood::Processing {
            SPAWN_PROCESSING
        } else if self.visual.amplitude > ACTIVE_AMPLITUDE {
            SPAWN_ACTIVE
        } else {
            0
        };
        if spawn > 0 {
            let (cx, cy) = (self.viewport.0 / 2.0, self.viewport.1 / 2.0);
            let radius = self.radius();
            self.particles.spawn_ring(cx, cy, radius, spawn, &mut self.rng);
        }

        self.particles.step();
    }

    /// Orb radius for the current amplitude and pulse phase
    #[must_use]
    pub fn radius(&self) -> f32 {
        let base = 0.15 * self.viewport.0.min(self.viewport.1);
        base * (1.0 + 2.0 * self.visual.amplitude) + self.visual.pulse.sin() * base * 0.2
    }

    /// Snapshot the current frame for publication
    #[must_use]
    pub fn snapshot(&self) -> FrameSnapshot {
        FrameSnapshot {
            color: self.visual.color,
            amplitude: self.visual.amplitude,
            pulse: self.visual.pulse,
            radius: self.radius(),
            viewport: self.viewport,
            particles: self.particles.as_slice().to_vec(),
        }
    }
}

impl std::fmt::Debug for AnimationDriver {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AnimationDriver")
            .field("mood", &self.mood)
            .field("visual", &self.visual)
            .field("particles", &self.particles.len())
            .field("viewport", &self.viewport)
            .finish_non_exhaustive()
    }
}
