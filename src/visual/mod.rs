//! Orb visualization state
//!
//! Mood colors, per-tick amplitude/color interpolation, and the particle
//! field. Rendering itself is an external collaborator: the driver publishes
//! a [`FrameSnapshot`] and the host draws it however it likes.

mod animation;
mod mood;
mod particles;

pub use animation::{
    AmbientSimulation, AmplitudeSource, AnimationDriver, FrameSnapshot, VisualState,
    AMPLITUDE_STEP, COLOR_STEP,
};
pub use mood::{Mood, Rgb};
pub use particles::{Particle, ParticleField, MAX_PARTICLES};
