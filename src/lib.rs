//! Vivica - voice assistant session core with an animated orb visualization
//!
//! This library provides the coordination layer of a voice assistant
//! front-end:
//! - Session state machine (Listening / Processing / Speaking / Error)
//! - Orb visualization state (mood color, amplitude, particles)
//! - Speech input/output capability seams
//! - Remote chat-completion client
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────┐
//! │                   Host surfaces                      │
//! │   Recognition  │  Synthesis  │  Renderer  │  UI     │
//! └────────────────────┬────────────────────────────────┘
//!                      │ events / snapshots
//! ┌────────────────────▼────────────────────────────────┐
//! │                 Session daemon                       │
//! │   Controller  │  Animation  │  Timers  │  Settings  │
//! └────────────────────┬────────────────────────────────┘
//!                      │ one HTTP call per query
//! ┌────────────────────▼────────────────────────────────┐
//! │             Chat completion API                      │
//! └─────────────────────────────────────────────────────┘
//! ```
//!
//! Speech recognition, speech synthesis, and canvas drawing are external
//! collaborators: the crate consumes their events and publishes frame
//! snapshots, but never touches audio or pixels itself.

pub mod completion;
pub mod config;
pub mod daemon;
pub mod error;
pub mod session;
pub mod visual;
pub mod voice;

pub use completion::CompletionClient;
pub use config::{Settings, SettingsStore};
pub use daemon::{App, AppHandle, Timings};
pub use error::{Error, Result};
pub use session::{Controller, Effect, SessionEvent, SessionState, Timer};
pub use visual::{
    AmbientSimulation, AmplitudeSource, AnimationDriver, FrameSnapshot, Mood, Particle,
    ParticleField, Rgb, VisualState,
};
pub use voice::{InputEvent, OutputEvent, SpeechInput, SpeechOutput};
