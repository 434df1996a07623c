//! Speech capability seams
//!
//! The session core talks to speech recognition and synthesis through the
//! [`SpeechInput`] and [`SpeechOutput`] traits. Hosts plug in whatever
//! engines they have; the [`console`] adapters ship as a reference host that
//! reads utterances from stdin and prints replies.

pub mod console;

mod input;
mod output;

pub use input::{InputEvent, InputEventSender, SpeechInput};
pub use output::{OutputEvent, OutputEventSender, SpeechOutput};
