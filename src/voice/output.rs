//! Speech synthesis seam

use tokio::sync::mpsc;

use crate::Result;

/// Events a synthesizer reports back to the session
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OutputEvent {
    /// Audio started playing
    Started,
    /// The utterance finished
    Ended,
    /// Synthesis failed; the payload is a host error code
    Error(String),
}

/// Channel a synthesizer reports its events on
pub type OutputEventSender = mpsc::UnboundedSender<OutputEvent>;

/// A speech synthesis capability
///
/// `speak` replaces any utterance in progress; `cancel` must be safe to call
/// when nothing is playing. A cancelled utterance reports no further events.
pub trait SpeechOutput: Send {
    /// Speak `text`, cancelling any utterance in progress first
    ///
    /// # Errors
    ///
    /// Returns error if synthesis cannot start
    fn speak(&mut self, text: &str) -> Result<()>;

    /// Stop the current utterance, if any
    fn cancel(&mut self);

    /// Whether an utterance is currently playing
    fn is_speaking(&self) -> bool;
}
