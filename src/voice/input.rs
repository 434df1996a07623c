//! Speech recognition seam

use tokio::sync::mpsc;

use crate::Result;

/// Events a recognizer reports back to the session
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InputEvent {
    /// Capture began
    Started,
    /// A final transcript was produced
    Transcript(String),
    /// The recognizer failed; the payload is a host error code
    Error(String),
    /// The recognizer stopped without a transcript
    Ended,
}

/// Channel a recognizer reports its events on
pub type InputEventSender = mpsc::UnboundedSender<InputEvent>;

/// A speech recognition capability
///
/// Implementations report lifecycle through the [`InputEventSender`] handed
/// to them at construction. `start` and `stop` must be idempotent: the
/// session restarts capture on timers and may stop an already stopped
/// recognizer.
pub trait SpeechInput: Send {
    /// Begin capturing; reports [`InputEvent::Started`] once listening
    ///
    /// # Errors
    ///
    /// Returns error if the capture device cannot be engaged
    fn start(&mut self) -> Result<()>;

    /// Stop capturing without reporting a transcript
    fn stop(&mut self);

    /// Whether the recognizer is currently capturing
    fn is_active(&self) -> bool;
}
