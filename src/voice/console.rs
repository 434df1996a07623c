//! Console reference host
//!
//! Typed lines stand in for recognized utterances and replies are printed
//! instead of synthesized. Useful for development and for exercising the
//! session loop without audio hardware.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::task::JoinHandle;

use super::input::{InputEvent, InputEventSender, SpeechInput};
use super::output::{OutputEvent, OutputEventSender, SpeechOutput};
use crate::Result;

/// Reads utterances from stdin
///
/// A single background task owns stdin for the life of the adapter; `start`
/// and `stop` flip an activity flag that decides whether a typed line counts
/// as an utterance. Each accepted line is a complete transcript, so the
/// adapter reports `Ended` right after it, like a recognizer that stops
/// after one phrase.
pub struct ConsoleInput {
    events: InputEventSender,
    active: Arc<AtomicBool>,
    reader: JoinHandle<()>,
}

impl ConsoleInput {
    /// Spawn the stdin reader and return the adapter
    #[must_use]
    pub fn new(events: InputEventSender) -> Self {
        let active = Arc::new(AtomicBool::new(false));
        let reader = tokio::spawn(Self::read_lines(events.clone(), Arc::clone(&active)));

        Self {
            events,
            active,
            reader,
        }
    }

    async fn read_lines(events: InputEventSender, active: Arc<AtomicBool>) {
        let mut lines = BufReader::new(tokio::io::stdin()).lines();

        while let Ok(Some(line)) = lines.next_line().await {
            // Lines typed while capture is off are discarded, mirroring a
            // recognizer that is not listening.
            if !active.swap(false, Ordering::SeqCst) {
                continue;
            }

            if events.send(InputEvent::Transcript(line)).is_err() {
                break;
            }
            if events.send(InputEvent::Ended).is_err() {
                break;
            }
        }

        tracing::debug!("stdin reader finished");
    }
}

impl SpeechInput for ConsoleInput {
    fn start(&mut self) -> Result<()> {
        if !self.active.swap(true, Ordering::SeqCst) {
            let _ = self.events.send(InputEvent::Started);
        }
        Ok(())
    }

    fn stop(&mut self) {
        self.active.store(false, Ordering::SeqCst);
    }

    fn is_active(&self) -> bool {
        self.active.load(Ordering::SeqCst)
    }
}

impl Drop for ConsoleInput {
    fn drop(&mut self) {
        self.reader.abort();
    }
}

/// Prints replies and simulates utterance timing
///
/// Playback duration is estimated from word count so the session spends a
/// believable stretch in the Speaking state.
pub struct ConsoleOutput {
    events: OutputEventSender,
    speaking: Arc<AtomicBool>,
    utterance: Option<JoinHandle<()>>,
}

impl ConsoleOutput {
    /// Create the adapter
    #[must_use]
    pub fn new(events: OutputEventSender) -> Self {
        Self {
            events,
            speaking: Arc::new(AtomicBool::new(false)),
            utterance: None,
        }
    }

    fn estimated_duration(text: &str) -> Duration {
        let words = text.split_whitespace().count() as u64;
        Duration::from_millis(200 + words * 60)
    }
}

impl SpeechOutput for ConsoleOutput {
    fn speak(&mut self, text: &str) -> Result<()> {
        self.cancel();

        println!("vivica: {text}");

        let duration = Self::estimated_duration(text);
        let events = self.events.clone();
        let speaking = Arc::clone(&self.speaking);
        speaking.store(true, Ordering::SeqCst);

        self.utterance = Some(tokio::spawn(async move {
            let _ = events.send(OutputEvent::Started);
            tokio::time::sleep(duration).await;
            speaking.store(false, Ordering::SeqCst);
            let _ = events.send(OutputEvent::Ended);
        }));

        Ok(())
    }

    fn cancel(&mut self) {
        if let Some(utterance) = self.utterance.take() {
            utterance.abort();
        }
        self.speaking.store(false, Ordering::SeqCst);
    }

    fn is_speaking(&self) -> bool {
        self.speaking.load(Ordering::SeqCst)
    }
}

impl Drop for ConsoleOutput {
    fn drop(&mut self) {
        self.cancel();
    }
}

#[cfg(test)]
mod tests {
    use tokio::sync::mpsc;

    use super::*;

    #[tokio::test]
    async fn test_console_output_reports_lifecycle() {
        let (tx, mut rx) = mpsc::unbounded_channel();
        let mut output = ConsoleOutput::new(tx);

        output.speak("hello there").unwrap();
        assert!(output.is_speaking());

        assert_eq!(rx.recv().await, Some(OutputEvent::Started));
        assert_eq!(rx.recv().await, Some(OutputEvent::Ended));
        assert!(!output.is_speaking());
    }

    #[tokio::test]
    async fn test_console_output_cancel_suppresses_end() {
        let (tx, mut rx) = mpsc::unbounded_channel();
        let mut output = ConsoleOutput::new(tx);

        output
            .speak("a somewhat longer reply with many words to stretch the timer out")
            .unwrap();
        assert_eq!(rx.recv().await, Some(OutputEvent::Started));

        output.cancel();
        assert!(!output.is_speaking());

        // No further events after cancellation
        tokio::time::sleep(Duration::from_millis(50)).await;
        assert!(rx.try_recv().is_err());
    }

    #[tokio::test]
    async fn test_console_input_start_is_idempotent() {
        let (tx, mut rx) = mpsc::unbounded_channel();
        let mut input = ConsoleInput::new(tx);

        input.start().unwrap();
        input.start().unwrap();
        assert!(input.is_active());

        assert_eq!(rx.recv().await, Some(InputEvent::Started));
        assert!(rx.try_recv().is_err());

        input.stop();
        assert!(!input.is_active());
    }
}
