//! Session state machine
//!
//! The [`Controller`] is a pure transition table: it consumes
//! [`SessionEvent`]s and emits [`Effect`]s without touching the clock,
//! the network, or any audio device. The async driver owns those and
//! feeds outcomes back in as further events, which keeps every
//! transition unit-testable.
//!
//! States follow the interaction loop:
//!
//! ```text
//! Listening --transcript--> Processing --reply--> Speaking --done--> Listening
//!     ^                         |                     |
//!     |                       failure               failure
//!     +------recovery timer---- Error <---------------+
//! ```

use std::fmt;

use crate::error::Error;
use crate::visual::Mood;

/// Delay before the Error state auto-returns to Listening (ms)
pub const RECOVERY_DELAY_MS: u64 = 3000;

/// Delay before capture restarts after speech or settings close (ms)
pub const SETTLE_DELAY_MS: u64 = 500;

/// Delay before capture restarts after the recognizer ends on its own (ms)
///
/// Also used for the initial capture start at boot.
pub const RESTART_DELAY_MS: u64 = 1000;

/// Hold duration that turns a press into a settings toggle (ms)
pub const LONG_PRESS_MS: u64 = 800;

/// Top-level session state
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    /// Waiting for the user to speak
    Listening,
    /// A completion request is in flight
    Processing,
    /// The reply is being spoken
    Speaking,
    /// A failure occurred; recovers to Listening automatically
    Error,
}

impl fmt::Display for SessionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Listening => "listening",
            Self::Processing => "processing",
            Self::Speaking => "speaking",
            Self::Error => "error",
        };
        write!(f, "{name}")
    }
}

/// The timers the controller can request
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Timer {
    /// Error-state auto-recovery ([`RECOVERY_DELAY_MS`])
    Recovery,
    /// Capture restart after speaking or closing settings ([`SETTLE_DELAY_MS`])
    Settle,
    /// Capture restart after the recognizer ends ([`RESTART_DELAY_MS`])
    Restart,
    /// Press-and-hold detection ([`LONG_PRESS_MS`])
    LongPress,
}

/// Everything that can happen to a session
#[derive(Debug)]
pub enum SessionEvent {
    /// The recognizer started capturing
    RecognitionStarted,
    /// The recognizer produced a final transcript
    Transcript(String),
    /// The recognizer failed with a host error code
    RecognitionError(String),
    /// The recognizer stopped on its own
    RecognitionEnded,
    /// The completion call returned a reply
    CompletionReady(String),
    /// The completion call failed
    CompletionFailed(Error),
    /// Synthesis began producing audio
    SynthesisStarted,
    /// Synthesis finished the utterance
    SynthesisEnded,
    /// Synthesis failed with a host error code
    SynthesisError(String),
    /// The user pressed the orb
    PressStarted,
    /// The user released the orb
    PressReleased,
    /// The settings surface was toggled directly (keyboard, menu)
    SettingsToggled,
    /// A previously requested timer fired
    TimerElapsed(Timer),
}

/// Side effects the driver must perform after a transition
#[derive(Debug, Clone, PartialEq)]
pub enum Effect {
    /// Begin speech capture
    StartCapture,
    /// Stop speech capture
    StopCapture,
    /// Send the query to the completion API
    SubmitQuery(String),
    /// Abort the in-flight completion request
    AbortRequest,
    /// Speak the given text
    Speak(String),
    /// Cancel any in-progress speech
    CancelSpeech,
    /// Switch the orb mood
    SetMood(Mood),
    /// Pin the orb amplitude target
    SetAmplitude(f32),
    /// Update the status line
    SetStatus(String),
    /// Show the settings surface
    OpenSettingsSurface,
    /// Hide the settings surface
    CloseSettingsSurface,
    /// Arm a timer (rearming if already running)
    StartTimer(Timer),
    /// Disarm a timer if running
    CancelTimer(Timer),
}

/// Pure session transition table
#[derive(Debug)]
pub struct Controller {
    state: SessionState,
    settings_open: bool,
    has_credential: bool,
    pending_request: bool,
    press_active: bool,
    long_press_fired: bool,
}

impl Controller {
    /// Create a controller in the Listening state
    #[must_use]
    pub const fn new(has_credential: bool) -> Self {
        Self {
            state: SessionState::Listening,
            settings_open: false,
            has_credential,
            pending_request: false,
            press_active: false,
            long_press_fired: false,
        }
    }

    /// Current state
    #[must_use]
    pub const fn state(&self) -> SessionState {
        self.state
    }

    /// Whether the settings surface is open
    #[must_use]
    pub const fn settings_open(&self) -> bool {
        self.settings_open
    }

    /// Whether a completion request is in flight
    #[must_use]
    pub const fn pending_request(&self) -> bool {
        self.pending_request
    }

    /// Update the credential flag after a settings change
    pub fn set_credential(&mut self, has_credential: bool) {
        self.has_credential = has_credential;
    }

    /// Effects to perform at boot: paint the listening mood and schedule
    /// the first capture start
    #[must_use]
    pub fn startup(&self) -> Vec<Effect> {
        vec![
            Effect::SetMood(Mood::Listening),
            Effect::StartTimer(Timer::Restart),
        ]
    }

    /// Apply one event, mutating the state and returning the effects the
    /// driver must perform, in order
    pub fn apply(&mut self, event: SessionEvent) -> Vec<Effect> {
        tracing::debug!(state = %self.state, event = ?event, "session event");

        match event {
            SessionEvent::RecognitionStarted => self.on_recognition_started(),
            SessionEvent::Transcript(text) => self.on_transcript(text),
            SessionEvent::RecognitionError(code) => self.on_recognition_error(&code),
            SessionEvent::RecognitionEnded => self.on_recognition_ended(),
            SessionEvent::CompletionReady(reply) => self.on_completion_ready(reply),
            SessionEvent::CompletionFailed(error) => self.on_completion_failed(&error),
            SessionEvent::SynthesisStarted => self.on_synthesis_started(),
            SessionEvent::SynthesisEnded => self.on_synthesis_ended(),
            SessionEvent::SynthesisError(code) => self.on_synthesis_error(&code),
            SessionEvent::PressStarted => self.on_press_started(),
            SessionEvent::PressReleased => self.on_press_released(),
            SessionEvent::SettingsToggled => self.toggle_settings(),
            SessionEvent::TimerElapsed(timer) => self.on_timer(timer),
        }
    }

    fn on_recognition_started(&mut self) -> Vec<Effect> {
        if self.state == SessionState::Listening && !self.settings_open {
            vec![Effect::SetStatus("Listening…".to_string())]
        } else {
            Vec::new()
        }
    }

    fn on_transcript(&mut self, text: String) -> Vec<Effect> {
        // Transcripts arriving while processing, speaking, or configuring
        // are stale input and get dropped.
        if self.state != SessionState::Listening || self.settings_open {
            tracing::debug!(state = %self.state, "transcript dropped");
            return Vec::new();
        }

        let text = text.trim().to_string();
        if text.is_empty() {
            return vec![Effect::SetStatus(
                "Heard nothing. Please try again.".to_string(),
            )];
        }

        if !self.has_credential {
            self.settings_open = true;
            return vec![
                Effect::SetStatus("Missing API key. Opening settings…".to_string()),
                Effect::Speak(Error::MissingCredential.spoken_reply().to_string()),
                Effect::StopCapture,
                Effect::OpenSettingsSurface,
            ];
        }

        tracing::info!(query = %text, "transcript accepted");
        self.state = SessionState::Processing;
        self.pending_request = true;
        vec![
            Effect::SetStatus(format!("You: {text}")),
            Effect::StopCapture,
            Effect::CancelTimer(Timer::Restart),
            Effect::SetMood(Mood::Processing),
            Effect::SetStatus("Thinking…".to_string()),
            Effect::SubmitQuery(text),
        ]
    }

    fn on_recognition_error(&mut self, code: &str) -> Vec<Effect> {
        tracing::warn!(code = %code, "recognition error");
        self.enter_error(Some(format!("Speech recognition error: {code}")))
    }

    fn on_recognition_ended(&mut self) -> Vec<Effect> {
        // The recognizer gives up after a stretch of silence; restart it
        // unless something else has taken over in the meantime.
        if self.state == SessionState::Listening && !self.settings_open {
            vec![Effect::StartTimer(Timer::Restart)]
        } else {
            Vec::new()
        }
    }

    fn on_completion_ready(&mut self, reply: String) -> Vec<Effect> {
        if self.state != SessionState::Processing {
            tracing::debug!(state = %self.state, "completion reply dropped");
            return Vec::new();
        }

        tracing::info!(chars = reply.len(), "completion reply");
        self.pending_request = false;
        self.state = SessionState::Speaking;
        vec![
            Effect::SetStatus(format!("Vivica: {reply}")),
            Effect::SetMood(Mood::Speaking),
            Effect::Speak(reply),
        ]
    }

    fn on_completion_failed(&mut self, error: &Error) -> Vec<Effect> {
        if self.state != SessionState::Processing {
            tracing::debug!(state = %self.state, "completion failure dropped");
            return Vec::new();
        }

        tracing::warn!(error = %error, "completion failed");
        self.pending_request = false;
        let mut effects = self.enter_error(Some(format!("Error: {error}")));
        effects.push(Effect::Speak(error.spoken_reply().to_string()));
        effects
    }

    fn on_synthesis_started(&mut self) -> Vec<Effect> {
        if self.state == SessionState::Speaking {
            vec![Effect::SetAmplitude(0.6)]
        } else {
            Vec::new()
        }
    }

    fn on_synthesis_ended(&mut self) -> Vec<Effect> {
        if self.state != SessionState::Speaking {
            return Vec::new();
        }

        self.state = SessionState::Listening;
        vec![
            Effect::SetMood(Mood::Listening),
            Effect::StartTimer(Timer::Settle),
        ]
    }

    fn on_synthesis_error(&mut self, code: &str) -> Vec<Effect> {
        if self.state != SessionState::Speaking {
            return Vec::new();
        }

        tracing::warn!(code = %code, "synthesis error");
        self.enter_error(None)
    }

    fn on_press_started(&mut self) -> Vec<Effect> {
        self.press_active = true;
        self.long_press_fired = false;
        vec![Effect::StartTimer(Timer::LongPress)]
    }

    fn on_press_released(&mut self) -> Vec<Effect> {
        self.press_active = false;
        let mut effects = vec![Effect::CancelTimer(Timer::LongPress)];

        // A hold that already toggled settings swallows the tap.
        if self.long_press_fired {
            self.long_press_fired = false;
            return effects;
        }

        // A tap while speaking interrupts the reply.
        if !self.settings_open && self.state == SessionState::Speaking {
            self.state = SessionState::Listening;
            effects.push(Effect::CancelSpeech);
            effects.push(Effect::SetMood(Mood::Listening));
            effects.push(Effect::StartTimer(Timer::Settle));
        }
        effects
    }

    fn on_timer(&mut self, timer: Timer) -> Vec<Effect> {
        match timer {
            Timer::LongPress => {
                if self.press_active && !self.long_press_fired {
                    self.long_press_fired = true;
                    self.toggle_settings()
                } else {
                    Vec::new()
                }
            }
            Timer::Recovery => {
                if self.state != SessionState::Error {
                    return Vec::new();
                }
                self.state = SessionState::Listening;
                let mut effects = vec![Effect::SetMood(Mood::Listening)];
                if !self.settings_open {
                    effects.push(Effect::StartCapture);
                }
                effects
            }
            // Both restart paths funnel through the same guard so capture
            // never starts while processing, speaking, or configuring.
            Timer::Settle | Timer::Restart => {
                if self.state == SessionState::Listening && !self.settings_open {
                    vec![Effect::StartCapture]
                } else {
                    Vec::new()
                }
            }
        }
    }

    fn enter_error(&mut self, status: Option<String>) -> Vec<Effect> {
        self.state = SessionState::Error;
        let mut effects = Vec::new();

        if self.pending_request {
            self.pending_request = false;
            effects.push(Effect::AbortRequest);
        }
        if let Some(status) = status {
            effects.push(Effect::SetStatus(status));
        }
        effects.push(Effect::SetMood(Mood::Error));
        effects.push(Effect::CancelTimer(Timer::Settle));
        effects.push(Effect::CancelTimer(Timer::Restart));
        effects.push(Effect::StartTimer(Timer::Recovery));
        effects
    }

    fn toggle_settings(&mut self) -> Vec<Effect> {
        if self.settings_open {
            self.settings_open = false;
            let mut effects = vec![Effect::CloseSettingsSurface];

            // Processing and Speaking keep running under the closed surface;
            // otherwise resume listening.
            if self.state != SessionState::Processing && self.state != SessionState::Speaking {
                if self.state == SessionState::Error {
                    effects.push(Effect::CancelTimer(Timer::Recovery));
                }
                self.state = SessionState::Listening;
                effects.push(Effect::SetMood(Mood::Listening));
                effects.push(Effect::StartTimer(Timer::Settle));
            }
            effects
        } else {
            self.settings_open = true;
            vec![Effect::StopCapture, Effect::OpenSettingsSurface]
        }
    }
}
