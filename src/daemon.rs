//! Async session driver
//!
//! The [`App`] owns the event loop: a single task that multiplexes speech
//! events, completion results, timers, and UI input over one channel, runs
//! them through the [`Controller`], and performs the resulting effects. The
//! orb advances on a fixed 16 ms frame interval and each frame is published
//! on a watch channel for the host to render.

use std::collections::HashMap;
use std::time::Duration;

use tokio::sync::{mpsc, watch};
use tokio::task::AbortHandle;
use tokio::time::MissedTickBehavior;

use crate::completion::CompletionClient;
use crate::config::{Settings, SettingsStore};
use crate::session::{
    Controller, Effect, SessionEvent, SessionState, Timer, LONG_PRESS_MS, RECOVERY_DELAY_MS,
    RESTART_DELAY_MS, SETTLE_DELAY_MS,
};
use crate::visual::{AnimationDriver, FrameSnapshot};
use crate::voice::{InputEvent, InputEventSender, OutputEvent, OutputEventSender};
use crate::voice::{SpeechInput, SpeechOutput};

/// Frame cadence, roughly 60 fps
const FRAME_INTERVAL: Duration = Duration::from_millis(16);

/// Concrete delays for the session timers
///
/// Defaults match the production behavior; tests shrink them.
#[derive(Debug, Clone, Copy)]
pub struct Timings {
    /// Error auto-recovery delay
    pub recovery: Duration,
    /// Capture restart after speaking or closing settings
    pub settle: Duration,
    /// Capture restart after the recognizer ends
    pub restart: Duration,
    /// Press-and-hold threshold
    pub long_press: Duration,
}

impl Default for Timings {
    fn default() -> Self {
        Self {
            recovery: Duration::from_millis(RECOVERY_DELAY_MS),
            settle: Duration::from_millis(SETTLE_DELAY_MS),
            restart: Duration::from_millis(RESTART_DELAY_MS),
            long_press: Duration::from_millis(LONG_PRESS_MS),
        }
    }
}

impl Timings {
    /// The delay for one timer kind
    #[must_use]
    pub const fn delay(&self, timer: Timer) -> Duration {
        match timer {
            Timer::Recovery => self.recovery,
            Timer::Settle => self.settle,
            Timer::Restart => self.restart,
            Timer::LongPress => self.long_press,
        }
    }
}

/// UI input forwarded into the event loop
#[derive(Debug)]
enum UiEvent {
    PressStarted,
    PressReleased,
    SettingsToggled,
    SettingsUpdated(Settings),
    Resized(f32, f32),
}

/// Everything multiplexed onto the single event channel
///
/// Completion results carry the generation of the request that produced
/// them; a result from a superseded request is discarded on arrival.
#[derive(Debug)]
enum AppEvent {
    Input(InputEvent),
    Output(OutputEvent),
    Completion(u64, crate::Result<String>),
    Timer(Timer),
    Ui(UiEvent),
    Shutdown,
}

/// Handle for feeding UI input into a running [`App`] and observing it
#[derive(Debug, Clone)]
pub struct AppHandle {
    events: mpsc::UnboundedSender<AppEvent>,
    frames: watch::Receiver<FrameSnapshot>,
    status: watch::Receiver<String>,
    state: watch::Receiver<SessionState>,
    surface: watch::Receiver<bool>,
}

impl AppHandle {
    /// The orb was pressed
    pub fn press_started(&self) {
        let _ = self.events.send(AppEvent::Ui(UiEvent::PressStarted));
    }

    /// The orb was released
    pub fn press_released(&self) {
        let _ = self.events.send(AppEvent::Ui(UiEvent::PressReleased));
    }

    /// Toggle the settings surface directly
    pub fn toggle_settings(&self) {
        let _ = self.events.send(AppEvent::Ui(UiEvent::SettingsToggled));
    }

    /// Replace the live settings (persisted when the surface closes)
    pub fn update_settings(&self, settings: Settings) {
        let _ = self
            .events
            .send(AppEvent::Ui(UiEvent::SettingsUpdated(settings)));
    }

    /// The render viewport changed size
    pub fn resize(&self, width: f32, height: f32) {
        let _ = self.events.send(AppEvent::Ui(UiEvent::Resized(width, height)));
    }

    /// Stop the event loop
    pub fn shutdown(&self) {
        let _ = self.events.send(AppEvent::Shutdown);
    }

    /// Frames for rendering, updated every 16 ms
    #[must_use]
    pub fn frames(&self) -> watch::Receiver<FrameSnapshot> {
        self.frames.clone()
    }

    /// The status line
    #[must_use]
    pub fn status(&self) -> watch::Receiver<String> {
        self.status.clone()
    }

    /// The session state
    #[must_use]
    pub fn state(&self) -> watch::Receiver<SessionState> {
        self.state.clone()
    }

    /// Whether the settings surface is showing
    #[must_use]
    pub fn settings_surface(&self) -> watch::Receiver<bool> {
        self.surface.clone()
    }
}

/// Armed timers, keyed by kind
///
/// Rearming a timer cancels the previous instance, so a stale deadline can
/// never fire after the controller re-requested it.
#[derive(Debug, Default)]
struct TimerSet {
    armed: HashMap<Timer, AbortHandle>,
}

impl TimerSet {
    fn start(&mut self, timer: Timer, delay: Duration, events: mpsc::UnboundedSender<AppEvent>) {
        self.cancel(timer);

        let handle = tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            let _ = events.send(AppEvent::Timer(timer));
        });
        self.armed.insert(timer, handle.abort_handle());
    }

    fn cancel(&mut self, timer: Timer) {
        if let Some(handle) = self.armed.remove(&timer) {
            handle.abort();
        }
    }
}

/// The in-flight completion request
#[derive(Debug)]
struct PendingRequest {
    generation: u64,
    abort: AbortHandle,
}

/// The session daemon
pub struct App {
    controller: Controller,
    driver: AnimationDriver,
    input: Box<dyn SpeechInput>,
    output: Box<dyn SpeechOutput>,
    client: CompletionClient,
    settings: Settings,
    store: Option<SettingsStore>,
    timings: Timings,
    timers: TimerSet,
    pending: Option<PendingRequest>,
    generation: u64,
    events_tx: mpsc::UnboundedSender<AppEvent>,
    events_rx: mpsc::UnboundedReceiver<AppEvent>,
    frames_tx: watch::Sender<FrameSnapshot>,
    status_tx: watch::Sender<String>,
    state_tx: watch::Sender<SessionState>,
    surface_tx: watch::Sender<bool>,
}

impl App {
    /// Build the daemon and its handle
    ///
    /// The speech adapters are built from the factories so they can report
    /// events on the loop's channel. Must be called within a Tokio runtime;
    /// adapter construction may spawn tasks.
    #[must_use]
    pub fn new(
        settings: Settings,
        store: Option<SettingsStore>,
        client: CompletionClient,
        timings: Timings,
        make_input: impl FnOnce(InputEventSender) -> Box<dyn SpeechInput>,
        make_output: impl FnOnce(OutputEventSender) -> Box<dyn SpeechOutput>,
    ) -> (Self, AppHandle) {
        let (events_tx, events_rx) = mpsc::unbounded_channel();
        let (frames_tx, frames_rx) = watch::channel(FrameSnapshot::default());
        let (status_tx, status_rx) = watch::channel(String::new());
        let (state_tx, state_rx) = watch::channel(SessionState::Listening);
        let (surface_tx, surface_rx) = watch::channel(false);

        let (input_tx, mut input_rx) = mpsc::unbounded_channel();
        let (output_tx, mut output_rx) = mpsc::unbounded_channel();
        let input = make_input(input_tx);
        let output = make_output(output_tx);

        // Forward adapter events onto the single loop channel.
        let forward = events_tx.clone();
        tokio::spawn(async move {
            while let Some(event) = input_rx.recv().await {
                if forward.send(AppEvent::Input(event)).is_err() {
                    break;
                }
            }
        });
        let forward = events_tx.clone();
        tokio::spawn(async move {
            while let Some(event) = output_rx.recv().await {
                if forward.send(AppEvent::Output(event)).is_err() {
                    break;
                }
            }
        });

        let handle = AppHandle {
            events: events_tx.clone(),
            frames: frames_rx,
            status: status_rx,
            state: state_rx,
            surface: surface_rx,
        };

        let app = Self {
            controller: Controller::new(settings.has_credential()),
            driver: AnimationDriver::new((800.0, 600.0)),
            input,
            output,
            client,
            settings,
            store,
            timings,
            timers: TimerSet::default(),
            pending: None,
            generation: 0,
            events_tx,
            events_rx,
            frames_tx,
            status_tx,
            state_tx,
            surface_tx,
        };
        (app, handle)
    }

    /// Run the event loop until shutdown
    pub async fn run(mut self) {
        tracing::info!("session started");

        for effect in self.controller.startup() {
            self.perform(effect);
        }

        let mut frames = tokio::time::interval(FRAME_INTERVAL);
        frames.set_missed_tick_behavior(MissedTickBehavior::Skip);

        loop {
            tokio::select! {
                event = self.events_rx.recv() => {
                    match event {
                        None | Some(AppEvent::Shutdown) => break,
                        Some(event) => self.dispatch(event),
                    }
                }
                _ = frames.tick() => {
                    self.driver.tick();
                    let _ = self.frames_tx.send(self.driver.snapshot());
                }
            }
        }

        tracing::info!("session stopped");
    }

    fn dispatch(&mut self, event: AppEvent) {
        let session_event = match event {
            AppEvent::Input(event) => match event {
                InputEvent::Started => SessionEvent::RecognitionStarted,
                InputEvent::Transcript(text) => SessionEvent::Transcript(text),
                InputEvent::Error(code) => SessionEvent::RecognitionError(code),
                InputEvent::Ended => SessionEvent::RecognitionEnded,
            },
            AppEvent::Output(event) => match event {
                OutputEvent::Started => SessionEvent::SynthesisStarted,
                OutputEvent::Ended => SessionEvent::SynthesisEnded,
                OutputEvent::Error(code) => SessionEvent::SynthesisError(code),
            },
            AppEvent::Completion(generation, result) => {
                if self
                    .pending
                    .as_ref()
                    .is_some_and(|pending| pending.generation == generation)
                {
                    self.pending = None;
                    match result {
                        Ok(reply) => SessionEvent::CompletionReady(reply),
                        Err(error) => SessionEvent::CompletionFailed(error),
                    }
                } else {
                    tracing::debug!(generation, "stale completion result discarded");
                    return;
                }
            }
            AppEvent::Timer(timer) => SessionEvent::TimerElapsed(timer),
            AppEvent::Ui(event) => match event {
                UiEvent::PressStarted => SessionEvent::PressStarted,
                UiEvent::PressReleased => SessionEvent::PressReleased,
                UiEvent::SettingsToggled => SessionEvent::SettingsToggled,
                UiEvent::SettingsUpdated(settings) => {
                    self.controller.set_credential(settings.has_credential());
                    self.settings = settings;
                    return;
                }
                UiEvent::Resized(width, height) => {
                    self.driver.set_viewport(width, height);
                    return;
                }
            },
            AppEvent::Shutdown => return,
        };

        for effect in self.controller.apply(session_event) {
            self.perform(effect);
        }
        let _ = self.state_tx.send(self.controller.state());
    }

    fn perform(&mut self, effect: Effect) {
        match effect {
            Effect::StartCapture => {
                if let Err(error) = self.input.start() {
                    tracing::warn!(error = %error, "capture failed to start");
                }
            }
            Effect::StopCapture => self.input.stop(),
            Effect::SubmitQuery(query) => self.submit_query(query),
            Effect::AbortRequest => {
                if let Some(pending) = self.pending.take() {
                    pending.abort.abort();
                    tracing::debug!(generation = pending.generation, "in-flight request aborted");
                }
            }
            Effect::Speak(text) => {
                if self.output.is_speaking() {
                    self.output.cancel();
                }
                if let Err(error) = self.output.speak(&text) {
                    tracing::warn!(error = %error, "synthesis failed to start");
                }
            }
            Effect::CancelSpeech => self.output.cancel(),
            Effect::SetMood(mood) => self.driver.set_mood(mood),
            Effect::SetAmplitude(amplitude) => self.driver.set_target_amplitude(amplitude),
            Effect::SetStatus(status) => {
                let _ = self.status_tx.send(status);
            }
            Effect::OpenSettingsSurface => {
                let _ = self.surface_tx.send(true);
            }
            Effect::CloseSettingsSurface => {
                self.save_settings();
                let _ = self.surface_tx.send(false);
            }
            Effect::StartTimer(timer) => {
                self.timers
                    .start(timer, self.timings.delay(timer), self.events_tx.clone());
            }
            Effect::CancelTimer(timer) => self.timers.cancel(timer),
        }
    }

    fn submit_query(&mut self, query: String) {
        if self.pending.is_some() {
            tracing::warn!("query dropped: request already in flight");
            return;
        }

        self.generation += 1;
        let generation = self.generation;

        let client = self.client.clone();
        let settings = self.settings.clone();
        let events = self.events_tx.clone();
        let task = tokio::spawn(async move {
            let result = client.submit(&query, &settings).await;
            let _ = events.send(AppEvent::Completion(generation, result));
        });
        self.pending = Some(PendingRequest {
            generation,
            abort: task.abort_handle(),
        });
    }

    fn save_settings(&self) {
        if let Some(store) = &self.store {
            if let Err(error) = store.save(&self.settings) {
                tracing::warn!(error = %error, "failed to persist settings");
            }
        }
    }
}

impl std::fmt::Debug for App {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("App")
            .field("state", &self.controller.state())
            .field("settings_open", &self.controller.settings_open())
            .field("pending", &self.pending.is_some())
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct NullInput;

    impl SpeechInput for NullInput {
        fn start(&mut self) -> crate::Result<()> {
            Ok(())
        }

        fn stop(&mut self) {}

        fn is_active(&self) -> bool {
            false
        }
    }

    struct NullOutput;

    impl SpeechOutput for NullOutput {
        fn speak(&mut self, _text: &str) -> crate::Result<()> {
            Ok(())
        }

        fn cancel(&mut self) {}

        fn is_speaking(&self) -> bool {
            false
        }
    }

    fn test_app() -> (App, AppHandle) {
        let settings = Settings {
            api_key: "sk-test".to_string(),
            ..Settings::default()
        };
        // Unroutable endpoint: requests spawned here never produce events
        // the tests care about; completions are injected by hand.
        let client = CompletionClient::with_endpoint(
            "http://127.0.0.1:1/".to_string(),
            Duration::from_millis(100),
        );

        App::new(
            settings,
            None,
            client,
            Timings::default(),
            |_events| Box::new(NullInput),
            |_events| Box::new(NullOutput),
        )
    }

    fn generation_of(app: &App) -> u64 {
        app.pending
            .as_ref()
            .map(|pending| pending.generation)
            .expect("no request pending")
    }

    #[tokio::test]
    async fn test_stale_completion_result_discarded() {
        let (mut app, _handle) = test_app();

        app.dispatch(AppEvent::Input(InputEvent::Transcript("hi".to_string())));
        assert_eq!(app.controller.state(), SessionState::Processing);
        let current = generation_of(&app);

        // A result from an earlier request must neither reach the controller
        // nor clear the bookkeeping for the one in flight.
        app.dispatch(AppEvent::Completion(current - 1, Ok("stale".to_string())));
        assert!(app.pending.is_some());
        assert_eq!(app.controller.state(), SessionState::Processing);

        app.dispatch(AppEvent::Completion(current, Ok("fresh".to_string())));
        assert!(app.pending.is_none());
        assert_eq!(app.controller.state(), SessionState::Speaking);
    }

    #[tokio::test]
    async fn test_late_result_after_abort_keeps_newer_request() {
        let (mut app, _handle) = test_app();

        app.dispatch(AppEvent::Input(InputEvent::Transcript("first".to_string())));
        let first = generation_of(&app);

        // Recognition error aborts the request on the way into Error.
        app.dispatch(AppEvent::Input(InputEvent::Error("network".to_string())));
        assert!(app.pending.is_none());

        app.dispatch(AppEvent::Timer(Timer::Recovery));
        app.dispatch(AppEvent::Input(InputEvent::Transcript("second".to_string())));
        let second = generation_of(&app);
        assert!(second > first);

        // The first request slipped its result into the queue before the
        // abort landed; it must not disturb the second request.
        app.dispatch(AppEvent::Completion(first, Ok("late".to_string())));
        assert!(app.pending.is_some());
        assert_eq!(generation_of(&app), second);
        assert_eq!(app.controller.state(), SessionState::Processing);
    }
}
