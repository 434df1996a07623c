//! Shared test utilities
//!
//! Scripted speech adapters, a harness around the running daemon, and a
//! local mock completion server.

use std::net::SocketAddr;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use axum::extract::State;
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::routing::post;
use axum::{Json, Router};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

use vivica::voice::{InputEvent, InputEventSender, OutputEvent, OutputEventSender};
use vivica::voice::{SpeechInput, SpeechOutput};
use vivica::{App, AppHandle, CompletionClient, SessionState, Settings, Timings};

/// Timer delays shrunk for tests
#[must_use]
pub fn test_timings() -> Timings {
    Timings {
        recovery: Duration::from_millis(50),
        settle: Duration::from_millis(20),
        restart: Duration::from_millis(20),
        long_press: Duration::from_millis(40),
    }
}

/// Speech input whose transcripts the test injects by hand
pub struct ScriptedInput {
    events: InputEventSender,
    active: Arc<AtomicBool>,
    starts: Arc<AtomicUsize>,
}

impl ScriptedInput {
    pub fn new(events: InputEventSender, active: Arc<AtomicBool>, starts: Arc<AtomicUsize>) -> Self {
        Self {
            events,
            active,
            starts,
        }
    }
}

impl SpeechInput for ScriptedInput {
    fn start(&mut self) -> vivica::Result<()> {
        if !self.active.swap(true, Ordering::SeqCst) {
            self.starts.fetch_add(1, Ordering::SeqCst);
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

/// Speech output that records utterances instead of playing them
///
/// Utterances stay "playing" until the test ends them via the output event
/// channel, so tests control how long the session stays in Speaking.
pub struct ScriptedOutput {
    events: OutputEventSender,
    speaking: Arc<AtomicBool>,
    spoken: Arc<Mutex<Vec<String>>>,
    cancels: Arc<AtomicUsize>,
}

impl ScriptedOutput {
    pub fn new(
        events: OutputEventSender,
        speaking: Arc<AtomicBool>,
        spoken: Arc<Mutex<Vec<String>>>,
        cancels: Arc<AtomicUsize>,
    ) -> Self {
        Self {
            events,
            speaking,
            spoken,
            cancels,
        }
    }
}

impl SpeechOutput for ScriptedOutput {
    fn speak(&mut self, text: &str) -> vivica::Result<()> {
        self.spoken
            .lock()
            .expect("spoken log poisoned")
            .push(text.to_string());
        self.speaking.store(true, Ordering::SeqCst);
        let _ = self.events.send(OutputEvent::Started);
        Ok(())
    }

    fn cancel(&mut self) {
        if self.speaking.swap(false, Ordering::SeqCst) {
            self.cancels.fetch_add(1, Ordering::SeqCst);
        }
    }

    fn is_speaking(&self) -> bool {
        self.speaking.load(Ordering::SeqCst)
    }
}

/// A running daemon wired to scripted adapters
pub struct Harness {
    pub handle: AppHandle,
    pub input_events: InputEventSender,
    pub output_events: OutputEventSender,
    pub capture_active: Arc<AtomicBool>,
    pub capture_starts: Arc<AtomicUsize>,
    pub speaking: Arc<AtomicBool>,
    pub spoken: Arc<Mutex<Vec<String>>>,
    pub cancels: Arc<AtomicUsize>,
    app: JoinHandle<()>,
}

impl Harness {
    /// Spawn a daemon against `endpoint` with the given API key
    pub fn spawn(endpoint: &str, api_key: &str) -> Self {
        let settings = Settings {
            api_key: api_key.to_string(),
            ..Settings::default()
        };
        let client =
            CompletionClient::with_endpoint(endpoint.to_string(), Duration::from_secs(2));

        let capture_active = Arc::new(AtomicBool::new(false));
        let capture_starts = Arc::new(AtomicUsize::new(0));
        let speaking = Arc::new(AtomicBool::new(false));
        let spoken = Arc::new(Mutex::new(Vec::new()));
        let cancels = Arc::new(AtomicUsize::new(0));

        // The daemon's own adapter channels are wrapped so tests can inject
        // recognizer/synthesizer events directly.
        let (input_probe_tx, input_probe_rx) = mpsc::unbounded_channel::<InputEventSender>();
        let (output_probe_tx, output_probe_rx) = mpsc::unbounded_channel::<OutputEventSender>();

        let active = Arc::clone(&capture_active);
        let starts = Arc::clone(&capture_starts);
        let speak_flag = Arc::clone(&speaking);
        let spoken_log = Arc::clone(&spoken);
        let cancel_count = Arc::clone(&cancels);

        let (app, handle) = App::new(
            settings,
            None,
            client,
            test_timings(),
            move |events| {
                let _ = input_probe_tx.send(events.clone());
                Box::new(ScriptedInput::new(events, active, starts))
            },
            move |events| {
                let _ = output_probe_tx.send(events.clone());
                Box::new(ScriptedOutput::new(events, speak_flag, spoken_log, cancel_count))
            },
        );

        let app = tokio::spawn(app.run());

        let mut input_probe_rx = input_probe_rx;
        let mut output_probe_rx = output_probe_rx;
        let input_events = input_probe_rx
            .try_recv()
            .expect("input adapter not constructed");
        let output_events = output_probe_rx
            .try_recv()
            .expect("output adapter not constructed");

        Self {
            handle,
            input_events,
            output_events,
            capture_active,
            capture_starts,
            speaking,
            spoken,
            cancels,
            app,
        }
    }

    /// Inject one recognized utterance
    pub fn hear(&self, text: &str) {
        let _ = self
            .input_events
            .send(InputEvent::Transcript(text.to_string()));
        let _ = self.input_events.send(InputEvent::Ended);
    }

    /// Finish the utterance currently being spoken
    pub fn finish_utterance(&self) {
        self.speaking.store(false, Ordering::SeqCst);
        let _ = self.output_events.send(OutputEvent::Ended);
    }

    /// Everything spoken so far
    pub fn spoken(&self) -> Vec<String> {
        self.spoken.lock().expect("spoken log poisoned").clone()
    }

    /// Stop the daemon
    pub fn shutdown(self) {
        self.handle.shutdown();
        self.app.abort();
    }
}

/// Wait until the session reaches `expected`, panicking after `timeout`
pub async fn wait_for_state(handle: &AppHandle, expected: SessionState, timeout: Duration) {
    let mut state = handle.state();
    let deadline = tokio::time::Instant::now() + timeout;

    loop {
        if *state.borrow_and_update() == expected {
            return;
        }
        let remaining = deadline
            .checked_duration_since(tokio::time::Instant::now())
            .unwrap_or_else(|| panic!("timed out waiting for state {expected}"));
        if tokio::time::timeout(remaining, state.changed()).await.is_err() {
            panic!("timed out waiting for state {expected}");
        }
    }
}

/// Mock completion server behavior
#[derive(Debug, Clone)]
pub enum MockBehavior {
    /// Return a well-formed reply
    Reply(String),
    /// Return the given HTTP status with an empty body
    Status(u16),
    /// Hold the request open longer than the client deadline
    Stall(Duration),
    /// Return 200 with a null message content
    NoContent,
}

#[derive(Clone)]
struct MockState {
    behavior: MockBehavior,
    hits: Arc<AtomicUsize>,
}

async fn completions(State(state): State<MockState>) -> axum::response::Response {
    state.hits.fetch_add(1, Ordering::SeqCst);

    match state.behavior {
        MockBehavior::Reply(text) => Json(serde_json::json!({
            "choices": [{"message": {"role": "assistant", "content": text}}]
        }))
        .into_response(),
        MockBehavior::Status(code) => StatusCode::from_u16(code)
            .expect("invalid mock status")
            .into_response(),
        MockBehavior::Stall(duration) => {
            tokio::time::sleep(duration).await;
            Json(serde_json::json!({
                "choices": [{"message": {"role": "assistant", "content": "late"}}]
            }))
            .into_response()
        }
        MockBehavior::NoContent => Json(serde_json::json!({
            "choices": [{"message": {"role": "assistant", "content": null}}]
        }))
        .into_response(),
    }
}

/// Spawn a local mock completion server; returns its URL and a hit counter
pub async fn spawn_completion_server(behavior: MockBehavior) -> (String, Arc<AtomicUsize>) {
    let hits = Arc::new(AtomicUsize::new(0));
    let state = MockState {
        behavior,
        hits: Arc::clone(&hits),
    };

    let router = Router::new()
        .route("/v1/chat/completions", post(completions))
        .with_state(state);

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
        .await
        .expect("failed to bind mock server");
    let addr: SocketAddr = listener.local_addr().expect("mock server has no addr");

    tokio::spawn(async move {
        let _ = axum::serve(listener, router).await;
    });

    (format!("http://{addr}/v1/chat/completions"), hits)
}
