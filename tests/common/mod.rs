//! Shared test doubles and wiring for session controller tests

use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::mpsc;

use voxcall::recognizer::{Recognizer, RecognizerEvent};
use voxcall::responder::{ChatFailure, Responder};
use voxcall::session::{SessionController, SessionHandle};
use voxcall::speech::Speaker;
use voxcall::{Config, Error, Result};

/// Chat outcome a scripted responder will produce
pub type Outcome = std::result::Result<String, ChatFailure>;

/// Recognizer double that only counts lifecycle calls
pub struct MockRecognizer {
    starts: Arc<AtomicUsize>,
    stops: Arc<AtomicUsize>,
    fail_start: bool,
}

impl Recognizer for MockRecognizer {
    fn start(&mut self) -> Result<()> {
        self.starts.fetch_add(1, Ordering::SeqCst);
        if self.fail_start {
            return Err(Error::Capability("no recognition backend".to_string()));
        }
        Ok(())
    }

    fn stop(&mut self) {
        self.stops.fetch_add(1, Ordering::SeqCst);
    }
}

/// Responder double that records requests and replays scripted outcomes
pub struct ScriptedResponder {
    outcomes: Mutex<VecDeque<Outcome>>,
    calls: Mutex<Vec<String>>,
    delay: Duration,
}

impl ScriptedResponder {
    pub fn new(outcomes: Vec<Outcome>) -> Self {
        Self {
            outcomes: Mutex::new(outcomes.into()),
            calls: Mutex::new(Vec::new()),
            delay: Duration::ZERO,
        }
    }

    /// Simulate a slow chat round-trip
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    /// Messages sent so far, in order
    pub fn call_log(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }
}

#[async_trait]
impl Responder for ScriptedResponder {
    async fn send(&self, message: &str) -> Outcome {
        self.calls.lock().unwrap().push(message.to_string());

        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }

        let next = self.outcomes.lock().unwrap().pop_front();
        next.unwrap_or_else(|| Ok(format!("reply to {message}")))
    }
}

/// Speaker double that records spoken text
#[derive(Default)]
pub struct RecordingSpeaker {
    spoken: Mutex<Vec<String>>,
}

impl RecordingSpeaker {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn spoken(&self) -> Vec<String> {
        self.spoken.lock().unwrap().clone()
    }
}

#[async_trait]
impl Speaker for RecordingSpeaker {
    async fn speak(&self, text: &str) -> Result<()> {
        self.spoken.lock().unwrap().push(text.to_string());
        Ok(())
    }
}

/// A controller wired to test doubles, running in the background
pub struct Harness {
    pub handle: SessionHandle,
    pub events: mpsc::Sender<RecognizerEvent>,
    pub responder: Arc<ScriptedResponder>,
    pub speaker: Arc<RecordingSpeaker>,
    pub starts: Arc<AtomicUsize>,
    pub stops: Arc<AtomicUsize>,
}

impl Harness {
    /// Send a recognized utterance into the controller
    pub async fn utterance(&self, text: &str, confidence: Option<f32>) {
        self.events
            .send(RecognizerEvent::Utterance {
                text: text.to_string(),
                confidence,
            })
            .await
            .expect("controller should be running");
    }

    /// Signal recognizer termination
    pub async fn recognizer_ended(&self) {
        self.events
            .send(RecognizerEvent::Ended)
            .await
            .expect("controller should be running");
    }

    pub fn start_count(&self) -> usize {
        self.starts.load(Ordering::SeqCst)
    }

    pub fn stop_count(&self) -> usize {
        self.stops.load(Ordering::SeqCst)
    }
}

/// Spawn a controller with a scripted responder and default config
pub fn spawn_session(responder: ScriptedResponder) -> Harness {
    spawn_session_with(responder, false)
}

/// Spawn a controller whose recognizer refuses to start
pub fn spawn_capability_missing_session() -> Harness {
    spawn_session_with(ScriptedResponder::new(Vec::new()), true)
}

fn spawn_session_with(responder: ScriptedResponder, fail_start: bool) -> Harness {
    let starts = Arc::new(AtomicUsize::new(0));
    let stops = Arc::new(AtomicUsize::new(0));

    let recognizer = MockRecognizer {
        starts: Arc::clone(&starts),
        stops: Arc::clone(&stops),
        fail_start,
    };

    let (event_tx, event_rx) = mpsc::channel(32);
    let responder = Arc::new(responder);
    let speaker = Arc::new(RecordingSpeaker::new());

    let (controller, handle) = SessionController::new(
        Box::new(recognizer),
        event_rx,
        Arc::clone(&responder) as Arc<dyn Responder>,
        Arc::clone(&speaker) as Arc<dyn Speaker>,
        &Config::default(),
    );
    tokio::spawn(controller.run());

    Harness {
        handle,
        events: event_tx,
        responder,
        speaker,
        starts,
        stops,
    }
}

/// Give the controller loop a chance to drain its channels
pub async fn settle() {
    tokio::time::sleep(Duration::from_millis(20)).await;
}
