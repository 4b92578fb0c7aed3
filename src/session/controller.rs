//! Session controller
//!
//! The state machine driving one voice conversation session. The controller
//! is the single writer of session state: recognizer events, chat outcomes,
//! idle ticks, and start/stop commands all arrive through channels and are
//! handled to completion, one at a time, inside the run loop. Chat requests
//! and playback run as spawned work so new recognition events are never
//! blocked behind a round-trip in flight.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{mpsc, watch};
use tokio::time::{Instant, MissedTickBehavior};

use crate::Error;
use crate::config::{Config, RestartConfig};
use crate::recognizer::{Recognizer, RecognizerEvent};
use crate::responder::{ChatFailure, FALLBACK_ERROR_MESSAGE, Responder};
use crate::session::filter::{UtteranceFilter, Verdict};
use crate::session::idle::IdleMonitor;
use crate::speech::Speaker;

/// Command channel depth
const COMMAND_CHANNEL_SIZE: usize = 8;

/// Internal event channel depth
const INTERNAL_CHANNEL_SIZE: usize = 16;

/// Commands accepted by a running controller
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command {
    /// Begin listening (no-op while already listening)
    Start,
    /// Deliberately stop listening; suppresses auto-restart
    Stop,
}

/// Handle for driving and observing a running controller
#[derive(Clone)]
pub struct SessionHandle {
    commands: mpsc::Sender<Command>,
    limit: watch::Receiver<bool>,
}

impl SessionHandle {
    /// Ask the controller to start listening
    pub async fn start(&self) {
        let _ = self.commands.send(Command::Start).await;
    }

    /// Ask the controller to stop listening
    pub async fn stop(&self) {
        let _ = self.commands.send(Command::Stop).await;
    }

    /// Whether the session limit has been reached. Set by the controller,
    /// never cleared by it.
    #[must_use]
    pub fn limit_reached(&self) -> bool {
        *self.limit.borrow()
    }

    /// Watch channel over the limit flag, for blocking notices in the host
    #[must_use]
    pub fn limit_signal(&self) -> watch::Receiver<bool> {
        self.limit.clone()
    }
}

/// Events posted back into the controller loop by its own spawned work
enum InternalEvent {
    /// A chat round-trip finished
    Chat(std::result::Result<String, ChatFailure>),
    /// A scheduled recognizer restart came due
    RestartDue,
}

/// The session record, owned exclusively by the controller
struct Session {
    listening: bool,
    limit_reached: bool,
    last_accepted: Option<String>,
    idle: IdleMonitor,
}

/// State machine driving one voice conversation session
pub struct SessionController {
    session: Session,
    filter: UtteranceFilter,
    idle_check_interval: Duration,
    idle_prompt: String,
    restart: RestartConfig,

    recognizer: Box<dyn Recognizer>,
    recognizer_events: mpsc::Receiver<RecognizerEvent>,
    recognizer_gone: bool,
    responder: Arc<dyn Responder>,
    speaker: Arc<dyn Speaker>,

    commands: mpsc::Receiver<Command>,
    internal_tx: mpsc::Sender<InternalEvent>,
    internal_rx: mpsc::Receiver<InternalEvent>,
    limit_tx: watch::Sender<bool>,

    chat_in_flight: bool,
    pending_utterance: Option<String>,
    restart_attempts: u32,
    capability_notified: bool,
}

impl SessionController {
    /// Wire a controller to its collaborators. Returns the controller and
    /// the handle used to drive it.
    #[must_use]
    pub fn new(
        recognizer: Box<dyn Recognizer>,
        recognizer_events: mpsc::Receiver<RecognizerEvent>,
        responder: Arc<dyn Responder>,
        speaker: Arc<dyn Speaker>,
        config: &Config,
    ) -> (Self, SessionHandle) {
        let (command_tx, command_rx) = mpsc::channel(COMMAND_CHANNEL_SIZE);
        let (internal_tx, internal_rx) = mpsc::channel(INTERNAL_CHANNEL_SIZE);
        let (limit_tx, limit_rx) = watch::channel(false);

        let controller = Self {
            session: Session {
                listening: false,
                limit_reached: false,
                last_accepted: None,
                idle: IdleMonitor::new(config.idle.silence_threshold, Instant::now()),
            },
            filter: UtteranceFilter::new(&config.filter),
            idle_check_interval: config.idle.check_interval,
            idle_prompt: config.idle.prompt.clone(),
            restart: config.restart.clone(),
            recognizer,
            recognizer_events,
            recognizer_gone: false,
            responder,
            speaker,
            commands: command_rx,
            internal_tx,
            internal_rx,
            limit_tx,
            chat_in_flight: false,
            pending_utterance: None,
            restart_attempts: 0,
            capability_notified: false,
        };

        let handle = SessionHandle {
            commands: command_tx,
            limit: limit_rx,
        };

        (controller, handle)
    }

    /// Run the controller until every [`SessionHandle`] is dropped
    pub async fn run(mut self) {
        let mut idle_ticks = tokio::time::interval(self.idle_check_interval);
        idle_ticks.set_missed_tick_behavior(MissedTickBehavior::Delay);
        // Skip the immediate first tick
        idle_ticks.tick().await;

        loop {
            tokio::select! {
                command = self.commands.recv() => match command {
                    Some(Command::Start) => self.start_listening(),
                    Some(Command::Stop) => self.stop_listening(),
                    None => break,
                },
                event = self.recognizer_events.recv(), if !self.recognizer_gone => {
                    match event {
                        Some(event) => self.handle_recognizer_event(event).await,
                        None => self.recognizer_gone = true,
                    }
                }
                Some(event) = self.internal_rx.recv() => self.handle_internal_event(event).await,
                _ = idle_ticks.tick() => self.idle_tick().await,
            }
        }

        tracing::debug!("session controller stopped");
    }

    /// `Idle -> Listening`: start the recognizer
    fn start_listening(&mut self) {
        if self.session.listening {
            tracing::debug!("already listening");
            return;
        }

        match self.recognizer.start() {
            Ok(()) => {
                self.session.listening = true;
                self.restart_attempts = 0;
                self.session.idle.record_activity(Instant::now());
                tracing::info!("listening started");
            }
            Err(e @ Error::Capability(_)) => {
                // Surfaced once, never retried automatically
                if !self.capability_notified {
                    self.capability_notified = true;
                    tracing::error!(error = %e, "speech recognition unavailable");
                }
            }
            Err(e) => {
                tracing::error!(error = %e, "recognizer failed to start");
            }
        }
    }

    /// Any state `-> Idle`: deliberate stop, suppresses auto-restart
    fn stop_listening(&mut self) {
        // Clear the flag before stopping so a racing Ended cannot restart
        self.session.listening = false;
        self.recognizer.stop();
        tracing::info!("listening stopped");
    }

    async fn handle_recognizer_event(&mut self, event: RecognizerEvent) {
        match event {
            RecognizerEvent::Utterance { text, confidence } => {
                self.handle_utterance(&text, confidence);
            }
            RecognizerEvent::Ended => self.handle_recognizer_ended(),
            RecognizerEvent::Error { message } => {
                // Adapter-level failures are logged, never surfaced to the
                // listener; a terminal one is followed by Ended.
                tracing::warn!(error = %message, "recognizer error");
            }
        }
    }

    /// Filter one raw recognition result and dispatch it if accepted
    fn handle_utterance(&mut self, text: &str, confidence: Option<f32>) {
        let verdict = self
            .filter
            .evaluate(text, confidence, self.session.last_accepted.as_deref());

        match verdict {
            Verdict::Accepted(utterance) => {
                tracing::info!(utterance = %utterance, ?confidence, "utterance accepted");
                self.session.last_accepted = Some(utterance.clone());
                self.session.idle.record_activity(Instant::now());
                self.restart_attempts = 0;

                if self.session.limit_reached {
                    tracing::debug!("session limit reached, utterance not forwarded");
                    return;
                }

                self.dispatch_chat(utterance);
            }
            Verdict::TooShort | Verdict::LowConfidence => {
                tracing::debug!(raw = %text, ?confidence, "utterance rejected");
            }
            Verdict::Duplicate => {
                tracing::debug!(raw = %text, "duplicate utterance ignored");
            }
        }
    }

    /// Send an accepted utterance to the responder, one request at a time.
    /// A second utterance arriving mid-flight waits in a single pending
    /// slot; a third replaces it (newest wins).
    fn dispatch_chat(&mut self, utterance: String) {
        if self.chat_in_flight {
            if let Some(dropped) = self.pending_utterance.replace(utterance) {
                tracing::debug!(dropped = %dropped, "pending utterance replaced");
            }
            return;
        }

        self.chat_in_flight = true;
        let responder = Arc::clone(&self.responder);
        let internal_tx = self.internal_tx.clone();

        tokio::spawn(async move {
            let outcome = responder.send(&utterance).await;
            let _ = internal_tx.send(InternalEvent::Chat(outcome)).await;
        });
    }

    async fn handle_internal_event(&mut self, event: InternalEvent) {
        match event {
            InternalEvent::Chat(outcome) => self.handle_chat_outcome(outcome).await,
            InternalEvent::RestartDue => {
                if self.session.listening {
                    self.restart_recognizer();
                }
            }
        }
    }

    /// Route a finished chat round-trip to the speaker; on failure, speak a
    /// derived error and honor a limit signal
    async fn handle_chat_outcome(&mut self, outcome: std::result::Result<String, ChatFailure>) {
        self.chat_in_flight = false;

        match outcome {
            Ok(reply) => {
                tracing::info!(reply = %reply, "speaking reply");
                self.say(&reply).await;
            }
            Err(failure) => {
                if failure.limit_reached {
                    self.session.limit_reached = true;
                    let _ = self.limit_tx.send(true);
                    tracing::warn!("session limit reached");
                }

                let message = failure
                    .message
                    .unwrap_or_else(|| FALLBACK_ERROR_MESSAGE.to_string());
                tracing::warn!(message = %message, "speaking chat failure");
                self.say(&message).await;
            }
        }

        if let Some(next) = self.pending_utterance.take() {
            if self.session.limit_reached {
                tracing::debug!(dropped = %next, "pending utterance dropped after limit");
            } else {
                self.dispatch_chat(next);
            }
        }
    }

    /// `Listening -> Listening` on adapter termination: restart, throttled
    fn handle_recognizer_ended(&mut self) {
        if !self.session.listening {
            tracing::debug!("recognizer ended while not listening");
            return;
        }

        self.restart_attempts += 1;
        if self.restart_attempts > self.restart.max_attempts {
            tracing::error!(
                attempts = self.restart_attempts,
                "recognizer keeps terminating, giving up"
            );
            self.session.listening = false;
            return;
        }

        let delay = restart_delay(
            self.restart_attempts,
            self.restart.base_delay,
            self.restart.max_delay,
        );

        if delay.is_zero() {
            self.restart_recognizer();
            return;
        }

        tracing::debug!(
            attempt = self.restart_attempts,
            delay_ms = delay.as_millis(),
            "scheduling recognizer restart"
        );
        let internal_tx = self.internal_tx.clone();
        tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            let _ = internal_tx.send(InternalEvent::RestartDue).await;
        });
    }

    fn restart_recognizer(&mut self) {
        match self.recognizer.start() {
            Ok(()) => tracing::info!(attempt = self.restart_attempts, "recognizer restarted"),
            Err(e) => {
                tracing::error!(error = %e, "recognizer restart failed");
                self.session.listening = false;
            }
        }
    }

    /// `Listening -> Listening` on idle: speak the prompt, bypassing the
    /// responder entirely
    async fn idle_tick(&mut self) {
        if self.session.idle.check(Instant::now()) {
            tracing::info!("idle silence detected, speaking prompt");
            let prompt = self.idle_prompt.clone();
            self.say(&prompt).await;
        }
    }

    async fn say(&self, text: &str) {
        if let Err(e) = self.speaker.speak(text).await {
            tracing::warn!(error = %e, "speech request failed");
        }
    }
}

/// Backoff before restart `attempt` (1-based). The first restart is
/// immediate; later ones double from the base up to the cap.
fn restart_delay(attempt: u32, base: Duration, max: Duration) -> Duration {
    if attempt <= 1 {
        return Duration::ZERO;
    }
    let exp = (attempt - 2).min(10);
    base.saturating_mul(1 << exp).min(max)
}

#[cfg(test)]
mod tests {
    use super::*;

    const BASE: Duration = Duration::from_millis(500);
    const MAX: Duration = Duration::from_secs(30);

    #[test]
    fn first_restart_is_immediate() {
        assert_eq!(restart_delay(1, BASE, MAX), Duration::ZERO);
    }

    #[test]
    fn backoff_doubles_from_the_base() {
        assert_eq!(restart_delay(2, BASE, MAX), Duration::from_millis(500));
        assert_eq!(restart_delay(3, BASE, MAX), Duration::from_secs(1));
        assert_eq!(restart_delay(4, BASE, MAX), Duration::from_secs(2));
        assert_eq!(restart_delay(5, BASE, MAX), Duration::from_secs(4));
    }

    #[test]
    fn backoff_is_capped() {
        assert_eq!(restart_delay(9, BASE, MAX), MAX);
        assert_eq!(restart_delay(100, BASE, MAX), MAX);
    }
}
