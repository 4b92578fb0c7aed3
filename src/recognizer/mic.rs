//! Microphone recognizer backend
//!
//! Polls the capture buffer on a fixed cadence, segments speech by energy,
//! and transcribes completed segments through the remote STT endpoint.
//! cpal streams aren't `Send`, so the capture loop runs on a dedicated OS
//! thread and posts events back over the adapter channel.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use tokio::sync::mpsc;

use crate::recognizer::capture::{AudioCapture, SAMPLE_RATE, samples_to_wav};
use crate::recognizer::segment::SpeechSegmenter;
use crate::recognizer::stt::Transcriber;
use crate::recognizer::{Recognizer, RecognizerEvent};
use crate::{Error, Result};

/// Capture buffer poll cadence
const POLL_INTERVAL: Duration = Duration::from_millis(100);

/// Event channel depth
const EVENT_CHANNEL_SIZE: usize = 32;

/// Microphone-backed recognizer
pub struct MicRecognizer {
    transcriber: Arc<Transcriber>,
    events: mpsc::Sender<RecognizerEvent>,
    stop: Arc<AtomicBool>,
    worker: Option<std::thread::JoinHandle<()>>,
}

impl MicRecognizer {
    /// Create a recognizer and the channel its events arrive on
    #[must_use]
    pub fn with_events(transcriber: Transcriber) -> (Self, mpsc::Receiver<RecognizerEvent>) {
        let (tx, rx) = mpsc::channel(EVENT_CHANNEL_SIZE);
        (
            Self {
                transcriber: Arc::new(transcriber),
                events: tx,
                stop: Arc::new(AtomicBool::new(false)),
                worker: None,
            },
            rx,
        )
    }
}

impl Recognizer for MicRecognizer {
    fn start(&mut self) -> Result<()> {
        if self.worker.as_ref().is_some_and(|w| !w.is_finished()) {
            return Ok(());
        }

        // Fail the start call itself when the capability is missing; runtime
        // capture failures inside the worker become Error + Ended events.
        AudioCapture::probe()?;

        let handle = tokio::runtime::Handle::try_current()
            .map_err(|_| Error::Config("recognizer requires a tokio runtime".to_string()))?;

        let stop = Arc::new(AtomicBool::new(false));
        self.stop = Arc::clone(&stop);

        let events = self.events.clone();
        let transcriber = Arc::clone(&self.transcriber);

        let worker = std::thread::Builder::new()
            .name("voxcall-recognizer".to_string())
            .spawn(move || worker_loop(&stop, &events, &transcriber, &handle))?;
        self.worker = Some(worker);

        tracing::info!("recognizer started");
        Ok(())
    }

    fn stop(&mut self) {
        self.stop.store(true, Ordering::SeqCst);
        if self.worker.take().is_some() {
            tracing::debug!("recognizer stop requested");
        }
    }
}

/// Capture → segment → transcribe loop, run on a dedicated thread
fn worker_loop(
    stop: &AtomicBool,
    events: &mpsc::Sender<RecognizerEvent>,
    transcriber: &Transcriber,
    handle: &tokio::runtime::Handle,
) {
    let mut capture = match open_capture() {
        Ok(capture) => capture,
        Err(e) => {
            tracing::error!(error = %e, "capture failed to open");
            let _ = events.blocking_send(RecognizerEvent::Error {
                message: e.to_string(),
            });
            let _ = events.blocking_send(RecognizerEvent::Ended);
            return;
        }
    };

    let mut segmenter = SpeechSegmenter::new();
    tracing::debug!("recognizer worker listening");

    loop {
        if stop.load(Ordering::SeqCst) {
            // Deliberate stop: wind down without an Ended event
            capture.stop();
            tracing::debug!("recognizer worker stopped");
            return;
        }

        std::thread::sleep(POLL_INTERVAL);

        let samples = capture.take_buffer();
        let Some(segment) = segmenter.push(&samples) else {
            continue;
        };

        let wav = match samples_to_wav(&segment, SAMPLE_RATE) {
            Ok(wav) => wav,
            Err(e) => {
                tracing::warn!(error = %e, "segment encoding failed");
                continue;
            }
        };

        match handle.block_on(transcriber.transcribe(wav)) {
            Ok(result) if !result.text.trim().is_empty() => {
                let event = RecognizerEvent::Utterance {
                    text: result.text,
                    confidence: result.confidence,
                };
                if events.blocking_send(event).is_err() {
                    // Controller is gone; nobody is listening for events
                    capture.stop();
                    return;
                }
            }
            Ok(_) => tracing::debug!("empty transcription discarded"),
            Err(e) => {
                tracing::warn!(error = %e, "transcription failed");
                let _ = events.blocking_send(RecognizerEvent::Error {
                    message: e.to_string(),
                });
            }
        }
    }
}

fn open_capture() -> Result<AudioCapture> {
    let mut capture = AudioCapture::new()?;
    capture.start()?;
    Ok(capture)
}
