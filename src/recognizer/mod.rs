//! Speech recognition
//!
//! The recognition adapter: a [`Recognizer`] capability trait over a typed
//! event channel, with a microphone backend (capture → segmentation → remote
//! transcription). The adapter holds no session or filtering logic; it is a
//! typed event source.

mod capture;
mod mic;
mod segment;
mod stt;

pub use capture::{AudioCapture, SAMPLE_RATE, samples_to_wav};
pub use mic::MicRecognizer;
pub use segment::{SegmentState, SpeechSegmenter};
pub use stt::{Transcriber, Transcription};

use crate::Result;

/// Events emitted by a recognizer backend
#[derive(Debug, Clone)]
pub enum RecognizerEvent {
    /// A finalized recognition result
    Utterance {
        /// Recognized text (untrimmed)
        text: String,
        /// Confidence in `[0, 1]`; `None` when the engine reports no score
        confidence: Option<f32>,
    },
    /// The underlying stream terminated (error, timeout, or platform policy).
    /// Never emitted for a deliberate [`Recognizer::stop`].
    Ended,
    /// A non-fatal backend failure. When the failure is terminal, `Ended`
    /// follows it.
    Error {
        /// Backend-specific description
        message: String,
    },
}

/// Continuous speech recognition capability
///
/// Backends deliver [`RecognizerEvent`]s over a channel handed out at
/// construction, so alternate engines satisfy the same contract without
/// touching the session controller.
pub trait Recognizer: Send + Sync {
    /// Begin continuous listening. Idempotent while already running.
    ///
    /// # Errors
    ///
    /// Returns `Error::Capability` when the platform offers no recognition
    /// capability; the caller surfaces that once and must not retry.
    fn start(&mut self) -> Result<()>;

    /// Deliberately stop listening. Must not emit `Ended`.
    fn stop(&mut self);
}
