//! Speech segmentation
//!
//! Splits the continuous microphone stream into discrete utterances using
//! RMS energy: a segment opens when energy crosses the speech threshold and
//! closes after a stretch of trailing silence.

/// Minimum audio energy to consider speech
const ENERGY_THRESHOLD: f32 = 0.03;

/// Minimum speech length for a segment to count (samples at 16kHz)
const MIN_SPEECH_SAMPLES: usize = 4800; // 0.3 seconds

/// Trailing silence that closes a segment (samples)
const SILENCE_SAMPLES: usize = 8000; // 0.5 seconds

/// Segmenter state
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SegmentState {
    /// Waiting for speech energy
    Quiet,
    /// Accumulating a speech segment
    Speech,
}

/// Accumulates microphone samples into complete speech segments
pub struct SpeechSegmenter {
    state: SegmentState,
    buffer: Vec<f32>,
    silence_counter: usize,
}

impl Default for SpeechSegmenter {
    fn default() -> Self {
        Self::new()
    }
}

impl SpeechSegmenter {
    /// Create a new segmenter in the quiet state
    #[must_use]
    pub const fn new() -> Self {
        Self {
            state: SegmentState::Quiet,
            buffer: Vec::new(),
            silence_counter: 0,
        }
    }

    /// Feed captured samples; returns a completed segment when one closes
    pub fn push(&mut self, samples: &[f32]) -> Option<Vec<f32>> {
        if samples.is_empty() {
            return None;
        }

        let energy = calculate_energy(samples);
        let is_speech = energy > ENERGY_THRESHOLD;

        match self.state {
            SegmentState::Quiet => {
                if is_speech {
                    self.state = SegmentState::Speech;
                    self.buffer.clear();
                    self.buffer.extend_from_slice(samples);
                    self.silence_counter = 0;
                    tracing::trace!(energy, "speech started");
                }
                None
            }
            SegmentState::Speech => {
                self.buffer.extend_from_slice(samples);

                if is_speech {
                    self.silence_counter = 0;
                } else {
                    self.silence_counter += samples.len();
                }

                if self.silence_counter > SILENCE_SAMPLES {
                    if self.buffer.len() - self.silence_counter > MIN_SPEECH_SAMPLES {
                        let segment = std::mem::take(&mut self.buffer);
                        self.reset();
                        tracing::debug!(samples = segment.len(), "speech segment complete");
                        return Some(segment);
                    }

                    // Too little speech before the silence: a blip, not an utterance
                    tracing::trace!("discarding short speech blip");
                    self.reset();
                }
                None
            }
        }
    }

    /// Reset to the quiet state, discarding any partial segment
    pub fn reset(&mut self) {
        self.state = SegmentState::Quiet;
        self.buffer.clear();
        self.silence_counter = 0;
    }

    /// Current state
    #[must_use]
    pub const fn state(&self) -> SegmentState {
        self.state
    }
}

/// RMS energy of audio samples
#[allow(clippy::cast_precision_loss)]
fn calculate_energy(samples: &[f32]) -> f32 {
    if samples.is_empty() {
        return 0.0;
    }

    let sum_squares: f32 = samples.iter().map(|s| s * s).sum();
    (sum_squares / samples.len() as f32).sqrt()
}
