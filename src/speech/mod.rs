//! Speech output
//!
//! The [`Speaker`] capability plus the production pipeline: remote synthesis
//! feeding sequential playback. Requests are queued and played one at a time
//! so a prompt and a reply arriving close together never talk over each
//! other. Synthesis and playback failures are logged and swallowed; the
//! session continues without that one spoken reply.

mod playback;
mod synth;

pub use playback::AudioPlayback;
pub use synth::SpeechSynth;

use async_trait::async_trait;
use tokio::sync::mpsc;

use crate::{Error, Result};

/// Speech queue depth; `speak` waits when the backlog is this deep
const SPEECH_QUEUE_SIZE: usize = 16;

/// Text-to-audio capability
#[async_trait]
pub trait Speaker: Send + Sync {
    /// Queue text for synthesis and playback. Returns once the request is
    /// accepted, not once playback finishes.
    ///
    /// # Errors
    ///
    /// Returns error if the speech pipeline is no longer running
    async fn speak(&self, text: &str) -> Result<()>;
}

/// Queued speech player: a worker task synthesizes and plays requests in
/// arrival order
pub struct SpeechPlayer {
    queue: mpsc::Sender<String>,
}

impl SpeechPlayer {
    /// Spawn the playback worker and return the player handle
    #[must_use]
    pub fn spawn(synth: SpeechSynth, playback: AudioPlayback) -> Self {
        let (tx, mut rx) = mpsc::channel::<String>(SPEECH_QUEUE_SIZE);

        tokio::spawn(async move {
            while let Some(text) = rx.recv().await {
                tracing::debug!(text = %text, "speaking");

                let audio = match synth.synthesize(&text).await {
                    Ok(audio) => audio,
                    Err(e) => {
                        tracing::warn!(error = %e, "synthesis failed");
                        continue;
                    }
                };

                if let Err(e) = playback.play_mp3(&audio).await {
                    tracing::warn!(error = %e, "playback failed");
                }
            }

            tracing::debug!("speech worker stopped");
        });

        Self { queue: tx }
    }
}

#[async_trait]
impl Speaker for SpeechPlayer {
    async fn speak(&self, text: &str) -> Result<()> {
        self.queue
            .send(text.to_string())
            .await
            .map_err(|_| Error::Tts("speech worker stopped".to_string()))
    }
}
