//! Remote text-to-speech client

use std::time::Duration;

use crate::{Error, Result};

/// TTS request body
#[derive(serde::Serialize)]
struct SynthRequest<'a> {
    text: &'a str,
}

/// Synthesizes speech via the remote TTS endpoint
pub struct SpeechSynth {
    client: reqwest::Client,
    url: String,
}

impl SpeechSynth {
    /// Create a new synthesizer for the given endpoint
    ///
    /// # Errors
    ///
    /// Returns error if the HTTP client cannot be built
    pub fn new(url: &str, timeout: Duration) -> Result<Self> {
        let client = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self {
            client,
            url: url.to_string(),
        })
    }

    /// Synthesize text to audio
    ///
    /// # Returns
    ///
    /// Audio bytes (MP3 format)
    ///
    /// # Errors
    ///
    /// Returns error if the request fails
    pub async fn synthesize(&self, text: &str) -> Result<Vec<u8>> {
        let response = self
            .client
            .post(&self.url)
            .json(&SynthRequest { text })
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(Error::Tts(format!("TTS endpoint error {status}: {body}")));
        }

        let audio = response.bytes().await?;
        tracing::debug!(audio_bytes = audio.len(), "synthesis complete");
        Ok(audio.to_vec())
    }
}
