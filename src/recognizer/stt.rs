//! Remote speech-to-text client

use std::time::Duration;

use crate::{Error, Result};

/// A transcription returned by the STT endpoint
#[derive(Debug, Clone)]
pub struct Transcription {
    /// Recognized text
    pub text: String,
    /// Recognition confidence in `[0, 1]`; `None` when the engine reports none
    pub confidence: Option<f32>,
}

/// Response body from the STT endpoint
#[derive(serde::Deserialize)]
struct SttResponse {
    transcript: String,
    #[serde(default)]
    confidence: Option<f32>,
}

/// Transcribes WAV audio via the remote STT endpoint
pub struct Transcriber {
    client: reqwest::Client,
    url: String,
}

impl Transcriber {
    /// Create a new transcriber for the given endpoint
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

    /// Transcribe WAV audio to text
    ///
    /// # Errors
    ///
    /// Returns error if the request fails or the response cannot be parsed
    pub async fn transcribe(&self, audio: Vec<u8>) -> Result<Transcription> {
        tracing::debug!(audio_bytes = audio.len(), "starting transcription");

        let response = self
            .client
            .post(&self.url)
            .header("Content-Type", "audio/wav")
            .body(audio)
            .send()
            .await
            .map_err(|e| {
                tracing::error!(error = %e, "STT request failed");
                e
            })?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            tracing::error!(status = %status, body = %body, "STT endpoint error");
            return Err(Error::Stt(format!("STT endpoint error {status}: {body}")));
        }

        let result: SttResponse = response.json().await.map_err(|e| {
            tracing::error!(error = %e, "failed to parse STT response");
            e
        })?;

        tracing::info!(
            transcript = %result.transcript,
            confidence = ?result.confidence,
            "transcription complete"
        );

        Ok(Transcription {
            text: result.transcript,
            confidence: result.confidence,
        })
    }
}
