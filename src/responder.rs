//! Responder client
//!
//! Forwards accepted utterances to the remote chat endpoint and maps the
//! reply or failure payload into typed outcomes for the session controller.

use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::Result;

/// Spoken when a chat failure carries no error text of its own
pub const FALLBACK_ERROR_MESSAGE: &str = "Error communicating with the server";

/// A failed chat exchange
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ChatFailure {
    /// Error text from the failure payload, when it carried one
    pub message: Option<String>,
    /// True when the service signalled that the session limit was reached
    pub limit_reached: bool,
}

/// Chat capability: one utterance in, one reply (or typed failure) out
#[async_trait]
pub trait Responder: Send + Sync {
    /// Send an utterance and return the reply text
    ///
    /// # Errors
    ///
    /// Returns a [`ChatFailure`] for transport failures and error payloads
    /// alike; the caller decides what to speak from it.
    async fn send(&self, message: &str) -> std::result::Result<String, ChatFailure>;
}

/// Chat request body
#[derive(Serialize)]
struct ChatRequest<'a> {
    message: &'a str,
}

/// Successful chat response body
#[derive(Deserialize)]
struct ChatReply {
    response: String,
}

/// Failure response body; both fields are optional on the wire
#[derive(Deserialize)]
struct ChatErrorBody {
    #[serde(default)]
    error: Option<String>,
    #[serde(rename = "limitReached", default)]
    limit_reached: bool,
}

/// HTTP responder talking to the remote chat endpoint
pub struct HttpResponder {
    client: reqwest::Client,
    url: String,
}

impl HttpResponder {
    /// Create a new responder for the given chat endpoint
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
}

#[async_trait]
impl Responder for HttpResponder {
    async fn send(&self, message: &str) -> std::result::Result<String, ChatFailure> {
        tracing::debug!(message = %message, "sending chat request");

        let response = match self
            .client
            .post(&self.url)
            .json(&ChatRequest { message })
            .send()
            .await
        {
            Ok(response) => response,
            Err(e) => {
                tracing::error!(error = %e, "chat request failed");
                return Err(ChatFailure::default());
            }
        };

        let status = response.status();
        if status.is_success() {
            return match response.json::<ChatReply>().await {
                Ok(reply) => {
                    tracing::debug!(reply = %reply.response, "chat reply received");
                    Ok(reply.response)
                }
                Err(e) => {
                    tracing::error!(error = %e, "failed to parse chat reply");
                    Err(ChatFailure::default())
                }
            };
        }

        // Failure payloads may carry an error message and a limit flag
        let body = response.text().await.unwrap_or_default();
        tracing::warn!(status = %status, body = %body, "chat endpoint error");

        match serde_json::from_str::<ChatErrorBody>(&body) {
            Ok(err) => Err(ChatFailure {
                message: err.error,
                limit_reached: err.limit_reached,
            }),
            Err(_) => Err(ChatFailure::default()),
        }
    }
}
