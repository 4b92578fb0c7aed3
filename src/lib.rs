//! voxcall - hands-free voice conversation client
//!
//! Drives one continuous voice session: microphone audio is recognized into
//! text utterances, filtered, forwarded to a remote chat endpoint, and the
//! replies are spoken back through a remote TTS endpoint.
//!
//! # Architecture
//!
//! ```text
//! microphone ──> Recognizer ──> UtteranceFilter ──┐
//!                                                 │
//!                     ┌─────────────────────────▼──────┐
//!                     │         SessionController       │
//!                     │  listening / limit / idle state │
//!                     └──────┬──────────────────┬──────┘
//!                            │                  │
//!                      Responder           SpeechPlayer
//!                     (chat endpoint)    (TTS endpoint + speakers)
//! ```
//!
//! The controller is an actor: all session state is mutated from its run
//! loop, fed by channels. Recognition, chat, and speech are capability
//! traits so alternate backends (and test doubles) plug in without touching
//! the controller.

pub mod config;
pub mod error;
pub mod recognizer;
pub mod responder;
pub mod session;
pub mod speech;

pub use config::Config;
pub use error::{Error, Result};
pub use session::{SessionController, SessionHandle};
