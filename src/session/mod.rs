//! Session management
//!
//! The session controller and its two decision helpers: the utterance
//! filter and the idle monitor.

mod controller;
mod filter;
mod idle;

pub use controller::{Command, SessionController, SessionHandle};
pub use filter::{UtteranceFilter, Verdict};
pub use idle::IdleMonitor;
