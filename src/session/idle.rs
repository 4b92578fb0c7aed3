//! Idle detection
//!
//! Tracks time since the last session activity and arms at most one idle
//! prompt per silence window. The prompt-pending flag stays set until some
//! activity (an accepted utterance, an explicit start) clears it, so a
//! silent listener hears the prompt once, not on a loop.

use std::time::Duration;

use tokio::time::Instant;

/// Decides when the session has been silent long enough to self-prompt
#[derive(Debug)]
pub struct IdleMonitor {
    silence_threshold: Duration,
    last_activity: Instant,
    prompt_pending: bool,
}

impl IdleMonitor {
    /// Create a monitor with the clock starting at `now`
    #[must_use]
    pub const fn new(silence_threshold: Duration, now: Instant) -> Self {
        Self {
            silence_threshold,
            last_activity: now,
            prompt_pending: false,
        }
    }

    /// Record session activity: clears a pending prompt and restarts the
    /// silence window
    pub fn record_activity(&mut self, now: Instant) {
        self.last_activity = now;
        self.prompt_pending = false;
    }

    /// Evaluate the idle predicate. Returns true when an idle prompt should
    /// be emitted; the monitor then arms itself until the next activity.
    pub fn check(&mut self, now: Instant) -> bool {
        if self.prompt_pending {
            return false;
        }

        if now.duration_since(self.last_activity) <= self.silence_threshold {
            return false;
        }

        self.prompt_pending = true;
        // Bumping the clock prevents an immediate re-trigger if the flag is
        // cleared right after the prompt.
        self.last_activity = now;
        true
    }

    /// Whether a prompt has fired since the last activity
    #[must_use]
    pub const fn prompt_pending(&self) -> bool {
        self.prompt_pending
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const THRESHOLD: Duration = Duration::from_secs(15);

    #[test]
    fn no_prompt_before_the_threshold() {
        let now = Instant::now();
        let mut idle = IdleMonitor::new(THRESHOLD, now);

        assert!(!idle.check(now + Duration::from_secs(5)));
        assert!(!idle.check(now + Duration::from_secs(15)));
    }

    #[test]
    fn prompt_fires_once_past_the_threshold() {
        let now = Instant::now();
        let mut idle = IdleMonitor::new(THRESHOLD, now);

        assert!(idle.check(now + Duration::from_secs(16)));
        assert!(idle.prompt_pending());

        // Still pending: no second prompt, no matter how long silence lasts
        assert!(!idle.check(now + Duration::from_secs(40)));
        assert!(!idle.check(now + Duration::from_secs(400)));
    }

    #[test]
    fn activity_rearms_the_prompt() {
        let now = Instant::now();
        let mut idle = IdleMonitor::new(THRESHOLD, now);

        assert!(idle.check(now + Duration::from_secs(16)));

        idle.record_activity(now + Duration::from_secs(20));
        assert!(!idle.prompt_pending());

        // Window restarts from the activity, not from the prompt
        assert!(!idle.check(now + Duration::from_secs(30)));
        assert!(idle.check(now + Duration::from_secs(36)));
    }

    #[test]
    fn activity_before_the_threshold_postpones_the_prompt() {
        let now = Instant::now();
        let mut idle = IdleMonitor::new(THRESHOLD, now);

        idle.record_activity(now + Duration::from_secs(10));
        assert!(!idle.check(now + Duration::from_secs(20)));
        assert!(idle.check(now + Duration::from_secs(26)));
    }
}
