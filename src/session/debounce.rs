//! Single-slot debounce timer.
//!
//! Converts a high-frequency change stream into one "commit now" deadline:
//! each change cancels the pending deadline and arms a new one a quiet
//! period out. The slot is explicit state (not a runtime timer handle) so
//! cancellation is observable and every method takes an injected `Instant`,
//! which keeps tests clock-driven instead of sleep-driven.

use std::time::{Duration, Instant};

#[derive(Debug)]
pub struct DebounceTimer {
    quiet: Duration,
    deadline: Option<Instant>,
}

impl DebounceTimer {
    pub fn new(quiet: Duration) -> Self {
        Self {
            quiet,
            deadline: None,
        }
    }

    /// Cancel any pending deadline and arm a fresh one. Content-blind:
    /// an identical-content change rearms like any other.
    pub fn on_change_at(&mut self, now: Instant) {
        self.deadline = Some(now + self.quiet);
    }

    pub fn deadline(&self) -> Option<Instant> {
        self.deadline
    }

    pub fn is_armed(&self) -> bool {
        self.deadline.is_some()
    }

    /// Disarm and report true if the quiet period has elapsed.
    pub fn fire_due(&mut self, now: Instant) -> bool {
        match self.deadline {
            Some(deadline) if deadline <= now => {
                self.deadline = None;
                true
            }
            _ => false,
        }
    }

    /// Disarm without firing (session teardown).
    pub fn cancel(&mut self) {
        self.deadline = None;
    }
}
