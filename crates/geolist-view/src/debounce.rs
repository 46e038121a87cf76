//! Adaptive debounce for search input.
//!
//! Isolated keystrokes filter at once. A keystroke that follows the previous
//! one within [`QUIET_WINDOW`] is held for [`BURST_DELAY`] and replaced by any
//! later keystroke, so a burst of typing only filters for its last value.

use std::time::{Duration, Instant};

pub const QUIET_WINDOW: Duration = Duration::from_millis(100);
pub const BURST_DELAY: Duration = Duration::from_millis(50);

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Debounced {
    /// Filter with this text now.
    Apply(String),
    /// Held until the returned instant; poll then.
    Deferred(Instant),
}

#[derive(Debug, Clone)]
struct Pending {
    text: String,
    due: Instant,
}

#[derive(Debug, Clone)]
pub struct AdaptiveDebounce {
    quiet_window: Duration,
    delay: Duration,
    last_input: Option<Instant>,
    pending: Option<Pending>,
}

impl Default for AdaptiveDebounce {
    fn default() -> Self {
        Self::new(QUIET_WINDOW, BURST_DELAY)
    }
}

impl AdaptiveDebounce {
    #[must_use]
    pub fn new(quiet_window: Duration, delay: Duration) -> Self {
        Self {
            quiet_window,
            delay,
            last_input: None,
            pending: None,
        }
    }

    pub fn submit(&mut self, text: impl Into<String>, now: Instant) -> Debounced {
        let text = text.into();
        let in_burst = self
            .last_input
            .is_some_and(|last| now.saturating_duration_since(last) < self.quiet_window);
        self.last_input = Some(now);

        if in_burst {
            let due = now + self.delay;
            self.pending = Some(Pending { text, due });
            Debounced::Deferred(due)
        } else {
            self.pending = None;
            Debounced::Apply(text)
        }
    }

    /// Releases the held text once it is due.
    pub fn poll(&mut self, now: Instant) -> Option<String> {
        if self.pending.as_ref().is_some_and(|p| p.due <= now) {
            self.pending.take().map(|p| p.text)
        } else {
            None
        }
    }

    #[must_use]
    pub fn next_due(&self) -> Option<Instant> {
        self.pending.as_ref().map(|p| p.due)
    }

    #[must_use]
    pub fn has_pending(&self) -> bool {
        self.pending.is_some()
    }

    /// Drops held text and forgets the last keystroke.
    pub fn cancel(&mut self) {
        self.pending = None;
        self.last_input = None;
    }
}
