use std::time::{Duration, Instant};

/// Coalesces rapid edits into one save once `delay` passes without a newer
/// edit. Time is passed in so the caller's event loop drives it.
#[derive(Debug)]
pub struct SaveDebouncer {
    delay: Duration,
    pending: Option<(String, Instant)>,
}

impl SaveDebouncer {
    pub fn new(delay: Duration) -> Self {
        Self {
            delay,
            pending: None,
        }
    }

    /// Replaces any pending save and restarts the delay.
    pub fn schedule(&mut self, content: String, now: Instant) {
        self.pending = Some((content, now + self.delay));
    }

    pub fn is_pending(&self) -> bool {
        self.pending.is_some()
    }

    /// Content whose delay has elapsed, if any.
    pub fn poll(&mut self, now: Instant) -> Option<String> {
        match &self.pending {
            Some((_, due)) if now >= *due => self.pending.take().map(|(content, _)| content),
            _ => None,
        }
    }

    /// Takes the pending content immediately, for a forced save.
    pub fn take(&mut self) -> Option<String> {
        self.pending.take().map(|(content, _)| content)
    }

    pub fn cancel(&mut self) {
        self.pending = None;
    }
}
