//! Duplicate-send guard for outgoing messages.
//!
//! Repeated Enter presses must not flood a room with the same line, but the same
//! text may legitimately be sent again once a cool-down has passed. The guard is a
//! single slot: only the last sent text is remembered.

use std::time::{SystemTime, UNIX_EPOCH};

/// Cool-down before an identical message may be sent again.
pub const DUPLICATE_WINDOW_MS: u64 = 10_000;

/// Current Unix epoch in milliseconds.
pub fn now_ms() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as u64)
        .unwrap_or(0)
}

#[derive(Debug, Clone)]
pub struct OutgoingRateLimiter {
    last_text: String,
    last_sent_at_ms: u64,
    window_ms: u64,
}

impl Default for OutgoingRateLimiter {
    fn default() -> Self {
        Self::new(DUPLICATE_WINDOW_MS)
    }
}

impl OutgoingRateLimiter {
    pub fn new(window_ms: u64) -> Self {
        Self {
            last_text: String::new(),
            last_sent_at_ms: 0,
            window_ms,
        }
    }

    /// Whether `text` may be sent at `now_ms`: either it differs from the last sent
    /// text, or strictly more than the window has elapsed since that send.
    pub fn should_send(&self, text: &str, now_ms: u64) -> bool {
        text != self.last_text || now_ms.saturating_sub(self.last_sent_at_ms) > self.window_ms
    }

    /// Remember `text` as sent at `now_ms`. Called before the frame hits the wire.
    pub fn record_sent(&mut self, text: &str, now_ms: u64) {
        self.last_text.clear();
        self.last_text.push_str(text);
        self.last_sent_at_ms = now_ms;
    }

    /// [`should_send`](Self::should_send) followed by
    /// [`record_sent`](Self::record_sent) when allowed.
    pub fn try_acquire(&mut self, text: &str, now_ms: u64) -> bool {
        if !self.should_send(text, now_ms) {
            return false;
        }
        self.record_sent(text, now_ms);
        true
    }

    pub fn last_text(&self) -> &str {
        &self.last_text
    }

    pub fn last_sent_at_ms(&self) -> u64 {
        self.last_sent_at_ms
    }
}
