//! Runtime configuration of a chat session.

use std::time::Duration;

use crate::feed::FEED_CAPACITY;
use crate::rate_limit::DUPLICATE_WINDOW_MS;

/// Relay the client talks to when nothing else is configured.
pub const DEFAULT_RELAY_URL: &str = "ws://127.0.0.1:1324/socket";

#[derive(Debug, Clone, PartialEq)]
pub struct ClientConfig {
    /// WebSocket URL of the pub/sub relay.
    pub relay_url: String,
    pub connect_timeout: Duration,
    /// Delay between pressing Enter and the publish frame leaving.
    pub send_delay: Duration,
    /// Delay between a message landing in the feed and the scroll hint.
    pub scroll_delay: Duration,
    /// Cool-down before an identical message may be re-sent.
    pub duplicate_window_ms: u64,
    pub feed_capacity: usize,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            relay_url: DEFAULT_RELAY_URL.to_string(),
            connect_timeout: Duration::from_secs(30),
            send_delay: Duration::from_millis(300),
            scroll_delay: Duration::from_millis(150),
            duplicate_window_ms: DUPLICATE_WINDOW_MS,
            feed_capacity: FEED_CAPACITY,
        }
    }
}

impl ClientConfig {
    pub fn with_relay_url(mut self, url: impl Into<String>) -> Self {
        self.relay_url = url.into();
        self
    }

    pub fn with_connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout = timeout;
        self
    }
}
