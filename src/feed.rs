//! The bounded, ordered feed of chat messages received for the current room.
//!
//! ## Design
//! - Frames are parsed as loose JSON objects; only objects carrying both an
//!   `author` and a `message` key are chat messages, everything else the relay
//!   sends is ignored.
//! - Bodies are stored verbatim. Escaping is the renderer's job.
//! - The feed keeps the last [`FEED_CAPACITY`] messages; renderers show at most
//!   [`DISPLAY_LIMIT`] of them. The two bounds are independent.

use std::collections::VecDeque;

use serde::Serialize;
use serde_json::Value;
use tracing::debug;

/// Messages retained by the feed.
pub const FEED_CAPACITY: usize = 100;

/// Messages shown by renderers.
pub const DISPLAY_LIMIT: usize = 50;

/// Author shown when a frame carries a null author.
pub const ANONYMOUS_AUTHOR: &str = "x";

/// One received chat message. Immutable once in the feed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Message {
    /// Arrival order within this feed, starting at 0.
    pub seq: u64,
    pub author: String,
    /// Untrusted, unescaped.
    pub body: String,
    pub is_admin: bool,
}

/// Why a frame did not make it into the feed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Rejected {
    NotJson,
    NotAnObject,
    MissingAuthor,
    MissingMessage,
    NullMessage,
}

/// Extract `(author, body)` from a raw inbound frame.
pub fn parse_frame(raw: &str) -> Result<(String, String), Rejected> {
    let value: Value = serde_json::from_str(raw).map_err(|_| Rejected::NotJson)?;
    let obj = value.as_object().ok_or(Rejected::NotAnObject)?;

    let author = obj.get("author").ok_or(Rejected::MissingAuthor)?;
    let message = obj.get("message").ok_or(Rejected::MissingMessage)?;

    let author = match author {
        Value::Null => ANONYMOUS_AUTHOR.to_string(),
        Value::String(s) => s.clone(),
        other => other.to_string(),
    };
    let body = match message {
        Value::Null => return Err(Rejected::NullMessage),
        Value::String(s) => s.clone(),
        other => other.to_string(),
    };
    Ok((author, body))
}

/// Ordered, capacity-bounded message history.
#[derive(Debug)]
pub struct MessageFeed {
    messages: VecDeque<Message>,
    capacity: usize,
    next_seq: u64,
}

impl Default for MessageFeed {
    fn default() -> Self {
        Self::new()
    }
}

impl MessageFeed {
    pub fn new() -> Self {
        Self::with_capacity(FEED_CAPACITY)
    }

    /// A feed retaining at most `capacity` messages (at least one).
    pub fn with_capacity(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            messages: VecDeque::with_capacity(capacity),
            capacity,
            next_seq: 0,
        }
    }

    /// Process one inbound text frame.
    ///
    /// Returns the appended message, or `None` when the frame was dropped.
    pub fn on_inbound_frame(&mut self, raw: &str) -> Option<&Message> {
        let (author, body) = match parse_frame(raw) {
            Ok(pair) => pair,
            Err(reason) => {
                debug!(?reason, frame_len = raw.len(), "dropping inbound frame");
                return None;
            }
        };
        Some(self.push(author, body))
    }

    fn push(&mut self, author: String, body: String) -> &Message {
        let msg = Message {
            seq: self.next_seq,
            author,
            body,
            is_admin: false,
        };
        self.next_seq += 1;
        self.messages.push_back(msg);
        while self.messages.len() > self.capacity {
            self.messages.pop_front();
        }
        // just pushed, never empty
        &self.messages[self.messages.len() - 1]
    }

    /// Every retained message, oldest first.
    pub fn snapshot(&self) -> Vec<Message> {
        self.messages.iter().cloned().collect()
    }

    /// The newest `limit` messages, oldest first.
    pub fn latest(&self, limit: usize) -> impl Iterator<Item = &Message> {
        let skip = self.messages.len().saturating_sub(limit);
        self.messages.iter().skip(skip)
    }

    /// The messages a renderer should show.
    pub fn visible(&self) -> impl Iterator<Item = &Message> {
        self.latest(DISPLAY_LIMIT)
    }

    pub fn len(&self) -> usize {
        self.messages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn frame(author: &str, message: &str) -> String {
        serde_json::json!({ "author": author, "message": message }).to_string()
    }

    #[test]
    fn test_valid_frame_is_appended() {
        let mut feed = MessageFeed::new();
        let msg = feed.on_inbound_frame(&frame("darker", "hi")).cloned();
        let msg = msg.expect("frame should be accepted");
        assert_eq!(msg.author, "darker");
        assert_eq!(msg.body, "hi");
        assert_eq!(msg.seq, 0);
        assert_eq!(feed.len(), 1);
    }

    #[test]
    fn test_null_author_gets_placeholder() {
        let mut feed = MessageFeed::new();
        feed.on_inbound_frame(r#"{"author": null, "message": "hey"}"#);
        assert_eq!(feed.snapshot()[0].author, ANONYMOUS_AUTHOR);
    }

    #[test]
    fn test_body_is_stored_unescaped() {
        let mut feed = MessageFeed::new();
        feed.on_inbound_frame(&frame("a", "<b>bold</b>"));
        assert_eq!(feed.snapshot()[0].body, "<b>bold</b>");
    }

    #[test]
    fn test_missing_keys_are_dropped() {
        let mut feed = MessageFeed::new();
        feed.on_inbound_frame(&frame("a", "keep"));
        let before = feed.snapshot();

        assert!(feed.on_inbound_frame(r#"{"message": "no author"}"#).is_none());
        assert!(feed.on_inbound_frame(r#"{"author": "no message"}"#).is_none());
        assert!(feed.on_inbound_frame(r#"{"type": "pong"}"#).is_none());

        assert_eq!(feed.snapshot(), before);
    }

    #[test]
    fn test_non_json_and_non_object_dropped() {
        let mut feed = MessageFeed::new();
        assert!(feed.on_inbound_frame("not json at all").is_none());
        assert!(feed.on_inbound_frame("[1, 2, 3]").is_none());
        assert!(feed.on_inbound_frame("\"author message\"").is_none());
        assert!(feed.is_empty());
    }

    #[test]
    fn test_parse_frame_reasons() {
        assert_eq!(parse_frame("{"), Err(Rejected::NotJson));
        assert_eq!(parse_frame("42"), Err(Rejected::NotAnObject));
        assert_eq!(parse_frame(r#"{"message":"m"}"#), Err(Rejected::MissingAuthor));
        assert_eq!(parse_frame(r#"{"author":"a"}"#), Err(Rejected::MissingMessage));
        assert_eq!(
            parse_frame(r#"{"author":"a","message":null}"#),
            Err(Rejected::NullMessage)
        );
    }

    #[test]
    fn test_non_string_values_use_json_text() {
        assert_eq!(
            parse_frame(r#"{"author": 7, "message": 12.5}"#),
            Ok(("7".to_string(), "12.5".to_string()))
        );
    }

    #[test]
    fn test_capacity_keeps_last_hundred_in_order() {
        let mut feed = MessageFeed::new();
        for i in 0..250 {
            feed.on_inbound_frame(&frame("a", &i.to_string()));
        }
        let snap = feed.snapshot();
        assert_eq!(snap.len(), FEED_CAPACITY);
        let bodies: Vec<String> = snap.iter().map(|m| m.body.clone()).collect();
        let expected: Vec<String> = (150..250).map(|i: i32| i.to_string()).collect();
        assert_eq!(bodies, expected);
        assert_eq!(snap[0].seq, 150);
    }

    #[test]
    fn test_visible_is_last_fifty() {
        let mut feed = MessageFeed::new();
        for i in 0..80 {
            feed.on_inbound_frame(&frame("a", &i.to_string()));
        }
        let visible: Vec<&Message> = feed.visible().collect();
        assert_eq!(visible.len(), DISPLAY_LIMIT);
        assert_eq!(visible[0].body, "30");
        assert_eq!(visible[DISPLAY_LIMIT - 1].body, "79");
        // retention is independent of the display bound
        assert_eq!(feed.len(), 80);
    }

    #[test]
    fn test_latest_with_fewer_messages_than_limit() {
        let mut feed = MessageFeed::new();
        feed.on_inbound_frame(&frame("a", "only"));
        assert_eq!(feed.latest(10).count(), 1);
    }

    #[test]
    fn test_zero_capacity_is_clamped() {
        let mut feed = MessageFeed::with_capacity(0);
        feed.on_inbound_frame(&frame("a", "1"));
        feed.on_inbound_frame(&frame("a", "2"));
        assert_eq!(feed.capacity(), 1);
        assert_eq!(feed.snapshot()[0].body, "2");
    }
}
