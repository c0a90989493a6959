//! The single relay connection: subscribe / unsubscribe / publish and one inbound
//! handler slot.
//!
//! ## Wire format
//! Every outbound frame is one JSON text frame:
//! `{"action": "subscribe"|"unsubscribe"|"publish", "topic": "<room id>", "message"?: "<json>"}`
//! where `message` (publish only) is itself the JSON encoding of
//! `{"author": ..., "message": ...}`.
//!
//! ## Delivery
//! Fire-and-forget. Nothing is acknowledged, retried or queued: a frame sent
//! while the socket is not open is dropped, logged, and reported as
//! [`GatewayError::NotOpen`], which callers are free to ignore.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::error::GatewayError;
use crate::room_key::RoomId;

// ---------------------------------------------------------------------------
// Wire types
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Action {
    Subscribe,
    Unsubscribe,
    Publish,
}

impl std::fmt::Display for Action {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Action::Subscribe => write!(f, "subscribe"),
            Action::Unsubscribe => write!(f, "unsubscribe"),
            Action::Publish => write!(f, "publish"),
        }
    }
}

/// One outbound relay frame.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OutboundFrame {
    pub action: Action,
    pub topic: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

/// The chat payload carried (JSON-encoded) in a publish frame.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatPayload {
    pub author: String,
    pub message: String,
}

/// Serialize one outbound frame.
pub fn encode_frame(
    action: Action,
    topic: RoomId,
    message: Option<String>,
) -> Result<String, GatewayError> {
    let frame = OutboundFrame {
        action,
        topic: topic.topic(),
        message,
    };
    serde_json::to_string(&frame).map_err(|e| GatewayError::Encode(e.to_string()))
}

/// Serialize a publish frame for `payload` on `topic`.
pub fn encode_publish(topic: RoomId, payload: &ChatPayload) -> Result<String, GatewayError> {
    let inner = serde_json::to_string(payload).map_err(|e| GatewayError::Encode(e.to_string()))?;
    encode_frame(Action::Publish, topic, Some(inner))
}

// ---------------------------------------------------------------------------
// Transport
// ---------------------------------------------------------------------------

/// The socket underneath the gateway.
///
/// Handles are cheap clones of one connection so deferred sends can hold their
/// own copy.
pub trait Transport: Clone + Send + Sync + 'static {
    fn is_open(&self) -> bool;
    fn send_text(&self, frame: String) -> Result<(), GatewayError>;
}

/// Hand `frame` to `transport` if it is open, otherwise drop it with a warning.
pub fn deliver<T: Transport>(transport: &T, frame: String) -> Result<(), GatewayError> {
    if !transport.is_open() {
        warn!(frame_len = frame.len(), "socket not open, dropping frame");
        return Err(GatewayError::NotOpen);
    }
    transport.send_text(frame).inspect_err(|e| {
        warn!(error = %e, "send failed");
    })
}

/// In-process transport that records every frame. Used by tests and by embedders
/// that drive the session without a network.
#[derive(Debug, Clone)]
pub struct MemoryTransport {
    sent: Arc<Mutex<Vec<String>>>,
    open: Arc<AtomicBool>,
}

impl Default for MemoryTransport {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryTransport {
    /// An open transport with nothing sent.
    pub fn new() -> Self {
        Self {
            sent: Arc::new(Mutex::new(Vec::new())),
            open: Arc::new(AtomicBool::new(true)),
        }
    }

    pub fn set_open(&self, open: bool) {
        self.open.store(open, Ordering::SeqCst);
    }

    /// Every frame sent so far, oldest first.
    pub fn sent_frames(&self) -> Vec<String> {
        self.sent.lock().map(|g| g.clone()).unwrap_or_default()
    }

    /// Sent frames decoded back into [`OutboundFrame`]s; undecodable frames skipped.
    pub fn sent_decoded(&self) -> Vec<OutboundFrame> {
        self.sent_frames()
            .iter()
            .filter_map(|f| serde_json::from_str(f).ok())
            .collect()
    }
}

impl Transport for MemoryTransport {
    fn is_open(&self) -> bool {
        self.open.load(Ordering::SeqCst)
    }

    fn send_text(&self, frame: String) -> Result<(), GatewayError> {
        let mut guard = self
            .sent
            .lock()
            .map_err(|_| GatewayError::Send("internal: lock poisoned".to_string()))?;
        guard.push(frame);
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Inbound handler slot
// ---------------------------------------------------------------------------

/// Receives every inbound text frame.
pub trait InboundHandler: Send {
    fn on_frame(&mut self, raw: &str);
}

impl<F> InboundHandler for F
where
    F: FnMut(&str) + Send,
{
    fn on_frame(&mut self, raw: &str) {
        self(raw)
    }
}

// ---------------------------------------------------------------------------
// Gateway
// ---------------------------------------------------------------------------

pub struct ConnectionGateway<T: Transport> {
    transport: T,
    current_room: Option<RoomId>,
    inbound: Option<Box<dyn InboundHandler>>,
}

impl<T: Transport> ConnectionGateway<T> {
    pub fn new(transport: T) -> Self {
        Self {
            transport,
            current_room: None,
            inbound: None,
        }
    }

    /// Install the inbound handler, dropping whichever one was installed before.
    pub fn set_inbound_handler<H>(&mut self, handler: H)
    where
        H: InboundHandler + 'static,
    {
        self.inbound = Some(Box::new(handler));
    }

    /// Remove the inbound handler. Later frames are ignored.
    pub fn clear_inbound_handler(&mut self) {
        self.inbound = None;
    }

    /// Pass one inbound frame to the handler. Returns `false` if none is installed.
    pub fn dispatch_inbound(&mut self, raw: &str) -> bool {
        match self.inbound.as_mut() {
            Some(handler) => {
                handler.on_frame(raw);
                true
            }
            None => {
                debug!("no inbound handler, frame ignored");
                false
            }
        }
    }

    pub fn is_open(&self) -> bool {
        self.transport.is_open()
    }

    /// A handle on the underlying transport, for deferred sends.
    pub fn transport(&self) -> &T {
        &self.transport
    }

    pub fn current_room(&self) -> Option<RoomId> {
        self.current_room
    }

    /// Track `room` as current without sending anything (restoring saved state).
    pub fn set_current_room(&mut self, room: RoomId) {
        self.current_room = Some(room);
    }

    /// Serialize and send one frame.
    pub fn send(
        &self,
        action: Action,
        topic: RoomId,
        message: Option<String>,
    ) -> Result<(), GatewayError> {
        let frame = encode_frame(action, topic, message)?;
        deliver(&self.transport, frame)?;
        info!(%action, %topic, "frame sent");
        Ok(())
    }

    /// Leave the current room (best effort) and subscribe to `room`.
    ///
    /// `room` becomes current even when the subscribe could not be sent, so a
    /// later [`subscribe_current`](Self::subscribe_current) retries it.
    pub fn switch_room(&mut self, room: RoomId) -> Result<(), GatewayError> {
        if let Some(previous) = self.current_room {
            if let Err(e) = self.send(Action::Unsubscribe, previous, None) {
                debug!(%previous, error = %e, "unsubscribe failed, continuing");
            }
        }
        self.current_room = Some(room);
        self.send(Action::Subscribe, room, None)
    }

    /// Subscribe to the current room again; with no room yet, room `0`.
    pub fn subscribe_current(&mut self) -> Result<(), GatewayError> {
        let room = self.current_room.unwrap_or_default();
        self.current_room = Some(room);
        self.send(Action::Subscribe, room, None)
    }

    /// Topic for publishing: the current room, or room `0` when none is set.
    pub fn publish_topic(&self) -> RoomId {
        self.current_room.unwrap_or_default()
    }

    /// Publish `payload` to the current room right away.
    pub fn publish(&self, payload: &ChatPayload) -> Result<(), GatewayError> {
        let frame = encode_publish(self.publish_topic(), payload)?;
        deliver(&self.transport, frame)
    }
}
