//! A chat session: one relay connection, one current room, one local user.
//!
//! The session owns every piece of per-connection state (gateway, feed, send
//! guard, settings, draft, visibility) and is built explicitly by whoever drives
//! the UI. Deferred work is tied to the session through [`TaskScope`]s, so
//! dropping the session cancels pending sends and scroll hints.

use std::sync::{Arc, Mutex};
use std::time::Duration;

use tokio::sync::mpsc;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::config::ClientConfig;
use crate::emoji::{expand_shortcodes, Draft};
use crate::error::{GatewayError, Result};
use crate::feed::{Message, MessageFeed, DISPLAY_LIMIT};
use crate::gateway::{deliver, encode_publish, ChatPayload, ConnectionGateway, InboundHandler, Transport};
use crate::identity::Identity;
use crate::rate_limit::{now_ms, OutgoingRateLimiter};
use crate::room_key::{resolve, RoomId};
use crate::scheduler::TaskScope;
use crate::settings::{SettingsStore, ROOM_KEY, USERNAME};

/// Notifications for the rendering layer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UiEvent {
    /// A message was added to the feed.
    Appended { seq: u64 },
    /// The feed has settled; show the newest messages.
    ScrollToLatest,
}

/// Result of committing a settings input.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Commit {
    /// Empty input, nothing changed.
    Ignored,
    /// The username was fixed when the session was created.
    Locked,
    RoomChanged(RoomId),
    UsernameChanged(String),
}

/// Result of submitting a message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Submit {
    Empty,
    /// Same text as the last send, inside the cool-down.
    Duplicate,
    /// The publish frame will leave after the send delay.
    Scheduled { topic: RoomId, text: String },
    /// The deferred send could not be scheduled (session shut down, or no tokio
    /// runtime). Nothing was recorded by the send guard.
    Dropped,
}

/// Inbound handler feeding the shared [`MessageFeed`].
///
/// Owns the scroll timers: replacing or dropping the handler cancels them.
struct FeedHandler {
    feed: Arc<Mutex<MessageFeed>>,
    ui_tx: mpsc::UnboundedSender<UiEvent>,
    scroll_delay: Duration,
    scrolls: TaskScope,
}

impl InboundHandler for FeedHandler {
    fn on_frame(&mut self, raw: &str) {
        let seq = match self.feed.lock() {
            Ok(mut feed) => feed.on_inbound_frame(raw).map(|m| m.seq),
            Err(_) => {
                warn!("feed lock poisoned, dropping frame");
                None
            }
        };
        let Some(seq) = seq else {
            return;
        };
        let _ = self.ui_tx.send(UiEvent::Appended { seq });

        let ui_tx = self.ui_tx.clone();
        self.scrolls.schedule(self.scroll_delay, async move {
            // the renderer may already be gone
            let _ = ui_tx.send(UiEvent::ScrollToLatest);
        });
    }
}

pub struct ChatSession<T: Transport, S: SettingsStore> {
    id: Uuid,
    config: ClientConfig,
    gateway: ConnectionGateway<T>,
    feed: Arc<Mutex<MessageFeed>>,
    limiter: OutgoingRateLimiter,
    settings: S,
    identity: Identity,
    username_locked: bool,
    draft: Draft,
    visible: bool,
    settings_open: bool,
    sends: TaskScope,
}

impl<T: Transport, S: SettingsStore> ChatSession<T, S> {
    /// Build a session over `transport`.
    ///
    /// A non-empty `preset_username` wins over the stored one, is written back to
    /// the store, and cannot be changed for the lifetime of the session. The stored
    /// room key, if any, becomes the current room without anything being sent.
    pub fn new(
        config: ClientConfig,
        transport: T,
        mut settings: S,
        preset_username: Option<String>,
        ui_tx: mpsc::UnboundedSender<UiEvent>,
    ) -> Self {
        let preset = preset_username.filter(|u| !u.is_empty());
        let username_locked = preset.is_some();
        let username = match preset {
            Some(user) => {
                if let Err(e) = settings.set(USERNAME, &user) {
                    warn!(error = %e, "could not store username");
                }
                user
            }
            None => settings.get(USERNAME).unwrap_or_default(),
        };

        let feed = Arc::new(Mutex::new(MessageFeed::with_capacity(config.feed_capacity)));
        let mut gateway = ConnectionGateway::new(transport);
        gateway.set_inbound_handler(FeedHandler {
            feed: feed.clone(),
            ui_tx,
            scroll_delay: config.scroll_delay,
            scrolls: TaskScope::new(),
        });
        if let Some(key) = settings.get(ROOM_KEY) {
            gateway.set_current_room(resolve(Some(&key)));
        }

        let id = Uuid::new_v4();
        debug!(session = %id, user = %username, "session created");

        Self {
            id,
            limiter: OutgoingRateLimiter::new(config.duplicate_window_ms),
            config,
            gateway,
            feed,
            settings,
            identity: Identity::new(username),
            username_locked,
            draft: Draft::new(),
            visible: true,
            settings_open: false,
            sends: TaskScope::new(),
        }
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    pub fn identity(&self) -> &Identity {
        &self.identity
    }

    pub fn username_locked(&self) -> bool {
        self.username_locked
    }

    pub fn current_room(&self) -> Option<RoomId> {
        self.gateway.current_room()
    }

    /// The raw room key as last committed.
    pub fn room_key(&self) -> Option<String> {
        self.settings.get(ROOM_KEY)
    }

    pub fn is_connected(&self) -> bool {
        self.gateway.is_open()
    }

    // -- settings inputs -----------------------------------------------------

    /// Commit a room key: store it, leave the previous room, join the new one.
    ///
    /// Send failures are logged, not returned; only a settings write can fail.
    pub fn commit_room_key(&mut self, raw: &str) -> Result<Commit> {
        if raw.is_empty() {
            return Ok(Commit::Ignored);
        }
        self.settings.set(ROOM_KEY, raw)?;
        let room = resolve(Some(raw));
        if let Err(e) = self.gateway.switch_room(room) {
            warn!(session = %self.id, %room, error = %e, "subscribe not sent");
        }
        info!(session = %self.id, %room, "room changed");
        Ok(Commit::RoomChanged(room))
    }

    pub fn commit_username(&mut self, raw: &str) -> Result<Commit> {
        if self.username_locked {
            return Ok(Commit::Locked);
        }
        if raw.is_empty() {
            return Ok(Commit::Ignored);
        }
        self.settings.set(USERNAME, raw)?;
        self.identity.username = raw.to_string();
        Ok(Commit::UsernameChanged(raw.to_string()))
    }

    /// Subscribe to the current room again (the "connect" control).
    pub fn connect(&mut self) -> std::result::Result<RoomId, GatewayError> {
        self.gateway.subscribe_current()?;
        Ok(self.gateway.publish_topic())
    }

    // -- composing and sending -----------------------------------------------

    pub fn draft(&self) -> &Draft {
        &self.draft
    }

    /// Append the picker emoji at `index` to the draft.
    pub fn push_emoji(&mut self, index: usize) -> bool {
        self.draft.push_emoji(index)
    }

    /// Submit `line` (appended to the current draft) at the current time.
    pub fn submit(&mut self, line: &str) -> Result<Submit> {
        self.submit_at(line, now_ms())
    }

    /// Submit `line` as if Enter was pressed at `now_ms`.
    ///
    /// The draft is cleared whatever the outcome. An accepted message is recorded
    /// by the send guard as soon as its send is scheduled and handed to the socket
    /// after the send delay.
    pub fn submit_at(&mut self, line: &str, now_ms: u64) -> Result<Submit> {
        self.draft.push_str(line);
        let text = expand_shortcodes(&self.draft.take());
        if text.is_empty() {
            return Ok(Submit::Empty);
        }
        if !self.limiter.should_send(&text, now_ms) {
            debug!(session = %self.id, "duplicate message suppressed");
            return Ok(Submit::Duplicate);
        }

        let topic = self.gateway.publish_topic();
        let payload = ChatPayload {
            author: self.identity.username.clone(),
            message: text.clone(),
        };
        let frame = encode_publish(topic, &payload)?;
        let transport = self.gateway.transport().clone();
        let scheduled = self.sends.schedule(self.config.send_delay, async move {
            // delivery problems are already logged by `deliver`
            let _ = deliver(&transport, frame);
        });
        if !scheduled {
            warn!(session = %self.id, %topic, "send not scheduled, message dropped");
            return Ok(Submit::Dropped);
        }
        self.limiter.record_sent(&text, now_ms);
        Ok(Submit::Scheduled { topic, text })
    }

    // -- inbound -------------------------------------------------------------

    /// Feed one inbound frame through the gateway's handler.
    pub fn handle_inbound(&mut self, raw: &str) {
        self.gateway.dispatch_inbound(raw);
    }

    /// Every retained message, oldest first.
    pub fn snapshot(&self) -> Vec<Message> {
        self.feed.lock().map(|f| f.snapshot()).unwrap_or_default()
    }

    /// The messages to display, oldest first.
    pub fn visible_messages(&self) -> Vec<Message> {
        self.feed
            .lock()
            .map(|f| f.latest(DISPLAY_LIMIT).cloned().collect())
            .unwrap_or_default()
    }

    /// Displayable messages newer than `seq`.
    pub fn messages_after(&self, seq: Option<u64>) -> Vec<Message> {
        self.visible_messages()
            .into_iter()
            .filter(|m| seq.map_or(true, |s| m.seq > s))
            .collect()
    }

    // -- view state ----------------------------------------------------------

    pub fn is_visible(&self) -> bool {
        self.visible
    }

    pub fn set_visible(&mut self, visible: bool) {
        self.visible = visible;
    }

    pub fn toggle_visible(&mut self) -> bool {
        self.visible = !self.visible;
        self.visible
    }

    pub fn settings_open(&self) -> bool {
        self.settings_open
    }

    pub fn toggle_settings(&mut self) -> bool {
        self.settings_open = !self.settings_open;
        self.settings_open
    }

    /// `<room id>|<username>`, as shown at the top of the settings panel.
    pub fn settings_summary(&self) -> String {
        let room = resolve(self.room_key().as_deref());
        format!("{}|{}", room, self.identity.username)
    }

    /// Deferred sends still waiting for their delay.
    pub fn pending_sends(&self) -> usize {
        self.sends.pending()
    }

    /// Cancel deferred work and stop listening for inbound frames.
    pub fn shutdown(&mut self) {
        self.sends.shutdown();
        self.gateway.clear_inbound_handler();
        debug!(session = %self.id, "session shut down");
    }
}
