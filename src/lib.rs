//! tidi-chat: a small chat client for WebSocket pub/sub relays.
//!
//! Rooms are named by free-form room keys (or Twitter space links) hashed into
//! numeric topics; messages travel as JSON frames through a relay that fans them
//! out to every subscriber of the topic. The [`session::ChatSession`] ties the
//! pieces together; the binary in `main.rs` drives it from a terminal.

pub mod cli;
pub mod client;
pub mod config;
pub mod emoji;
pub mod error;
pub mod feed;
pub mod gateway;
pub mod identity;
pub mod rate_limit;
pub mod render;
pub mod room_key;
pub mod sanitize;
pub mod scheduler;
pub mod session;
pub mod settings;

pub use error::{GatewayError, Result, TidiError};
pub use room_key::{resolve, RoomId};
pub use session::{ChatSession, Commit, Submit, UiEvent};
