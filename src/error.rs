//! Crate-level error types.

use thiserror::Error;

/// Failures on the outbound send path of the connection gateway.
///
/// None of these are fatal: callers log them and carry on, the frame is simply lost.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum GatewayError {
    /// The socket is not (or no longer) open; the frame was dropped.
    #[error("socket is not open, frame dropped")]
    NotOpen,
    /// The writer task has gone away.
    #[error("send failed: {0}")]
    Send(String),
    /// The outbound frame could not be serialized.
    #[error("frame encoding failed: {0}")]
    Encode(String),
}

/// Every error the crate can surface.
#[derive(Debug, Error)]
pub enum TidiError {
    #[error(transparent)]
    Gateway(#[from] GatewayError),

    #[error("settings I/O error on {path}: {source}")]
    SettingsIo {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("settings file {path} is not valid TOML: {detail}")]
    SettingsParse { path: String, detail: String },

    #[error("settings could not be serialized: {0}")]
    SettingsSerialize(#[from] toml::ser::Error),

    #[error("WebSocket error: {0}")]
    WebSocket(#[from] tokio_tungstenite::tungstenite::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("invalid relay URL: {0}")]
    InvalidUrl(String),

    #[error("connection to {0} timed out")]
    ConnectTimeout(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result alias used across the crate.
pub type Result<T> = std::result::Result<T, TidiError>;
