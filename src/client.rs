//! WebSocket transport over `tokio-tungstenite`.
//!
//! The stream is split into a writer task fed by an unbounded channel and a reader
//! task that forwards text frames to the caller. Both tasks clear the shared
//! open flag when the connection ends, which is what the gateway checks before
//! every send.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use futures_util::stream::{SplitSink, SplitStream};
use futures_util::{SinkExt, StreamExt};
use tokio::net::TcpStream;
use tokio::sync::mpsc;
use tokio_tungstenite::tungstenite::Message as WsMessage;
use tokio_tungstenite::{connect_async, MaybeTlsStream, WebSocketStream};
use tracing::{debug, info, warn};
use url::Url;

use crate::error::{GatewayError, Result, TidiError};
use crate::gateway::Transport;

type WsStream = WebSocketStream<MaybeTlsStream<TcpStream>>;

/// Cloneable handle on one relay connection.
#[derive(Debug, Clone)]
pub struct WsTransport {
    tx: mpsc::UnboundedSender<WsMessage>,
    open: Arc<AtomicBool>,
}

impl WsTransport {
    /// Ask the writer to send a close frame and stop. Later sends are dropped.
    pub fn close(&self) {
        if self.open.swap(false, Ordering::SeqCst) {
            let _ = self.tx.send(WsMessage::Close(None));
        }
    }
}

impl Transport for WsTransport {
    fn is_open(&self) -> bool {
        self.open.load(Ordering::SeqCst)
    }

    fn send_text(&self, frame: String) -> std::result::Result<(), GatewayError> {
        self.tx
            .send(WsMessage::Text(frame))
            .map_err(|e| GatewayError::Send(e.to_string()))
    }
}

/// Check that `raw` is a `ws://` or `wss://` URL.
pub fn parse_relay_url(raw: &str) -> Result<Url> {
    let url = Url::parse(raw).map_err(|e| TidiError::InvalidUrl(format!("{raw}: {e}")))?;
    match url.scheme() {
        "ws" | "wss" => Ok(url),
        other => Err(TidiError::InvalidUrl(format!(
            "{raw}: unsupported scheme '{other}', expected ws or wss"
        ))),
    }
}

/// Connect to the relay.
///
/// Returns the transport handle and a receiver yielding every inbound text
/// frame in arrival order. The receiver ends when the connection closes.
pub async fn connect(
    raw_url: &str,
    timeout: Duration,
) -> Result<(WsTransport, mpsc::UnboundedReceiver<String>)> {
    let url = parse_relay_url(raw_url)?;

    let (ws_stream, _response) = tokio::time::timeout(timeout, connect_async(url.as_str()))
        .await
        .map_err(|_| TidiError::ConnectTimeout(url.to_string()))??;
    info!(relay = %url, "connected");

    let (write, read) = ws_stream.split();
    let (outgoing_tx, outgoing_rx) = mpsc::unbounded_channel::<WsMessage>();
    let (incoming_tx, incoming_rx) = mpsc::unbounded_channel::<String>();
    let open = Arc::new(AtomicBool::new(true));

    tokio::spawn(writer_task(write, outgoing_rx, open.clone()));
    tokio::spawn(reader_task(read, incoming_tx, open.clone()));

    Ok((
        WsTransport {
            tx: outgoing_tx,
            open,
        },
        incoming_rx,
    ))
}

async fn writer_task(
    mut write: SplitSink<WsStream, WsMessage>,
    mut rx: mpsc::UnboundedReceiver<WsMessage>,
    open: Arc<AtomicBool>,
) {
    while let Some(message) = rx.recv().await {
        let is_close = matches!(message, WsMessage::Close(_));
        if let Err(e) = write.send(message).await {
            warn!(error = %e, "relay write failed");
            break;
        }
        if is_close {
            break;
        }
    }
    open.store(false, Ordering::SeqCst);
    let _ = write.close().await;
    debug!("writer task finished");
}

async fn reader_task(
    mut read: SplitStream<WsStream>,
    tx: mpsc::UnboundedSender<String>,
    open: Arc<AtomicBool>,
) {
    while let Some(result) = read.next().await {
        match result {
            Ok(WsMessage::Text(text)) => {
                if tx.send(text).is_err() {
                    break;
                }
            }
            Ok(WsMessage::Close(frame)) => {
                debug!(?frame, "relay closed the connection");
                break;
            }
            // binary, ping and pong frames carry no chat traffic
            Ok(_) => {}
            Err(e) => {
                warn!(error = %e, "relay read failed");
                break;
            }
        }
    }
    open.store(false, Ordering::SeqCst);
    debug!("reader task finished");
}
