//! End-to-end tests over a real WebSocket: two sessions talking through a tiny
//! in-process pub/sub relay.

use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use futures_util::{SinkExt, StreamExt};
use tidi_chat::client::{self, WsTransport};
use tidi_chat::config::ClientConfig;
use tidi_chat::gateway::{Action, OutboundFrame, Transport};
use tidi_chat::settings::MemorySettingsStore;
use tidi_chat::{ChatSession, UiEvent};
use tokio::net::TcpListener;
use tokio::sync::mpsc;
use tokio_tungstenite::tungstenite::Message as WsMessage;

type Subscribers = Arc<Mutex<HashMap<String, Vec<(usize, mpsc::UnboundedSender<String>)>>>>;

/// Start a relay that forwards the `message` of every publish to each
/// subscriber of the topic. Returns the relay URL.
async fn start_relay() -> String {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let port = listener.local_addr().unwrap().port();
    let subs: Subscribers = Arc::new(Mutex::new(HashMap::new()));

    tokio::spawn(async move {
        let mut next_id = 0usize;
        while let Ok((stream, _)) = listener.accept().await {
            let id = next_id;
            next_id += 1;
            let subs = subs.clone();
            tokio::spawn(async move {
                let ws = tokio_tungstenite::accept_async(stream).await.unwrap();
                let (mut sink, mut stream) = ws.split();
                let (tx, mut rx) = mpsc::unbounded_channel::<String>();
                tokio::spawn(async move {
                    while let Some(text) = rx.recv().await {
                        if sink.send(WsMessage::Text(text)).await.is_err() {
                            break;
                        }
                    }
                });
                while let Some(Ok(WsMessage::Text(text))) = stream.next().await {
                    let Ok(frame) = serde_json::from_str::<OutboundFrame>(&text) else {
                        continue;
                    };
                    let mut guard = subs.lock().unwrap();
                    match frame.action {
                        Action::Subscribe => {
                            guard.entry(frame.topic).or_default().push((id, tx.clone()));
                        }
                        Action::Unsubscribe => {
                            if let Some(list) = guard.get_mut(&frame.topic) {
                                list.retain(|(sub, _)| *sub != id);
                            }
                        }
                        Action::Publish => {
                            let Some(message) = frame.message else { continue };
                            let mut sent = HashSet::new();
                            for (sub, out) in guard.get(&frame.topic).into_iter().flatten() {
                                if sent.insert(*sub) {
                                    let _ = out.send(message.clone());
                                }
                            }
                        }
                    }
                }
            });
        }
    });

    format!("ws://127.0.0.1:{port}/socket")
}

struct Peer {
    session: ChatSession<WsTransport, MemorySettingsStore>,
    inbound: mpsc::UnboundedReceiver<String>,
    _ui: mpsc::UnboundedReceiver<UiEvent>,
}

async fn peer(url: &str, user: &str) -> Peer {
    let config = ClientConfig::default().with_relay_url(url);
    let (transport, inbound) = client::connect(&config.relay_url, Duration::from_secs(5))
        .await
        .unwrap();
    assert!(transport.is_open());
    let (tx, ui) = mpsc::unbounded_channel();
    let session = ChatSession::new(
        config,
        transport,
        MemorySettingsStore::new(),
        Some(user.to_string()),
        tx,
    );
    Peer {
        session,
        inbound,
        _ui: ui,
    }
}

/// Pump inbound frames into the session until `want` messages are in the feed.
async fn wait_for_messages(peer: &mut Peer, want: usize) {
    let deadline = tokio::time::Instant::now() + Duration::from_secs(5);
    while peer.session.snapshot().len() < want {
        let frame = tokio::time::timeout_at(deadline, peer.inbound.recv())
            .await
            .expect("timed out waiting for relay traffic")
            .expect("relay closed");
        peer.session.handle_inbound(&frame);
    }
}

#[tokio::test]
async fn test_message_reaches_peer_in_same_room() {
    let url = start_relay().await;
    let mut alice = peer(&url, "alice").await;
    let mut bob = peer(&url, "bob").await;

    alice
        .session
        .commit_room_key("https://twitter.com/x/spaces/1abcXYZ?s=20")
        .unwrap();
    bob.session.commit_room_key("1abcXYZ").unwrap();
    // let both subscriptions land before publishing
    tokio::time::sleep(Duration::from_millis(100)).await;

    alice.session.submit("hello bob :wave:").unwrap();
    wait_for_messages(&mut bob, 1).await;

    let msg = &bob.session.snapshot()[0];
    assert_eq!(msg.author, "alice");
    assert_eq!(msg.body, "hello bob 👋");
}

#[tokio::test]
async fn test_room_switch_stops_delivery() {
    let url = start_relay().await;
    let mut alice = peer(&url, "alice").await;
    let mut bob = peer(&url, "bob").await;

    alice.session.commit_room_key("lobby").unwrap();
    bob.session.commit_room_key("lobby").unwrap();
    tokio::time::sleep(Duration::from_millis(100)).await;
    bob.session.commit_room_key("elsewhere").unwrap();
    tokio::time::sleep(Duration::from_millis(100)).await;

    alice.session.submit("anyone here?").unwrap();
    // alice is subscribed too and receives her own message
    wait_for_messages(&mut alice, 1).await;

    let got = tokio::time::timeout(Duration::from_millis(500), bob.inbound.recv()).await;
    assert!(got.is_err(), "bob left the room and must not receive messages");
}
