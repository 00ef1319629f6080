#![allow(clippy::unwrap_used)]
#![allow(clippy::expect_used)]
#![allow(clippy::panic)]

use std::sync::Arc;
use std::time::Duration;

use futures_util::{SinkExt, StreamExt};
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_tungstenite::tungstenite::protocol::frame::coding::CloseCode;
use tokio_tungstenite::tungstenite::protocol::CloseFrame;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{accept_async, WebSocketStream};

use fishpi_client::bus::{handler_fn, Event, EventBus, EventTag};
use fishpi_client::transport::{SessionOptions, SessionState, WebsocketSession};
use fishpi_core::error::FishPiError;

type Peer = WebSocketStream<TcpStream>;

/// Accepts websocket upgrades and hands each peer to the test.
struct Server {
    url: String,
    peers: mpsc::UnboundedReceiver<Peer>,
    task: JoinHandle<()>,
}

impl Server {
    async fn bind() -> Self {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let url = format!("ws://{}/chat-room-channel?apiKey=secret", listener.local_addr().unwrap());
        let (tx, peers) = mpsc::unbounded_channel();
        let task = tokio::spawn(async move {
            while let Ok((stream, _)) = listener.accept().await {
                if let Ok(ws) = accept_async(stream).await {
                    let _ = tx.send(ws);
                }
            }
        });
        Self { url, peers, task }
    }

    async fn next_peer(&mut self) -> Peer {
        tokio::time::timeout(Duration::from_secs(5), self.peers.recv())
            .await
            .expect("no client connected")
            .unwrap()
    }
}

/// Every lifecycle and message event, in publish order per tag.
fn watch(bus: &EventBus) -> mpsc::UnboundedReceiver<Event> {
    let (tx, rx) = mpsc::unbounded_channel();
    let h = handler_fn(move |ev| {
        let tx = tx.clone();
        async move {
            let _ = tx.send(ev);
        }
    });
    for tag in [
        EventTag::WsConnected,
        EventTag::WsClosed,
        EventTag::WsReconnectedFail,
        EventTag::WsMsg,
    ] {
        bus.subscribe(tag, h.clone());
    }
    rx
}

async fn next_event(rx: &mut mpsc::UnboundedReceiver<Event>) -> Event {
    tokio::time::timeout(Duration::from_secs(5), rx.recv())
        .await
        .expect("no event")
        .unwrap()
}

fn session(url: &str, bus: &Arc<EventBus>) -> WebsocketSession {
    let opts = SessionOptions::new(url).reconnect_interval(Duration::from_millis(50));
    WebsocketSession::new(opts, bus.clone())
}

async fn next_text(peer: &mut Peer) -> String {
    loop {
        let msg = tokio::time::timeout(Duration::from_secs(5), peer.next())
            .await
            .expect("nothing received")
            .unwrap()
            .unwrap();
        if let Message::Text(t) = msg {
            return t;
        }
    }
}

#[tokio::test]
async fn connect_relay_and_send() {
    let mut server = Server::bind().await;
    let bus = Arc::new(EventBus::new("test"));
    let mut events = watch(&bus);
    let ws = session(&server.url, &bus);

    ws.start().await.unwrap();
    let mut peer = server.next_peer().await;
    assert_eq!(next_event(&mut events).await, Event::Connected("Websocket Connect Success".into()));
    assert_eq!(ws.state().await, SessionState::Connected);

    peer.send(Message::Text(r#"{"type":"online"}"#.into())).await.unwrap();
    match next_event(&mut events).await {
        Event::Message(raw) => assert_eq!(&raw[..], br#"{"type":"online"}"#),
        other => panic!("unexpected {other:?}"),
    }

    bus.publish(Event::Send("-hb-".into()));
    assert_eq!(next_text(&mut peer).await, "-hb-");
    ws.send("direct").await.unwrap();
    assert_eq!(next_text(&mut peer).await, "direct");

    ws.stop().await.unwrap();
}

#[tokio::test]
async fn start_twice_is_rejected() {
    let mut server = Server::bind().await;
    let bus = Arc::new(EventBus::new("test"));
    let ws = session(&server.url, &bus);
    ws.start().await.unwrap();
    let _peer = server.next_peer().await;

    assert!(matches!(ws.start().await, Err(FishPiError::AlreadyConnected)));
    ws.stop().await.unwrap();
}

#[tokio::test]
async fn idle_session_cannot_send_or_stop() {
    let bus = Arc::new(EventBus::new("test"));
    let ws = session("ws://127.0.0.1:9/", &bus);
    assert_eq!(ws.state().await, SessionState::Disconnected);
    assert!(matches!(ws.send("x").await, Err(FishPiError::NotConnected)));
    assert!(matches!(ws.stop().await, Err(FishPiError::NotConnected)));
}

#[tokio::test]
async fn failed_first_dial_is_returned() {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let url = format!("ws://{}/", listener.local_addr().unwrap());
    drop(listener);

    let bus = Arc::new(EventBus::new("test"));
    let ws = session(&url, &bus);
    assert!(matches!(ws.start().await, Err(FishPiError::Transport(_))));
    assert_eq!(ws.state().await, SessionState::Disconnected);
}

#[tokio::test]
async fn peer_close_is_reported_then_reconnects() {
    let mut server = Server::bind().await;
    let bus = Arc::new(EventBus::new("test"));
    let mut events = watch(&bus);
    let ws = session(&server.url, &bus);

    ws.start().await.unwrap();
    let mut peer = server.next_peer().await;
    next_event(&mut events).await;

    peer.close(Some(CloseFrame {
        code: CloseCode::Normal,
        reason: "bye".into(),
    }))
    .await
    .unwrap();

    match next_event(&mut events).await {
        Event::Closed(text) => {
            assert!(text.contains("code: 1000"), "{text}");
            assert!(text.contains("text: bye"), "{text}");
            assert!(text.contains("apiKey=***"), "{text}");
            assert!(!text.contains("secret"), "{text}");
        }
        other => panic!("unexpected {other:?}"),
    }

    let _again = server.next_peer().await;
    assert_eq!(next_event(&mut events).await, Event::Connected("Websocket Connect Success".into()));
    assert_eq!(bus.metrics().reconnects.get(&[("result", "ok")]), 1);
    ws.stop().await.unwrap();
}

#[tokio::test]
async fn gives_up_after_max_retries() {
    let mut server = Server::bind().await;
    let bus = Arc::new(EventBus::new("test"));
    let mut events = watch(&bus);
    let opts = SessionOptions::new(server.url.clone())
        .reconnect_interval(Duration::from_millis(20))
        .max_retries(2);
    let ws = WebsocketSession::new(opts, bus.clone());

    ws.start().await.unwrap();
    let peer = server.next_peer().await;
    next_event(&mut events).await;

    // take the whole server down
    server.task.abort();
    let _ = (&mut server.task).await;
    drop(peer);

    for _ in 0..2 {
        match next_event(&mut events).await {
            Event::ReconnectFailed(text) => assert!(text.starts_with("Websocket Reconnected failed"), "{text}"),
            other => panic!("unexpected {other:?}"),
        }
    }
    assert!(tokio::time::timeout(Duration::from_millis(200), events.recv()).await.is_err());
    assert_eq!(ws.state().await, SessionState::Disconnected);
    assert_eq!(bus.metrics().reconnects.get(&[("result", "err")]), 2);
}

#[tokio::test]
async fn stop_prevents_reconnect() {
    let mut server = Server::bind().await;
    let bus = Arc::new(EventBus::new("test"));
    let ws = session(&server.url, &bus);

    ws.start().await.unwrap();
    let mut peer = server.next_peer().await;
    ws.stop().await.unwrap();
    assert_eq!(ws.state().await, SessionState::Disconnected);

    // the client closes its side
    let end = tokio::time::timeout(Duration::from_secs(5), peer.next()).await.unwrap();
    assert!(matches!(end, None | Some(Ok(Message::Close(_))) | Some(Err(_))));

    assert!(tokio::time::timeout(Duration::from_millis(200), server.peers.recv()).await.is_err());
}

#[tokio::test]
async fn stop_during_pending_reconnect_cancels_it() {
    let mut server = Server::bind().await;
    let bus = Arc::new(EventBus::new("test"));
    let mut events = watch(&bus);
    let opts = SessionOptions::new(server.url.clone()).reconnect_interval(Duration::from_millis(300));
    let ws = WebsocketSession::new(opts, bus.clone());

    ws.start().await.unwrap();
    let mut peer = server.next_peer().await;
    next_event(&mut events).await;

    peer.close(None).await.unwrap();
    assert!(matches!(next_event(&mut events).await, Event::Closed(_)));
    assert_eq!(ws.state().await, SessionState::Reconnecting);

    ws.stop().await.unwrap();
    assert!(tokio::time::timeout(Duration::from_millis(800), server.peers.recv()).await.is_err());
    assert_eq!(ws.state().await, SessionState::Disconnected);
    assert_eq!(bus.metrics().reconnects.total(), 0);
}

#[tokio::test]
async fn slow_first_dial_does_not_block_the_session() {
    // accepts TCP but never answers the upgrade
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let url = format!("ws://{}/", listener.local_addr().unwrap());
    let hold = tokio::spawn(async move {
        let mut held = Vec::new();
        while let Ok((stream, _)) = listener.accept().await {
            held.push(stream);
        }
    });

    let bus = Arc::new(EventBus::new("test"));
    let ws = session(&url, &bus);
    let dialing = tokio::spawn({
        let ws = ws.clone();
        async move { ws.start().await }
    });
    tokio::time::sleep(Duration::from_millis(100)).await;

    let quick = Duration::from_millis(500);
    assert_eq!(tokio::time::timeout(quick, ws.state()).await.unwrap(), SessionState::Disconnected);
    assert!(matches!(
        tokio::time::timeout(quick, ws.send("x")).await.unwrap(),
        Err(FishPiError::NotConnected)
    ));
    assert!(matches!(
        tokio::time::timeout(quick, ws.stop()).await.unwrap(),
        Err(FishPiError::NotConnected)
    ));

    dialing.abort();
    hold.abort();
}
