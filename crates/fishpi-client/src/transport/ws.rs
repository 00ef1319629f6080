//! Reconnecting websocket session.
//!
//! One live connection at a time, split into a writer task fed by a bounded
//! outbound queue and a reader task that pushes raw frames into a bounded
//! inbound queue. A relay task drains the inbound queue onto the bus as
//! `Event::Message`, so a slow subscriber backs up the reader instead of
//! dropping frames.
//!
//! Lifecycle:
//! - `start` dials once; a failed first dial is returned to the caller
//! - a peer close publishes `Event::Closed`, any read/write failure is only
//!   logged, and both schedule a reconnect unless the session was stopped
//! - reconnect retries on a fixed delay, publishing `Event::ReconnectFailed`
//!   per failure, until it connects, the session is stopped, or the
//!   optional retry limit is hit
//! - `stop` cancels the tasks of the live connection and ends reconnecting

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Weak};
use std::time::Duration;

use async_trait::async_trait;
use bytes::Bytes;
use futures_util::stream::{SplitSink, SplitStream};
use futures_util::{SinkExt, StreamExt};
use tokio::net::TcpStream;
use tokio::sync::{mpsc, watch, Mutex};
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{connect_async, MaybeTlsStream, WebSocketStream};

use fishpi_core::error::{FishPiError, Result};

use crate::bus::{Event, EventBus, EventHandler, EventTag};
use crate::transport::codec::{decode, Inbound};
use crate::transport::mask_api_key;

type WsStream = WebSocketStream<MaybeTlsStream<TcpStream>>;

pub const OUTBOUND_QUEUE: usize = 1024;
pub const INBOUND_QUEUE: usize = 1024;

pub const CONNECTED_TEXT: &str = "Websocket Connect Success";

pub fn closed_text(code: u16, reason: &str, addr: &str) -> String {
    format!("Websocket closed: \ncode: {code}\ntext: {reason}\naddr: {addr}")
}

pub fn reconnect_failed_text(err: &str, addr: &str) -> String {
    format!("Websocket Reconnected failed\nerror: {err}\naddr: {addr}")
}

#[derive(Debug, Clone)]
pub struct SessionOptions {
    pub url: String,
    pub reconnect_interval: Duration,
    /// Consecutive failed attempts before giving up; 0 never gives up.
    pub max_retries: u32,
}

impl SessionOptions {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            reconnect_interval: Duration::from_secs(5),
            max_retries: 0,
        }
    }

    pub fn reconnect_interval(mut self, d: Duration) -> Self {
        self.reconnect_interval = d;
        self
    }

    pub fn max_retries(mut self, n: u32) -> Self {
        self.max_retries = n;
        self
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Disconnected,
    Connected,
    Reconnecting,
}

struct Connection {
    id: u64,
    out_tx: mpsc::Sender<Message>,
    cancel: watch::Sender<bool>,
}

enum Disconnect {
    Closed { code: u16, reason: String },
    Failed(String),
}

struct Inner {
    opts: SessionOptions,
    bus: Arc<EventBus>,
    /// Set by `start`, cleared by `stop` or when retries run out.
    running: AtomicBool,
    next_id: AtomicU64,
    conn: Mutex<Option<Connection>>,
    raw_tx: mpsc::Sender<Bytes>,
    raw_rx: Mutex<Option<mpsc::Receiver<Bytes>>>,
}

#[derive(Clone)]
pub struct WebsocketSession {
    inner: Arc<Inner>,
}

impl WebsocketSession {
    /// Also subscribes the session to `EventTag::WsSend` on `bus`.
    pub fn new(opts: SessionOptions, bus: Arc<EventBus>) -> Self {
        let (raw_tx, raw_rx) = mpsc::channel(INBOUND_QUEUE);
        let inner = Arc::new(Inner {
            opts,
            bus,
            running: AtomicBool::new(false),
            next_id: AtomicU64::new(0),
            conn: Mutex::new(None),
            raw_tx,
            raw_rx: Mutex::new(Some(raw_rx)),
        });
        inner
            .bus
            .subscribe(EventTag::WsSend, Arc::new(Outbound(Arc::downgrade(&inner))));
        Self { inner }
    }

    pub fn url(&self) -> &str {
        &self.inner.opts.url
    }

    /// The dial runs without holding the connection lock, so `state`,
    /// `send` and `stop` stay responsive while it is in flight.
    pub async fn start(&self) -> Result<()> {
        let inner = &self.inner;
        if inner.conn.lock().await.is_some() {
            return Err(FishPiError::AlreadyConnected);
        }
        let mut ws = inner.dial().await?;

        let mut guard = inner.conn.lock().await;
        if guard.is_some() {
            // another start won the race
            drop(guard);
            let _ = ws.close(None).await;
            return Err(FishPiError::AlreadyConnected);
        }
        inner.running.store(true, Ordering::SeqCst);
        inner.spawn_relay().await;
        *guard = Some(inner.attach(ws));
        drop(guard);

        tracing::info!(addr = %mask_api_key(&inner.opts.url), "websocket connected");
        inner.bus.publish(Event::Connected(CONNECTED_TEXT.into()));
        Ok(())
    }

    /// Stopping while a reconnect is pending succeeds and ends the retries.
    pub async fn stop(&self) -> Result<()> {
        let was_running = self.inner.running.swap(false, Ordering::SeqCst);
        let conn = self.inner.conn.lock().await.take();
        match conn {
            Some(c) => {
                let _ = c.cancel.send(true);
                tracing::info!(
                    summary = %self.inner.bus.metrics().summary(),
                    "websocket stopped"
                );
                Ok(())
            }
            None if was_running => Ok(()),
            None => Err(FishPiError::NotConnected),
        }
    }

    /// Queue one text frame. Fails fast with `NotConnected` when there is no
    /// live connection, and waits while the outbound queue is full.
    pub async fn send(&self, text: impl Into<String>) -> Result<()> {
        self.inner.send(text.into()).await
    }

    pub async fn state(&self) -> SessionState {
        if self.inner.conn.lock().await.is_some() {
            SessionState::Connected
        } else if self.inner.running.load(Ordering::SeqCst) {
            SessionState::Reconnecting
        } else {
            SessionState::Disconnected
        }
    }
}

impl Inner {
    async fn dial(&self) -> Result<WsStream> {
        let (ws, _resp) = connect_async(self.opts.url.as_str())
            .await
            .map_err(|e| FishPiError::Transport(e.to_string()))?;
        Ok(ws)
    }

    async fn send(&self, text: String) -> Result<()> {
        let tx = {
            let guard = self.conn.lock().await;
            guard.as_ref().map(|c| c.out_tx.clone())
        };
        let tx = tx.ok_or(FishPiError::NotConnected)?;
        tx.send(Message::Text(text))
            .await
            .map_err(|_| FishPiError::NotConnected)
    }

    async fn spawn_relay(&self) {
        let Some(mut rx) = self.raw_rx.lock().await.take() else {
            return;
        };
        let bus = self.bus.clone();
        tokio::spawn(async move {
            while let Some(raw) = rx.recv().await {
                bus.publish(Event::Message(raw));
            }
        });
    }

    fn attach(self: &Arc<Self>, ws: WsStream) -> Connection {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed) + 1;
        let (sink, stream) = ws.split();
        let (out_tx, out_rx) = mpsc::channel(OUTBOUND_QUEUE);
        let (cancel, cancel_rx) = watch::channel(false);

        tokio::spawn(write_loop(self.clone(), id, sink, out_rx, cancel_rx.clone()));
        tokio::spawn(read_loop(self.clone(), id, stream, cancel_rx));

        Connection { id, out_tx, cancel }
    }

    /// Called by whichever task noticed connection `id` die first.
    async fn disconnected(self: &Arc<Self>, id: u64, why: Disconnect) {
        {
            let mut guard = self.conn.lock().await;
            if !matches!(guard.as_ref(), Some(c) if c.id == id) {
                return;
            }
            if let Some(c) = guard.take() {
                let _ = c.cancel.send(true);
            }
        }

        match why {
            Disconnect::Closed { code, reason } => {
                tracing::info!(code, %reason, "websocket closed by peer");
                let addr = mask_api_key(&self.opts.url);
                self.bus
                    .publish(Event::Closed(closed_text(code, &reason, &addr)));
            }
            Disconnect::Failed(e) => {
                tracing::warn!(error = %e, "websocket connection lost");
            }
        }

        if self.running.load(Ordering::SeqCst) {
            tokio::spawn(self.clone().reconnect_loop());
        }
    }

    async fn reconnect_loop(self: Arc<Self>) {
        let addr = mask_api_key(&self.opts.url);
        let mut failures: u32 = 0;
        loop {
            tokio::time::sleep(self.opts.reconnect_interval).await;
            if !self.running.load(Ordering::SeqCst) {
                tracing::info!("reconnect cancelled");
                return;
            }

            match self.dial().await {
                Ok(mut ws) => {
                    let mut guard = self.conn.lock().await;
                    if !self.running.load(Ordering::SeqCst) || guard.is_some() {
                        drop(guard);
                        let _ = ws.close(None).await;
                        return;
                    }
                    *guard = Some(self.attach(ws));
                    drop(guard);

                    self.bus.metrics().reconnects.inc(&[("result", "ok")]);
                    tracing::info!(%addr, after = failures, "websocket reconnected");
                    self.bus.publish(Event::Connected(CONNECTED_TEXT.into()));
                    return;
                }
                Err(e) => {
                    failures += 1;
                    self.bus.metrics().reconnects.inc(&[("result", "err")]);
                    tracing::warn!(error = %e, attempt = failures, "reconnect failed");
                    let err = match &e {
                        FishPiError::Transport(s) => s.clone(),
                        other => other.to_string(),
                    };
                    self.bus
                        .publish(Event::ReconnectFailed(reconnect_failed_text(&err, &addr)));

                    if self.opts.max_retries > 0 && failures >= self.opts.max_retries {
                        self.running.store(false, Ordering::SeqCst);
                        tracing::error!(failures, "giving up reconnecting");
                        return;
                    }
                }
            }
        }
    }
}

async fn write_loop(
    inner: Arc<Inner>,
    id: u64,
    mut sink: SplitSink<WsStream, Message>,
    mut out_rx: mpsc::Receiver<Message>,
    mut cancel: watch::Receiver<bool>,
) {
    loop {
        tokio::select! {
            _ = cancel.changed() => break,
            maybe = out_rx.recv() => {
                let Some(msg) = maybe else { break };
                if let Err(e) = sink.send(msg).await {
                    inner.disconnected(id, Disconnect::Failed(e.to_string())).await;
                    return;
                }
                inner.bus.metrics().frames_out.inc(&[]);
            }
        }
    }
    let _ = sink.close().await;
}

async fn read_loop(
    inner: Arc<Inner>,
    id: u64,
    mut stream: SplitStream<WsStream>,
    mut cancel: watch::Receiver<bool>,
) {
    let why = loop {
        let next = tokio::select! {
            _ = cancel.changed() => return,
            next = stream.next() => next,
        };
        let msg = match next {
            Some(Ok(m)) => m,
            Some(Err(e)) => break Disconnect::Failed(e.to_string()),
            None => break Disconnect::Failed("stream ended".into()),
        };
        match decode(msg) {
            Inbound::Frame(raw) => {
                inner.bus.metrics().frames_in.inc(&[]);
                // waits while the inbound queue is full
                if inner.raw_tx.send(raw).await.is_err() {
                    return;
                }
            }
            Inbound::Ping(_) => tracing::debug!("ping received"),
            Inbound::Pong(_) => tracing::debug!("pong received"),
            Inbound::Close { code, reason } => break Disconnect::Closed { code, reason },
            Inbound::Ignored => {}
        }
    };
    inner.disconnected(id, why).await;
}

/// Writes `Event::Send` payloads to the live connection.
struct Outbound(Weak<Inner>);

#[async_trait]
impl EventHandler for Outbound {
    async fn handle(&self, event: Event) {
        let Event::Send(text) = event else {
            return;
        };
        let Some(inner) = self.0.upgrade() else {
            return;
        };
        if let Err(e) = inner.send(text).await {
            tracing::warn!(error = %e, "outbound message dropped");
        }
    }
}
