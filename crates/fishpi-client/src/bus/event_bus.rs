use std::fmt;
use std::future::Future;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;

use async_trait::async_trait;
use bytes::Bytes;
use dashmap::DashMap;
use futures_util::FutureExt;

use crate::obs::ClientMetrics;

/// Event names. Each tag carries exactly one [`Event`] variant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EventTag {
    WsConnected,
    WsClosed,
    WsReconnectedFail,
    WsMsg,
    WsSend,
    ElvesStick,
}

impl EventTag {
    pub fn as_str(self) -> &'static str {
        match self {
            EventTag::WsConnected => "ws-connected",
            EventTag::WsClosed => "ws-closed",
            EventTag::WsReconnectedFail => "ws-reconnected-fail",
            EventTag::WsMsg => "ws-msg",
            EventTag::WsSend => "ws-send",
            EventTag::ElvesStick => "elves-stick",
        }
    }
}

impl fmt::Display for EventTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Event {
    /// Status text after a (re)connect.
    Connected(String),
    /// Status text after the server closed the socket.
    Closed(String),
    /// Status text after a failed reconnect attempt.
    ReconnectFailed(String),
    /// One raw inbound frame.
    Message(Bytes),
    /// Text to write to the socket.
    Send(String),
    ElvesStick,
}

impl Event {
    pub fn tag(&self) -> EventTag {
        match self {
            Event::Connected(_) => EventTag::WsConnected,
            Event::Closed(_) => EventTag::WsClosed,
            Event::ReconnectFailed(_) => EventTag::WsReconnectedFail,
            Event::Message(_) => EventTag::WsMsg,
            Event::Send(_) => EventTag::WsSend,
            Event::ElvesStick => EventTag::ElvesStick,
        }
    }
}

#[async_trait]
pub trait EventHandler: Send + Sync {
    async fn handle(&self, event: Event);
}

struct FnHandler<F>(F);

#[async_trait]
impl<F, Fut> EventHandler for FnHandler<F>
where
    F: Fn(Event) -> Fut + Send + Sync,
    Fut: Future<Output = ()> + Send,
{
    async fn handle(&self, event: Event) {
        (self.0)(event).await
    }
}

/// Wrap an async closure as a handler.
pub fn handler_fn<F, Fut>(f: F) -> Arc<dyn EventHandler>
where
    F: Fn(Event) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = ()> + Send + 'static,
{
    Arc::new(FnHandler(f))
}

/// Tag-keyed pub/sub. Every handler runs on its own task; a panicking
/// handler is logged and does not affect the publisher or other handlers.
pub struct EventBus {
    name: &'static str,
    handlers: DashMap<EventTag, Vec<Arc<dyn EventHandler>>>,
    metrics: Arc<ClientMetrics>,
}

impl EventBus {
    pub fn new(name: &'static str) -> Self {
        Self::with_metrics(name, Arc::new(ClientMetrics::default()))
    }

    pub fn with_metrics(name: &'static str, metrics: Arc<ClientMetrics>) -> Self {
        Self {
            name,
            handlers: DashMap::new(),
            metrics,
        }
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    pub fn metrics(&self) -> &Arc<ClientMetrics> {
        &self.metrics
    }

    pub fn subscribe(&self, tag: EventTag, handler: Arc<dyn EventHandler>) {
        self.handlers.entry(tag).or_default().push(handler);
    }

    pub fn handler_count(&self, tag: EventTag) -> usize {
        self.handlers.get(&tag).map(|h| h.len()).unwrap_or(0)
    }

    /// Fire and forget. Must be called inside a tokio runtime; outside one
    /// the event is dropped with an error log.
    pub fn publish(&self, event: Event) {
        let tag = event.tag();
        self.metrics.events.inc(&[("tag", tag.as_str())]);

        let handlers = match self.handlers.get(&tag) {
            Some(h) if !h.is_empty() => h.value().clone(),
            _ => {
                tracing::debug!(bus = self.name, event = %tag, "no handlers for event");
                return;
            }
        };

        let Ok(rt) = tokio::runtime::Handle::try_current() else {
            tracing::error!(bus = self.name, event = %tag, "publish outside of a runtime");
            return;
        };

        for h in handlers {
            let event = event.clone();
            let bus = self.name;
            rt.spawn(async move {
                if AssertUnwindSafe(h.handle(event)).catch_unwind().await.is_err() {
                    tracing::error!(bus, event = %tag, "event handler panicked");
                }
            });
        }
    }
}
