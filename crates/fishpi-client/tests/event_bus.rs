#![allow(clippy::unwrap_used)]
#![allow(clippy::expect_used)]
#![allow(clippy::panic)]

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::mpsc;

use fishpi_client::bus::{handler_fn, Event, EventBus, EventHandler, EventTag};

struct Panics;

#[async_trait]
impl EventHandler for Panics {
    async fn handle(&self, _event: Event) {
        panic!("handler blew up");
    }
}

fn forward(tx: mpsc::UnboundedSender<Event>) -> Arc<dyn EventHandler> {
    handler_fn(move |ev| {
        let tx = tx.clone();
        async move {
            let _ = tx.send(ev);
        }
    })
}

#[tokio::test]
async fn panicking_handler_does_not_affect_siblings() {
    let bus = EventBus::new("test");
    let (tx, mut rx) = mpsc::unbounded_channel();
    bus.subscribe(EventTag::WsConnected, Arc::new(Panics));
    bus.subscribe(EventTag::WsConnected, forward(tx));

    bus.publish(Event::Connected("one".into()));
    bus.publish(Event::Connected("two".into()));

    let mut got = vec![rx.recv().await.unwrap(), rx.recv().await.unwrap()];
    got.sort_by_key(|e| format!("{e:?}"));
    assert_eq!(got, vec![Event::Connected("one".into()), Event::Connected("two".into())]);
}

#[tokio::test]
async fn events_reach_only_their_tag() {
    let bus = EventBus::new("test");
    let (tx, mut rx) = mpsc::unbounded_channel();
    bus.subscribe(EventTag::WsSend, forward(tx));
    assert_eq!(bus.handler_count(EventTag::WsSend), 1);
    assert_eq!(bus.handler_count(EventTag::WsMsg), 0);

    bus.publish(Event::Message(bytes_of("frame")));
    bus.publish(Event::Send("-hb-".into()));

    assert_eq!(rx.recv().await.unwrap(), Event::Send("-hb-".into()));
    assert!(tokio::time::timeout(Duration::from_millis(50), rx.recv()).await.is_err());
}

#[tokio::test]
async fn publish_without_handlers_is_counted() {
    let bus = EventBus::new("test");
    bus.publish(Event::ElvesStick);
    bus.publish(Event::Closed("bye".into()));
    assert_eq!(bus.metrics().events.get(&[("tag", "elves-stick")]), 1);
    assert_eq!(bus.metrics().events.total(), 2);
}

#[test]
fn publish_outside_runtime_is_dropped() {
    let bus = EventBus::new("test");
    bus.subscribe(EventTag::ElvesStick, Arc::new(Panics));
    bus.publish(Event::ElvesStick);
}

#[test]
fn tags_match_events() {
    assert_eq!(Event::Message(bytes_of("x")).tag(), EventTag::WsMsg);
    assert_eq!(Event::ReconnectFailed(String::new()).tag(), EventTag::WsReconnectedFail);
    assert_eq!(EventTag::WsConnected.to_string(), "ws-connected");
}

fn bytes_of(s: &str) -> bytes::Bytes {
    bytes::Bytes::copy_from_slice(s.as_bytes())
}
