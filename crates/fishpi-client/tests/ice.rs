#![allow(clippy::unwrap_used)]
#![allow(clippy::expect_used)]
#![allow(clippy::panic)]

mod common;

use std::sync::{Arc, Mutex};

use tokio::sync::mpsc;

use fishpi_client::bus::{handler_fn, Event, EventBus, EventTag};
use fishpi_client::config::{IceSection, Persist};
use fishpi_client::ice::IceBridge;
use fishpi_core::error::{FishPiError, Result};
use fishpi_core::protocol::ice::ExchangeMsg;

use common::Lines;

#[derive(Default)]
struct MemPersist {
    ck: Mutex<Vec<String>>,
    fail: bool,
}

impl Persist for MemPersist {
    fn persist_api_key(&self, _key: &str) -> Result<()> {
        Ok(())
    }

    fn persist_ck(&self, ck: &str) -> Result<()> {
        if self.fail {
            return Err(FishPiError::Io("read-only".into()));
        }
        self.ck.lock().unwrap().push(ck.to_string());
        Ok(())
    }
}

struct Fixture {
    bridge: IceBridge,
    lines: Arc<Lines>,
    persist: Arc<MemPersist>,
    sent: mpsc::UnboundedReceiver<ExchangeMsg>,
}

fn fixture(persist: MemPersist) -> Fixture {
    let cfg = IceSection {
        url: "wss://ice.example/ws".into(),
        ck: "old-ck".into(),
        username: "alice".into(),
        uid: "u1".into(),
    };
    let bus = Arc::new(EventBus::new("ice"));
    let (tx, sent) = mpsc::unbounded_channel();
    bus.subscribe(
        EventTag::WsSend,
        handler_fn(move |ev| {
            let tx = tx.clone();
            async move {
                if let Event::Send(body) = ev {
                    let _ = tx.send(ExchangeMsg::decode(body.as_bytes()).unwrap());
                }
            }
        }),
    );
    let lines = Lines::new();
    let persist = Arc::new(persist);
    let bridge = IceBridge::new(&cfg, bus, lines.clone(), persist.clone());
    Fixture { bridge, lines, persist, sent }
}

#[tokio::test]
async fn greeting_triggers_set_user() {
    let mut f = fixture(MemPersist::default());
    f.bridge.handle_frame(r#"{"type":"all","msg":"欢迎<br>回来"}"#.as_bytes());
    assert_eq!(f.lines.last().as_deref(), Some("欢迎\n回来"));

    let login = f.sent.recv().await.unwrap();
    assert_eq!(login, ExchangeMsg::set_user("alice", "old-ck", "u1"));
}

#[tokio::test]
async fn new_ck_is_used_and_persisted() {
    let mut f = fixture(MemPersist::default());
    f.bridge.handle_frame(br#"{"type":"setCK","ck":"fresh"}"#);
    assert_eq!(f.bridge.ck(), "fresh");
    assert_eq!(f.lines.last().as_deref(), Some("your new ck is: fresh"));
    assert_eq!(*f.persist.ck.lock().unwrap(), vec!["fresh".to_string()]);

    f.bridge.handle_input("签到").unwrap();
    let sent = f.sent.recv().await.unwrap();
    assert_eq!(sent.msg_type, "gameMsg");
    assert_eq!(sent.ck, "fresh");
    assert_eq!(sent.msg, "签到");
}

#[tokio::test]
async fn persist_failure_asks_for_manual_update() {
    let f = fixture(MemPersist {
        fail: true,
        ..Default::default()
    });
    f.bridge.handle_frame(br#"{"type":"setCK","ck":"fresh"}"#);
    assert_eq!(
        f.lines.last().as_deref(),
        Some("update ck config file error, please manual update, fresh")
    );
    assert_eq!(f.bridge.ck(), "fresh");
}

#[tokio::test]
async fn game_messages_carry_level() {
    let f = fixture(MemPersist::default());
    f.bridge.handle_frame(br#"{"type":"gameMsg","vipLv":1,"msg":"hi"}"#);
    assert_eq!(f.lines.last().as_deref(), Some("[小冰月卡用户] hi"));
    f.bridge.handle_frame(br#"{"type":"gameMsg","msg":"plain"}"#);
    assert_eq!(f.lines.last().as_deref(), Some("plain"));
    f.bridge.handle_frame(br#"{"type":"other","msg":"x"}"#);
    assert_eq!(f.lines.last().as_deref(), Some(r#"{"type":"other","msg":"x"}"#));
}

#[tokio::test]
async fn login_input_and_blank_lines() {
    let mut f = fixture(MemPersist::default());
    f.bridge.handle_input("   ").unwrap();
    f.bridge.handle_input("登录 alice").unwrap();
    let sent = f.sent.recv().await.unwrap();
    assert_eq!(sent.msg_type, "login");
    assert_eq!(sent.msg, "登录 alice");
    assert!(sent.ck.is_empty());
}

#[tokio::test]
async fn undecodable_frame_is_dropped() {
    let f = fixture(MemPersist::default());
    f.bridge.handle_frame(b"{oops");
    assert!(f.lines.all().is_empty());
}

#[tokio::test(start_paused = true)]
async fn keepalive_sends_heartbeats() {
    let mut f = fixture(MemPersist::default());
    let h = f.bridge.spawn_keepalive(std::time::Duration::from_secs(180));
    tokio::time::sleep(std::time::Duration::from_secs(181)).await;
    assert_eq!(f.sent.recv().await.unwrap(), ExchangeMsg::heartbeat());
    h.abort();
}
