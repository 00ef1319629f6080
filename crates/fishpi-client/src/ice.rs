//! Companion-bot ("Ice") bridge.
//!
//! Runs over its own websocket session and bus. Inbound frames are rendered
//! to the sink; stdin lines become `login`/`gameMsg` frames.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError, Weak};
use std::time::Duration;

use async_trait::async_trait;
use tokio::task::JoinHandle;

use fishpi_core::error::Result;
use fishpi_core::protocol::ice::{self, ExchangeMsg};

use crate::bus::{Event, EventBus, EventHandler, EventTag};
use crate::config::{IceSection, Persist};
use crate::obs::Sink;

pub const KEEPALIVE_EVERY: Duration = Duration::from_secs(3 * 60);

struct Shared {
    user: String,
    uid: String,
    ck: Mutex<String>,
    bus: Arc<EventBus>,
    sink: Arc<dyn Sink>,
    persist: Arc<dyn Persist>,
}

#[derive(Clone)]
pub struct IceBridge {
    shared: Arc<Shared>,
}

impl IceBridge {
    pub fn new(
        cfg: &IceSection,
        bus: Arc<EventBus>,
        sink: Arc<dyn Sink>,
        persist: Arc<dyn Persist>,
    ) -> Self {
        Self {
            shared: Arc::new(Shared {
                user: cfg.username.clone(),
                uid: cfg.uid.clone(),
                ck: Mutex::new(cfg.ck.clone()),
                bus,
                sink,
                persist,
            }),
        }
    }

    pub fn subscribe(&self) {
        let h: Arc<dyn EventHandler> = Arc::new(IceInbound(Arc::downgrade(&self.shared)));
        for tag in [
            EventTag::WsMsg,
            EventTag::WsConnected,
            EventTag::WsClosed,
            EventTag::WsReconnectedFail,
        ] {
            self.shared.bus.subscribe(tag, h.clone());
        }
    }

    fn ck_guard(&self) -> MutexGuard<'_, String> {
        self.shared.ck.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn ck(&self) -> String {
        self.ck_guard().clone()
    }

    fn show(&self, line: &str) {
        self.shared.sink.show(line);
    }

    fn send(&self, msg: &ExchangeMsg) -> Result<()> {
        let body = msg.encode()?;
        self.shared.bus.publish(Event::Send(body));
        Ok(())
    }

    /// Render one inbound frame and react to it.
    pub fn handle_frame(&self, raw: &[u8]) {
        let msg = match ExchangeMsg::decode(raw) {
            Ok(m) => m,
            Err(e) => {
                tracing::warn!(error = %e, body = %String::from_utf8_lossy(raw), "undecodable ice frame");
                return;
            }
        };

        match msg.msg_type.as_str() {
            ice::TYPE_ALL => {
                self.show(&msg.text());
                let login = ExchangeMsg::set_user(&self.shared.user, &self.ck(), &self.shared.uid);
                if let Err(e) = self.send(&login) {
                    tracing::error!(error = %e, "encode setUser failed");
                }
            }
            ice::TYPE_SET_CK => {
                *self.ck_guard() = msg.ck.clone();
                self.show(&format!("your new ck is: {}", msg.ck));
                if let Err(e) = self.shared.persist.persist_ck(&msg.ck) {
                    tracing::warn!(error = %e, "persist ck failed");
                    self.show(&format!(
                        "update ck config file error, please manual update, {}",
                        msg.ck
                    ));
                }
            }
            ice::TYPE_GAME_MSG if msg.vip_lv != 0 => {
                self.show(&format!("{} {}", msg.level(), msg.text()));
            }
            ice::TYPE_GAME_MSG => self.show(&msg.text()),
            _ => self.show(&String::from_utf8_lossy(raw)),
        }
    }

    /// One line of user input. Blank lines are ignored.
    pub fn handle_input(&self, input: &str) -> Result<()> {
        let input = input.trim();
        if input.is_empty() {
            return Ok(());
        }
        self.send(&ExchangeMsg::from_input(input, &self.ck()))
    }

    pub fn spawn_keepalive(&self, every: Duration) -> JoinHandle<()> {
        let bridge = self.clone();
        tokio::spawn(async move {
            let mut tick = tokio::time::interval(every);
            tick.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
            tick.tick().await;
            loop {
                tick.tick().await;
                if let Err(e) = bridge.send(&ExchangeMsg::heartbeat()) {
                    tracing::error!(error = %e, "encode heartbeat failed");
                }
            }
        })
    }
}

struct IceInbound(Weak<Shared>);

#[async_trait]
impl EventHandler for IceInbound {
    async fn handle(&self, event: Event) {
        let Some(shared) = self.0.upgrade() else {
            return;
        };
        let bridge = IceBridge { shared };
        match event {
            Event::Message(raw) => bridge.handle_frame(&raw),
            Event::Connected(s) | Event::Closed(s) | Event::ReconnectFailed(s) => bridge.show(&s),
            Event::Send(_) | Event::ElvesStick => {}
        }
    }
}
