use std::sync::{Arc, Mutex, MutexGuard, PoisonError, Weak};
use std::time::Duration;

use async_trait::async_trait;
use tokio::task::JoinHandle;

use fishpi_core::cache::MessageRing;
use fishpi_core::error::Result;
use fishpi_core::filter::LineFilter;
use fishpi_core::model::history::sort_oldest_first;
use fishpi_core::model::Gesture;
use fishpi_core::protocol::frame::MessageKind;
use fishpi_core::protocol::render::rewrite_kaibai;
use fishpi_core::protocol::{InboundMessage, RedPacketKind};

use super::commands::{PacketSlot, RoomCommand};
use crate::api::FishPiApi;
use crate::bus::{Event, EventBus, EventHandler, EventTag};
use crate::obs::Sink;

/// Literal keep-alive the chat-room channel expects.
pub const KEEPALIVE_PAYLOAD: &str = "-hb-";
pub const KEEPALIVE_EVERY: Duration = Duration::from_secs(3 * 60);

/// Shown when a red-packet command names a slot nothing has filled yet.
pub const NO_PACKET: &str = "还没有收到可以打开的红包";

#[derive(Debug, Clone)]
pub struct ChatOptions {
    /// Local user; frames from this name count as own messages.
    pub username: String,
    pub cache_size: usize,
    pub filter: LineFilter,
    /// Token for the kaibai share-link rewrite.
    pub kaibai_token: Option<String>,
    pub keepalive_every: Duration,
}

impl ChatOptions {
    pub fn new(username: impl Into<String>) -> Self {
        Self {
            username: username.into(),
            cache_size: 100,
            filter: LineFilter::default(),
            kaibai_token: None,
            keepalive_every: KEEPALIVE_EVERY,
        }
    }
}

#[derive(Debug, Default)]
struct PacketSlots {
    normal: Option<String>,
    rock_paper_scissors: Option<String>,
    heartbeat: Option<String>,
    specify: Option<String>,
}

impl PacketSlots {
    fn remember(&mut self, kind: &RedPacketKind, oid: &str) {
        let slot = match kind {
            RedPacketKind::Specify => &mut self.specify,
            RedPacketKind::RockPaperScissors => &mut self.rock_paper_scissors,
            RedPacketKind::Heartbeat => &mut self.heartbeat,
            _ => &mut self.normal,
        };
        *slot = Some(oid.to_string());
    }

    fn get(&self, slot: PacketSlot) -> Option<String> {
        match slot {
            PacketSlot::Normal => self.normal.clone(),
            PacketSlot::RockPaperScissors => self.rock_paper_scissors.clone(),
            PacketSlot::Heartbeat => self.heartbeat.clone(),
            PacketSlot::Specify => self.specify.clone(),
        }
    }
}

struct ChatState {
    topic: Option<String>,
    ring: MessageRing<InboundMessage>,
    last_own: Option<InboundMessage>,
    packets: PacketSlots,
}

struct Shared {
    opts: ChatOptions,
    api: Arc<dyn FishPiApi>,
    bus: Arc<EventBus>,
    sink: Arc<dyn Sink>,
    // Handlers for concurrent frames serialise here.
    state: Mutex<ChatState>,
}

/// Application side of the chat room: renders inbound frames, remembers what
/// commands need, and wraps the REST operations.
#[derive(Clone)]
pub struct ChatSessionCore {
    shared: Arc<Shared>,
}

impl ChatSessionCore {
    pub fn new(
        opts: ChatOptions,
        api: Arc<dyn FishPiApi>,
        bus: Arc<EventBus>,
        sink: Arc<dyn Sink>,
    ) -> Self {
        let state = ChatState {
            topic: None,
            ring: MessageRing::new(opts.cache_size),
            last_own: None,
            packets: PacketSlots::default(),
        };
        Self {
            shared: Arc::new(Shared {
                opts,
                api,
                bus,
                sink,
                state: Mutex::new(state),
            }),
        }
    }

    /// Register for inbound frames and lifecycle events on the bus.
    pub fn subscribe(&self) {
        let h: Arc<dyn EventHandler> = Arc::new(Inbound(Arc::downgrade(&self.shared)));
        for tag in [
            EventTag::WsMsg,
            EventTag::WsConnected,
            EventTag::WsClosed,
            EventTag::WsReconnectedFail,
        ] {
            self.shared.bus.subscribe(tag, h.clone());
        }
    }

    fn lock(&self) -> MutexGuard<'_, ChatState> {
        self.shared
            .state
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }

    fn show(&self, line: &str) {
        self.shared.sink.show(line);
    }

    /// Decode, remember and render one raw frame. Returns the line shown, if
    /// any; suppressed topics and unknown frame types show nothing.
    pub fn handle_frame(&self, raw: &[u8]) -> Option<String> {
        let msg = match InboundMessage::decode(raw) {
            Ok(m) => m,
            Err(e) => {
                self.shared.bus.metrics().decode_errors.inc(&[]);
                tracing::warn!(error = %e, "undecodable frame");
                let line = format!(
                    "parse message error: {e}, body: {}",
                    String::from_utf8_lossy(raw)
                );
                self.show(&line);
                return Some(line);
            }
        };

        let filter = &self.shared.opts.filter;
        let line = {
            let mut st = self.lock();
            match &msg.kind {
                MessageKind::Online(snap) => {
                    if st.topic.as_deref() == Some(snap.discussing.as_str()) {
                        return None;
                    }
                    st.topic = Some(snap.discussing.clone());
                    msg.render(filter)
                }
                MessageKind::DiscussChanged(topic) => {
                    st.topic = Some(topic.clone());
                    msg.render(filter)
                }
                MessageKind::Revoke => {
                    let original = st.ring.find(|m| m.oid == msg.oid);
                    msg.revoke_notice(original, filter)
                }
                MessageKind::Chat(body) => {
                    if let Some(rp) = body.payload.as_ref().and_then(|p| p.red_packet()) {
                        st.packets.remember(&rp.kind, &msg.oid);
                    }
                    let line = msg.render(filter);
                    if msg.sender.user_name == self.shared.opts.username {
                        st.last_own = Some(msg.clone());
                    }
                    st.ring.push(msg.clone());
                    match &self.shared.opts.kaibai_token {
                        Some(token) => rewrite_kaibai(&line, token),
                        None => line,
                    }
                }
                _ => msg.render(filter),
            }
        };

        if line.is_empty() {
            return None;
        }
        self.show(&line);
        Some(line)
    }

    pub fn handle_status(&self, text: &str) {
        self.show(text);
    }

    /// Show the first history page, oldest first.
    pub async fn show_history(&self) {
        match self.shared.api.history_page(1).await {
            Ok(mut entries) => {
                sort_oldest_first(&mut entries);
                for e in &entries {
                    self.show(&e.render());
                }
            }
            Err(e) => self.show(&format!("获取历史聊天记录失败 {e}")),
        }
    }

    /// Publish the keep-alive payload on `EventTag::WsSend` every tick.
    pub fn spawn_keepalive(&self) -> JoinHandle<()> {
        let bus = self.shared.bus.clone();
        let every = self.shared.opts.keepalive_every;
        tokio::spawn(async move {
            let mut tick = tokio::time::interval(every);
            tick.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
            tick.tick().await;
            loop {
                tick.tick().await;
                bus.publish(Event::Send(KEEPALIVE_PAYLOAD.into()));
            }
        })
    }

    pub fn current_topic(&self) -> Option<String> {
        self.lock().topic.clone()
    }

    pub fn cached_len(&self) -> usize {
        self.lock().ring.len()
    }

    pub async fn send_message(&self, text: &str) -> Result<()> {
        self.shared.api.send_chat_message(text).await
    }

    pub async fn open_red_packet(&self, oid: &str, gesture: Option<Gesture>) -> Result<String> {
        let claim = self.shared.api.open_red_packet(oid, gesture).await?;
        Ok(claim.render(&self.shared.opts.username))
    }

    pub async fn user_info(&self, username: &str) -> Result<String> {
        Ok(self.shared.api.user_info(username).await?.render())
    }

    pub async fn revoke_last(&self) -> Result<String> {
        let own = self.lock().last_own.clone();
        let Some(own) = own else {
            return Ok("您最近还没有讲话".into());
        };
        self.shared.api.revoke_message(&own.oid).await?;
        Ok("撤回消息操作成功".into())
    }

    /// Resend the markdown of the newest cached message. `None` when the
    /// cache is empty.
    pub async fn repeat_last(&self) -> Result<Option<String>> {
        let text = self.lock().ring.last().map(|m| m.text_source().to_string());
        let Some(text) = text else {
            return Ok(None);
        };
        self.shared.api.send_chat_message(&text).await?;
        Ok(Some(text))
    }

    /// Run one room command and show its outcome. Returns the line shown.
    pub async fn handle_command(&self, input: &str) -> Option<String> {
        let line = match RoomCommand::parse(input) {
            RoomCommand::OpenRedPacket { slot, gesture } => {
                let oid = self.lock().packets.get(slot);
                match oid {
                    Some(oid) => match self.open_red_packet(&oid, gesture).await {
                        Ok(s) => s,
                        Err(e) => format!("打开红包{oid}失败 {e}"),
                    },
                    None => NO_PACKET.to_string(),
                }
            }
            RoomCommand::Revoke => self.revoke_last().await.unwrap_or_else(|e| e.to_string()),
            RoomCommand::Repeat => match self.repeat_last().await {
                Ok(_) => return None,
                Err(e) => e.to_string(),
            },
            RoomCommand::Topic => match self.current_topic() {
                Some(t) => format!("当前话题：{t}"),
                None => "还没有收到话题".into(),
            },
            RoomCommand::Invalid(cmd) => format!("无效指令：{cmd}"),
        };
        self.show(&line);
        Some(line)
    }
}

/// Bus adapter. Holds the session weakly so the bus does not keep it alive.
struct Inbound(Weak<Shared>);

#[async_trait]
impl EventHandler for Inbound {
    async fn handle(&self, event: Event) {
        let Some(shared) = self.0.upgrade() else {
            return;
        };
        let core = ChatSessionCore { shared };
        match event {
            Event::Message(raw) => {
                core.handle_frame(&raw);
            }
            Event::Connected(s) | Event::Closed(s) | Event::ReconnectFailed(s) => {
                core.handle_status(&s)
            }
            Event::Send(_) | Event::ElvesStick => {}
        }
    }
}
