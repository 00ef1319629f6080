//! Line-oriented send mode: REST commands and plain chat sending.

use std::sync::Arc;

use fishpi_core::model::breezemoon::render_list;

use super::commands::{SendCommand, HELP};
use crate::api::FishPiApi;
use crate::bus::{Event, EventBus};
use crate::liveness::LivenessTracker;
use crate::obs::Sink;

pub struct SendMode {
    api: Arc<dyn FishPiApi>,
    bus: Arc<EventBus>,
    sink: Arc<dyn Sink>,
    tracker: Option<Arc<LivenessTracker>>,
}

impl SendMode {
    pub fn new(api: Arc<dyn FishPiApi>, bus: Arc<EventBus>, sink: Arc<dyn Sink>) -> Self {
        Self {
            api,
            bus,
            sink,
            tracker: None,
        }
    }

    /// Credit sent chat messages to `tracker`.
    pub fn with_tracker(mut self, tracker: Arc<LivenessTracker>) -> Self {
        self.tracker = Some(tracker);
        self
    }

    fn show(&self, line: &str) {
        self.sink.show(line);
    }

    pub async fn handle_input(&self, input: &str) {
        let Some(cmd) = SendCommand::parse(input) else {
            return;
        };
        match cmd {
            SendCommand::Help => self.show(HELP),
            SendCommand::Liveness => match self.api.liveness().await {
                Ok(score) => self.show(&format!("当前活跃度：{score:.2}")),
                Err(e) => self.show(&format!("获取活跃度失败：{e}")),
            },
            SendCommand::Reward => self.claim_reward().await,
            SendCommand::Stick => self.bus.publish(Event::ElvesStick),
            SendCommand::Info(name) => match self.api.user_info(&name).await {
                Ok(info) => self.show(&info.render()),
                Err(e) => self.show(&e.to_string()),
            },
            SendCommand::BreezeMoon(text) => {
                if let Err(e) = self.api.send_breezemoon(&text).await {
                    self.show(&e.to_string());
                }
            }
            SendCommand::BreezeMoonList { size, page } => {
                match self.api.breezemoons(page, size).await {
                    Ok(list) => self.show(&render_list(list)),
                    Err(e) => self.show(&e.to_string()),
                }
            }
            SendCommand::BreezeMoonUser { name, size, page } => {
                if name.is_empty() {
                    self.show("用户名不能为空");
                    return;
                }
                match self.api.user_breezemoons(&name, page, size).await {
                    Ok(list) => self.show(&render_list(list)),
                    Err(e) => self.show(&e.to_string()),
                }
            }
            SendCommand::Chat(text) => match self.api.send_chat_message(&text).await {
                Ok(()) => {
                    if let Some(t) = &self.tracker {
                        t.record_activity();
                    }
                }
                Err(e) => self.show(&e.to_string()),
            },
        }
    }

    async fn claim_reward(&self) {
        match self.api.is_reward_collected().await {
            Ok(true) => self.show("已经领取了昨日活跃奖励"),
            Ok(false) => match self.api.claim_yesterday_reward().await {
                Ok(outcome) => self.show(&outcome.to_string()),
                Err(e) => self.show(&format!("领取昨日活跃奖励失败 {e}")),
            },
            Err(e) => self.show(&format!("查询是否领取昨日活跃奖励失败 {e}")),
        }
    }
}
