//! Shared test doubles: a recording FishPi API and a capturing sink.

#![allow(dead_code)]

use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::mpsc;

use fishpi_client::api::FishPiApi;
use fishpi_client::obs::Sink;
use fishpi_core::error::{FishPiError, Result};
use fishpi_core::model::{BreezeMoon, ClaimResult, Gesture, HistoryEntry, RewardOutcome, UserInfo};

/// One recorded API call.
#[derive(Debug, Clone, PartialEq)]
pub enum Call {
    Liveness,
    RewardCollected,
    ClaimReward,
    SendChat(String),
    SendBreezeMoon(String),
    Revoke(String),
    OpenRedPacket(String, Option<Gesture>),
    History(u32),
    UserInfo(String),
    UserBreezeMoons(String, u32, u32),
}

/// Canned replies. Every call is also sent on the unbounded channel.
pub struct MockApi {
    calls: mpsc::UnboundedSender<Call>,
    pub liveness: Mutex<Result<f64>>,
    pub reward_collected: bool,
    pub reward: RewardOutcome,
    pub history: Vec<HistoryEntry>,
    pub fail_sends: bool,
}

impl MockApi {
    pub fn new() -> (Self, mpsc::UnboundedReceiver<Call>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (
            Self {
                calls: tx,
                liveness: Mutex::new(Ok(12.5)),
                reward_collected: false,
                reward: RewardOutcome::Claimed(30),
                history: Vec::new(),
                fail_sends: false,
            },
            rx,
        )
    }

    fn record(&self, call: Call) {
        let _ = self.calls.send(call);
    }
}

fn clone_result<T: Clone>(r: &Result<T>) -> Result<T> {
    match r {
        Ok(v) => Ok(v.clone()),
        Err(e) => Err(FishPiError::Transport(e.to_string())),
    }
}

#[async_trait]
impl FishPiApi for MockApi {
    async fn get_access_key(&self, _: &str, _: &str, _: &str) -> Result<String> {
        Ok("KEY".into())
    }

    async fn current_user(&self) -> Result<UserInfo> {
        Ok(UserInfo::default())
    }

    async fn user_info(&self, username: &str) -> Result<UserInfo> {
        self.record(Call::UserInfo(username.to_string()));
        Err(FishPiError::NotFound(format!("user {username}")))
    }

    async fn liveness(&self) -> Result<f64> {
        self.record(Call::Liveness);
        clone_result(&self.liveness.lock().unwrap())
    }

    async fn is_checked_in(&self) -> Result<bool> {
        Ok(true)
    }

    async fn is_reward_collected(&self) -> Result<bool> {
        self.record(Call::RewardCollected);
        Ok(self.reward_collected)
    }

    async fn claim_yesterday_reward(&self) -> Result<RewardOutcome> {
        self.record(Call::ClaimReward);
        Ok(self.reward)
    }

    async fn send_chat_message(&self, text: &str) -> Result<()> {
        self.record(Call::SendChat(text.to_string()));
        if self.fail_sends {
            return Err(FishPiError::Api { code: -1, msg: "too fast".into() });
        }
        Ok(())
    }

    async fn send_breezemoon(&self, text: &str) -> Result<()> {
        self.record(Call::SendBreezeMoon(text.to_string()));
        Ok(())
    }

    async fn revoke_message(&self, oid: &str) -> Result<()> {
        self.record(Call::Revoke(oid.to_string()));
        Ok(())
    }

    async fn open_red_packet(&self, oid: &str, gesture: Option<Gesture>) -> Result<ClaimResult> {
        self.record(Call::OpenRedPacket(oid.to_string(), gesture));
        Ok(ClaimResult::default())
    }

    async fn history_page(&self, page: u32) -> Result<Vec<HistoryEntry>> {
        self.record(Call::History(page));
        Ok(self.history.clone())
    }

    async fn breezemoons(&self, _: u32, _: u32) -> Result<Vec<BreezeMoon>> {
        Ok(Vec::new())
    }

    async fn user_breezemoons(&self, username: &str, page: u32, size: u32) -> Result<Vec<BreezeMoon>> {
        self.record(Call::UserBreezeMoons(username.to_string(), page, size));
        Ok(Vec::new())
    }
}

/// Keeps every shown line.
#[derive(Default)]
pub struct Lines(Mutex<Vec<String>>);

impl Lines {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn all(&self) -> Vec<String> {
        self.0.lock().unwrap().clone()
    }

    pub fn last(&self) -> Option<String> {
        self.0.lock().unwrap().last().cloned()
    }

    /// Poll until a line satisfying `pred` shows up.
    pub async fn wait_for(&self, pred: impl Fn(&str) -> bool) -> String {
        for _ in 0..200 {
            if let Some(l) = self.all().into_iter().find(|l| pred(l)) {
                return l;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        panic!("line never shown; got {:?}", self.all());
    }
}

impl Sink for Lines {
    fn show(&self, line: &str) {
        self.0.lock().unwrap().push(line.to_string());
    }
}
