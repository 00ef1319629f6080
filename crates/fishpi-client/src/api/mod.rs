//! FishPi REST surface.
//!
//! [`FishPiApi`] is the seam the chat session, send mode and liveness sync
//! talk to; [`RestClient`] is the reqwest implementation. Tests substitute a
//! recording mock.

pub mod rest;

use async_trait::async_trait;

use fishpi_core::error::Result;
use fishpi_core::model::{BreezeMoon, ClaimResult, Gesture, HistoryEntry, RewardOutcome, UserInfo};

pub use rest::RestClient;

#[async_trait]
pub trait FishPiApi: Send + Sync {
    /// Exchange credentials for an API key. The client keeps using the new key.
    async fn get_access_key(&self, username: &str, password_md5: &str, mfa_code: &str)
        -> Result<String>;

    async fn current_user(&self) -> Result<UserInfo>;

    /// `NotFound` when the server knows no such user.
    async fn user_info(&self, username: &str) -> Result<UserInfo>;

    async fn liveness(&self) -> Result<f64>;

    async fn is_checked_in(&self) -> Result<bool>;

    async fn is_reward_collected(&self) -> Result<bool>;

    async fn claim_yesterday_reward(&self) -> Result<RewardOutcome>;

    async fn send_chat_message(&self, text: &str) -> Result<()>;

    async fn send_breezemoon(&self, text: &str) -> Result<()>;

    async fn revoke_message(&self, oid: &str) -> Result<()>;

    /// `None` lets the client roll a gesture.
    async fn open_red_packet(&self, oid: &str, gesture: Option<Gesture>) -> Result<ClaimResult>;

    async fn history_page(&self, page: u32) -> Result<Vec<HistoryEntry>>;

    async fn breezemoons(&self, page: u32, size: u32) -> Result<Vec<BreezeMoon>>;

    async fn user_breezemoons(&self, username: &str, page: u32, size: u32)
        -> Result<Vec<BreezeMoon>>;
}
