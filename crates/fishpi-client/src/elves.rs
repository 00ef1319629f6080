//! Elves "stick" call.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;

use fishpi_core::error::{FishPiError, Result};

use crate::bus::{Event, EventBus, EventHandler, EventTag};
use crate::config::schema::md5_hex;
use crate::obs::Sink;

pub const ELVES_BASE: &str = "https://fish.elves.online/mc/call";
const TIMEOUT: Duration = Duration::from_secs(5);

/// `md5(user + token + salt)`, lowercase hex.
pub fn sign(user: &str, token: &str, salt: i64) -> String {
    md5_hex(&format!("{user}{token}{salt}"))
}

pub fn call_url(base: &str, user: &str, token: &str, salt: i64) -> String {
    format!("{base}/{user}/{salt}/{}", sign(user, token, salt))
}

pub struct Elves {
    http: reqwest::Client,
    base: String,
    user: String,
    token: String,
    sink: Arc<dyn Sink>,
}

impl Elves {
    pub fn new(user: &str, token: &str, sink: Arc<dyn Sink>) -> Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(TIMEOUT)
            .build()
            .map_err(|e| FishPiError::Internal(format!("http client: {e}")))?;
        Ok(Self {
            http,
            base: ELVES_BASE.to_string(),
            user: user.to_string(),
            token: token.to_string(),
            sink,
        })
    }

    pub fn with_base(mut self, base: impl Into<String>) -> Self {
        self.base = base.into();
        self
    }

    /// Subscribe the caller to `EventTag::ElvesStick`.
    pub fn attach(self, bus: &EventBus) {
        bus.subscribe(EventTag::ElvesStick, Arc::new(self));
    }

    pub async fn call(&self) -> Result<String> {
        let salt = Utc::now().timestamp_millis();
        let u = call_url(&self.base, &self.user, &self.token, salt);
        let body = self
            .http
            .get(u)
            .header(reqwest::header::CONTENT_TYPE, "application/json")
            .send()
            .await
            .map_err(|e| FishPiError::Transport(e.to_string()))?
            .text()
            .await
            .map_err(|e| FishPiError::Transport(e.to_string()))?;
        Ok(body)
    }
}

#[async_trait]
impl EventHandler for Elves {
    async fn handle(&self, event: Event) {
        if event != Event::ElvesStick {
            return;
        }
        match self.call().await {
            Ok(body) => self.sink.show(&format!("call stick result: {body}")),
            Err(e) => self.sink.show(&format!("call stick error: {e}")),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sign_is_md5_of_the_concatenation() {
        assert_eq!(sign("alice", "tok", 42), md5_hex("alicetok42"));
        assert_eq!(
            call_url("https://e.example/mc/call", "alice", "tok", 42),
            format!("https://e.example/mc/call/alice/42/{}", md5_hex("alicetok42"))
        );
    }
}
