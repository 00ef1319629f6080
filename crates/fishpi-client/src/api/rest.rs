use std::sync::{PoisonError, RwLock};
use std::time::Duration;

use async_trait::async_trait;
use rand::Rng;
use reqwest::header::CONTENT_TYPE;
use reqwest::{Method, StatusCode};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::{json, Value};
use url::Url;

use fishpi_core::error::{FishPiError, Result};
use fishpi_core::model::{BreezeMoon, ClaimResult, Gesture, HistoryEntry, RewardOutcome, UserInfo};

use super::FishPiApi;
use crate::config::FishPiSection;

pub const CLIENT_TAG: &str = concat!("Rust/v", env!("CARGO_PKG_VERSION"));
pub const CHAT_ROOM_CHANNEL: &str = "/chat-room-channel";

const TIMEOUT: Duration = Duration::from_secs(10);

#[derive(Deserialize)]
struct KeyReply {
    #[serde(rename = "Key", default)]
    key: String,
}

#[derive(Deserialize)]
struct DataReply<T> {
    data: T,
}

#[derive(Deserialize)]
struct LivenessReply {
    liveness: f64,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct CheckedInReply {
    checked_in: bool,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct CollectedReply {
    is_collected_yesterday_liveness_reward: bool,
}

#[derive(Deserialize)]
struct RewardReply {
    sum: i64,
}

#[derive(Deserialize)]
struct BreezeMoonsReply {
    #[serde(default)]
    breezemoons: Vec<BreezeMoon>,
}

pub struct RestClient {
    http: reqwest::Client,
    base: Url,
    api_key: RwLock<String>,
}

impl RestClient {
    pub fn new(api_base: &str, user_agent: &str, api_key: &str) -> Result<Self> {
        let base = Url::parse(api_base)
            .map_err(|e| FishPiError::Config(format!("bad api base {api_base}: {e}")))?;
        let http = reqwest::Client::builder()
            .user_agent(user_agent)
            .timeout(TIMEOUT)
            .build()
            .map_err(|e| FishPiError::Internal(format!("http client: {e}")))?;
        Ok(Self {
            http,
            base,
            api_key: RwLock::new(api_key.to_string()),
        })
    }

    pub fn from_config(cfg: &FishPiSection) -> Result<Self> {
        Self::new(&cfg.api_base, &cfg.user_agent, &cfg.api_key)
    }

    pub fn api_key(&self) -> String {
        self.api_key
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    fn set_api_key(&self, key: &str) {
        *self.api_key.write().unwrap_or_else(PoisonError::into_inner) = key.to_string();
    }

    /// Chat-room channel address: the api base with a `ws(s)` scheme and the
    /// current key in the query.
    pub fn ws_url(&self) -> Result<String> {
        let mut u = self.base.clone();
        let scheme = if u.scheme() == "http" { "ws" } else { "wss" };
        u.set_scheme(scheme)
            .map_err(|_| FishPiError::Config(format!("cannot derive ws url from {}", self.base)))?;
        u.set_path(CHAT_ROOM_CHANNEL);
        u.set_query(None);
        u.query_pairs_mut().append_pair("apiKey", &self.api_key());
        Ok(u.to_string())
    }

    fn url(&self, path: &str) -> Url {
        let mut u = self.base.clone();
        u.set_path(path);
        u.set_query(None);
        u
    }

    async fn get(&self, mut u: Url) -> Result<Value> {
        u.query_pairs_mut().append_pair("apiKey", &self.api_key());
        tracing::debug!(path = u.path(), "GET");
        let resp = self
            .http
            .get(u)
            .header(CONTENT_TYPE, "application/json")
            .send()
            .await
            .map_err(transport)?;
        read_json(resp).await
    }

    /// POST/DELETE with `apiKey` merged into the JSON body.
    async fn send(&self, method: Method, u: Url, mut body: Value) -> Result<Value> {
        if let Value::Object(map) = &mut body {
            map.insert("apiKey".into(), Value::String(self.api_key()));
        }
        tracing::debug!(%method, path = u.path(), "request");
        let resp = self
            .http
            .request(method, u)
            .json(&body)
            .send()
            .await
            .map_err(transport)?;
        read_json(resp).await
    }
}

fn transport(e: reqwest::Error) -> FishPiError {
    FishPiError::Transport(e.to_string())
}

async fn read_json(resp: reqwest::Response) -> Result<Value> {
    let status = resp.status();
    let path = resp.url().path().to_string();
    let text = resp.text().await.map_err(transport)?;
    if status == StatusCode::UNAUTHORIZED || status == StatusCode::FORBIDDEN {
        return Err(FishPiError::AuthFailed(format!("{path}: {status}")));
    }
    if status == StatusCode::NOT_FOUND {
        return Err(FishPiError::NotFound(path));
    }
    if !status.is_success() {
        return Err(FishPiError::Transport(format!("{path}: http {status}")));
    }
    serde_json::from_str(&text)
        .map_err(|e| FishPiError::Decode(format!("{path}: invalid reply json: {e}")))
}

/// Business-level failure: a non-zero `code` field.
fn check_code(v: &Value) -> Result<()> {
    match v.get("code").and_then(Value::as_i64) {
        Some(code) if code != 0 => Err(FishPiError::Api {
            code,
            msg: v
                .get("msg")
                .and_then(Value::as_str)
                .unwrap_or_default()
                .to_string(),
        }),
        _ => Ok(()),
    }
}

fn parse<T: DeserializeOwned>(v: Value) -> Result<T> {
    serde_json::from_value(v).map_err(|e| FishPiError::Decode(format!("unexpected reply: {e}")))
}

fn roll_gesture() -> Gesture {
    Gesture::from_roll(rand::thread_rng().gen_range(0..10))
}

#[async_trait]
impl FishPiApi for RestClient {
    async fn get_access_key(
        &self,
        username: &str,
        password_md5: &str,
        mfa_code: &str,
    ) -> Result<String> {
        let body = json!({
            "nameOrEmail": username,
            "userPassword": password_md5,
            "mfaCode": mfa_code,
        });
        let u = self.url("/api/getKey");
        let resp = self
            .http
            .post(u)
            .json(&body)
            .send()
            .await
            .map_err(transport)?;
        let v = read_json(resp).await?;
        check_code(&v)?;
        let reply: KeyReply = parse(v)?;
        if reply.key.is_empty() {
            return Err(FishPiError::AuthFailed("empty key in reply".into()));
        }
        self.set_api_key(&reply.key);
        Ok(reply.key)
    }

    async fn current_user(&self) -> Result<UserInfo> {
        let v = self.get(self.url("/api/user")).await?;
        check_code(&v)?;
        Ok(parse::<DataReply<UserInfo>>(v)?.data)
    }

    async fn user_info(&self, username: &str) -> Result<UserInfo> {
        let v = self.get(self.url(&format!("/user/{username}"))).await?;
        check_code(&v)?;
        let info: UserInfo = parse(v)?;
        if info.user_name.is_empty() {
            return Err(FishPiError::NotFound(format!("user {username}")));
        }
        Ok(info)
    }

    async fn liveness(&self) -> Result<f64> {
        let v = self.get(self.url("/user/liveness")).await?;
        Ok(parse::<LivenessReply>(v)?.liveness)
    }

    async fn is_checked_in(&self) -> Result<bool> {
        let v = self.get(self.url("/user/checkedIn")).await?;
        Ok(parse::<CheckedInReply>(v)?.checked_in)
    }

    async fn is_reward_collected(&self) -> Result<bool> {
        let v = self
            .get(self.url("/api/activity/is-collected-liveness"))
            .await?;
        Ok(parse::<CollectedReply>(v)?.is_collected_yesterday_liveness_reward)
    }

    async fn claim_yesterday_reward(&self) -> Result<RewardOutcome> {
        let v = self
            .get(self.url("/activity/yesterday-liveness-reward-api"))
            .await?;
        Ok(match parse::<RewardReply>(v)?.sum {
            -1 => RewardOutcome::AlreadyClaimed,
            n => RewardOutcome::Claimed(n),
        })
    }

    async fn send_chat_message(&self, text: &str) -> Result<()> {
        let body = json!({ "content": text, "client": CLIENT_TAG });
        let v = self
            .send(Method::POST, self.url("/chat-room/send"), body)
            .await?;
        check_code(&v)
    }

    async fn send_breezemoon(&self, text: &str) -> Result<()> {
        let body = json!({ "breezemoonContent": text });
        let v = self.send(Method::POST, self.url("/breezemoon"), body).await?;
        check_code(&v)
    }

    async fn revoke_message(&self, oid: &str) -> Result<()> {
        let body = json!({ "oId": oid });
        let v = self
            .send(
                Method::DELETE,
                self.url(&format!("/chat-room/revoke/{oid}")),
                body,
            )
            .await?;
        check_code(&v)
    }

    async fn open_red_packet(&self, oid: &str, gesture: Option<Gesture>) -> Result<ClaimResult> {
        let gesture = gesture.unwrap_or_else(roll_gesture);
        let body = json!({ "oId": oid, "gesture": gesture.wire() });
        let v = self
            .send(Method::POST, self.url("/chat-room/red-packet/open"), body)
            .await?;
        check_code(&v)?;
        parse(v)
    }

    async fn history_page(&self, page: u32) -> Result<Vec<HistoryEntry>> {
        let mut u = self.url("/chat-room/more");
        u.query_pairs_mut().append_pair("page", &page.to_string());
        let v = self.get(u).await?;
        check_code(&v)?;
        Ok(parse::<DataReply<Vec<HistoryEntry>>>(v)?.data)
    }

    async fn breezemoons(&self, page: u32, size: u32) -> Result<Vec<BreezeMoon>> {
        let mut u = self.url("/api/breezemoons");
        u.query_pairs_mut()
            .append_pair("p", &page.to_string())
            .append_pair("size", &size.to_string());
        let v = self.get(u).await?;
        check_code(&v)?;
        Ok(parse::<BreezeMoonsReply>(v)?.breezemoons)
    }

    async fn user_breezemoons(
        &self,
        username: &str,
        page: u32,
        size: u32,
    ) -> Result<Vec<BreezeMoon>> {
        let mut u = self.url(&format!("/api/user/{username}/breezemoons"));
        u.query_pairs_mut()
            .append_pair("p", &page.to_string())
            .append_pair("size", &size.to_string());
        let v = self.get(u).await?;
        check_code(&v)?;
        Ok(parse::<DataReply<BreezeMoonsReply>>(v)?.data.breezemoons)
    }
}
