use serde::{Deserialize, Serialize};
use url::Url;

use fishpi_core::error::{FishPiError, Result};
use fishpi_core::filter::LineFilter;
use fishpi_core::liveness::ActiveWindow;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields, rename_all = "camelCase")]
pub struct ClientConfig {
    pub fish_pi: FishPiSection,

    #[serde(default)]
    pub settings: Settings,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ice: Option<IceSection>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub elves: Option<ElvesSection>,
}

impl ClientConfig {
    pub fn validate(&self) -> Result<()> {
        self.fish_pi.validate()?;
        self.settings.validate()?;
        if let Some(ice) = &self.ice {
            ice.validate()?;
        }
        Ok(())
    }

    /// Fill derived fields. Called once after parsing.
    pub fn normalize(&mut self) {
        if self.fish_pi.password_md5.is_empty() && !self.fish_pi.password.is_empty() {
            self.fish_pi.password_md5 = md5_hex(&self.fish_pi.password);
        }
    }

    pub fn elves_token(&self) -> Option<&str> {
        self.elves
            .as_ref()
            .map(|e| e.token.as_str())
            .filter(|t| !t.is_empty())
    }
}

/// Lowercase hex MD5.
pub fn md5_hex(s: &str) -> String {
    format!("{:x}", md5::compute(s.as_bytes()))
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields, rename_all = "camelCase")]
pub struct FishPiSection {
    #[serde(default = "default_api_base")]
    pub api_base: String,

    #[serde(default = "default_user_agent")]
    pub user_agent: String,

    #[serde(default)]
    pub api_key: String,

    pub username: String,

    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub password: String,

    #[serde(default)]
    pub password_md5: String,

    #[serde(default)]
    pub mfa_code: String,
}

impl FishPiSection {
    pub fn validate(&self) -> Result<()> {
        let u = Url::parse(&self.api_base)
            .map_err(|e| FishPiError::Config(format!("fishPi.apiBase is not a url: {e}")))?;
        if !matches!(u.scheme(), "http" | "https") {
            return Err(FishPiError::Config(
                "fishPi.apiBase must be an http(s) url".into(),
            ));
        }
        if self.username.trim().is_empty() {
            return Err(FishPiError::Config("fishPi.username must not be empty".into()));
        }
        Ok(())
    }
}

fn default_api_base() -> String {
    "https://fishpi.cn".into()
}
fn default_user_agent() -> String {
    concat!("fishpi-rs/", env!("CARGO_PKG_VERSION")).into()
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields, rename_all = "camelCase")]
pub struct Settings {
    /// Seconds between reconnect attempts.
    #[serde(default = "default_ws_interval")]
    pub ws_interval: u64,

    /// Consecutive failed reconnects before giving up; 0 retries forever.
    #[serde(default)]
    pub ws_max_retries: u32,

    #[serde(default = "default_msg_cache_num")]
    pub msg_cache_num: usize,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub active_window: Option<WindowSection>,

    /// Replaces the built-in line denylist when present.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub denylist: Option<Vec<String>>,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            ws_interval: default_ws_interval(),
            ws_max_retries: 0,
            msg_cache_num: default_msg_cache_num(),
            active_window: None,
            denylist: None,
        }
    }
}

impl Settings {
    pub fn validate(&self) -> Result<()> {
        if !(1..=600).contains(&self.ws_interval) {
            return Err(FishPiError::Config(
                "settings.wsInterval must be between 1 and 600".into(),
            ));
        }
        if !(1..=10000).contains(&self.msg_cache_num) {
            return Err(FishPiError::Config(
                "settings.msgCacheNum must be between 1 and 10000".into(),
            ));
        }
        self.window()?;
        Ok(())
    }

    pub fn window(&self) -> Result<Option<ActiveWindow>> {
        self.active_window
            .as_ref()
            .map(|w| ActiveWindow::parse(&w.start, &w.end))
            .transpose()
    }

    pub fn line_filter(&self) -> LineFilter {
        match &self.denylist {
            Some(list) => LineFilter::new(list.clone()),
            None => LineFilter::default(),
        }
    }
}

fn default_ws_interval() -> u64 {
    5
}
fn default_msg_cache_num() -> usize {
    100
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct WindowSection {
    pub start: String,
    pub end: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct IceSection {
    pub url: String,
    #[serde(default)]
    pub ck: String,
    #[serde(default)]
    pub username: String,
    #[serde(default)]
    pub uid: String,
}

impl IceSection {
    pub fn validate(&self) -> Result<()> {
        let u = Url::parse(&self.url)
            .map_err(|e| FishPiError::Config(format!("ice.url is not a url: {e}")))?;
        if !matches!(u.scheme(), "ws" | "wss") {
            return Err(FishPiError::Config("ice.url must be a ws(s) url".into()));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ElvesSection {
    pub token: String,
}
