//! Companion-bot ("Ice") exchange messages.

use serde::{Deserialize, Serialize};

use crate::error::{FishPiError, Result};

pub const TYPE_ALL: &str = "all";
pub const TYPE_SET_USER: &str = "setUser";
pub const TYPE_HB: &str = "hb";
pub const TYPE_GAME_MSG: &str = "gameMsg";
pub const TYPE_SET_CK: &str = "setCK";
pub const TYPE_LOGIN: &str = "login";

/// Login commands typed by the user start with this prefix.
pub const LOGIN_PREFIX: &str = "登录 ";

fn is_zero(v: &i64) -> bool {
    *v == 0
}

/// One frame in either direction. Empty fields are omitted on the wire.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExchangeMsg {
    #[serde(rename = "type", skip_serializing_if = "String::is_empty")]
    pub msg_type: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub user: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub ck: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub uid: String,
    #[serde(rename = "vipLv", skip_serializing_if = "is_zero")]
    pub vip_lv: i64,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub msg: String,
}

impl ExchangeMsg {
    pub fn decode(raw: &[u8]) -> Result<Self> {
        serde_json::from_slice(raw)
            .map_err(|e| FishPiError::Decode(format!("invalid ice frame: {e}")))
    }

    pub fn encode(&self) -> Result<String> {
        serde_json::to_string(self).map_err(FishPiError::from)
    }

    pub fn heartbeat() -> Self {
        Self {
            msg_type: TYPE_HB.into(),
            ..Default::default()
        }
    }

    pub fn set_user(user: &str, ck: &str, uid: &str) -> Self {
        Self {
            msg_type: TYPE_SET_USER.into(),
            user: user.into(),
            ck: ck.into(),
            uid: uid.into(),
            ..Default::default()
        }
    }

    /// Outbound frame for one line of user input.
    pub fn from_input(input: &str, ck: &str) -> Self {
        if input.starts_with(LOGIN_PREFIX) {
            Self {
                msg_type: TYPE_LOGIN.into(),
                msg: input.into(),
                ..Default::default()
            }
        } else {
            Self {
                msg_type: TYPE_GAME_MSG.into(),
                ck: ck.into(),
                msg: input.into(),
                ..Default::default()
            }
        }
    }

    pub fn level(&self) -> &'static str {
        match self.vip_lv {
            0 => "[白嫖怪]",
            1 => "[小冰月卡用户]",
            2 => "[小冰白金月卡用户]",
            _ => "[你是个什么用户？]",
        }
    }

    /// `msg` with the bot's HTML fragments flattened to terminal text.
    pub fn text(&self) -> String {
        self.msg
            .replace("<br>", "\n")
            .replace("<summary>", "")
            .replace("</summary>", "")
            .replace("<details>", "\n")
            .replace("</details>", "")
    }
}
