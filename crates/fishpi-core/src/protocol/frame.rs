//! Chat-room channel frames.
//!
//! The server sends one JSON object per text frame, discriminated by `type`.
//! Every variant shares one flat wire shape; `decode` reads it once and then
//! selects the typed variant, so irrelevant fields never leak into the model.

use serde::Deserialize;
use serde_json::Value;

use crate::error::{FishPiError, Result};
use crate::protocol::payload::StructuredPayload;

/// Wire value of `type`.
pub mod kind {
    pub const ONLINE: &str = "online";
    pub const DISCUSS_CHANGED: &str = "discussChanged";
    pub const REVOKE: &str = "revoke";
    pub const MSG: &str = "msg";
    pub const RED_PACKET_STATUS: &str = "redPacketStatus";
    pub const CUSTOM_MESSAGE: &str = "customMessage";
    pub const BARRAGE: &str = "barrager";
}

/// Flat wire shape shared by all frame types.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
struct WireFrame {
    #[serde(rename = "type")]
    msg_type: String,

    discussing: String,
    online_chat_cnt: i64,
    users: Vec<OnlineUser>,

    new_discuss: String,

    o_id: String,

    time: String,
    user_name: String,
    user_nickname: String,
    #[serde(rename = "userAvatarURL")]
    user_avatar_url: String,
    #[serde(rename = "userAvatarURL20")]
    user_avatar_url_20: String,
    #[serde(rename = "userAvatarURL48")]
    user_avatar_url_48: String,
    #[serde(rename = "userAvatarURL210")]
    user_avatar_url_210: String,
    sys_metal: String,
    content: String,
    md: String,

    count: i64,
    got: i64,
    who_give: String,
    who_got: String,

    client: String,

    message: String,

    #[serde(rename = "barragerColor")]
    barrage_color: String,
    #[serde(rename = "barragerContent")]
    barrage_content: String,
}

/// One entry of the online-user snapshot.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct OnlineUser {
    pub user_name: String,
    pub home_page: String,
    #[serde(rename = "userAvatarURL")]
    pub avatar_url: String,
    #[serde(rename = "userAvatarURL20")]
    pub avatar_url_20: String,
    #[serde(rename = "userAvatarURL48")]
    pub avatar_url_48: String,
    #[serde(rename = "userAvatarURL210")]
    pub avatar_url_210: String,
}

/// Sender identity carried by id-bearing frames.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Sender {
    pub user_name: String,
    pub nickname: String,
    pub avatar_url: String,
    pub avatar_url_20: String,
    pub avatar_url_48: String,
    pub avatar_url_210: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct OnlineSnapshot {
    pub discussing: String,
    pub online_count: i64,
    pub users: Vec<OnlineUser>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ChatBody {
    /// HTML-flavoured content, or a JSON document for structured messages.
    pub content: String,
    /// Markdown source, absent for structured messages.
    pub md: Option<String>,
    pub client: String,
    pub sys_metal: String,
    /// At most one structured payload decoded from `content`.
    pub payload: Option<StructuredPayload>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RedPacketStatus {
    pub who_got: String,
    pub who_give: String,
    pub got: i64,
    pub count: i64,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Barrage {
    pub color: String,
    pub content: String,
}

/// Variant-specific part of a frame.
#[derive(Debug, Clone, PartialEq)]
pub enum MessageKind {
    Online(OnlineSnapshot),
    DiscussChanged(String),
    /// The revoked message id is `InboundMessage::oid`.
    Revoke,
    Chat(ChatBody),
    RedPacketStatus(RedPacketStatus),
    CustomMessage(String),
    Barrage(Barrage),
    /// Unrecognised `type`; renders as an empty string.
    Unknown(String),
}

/// One decoded chat-room frame.
#[derive(Debug, Clone, PartialEq)]
pub struct InboundMessage {
    /// Message id, empty for frames that carry none.
    pub oid: String,
    /// `yyyy-MM-dd HH:mm:ss` as sent by the server.
    pub time: String,
    pub sender: Sender,
    pub kind: MessageKind,
}

impl InboundMessage {
    /// Decode one raw text frame.
    ///
    /// Only a malformed envelope is an error. A chat body that fails to decode
    /// as a structured payload stays plain chat.
    pub fn decode(raw: &[u8]) -> Result<Self> {
        let w: WireFrame = serde_json::from_slice(raw)
            .map_err(|e| FishPiError::Decode(format!("invalid frame json: {e}")))?;
        Ok(Self::from_wire(w))
    }

    /// Decode from an already parsed JSON value (history replay, tests).
    pub fn from_value(v: Value) -> Result<Self> {
        let w: WireFrame = serde_json::from_value(v)
            .map_err(|e| FishPiError::Decode(format!("invalid frame json: {e}")))?;
        Ok(Self::from_wire(w))
    }

    fn from_wire(w: WireFrame) -> Self {
        let sender = Sender {
            user_name: w.user_name,
            nickname: w.user_nickname,
            avatar_url: w.user_avatar_url,
            avatar_url_20: w.user_avatar_url_20,
            avatar_url_48: w.user_avatar_url_48,
            avatar_url_210: w.user_avatar_url_210,
        };

        let kind = match w.msg_type.as_str() {
            kind::ONLINE => MessageKind::Online(OnlineSnapshot {
                discussing: w.discussing,
                online_count: w.online_chat_cnt,
                users: w.users,
            }),
            kind::DISCUSS_CHANGED => MessageKind::DiscussChanged(w.new_discuss),
            kind::REVOKE => MessageKind::Revoke,
            kind::MSG => {
                let payload = StructuredPayload::detect(&w.content);
                MessageKind::Chat(ChatBody {
                    md: if w.md.is_empty() { None } else { Some(w.md) },
                    content: w.content,
                    client: w.client,
                    sys_metal: w.sys_metal,
                    payload,
                })
            }
            kind::RED_PACKET_STATUS => MessageKind::RedPacketStatus(RedPacketStatus {
                who_got: w.who_got,
                who_give: w.who_give,
                got: w.got,
                count: w.count,
            }),
            kind::CUSTOM_MESSAGE => MessageKind::CustomMessage(w.message),
            kind::BARRAGE => MessageKind::Barrage(Barrage {
                color: w.barrage_color,
                content: w.barrage_content,
            }),
            _ => MessageKind::Unknown(w.msg_type),
        };

        Self {
            oid: w.o_id,
            time: w.time,
            sender,
            kind,
        }
    }

    pub fn is_chat(&self) -> bool {
        matches!(self.kind, MessageKind::Chat(_))
    }

    pub fn chat(&self) -> Option<&ChatBody> {
        match &self.kind {
            MessageKind::Chat(body) => Some(body),
            _ => None,
        }
    }

    /// Markdown if present, otherwise the raw content. Empty for non-chat frames.
    pub fn text_source(&self) -> &str {
        match &self.kind {
            MessageKind::Chat(body) => body.md.as_deref().unwrap_or(&body.content),
            _ => "",
        }
    }
}
