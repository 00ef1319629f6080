//! Structured payloads embedded in chat content.
//!
//! A chat `content` is either a JSON document (`msgType` = redPacket, weather,
//! music) or HTML that may carry one of two weather card iframes. Detection
//! yields at most one payload; anything unrecognised stays plain chat.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::{FishPiError, Result};
use crate::protocol::weather::{self, Weather, WeatherNow};

pub const MSG_TYPE_RED_PACKET: &str = "redPacket";
pub const MSG_TYPE_WEATHER: &str = "weather";
pub const MSG_TYPE_MUSIC: &str = "music";

/// Red packet sub-type.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RedPacketKind {
    Random,
    Average,
    Specify,
    Heartbeat,
    RockPaperScissors,
    Other(String),
}

impl RedPacketKind {
    pub fn parse(s: &str) -> Self {
        match s {
            "random" => RedPacketKind::Random,
            "average" => RedPacketKind::Average,
            "specify" => RedPacketKind::Specify,
            "heartbeat" => RedPacketKind::Heartbeat,
            "rockPaperScissors" => RedPacketKind::RockPaperScissors,
            other => RedPacketKind::Other(other.to_string()),
        }
    }

    pub fn as_str(&self) -> &str {
        match self {
            RedPacketKind::Random => "random",
            RedPacketKind::Average => "average",
            RedPacketKind::Specify => "specify",
            RedPacketKind::Heartbeat => "heartbeat",
            RedPacketKind::RockPaperScissors => "rockPaperScissors",
            RedPacketKind::Other(s) => s,
        }
    }

    /// Localised label shown in rendered lines.
    pub fn label(&self) -> String {
        match self {
            RedPacketKind::Random => "拼手气红包".into(),
            RedPacketKind::Average => "平分红包".into(),
            RedPacketKind::Specify => "专属红包".into(),
            RedPacketKind::Heartbeat => "心跳红包".into(),
            RedPacketKind::RockPaperScissors => "猜拳红包".into(),
            RedPacketKind::Other(s) => format!("未处理类型({MSG_TYPE_RED_PACKET}.{s})"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RedPacket {
    pub kind: RedPacketKind,
    pub blessing: String,
    pub money: i64,
    pub count: i64,
    pub got: i64,
    /// Recipient list, only meaningful for `Specify`.
    pub recipients: String,
    pub sender_id: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Music {
    pub title: String,
    pub source_url: String,
    pub cover_url: String,
    pub from: String,
}

#[derive(Debug, Clone, PartialEq)]
pub enum StructuredPayload {
    RedPacket(RedPacket),
    /// Multi-day forecast, from the JSON document or the forecast iframe.
    Weather(Weather),
    /// Single-day weather card.
    WeatherNow(WeatherNow),
    Music(Music),
    /// JSON document with an unhandled `msgType`.
    Unrecognized { msg_type: String },
}

/// JSON document shape shared by every `msgType`.
#[derive(Debug, Default, Serialize, Deserialize)]
#[serde(default)]
struct WirePayload {
    #[serde(rename = "msgType")]
    msg_type: String,
    #[serde(rename = "type", skip_serializing_if = "String::is_empty")]
    sub_type: String,

    #[serde(skip_serializing_if = "String::is_empty")]
    msg: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    recivers: Option<Value>,
    #[serde(rename = "senderId", skip_serializing_if = "String::is_empty")]
    sender_id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    money: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    count: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    got: Option<i64>,

    #[serde(skip_serializing_if = "String::is_empty")]
    date: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    st: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    min: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    t: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    max: String,
    #[serde(rename = "weatherCode", skip_serializing_if = "String::is_empty")]
    weather_code: String,

    #[serde(rename = "coverURL", skip_serializing_if = "String::is_empty")]
    cover_url: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    from: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    source: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    title: String,
}

fn recipients_text(v: Option<Value>) -> String {
    match v {
        Some(Value::String(s)) => s,
        Some(Value::Array(items)) => items
            .iter()
            .map(|i| match i {
                Value::String(s) => s.clone(),
                other => other.to_string(),
            })
            .collect::<Vec<_>>()
            .join(","),
        Some(Value::Null) | None => String::new(),
        Some(other) => other.to_string(),
    }
}

fn split_list(s: &str) -> Vec<String> {
    if s.is_empty() {
        return Vec::new();
    }
    s.split(',').map(str::to_string).collect()
}

impl StructuredPayload {
    /// Detect the payload embedded in a chat `content`, if any.
    pub fn detect(content: &str) -> Option<Self> {
        if content.is_empty() {
            return None;
        }
        // escaped JSON quoted inside plain text
        if content.starts_with("{\\\"") {
            return None;
        }
        if content.trim_start().starts_with('{') {
            match Self::from_json(content) {
                Ok(p) => return Some(p),
                Err(e) => {
                    tracing::debug!(error = %e, "chat content is not a structured payload");
                }
            }
        }
        if content.contains(weather::FORECAST_CARD_URL) {
            return weather::parse_forecast_card(content).map(StructuredPayload::Weather);
        }
        if content.contains(weather::NOW_CARD_URL) {
            return weather::parse_now_card(content).map(StructuredPayload::WeatherNow);
        }
        None
    }

    /// Decode a JSON document. Documents without `msgType` are rejected.
    pub fn from_json(s: &str) -> Result<Self> {
        let w: WirePayload = serde_json::from_str(s)
            .map_err(|e| FishPiError::Decode(format!("invalid payload json: {e}")))?;
        match w.msg_type.as_str() {
            "" => Err(FishPiError::Decode("payload without msgType".into())),
            MSG_TYPE_RED_PACKET => Ok(StructuredPayload::RedPacket(RedPacket {
                kind: RedPacketKind::parse(&w.sub_type),
                blessing: w.msg,
                money: w.money.unwrap_or_default(),
                count: w.count.unwrap_or_default(),
                got: w.got.unwrap_or_default(),
                recipients: recipients_text(w.recivers),
                sender_id: w.sender_id,
            })),
            MSG_TYPE_WEATHER => Ok(StructuredPayload::Weather(Weather {
                city: w.t,
                dates: split_list(&w.date),
                codes: split_list(&w.weather_code),
                max: split_list(&w.max),
                min: split_list(&w.min),
                note: w.st,
            })),
            MSG_TYPE_MUSIC => Ok(StructuredPayload::Music(Music {
                title: w.title,
                source_url: w.source,
                cover_url: w.cover_url,
                from: w.from,
            })),
            other => Ok(StructuredPayload::Unrecognized {
                msg_type: other.to_string(),
            }),
        }
    }

    /// Encode back to the JSON document shape.
    ///
    /// The single-day card has no JSON form; it is rejected.
    pub fn to_json(&self) -> Result<String> {
        let w = match self {
            StructuredPayload::RedPacket(rp) => WirePayload {
                msg_type: MSG_TYPE_RED_PACKET.into(),
                sub_type: rp.kind.as_str().to_string(),
                msg: rp.blessing.clone(),
                recivers: if rp.recipients.is_empty() {
                    None
                } else {
                    Some(Value::String(rp.recipients.clone()))
                },
                sender_id: rp.sender_id.clone(),
                money: Some(rp.money),
                count: Some(rp.count),
                got: Some(rp.got),
                ..Default::default()
            },
            StructuredPayload::Weather(w) => WirePayload {
                msg_type: MSG_TYPE_WEATHER.into(),
                sub_type: MSG_TYPE_WEATHER.into(),
                date: w.dates.join(","),
                st: w.note.clone(),
                min: w.min.join(","),
                t: w.city.clone(),
                max: w.max.join(","),
                weather_code: w.codes.join(","),
                ..Default::default()
            },
            StructuredPayload::Music(m) => WirePayload {
                msg_type: MSG_TYPE_MUSIC.into(),
                sub_type: MSG_TYPE_MUSIC.into(),
                cover_url: m.cover_url.clone(),
                from: m.from.clone(),
                source: m.source_url.clone(),
                title: m.title.clone(),
                ..Default::default()
            },
            StructuredPayload::Unrecognized { msg_type } => WirePayload {
                msg_type: msg_type.clone(),
                ..Default::default()
            },
            StructuredPayload::WeatherNow(_) => {
                return Err(FishPiError::BadRequest(
                    "single-day weather card has no json form".into(),
                ))
            }
        };
        serde_json::to_string(&w).map_err(FishPiError::from)
    }

    pub fn red_packet(&self) -> Option<&RedPacket> {
        match self {
            StructuredPayload::RedPacket(rp) => Some(rp),
            _ => None,
        }
    }
}
