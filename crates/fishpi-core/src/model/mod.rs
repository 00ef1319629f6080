//! REST reply models and their terminal renderings.

pub mod breezemoon;
pub mod history;
pub mod red_packet;
pub mod user;

use chrono::{Local, TimeZone};
use serde::{Deserialize, Deserializer};
use serde_json::Value;

pub use breezemoon::BreezeMoon;
pub use history::HistoryEntry;
pub use red_packet::{ClaimResult, Gesture};
pub use user::UserInfo;

/// Outcome of claiming yesterday's liveness reward.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RewardOutcome {
    Claimed(i64),
    AlreadyClaimed,
}

impl std::fmt::Display for RewardOutcome {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RewardOutcome::Claimed(n) => write!(f, "领取到{n}积分"),
            RewardOutcome::AlreadyClaimed => f.write_str("积分已经领取"),
        }
    }
}

/// Unix milliseconds as local `yyyy-MM-dd HH:mm:ss`; empty when out of range.
pub fn local_time_millis(ms: i64) -> String {
    Local
        .timestamp_millis_opt(ms)
        .single()
        .map(|t| t.format("%Y-%m-%d %H:%M:%S").to_string())
        .unwrap_or_default()
}

/// Accept a JSON string, number, bool or null as a string.
pub(crate) fn string_or_number<'de, D>(d: D) -> std::result::Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match Value::deserialize(d)? {
        Value::String(s) => s,
        Value::Null => String::new(),
        other => other.to_string(),
    })
}
