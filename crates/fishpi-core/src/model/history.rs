//! Chat history page entries.

use serde::Deserialize;

use crate::protocol::render::{clock, strip_paragraph};

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct HistoryEntry {
    pub o_id: String,
    pub time: String,
    pub user_name: String,
    pub user_nickname: String,
    pub content: String,
    pub md: String,
}

impl HistoryEntry {
    pub fn render(&self) -> String {
        format!(
            "{} {}({}): {}",
            clock(&self.time),
            self.user_nickname,
            self.user_name,
            strip_paragraph(&self.content)
        )
    }
}

/// Sort oldest first. `yyyy-MM-dd HH:mm:ss` orders lexically.
pub fn sort_oldest_first(entries: &mut [HistoryEntry]) {
    entries.sort_by(|a, b| a.time.cmp(&b.time));
}
