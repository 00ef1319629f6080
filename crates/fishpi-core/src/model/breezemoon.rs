//! Moon posts ("breeze-moon").

use serde::Deserialize;

use super::local_time_millis;
use crate::protocol::render::strip_paragraph;

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct BreezeMoon {
    pub breezemoon_author_name: String,
    /// Unix milliseconds.
    pub breezemoon_created: i64,
    pub breezemoon_content: String,
    pub breezemoon_city: String,
    pub time_ago: String,
    pub o_id: String,
}

impl BreezeMoon {
    pub fn render(&self) -> String {
        format!(
            "{} {}({}): {}({})",
            local_time_millis(self.breezemoon_created),
            self.breezemoon_author_name,
            self.breezemoon_city,
            strip_paragraph(&self.breezemoon_content),
            self.time_ago
        )
    }
}

/// Oldest first, one post per line.
pub fn render_list(mut posts: Vec<BreezeMoon>) -> String {
    posts.sort_by_key(|p| p.breezemoon_created);
    posts.iter().map(BreezeMoon::render).collect::<Vec<_>>().join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn list_is_sorted_by_creation() {
        let a = BreezeMoon {
            breezemoon_author_name: "late".into(),
            breezemoon_created: 2_000,
            ..Default::default()
        };
        let b = BreezeMoon {
            breezemoon_author_name: "early".into(),
            breezemoon_created: 1_000,
            breezemoon_content: "<p>hi</p>".into(),
            ..Default::default()
        };
        let out = render_list(vec![a, b]);
        let lines: Vec<&str> = out.lines().collect();
        assert!(lines[0].contains("early(): hi()"));
        assert!(lines[1].contains("late"));
    }
}
