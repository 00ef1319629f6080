//! Line filter for plain chat text.
//!
//! Quote blocks, the quote heading, and blank lines are always dropped. On top
//! of that a configurable denylist removes any line containing one of its
//! substrings (bot footers, tracking badges and the like).

/// Substrings dropped when no denylist is configured. Matched byte-for-byte.
pub const DEFAULT_DENYLIST: &[&str] = &[
    "https://zsh4869.github.io/fishpi.io/?hyd=",
    "extension-message",
    ":sweat_drops:",
    "下次更新时间",
    "https://unv-shield.librian.net/api/unv_shield",
    "EXP",
];

const QUOTE_PREFIX: &str = ">";
const QUOTE_HEADING_PREFIX: &str = "##### 引用";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LineFilter {
    denylist: Vec<String>,
}

impl Default for LineFilter {
    fn default() -> Self {
        Self::new(DEFAULT_DENYLIST.iter().map(|s| s.to_string()).collect())
    }
}

impl LineFilter {
    pub fn new(denylist: Vec<String>) -> Self {
        Self { denylist }
    }

    pub fn denylist(&self) -> &[String] {
        &self.denylist
    }

    pub fn keeps(&self, line: &str) -> bool {
        if line.starts_with(QUOTE_PREFIX) || line.starts_with(QUOTE_HEADING_PREFIX) {
            return false;
        }
        if line.trim().is_empty() {
            return false;
        }
        !self.denylist.iter().any(|d| line.contains(d.as_str()))
    }

    /// Keep only the lines that pass `keeps`, joined by `\n`.
    pub fn apply(&self, text: &str) -> String {
        text.split('\n')
            .filter(|l| self.keeps(l))
            .collect::<Vec<_>>()
            .join("\n")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn drops_quotes_blank_and_denylisted() {
        let text = "hello\n> quoted\n##### 引用 @bob\n\n   \nEXP +1\nworld";
        assert_eq!(LineFilter::default().apply(text), "hello\nworld");
    }

    #[test]
    fn custom_denylist_replaces_default() {
        let f = LineFilter::new(vec!["spam".into()]);
        assert_eq!(f.apply("EXP stays\nspam goes"), "EXP stays");
    }
}
