//! Human-readable rendering of decoded frames.
//!
//! Each variant has exactly one template. Revoke notices need the original
//! message, which only the caller's cache knows, so they render through
//! `revoke_notice`.

use crate::filter::LineFilter;
use crate::protocol::frame::{ChatBody, InboundMessage, MessageKind};
use crate::protocol::payload::{RedPacketKind, StructuredPayload};

const KAIBAI_OPEN: &str = r#"<span class="kaibai">"#;
const KAIBAI_CLOSE: &str = "</span>";

/// `HH:mm:ss` part of a `yyyy-MM-dd HH:mm:ss` timestamp; short strings pass through.
pub fn clock(time: &str) -> &str {
    time.get(11..).unwrap_or(time)
}

/// Strip one surrounding `<p>...</p>`.
pub fn strip_paragraph(s: &str) -> &str {
    let s = s.strip_suffix("</p>").unwrap_or(s);
    s.strip_prefix("<p>").unwrap_or(s)
}

impl InboundMessage {
    /// Canonical one-template rendering. Unknown types render empty.
    pub fn render(&self, filter: &LineFilter) -> String {
        match &self.kind {
            MessageKind::Online(o) => {
                format!("当前话题：{} 在线人数：{}", o.discussing, o.online_count)
            }
            MessageKind::DiscussChanged(topic) => format!("话题变更：{topic}"),
            MessageKind::Revoke => self.revoke_notice(None, filter),
            MessageKind::Chat(body) => self.render_chat(body, filter),
            MessageKind::RedPacketStatus(s) => format!(
                "{}领取了{}发的红包({}/{})",
                s.who_got, s.who_give, s.got, s.count
            ),
            MessageKind::CustomMessage(m) => m.clone(),
            MessageKind::Barrage(b) => format!(
                "{}发送了弹幕消息：({}){}",
                self.sender.nickname, b.color, b.content
            ),
            MessageKind::Unknown(_) => String::new(),
        }
    }

    /// Revoke line, resolved against the original message when it is known.
    pub fn revoke_notice(&self, original: Option<&InboundMessage>, filter: &LineFilter) -> String {
        match original {
            Some(orig) => format!("有人撤回了一条消息：{}", orig.render(filter)),
            None => format!(
                "有人撤回了一条消息 消息内容不知道 {} {}",
                self.oid, self.sender.avatar_url_210
            ),
        }
    }

    fn prefix(&self) -> String {
        format!(
            "{} {}({})",
            clock(&self.time),
            self.sender.nickname,
            self.sender.user_name
        )
    }

    fn render_chat(&self, body: &ChatBody, filter: &LineFilter) -> String {
        match &body.payload {
            Some(StructuredPayload::RedPacket(rp)) => {
                let special = if rp.kind == RedPacketKind::Specify {
                    rp.recipients.as_str()
                } else {
                    ""
                };
                format!(
                    "{}: 我发了个{}{} 里面有{}积分({}/{})",
                    self.prefix(),
                    rp.kind.label(),
                    special,
                    rp.money,
                    rp.got,
                    rp.count
                )
            }
            Some(StructuredPayload::Weather(w)) => w.render(),
            Some(StructuredPayload::WeatherNow(w)) => w.render(),
            Some(StructuredPayload::Music(m)) => format!(
                "{}: 让我们来听「{}」吧\n\t链接: {}\n\t封面: {}\n\t来源: {}",
                self.prefix(),
                m.title,
                m.source_url,
                m.cover_url,
                m.from
            ),
            Some(StructuredPayload::Unrecognized { msg_type }) => format!(
                "{}: 发送了未处理的JSON数据({}){}",
                self.prefix(),
                msg_type,
                body.content
            ),
            None => {
                let text = filter.apply(body.md.as_deref().unwrap_or(&body.content));
                format!("{}: {}({})", self.prefix(), text, body.client)
            }
        }
    }
}

/// Replace `<span class="kaibai">CODE</span>` with a share link carrying `token`.
pub fn rewrite_kaibai(line: &str, token: &str) -> String {
    let mut out = String::with_capacity(line.len());
    let mut rest = line;
    while let Some(start) = rest.find(KAIBAI_OPEN) {
        let after = &rest[start + KAIBAI_OPEN.len()..];
        let Some(end) = after.find(KAIBAI_CLOSE) else {
            break;
        };
        let code = &after[..end];
        out.push_str(&rest[..start]);
        if !code.is_empty() && code.chars().all(|c| c.is_ascii_alphanumeric()) {
            out.push_str(&format!("https://sexy.1433.top/{code}?token={token}"));
        } else {
            out.push_str(&rest[start..start + KAIBAI_OPEN.len() + end + KAIBAI_CLOSE.len()]);
        }
        rest = &after[end + KAIBAI_CLOSE.len()..];
    }
    out.push_str(rest);
    out
}
