//! Parsing of the two stdin command sets.
//!
//! Room commands act on what the session has seen on the wire (red packets,
//! own messages). Send commands drive the REST client directly.

use fishpi_core::model::Gesture;

pub const HELP: &str = "help - 查看帮助信息
liveness - 查询当前活跃度（官方查询时间间隔建议为30s 本程序未作限制）
reward - 查询昨日活跃奖励是否已经领取并自动领取
stick - 召唤小飞棍
info-{username} - 查询用户信息 {username}为想要查询的用户的用户名
bb-{messsage} - 发布明月清风
topic-{new topic content} - 发布新话题
barrage-{message} - 发送弹幕
bb-list-{20-1} - 获取明月清风 每页20条 第一页
bb-user-{username-20-1} 获取username的明月清风 每页20条 第一页

其余信息将作为普通信息直接发送";

pub const BARRAGE_COLOR: &str = "#66CCFF";
const DEFAULT_PAGE_SIZE: u32 = 20;

/// Which remembered red packet a room command opens.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PacketSlot {
    /// Random and average packets.
    Normal,
    RockPaperScissors,
    Heartbeat,
    Specify,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RoomCommand {
    OpenRedPacket {
        slot: PacketSlot,
        gesture: Option<Gesture>,
    },
    Revoke,
    Repeat,
    Topic,
    Invalid(String),
}

impl RoomCommand {
    pub fn parse(input: &str) -> Self {
        let cmd = input.trim();
        let open = |slot| RoomCommand::OpenRedPacket {
            slot,
            gesture: Gesture::from_command(cmd),
        };
        match cmd {
            "0" => open(PacketSlot::Normal),
            "1" | "2" | "3" => open(PacketSlot::RockPaperScissors),
            "4" => open(PacketSlot::Heartbeat),
            "5" => open(PacketSlot::Specify),
            "revoke" => RoomCommand::Revoke,
            "repeat" => RoomCommand::Repeat,
            "topic" => RoomCommand::Topic,
            other => RoomCommand::Invalid(other.to_string()),
        }
    }

    pub fn is_valid(&self) -> bool {
        !matches!(self, RoomCommand::Invalid(_))
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SendCommand {
    Help,
    Liveness,
    Reward,
    Stick,
    Info(String),
    BreezeMoon(String),
    BreezeMoonList { size: u32, page: u32 },
    BreezeMoonUser { name: String, size: u32, page: u32 },
    /// Text for the chat room, after topic/barrage wrapping.
    Chat(String),
}

impl SendCommand {
    /// `None` for blank input.
    pub fn parse(input: &str) -> Option<Self> {
        let msg = input.trim();
        if msg.is_empty() {
            return None;
        }
        let cmd = match msg {
            "help" => SendCommand::Help,
            "liveness" => SendCommand::Liveness,
            "reward" => SendCommand::Reward,
            "stick" => SendCommand::Stick,
            _ => {
                if let Some(name) = msg.strip_prefix("info-") {
                    SendCommand::Info(name.to_string())
                } else if let Some(args) = msg.strip_prefix("bb-list-") {
                    let mut it = args.split('-');
                    SendCommand::BreezeMoonList {
                        size: number_or(it.next(), DEFAULT_PAGE_SIZE),
                        page: number_or(it.next(), 1),
                    }
                } else if let Some(args) = msg.strip_prefix("bb-user-") {
                    let mut it = args.split('-');
                    SendCommand::BreezeMoonUser {
                        name: it.next().unwrap_or_default().to_string(),
                        size: number_or(it.next(), DEFAULT_PAGE_SIZE),
                        page: number_or(it.next(), 1),
                    }
                } else if let Some(text) = msg.strip_prefix("bb-") {
                    SendCommand::BreezeMoon(text.to_string())
                } else if let Some(topic) = msg.strip_prefix("topic-") {
                    SendCommand::Chat(format!("[setdiscuss]{topic}[/setdiscuss]"))
                } else if let Some(text) = msg.strip_prefix("barrage-") {
                    let body = serde_json::json!({ "color": BARRAGE_COLOR, "content": text });
                    SendCommand::Chat(format!("[barrager]{body}[/barrager]"))
                } else {
                    SendCommand::Chat(msg.to_string())
                }
            }
        };
        Some(cmd)
    }
}

fn number_or(s: Option<&str>, default: u32) -> u32 {
    s.and_then(|v| v.trim().parse().ok()).unwrap_or(default)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn room_commands() {
        assert_eq!(
            RoomCommand::parse("2"),
            RoomCommand::OpenRedPacket {
                slot: PacketSlot::RockPaperScissors,
                gesture: Some(Gesture::Scissors)
            }
        );
        assert_eq!(
            RoomCommand::parse("0"),
            RoomCommand::OpenRedPacket {
                slot: PacketSlot::Normal,
                gesture: None
            }
        );
        assert_eq!(RoomCommand::parse(" revoke "), RoomCommand::Revoke);
        assert_eq!(RoomCommand::parse("6"), RoomCommand::Invalid("6".into()));
    }

    #[test]
    fn send_commands() {
        assert_eq!(SendCommand::parse("  "), None);
        assert_eq!(
            SendCommand::parse("topic-摸鱼"),
            Some(SendCommand::Chat("[setdiscuss]摸鱼[/setdiscuss]".into()))
        );
        assert_eq!(
            SendCommand::parse("barrage-hi"),
            Some(SendCommand::Chat(
                r##"[barrager]{"color":"#66CCFF","content":"hi"}[/barrager]"##.into()
            ))
        );
        assert_eq!(
            SendCommand::parse("bb-list-"),
            Some(SendCommand::BreezeMoonList { size: 20, page: 1 })
        );
        assert_eq!(
            SendCommand::parse("bb-user-bob-10-2"),
            Some(SendCommand::BreezeMoonUser {
                name: "bob".into(),
                size: 10,
                page: 2
            })
        );
        assert_eq!(
            SendCommand::parse("bb-今天天气不错"),
            Some(SendCommand::BreezeMoon("今天天气不错".into()))
        );
        assert_eq!(SendCommand::parse("info-bob"), Some(SendCommand::Info("bob".into())));
    }

    #[test]
    fn barrage_text_is_json_escaped() {
        let Some(SendCommand::Chat(msg)) = SendCommand::parse(r#"barrage-say "hi""#) else {
            panic!("not a chat message");
        };
        let body = msg
            .strip_prefix("[barrager]")
            .and_then(|m| m.strip_suffix("[/barrager]"))
            .unwrap();
        let v: serde_json::Value = serde_json::from_str(body).unwrap();
        assert_eq!(v["content"], r#"say "hi""#);
        assert_eq!(v["color"], BARRAGE_COLOR);
    }
}
