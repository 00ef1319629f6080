//! Socket message classification for the reader loop.
//!
//! - Text and binary frames become raw bytes for the inbound queue
//! - Ping/Pong are surfaced for logging
//! - Close carries the peer's code and reason

use bytes::Bytes;
use tokio_tungstenite::tungstenite::Message;

#[derive(Debug, PartialEq)]
pub enum Inbound {
    Frame(Bytes),
    Ping(Vec<u8>),
    Pong(Vec<u8>),
    /// 1005 (no status) when the peer sent no close payload.
    Close { code: u16, reason: String },
    Ignored,
}

pub fn decode(msg: Message) -> Inbound {
    match msg {
        Message::Text(s) => Inbound::Frame(Bytes::from(s)),
        Message::Binary(b) => Inbound::Frame(Bytes::from(b)),
        Message::Ping(v) => Inbound::Ping(v),
        Message::Pong(v) => Inbound::Pong(v),
        Message::Close(Some(f)) => Inbound::Close {
            code: u16::from(f.code),
            reason: f.reason.into_owned(),
        },
        Message::Close(None) => Inbound::Close {
            code: 1005,
            reason: String::new(),
        },
        Message::Frame(_) => Inbound::Ignored,
    }
}
