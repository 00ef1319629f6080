//! Chat-room wire formats.
//!
//! - `frame`: the JSON envelope of every chat-room frame, decoded into a typed variant.
//! - `payload`: structured documents embedded in chat content.
//! - `weather`: the two weather card encodings and their table rendering.
//! - `render`: one canonical text template per variant.
//! - `ice`: companion-bot exchange messages.
//!
//! Decoding never panics: malformed input surfaces as `FishPiError::Decode`
//! or degrades to plain text.

pub mod frame;
pub mod ice;
pub mod payload;
pub mod render;
pub mod weather;

pub use frame::{InboundMessage, MessageKind, Sender};
pub use payload::{RedPacket, RedPacketKind, StructuredPayload};
