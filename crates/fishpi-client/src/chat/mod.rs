//! Chat-room application layer.

pub mod commands;
pub mod send_mode;
pub mod session;

pub use commands::{PacketSlot, RoomCommand, SendCommand};
pub use send_mode::SendMode;
pub use session::{ChatOptions, ChatSessionCore, KEEPALIVE_PAYLOAD};
