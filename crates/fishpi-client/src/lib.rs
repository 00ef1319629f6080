//! fishpi client library.
//!
//! Runtime half of the client: the event bus, the reconnecting websocket
//! session, the chat-room session core, liveness tracking, the REST client,
//! configuration, and the companion-bot bridge. Consumed by the binary
//! (`main.rs`) and by integration tests.

pub mod api;
pub mod app;
pub mod bus;
pub mod chat;
pub mod config;
pub mod elves;
pub mod ice;
pub mod liveness;
pub mod obs;
pub mod transport;
