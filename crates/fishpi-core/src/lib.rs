//! fishpi core: chat-room frame decoding, rendering, and shared error types.
//!
//! This crate holds everything about the chat room that is pure data: the
//! frame decoder, structured payloads, text templates, the line denylist, the
//! message ring, liveness math and REST reply models. It carries no runtime
//! or network dependencies so the client and tests can drive it directly.
//!
//! # Defensive guarantees
//! Panics, `unwrap`, and `expect` are compile-denied here
//! (`#![deny(clippy::panic, clippy::unwrap_used, clippy::expect_used)]`).
//! Malformed frames surface as `FishPiError`/`Result` or degrade to plain
//! text, so a bad message from the server never takes the client down.

#![deny(clippy::unwrap_used)]
#![deny(clippy::expect_used)]
#![deny(clippy::panic)]

pub mod cache;
pub mod error;
pub mod filter;
pub mod liveness;
pub mod model;
pub mod protocol;

/// Shared result type.
pub use error::{ErrorCode, FishPiError, Result};
