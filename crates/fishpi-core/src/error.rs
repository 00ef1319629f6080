//! Shared error type across fishpi crates.

use thiserror::Error;

/// Stable error codes, used in log fields and test assertions.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCode {
    /// Invalid input / malformed request.
    BadRequest,
    /// Configuration could not be loaded or failed validation.
    Config,
    /// Login failed or the access key was rejected.
    AuthFailed,
    /// Requested entity does not exist.
    NotFound,
    /// Remote API answered with a non-zero code.
    Api,
    /// Session start requested while a connection exists.
    AlreadyConnected,
    /// Session operation requested without a connection.
    NotConnected,
    /// Dial, read or write failure on a socket or HTTP call.
    Transport,
    /// Frame or reply body could not be decoded.
    Decode,
    /// Local filesystem failure.
    Io,
    /// Internal error.
    Internal,
}

impl ErrorCode {
    /// String representation used in logs.
    pub fn as_str(self) -> &'static str {
        match self {
            ErrorCode::BadRequest => "BAD_REQUEST",
            ErrorCode::Config => "CONFIG",
            ErrorCode::AuthFailed => "AUTH_FAILED",
            ErrorCode::NotFound => "NOT_FOUND",
            ErrorCode::Api => "API",
            ErrorCode::AlreadyConnected => "ALREADY_CONNECTED",
            ErrorCode::NotConnected => "NOT_CONNECTED",
            ErrorCode::Transport => "TRANSPORT",
            ErrorCode::Decode => "DECODE",
            ErrorCode::Io => "IO",
            ErrorCode::Internal => "INTERNAL",
        }
    }
}

/// Shared result type.
pub type Result<T> = std::result::Result<T, FishPiError>;

/// Unified error type used by core and client.
#[derive(Debug, Error)]
pub enum FishPiError {
    #[error("bad request: {0}")]
    BadRequest(String),
    #[error("config: {0}")]
    Config(String),
    #[error("auth failed: {0}")]
    AuthFailed(String),
    #[error("not found: {0}")]
    NotFound(String),
    #[error("api error, code: {code}, msg: {msg}")]
    Api { code: i64, msg: String },
    #[error("旧连接尚未断开")]
    AlreadyConnected,
    #[error("没有检测到连接")]
    NotConnected,
    #[error("transport: {0}")]
    Transport(String),
    #[error("decode: {0}")]
    Decode(String),
    #[error("io: {0}")]
    Io(String),
    #[error("internal: {0}")]
    Internal(String),
}

impl FishPiError {
    /// Map to a stable code.
    pub fn code(&self) -> ErrorCode {
        match self {
            FishPiError::BadRequest(_) => ErrorCode::BadRequest,
            FishPiError::Config(_) => ErrorCode::Config,
            FishPiError::AuthFailed(_) => ErrorCode::AuthFailed,
            FishPiError::NotFound(_) => ErrorCode::NotFound,
            FishPiError::Api { .. } => ErrorCode::Api,
            FishPiError::AlreadyConnected => ErrorCode::AlreadyConnected,
            FishPiError::NotConnected => ErrorCode::NotConnected,
            FishPiError::Transport(_) => ErrorCode::Transport,
            FishPiError::Decode(_) => ErrorCode::Decode,
            FishPiError::Io(_) => ErrorCode::Io,
            FishPiError::Internal(_) => ErrorCode::Internal,
        }
    }
}

impl From<serde_json::Error> for FishPiError {
    fn from(e: serde_json::Error) -> Self {
        FishPiError::Decode(e.to_string())
    }
}

impl From<std::io::Error> for FishPiError {
    fn from(e: std::io::Error) -> Self {
        FishPiError::Io(e.to_string())
    }
}
