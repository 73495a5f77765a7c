use thiserror::Error;

/// Errors surfaced across the public API of this crate.
///
/// Transport and channel failures that the connection manager absorbs as
/// part of its own reconnection logic never become a `PulseError` — they
/// are logged and drive a recycle instead. This enum only covers failures
/// a caller is expected to observe: construction-time validation, a
/// caller-invoked operation against the broker, and malformed input.
#[derive(Error, Debug)]
pub enum PulseError {
    #[error("configuration error: {0}")]
    Configuration(String),

    #[error("amqp error: {0}")]
    Amqp(#[from] lapin::Error),

    #[error("credential request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("malformed message payload: {0}")]
    Json(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, PulseError>;
