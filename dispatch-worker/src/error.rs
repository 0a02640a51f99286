//! Error types shared by the dispatch loops.

use thiserror::Error;

/// Errors raised by the store, the gateway and the loops built on them.
///
/// None of these are fatal to a loop: callers log them and carry on with
/// the next recipient, identity or tick.
#[derive(Debug, Error)]
pub enum DispatchError {
    /// Missing credentials, templates or identities.
    #[error("configuration error: {0}")]
    Config(String),

    /// Network-level failure talking to the gateway.
    #[error("transport error: {0}")]
    Transport(#[from] reqwest::Error),

    /// The gateway answered with a non-success status.
    #[error("gateway returned status {status}: {body}")]
    Gateway { status: u16, body: String },

    #[error("invalid gateway url: {0}")]
    Url(#[from] url::ParseError),

    /// Reading or writing a persisted collection failed.
    #[error("store error: {0}")]
    Store(String),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("serialization error: {0}")]
    Serde(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, DispatchError>;
