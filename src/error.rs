use chrono::{DateTime, Utc};
use reqwest::StatusCode;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum DoraError {
    #[error("Network error: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("JSON decode error: {0}")]
    Decode(#[from] serde_json::Error),

    #[error("Upstream returned {status}: {body}")]
    Upstream { status: StatusCode, body: String },

    #[error("Invalid continuation cursor {cursor:?}: {reason}")]
    InvalidCursor { cursor: String, reason: String },

    #[error("{source_name} returned more than {pages} pages, giving up")]
    PageLimitExceeded { source_name: String, pages: u32 },

    #[error("No data in window to compute {metric}")]
    NoDataInWindow { metric: &'static str },

    #[error("Invalid time window: start {start} is after end {end}")]
    InvalidWindow {
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    },

    #[error("Invalid configuration: {0}")]
    Config(String),
}

pub type Result<T> = std::result::Result<T, DoraError>;
