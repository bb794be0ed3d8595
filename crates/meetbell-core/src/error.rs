//! Error types shared by every Meetbell crate.

use thiserror::Error;

/// Unified error type for store, notification and configuration failures.
#[derive(Error, Debug)]
pub enum MeetbellError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Store error: {0}")]
    Store(String),

    #[error("Notification error: {0}")]
    Notify(String),

    #[error("Invalid meeting: {0}")]
    InvalidMeeting(String),

    #[error("Meeting not found: {0}")]
    NotFound(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl MeetbellError {
    /// Delivery failures are worth logging but never retried by the engine.
    pub fn is_delivery_failure(&self) -> bool {
        matches!(self, MeetbellError::Notify(_))
    }
}

pub type Result<T> = std::result::Result<T, MeetbellError>;
