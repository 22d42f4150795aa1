//! Error types for the overlay studio

use thiserror::Error;

/// Main error type for the application
#[derive(Error, Debug)]
pub enum Error {
    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),

    #[error("Sync error: {0}")]
    Sync(#[from] SyncError),

    #[error("Playback error: {0}")]
    Playback(#[from] PlaybackError),

    #[error("Gesture error: {0}")]
    Gesture(#[from] GestureError),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Rejections raised before any store mutation happens
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    #[error("Overlay content must not be empty")]
    EmptyContent,

    #[error("Overlay id already in use: {0}")]
    DuplicateId(String),
}

/// Remote authority errors
///
/// These never roll back local state; callers log them and move on.
#[derive(Error, Debug, Clone)]
pub enum SyncError {
    #[error("Request failed: {0}")]
    Transport(String),

    #[error("Remote returned status {status}: {message}")]
    Status { status: u16, message: String },

    #[error("Remote rejected request: {0}")]
    Rejected(String),

    #[error("Malformed response: {0}")]
    Decode(String),

    #[error("Timeout")]
    Timeout,
}

impl From<reqwest::Error> for SyncError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            SyncError::Timeout
        } else if err.is_decode() {
            SyncError::Decode(err.to_string())
        } else if let Some(status) = err.status() {
            SyncError::Status {
                status: status.as_u16(),
                message: err.to_string(),
            }
        } else {
            SyncError::Transport(err.to_string())
        }
    }
}

/// Media engine and element errors
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum PlaybackError {
    #[error("No media element mounted")]
    NoElement,

    #[error("Failed to attach source: {0}")]
    AttachFailed(String),

    #[error("Stream error: {0}")]
    Fatal(String),

    #[error("Failed to play video: {0}")]
    PlayRejected(String),

    #[error("Video playback error")]
    Element,
}

/// Gesture errors
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum GestureError {
    #[error("Another gesture is already active on {0}")]
    Busy(String),

    #[error("Overlay not found: {0}")]
    UnknownOverlay(String),

    #[error("Resize handles are only available on the selected overlay: {0}")]
    HandleUnavailable(String),

    #[error("No gesture is active")]
    NoActiveGesture,
}

/// Result type alias for the application
pub type Result<T> = std::result::Result<T, Error>;
