//! Error types for the VoiceSOS pipeline

use thiserror::Error;

/// Result type alias for VoiceSOS operations
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur in the capture pipeline
#[derive(Debug, Error)]
pub enum Error {
    /// Microphone or location permission refused. User-visible, no retry.
    #[error("permission denied: {0}")]
    PermissionDenied(String),

    /// The configured recognition engine is not available in this build.
    /// Fatal for the session; the controller stays Idle.
    #[error("speech recognition unsupported: {0}")]
    RecognitionUnsupported(String),

    /// Transient recognition failure. Recoverable errors trigger a delayed
    /// restart of listening.
    #[error("recognition error: {0}")]
    Recognition(String),

    /// Microphone lost or misbehaving mid-capture. Aborts the session
    /// without producing an artifact.
    #[error("audio device error: {0}")]
    Device(String),

    /// Audio encoding error
    #[error("audio error: {0}")]
    Audio(String),

    /// The notification store rejected the incident. Logged, non-fatal.
    #[error("incident submission failed: {0}")]
    Submission(String),

    /// Location lookup failure
    #[error("location error: {0}")]
    Location(String),

    /// The controller task is gone or rejected a command
    #[error("controller unavailable: {0}")]
    Controller(String),

    /// Configuration error
    #[error("configuration error: {0}")]
    Config(String),

    /// IO error
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization error
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}
