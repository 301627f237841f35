//! Error types for the guidance pipeline.

use thiserror::Error;

/// Failure of a single speech backend call.
#[derive(Error, Debug)]
pub enum SynthesisError {
    /// Backend cannot be reached at all (missing binary, engine failed to start).
    #[error("speech backend unavailable: {0}")]
    Unavailable(String),

    /// Backend is up but the utterance could not be rendered.
    #[error("utterance could not be rendered: {0}")]
    Rendering(String),

    #[error("speech IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl SynthesisError {
    /// Transient failures are worth a reinit + retry. A backend that is
    /// unavailable will not come back by retrying the same utterance.
    pub fn is_transient(&self) -> bool {
        !matches!(self, SynthesisError::Unavailable(_))
    }
}

/// Startup and shutdown errors. Everything between the two degrades to
/// dropped messages instead of surfacing here.
#[derive(Error, Debug)]
pub enum GuidanceError {
    #[error("no speech backend could be acquired: {0}")]
    NoSpeechBackend(String),

    #[error("invalid configuration: {0}")]
    Config(String),

    #[error("configuration parse error: {0}")]
    ConfigParse(#[from] toml::de::Error),

    #[error("delivery worker did not stop within {0:?}")]
    ShutdownTimedOut(std::time::Duration),

    #[error("delivery worker panicked: {0}")]
    WorkerPanicked(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

pub type GuidanceResult<T> = Result<T, GuidanceError>;
