//! Director error types.

use cadenza_common::BusCategory;
use cadenza_kernel::backend::AudioError;
use thiserror::Error;

/// Errors reported by the audio director.
#[derive(Debug, Error)]
pub enum DirectorError {
    /// No loop is registered under this id.
    #[error("Loop not found: '{0}'")]
    LoopNotFound(String),

    /// The bus for this category could not be resolved at startup.
    #[error("Bus not mapped: {0}")]
    BusNotFound(BusCategory),

    /// The director has been torn down.
    #[error("Audio director has been shut down")]
    ShutDown,

    /// The process-wide director is already borrowed further up the stack.
    #[error("Audio director is already in use on this thread")]
    Reentrant,

    /// Engine failure.
    #[error(transparent)]
    Audio(#[from] AudioError),
}

/// Result type for director operations.
pub type DirectorResult<T> = Result<T, DirectorError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = DirectorError::LoopNotFound("rain".to_string());
        assert_eq!(err.to_string(), "Loop not found: 'rain'");

        let err = DirectorError::BusNotFound(BusCategory::Bgm);
        assert!(err.to_string().contains("BGM"));
    }

    #[test]
    fn test_audio_error_converts() {
        let err: DirectorError = AudioError::TrackNotFound("event:/Nope".into()).into();
        assert!(matches!(err, DirectorError::Audio(_)));
        assert!(err.to_string().contains("event:/Nope"));
    }
}
