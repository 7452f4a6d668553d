//! Error types for the player core.

use laserdisc_avcodec::CodecError;
use laserdisc_image::ImageError;

/// Error type for player operations.
#[derive(thiserror::Error, Debug)]
pub enum PlayerError {
    /// Error from the disc source
    #[error("Disc error: {0}")]
    Disc(#[from] ImageError),

    /// Error from the frame codec
    #[error("Codec error: {0}")]
    Codec(#[from] CodecError),

    /// Invalid player configuration
    #[error("Invalid configuration: {0}")]
    Config(&'static str),

    /// The read-ahead worker terminated unexpectedly
    #[error("Read-ahead pipeline is gone")]
    PipelineGone,
}

impl PlayerError {
    /// Whether this failure must abort playback instead of repeating the
    /// last good frame (resource exhaustion only).
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            PlayerError::Codec(CodecError::OutOfMemory { .. })
                | PlayerError::Disc(ImageError::NoMemory { .. })
        )
    }
}

/// Result type for player operations.
pub type Result<T> = std::result::Result<T, PlayerError>;
