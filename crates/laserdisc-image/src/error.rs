//! Error types for disc image access.

/// Error type for disc source operations.
#[derive(thiserror::Error, Debug)]
pub enum ImageError {
    /// Image file does not exist
    #[error("File not found: {0}")]
    FileNotFound(String),

    /// Image file exists but cannot be opened for writing
    #[error("File not writeable: {0}")]
    FileNotWriteable(String),

    /// Requested hunk is absent or out of range
    #[error("Hunk {index} not found (image has {count})")]
    HunkNotFound {
        /// Requested hunk index
        index: u32,
        /// Hunks present in the image
        count: u32,
    },

    /// Destination buffer is shorter than the image's hunk size
    #[error("Buffer too small: need {needed}, have {capacity}")]
    BufferTooSmall {
        /// Bytes required (one hunk)
        needed: usize,
        /// Bytes available
        capacity: usize,
    },

    /// Difference file geometry does not match its base
    #[error("Metadata mismatch: {0}")]
    MetadataMismatch(&'static str),

    /// Malformed image header
    #[error("Invalid image header: {0}")]
    InvalidHeader(&'static str),

    /// Requested allocation exceeds the safe allocation cap
    #[error("Out of memory: requested {requested} bytes")]
    NoMemory {
        /// Requested allocation size
        requested: u64,
    },

    /// IO error from the filesystem
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type for disc source operations.
pub type Result<T> = std::result::Result<T, ImageError>;
