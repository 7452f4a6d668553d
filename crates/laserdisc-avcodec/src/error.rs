//! Error types for frame encoding and decoding.

/// Error type for codec operations.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum CodecError {
    /// Malformed or truncated compressed bitstream
    #[error("Invalid compressed data: {0}")]
    InvalidData(&'static str),

    /// Video geometry exceeds format limits
    #[error("Video too large: {width}x{height}")]
    VideoTooLarge {
        /// Requested frame width in pixels
        width: u32,
        /// Requested frame height in scanlines
        height: u32,
    },

    /// Audio sample count exceeds format limits
    #[error("Audio too large: {samples} samples")]
    AudioTooLarge {
        /// Requested samples per channel
        samples: u32,
    },

    /// Metadata blob exceeds the 255-byte format limit
    #[error("Metadata too large: {len} bytes")]
    MetadataTooLarge {
        /// Requested metadata length
        len: usize,
    },

    /// Requested allocation exceeds the safe allocation cap
    #[error("Out of memory: requested {requested} bytes")]
    OutOfMemory {
        /// Requested allocation size
        requested: usize,
    },

    /// Huffman table construction failed to converge within capacity
    #[error("Compression error: {0}")]
    CompressionError(&'static str),

    /// Channel count exceeds the 16-channel format limit
    #[error("Too many channels: {channels}")]
    TooManyChannels {
        /// Requested channel count
        channels: u32,
    },

    /// Output buffer set does not match the stream being decoded
    #[error("Invalid configuration: {0}")]
    InvalidConfiguration(&'static str),

    /// Invalid parameter passed to an encode or decode call
    #[error("Invalid parameter: {0}")]
    InvalidParameter(&'static str),

    /// Destination buffer capacity is insufficient for this frame
    #[error("Buffer too small: need {needed}, have {capacity}")]
    BufferTooSmall {
        /// Bytes or samples required
        needed: usize,
        /// Bytes or samples available
        capacity: usize,
    },
}

/// Result type for codec operations.
pub type Result<T> = std::result::Result<T, CodecError>;
