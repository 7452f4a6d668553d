//! Lossless audio/video frame codec for laserdisc hunk images.
//!
//! Each hunk of a disc image holds one combined unit: up to two fields of
//! interlaced YCbCr 4:2:2 video, up to 16 channels of 16-bit audio, and an
//! optional opaque metadata blob (the player stores packed VBI codes there).
//!
//! # Compression scheme
//!
//! - Video: per-plane (Y, Cb, Cr) wrapping byte deltas, zero-run collapse,
//!   canonical Huffman with a 272-symbol alphabet and per-frame tables.
//! - Audio: per-channel wrapping sample deltas split into high/low byte
//!   streams, each Huffman coded; raw storage fallback when smaller.
//! - All arithmetic is explicitly wrapping; round trips are bit exact.
//!
//! # Contexts
//!
//! [`AvEncoder`] and [`AvDecoder`] carry delta context across calls within a
//! continuous stream. Resetting either side marks a discontinuity; the frame
//! that follows must be standalone. Disc images are mastered from standalone
//! frames only, which is what keeps hunks randomly accessible.

pub mod bitstream;
pub mod decoder;
pub mod encoder;
pub mod error;
pub mod frame;
pub mod huffman;
mod planes;

pub use decoder::AvDecoder;
pub use encoder::AvEncoder;
pub use error::{CodecError, Result};
pub use frame::{
    FrameBuffers, FrameDesc, RawFrame, RawFrameBuf, MAX_CHANNELS, MAX_HEIGHT, MAX_METADATA,
    MAX_SAMPLES, MAX_WIDTH, RAW_HEADER_BYTES,
};

/// Compressed hunk header size in bytes.
pub const COMP_HEADER_BYTES: usize = 9;

/// Header flag: frame deltas reference the previous frame's context.
pub const FLAG_CONTINUATION: u8 = 0x01;

/// Audio channel method: uncompressed big-endian samples.
pub const AUDIO_METHOD_RAW: u8 = 0;

/// Audio channel method: delta + split high/low Huffman streams.
pub const AUDIO_METHOD_HUFF: u8 = 1;
