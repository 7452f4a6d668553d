//! The disc source abstraction.
//!
//! A disc source is an opaque handle over a hunk-addressed image: fixed-size
//! hunks, each holding the encoded bytes for one combined audio+video frame
//! unit, plus immutable geometry metadata. The player core programs against
//! [`DiscSource`] only; concrete containers live behind it.

use crate::error::{ImageError, Result};
use serde::{Deserialize, Serialize};

/// Size of the fixed image header used by the flat and difference formats.
pub const HEADER_BYTES: usize = 64;

/// Immutable geometry and timing metadata of an opened image.
///
/// Fixed at open time; a handle is exclusively owned by one player but may be
/// shared read-only with its read-ahead worker.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DiscInfo {
    /// Number of hunks in the image
    pub hunk_count: u32,
    /// Size of every hunk in bytes
    pub hunk_bytes: u32,
    /// Logical byte length of the stored data
    pub logical_bytes: u64,
    /// Field rate in fields per second, times 1,000,000
    pub fields_per_sec_x1m: u32,
    /// Audio sample rate in Hz
    pub sample_rate: u32,
    /// Video width in pixels
    pub width: u16,
    /// Video height in scanlines per frame
    pub height: u16,
    /// Audio channel count
    pub channels: u8,
}

impl DiscInfo {
    /// Microseconds per field, derived from the fixed-point field rate.
    pub fn field_period_us(&self) -> u64 {
        if self.fields_per_sec_x1m == 0 {
            0
        } else {
            1_000_000_000_000u64 / u64::from(self.fields_per_sec_x1m)
        }
    }

    /// Serialize into a fixed header block after the 8-byte magic.
    pub(crate) fn write_header(&self, magic: &[u8; 8]) -> [u8; HEADER_BYTES] {
        let mut header = [0u8; HEADER_BYTES];
        header[0..8].copy_from_slice(magic);
        header[8..12].copy_from_slice(&self.hunk_bytes.to_be_bytes());
        header[12..16].copy_from_slice(&self.hunk_count.to_be_bytes());
        header[16..24].copy_from_slice(&self.logical_bytes.to_be_bytes());
        header[24..28].copy_from_slice(&self.fields_per_sec_x1m.to_be_bytes());
        header[28..32].copy_from_slice(&self.sample_rate.to_be_bytes());
        header[32..34].copy_from_slice(&self.width.to_be_bytes());
        header[34..36].copy_from_slice(&self.height.to_be_bytes());
        header[36] = self.channels;
        header
    }

    /// Parse a fixed header block, validating the magic.
    pub(crate) fn parse_header(header: &[u8; HEADER_BYTES], magic: &[u8; 8]) -> Result<Self> {
        if &header[0..8] != magic {
            return Err(ImageError::InvalidHeader("bad magic"));
        }
        let info = DiscInfo {
            hunk_bytes: u32::from_be_bytes(header[8..12].try_into().unwrap()),
            hunk_count: u32::from_be_bytes(header[12..16].try_into().unwrap()),
            logical_bytes: u64::from_be_bytes(header[16..24].try_into().unwrap()),
            fields_per_sec_x1m: u32::from_be_bytes(header[24..28].try_into().unwrap()),
            sample_rate: u32::from_be_bytes(header[28..32].try_into().unwrap()),
            width: u16::from_be_bytes(header[32..34].try_into().unwrap()),
            height: u16::from_be_bytes(header[34..36].try_into().unwrap()),
            channels: header[36],
        };
        if info.hunk_bytes == 0 {
            return Err(ImageError::InvalidHeader("zero hunk size"));
        }
        Ok(info)
    }
}

/// Random-access source of fixed-size hunks.
///
/// Implementations must be shareable read-only between the player and its
/// read-ahead worker.
pub trait DiscSource: Send + Sync {
    /// Immutable image metadata.
    fn info(&self) -> &DiscInfo;

    /// Read one hunk into `dest`, returning the byte count written.
    ///
    /// Stored hunks may be shorter than `hunk_bytes` (compressed payloads);
    /// `dest` must still hold a full hunk.
    fn read_hunk(&self, index: u32, dest: &mut [u8]) -> Result<usize>;
}

/// Bounds/capacity preamble shared by every implementation.
pub(crate) fn check_read(info: &DiscInfo, index: u32, dest: &[u8]) -> Result<()> {
    if index >= info.hunk_count {
        return Err(ImageError::HunkNotFound {
            index,
            count: info.hunk_count,
        });
    }
    if dest.len() < info.hunk_bytes as usize {
        return Err(ImageError::BufferTooSmall {
            needed: info.hunk_bytes as usize,
            capacity: dest.len(),
        });
    }
    Ok(())
}
