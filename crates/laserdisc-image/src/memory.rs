//! In-memory hunk image for mastering and tests.

use crate::error::{ImageError, Result};
use crate::source::{check_read, DiscInfo, DiscSource};
use parking_lot::RwLock;

/// Sparse in-memory image.
///
/// Used by disc mastering before the hunks are written out, and by tests
/// that need a source without touching the filesystem. Absent hunks read as
/// `HunkNotFound`, matching a sparse container.
pub struct MemoryImage {
    info: DiscInfo,
    hunks: RwLock<Vec<Option<Vec<u8>>>>,
}

impl MemoryImage {
    /// Create an empty image with the given geometry.
    pub fn new(info: DiscInfo) -> Self {
        let count = info.hunk_count as usize;
        Self {
            info,
            hunks: RwLock::new(vec![None; count]),
        }
    }

    /// Store one hunk payload (padded to `hunk_bytes` on read by callers
    /// that need the fixed size).
    pub fn write_hunk(&self, index: u32, data: &[u8]) -> Result<()> {
        if index >= self.info.hunk_count {
            return Err(ImageError::HunkNotFound {
                index,
                count: self.info.hunk_count,
            });
        }
        if data.len() > self.info.hunk_bytes as usize {
            return Err(ImageError::BufferTooSmall {
                needed: data.len(),
                capacity: self.info.hunk_bytes as usize,
            });
        }
        self.hunks.write()[index as usize] = Some(data.to_vec());
        Ok(())
    }

    /// Whether a hunk has been written.
    pub fn has_hunk(&self, index: u32) -> bool {
        self.hunks
            .read()
            .get(index as usize)
            .is_some_and(|slot| slot.is_some())
    }
}

impl DiscSource for MemoryImage {
    fn info(&self) -> &DiscInfo {
        &self.info
    }

    fn read_hunk(&self, index: u32, dest: &mut [u8]) -> Result<usize> {
        check_read(&self.info, index, dest)?;
        let hunks = self.hunks.read();
        match &hunks[index as usize] {
            Some(data) => {
                dest[..data.len()].copy_from_slice(data);
                dest[data.len()..self.info.hunk_bytes as usize].fill(0);
                Ok(data.len())
            }
            None => Err(ImageError::HunkNotFound {
                index,
                count: self.info.hunk_count,
            }),
        }
    }
}
