//! Copy-on-write difference overlays.
//!
//! A difference file captures writes against read-only base media without
//! mutating it. Reads prefer hunks present in the overlay and fall back to
//! the base; writes always land in the overlay.
//!
//! Layout: a 64-byte header (magic `LDDIF1\0\0`, geometry cloned from the
//! base at creation), a present-bitmap of one bit per hunk, then fixed-offset
//! hunk slots. The file is created sparse; untouched slots occupy no disk.

use crate::error::{ImageError, Result};
use crate::source::{check_read, DiscInfo, DiscSource, HEADER_BYTES};
use log::debug;
use parking_lot::Mutex;
use std::fs::{File, OpenOptions};
use std::io::{Read, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// Magic for difference overlays.
pub const DIFF_MAGIC: [u8; 8] = *b"LDDIF1\0\0";

/// Extension appended to the base name.
pub const DIFF_EXTENSION: &str = "dif";

struct DiffFile {
    file: File,
    bitmap: Vec<u8>,
}

/// Copy-on-write overlay over a read-only base source.
pub struct DiffImage {
    info: DiscInfo,
    base: Arc<dyn DiscSource>,
    state: Mutex<DiffFile>,
    path: PathBuf,
}

impl DiffImage {
    /// Open `<dir>/<name>.dif` against `base`, creating it with cloned
    /// metadata when absent.
    ///
    /// This is the designed fallback when base media cannot be opened for
    /// writing: the base stays pristine and every write lands here.
    pub fn open_or_create(name: &str, base: Arc<dyn DiscSource>, dir: &Path) -> Result<Self> {
        let path = dir.join(format!("{name}.{DIFF_EXTENSION}"));
        if path.exists() {
            Self::open(&path, base)
        } else {
            Self::create(&path, base)
        }
    }

    /// Create a fresh overlay, cloning geometry from the base.
    pub fn create(path: &Path, base: Arc<dyn DiscSource>) -> Result<Self> {
        let info = *base.info();
        let mut file = OpenOptions::new()
            .read(true)
            .write(true)
            .create_new(true)
            .open(path)
            .map_err(|err| match err.kind() {
                std::io::ErrorKind::PermissionDenied => {
                    ImageError::FileNotWriteable(path.display().to_string())
                }
                _ => ImageError::Io(err),
            })?;
        file.write_all(&info.write_header(&DIFF_MAGIC))?;
        let bitmap = vec![0u8; bitmap_bytes(&info)];
        file.write_all(&bitmap)?;
        // Sparse tail: slots materialize only when written.
        file.set_len(total_len(&info))?;
        debug!(
            "created difference file {} ({} hunks of {} bytes)",
            path.display(),
            info.hunk_count,
            info.hunk_bytes
        );
        Ok(Self {
            info,
            base,
            state: Mutex::new(DiffFile { file, bitmap }),
            path: path.to_path_buf(),
        })
    }

    /// Open an existing overlay and validate it against the base.
    pub fn open(path: &Path, base: Arc<dyn DiscSource>) -> Result<Self> {
        let mut file = OpenOptions::new()
            .read(true)
            .write(true)
            .open(path)
            .map_err(|err| match err.kind() {
                std::io::ErrorKind::NotFound => {
                    ImageError::FileNotFound(path.display().to_string())
                }
                std::io::ErrorKind::PermissionDenied => {
                    ImageError::FileNotWriteable(path.display().to_string())
                }
                _ => ImageError::Io(err),
            })?;
        let mut header = [0u8; HEADER_BYTES];
        file.read_exact(&mut header)?;
        let info = DiscInfo::parse_header(&header, &DIFF_MAGIC)?;
        let base_info = base.info();
        if info.hunk_bytes != base_info.hunk_bytes || info.hunk_count != base_info.hunk_count {
            return Err(ImageError::MetadataMismatch(
                "difference geometry does not match base",
            ));
        }
        let mut bitmap = vec![0u8; bitmap_bytes(&info)];
        file.read_exact(&mut bitmap)?;
        debug!("opened difference file {}", path.display());
        Ok(Self {
            info,
            base,
            state: Mutex::new(DiffFile { file, bitmap }),
            path: path.to_path_buf(),
        })
    }

    /// Path of the overlay file.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Whether a hunk has been captured by the overlay.
    pub fn has_hunk(&self, index: u32) -> bool {
        let state = self.state.lock();
        bit_set(&state.bitmap, index)
    }

    /// Write one hunk into the overlay, zero padding the slot.
    pub fn write_hunk(&self, index: u32, data: &[u8]) -> Result<()> {
        if index >= self.info.hunk_count {
            return Err(ImageError::HunkNotFound {
                index,
                count: self.info.hunk_count,
            });
        }
        let hunk_bytes = self.info.hunk_bytes as usize;
        if data.len() > hunk_bytes {
            return Err(ImageError::BufferTooSmall {
                needed: data.len(),
                capacity: hunk_bytes,
            });
        }
        let mut state = self.state.lock();
        state
            .file
            .seek(SeekFrom::Start(hunk_offset(&self.info, index)))?;
        state.file.write_all(data)?;
        if data.len() < hunk_bytes {
            let pad = vec![0u8; hunk_bytes - data.len()];
            state.file.write_all(&pad)?;
        }
        // Persist the bitmap bit alongside the data.
        let byte_index = (index / 8) as usize;
        state.bitmap[byte_index] |= 1 << (index % 8);
        let byte = state.bitmap[byte_index];
        state
            .file
            .seek(SeekFrom::Start(HEADER_BYTES as u64 + byte_index as u64))?;
        state.file.write_all(&[byte])?;
        Ok(())
    }
}

impl DiscSource for DiffImage {
    fn info(&self) -> &DiscInfo {
        &self.info
    }

    fn read_hunk(&self, index: u32, dest: &mut [u8]) -> Result<usize> {
        check_read(&self.info, index, dest)?;
        let hunk_bytes = self.info.hunk_bytes as usize;
        {
            let mut state = self.state.lock();
            if bit_set(&state.bitmap, index) {
                state
                    .file
                    .seek(SeekFrom::Start(hunk_offset(&self.info, index)))?;
                state.file.read_exact(&mut dest[..hunk_bytes])?;
                return Ok(hunk_bytes);
            }
        }
        self.base.read_hunk(index, dest)
    }
}

fn bitmap_bytes(info: &DiscInfo) -> usize {
    (info.hunk_count as usize).div_ceil(8)
}

fn hunk_offset(info: &DiscInfo, index: u32) -> u64 {
    HEADER_BYTES as u64 + bitmap_bytes(info) as u64 + u64::from(index) * u64::from(info.hunk_bytes)
}

fn total_len(info: &DiscInfo) -> u64 {
    hunk_offset(info, info.hunk_count.saturating_sub(1)) + u64::from(info.hunk_bytes)
}

fn bit_set(bitmap: &[u8], index: u32) -> bool {
    bitmap[(index / 8) as usize] & (1 << (index % 8)) != 0
}
