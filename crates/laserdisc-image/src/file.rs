//! Flat file-backed hunk image.
//!
//! Layout: a 64-byte header (magic `LDIMG1\0\0` + geometry) followed by
//! densely packed fixed-size hunk slots. Payloads shorter than `hunk_bytes`
//! are zero padded inside their slot; the codec's section lengths make the
//! padding harmless.

use crate::error::{ImageError, Result};
use crate::source::{check_read, DiscInfo, DiscSource, HEADER_BYTES};
use parking_lot::Mutex;
use std::fs::{File, OpenOptions};
use std::io::{Read, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};

/// Magic for flat images.
pub const FILE_MAGIC: [u8; 8] = *b"LDIMG1\0\0";

/// Flat hunk image backed by a single file.
pub struct FileImage {
    info: DiscInfo,
    file: Mutex<File>,
    path: PathBuf,
    read_only: bool,
}

impl FileImage {
    /// Create a new image file with the given geometry, truncating any
    /// existing file at `path`.
    pub fn create(path: &Path, info: DiscInfo) -> Result<Self> {
        let mut file = OpenOptions::new()
            .read(true)
            .write(true)
            .create(true)
            .truncate(true)
            .open(path)
            .map_err(|err| map_open_error(err, path, true))?;
        file.write_all(&info.write_header(&FILE_MAGIC))?;
        let total =
            HEADER_BYTES as u64 + u64::from(info.hunk_count) * u64::from(info.hunk_bytes);
        file.set_len(total)?;
        Ok(Self {
            info,
            file: Mutex::new(file),
            path: path.to_path_buf(),
            read_only: false,
        })
    }

    /// Open an existing image.
    ///
    /// Opening read-write on read-only media fails with `FileNotWriteable`;
    /// callers are expected to fall back to a difference overlay rather than
    /// treat that as fatal.
    pub fn open(path: &Path, read_only: bool) -> Result<Self> {
        let mut file = OpenOptions::new()
            .read(true)
            .write(!read_only)
            .open(path)
            .map_err(|err| map_open_error(err, path, !read_only))?;
        let mut header = [0u8; HEADER_BYTES];
        file.read_exact(&mut header)?;
        let info = DiscInfo::parse_header(&header, &FILE_MAGIC)?;
        let expect =
            HEADER_BYTES as u64 + u64::from(info.hunk_count) * u64::from(info.hunk_bytes);
        if file.metadata()?.len() < expect {
            return Err(ImageError::InvalidHeader("image shorter than hunk table"));
        }
        Ok(Self {
            info,
            file: Mutex::new(file),
            path: path.to_path_buf(),
            read_only,
        })
    }

    /// Path this image was opened from.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Store one hunk payload, zero padding the slot.
    pub fn write_hunk(&self, index: u32, data: &[u8]) -> Result<()> {
        if self.read_only {
            return Err(ImageError::FileNotWriteable(
                self.path.display().to_string(),
            ));
        }
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
        let offset = hunk_offset(&self.info, index);
        let mut file = self.file.lock();
        file.seek(SeekFrom::Start(offset))?;
        file.write_all(data)?;
        if data.len() < hunk_bytes {
            let pad = vec![0u8; hunk_bytes - data.len()];
            file.write_all(&pad)?;
        }
        Ok(())
    }
}

impl DiscSource for FileImage {
    fn info(&self) -> &DiscInfo {
        &self.info
    }

    fn read_hunk(&self, index: u32, dest: &mut [u8]) -> Result<usize> {
        check_read(&self.info, index, dest)?;
        let hunk_bytes = self.info.hunk_bytes as usize;
        let offset = hunk_offset(&self.info, index);
        let mut file = self.file.lock();
        file.seek(SeekFrom::Start(offset))?;
        file.read_exact(&mut dest[..hunk_bytes])?;
        Ok(hunk_bytes)
    }
}

fn hunk_offset(info: &DiscInfo, index: u32) -> u64 {
    HEADER_BYTES as u64 + u64::from(index) * u64::from(info.hunk_bytes)
}

/// Classify an open failure into the taxonomy the player cares about.
fn map_open_error(err: std::io::Error, path: &Path, writing: bool) -> ImageError {
    match err.kind() {
        std::io::ErrorKind::NotFound => ImageError::FileNotFound(path.display().to_string()),
        std::io::ErrorKind::PermissionDenied if writing => {
            ImageError::FileNotWriteable(path.display().to_string())
        }
        _ => ImageError::Io(err),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn info() -> DiscInfo {
        DiscInfo {
            hunk_count: 8,
            hunk_bytes: 32,
            logical_bytes: 256,
            fields_per_sec_x1m: 59_940_000,
            sample_rate: 44_100,
            width: 0,
            height: 0,
            channels: 2,
        }
    }

    #[test]
    fn test_create_open_roundtrip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("disc.ldi");
        {
            let image = FileImage::create(&path, info()).unwrap();
            image.write_hunk(3, &[0x5a; 10]).unwrap();
        }
        let image = FileImage::open(&path, true).unwrap();
        assert_eq!(*image.info(), info());
        let mut buf = vec![0u8; 32];
        assert_eq!(image.read_hunk(3, &mut buf).unwrap(), 32);
        assert_eq!(&buf[..10], &[0x5a; 10]);
        assert_eq!(&buf[10..], &[0u8; 22]);
    }

    #[test]
    fn test_read_only_rejects_writes() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("disc.ldi");
        FileImage::create(&path, info()).unwrap();
        let image = FileImage::open(&path, true).unwrap();
        assert!(matches!(
            image.write_hunk(0, &[1]),
            Err(ImageError::FileNotWriteable(_))
        ));
    }

    #[test]
    fn test_missing_file_classified() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("absent.ldi");
        assert!(matches!(
            FileImage::open(&path, true),
            Err(ImageError::FileNotFound(_))
        ));
    }

    #[test]
    fn test_bad_magic_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("junk.ldi");
        std::fs::write(&path, vec![0u8; 128]).unwrap();
        assert!(matches!(
            FileImage::open(&path, true),
            Err(ImageError::InvalidHeader(_))
        ));
    }
}
