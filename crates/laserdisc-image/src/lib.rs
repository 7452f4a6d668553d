//! Hunk-addressed disc image sources.
//!
//! A laserdisc image is addressed in fixed-size hunks, one per combined
//! audio+video frame unit. This crate provides the [`DiscSource`] trait the
//! player core programs against, plus three implementations:
//!
//! - [`MemoryImage`] - sparse in-memory image (mastering, tests)
//! - [`FileImage`] - flat file-backed image
//! - [`DiffImage`] - copy-on-write difference overlay over a read-only base
//!
//! The compressed container format proper is an external collaborator; these
//! types only honor the opaque-hunk contract (`read_hunk(index) -> bytes`).

pub mod diff;
pub mod error;
pub mod file;
pub mod memory;
pub mod source;

pub use diff::{DiffImage, DIFF_EXTENSION, DIFF_MAGIC};
pub use error::{ImageError, Result};
pub use file::{FileImage, FILE_MAGIC};
pub use memory::MemoryImage;
pub use source::{DiscInfo, DiscSource, HEADER_BYTES};
