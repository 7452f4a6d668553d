//! Difference-overlay behavior against read-only base media.

use laserdisc_image::{DiffImage, DiscInfo, DiscSource, FileImage, ImageError, MemoryImage};
use std::sync::Arc;

fn nominal_info() -> DiscInfo {
    // A full CAV side: 54,000 tracks, one hunk per track.
    DiscInfo {
        hunk_count: 54_000,
        hunk_bytes: 1024,
        logical_bytes: 54_000 * 1024,
        fields_per_sec_x1m: 59_940_000,
        sample_rate: 48_000,
        width: 720,
        height: 480,
        channels: 2,
    }
}

#[test]
fn creates_difference_with_cloned_metadata() {
    let dir = tempfile::tempdir().unwrap();
    let base = Arc::new(MemoryImage::new(nominal_info()));

    let diff = DiffImage::open_or_create("sidea", base.clone(), dir.path()).unwrap();
    assert!(dir.path().join("sidea.dif").exists());
    assert_eq!(diff.info().logical_bytes, base.info().logical_bytes);
    assert_eq!(diff.info().hunk_bytes, base.info().hunk_bytes);
    assert_eq!(diff.info().hunk_count, base.info().hunk_count);
}

#[test]
fn reads_prefer_overlay_and_fall_back_to_base() {
    let dir = tempfile::tempdir().unwrap();
    let info = DiscInfo {
        hunk_count: 8,
        hunk_bytes: 16,
        ..nominal_info()
    };
    let base = Arc::new(MemoryImage::new(info));
    base.write_hunk(0, &[0x11; 16]).unwrap();
    base.write_hunk(1, &[0x22; 16]).unwrap();

    let diff = DiffImage::open_or_create("movie", base, dir.path()).unwrap();
    diff.write_hunk(1, &[0x99; 16]).unwrap();

    let mut buf = vec![0u8; 16];
    diff.read_hunk(0, &mut buf).unwrap();
    assert_eq!(buf, [0x11; 16], "untouched hunk comes from the base");
    diff.read_hunk(1, &mut buf).unwrap();
    assert_eq!(buf, [0x99; 16], "written hunk comes from the overlay");
}

#[test]
fn overlay_persists_across_reopen() {
    let dir = tempfile::tempdir().unwrap();
    let info = DiscInfo {
        hunk_count: 8,
        hunk_bytes: 16,
        ..nominal_info()
    };
    let base = Arc::new(MemoryImage::new(info));
    base.write_hunk(3, &[0x33; 16]).unwrap();

    {
        let diff = DiffImage::open_or_create("movie", base.clone(), dir.path()).unwrap();
        diff.write_hunk(3, &[0x44; 16]).unwrap();
    }

    let diff = DiffImage::open_or_create("movie", base, dir.path()).unwrap();
    assert!(diff.has_hunk(3));
    let mut buf = vec![0u8; 16];
    diff.read_hunk(3, &mut buf).unwrap();
    assert_eq!(buf, [0x44; 16]);
}

#[test]
fn mismatched_geometry_rejected() {
    let dir = tempfile::tempdir().unwrap();
    let small = DiscInfo {
        hunk_count: 8,
        hunk_bytes: 16,
        ..nominal_info()
    };
    let base = Arc::new(MemoryImage::new(small));
    DiffImage::open_or_create("movie", base, dir.path()).unwrap();

    let grown = DiscInfo {
        hunk_count: 9,
        hunk_bytes: 16,
        ..nominal_info()
    };
    let other = Arc::new(MemoryImage::new(grown));
    assert!(matches!(
        DiffImage::open_or_create("movie", other, dir.path()),
        Err(ImageError::MetadataMismatch(_))
    ));
}

#[test]
fn base_stays_pristine_under_overlay_writes() {
    let dir = tempfile::tempdir().unwrap();
    let info = DiscInfo {
        hunk_count: 4,
        hunk_bytes: 16,
        ..nominal_info()
    };
    let path = dir.path().join("base.ldi");
    {
        let base = FileImage::create(&path, info).unwrap();
        base.write_hunk(0, &[0x77; 16]).unwrap();
    }

    let base: Arc<dyn DiscSource> = Arc::new(FileImage::open(&path, true).unwrap());
    let diff = DiffImage::open_or_create("base", base.clone(), dir.path()).unwrap();
    diff.write_hunk(0, &[0xee; 16]).unwrap();

    let mut buf = vec![0u8; 16];
    base.read_hunk(0, &mut buf).unwrap();
    assert_eq!(buf, [0x77; 16], "read-only base must never change");
}
