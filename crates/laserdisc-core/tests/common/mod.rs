//! Shared mastering helpers: build a small in-memory disc image with real
//! encoded hunks and packed VBI metadata.
#![allow(dead_code)]

use laserdisc_avcodec::{AvEncoder, FrameDesc, RawFrameBuf};
use laserdisc_core::vbi::cav_picture_code;
use laserdisc_core::{PlayerConfig, VbiMetadata};
use laserdisc_image::{DiscInfo, MemoryImage};

pub const DISC_FRAMES: u32 = 30;
pub const FRAME_WIDTH: u16 = 8;
pub const FRAME_HEIGHT: u16 = 4;
pub const FRAME_SAMPLES: u16 = 32;

/// Geometry for the test disc: one hunk per frame, NTSC field rate.
pub fn disc_info(frames: u32) -> DiscInfo {
    DiscInfo {
        hunk_count: frames,
        hunk_bytes: 4096,
        logical_bytes: u64::from(frames) * 4096,
        fields_per_sec_x1m: 59_940_000,
        // 32 samples per frame at the NTSC frame rate.
        sample_rate: 960,
        width: FRAME_WIDTH,
        height: FRAME_HEIGHT,
        channels: 1,
    }
}

/// Player tuning scaled down for fast tests: tiny lead bands, instant
/// mechanics.
pub fn test_config() -> PlayerConfig {
    PlayerConfig {
        lead_in_tracks: 3,
        lead_out_tracks: 3,
        nominal_tracks: DISC_FRAMES,
        eject_time_us: 1_000,
        load_time_us: 1_000,
        spinup_time_us: 1_000,
        // The mastered frames are only four scanlines tall.
        vbi_scanlines: 1,
        ..PlayerConfig::default()
    }
}

/// Build one raw frame whose video and audio encode the frame number.
pub fn raw_frame(index: u32) -> RawFrameBuf {
    let desc = FrameDesc {
        channels: 1,
        samples: FRAME_SAMPLES,
        width: FRAME_WIDTH,
        height: FRAME_HEIGHT,
    };
    let mut frame = RawFrameBuf::new(desc).unwrap();
    for i in 0..usize::from(FRAME_SAMPLES) {
        frame.set_sample(0, i, (index as i16) * 100 + i as i16);
    }
    for (at, byte) in frame.video_mut().iter_mut().enumerate() {
        *byte = (index as u8).wrapping_add(at as u8);
    }
    frame
}

/// Packed two-field VBI blob: white flag + picture number on the first
/// field.
pub fn vbi_blob(picture: u32) -> Vec<u8> {
    let mut blob = Vec::new();
    VbiMetadata::new(true, 0, cav_picture_code(picture), 0).pack_into(&mut blob);
    VbiMetadata::new(false, 0, 0, 0).pack_into(&mut blob);
    blob
}

/// Master a disc of `frames` standalone hunks; picture numbers start at 1.
pub fn master_disc(frames: u32) -> MemoryImage {
    let image = MemoryImage::new(disc_info(frames));
    let mut encoder = AvEncoder::new();
    for index in 0..frames {
        let frame = raw_frame(index);
        let blob = vbi_blob(index + 1);
        let hunk = encoder
            .encode_standalone(&frame.as_frame(), &blob)
            .unwrap();
        image.write_hunk(index, &hunk).unwrap();
    }
    image
}
