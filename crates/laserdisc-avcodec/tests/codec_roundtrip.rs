//! End-to-end encode/decode round trips.

use laserdisc_avcodec::{
    AvDecoder, AvEncoder, CodecError, FrameBuffers, FrameDesc, RawFrameBuf,
};

/// Deterministic LCG so failures reproduce.
fn next_rand(seed: &mut u32) -> u32 {
    *seed = seed.wrapping_mul(214013).wrapping_add(2531011);
    *seed >> 16
}

fn make_frame(desc: FrameDesc, seed: &mut u32) -> RawFrameBuf {
    let mut buf = RawFrameBuf::new(desc).unwrap();
    for ch in 0..usize::from(desc.channels) {
        for i in 0..usize::from(desc.samples) {
            buf.set_sample(ch, i, next_rand(seed) as i16);
        }
    }
    // Smooth-ish video so the delta path has realistic statistics.
    let mut level = 0x40u8;
    for byte in buf.video_mut() {
        level = level.wrapping_add((next_rand(seed) % 5) as u8).wrapping_sub(2);
        *byte = level;
    }
    buf
}

fn assert_matches(buffers: &FrameBuffers, frame: &RawFrameBuf) {
    let desc = frame.desc();
    assert_eq!(buffers.desc, desc);
    assert_eq!(buffers.video, frame.as_frame().video());
    for ch in 0..usize::from(desc.channels) {
        for i in 0..usize::from(desc.samples) {
            assert_eq!(
                buffers.audio[ch][i],
                frame.as_frame().sample(ch, i),
                "channel {ch} sample {i}"
            );
        }
    }
}

#[test]
fn roundtrip_audio_and_video() {
    let desc = FrameDesc {
        channels: 2,
        samples: 200,
        width: 64,
        height: 16,
    };
    let mut seed = 1;
    let frame = make_frame(desc, &mut seed);

    let mut encoder = AvEncoder::new();
    let compressed = encoder
        .encode_with_metadata(&frame.as_frame(), b"vbi")
        .unwrap();

    let mut decoder = AvDecoder::new();
    let mut buffers = FrameBuffers::with_limits(64, 16, 200, 2).unwrap();
    let got = decoder.decode(&compressed, &mut buffers).unwrap();
    assert_eq!(got, desc);
    assert_eq!(buffers.metadata, b"vbi");
    assert_matches(&buffers, &frame);
}

#[test]
fn roundtrip_wraparound_deltas() {
    // Alternating 0x7FFF / -0x8000 forces every delta through the 0x8000
    // boundary, and the constant delta stream is compressible enough that
    // the Huffman path (not the raw fallback) carries it. The wrapping
    // arithmetic must reproduce the originals exactly.
    let desc = FrameDesc {
        channels: 1,
        samples: 512,
        width: 0,
        height: 0,
    };
    let mut frame = RawFrameBuf::new(desc).unwrap();
    let mut expect = Vec::new();
    for i in 0..512 {
        let v: i16 = if i % 2 == 0 { 0x7FFF } else { -0x8000 };
        frame.set_sample(0, i, v);
        expect.push(v);
    }

    let mut encoder = AvEncoder::new();
    let compressed = encoder.encode(&frame.as_frame()).unwrap();
    // Huffman must beat the 1024-byte raw encoding here.
    assert!(compressed.len() < 1024);

    let mut decoder = AvDecoder::new();
    let mut buffers = FrameBuffers::with_limits(0, 0, 512, 1).unwrap();
    decoder.decode(&compressed, &mut buffers).unwrap();
    assert_eq!(buffers.audio[0], expect);
}

#[test]
fn roundtrip_continuation_sequence() {
    let desc = FrameDesc {
        channels: 1,
        samples: 128,
        width: 32,
        height: 8,
    };
    let mut seed = 7;
    let frames: Vec<RawFrameBuf> = (0..4).map(|_| make_frame(desc, &mut seed)).collect();

    let mut encoder = AvEncoder::new();
    let compressed: Vec<Vec<u8>> = frames
        .iter()
        .map(|f| encoder.encode(&f.as_frame()).unwrap())
        .collect();

    let mut decoder = AvDecoder::new();
    let mut buffers = FrameBuffers::with_limits(32, 8, 128, 1).unwrap();
    for (frame, hunk) in frames.iter().zip(&compressed) {
        decoder.decode(hunk, &mut buffers).unwrap();
        assert_matches(&buffers, frame);
    }
}

#[test]
fn continuation_rejected_after_reset() {
    let desc = FrameDesc {
        channels: 1,
        samples: 32,
        width: 8,
        height: 2,
    };
    let mut seed = 3;
    let first = make_frame(desc, &mut seed);
    let second = make_frame(desc, &mut seed);

    let mut encoder = AvEncoder::new();
    let hunk0 = encoder.encode(&first.as_frame()).unwrap();
    let hunk1 = encoder.encode(&second.as_frame()).unwrap();

    let mut decoder = AvDecoder::new();
    let mut buffers = FrameBuffers::with_limits(8, 2, 32, 1).unwrap();
    decoder.decode(&hunk0, &mut buffers).unwrap();
    decoder.reset();
    assert!(matches!(
        decoder.decode(&hunk1, &mut buffers),
        Err(CodecError::InvalidData(_))
    ));
}

#[test]
fn standalone_frames_decode_after_reset() {
    // Disc mastering writes standalone hunks; a decoder reset (seek) must
    // not affect their decode.
    let desc = FrameDesc {
        channels: 2,
        samples: 64,
        width: 16,
        height: 4,
    };
    let mut seed = 11;
    let frames: Vec<RawFrameBuf> = (0..3).map(|_| make_frame(desc, &mut seed)).collect();

    let mut encoder = AvEncoder::new();
    let compressed: Vec<Vec<u8>> = frames
        .iter()
        .map(|f| encoder.encode_standalone(&f.as_frame(), &[]).unwrap())
        .collect();

    let mut decoder = AvDecoder::new();
    let mut buffers = FrameBuffers::with_limits(16, 4, 64, 2).unwrap();
    decoder.decode(&compressed[0], &mut buffers).unwrap();
    decoder.reset();
    decoder.decode(&compressed[2], &mut buffers).unwrap();
    assert_matches(&buffers, &frames[2]);
}

#[test]
fn standalone_sequence_needs_no_reset() {
    // Sequential playback of a mastered disc: every hunk is standalone and
    // the decoder streams them without being reset in between.
    let desc = FrameDesc {
        channels: 1,
        samples: 48,
        width: 8,
        height: 4,
    };
    let mut seed = 17;
    let frames: Vec<RawFrameBuf> = (0..3).map(|_| make_frame(desc, &mut seed)).collect();

    let mut encoder = AvEncoder::new();
    let compressed: Vec<Vec<u8>> = frames
        .iter()
        .map(|f| encoder.encode_standalone(&f.as_frame(), &[]).unwrap())
        .collect();

    let mut decoder = AvDecoder::new();
    let mut buffers = FrameBuffers::with_limits(8, 4, 48, 1).unwrap();
    for (frame, hunk) in frames.iter().zip(&compressed) {
        decoder.decode(hunk, &mut buffers).unwrap();
        assert_matches(&buffers, frame);
    }
}

#[test]
fn tiny_audio_uses_raw_fallback() {
    // Eight raw bytes can never lose to two 128-byte Huffman tables; the
    // channel must fall back to raw storage and still round-trip.
    let desc = FrameDesc {
        channels: 1,
        samples: 4,
        width: 0,
        height: 0,
    };
    let mut frame = RawFrameBuf::new(desc).unwrap();
    for (i, v) in [100i16, -200, 300, -400].into_iter().enumerate() {
        frame.set_sample(0, i, v);
    }

    let mut encoder = AvEncoder::new();
    let compressed = encoder.encode(&frame.as_frame()).unwrap();
    assert!(compressed.len() < 64);

    let mut decoder = AvDecoder::new();
    let mut buffers = FrameBuffers::with_limits(0, 0, 4, 1).unwrap();
    decoder.decode(&compressed, &mut buffers).unwrap();
    assert_eq!(buffers.audio[0], [100, -200, 300, -400]);
}

#[test]
fn video_only_frame() {
    let desc = FrameDesc {
        channels: 0,
        samples: 0,
        width: 720,
        height: 32,
    };
    let mut seed = 23;
    let frame = make_frame(desc, &mut seed);

    let mut encoder = AvEncoder::new();
    let compressed = encoder.encode(&frame.as_frame()).unwrap();

    let mut decoder = AvDecoder::new();
    let mut buffers = FrameBuffers::with_limits(720, 32, 0, 0).unwrap();
    decoder.decode(&compressed, &mut buffers).unwrap();
    assert_eq!(buffers.video, frame.as_frame().video());
}

#[test]
fn oversized_metadata_rejected() {
    let desc = FrameDesc {
        channels: 0,
        samples: 0,
        width: 4,
        height: 2,
    };
    let frame = RawFrameBuf::new(desc).unwrap();
    let mut encoder = AvEncoder::new();
    let blob = vec![0u8; 256];
    assert!(matches!(
        encoder.encode_with_metadata(&frame.as_frame(), &blob),
        Err(CodecError::MetadataTooLarge { len: 256 })
    ));
}

#[test]
fn truncated_hunk_rejected() {
    let desc = FrameDesc {
        channels: 1,
        samples: 64,
        width: 16,
        height: 4,
    };
    let mut seed = 31;
    let frame = make_frame(desc, &mut seed);
    let mut encoder = AvEncoder::new();
    let compressed = encoder.encode(&frame.as_frame()).unwrap();

    let mut decoder = AvDecoder::new();
    let mut buffers = FrameBuffers::with_limits(16, 4, 64, 1).unwrap();
    for cut in [1, compressed.len() / 2, compressed.len() - 1] {
        let err = decoder.decode(&compressed[..cut], &mut buffers);
        assert!(err.is_err(), "truncation at {cut} must fail");
        decoder.reset();
    }
}
