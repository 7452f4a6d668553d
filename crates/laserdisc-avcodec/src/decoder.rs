//! Lossless frame decoder.
//!
//! Mirrors the encoder exactly: per-plane canonical Huffman + zero-run
//! expansion + wrapping delta accumulation for video, per-channel byte-split
//! Huffman (or raw) + wrapping delta accumulation for audio. All sample
//! arithmetic is wrapping, so round trips are bit exact including deltas that
//! wrap through `0x8000`.
//!
//! The decoder holds the persistent delta context for one continuous stream.
//! [`AvDecoder::reset`] clears it and marks a discontinuity: the next frame
//! must be standalone, and a continuation frame is rejected as `InvalidData`
//! rather than silently decoding garbage.

use crate::bitstream::BitReader;
use crate::error::{CodecError, Result};
use crate::frame::{FrameBuffers, FrameDesc, MAX_CHANNELS};
use crate::huffman::{table_bytes, DecodeTable, BYTE_SYMBOLS, RUN_BASE, RUN_ESCAPE, VIDEO_SYMBOLS};
use crate::planes::{insert_plane, plane_len, NUM_PLANES};
use crate::{AUDIO_METHOD_HUFF, AUDIO_METHOD_RAW, COMP_HEADER_BYTES, FLAG_CONTINUATION};

/// Streaming lossless decoder with persistent delta context.
pub struct AvDecoder {
    plane_prev: [u8; NUM_PLANES],
    audio_prev: [i16; MAX_CHANNELS],
    have_context: bool,
    // reusable scratch
    plane: Vec<u8>,
    hi: Vec<u8>,
}

impl AvDecoder {
    /// Create a decoder with no context (expects a standalone frame first).
    pub fn new() -> Self {
        Self {
            plane_prev: [0; NUM_PLANES],
            audio_prev: [0; MAX_CHANNELS],
            have_context: false,
            plane: Vec::new(),
            hi: Vec::new(),
        }
    }

    /// Drop all delta context after a seek or direction reversal.
    ///
    /// The next decoded frame must be standalone.
    pub fn reset(&mut self) {
        log::trace!("decoder context reset");
        self.plane_prev = [0; NUM_PLANES];
        self.audio_prev = [0; MAX_CHANNELS];
        self.have_context = false;
    }

    /// Decode one compressed hunk into the configured buffer set.
    ///
    /// The same `FrameBuffers` limits must stay in force across a continuous
    /// stream; geometry is re-checked against them every call.
    pub fn decode(&mut self, src: &[u8], out: &mut FrameBuffers) -> Result<FrameDesc> {
        if src.len() < COMP_HEADER_BYTES {
            return Err(CodecError::InvalidData("hunk shorter than header"));
        }
        let flags = src[0];
        let meta_len = usize::from(src[1]);
        let desc = FrameDesc {
            channels: src[2],
            samples: u16::from_be_bytes([src[3], src[4]]),
            width: u16::from_be_bytes([src[5], src[6]]),
            height: u16::from_be_bytes([src[7], src[8]]),
        };
        desc.validate()?;
        if flags & FLAG_CONTINUATION != 0 {
            if !self.have_context {
                return Err(CodecError::InvalidData(
                    "continuation frame across a discontinuity",
                ));
            }
        } else {
            // Standalone frame: deltas start from zero regardless of what
            // was decoded before it.
            self.plane_prev = [0; NUM_PLANES];
            self.audio_prev = [0; MAX_CHANNELS];
        }
        out.prepare(desc)?;

        let mut pos = COMP_HEADER_BYTES;
        out.metadata
            .extend_from_slice(take(src, &mut pos, meta_len)?);

        if desc.samples > 0 {
            for channel in 0..usize::from(desc.channels) {
                self.decode_audio_channel(src, &mut pos, channel, desc, out)?;
            }
        }

        if desc.width > 0 {
            for plane in 0..NUM_PLANES {
                self.decode_video_plane(src, &mut pos, plane, desc, out)?;
            }
        }

        self.have_context = true;
        Ok(desc)
    }

    fn decode_audio_channel(
        &mut self,
        src: &[u8],
        pos: &mut usize,
        channel: usize,
        desc: FrameDesc,
        out: &mut FrameBuffers,
    ) -> Result<()> {
        let samples = usize::from(desc.samples);
        let method = take(src, pos, 1)?[0];
        let len = take_u32(src, pos)?;
        let payload = take(src, pos, len)?;
        let dest = &mut out.audio[channel];

        match method {
            AUDIO_METHOD_RAW => {
                if payload.len() != samples * 2 {
                    return Err(CodecError::InvalidData("raw audio length mismatch"));
                }
                for (slot, pair) in dest.iter_mut().zip(payload.chunks_exact(2)) {
                    *slot = i16::from_be_bytes([pair[0], pair[1]]);
                }
                // Context still advances so a following continuation frame
                // deltas against the true last sample.
                self.audio_prev[channel] = dest.last().copied().unwrap_or(0);
            }
            AUDIO_METHOD_HUFF => {
                let tb = table_bytes(BYTE_SYMBOLS);
                if payload.len() < 2 * tb {
                    return Err(CodecError::InvalidData("truncated audio tables"));
                }
                let hi_table = DecodeTable::read(&payload[..tb], BYTE_SYMBOLS)?;
                let lo_table = DecodeTable::read(&payload[tb..2 * tb], BYTE_SYMBOLS)?;
                let mut reader = BitReader::new(&payload[2 * tb..]);
                self.hi.clear();
                for _ in 0..samples {
                    self.hi.push(hi_table.decode(&mut reader)? as u8);
                }
                let mut prev = self.audio_prev[channel];
                for (index, slot) in dest.iter_mut().enumerate() {
                    let lo = lo_table.decode(&mut reader)? as u8;
                    let delta = i16::from_be_bytes([self.hi[index], lo]);
                    let sample = prev.wrapping_add(delta);
                    *slot = sample;
                    prev = sample;
                }
                self.audio_prev[channel] = prev;
            }
            _ => return Err(CodecError::InvalidData("unknown audio method")),
        }
        Ok(())
    }

    fn decode_video_plane(
        &mut self,
        src: &[u8],
        pos: &mut usize,
        plane: usize,
        desc: FrameDesc,
        out: &mut FrameBuffers,
    ) -> Result<()> {
        let expect = plane_len(plane, usize::from(desc.width), usize::from(desc.height));
        let len = take_u32(src, pos)?;
        let payload = take(src, pos, len)?;
        let tb = table_bytes(VIDEO_SYMBOLS);
        if payload.len() < tb {
            return Err(CodecError::InvalidData("truncated video table"));
        }
        let table = DecodeTable::read(&payload[..tb], VIDEO_SYMBOLS)?;
        let mut reader = BitReader::new(&payload[tb..]);

        self.plane.clear();
        let mut prev = self.plane_prev[plane];
        while self.plane.len() < expect {
            let symbol = table.decode(&mut reader)?;
            if symbol < RUN_BASE {
                prev = prev.wrapping_add(symbol as u8);
                self.plane.push(prev);
            } else {
                let run = if symbol == RUN_ESCAPE {
                    usize::try_from(reader.read_bits(16)?).unwrap_or(0)
                } else {
                    usize::from(symbol - RUN_BASE) + 2
                };
                if run == 0 || self.plane.len() + run > expect {
                    return Err(CodecError::InvalidData("zero-run overflows plane"));
                }
                // A zero delta repeats the previous byte.
                for _ in 0..run {
                    self.plane.push(prev);
                }
            }
        }
        self.plane_prev[plane] = prev;
        insert_plane(&mut out.video, plane, &self.plane);
        Ok(())
    }
}

impl Default for AvDecoder {
    fn default() -> Self {
        Self::new()
    }
}

fn take<'a>(src: &'a [u8], pos: &mut usize, len: usize) -> Result<&'a [u8]> {
    let end = pos
        .checked_add(len)
        .ok_or(CodecError::InvalidData("section length overflow"))?;
    if end > src.len() {
        return Err(CodecError::InvalidData("truncated hunk section"));
    }
    let slice = &src[*pos..end];
    *pos = end;
    Ok(slice)
}

fn take_u32(src: &[u8], pos: &mut usize) -> Result<usize> {
    let bytes = take(src, pos, 4)?;
    Ok(u32::from_be_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]) as usize)
}
