//! Lossless frame encoder.
//!
//! Video planes go through a wrapping delta pre-pass, zero-run collapse, and
//! per-plane canonical Huffman coding. Audio channels are delta coded against
//! the persistent per-channel previous sample, split into high/low byte
//! streams, and Huffman coded - unless raw storage is smaller, in which case
//! the channel falls back to uncompressed big-endian samples.
//!
//! The encoder keeps delta context across calls: the first frame after
//! construction or [`AvEncoder::reset`] is standalone (decodable from
//! nothing), every following frame is a continuation frame whose first deltas
//! reference the previous frame's final values. Disc mastering resets before
//! every hunk so that each hunk stays randomly accessible.

use crate::bitstream::BitWriter;
use crate::error::{CodecError, Result};
use crate::frame::{RawFrame, MAX_CHANNELS, MAX_METADATA};
use crate::huffman::{
    CodeTable, BYTE_SYMBOLS, MAX_SHORT_RUN, RUN_BASE, RUN_ESCAPE, VIDEO_SYMBOLS,
};
use crate::planes::{extract_plane, NUM_PLANES};
use crate::{AUDIO_METHOD_HUFF, AUDIO_METHOD_RAW, COMP_HEADER_BYTES, FLAG_CONTINUATION};

/// Streaming lossless encoder with persistent delta context.
pub struct AvEncoder {
    plane_prev: [u8; NUM_PLANES],
    audio_prev: [i16; MAX_CHANNELS],
    continuation: bool,
    // reusable scratch, sized on first use
    plane: Vec<u8>,
    deltas: Vec<u8>,
    symbols: Vec<Symbol>,
    hi: Vec<u8>,
    lo: Vec<u8>,
}

/// One entry of the symbolized video stream.
#[derive(Clone, Copy)]
enum Symbol {
    Literal(u8),
    ShortRun(u8),
    LongRun(u16),
}

impl Symbol {
    fn code(self) -> u16 {
        match self {
            Symbol::Literal(b) => u16::from(b),
            Symbol::ShortRun(len) => RUN_BASE + u16::from(len) - 2,
            Symbol::LongRun(_) => RUN_ESCAPE,
        }
    }
}

impl AvEncoder {
    /// Create an encoder with cleared context (next frame is standalone).
    pub fn new() -> Self {
        Self {
            plane_prev: [0; NUM_PLANES],
            audio_prev: [0; MAX_CHANNELS],
            continuation: false,
            plane: Vec::new(),
            deltas: Vec::new(),
            symbols: Vec::new(),
            hi: Vec::new(),
            lo: Vec::new(),
        }
    }

    /// Clear all delta context; the next frame encodes standalone.
    pub fn reset(&mut self) {
        self.plane_prev = [0; NUM_PLANES];
        self.audio_prev = [0; MAX_CHANNELS];
        self.continuation = false;
    }

    /// Encode a frame with no metadata blob.
    pub fn encode(&mut self, frame: &RawFrame<'_>) -> Result<Vec<u8>> {
        self.encode_with_metadata(frame, &[])
    }

    /// Reset context, then encode one standalone frame.
    pub fn encode_standalone(&mut self, frame: &RawFrame<'_>, metadata: &[u8]) -> Result<Vec<u8>> {
        self.reset();
        self.encode_with_metadata(frame, metadata)
    }

    /// Encode a frame together with an opaque metadata blob.
    pub fn encode_with_metadata(&mut self, frame: &RawFrame<'_>, metadata: &[u8]) -> Result<Vec<u8>> {
        let mut out = Vec::new();
        self.encode_into(frame, metadata, &mut out)?;
        Ok(out)
    }

    /// Encode into a caller-owned vector (cleared first).
    pub fn encode_into(
        &mut self,
        frame: &RawFrame<'_>,
        metadata: &[u8],
        out: &mut Vec<u8>,
    ) -> Result<()> {
        let desc = frame.desc();
        desc.validate()?;
        if metadata.len() > MAX_METADATA {
            return Err(CodecError::MetadataTooLarge {
                len: metadata.len(),
            });
        }

        out.clear();
        out.push(if self.continuation { FLAG_CONTINUATION } else { 0 });
        out.push(metadata.len() as u8);
        out.push(desc.channels);
        out.extend_from_slice(&desc.samples.to_be_bytes());
        out.extend_from_slice(&desc.width.to_be_bytes());
        out.extend_from_slice(&desc.height.to_be_bytes());
        debug_assert_eq!(out.len(), COMP_HEADER_BYTES);
        out.extend_from_slice(metadata);

        if desc.samples > 0 {
            for channel in 0..usize::from(desc.channels) {
                self.encode_audio_channel(frame, channel, out)?;
            }
        }

        if desc.width > 0 {
            for plane in 0..NUM_PLANES {
                self.encode_video_plane(frame.video(), plane, out)?;
            }
        }

        self.continuation = true;
        Ok(())
    }

    fn encode_audio_channel(
        &mut self,
        frame: &RawFrame<'_>,
        channel: usize,
        out: &mut Vec<u8>,
    ) -> Result<()> {
        let samples = usize::from(frame.desc().samples);
        let raw = frame.audio_channel(channel);

        // Wrapping deltas against the persistent previous sample; the split
        // byte streams expose the redundancy in small signed deltas.
        self.hi.clear();
        self.lo.clear();
        let mut prev = self.audio_prev[channel];
        let mut hi_histo = [0u64; BYTE_SYMBOLS];
        let mut lo_histo = [0u64; BYTE_SYMBOLS];
        for index in 0..samples {
            let sample = frame.sample(channel, index);
            let delta = sample.wrapping_sub(prev) as u16;
            prev = sample;
            let hi = (delta >> 8) as u8;
            let lo = (delta & 0xff) as u8;
            self.hi.push(hi);
            self.lo.push(lo);
            hi_histo[usize::from(hi)] += 1;
            lo_histo[usize::from(lo)] += 1;
        }
        self.audio_prev[channel] = prev;

        let hi_table = CodeTable::build(&hi_histo)?;
        let lo_table = CodeTable::build(&lo_histo)?;
        let mut bits = 0u64;
        for &b in &self.hi {
            bits += u64::from(hi_table.cost(u16::from(b)));
        }
        for &b in &self.lo {
            bits += u64::from(lo_table.cost(u16::from(b)));
        }
        let huff_len =
            2 * crate::huffman::table_bytes(BYTE_SYMBOLS) + usize::try_from(bits.div_ceil(8)).unwrap_or(usize::MAX);

        if huff_len >= raw.len() {
            // Raw fallback: store the samples themselves, not the deltas.
            log::trace!("channel {channel}: raw audio ({} <= {huff_len} coded)", raw.len());
            out.push(AUDIO_METHOD_RAW);
            out.extend_from_slice(&(raw.len() as u32).to_be_bytes());
            out.extend_from_slice(raw);
            return Ok(());
        }

        out.push(AUDIO_METHOD_HUFF);
        let mut payload = Vec::with_capacity(huff_len);
        hi_table.write(&mut payload);
        lo_table.write(&mut payload);
        let mut writer = BitWriter::new();
        for &b in &self.hi {
            hi_table.encode(&mut writer, u16::from(b));
        }
        for &b in &self.lo {
            lo_table.encode(&mut writer, u16::from(b));
        }
        payload.extend_from_slice(&writer.finish());
        out.extend_from_slice(&(payload.len() as u32).to_be_bytes());
        out.extend_from_slice(&payload);
        Ok(())
    }

    fn encode_video_plane(&mut self, video: &[u8], plane: usize, out: &mut Vec<u8>) -> Result<()> {
        extract_plane(video, plane, &mut self.plane);

        self.deltas.clear();
        let mut prev = self.plane_prev[plane];
        for &byte in &self.plane {
            self.deltas.push(byte.wrapping_sub(prev));
            prev = byte;
        }
        self.plane_prev[plane] = prev;

        // Collapse runs of zero deltas into run symbols.
        self.symbols.clear();
        let mut histo = [0u64; VIDEO_SYMBOLS];
        let mut index = 0;
        while index < self.deltas.len() {
            let byte = self.deltas[index];
            if byte == 0 {
                let mut run = 1usize;
                while index + run < self.deltas.len()
                    && self.deltas[index + run] == 0
                    && run < usize::from(u16::MAX)
                {
                    run += 1;
                }
                let symbol = match run {
                    1 => Symbol::Literal(0),
                    2..=MAX_SHORT_RUN => Symbol::ShortRun(run as u8),
                    _ => Symbol::LongRun(run as u16),
                };
                self.symbols.push(symbol);
                histo[usize::from(symbol.code())] += 1;
                index += run;
            } else {
                self.symbols.push(Symbol::Literal(byte));
                histo[usize::from(byte)] += 1;
                index += 1;
            }
        }

        let table = CodeTable::build(&histo)?;
        let mut payload = Vec::new();
        table.write(&mut payload);
        let mut writer = BitWriter::new();
        for &symbol in &self.symbols {
            table.encode(&mut writer, symbol.code());
            if let Symbol::LongRun(len) = symbol {
                writer.write_bits(u32::from(len), 16);
            }
        }
        payload.extend_from_slice(&writer.finish());
        out.extend_from_slice(&(payload.len() as u32).to_be_bytes());
        out.extend_from_slice(&payload);
        Ok(())
    }
}

impl Default for AvEncoder {
    fn default() -> Self {
        Self::new()
    }
}
