//! Per-frame canonical Huffman coding.
//!
//! Every compressed payload carries its own code-length table, so any hunk can
//! be decoded without reference to its neighbours. Tables are canonical: code
//! lengths fully determine the codes, assigned in (length, symbol) order, and
//! are serialized as packed 4-bit lengths (0 = symbol unused).
//!
//! Video planes use a 272-symbol alphabet: 256 literal delta bytes plus 16
//! run escape codes for runs of zero deltas. Audio byte streams use the plain
//! 256-symbol byte alphabet.

use crate::bitstream::{BitReader, BitWriter};
use crate::error::{CodecError, Result};

/// Literal byte alphabet size (audio high/low streams).
pub const BYTE_SYMBOLS: usize = 256;

/// Video alphabet size: literals plus run escapes.
pub const VIDEO_SYMBOLS: usize = BYTE_SYMBOLS + 16;

/// First run symbol; `RUN_BASE + k` encodes a run of `k + 2` zero deltas.
pub const RUN_BASE: u16 = 256;

/// Longest run expressible without the escape symbol.
pub const MAX_SHORT_RUN: usize = 16;

/// Escape run symbol, followed by 16 raw bits of run length.
pub const RUN_ESCAPE: u16 = 271;

/// Maximum canonical code length in bits.
pub const MAX_CODE_BITS: u32 = 15;

/// Histogram halvings attempted before giving up on a fitting tree.
const MAX_SCALE_PASSES: u32 = 32;

/// Serialized table size in bytes for an alphabet.
pub const fn table_bytes(num_symbols: usize) -> usize {
    num_symbols.div_ceil(2)
}

/// Encoder-side canonical code table.
#[derive(Debug, Clone)]
pub struct CodeTable {
    lengths: Vec<u8>,
    codes: Vec<u16>,
}

impl CodeTable {
    /// Build a length-limited canonical table from a symbol histogram.
    ///
    /// When the optimal tree exceeds [`MAX_CODE_BITS`], the histogram is
    /// repeatedly halved (keeping every active symbol alive) and the tree
    /// rebuilt. A uniform histogram fits comfortably, so this converges; the
    /// pass cap only guards against a logic error.
    pub fn build(histogram: &[u64]) -> Result<Self> {
        let mut counts = histogram.to_vec();
        for _ in 0..MAX_SCALE_PASSES {
            let lengths = tree_lengths(&counts)?;
            let max_len = lengths.iter().copied().max().unwrap_or(0);
            if u32::from(max_len) <= MAX_CODE_BITS {
                let codes = canonical_codes(&lengths)?;
                return Ok(Self { lengths, codes });
            }
            for c in counts.iter_mut() {
                if *c > 0 {
                    *c = (*c + 1) >> 1;
                }
            }
        }
        Err(CodecError::CompressionError(
            "Huffman table exceeds code length capacity",
        ))
    }

    /// Append the packed 4-bit code-length table.
    pub fn write(&self, out: &mut Vec<u8>) {
        for pair in self.lengths.chunks(2) {
            let hi = pair[0];
            let lo = pair.get(1).copied().unwrap_or(0);
            out.push((hi << 4) | lo);
        }
    }

    /// Emit the code for `symbol` into the bitstream.
    pub fn encode(&self, writer: &mut BitWriter, symbol: u16) {
        let len = self.lengths[symbol as usize];
        debug_assert!(len > 0, "encoding symbol absent from histogram");
        writer.write_bits(u32::from(self.codes[symbol as usize]), u32::from(len));
    }

    /// Cost in bits of encoding `symbol` once.
    pub fn cost(&self, symbol: u16) -> u32 {
        u32::from(self.lengths[symbol as usize])
    }
}

/// Decoder-side canonical code table.
#[derive(Debug, Clone)]
pub struct DecodeTable {
    /// Codes of each length, indexed by length
    counts: [u32; MAX_CODE_BITS as usize + 1],
    /// First canonical code of each length
    first_code: [u32; MAX_CODE_BITS as usize + 1],
    /// Offset into `symbols` of each length's first entry
    first_index: [u32; MAX_CODE_BITS as usize + 1],
    /// Symbols sorted by (length, symbol)
    symbols: Vec<u16>,
}

impl DecodeTable {
    /// Parse a packed 4-bit length table and build the decode structures.
    ///
    /// Consumes exactly [`table_bytes`]`(num_symbols)` bytes of `data`.
    pub fn read(data: &[u8], num_symbols: usize) -> Result<Self> {
        let need = table_bytes(num_symbols);
        if data.len() < need {
            return Err(CodecError::InvalidData("truncated Huffman table"));
        }
        let mut lengths = vec![0u8; num_symbols];
        for (i, len) in lengths.iter_mut().enumerate() {
            let byte = data[i / 2];
            *len = if i % 2 == 0 { byte >> 4 } else { byte & 0x0f };
        }
        Self::from_lengths(&lengths)
    }

    /// Build decode structures from explicit code lengths.
    pub fn from_lengths(lengths: &[u8]) -> Result<Self> {
        let mut counts = [0u32; MAX_CODE_BITS as usize + 1];
        for &len in lengths {
            if u32::from(len) > MAX_CODE_BITS {
                return Err(CodecError::InvalidData("Huffman code length out of range"));
            }
            if len > 0 {
                counts[len as usize] += 1;
            }
        }

        // Over-subscribed length sets cannot form a prefix code.
        let mut kraft = 0u64;
        for (len, &count) in counts.iter().enumerate().skip(1) {
            kraft += u64::from(count) << (MAX_CODE_BITS as usize - len);
        }
        if kraft > 1u64 << MAX_CODE_BITS {
            return Err(CodecError::InvalidData("over-subscribed Huffman table"));
        }

        let mut first_code = [0u32; MAX_CODE_BITS as usize + 1];
        let mut first_index = [0u32; MAX_CODE_BITS as usize + 1];
        let mut code = 0u32;
        let mut index = 0u32;
        for len in 1..=MAX_CODE_BITS as usize {
            code = (code + counts[len - 1]) << 1;
            first_code[len] = code;
            first_index[len] = index;
            index += counts[len];
        }

        let mut symbols = Vec::with_capacity(index as usize);
        for want in 1..=MAX_CODE_BITS as usize {
            for (sym, &len) in lengths.iter().enumerate() {
                if usize::from(len) == want {
                    symbols.push(sym as u16);
                }
            }
        }

        Ok(Self {
            counts,
            first_code,
            first_index,
            symbols,
        })
    }

    /// Decode a single symbol from the bitstream.
    pub fn decode(&self, reader: &mut BitReader<'_>) -> Result<u16> {
        let mut code = 0u32;
        for len in 1..=MAX_CODE_BITS as usize {
            code = (code << 1) | reader.read_bit()?;
            let count = self.counts[len];
            let first = self.first_code[len];
            if count > 0 && code >= first && code < first + count {
                let idx = self.first_index[len] + (code - first);
                return Ok(self.symbols[idx as usize]);
            }
        }
        Err(CodecError::InvalidData("invalid Huffman code"))
    }
}

/// Compute code lengths for the optimal tree over `counts`.
///
/// Returns all-zero lengths if no symbol is active, and a single length-1
/// code when only one symbol is active.
fn tree_lengths(counts: &[u64]) -> Result<Vec<u8>> {
    let active: Vec<usize> = (0..counts.len()).filter(|&i| counts[i] > 0).collect();
    let mut lengths = vec![0u8; counts.len()];
    match active.len() {
        0 => return Ok(lengths),
        1 => {
            lengths[active[0]] = 1;
            return Ok(lengths);
        }
        _ => {}
    }

    // Standard heap-based tree build; node indices < active.len() are leaves.
    use std::cmp::Reverse;
    use std::collections::BinaryHeap;

    let mut parent = vec![usize::MAX; active.len() * 2 - 1];
    let mut heap: BinaryHeap<Reverse<(u64, usize)>> = active
        .iter()
        .enumerate()
        .map(|(node, &sym)| Reverse((counts[sym], node)))
        .collect();
    let mut next_node = active.len();
    while heap.len() > 1 {
        let Reverse((ca, a)) = heap.pop().expect("heap len checked");
        let Reverse((cb, b)) = heap.pop().expect("heap len checked");
        parent[a] = next_node;
        parent[b] = next_node;
        heap.push(Reverse((
            ca.checked_add(cb)
                .ok_or(CodecError::CompressionError("histogram count overflow"))?,
            next_node,
        )));
        next_node += 1;
    }

    let root = next_node - 1;
    for (node, &sym) in active.iter().enumerate() {
        let mut depth = 0u32;
        let mut cursor = node;
        while cursor != root {
            cursor = parent[cursor];
            depth += 1;
        }
        lengths[sym] = depth.min(255) as u8;
    }
    Ok(lengths)
}

/// Assign canonical codes for the given lengths.
fn canonical_codes(lengths: &[u8]) -> Result<Vec<u16>> {
    let mut bl_count = [0u32; MAX_CODE_BITS as usize + 1];
    for &len in lengths {
        if len > 0 {
            bl_count[len as usize] += 1;
        }
    }
    let mut next_code = [0u32; MAX_CODE_BITS as usize + 1];
    let mut code = 0u32;
    for len in 1..=MAX_CODE_BITS as usize {
        code = (code + bl_count[len - 1]) << 1;
        next_code[len] = code;
    }
    let mut codes = vec![0u16; lengths.len()];
    for (sym, &len) in lengths.iter().enumerate() {
        if len > 0 {
            codes[sym] = next_code[len as usize] as u16;
            next_code[len as usize] += 1;
        }
    }
    Ok(codes)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn roundtrip(histogram: &[u64], stream: &[u16]) {
        let table = CodeTable::build(histogram).unwrap();
        let mut serialized = Vec::new();
        table.write(&mut serialized);

        let mut writer = BitWriter::new();
        for &sym in stream {
            table.encode(&mut writer, sym);
        }
        let bits = writer.finish();

        let decode = DecodeTable::read(&serialized, histogram.len()).unwrap();
        let mut reader = BitReader::new(&bits);
        for &expect in stream {
            assert_eq!(decode.decode(&mut reader).unwrap(), expect);
        }
    }

    #[test]
    fn test_skewed_histogram_roundtrip() {
        let mut histogram = vec![0u64; VIDEO_SYMBOLS];
        histogram[0] = 10_000;
        histogram[1] = 100;
        histogram[42] = 7;
        histogram[271] = 3;
        let stream = [0u16, 0, 1, 42, 271, 0, 42, 1, 271];
        roundtrip(&histogram, &stream);
    }

    #[test]
    fn test_single_symbol_alphabet() {
        let mut histogram = vec![0u64; BYTE_SYMBOLS];
        histogram[7] = 500;
        roundtrip(&histogram, &[7u16; 16]);
    }

    #[test]
    fn test_pathological_counts_fit_length_limit() {
        // Fibonacci-ish counts force deep optimal trees; the scaling loop
        // must bring the lengths back within MAX_CODE_BITS.
        let mut histogram = vec![0u64; BYTE_SYMBOLS];
        let mut a = 1u64;
        let mut b = 1u64;
        for slot in histogram.iter_mut().take(40) {
            *slot = a;
            let next = a + b;
            a = b;
            b = next;
        }
        let table = CodeTable::build(&histogram).unwrap();
        let mut serialized = Vec::new();
        table.write(&mut serialized);
        assert!(DecodeTable::read(&serialized, BYTE_SYMBOLS).is_ok());
    }

    #[test]
    fn test_over_subscribed_table_rejected() {
        // Three codes of length 1 cannot form a prefix code.
        let lengths = [1u8, 1, 1];
        assert!(DecodeTable::from_lengths(&lengths).is_err());
    }

    #[test]
    fn test_uniform_histogram_depth() {
        let histogram = vec![1u64; VIDEO_SYMBOLS];
        let table = CodeTable::build(&histogram).unwrap();
        for sym in 0..VIDEO_SYMBOLS {
            assert!(table.cost(sym as u16) <= MAX_CODE_BITS);
        }
    }
}
