//! Triple-buffered frame ring.
//!
//! Three frame slots (previous, current, next) in a fixed arena, addressed by
//! index only. Slots are overwritten in place as playback advances; no frame
//! is allocated or freed during steady-state playback.

use crate::vbi::{VbiMetadata, PACKED_VBI_BYTES};
use laserdisc_avcodec::FrameBuffers;

/// Number of slots in the ring.
pub const RING_SLOTS: usize = 3;

/// One decoded frame owned by a ring slot.
pub struct Frame {
    /// Decoded video/audio/metadata buffers
    pub buffers: FrameBuffers,
    /// Whether this slot holds decoded data
    pub valid: bool,
    /// Absolute field number of the frame's last constituent field
    pub last_field: u64,
}

impl Frame {
    fn new(buffers: FrameBuffers) -> Self {
        Self {
            buffers,
            valid: false,
            last_field: 0,
        }
    }

    /// Field count stored in this frame (1 or 2), derived from the packed
    /// VBI metadata; frames without metadata count as two fields.
    pub fn fields(&self) -> u8 {
        match self.buffers.metadata.len() / PACKED_VBI_BYTES {
            1 => 1,
            _ => 2,
        }
    }

    /// VBI codes for one field of this frame.
    pub fn vbi(&self, field: u8) -> VbiMetadata {
        if !self.valid {
            return VbiMetadata::default();
        }
        VbiMetadata::unpack(&self.buffers.metadata, usize::from(field)).unwrap_or_default()
    }

    /// Bitmap view clipped to the active scanlines.
    pub fn visible(&self, skip_scanlines: u16) -> Option<VideoFrameView<'_>> {
        if !self.valid {
            return None;
        }
        let width = usize::from(self.buffers.desc.width);
        let height = usize::from(self.buffers.desc.height);
        let skip = usize::from(skip_scanlines).min(height);
        if width == 0 || height == skip {
            return None;
        }
        Some(VideoFrameView {
            data: &self.buffers.video[skip * width * 2..],
            width,
            height: height - skip,
        })
    }
}

/// Borrowed view of a frame's visible bitmap.
#[derive(Debug, Clone, Copy)]
pub struct VideoFrameView<'a> {
    /// Interleaved YCbCr 4:2:2 bytes, `height` rows of `width * 2` bytes
    pub data: &'a [u8],
    /// Width in pixels
    pub width: usize,
    /// Visible height in scanlines
    pub height: usize,
}

impl VideoFrameView<'_> {
    /// One scanline of interleaved YCbCr bytes.
    pub fn row(&self, y: usize) -> &[u8] {
        &self.data[y * self.width * 2..(y + 1) * self.width * 2]
    }
}

/// Fixed three-slot ring of decoded frames.
pub struct FrameRing {
    slots: Vec<Frame>,
    current: usize,
}

impl FrameRing {
    /// Build the ring from three preallocated buffer sets.
    pub fn new(buffers: Vec<FrameBuffers>) -> Self {
        debug_assert_eq!(buffers.len(), RING_SLOTS);
        Self {
            slots: buffers.into_iter().map(Frame::new).collect(),
            current: 0,
        }
    }

    /// The frame currently on screen.
    pub fn current(&self) -> &Frame {
        &self.slots[self.current]
    }

    /// The slot that incoming decodes are written into.
    pub fn next_mut(&mut self) -> &mut Frame {
        &mut self.slots[(self.current + 1) % RING_SLOTS]
    }

    /// The previously displayed frame.
    pub fn previous(&self) -> &Frame {
        &self.slots[(self.current + RING_SLOTS - 1) % RING_SLOTS]
    }

    /// Rotate: next becomes current, current becomes previous.
    pub fn advance(&mut self) {
        self.current = (self.current + 1) % RING_SLOTS;
    }

    /// Drop all decoded contents (media change).
    pub fn invalidate(&mut self) {
        for slot in &mut self.slots {
            slot.valid = false;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ring() -> FrameRing {
        let buffers = (0..RING_SLOTS)
            .map(|_| FrameBuffers::with_limits(8, 4, 16, 1).unwrap())
            .collect();
        FrameRing::new(buffers)
    }

    #[test]
    fn test_rotation_order() {
        let mut ring = ring();
        ring.next_mut().last_field = 1;
        ring.next_mut().valid = true;
        ring.advance();
        assert!(ring.current().valid);
        assert_eq!(ring.current().last_field, 1);
        assert!(!ring.previous().valid);
        assert!(!ring.next_mut().valid);
    }

    #[test]
    fn test_invalid_frame_yields_no_view_and_blank_vbi() {
        let ring = ring();
        assert!(ring.current().visible(0).is_none());
        assert_eq!(ring.current().vbi(0), VbiMetadata::default());
    }
}
