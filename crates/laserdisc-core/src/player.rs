//! The player façade.
//!
//! [`LaserdiscPlayer`] wires the transport, the frame ring, and the
//! read-ahead pipeline together and drives them once per video field. It is
//! generic over a [`PlayerModel`]: per-hardware-model logic that interprets
//! VBI codes and commands on top of the shared transport core. The core
//! never depends on a concrete model.

use crate::config::PlayerConfig;
use crate::error::Result;
use crate::pipeline::{Pipeline, PipelineResult};
use crate::ring::{FrameRing, VideoFrameView, RING_SLOTS};
use crate::transport::{SquelchFlags, StepDirection, Transport};
use crate::vbi::VbiMetadata;
use laserdisc_image::{DiscInfo, DiscSource};
use log::debug;
use std::sync::Arc;

/// One field's worth of decoded audio, handed to the sink each field.
pub struct AudioBlock<'a> {
    /// Per-channel sample slices (up to 16 channels)
    pub channels: Vec<&'a [i16]>,
    /// Sample rate in Hz
    pub sample_rate: u32,
    /// Left channel is squelched
    pub squelch_left: bool,
    /// Right channel is squelched
    pub squelch_right: bool,
}

/// Receiver for decoded audio blocks (the external mixer).
pub trait AudioSink: Send {
    /// Deliver one field's samples.
    fn deliver(&mut self, block: &AudioBlock<'_>);
}

/// Per-hardware-model capability interface.
///
/// Models customize VBI interpretation and slider motion while reusing the
/// shared transport; the defaults delegate straight to
/// [`Transport::generic_update`].
pub trait PlayerModel {
    /// Called once per field before the transport update.
    fn on_vsync(
        &mut self,
        _vbi: &VbiMetadata,
        _fieldnum: u8,
        _now_us: u64,
        _transport: &mut Transport,
    ) {
    }

    /// Compute this field's track advance; defaults to the generic update.
    fn on_update(
        &mut self,
        vbi: &VbiMetadata,
        fieldnum: u8,
        now_us: u64,
        transport: &mut Transport,
    ) -> i32 {
        transport.generic_update(vbi, fieldnum, now_us)
    }

    /// Inspect the visible bitmap after the field settles (overlay hook).
    fn on_overlay(&mut self, _frame: &VideoFrameView<'_>) {}
}

/// Model with no customizations; pure generic transport behavior.
#[derive(Debug, Default)]
pub struct BasicModel;

impl PlayerModel for BasicModel {}

/// A complete player instance for one disc.
pub struct LaserdiscPlayer<M: PlayerModel> {
    source: Arc<dyn DiscSource>,
    info: DiscInfo,
    config: PlayerConfig,
    transport: Transport,
    ring: FrameRing,
    pipeline: Option<Pipeline>,
    model: M,
    audio_sink: Option<Box<dyn AudioSink>>,
    read_failures: u32,
    field_number: u64,
    pending_hunk: Option<u32>,
}

impl<M: PlayerModel> LaserdiscPlayer<M> {
    /// Create a player for an opened disc image.
    pub fn new(source: Arc<dyn DiscSource>, model: M, config: PlayerConfig) -> Result<Self> {
        let info = *source.info();
        let mut ring_buffers = Vec::with_capacity(RING_SLOTS);
        for _ in 0..RING_SLOTS {
            ring_buffers.push(Pipeline::make_buffers(&info)?);
        }
        Ok(Self {
            source,
            info,
            config,
            transport: Transport::new(config, info.hunk_count),
            ring: FrameRing::new(ring_buffers),
            pipeline: None,
            model,
            audio_sink: None,
            read_failures: 0,
            field_number: 0,
            pending_hunk: None,
        })
    }

    /// Disc geometry and timing metadata.
    pub fn info(&self) -> &DiscInfo {
        &self.info
    }

    /// The transport core (state, slider, squelch).
    pub fn transport(&self) -> &Transport {
        &self.transport
    }

    /// Mutable transport access for hosts and tests.
    pub fn transport_mut(&mut self) -> &mut Transport {
        &mut self.transport
    }

    /// The player model.
    pub fn model_mut(&mut self) -> &mut M {
        &mut self.model
    }

    /// Install the audio sink receiving per-field sample blocks.
    pub fn set_audio_sink(&mut self, sink: Box<dyn AudioSink>) {
        self.audio_sink = Some(sink);
    }

    /// Request a disc load; spawns the read-ahead worker.
    pub fn load(&mut self, now_us: u64) -> bool {
        if self.pipeline.is_none() {
            match Pipeline::new(self.source.clone()) {
                Ok(pipeline) => self.pipeline = Some(pipeline),
                Err(err) => {
                    log::error!("cannot start read-ahead pipeline: {err}");
                    return false;
                }
            }
        }
        self.transport.load(now_us)
    }

    /// Request a disc eject; tears down the read-ahead worker.
    pub fn eject(&mut self, now_us: u64) -> bool {
        if !self.transport.eject(now_us) {
            return false;
        }
        debug!("eject requested, stopping read-ahead");
        self.pipeline = None;
        self.pending_hunk = None;
        self.read_failures = 0;
        self.ring.invalidate();
        true
    }

    /// Request normal-rate playback toward `target_frame` (0 = endless).
    pub fn play(&mut self, target_frame: i32, now_us: u64) -> bool {
        self.transport.play(target_frame, now_us)
    }

    /// Request a pause at the next frame boundary.
    pub fn pause(&mut self, now_us: u64) -> bool {
        self.transport.pause(now_us)
    }

    /// Request a single-track step.
    pub fn step(&mut self, direction: StepDirection, now_us: u64) -> bool {
        self.transport.step(direction, now_us)
    }

    /// Request a scan (see [`Transport::scan`]).
    pub fn scan(&mut self, speed: i32, revert_vsyncs: u8, now_us: u64) -> bool {
        self.transport.scan(speed, revert_vsyncs, now_us)
    }

    /// Request a seek to `target_frame`.
    pub fn seek(&mut self, target_frame: i32, now_us: u64) -> bool {
        self.transport.seek(target_frame, now_us)
    }

    /// The currently visible bitmap, unless video is squelched.
    pub fn current_frame(&self) -> Option<VideoFrameView<'_>> {
        if self.transport.squelch().contains(SquelchFlags::VIDEO) {
            return None;
        }
        self.ring.current().visible(self.config.vbi_scanlines)
    }

    /// Absolute field counter.
    pub fn field_number(&self) -> u64 {
        self.field_number
    }

    /// Drive one video field.
    ///
    /// Never blocks: the pipeline is polled, not waited on. A failed fetch
    /// repeats the last good frame; consecutive failures beyond the
    /// configured threshold force the transport into `Paused`. Only
    /// resource exhaustion is returned as an error.
    pub fn field_tick(&mut self, now_us: u64) -> Result<()> {
        let fieldnum = (self.field_number % 2) as u8;
        self.field_number += 1;

        // Collect the latest completed decode, if any.
        if let Some(pipeline) = &self.pipeline {
            match pipeline.try_take_result() {
                PipelineResult::Ready { hunk, mut buffers } => {
                    let field_number = self.field_number;
                    let slot = self.ring.next_mut();
                    std::mem::swap(&mut slot.buffers, &mut buffers);
                    slot.valid = true;
                    slot.last_field = field_number + u64::from(slot.fields()) - 1;
                    self.ring.advance();
                    pipeline.recycle(buffers);
                    self.read_failures = 0;
                    log::trace!("frame from hunk {hunk} on field {field_number}");
                }
                PipelineResult::Failed(err) => {
                    if err.is_fatal() {
                        return Err(err);
                    }
                    // Cosmetic: hold the last good frame on screen.
                    self.read_failures += 1;
                    if self.read_failures > self.config.read_fail_threshold {
                        self.transport.force_paused();
                        self.read_failures = 0;
                    }
                }
                PipelineResult::Pending => {}
            }
        }

        // Model hooks around the generic transport update.
        let vbi = self.ring.current().vbi(fieldnum);
        self.model
            .on_vsync(&vbi, fieldnum, now_us, &mut self.transport);
        let advance = self
            .model
            .on_update(&vbi, fieldnum, now_us, &mut self.transport);
        self.transport.advance_slider(advance);

        // Ask the pipeline for the track now under the slider.
        if let (Some(pipeline), Some(hunk)) = (&self.pipeline, self.transport.current_hunk()) {
            if self.pending_hunk != Some(hunk) {
                pipeline.request(hunk);
                self.pending_hunk = Some(hunk);
            }
        }

        if let Some(view) = self.ring.current().visible(self.config.vbi_scanlines) {
            self.model.on_overlay(&view);
        }

        self.deliver_audio(fieldnum);
        Ok(())
    }

    /// Hand this field's samples to the sink, gated by the squelch flags.
    fn deliver_audio(&mut self, fieldnum: u8) {
        let Some(sink) = &mut self.audio_sink else {
            return;
        };
        let squelch = self.transport.squelch();
        let left = squelch.contains(SquelchFlags::AUDIO_LEFT);
        let right = squelch.contains(SquelchFlags::AUDIO_RIGHT);
        if left && right {
            return;
        }
        let frame = self.ring.current();
        if !frame.valid || fieldnum >= frame.fields() {
            return;
        }
        let samples = usize::from(frame.buffers.desc.samples);
        let per_field = samples / usize::from(frame.fields());
        let start = usize::from(fieldnum) * per_field;
        let end = if fieldnum + 1 == frame.fields() {
            samples
        } else {
            start + per_field
        };
        let channels: Vec<&[i16]> = frame
            .buffers
            .audio
            .iter()
            .take(usize::from(frame.buffers.desc.channels))
            .map(|ch| &ch[start..end])
            .collect();
        sink.deliver(&AudioBlock {
            channels,
            sample_rate: self.info.sample_rate,
            squelch_left: left,
            squelch_right: right,
        });
    }
}
