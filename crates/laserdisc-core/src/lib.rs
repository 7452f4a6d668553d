//! Laserdisc player transport core.
//!
//! Emulates the shared mechanics of a laserdisc player: the transport state
//! machine (slider position, play/pause/scan/seek/step, squelch), VBI timing
//! code decode, a triple-buffered frame ring, and the asynchronous read-ahead
//! pipeline that keeps decode latency out of the field-tick path.
//!
//! # Architecture
//!
//! - [`transport`] - the per-field state machine; synchronous, never blocks
//! - [`vbi`] - pure decode of lines 16-18 timing codes
//! - [`pipeline`] - one background fetch+decode worker per open disc
//! - [`ring`] - fixed three-slot frame arena (previous/current/next)
//! - [`player`] - the façade gluing them together, generic over a
//!   [`PlayerModel`](player::PlayerModel) for per-hardware-model behavior
//!
//! Model-specific command protocols, overlay rendering, and audio mixing are
//! external collaborators; this crate exposes the seams they attach to.

pub mod config;
pub mod error;
pub mod pipeline;
pub mod player;
pub mod ring;
pub mod transport;
pub mod vbi;

pub use config::PlayerConfig;
pub use error::{PlayerError, Result};
pub use pipeline::{Pipeline, PipelineResult};
pub use player::{AudioBlock, AudioSink, BasicModel, LaserdiscPlayer, PlayerModel};
pub use ring::{Frame, FrameRing, VideoFrameView, RING_SLOTS};
pub use transport::{
    PlayerState, SliderPosition, SquelchFlags, StateInfo, StepDirection, Transport,
};
pub use vbi::{VbiMetadata, FRAME_LEAD_IN, FRAME_LEAD_OUT, FRAME_NOT_PRESENT};
