//! Disc transport state machine.
//!
//! Models the mechanical side of a player: slider position in tracks, the
//! transport state (playing, paused, scanning, seeking, ...), per-field track
//! advancement, and the audio/video squelch outputs. The machine is driven
//! synchronously once per video field and never blocks; disc I/O and decode
//! live in the read-ahead pipeline.
//!
//! Track space: track 0 and the final track are boundary markers and never
//! valid positions. Virtual lead-in tracks precede the recorded data and
//! virtual lead-out tracks follow it, so short recordings still behave like
//! full-size media under the slider.

use crate::config::PlayerConfig;
use crate::vbi::VbiMetadata;
use bitflags::bitflags;
use log::{debug, trace, warn};

bitflags! {
    /// Forced output muting, independent of decoded content.
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct SquelchFlags: u8 {
        /// Left audio channel muted
        const AUDIO_LEFT = 0x01;
        /// Right audio channel muted
        const AUDIO_RIGHT = 0x02;
        /// Video output blanked
        const VIDEO = 0x04;
    }
}

impl SquelchFlags {
    /// Both audio channels and video muted.
    pub fn all_squelched() -> Self {
        Self::all()
    }
}

/// Transport states.
///
/// Initial state is `None` (no disc); there is no terminal state, `Ejected`
/// being the nearest for removed media.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PlayerState {
    /// No disc present
    #[default]
    None,
    /// Tray opening
    Ejecting,
    /// Tray open, disc removed
    Ejected,
    /// Disc clamping
    Loading,
    /// Spindle coming up to speed
    Spinup,
    /// Spindle stopped with a disc present
    Parked,
    /// Settling onto a frame boundary before pausing
    Pausing,
    /// Holding one frame
    Paused,
    /// Normal-rate playback; parameter = target frame (0 = endless)
    Playing,
    /// Slow motion forward; parameter = repeats per track
    PlayingSlowForward,
    /// Slow motion reverse; parameter = repeats per track
    PlayingSlowReverse,
    /// Fast forward; parameter = frames skipped after each displayed frame
    PlayingFastForward,
    /// Fast reverse; parameter = frames skipped after each displayed frame
    PlayingFastReverse,
    /// Single step forward, then pause
    SteppingForward,
    /// Single step reverse, then pause
    SteppingReverse,
    /// Scanning; parameter packs revert countdown and signed speed
    Scanning,
    /// Seeking; parameter = target frame
    Seeking,
}

/// One transport state with its qualifiers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct StateInfo {
    /// Current state
    pub state: PlayerState,
    /// Sub-state counter; reset to 0 on every state change
    pub substate: u32,
    /// State-specific parameter (see [`PlayerState`] variants)
    pub param: i32,
    /// Earliest wall-clock time this state may legally transition, in µs
    pub end_time_us: u64,
}

/// Six-way classification of the slider position.
///
/// Derived from the current track and the track extents; never stored.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SliderPosition {
    /// Resting against the inner mechanical stop
    BelowMinimum,
    /// Inside the virtual lead-in band
    VirtualLeadIn,
    /// Over recorded data
    WithinMedia,
    /// Past the recorded data but before the lead-out band
    BeyondMedia,
    /// Inside the virtual lead-out band
    VirtualLeadOut,
    /// Resting against the outer mechanical stop
    AboveMaximum,
}

/// Step direction for [`Transport::step`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StepDirection {
    /// One track toward lead-out
    Forward,
    /// One track toward lead-in
    Reverse,
}

/// The transport core.
pub struct Transport {
    config: PlayerConfig,
    data_tracks: u32,
    maxtrack: u32,
    curtrack: u32,
    slider_speed: i32,
    state: StateInfo,
    saved: Option<StateInfo>,
    manual_squelch: SquelchFlags,
    derived_squelch: SquelchFlags,
    last_frame: i32,
    last_chapter: i32,
}

impl Transport {
    /// Create a transport for media with `data_tracks` recorded tracks.
    pub fn new(config: PlayerConfig, data_tracks: u32) -> Self {
        let span = data_tracks.max(config.nominal_tracks);
        Self {
            config,
            data_tracks,
            maxtrack: 1 + config.lead_in_tracks + span + config.lead_out_tracks,
            curtrack: 1,
            slider_speed: 0,
            state: StateInfo::default(),
            saved: None,
            manual_squelch: SquelchFlags::empty(),
            derived_squelch: SquelchFlags::all_squelched(),
            last_frame: crate::vbi::FRAME_NOT_PRESENT,
            last_chapter: crate::vbi::CHAPTER_NOT_PRESENT,
        }
    }

    /// Current state with qualifiers.
    pub fn state_info(&self) -> StateInfo {
        self.state
    }

    /// Current state.
    pub fn state(&self) -> PlayerState {
        self.state.state
    }

    /// Current track number.
    pub fn current_track(&self) -> u32 {
        self.curtrack
    }

    /// Highest track number (outer boundary marker).
    pub fn max_track(&self) -> u32 {
        self.maxtrack
    }

    /// Most recent frame number decoded from VBI codes.
    pub fn last_frame(&self) -> i32 {
        self.last_frame
    }

    /// Most recent chapter number decoded from VBI codes.
    pub fn last_chapter(&self) -> i32 {
        self.last_chapter
    }

    /// Effective squelch: manual requests OR'd with transport-derived state.
    pub fn squelch(&self) -> SquelchFlags {
        self.manual_squelch | self.derived_squelch
    }

    /// Mute or unmute the audio channels (hardware mute lines).
    pub fn set_audio_squelch(&mut self, left: bool, right: bool) {
        self.manual_squelch.set(SquelchFlags::AUDIO_LEFT, left);
        self.manual_squelch.set(SquelchFlags::AUDIO_RIGHT, right);
    }

    /// Blank or unblank the video output.
    pub fn set_video_squelch(&mut self, on: bool) {
        self.manual_squelch.set(SquelchFlags::VIDEO, on);
    }

    /// Set the default slider slew rate in tracks per vsync.
    ///
    /// Used as the scan speed when [`Transport::scan`] is given speed 0.
    pub fn set_slider_speed(&mut self, tracks_per_vsync: i32) {
        self.slider_speed = tracks_per_vsync;
    }

    /// Move the slider, clamping into the valid `[1, maxtrack - 1]` range.
    ///
    /// Returns `true` when the move was truncated by a boundary stop.
    pub fn advance_slider(&mut self, delta: i32) -> bool {
        let target = i64::from(self.curtrack) + i64::from(delta);
        let clamped = target.clamp(1, i64::from(self.maxtrack) - 1);
        self.curtrack = clamped as u32;
        if clamped != target {
            trace!("slider clamped at track {}", self.curtrack);
        }
        // Leaving the media band must squelch immediately, not a field late.
        self.refresh_squelch();
        clamped != target
    }

    /// Classify the current slider position.
    pub fn slider_position(&self) -> SliderPosition {
        let data_start = 1 + self.config.lead_in_tracks;
        let data_end = data_start + self.data_tracks;
        if self.curtrack <= 1 {
            SliderPosition::BelowMinimum
        } else if self.curtrack < data_start {
            SliderPosition::VirtualLeadIn
        } else if self.curtrack < data_end {
            SliderPosition::WithinMedia
        } else if self.curtrack < self.maxtrack - self.config.lead_out_tracks {
            SliderPosition::BeyondMedia
        } else if self.curtrack < self.maxtrack {
            SliderPosition::VirtualLeadOut
        } else {
            SliderPosition::AboveMaximum
        }
    }

    /// Hunk index under the slider, when it is over recorded data.
    pub fn current_hunk(&self) -> Option<u32> {
        match self.slider_position() {
            SliderPosition::WithinMedia => Some(self.curtrack - 1 - self.config.lead_in_tracks),
            _ => None,
        }
    }

    // ---- transition requests ------------------------------------------------

    /// Request normal-rate playback toward `target_frame` (0 = endless).
    pub fn play(&mut self, target_frame: i32, _now_us: u64) -> bool {
        if matches!(
            self.state.state,
            PlayerState::None | PlayerState::Ejecting | PlayerState::Ejected | PlayerState::Loading
        ) {
            return false;
        }
        self.set_state(PlayerState::Playing, target_frame, 0);
        true
    }

    /// Request a pause at the next frame boundary.
    pub fn pause(&mut self, now_us: u64) -> bool {
        if !matches!(
            self.state.state,
            PlayerState::Playing
                | PlayerState::PlayingSlowForward
                | PlayerState::PlayingSlowReverse
                | PlayerState::PlayingFastForward
                | PlayerState::PlayingFastReverse
                | PlayerState::SteppingForward
                | PlayerState::SteppingReverse
                | PlayerState::Scanning
                | PlayerState::Seeking
        ) {
            return false;
        }
        self.set_state(
            PlayerState::Pausing,
            0,
            now_us + self.config.pause_settle_us,
        );
        true
    }

    /// Request fast playback, skipping `skip` frames after each displayed
    /// frame.
    pub fn play_fast(&mut self, skip: i32, reverse: bool, _now_us: u64) -> bool {
        if !self.in_motion_state() {
            return false;
        }
        let state = if reverse {
            PlayerState::PlayingFastReverse
        } else {
            PlayerState::PlayingFastForward
        };
        self.set_state(state, skip.max(0), 0);
        true
    }

    /// Request slow playback, repeating each track `repeats` times.
    pub fn play_slow(&mut self, repeats: i32, reverse: bool, _now_us: u64) -> bool {
        if !self.in_motion_state() {
            return false;
        }
        let state = if reverse {
            PlayerState::PlayingSlowReverse
        } else {
            PlayerState::PlayingSlowForward
        };
        self.set_state(state, repeats.max(1), 0);
        true
    }

    /// Request a single-track step out of pause.
    pub fn step(&mut self, direction: StepDirection, _now_us: u64) -> bool {
        if self.state.state != PlayerState::Paused {
            return false;
        }
        let state = match direction {
            StepDirection::Forward => PlayerState::SteppingForward,
            StepDirection::Reverse => PlayerState::SteppingReverse,
        };
        self.set_state(state, 0, 0);
        true
    }

    /// Request a scan at `speed` tracks per vsync (0 = the configured slider
    /// speed), reverting to the interrupted state after `revert_vsyncs`
    /// fields (0 = scan until told otherwise).
    pub fn scan(&mut self, speed: i32, revert_vsyncs: u8, _now_us: u64) -> bool {
        if !self.in_motion_state() {
            return false;
        }
        self.saved = Some(self.state);
        let param = (speed.clamp(-(1 << 23), (1 << 23) - 1) << 8) | i32::from(revert_vsyncs);
        self.set_state(PlayerState::Scanning, param, 0);
        true
    }

    /// Request a seek to `target_frame`.
    pub fn seek(&mut self, target_frame: i32, _now_us: u64) -> bool {
        if !matches!(
            self.state.state,
            PlayerState::Playing
                | PlayerState::Pausing
                | PlayerState::Paused
                | PlayerState::PlayingSlowForward
                | PlayerState::PlayingSlowReverse
                | PlayerState::PlayingFastForward
                | PlayerState::PlayingFastReverse
                | PlayerState::Scanning
                | PlayerState::Seeking
        ) {
            return false;
        }
        self.set_state(PlayerState::Seeking, target_frame, 0);
        true
    }

    /// Request a disc eject.
    pub fn eject(&mut self, now_us: u64) -> bool {
        if matches!(
            self.state.state,
            PlayerState::None | PlayerState::Ejecting | PlayerState::Ejected
        ) {
            return false;
        }
        self.set_state(PlayerState::Ejecting, 0, now_us + self.config.eject_time_us);
        true
    }

    /// Request a disc load.
    pub fn load(&mut self, now_us: u64) -> bool {
        if !matches!(self.state.state, PlayerState::None | PlayerState::Ejected) {
            return false;
        }
        self.curtrack = 1;
        self.set_state(PlayerState::Loading, 0, now_us + self.config.load_time_us);
        true
    }

    /// Force the transport into `Paused` after repeated read failures.
    ///
    /// This is the fault path, not a transition request; legality checks do
    /// not apply.
    pub fn force_paused(&mut self) {
        warn!("forcing transport to Paused from {:?}", self.state.state);
        self.set_state(PlayerState::Paused, 0, 0);
    }

    // ---- per-field update ---------------------------------------------------

    /// The per-field heart of the transport.
    ///
    /// Performs timer-gated state transitions (`now_us >= end_time_us`),
    /// computes the slider advance for the active state, and refreshes the
    /// derived squelch. Returns the signed track advance for this field; the
    /// caller applies it via [`Transport::advance_slider`], letting player
    /// models override the motion when their hardware differs.
    pub fn generic_update(&mut self, vbi: &VbiMetadata, fieldnum: u8, now_us: u64) -> i32 {
        self.observe_vbi(vbi);
        let frame = vbi.frame_number();
        let timer_hit = now_us >= self.state.end_time_us;
        let mut advance = 0;

        match self.state.state {
            PlayerState::None
            | PlayerState::Ejected
            | PlayerState::Parked
            | PlayerState::Paused => {}

            PlayerState::Ejecting => {
                if timer_hit {
                    self.set_state(PlayerState::Ejected, 0, 0);
                }
            }

            PlayerState::Loading => {
                // Slider rests at the stop while the disc clamps.
                self.curtrack = 1;
                if timer_hit {
                    self.set_state(PlayerState::Spinup, 0, now_us + self.config.spinup_time_us);
                }
            }

            PlayerState::Spinup => {
                if timer_hit {
                    self.set_state(PlayerState::Playing, 0, 0);
                }
            }

            PlayerState::Pausing => {
                if vbi.is_start_of_frame() || timer_hit {
                    self.set_state(PlayerState::Paused, i32::from(fieldnum), 0);
                } else {
                    // Keep rolling until the frame boundary arrives.
                    advance = i32::from(fieldnum);
                }
            }

            PlayerState::Playing => {
                let target = self.state.param;
                if target > 0 && frame == target && vbi.is_start_of_frame() {
                    self.set_state(
                        PlayerState::Pausing,
                        0,
                        now_us + self.config.pause_settle_us,
                    );
                } else {
                    // One track per displayed frame, applied on the final field.
                    advance = i32::from(fieldnum);
                }
            }

            PlayerState::PlayingFastForward => {
                if fieldnum == 1 {
                    advance = 1 + self.state.param;
                }
            }

            PlayerState::PlayingFastReverse => {
                if fieldnum == 1 {
                    advance = -(1 + self.state.param);
                }
            }

            PlayerState::PlayingSlowForward | PlayerState::PlayingSlowReverse => {
                let repeats = self.state.param.max(1) as u32;
                if self.state.substate + 1 >= repeats * 2 {
                    self.state.substate = 0;
                    advance = if self.state.state == PlayerState::PlayingSlowForward {
                        1
                    } else {
                        -1
                    };
                } else {
                    self.state.substate += 1;
                }
            }

            PlayerState::SteppingForward | PlayerState::SteppingReverse => {
                advance = if self.state.state == PlayerState::SteppingForward {
                    1
                } else {
                    -1
                };
                self.set_state(
                    PlayerState::Pausing,
                    0,
                    now_us + self.config.pause_settle_us,
                );
            }

            PlayerState::Scanning => {
                let mut speed = self.state.param >> 8;
                if speed == 0 {
                    speed = self.slider_speed;
                }
                advance = speed;
                let countdown = self.state.param & 0xff;
                if countdown > 0 {
                    if countdown == 1 {
                        self.restore_state();
                    } else {
                        self.state.param = (speed << 8) | (countdown - 1);
                    }
                }
            }

            PlayerState::Seeking => {
                let target = self.state.param;
                if frame >= 0 {
                    // Track delta derives from the decoded frame number, not a
                    // track counter: physical track and logical frame diverge
                    // on CLV media.
                    let delta = target - frame;
                    if delta == 0 && vbi.is_start_of_frame() {
                        self.set_state(
                            PlayerState::Pausing,
                            0,
                            now_us + self.config.pause_settle_us,
                        );
                    } else if delta.abs() <= self.config.seek_slow_frames {
                        // Creep near the target to avoid overshoot.
                        advance = delta.signum();
                        self.state.substate = advance as u32;
                    } else {
                        let max = self.config.seek_max_tracks_per_field;
                        advance = delta.clamp(-max, max);
                        self.state.substate = advance as u32;
                    }
                } else {
                    // No readable frame number this field; hold the last
                    // commanded speed.
                    advance = self.state.substate as i32;
                }
            }
        }

        self.refresh_squelch();
        advance
    }

    // ---- internals ----------------------------------------------------------

    /// States a trick-play request (fast/slow/scan) may interrupt.
    fn in_motion_state(&self) -> bool {
        matches!(
            self.state.state,
            PlayerState::Playing
                | PlayerState::Paused
                | PlayerState::PlayingSlowForward
                | PlayerState::PlayingSlowReverse
                | PlayerState::PlayingFastForward
                | PlayerState::PlayingFastReverse
        )
    }

    fn set_state(&mut self, state: PlayerState, param: i32, end_time_us: u64) {
        if state != self.state.state {
            debug!("transport {:?} -> {:?}", self.state.state, state);
        }
        self.state = StateInfo {
            state,
            substate: 0,
            param,
            end_time_us,
        };
        self.refresh_squelch();
    }

    fn restore_state(&mut self) {
        if let Some(saved) = self.saved.take() {
            self.set_state(saved.state, saved.param, 0);
        } else {
            self.set_state(PlayerState::Paused, 0, 0);
        }
    }

    fn observe_vbi(&mut self, vbi: &VbiMetadata) {
        let frame = vbi.frame_number();
        if frame != crate::vbi::FRAME_NOT_PRESENT {
            self.last_frame = frame;
        }
        let chapter = vbi.chapter_number();
        if chapter != crate::vbi::CHAPTER_NOT_PRESENT {
            self.last_chapter = chapter;
        }
    }

    fn refresh_squelch(&mut self) {
        let audio = SquelchFlags::AUDIO_LEFT | SquelchFlags::AUDIO_RIGHT;
        self.derived_squelch = match self.slider_position() {
            SliderPosition::WithinMedia => match self.state.state {
                // Audio only runs at normal play speed.
                PlayerState::Playing => SquelchFlags::empty(),
                PlayerState::Pausing
                | PlayerState::Paused
                | PlayerState::PlayingSlowForward
                | PlayerState::PlayingSlowReverse
                | PlayerState::PlayingFastForward
                | PlayerState::PlayingFastReverse
                | PlayerState::SteppingForward
                | PlayerState::SteppingReverse
                | PlayerState::Scanning => audio,
                PlayerState::Seeking => audio | SquelchFlags::VIDEO,
                _ => SquelchFlags::all_squelched(),
            },
            // Outside recorded data everything is squelched.
            _ => SquelchFlags::all_squelched(),
        };
    }
}
