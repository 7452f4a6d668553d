//! Player tuning configuration.

use serde::{Deserialize, Serialize};

/// Tunable timing and geometry parameters of the transport core.
///
/// Hosts typically deserialize this from their own configuration files; the
/// defaults model a stock NTSC CAV player.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PlayerConfig {
    /// Consecutive read/decode failures tolerated before playback is forced
    /// into `Paused`. Failures below the threshold repeat the last good
    /// frame.
    pub read_fail_threshold: u32,

    /// Virtual lead-in tracks before the recorded data begins.
    pub lead_in_tracks: u32,

    /// Virtual lead-out tracks after the recorded data ends.
    pub lead_out_tracks: u32,

    /// Nominal tracks on a full disc side; short recordings still present
    /// a full-size track space so the slider behaves like real media.
    pub nominal_tracks: u32,

    /// Tray eject time in microseconds.
    pub eject_time_us: u64,

    /// Disc load/clamp time in microseconds.
    pub load_time_us: u64,

    /// Spindle spin-up time in microseconds.
    pub spinup_time_us: u64,

    /// Settle window when entering `Paused`, in microseconds (roughly one
    /// frame period: the pause completes at the next start-of-frame or at
    /// this timeout, whichever comes first).
    pub pause_settle_us: u64,

    /// Maximum slew rate of the slider during a seek, in tracks per field.
    pub seek_max_tracks_per_field: i32,

    /// Distance from the seek target, in frames, below which the slider
    /// creeps one track per field to avoid overshoot.
    pub seek_slow_frames: i32,

    /// Scanlines at the top of each stored field that carry VBI codes and
    /// are excluded from the visible bitmap view.
    pub vbi_scanlines: u16,
}

impl Default for PlayerConfig {
    fn default() -> Self {
        Self {
            read_fail_threshold: 2,
            lead_in_tracks: 200,
            lead_out_tracks: 200,
            nominal_tracks: 54_000,
            eject_time_us: 1_000_000,
            load_time_us: 2_000_000,
            spinup_time_us: 2_000_000,
            pause_settle_us: 33_400,
            seek_max_tracks_per_field: 450,
            seek_slow_frames: 5,
            vbi_scanlines: 4,
        }
    }
}
