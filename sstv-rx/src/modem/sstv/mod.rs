//! SSTV header acquisition.
//!
//! The header on the wire is: leader, break, leader, start bit, 7 data bits
//! (LSB first), even parity bit, stop bit. The receiver band-limits and
//! normalizes the audio, extracts one envelope per control tone and runs the
//! [`SyncDecoder`] state machine over the envelopes.
//!
//! # References
//!
//! - <http://lionel.cordesses.free.fr/gpages/sstv.html>
//! - <https://web.archive.org/web/20050306193820/http://www.tima.com/~djones/vis.txt>
//! - <http://www.barberdsp.com/downloads/Dayton%20Paper.pdf>

mod config;
mod decoder;
mod encoder;
mod receiver;
pub mod state;
pub mod tones;
mod vis;

pub use self::{
    config::{
        ReceiverConfig,
        SenseLevels,
        Sensitivity,
        ToneConvention,
    },
    decoder::{
        ResetReason,
        SyncDecoder,
        SyncEvent,
        SyncTiming,
    },
    encoder::VisEncoder,
    receiver::{
        ReceiverError,
        SstvReceiver,
        StageTaps,
    },
    state::{
        SyncState,
        VisAccumulator,
    },
    tones::{
        ToneBank,
        ToneDetector,
        ToneEnvelopes,
        TonePair,
    },
    vis::VisCode,
};

pub const LEADER_TONE: f64 = 1900.0;
pub const LEADER_TIME: f64 = 0.300;

pub const LEADER_BREAK_TIME: f64 = 0.010;

// sync, leader break, vis start/stop
pub const SYNC_TONE: f64 = 1200.0;

pub const VIS_BIT_TIME: f64 = 0.030;

/// Tone for a VIS bit of value 1.
pub const VIS_MARK_TONE: f64 = 1100.0;
/// Tone for a VIS bit of value 0.
pub const VIS_SPACE_TONE: f64 = 1300.0;

// pair used by some popular transmitters
pub const ALT_VIS_MARK_TONE: f64 = 1080.0;
pub const ALT_VIS_SPACE_TONE: f64 = 1320.0;

pub const LEADER_BANDWIDTH: f64 = 100.0;
pub const SYNC_BANDWIDTH: f64 = 100.0;
pub const VIS_BANDWIDTH: f64 = 80.0;

/// Cutoff of the low-pass that turns rectified resonator output into an
/// envelope.
pub const ENVELOPE_CUTOFF: f64 = 50.0;

/// Leader must dominate for this long before it counts as detected.
pub const LEADER_CONFIRM_TIME: f64 = 0.015;
/// Leader accumulated before a sync tone is accepted as the start bit.
pub const MIN_LEADER_TIME: f64 = 0.100;
/// The start bit must hold for this long to be told apart from the break.
pub const START_BIT_CHECK_TIME: f64 = 0.020;

/// Band-limit before lock.
pub const ACQUISITION_BAND: (f64, f64) = (400.0, 2500.0);
/// Band-limit after the VIS code was decoded.
pub const LOCKED_BAND: (f64, f64) = (1100.0, 2600.0);
pub const BAND_ATTENUATION: f64 = 20.0;

/// Input is clipped to 75% of the 16-bit full scale.
pub const CLIP_LEVEL: f64 = 24576.0;
pub const FULL_SCALE: f64 = 32768.0;

/// Band-pass order for a sample rate. 24 at 11025 Hz, scaled linearly.
pub fn band_tap_count(sample_rate: f64) -> usize {
    ((24.0 * sample_rate / 11025.0) as usize).max(1)
}
