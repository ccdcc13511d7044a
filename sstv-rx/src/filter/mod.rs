pub mod biquad;
pub mod design;
pub mod fir;
pub mod resonator;

pub use self::{
    biquad::CascadedBiquadFilter,
    design::{
        FilterError,
        FilterKind,
        FilterSpec,
        TapSet,
        design_fir,
        iir::design_iir,
    },
    fir::CircularFirFilter,
    resonator::ToneResonator,
};

/// Magnitude below which recursive filter state is flushed to zero.
pub const DENORMAL_THRESHOLD: f64 = 1e-37;

/// Flushes values that would otherwise decay into denormals.
///
/// Every recursive filter in this crate passes its state through this before
/// storing it.
#[inline]
pub fn flush_denormal(value: f64) -> f64 {
    if value.abs() < DENORMAL_THRESHOLD {
        0.0
    }
    else {
        value
    }
}
