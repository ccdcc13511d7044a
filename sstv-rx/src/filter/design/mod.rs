//! Filter design.
//!
//! FIR taps are designed with a Kaiser-windowed sinc, IIR sections with the
//! bilinear transform (see [`iir`]). All of this runs once when a receiver is
//! set up, so it favours `f64` precision over speed.

pub mod iir;

use std::{
    f64::consts::PI,
    ops::Deref,
    sync::Arc,
};

#[derive(Clone, Debug, PartialEq, thiserror::Error)]
pub enum FilterError {
    #[error("invalid filter specification: {reason}")]
    InvalidSpec { reason: &'static str },
    #[error("invalid filter order: {order}")]
    InvalidOrder { order: usize },
    #[error("tap count mismatch: expected {expected} taps, got {actual}")]
    TapCountMismatch { expected: usize, actual: usize },
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum FilterKind {
    LowPass,
    HighPass,
    BandPass,
    BandStop,
}

/// Frequency-domain description of a Kaiser-windowed FIR filter.
///
/// `tap_count` is the filter order `N`; the designed filter has `N + 1` taps.
/// For [`FilterKind::LowPass`] and [`FilterKind::HighPass`] only `cutoff_low`
/// is used.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct FilterSpec {
    pub kind: FilterKind,
    pub sample_rate: f64,
    pub cutoff_low: f64,
    pub cutoff_high: f64,
    pub stopband_attenuation: f64,
    pub gain: f64,
    pub tap_count: usize,
}

impl FilterSpec {
    pub const DEFAULT_ATTENUATION: f64 = 20.0;

    fn new(
        kind: FilterKind,
        sample_rate: f64,
        cutoff_low: f64,
        cutoff_high: f64,
        tap_count: usize,
    ) -> Self {
        Self {
            kind,
            sample_rate,
            cutoff_low,
            cutoff_high,
            stopband_attenuation: Self::DEFAULT_ATTENUATION,
            gain: 1.0,
            tap_count,
        }
    }

    pub fn lowpass(sample_rate: f64, cutoff: f64, tap_count: usize) -> Self {
        Self::new(FilterKind::LowPass, sample_rate, cutoff, cutoff, tap_count)
    }

    pub fn highpass(sample_rate: f64, cutoff: f64, tap_count: usize) -> Self {
        Self::new(FilterKind::HighPass, sample_rate, cutoff, cutoff, tap_count)
    }

    pub fn bandpass(sample_rate: f64, cutoff_low: f64, cutoff_high: f64, tap_count: usize) -> Self {
        Self::new(
            FilterKind::BandPass,
            sample_rate,
            cutoff_low,
            cutoff_high,
            tap_count,
        )
    }

    pub fn bandstop(sample_rate: f64, cutoff_low: f64, cutoff_high: f64, tap_count: usize) -> Self {
        Self::new(
            FilterKind::BandStop,
            sample_rate,
            cutoff_low,
            cutoff_high,
            tap_count,
        )
    }

    pub fn with_attenuation(mut self, stopband_attenuation: f64) -> Self {
        self.stopband_attenuation = stopband_attenuation;
        self
    }

    pub fn with_gain(mut self, gain: f64) -> Self {
        self.gain = gain;
        self
    }

    pub fn validate(&self) -> Result<(), FilterError> {
        let invalid = |reason| Err(FilterError::InvalidSpec { reason });

        if self.tap_count < 1 {
            return invalid("tap count must be at least 1");
        }
        if !(self.sample_rate.is_finite() && self.sample_rate > 0.0) {
            return invalid("sample rate must be positive");
        }
        let nyquist = 0.5 * self.sample_rate;
        if !(self.cutoff_low > 0.0 && self.cutoff_low < nyquist) {
            return invalid("cutoff must be between 0 and half the sample rate");
        }
        match self.kind {
            FilterKind::LowPass | FilterKind::HighPass => {}
            FilterKind::BandPass | FilterKind::BandStop => {
                if !(self.cutoff_high > self.cutoff_low && self.cutoff_high < nyquist) {
                    return invalid("upper cutoff must be above the lower cutoff and below half the sample rate");
                }
            }
        }
        if !(self.stopband_attenuation.is_finite() && self.stopband_attenuation >= 0.0) {
            return invalid("stopband attenuation must be non-negative");
        }
        if !self.gain.is_finite() {
            return invalid("gain must be finite");
        }
        if matches!(self.kind, FilterKind::HighPass | FilterKind::BandStop)
            && self.tap_count % 2 != 0
        {
            return invalid("high-pass and band-stop filters need an even tap count");
        }
        Ok(())
    }

    /// Cutoff of the low-pass prototype the filter is derived from.
    fn prototype_cutoff(&self) -> f64 {
        match self.kind {
            FilterKind::LowPass => self.cutoff_low,
            FilterKind::HighPass => 0.5 * self.sample_rate - self.cutoff_low,
            FilterKind::BandPass | FilterKind::BandStop => {
                0.5 * (self.cutoff_high - self.cutoff_low)
            }
        }
    }
}

/// Immutable, shareable set of FIR taps.
#[derive(Clone, Debug, PartialEq)]
pub struct TapSet {
    taps: Arc<[f64]>,
}

impl TapSet {
    /// # Panics
    ///
    /// Panics if `taps` is empty.
    pub fn new(taps: Vec<f64>) -> Self {
        assert!(!taps.is_empty(), "tap set must not be empty");
        Self { taps: taps.into() }
    }

    #[inline]
    pub fn as_slice(&self) -> &[f64] {
        &self.taps
    }

    #[inline]
    pub fn sum(&self) -> f64 {
        self.taps.iter().sum()
    }

    pub fn is_symmetric(&self, tolerance: f64) -> bool {
        self.taps
            .iter()
            .zip(self.taps.iter().rev())
            .all(|(a, b)| (a - b).abs() <= tolerance)
    }

    /// Magnitude of the frequency response at `frequency`.
    pub fn magnitude_at(&self, frequency: f64, sample_rate: f64) -> f64 {
        let omega = 2.0 * PI * frequency / sample_rate;
        let (re, im) = self
            .taps
            .iter()
            .enumerate()
            .fold((0.0, 0.0), |(re, im), (i, tap)| {
                let phase = omega * i as f64;
                (re + tap * phase.cos(), im - tap * phase.sin())
            });
        re.hypot(im)
    }
}

impl Deref for TapSet {
    type Target = [f64];

    #[inline]
    fn deref(&self) -> &Self::Target {
        &self.taps
    }
}

/// Kaiser window shape parameter for a stopband attenuation in dB.
pub fn kaiser_alpha(attenuation: f64) -> f64 {
    if attenuation >= 50.0 {
        0.1102 * (attenuation - 8.7)
    }
    else if attenuation >= 21.0 {
        0.5842 * (attenuation - 21.0).powf(0.4) + 0.07886 * (attenuation - 21.0)
    }
    else {
        0.0
    }
}

/// Modified Bessel function of the first kind, order zero.
///
/// Summed until a term drops below `1e-8` of the running sum.
pub fn bessel_i0(x: f64) -> f64 {
    let half_x = 0.5 * x;
    let mut sum = 1.0;
    let mut term = 1.0;
    let mut k = 1.0;
    loop {
        term *= half_x / k;
        let term_squared = term * term;
        sum += term_squared;
        k += 1.0;
        if 1e-8 * sum > term_squared {
            break sum;
        }
    }
}

/// Designs a Kaiser-windowed FIR filter.
///
/// The low-pass prototype is normalized to unit DC gain, then shifted to the
/// requested band, then scaled by `gain`. The result has `tap_count + 1` taps
/// and is exactly symmetric.
pub fn design_fir(spec: &FilterSpec) -> Result<TapSet, FilterError> {
    spec.validate()?;

    let order = spec.tap_count as f64;
    let half = 0.5 * order;
    let cutoff = 2.0 * PI * spec.prototype_cutoff() / spec.sample_rate;
    let alpha = kaiser_alpha(spec.stopband_attenuation);
    let i0_alpha = bessel_i0(alpha);

    // distance of each tap from the center. taps are even functions of it.
    let offsets = (0..=spec.tap_count)
        .map(|i| (i as f64 - half).abs())
        .collect::<Vec<_>>();

    let mut taps = offsets
        .iter()
        .map(|&t| {
            let ideal = if t == 0.0 {
                cutoff / PI
            }
            else {
                (cutoff * t).sin() / (PI * t)
            };
            let position = t / half;
            let window = bessel_i0(alpha * (1.0 - position * position).max(0.0).sqrt()) / i0_alpha;
            ideal * window
        })
        .collect::<Vec<_>>();

    let dc_gain: f64 = taps.iter().sum();
    if !(dc_gain > 0.0) {
        return Err(FilterError::InvalidSpec {
            reason: "low-pass prototype has no dc response",
        });
    }
    taps.iter_mut().for_each(|tap| *tap /= dc_gain);

    match spec.kind {
        FilterKind::LowPass => {}
        FilterKind::HighPass => {
            for (tap, t) in taps.iter_mut().zip(&offsets) {
                *tap *= (t * PI).cos();
            }
        }
        FilterKind::BandPass => {
            let center = PI * (spec.cutoff_low + spec.cutoff_high) / spec.sample_rate;
            for (tap, t) in taps.iter_mut().zip(&offsets) {
                *tap *= 2.0 * (t * center).cos();
            }
        }
        FilterKind::BandStop => {
            let center = PI * (spec.cutoff_low + spec.cutoff_high) / spec.sample_rate;
            for (tap, t) in taps.iter_mut().zip(&offsets) {
                if *t == 0.0 {
                    *tap = 1.0 - 2.0 * *tap;
                }
                else {
                    *tap *= -2.0 * (t * center).cos();
                }
            }
        }
    }

    taps.iter_mut().for_each(|tap| *tap *= spec.gain);

    Ok(TapSet::new(taps))
}
