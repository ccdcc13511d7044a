use std::f64::consts::PI;

use crate::{
    filter::flush_denormal,
    scan::Scanner,
};

/// Narrow-band two-pole resonator used as a tone detector.
///
/// The selectivity is roughly `center_freq / bandwidth`. Settling to about 90%
/// takes `3 / (π·bandwidth)` seconds, so decisions based on the output should
/// not be taken faster than that.
#[derive(Clone, Copy, Debug)]
pub struct ToneResonator {
    center_freq: f64,
    sample_rate: f64,
    bandwidth: f64,
    a0: f64,
    b1: f64,
    b2: f64,
    z1: f64,
    z2: f64,
}

impl ToneResonator {
    pub fn new(center_freq: f64, sample_rate: f64, bandwidth: f64) -> Self {
        let mut resonator = Self {
            center_freq,
            sample_rate,
            bandwidth,
            a0: 0.0,
            b1: 0.0,
            b2: 0.0,
            z1: 0.0,
            z2: 0.0,
        };
        resonator.set_freq(center_freq, sample_rate, bandwidth);
        resonator
    }

    /// Retunes the resonator. This also clears its state.
    pub fn set_freq(&mut self, center_freq: f64, sample_rate: f64, bandwidth: f64) {
        let omega = 2.0 * PI * center_freq / sample_rate;
        self.b1 = 2.0 * (-PI * bandwidth / sample_rate).exp() * omega.cos();
        self.b2 = -(-2.0 * PI * bandwidth / sample_rate).exp();
        self.a0 = if bandwidth == 0.0 {
            omega.sin()
        }
        else {
            omega.sin() / ((sample_rate / 6.0) / bandwidth)
        };

        self.center_freq = center_freq;
        self.sample_rate = sample_rate;
        self.bandwidth = bandwidth;
        self.reset();
    }

    pub fn reset(&mut self) {
        self.z1 = 0.0;
        self.z2 = 0.0;
    }

    #[inline]
    pub fn center_freq(&self) -> f64 {
        self.center_freq
    }

    #[inline]
    pub fn bandwidth(&self) -> f64 {
        self.bandwidth
    }

    #[inline]
    pub fn sample_rate(&self) -> f64 {
        self.sample_rate
    }

    /// Returns `(a0, b1, b2)`.
    #[inline]
    pub fn coefficients(&self) -> (f64, f64, f64) {
        (self.a0, self.b1, self.b2)
    }

    #[inline]
    pub fn process(&mut self, sample: f64) -> f64 {
        let output = flush_denormal(self.a0 * sample + self.b1 * self.z1 + self.b2 * self.z2);
        self.z2 = self.z1;
        self.z1 = output;
        output
    }
}

impl Scanner<f64> for ToneResonator {
    type Output = f64;

    #[inline]
    fn scan(&mut self, sample: f64) -> Self::Output {
        self.process(sample)
    }
}
