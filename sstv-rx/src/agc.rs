//! Peak-tracking automatic gain control.

use crate::scan::Scanner;

/// Normalizes the signal so that its peak sits at a target level.
///
/// The peak is tracked over a fixed window. At the end of each window the gain
/// is set to `target_level / peak`. Peaks at or below `threshold` get the floor
/// gain `target_level / threshold`, so near-silence is never amplified without
/// bound. This does not improve the signal-to-noise ratio.
#[derive(Clone, Copy, Debug)]
pub struct LevelAgc {
    target_level: f64,
    threshold: f64,
    window_samples: usize,
    sample_counter: usize,
    current_peak: f64,
    last_peak: f64,
    gain: f64,
}

impl LevelAgc {
    pub const DEFAULT_TARGET_LEVEL: f64 = 16384.0;
    pub const DEFAULT_THRESHOLD: f64 = 32.0;
    pub const DEFAULT_WINDOW_TIME: f64 = 0.100;

    pub fn new(sample_rate: f64) -> Self {
        Self::with_params(
            Self::DEFAULT_TARGET_LEVEL,
            Self::DEFAULT_THRESHOLD,
            (Self::DEFAULT_WINDOW_TIME * sample_rate) as usize,
        )
    }

    /// # Panics
    ///
    /// Panics if `target_level` or `threshold` are not positive.
    pub fn with_params(target_level: f64, threshold: f64, window_samples: usize) -> Self {
        assert!(target_level > 0.0, "target level must be positive");
        assert!(threshold > 0.0, "threshold must be positive");
        Self {
            target_level,
            threshold,
            window_samples: window_samples.max(1),
            sample_counter: 0,
            current_peak: 0.0,
            last_peak: 0.0,
            gain: 1.0,
        }
    }

    #[inline]
    pub fn gain(&self) -> f64 {
        self.gain
    }

    /// Peak of the window in progress.
    #[inline]
    pub fn peak(&self) -> f64 {
        self.current_peak
    }

    /// Peak of the last completed window.
    #[inline]
    pub fn last_peak(&self) -> f64 {
        self.last_peak
    }

    #[inline]
    pub fn window_samples(&self) -> usize {
        self.window_samples
    }

    #[inline]
    pub fn target_level(&self) -> f64 {
        self.target_level
    }

    #[inline]
    pub fn track(&mut self, sample: f64) {
        let magnitude = sample.abs();
        if magnitude > self.current_peak {
            self.current_peak = magnitude;
        }
        self.sample_counter += 1;
    }

    #[inline]
    pub fn window_complete(&self) -> bool {
        self.sample_counter >= self.window_samples
    }

    pub fn update_gain(&mut self) {
        self.gain = if self.current_peak > self.threshold {
            self.target_level / self.current_peak
        }
        else {
            self.target_level / self.threshold
        };
        tracing::trace!(peak = self.current_peak, gain = self.gain, "agc update");

        self.last_peak = self.current_peak;
        self.current_peak = 0.0;
        self.sample_counter = 0;
    }

    #[inline]
    pub fn apply(&self, sample: f64) -> f64 {
        sample * self.gain
    }

    /// Tracks the sample, updates the gain if the window is complete and
    /// returns the scaled sample.
    pub fn process(&mut self, sample: f64) -> f64 {
        self.track(sample);
        if self.window_complete() {
            self.update_gain();
        }
        self.apply(sample)
    }

    pub fn reset(&mut self) {
        self.sample_counter = 0;
        self.current_peak = 0.0;
        self.last_peak = 0.0;
        self.gain = 1.0;
    }
}

impl Scanner<f64> for LevelAgc {
    type Output = f64;

    #[inline]
    fn scan(&mut self, sample: f64) -> Self::Output {
        self.process(sample)
    }
}
