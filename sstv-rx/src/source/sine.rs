use std::f64::consts::TAU;

#[inline]
fn step_from_frequency_and_sample_rate(frequency: f64, sample_rate: f64) -> f64 {
    (TAU * frequency / sample_rate).rem_euclid(TAU)
}

/// Phase-continuous sine oscillator.
///
/// Changing the frequency keeps the phase, so tone sequences built from it
/// have no discontinuities at the tone boundaries.
#[derive(Clone, Copy, Debug)]
pub struct SineWave {
    frequency: f64,
    sample_rate: f64,
    phase: f64,
    step: f64,
}

impl SineWave {
    pub fn new(frequency: f64, sample_rate: f64) -> Self {
        Self {
            frequency,
            sample_rate,
            phase: 0.0,
            step: step_from_frequency_and_sample_rate(frequency, sample_rate),
        }
    }

    #[inline]
    pub fn frequency(&self) -> f64 {
        self.frequency
    }

    pub fn set_frequency(&mut self, frequency: f64) {
        self.frequency = frequency;
        self.step = step_from_frequency_and_sample_rate(frequency, self.sample_rate);
    }
}

impl Iterator for SineWave {
    type Item = f64;

    fn next(&mut self) -> Option<Self::Item> {
        let output = self.phase.sin();
        self.phase += self.step;
        if self.phase > TAU {
            self.phase -= TAU;
        }
        Some(output)
    }
}

#[inline]
pub fn sine(frequency: f64, sample_rate: f64) -> SineWave {
    SineWave::new(frequency, sample_rate)
}

#[cfg(test)]
mod tests {
    use approx::assert_abs_diff_eq;

    use crate::source::sine;

    #[test]
    fn frequency_change_is_phase_continuous() {
        let mut wave = sine(1000.0, 8000.0);
        let before = wave.by_ref().take(3).collect::<Vec<_>>();
        assert_abs_diff_eq!(before[2], 1.0, epsilon = 1e-12);

        wave.set_frequency(2000.0);
        assert_eq!(wave.frequency(), 2000.0);
        // phase continues from 3π/4 in steps of π/2
        let after = wave.take(2).collect::<Vec<_>>();
        assert_abs_diff_eq!(after[0], (0.75 * std::f64::consts::PI).sin(), epsilon = 1e-12);
        assert_abs_diff_eq!(after[1], (1.25 * std::f64::consts::PI).sin(), epsilon = 1e-12);
    }
}
