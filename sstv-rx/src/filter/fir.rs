use crate::{
    filter::design::{
        FilterError,
        TapSet,
    },
    scan::Scanner,
};

/// Streaming FIR filter over a doubled ring buffer.
///
/// Every sample is written twice, `taps.len()` apart, so the most recent
/// `taps.len()` samples are always contiguous and the convolution never has to
/// wrap.
#[derive(Clone, derive_more::Debug)]
pub struct CircularFirFilter {
    taps: TapSet,
    #[debug(skip)]
    buffer: Vec<f64>,
    write_index: usize,
}

impl CircularFirFilter {
    pub fn new(taps: TapSet) -> Self {
        let buffer = vec![0.0; 2 * taps.len()];
        Self {
            taps,
            buffer,
            write_index: 0,
        }
    }

    #[inline]
    pub fn taps(&self) -> &TapSet {
        &self.taps
    }

    /// Replaces the taps, keeping the delay line.
    pub fn set_taps(&mut self, taps: TapSet) -> Result<(), FilterError> {
        if taps.len() != self.taps.len() {
            return Err(FilterError::TapCountMismatch {
                expected: self.taps.len(),
                actual: taps.len(),
            });
        }
        self.taps = taps;
        Ok(())
    }

    pub fn reset(&mut self) {
        self.buffer.fill(0.0);
        self.write_index = 0;
    }

    pub fn process(&mut self, sample: f64) -> f64 {
        let length = self.taps.len();
        debug_assert_eq!(self.buffer.len(), 2 * length);

        self.buffer[self.write_index] = sample;
        self.buffer[self.write_index + length] = sample;

        // newest sample is at write_index + length, pairs with taps[0]
        let window = &self.buffer[self.write_index + 1..=self.write_index + length];
        let output: f64 = window
            .iter()
            .rev()
            .zip(self.taps.iter())
            .map(|(sample, tap)| sample * tap)
            .sum();

        self.write_index = (self.write_index + 1) % length;

        output
    }
}

impl Scanner<f64> for CircularFirFilter {
    type Output = f64;

    #[inline]
    fn scan(&mut self, sample: f64) -> Self::Output {
        self.process(sample)
    }
}
