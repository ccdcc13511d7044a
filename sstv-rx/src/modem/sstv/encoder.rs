use crate::{
    modem::sstv::{
        LEADER_BREAK_TIME,
        LEADER_TIME,
        LEADER_TONE,
        SYNC_TONE,
        VIS_BIT_TIME,
        VIS_MARK_TONE,
        VIS_SPACE_TONE,
        VisCode,
    },
    source::SineWave,
};

const NUM_SEGMENTS: usize = 13;
const FIRST_BIT_SEGMENT: usize = 4;

/// Generates the VIS header of a transmission as `f32` audio in `[-1, 1]`.
///
/// The tones are phase-continuous. Besides well-formed headers this can
/// produce broken ones (wrong parity, ambiguous bits) to exercise the
/// receiver.
#[derive(Clone, Debug)]
pub struct VisEncoder {
    byte: u8,
    mark: f64,
    space: f64,
    bit_overrides: [Option<f64>; 8],
    amplitude: f64,
    sample_rate: f64,
    oscillator: SineWave,
    segment: usize,
    remaining: usize,
}

impl VisEncoder {
    pub const DEFAULT_AMPLITUDE: f64 = 0.5;

    pub fn new(vis: VisCode, sample_rate: f64) -> Self {
        Self {
            byte: vis.to_byte(),
            mark: VIS_MARK_TONE,
            space: VIS_SPACE_TONE,
            bit_overrides: [None; 8],
            amplitude: Self::DEFAULT_AMPLITUDE,
            sample_rate,
            oscillator: SineWave::new(LEADER_TONE, sample_rate),
            segment: 0,
            remaining: 0,
        }
    }

    pub fn with_tones(mut self, mark: f64, space: f64) -> Self {
        self.mark = mark;
        self.space = space;
        self
    }

    pub fn with_amplitude(mut self, amplitude: f64) -> Self {
        self.amplitude = amplitude;
        self
    }

    /// Sends `byte` as is, parity bit included.
    pub fn with_raw_byte(mut self, byte: u8) -> Self {
        self.byte = byte;
        self
    }

    /// Sends `frequency` in the slot of bit `index` instead of mark or space.
    ///
    /// # Panics
    ///
    /// Panics if `index` is not below 8.
    pub fn with_bit_override(mut self, index: usize, frequency: f64) -> Self {
        self.bit_overrides[index] = Some(frequency);
        self
    }

    /// Number of samples the whole header takes.
    pub fn total_samples(&self) -> usize {
        (0..NUM_SEGMENTS)
            .filter_map(|index| self.segment_at(index))
            .map(|(_, duration)| self.samples(duration))
            .sum()
    }

    /// Offset of the first sample of bit `index`.
    pub fn bit_offset(&self, index: usize) -> usize {
        (0..FIRST_BIT_SEGMENT + index)
            .filter_map(|index| self.segment_at(index))
            .map(|(_, duration)| self.samples(duration))
            .sum()
    }

    fn samples(&self, duration: f64) -> usize {
        (duration * self.sample_rate) as usize
    }

    /// `(frequency, duration)` of a header segment.
    fn segment_at(&self, index: usize) -> Option<(f64, f64)> {
        match index {
            0 | 2 => Some((LEADER_TONE, LEADER_TIME)),
            1 => Some((SYNC_TONE, LEADER_BREAK_TIME)),
            // start and stop bit
            3 | 12 => Some((SYNC_TONE, VIS_BIT_TIME)),
            4..=11 => {
                let bit = index - FIRST_BIT_SEGMENT;
                let frequency = self.bit_overrides[bit].unwrap_or(if self.byte & (1 << bit) != 0 {
                    self.mark
                }
                else {
                    self.space
                });
                Some((frequency, VIS_BIT_TIME))
            }
            _ => None,
        }
    }
}

impl Iterator for VisEncoder {
    type Item = f32;

    fn next(&mut self) -> Option<Self::Item> {
        while self.remaining == 0 {
            let (frequency, duration) = self.segment_at(self.segment)?;
            self.segment += 1;
            self.oscillator.set_frequency(frequency);
            self.remaining = self.samples(duration);
        }

        self.remaining -= 1;
        let sample = self.oscillator.next()?;
        Some((self.amplitude * sample) as f32)
    }
}
