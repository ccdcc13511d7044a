//! Tone envelope extraction.

use std::sync::Arc;

use crate::{
    filter::{
        CascadedBiquadFilter,
        FilterError,
        ToneResonator,
        design::iir::{
            IirDesign,
            design_iir,
        },
    },
    modem::sstv::{
        ALT_VIS_MARK_TONE,
        ALT_VIS_SPACE_TONE,
        ENVELOPE_CUTOFF,
        LEADER_BANDWIDTH,
        LEADER_TONE,
        SYNC_BANDWIDTH,
        SYNC_TONE,
        ToneConvention,
        VIS_BANDWIDTH,
        VIS_MARK_TONE,
        VIS_SPACE_TONE,
    },
    scan::{
        Chain,
        FuncScanner,
        Scanner,
        ScannerExt,
    },
};

type Rectifier = FuncScanner<fn(f64) -> f64>;

/// Resonator, rectifier and smoothing low-pass for one tone.
#[derive(Clone, Debug)]
pub struct ToneDetector {
    chain: Chain<Chain<ToneResonator, Rectifier>, CascadedBiquadFilter>,
}

impl ToneDetector {
    pub fn new(
        frequency: f64,
        sample_rate: f64,
        bandwidth: f64,
        envelope: Arc<IirDesign>,
    ) -> Self {
        let rectify: fn(f64) -> f64 = f64::abs;
        let chain = ToneResonator::new(frequency, sample_rate, bandwidth)
            .map(rectify)
            .chain(CascadedBiquadFilter::new(envelope));
        Self { chain }
    }

    #[inline]
    pub fn resonator(&self) -> &ToneResonator {
        self.chain.head().head()
    }

    #[inline]
    pub fn frequency(&self) -> f64 {
        self.resonator().center_freq()
    }

    /// Retunes the resonator and clears the envelope.
    pub fn set_freq(&mut self, frequency: f64, bandwidth: f64) {
        let resonator = self.chain.head_mut().head_mut();
        let sample_rate = resonator.sample_rate();
        resonator.set_freq(frequency, sample_rate, bandwidth);
        self.chain.tail_mut().reset();
    }

    pub fn reset(&mut self) {
        self.chain.head_mut().head_mut().reset();
        self.chain.tail_mut().reset();
    }

    /// Envelope of the tone, never negative.
    #[inline]
    pub fn process(&mut self, sample: f64) -> f64 {
        self.chain.scan(sample).max(0.0)
    }
}

impl Scanner<f64> for ToneDetector {
    type Output = f64;

    #[inline]
    fn scan(&mut self, sample: f64) -> Self::Output {
        self.process(sample)
    }
}

#[derive(Clone, Debug)]
pub struct TonePair {
    pub mark: ToneDetector,
    pub space: ToneDetector,
}

impl TonePair {
    fn new(mark: f64, space: f64, sample_rate: f64, envelope: &Arc<IirDesign>) -> Self {
        Self {
            mark: ToneDetector::new(mark, sample_rate, VIS_BANDWIDTH, envelope.clone()),
            space: ToneDetector::new(space, sample_rate, VIS_BANDWIDTH, envelope.clone()),
        }
    }

    fn set_tones(&mut self, mark: f64, space: f64) {
        self.mark.set_freq(mark, VIS_BANDWIDTH);
        self.space.set_freq(space, VIS_BANDWIDTH);
    }

    fn reset(&mut self) {
        self.mark.reset();
        self.space.reset();
    }

    #[inline]
    fn process(&mut self, sample: f64) -> (f64, f64) {
        (self.mark.process(sample), self.space.process(sample))
    }
}

/// Envelopes of the control tones for one sample. All values are
/// non-negative.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct ToneEnvelopes {
    pub leader: f64,
    pub sync: f64,
    pub mark: f64,
    pub space: f64,
}

/// All tone detectors of the receiver.
///
/// With [`ToneConvention::Auto`] both built-in mark/space pairs run and each
/// sample reports the pair with the larger total energy.
#[derive(Clone, Debug)]
pub struct ToneBank {
    leader: ToneDetector,
    sync: ToneDetector,
    primary: TonePair,
    secondary: Option<TonePair>,
    convention: ToneConvention,
    selected: ToneConvention,
    envelope: Arc<IirDesign>,
    sample_rate: f64,
}

impl ToneBank {
    pub fn new(sample_rate: f64, convention: ToneConvention) -> Result<Self, FilterError> {
        let envelope = Arc::new(design_iir(ENVELOPE_CUTOFF, sample_rate, 2, None)?);

        let mut bank = Self {
            leader: ToneDetector::new(LEADER_TONE, sample_rate, LEADER_BANDWIDTH, envelope.clone()),
            sync: ToneDetector::new(SYNC_TONE, sample_rate, SYNC_BANDWIDTH, envelope.clone()),
            primary: TonePair::new(VIS_MARK_TONE, VIS_SPACE_TONE, sample_rate, &envelope),
            secondary: None,
            convention,
            selected: ToneConvention::Standard,
            envelope,
            sample_rate,
        };
        bank.set_convention(convention);
        Ok(bank)
    }

    #[inline]
    pub fn convention(&self) -> ToneConvention {
        self.convention
    }

    /// Pair the last envelopes came from. Never [`ToneConvention::Auto`].
    #[inline]
    pub fn selected(&self) -> ToneConvention {
        self.selected
    }

    pub fn set_convention(&mut self, convention: ToneConvention) {
        match convention.tones() {
            Some((mark, space)) => {
                self.primary.set_tones(mark, space);
                self.secondary = None;
                self.selected = convention;
            }
            None => {
                self.primary.set_tones(VIS_MARK_TONE, VIS_SPACE_TONE);
                self.secondary = Some(TonePair::new(
                    ALT_VIS_MARK_TONE,
                    ALT_VIS_SPACE_TONE,
                    self.sample_rate,
                    &self.envelope,
                ));
                self.selected = ToneConvention::Standard;
            }
        }
        self.convention = convention;
        tracing::debug!(?convention, "vis tones");
    }

    pub fn reset(&mut self) {
        self.leader.reset();
        self.sync.reset();
        self.primary.reset();
        if let Some(secondary) = &mut self.secondary {
            secondary.reset();
        }
    }

    pub fn process(&mut self, sample: f64) -> ToneEnvelopes {
        let leader = self.leader.process(sample);
        let sync = self.sync.process(sample);
        let (mut mark, mut space) = self.primary.process(sample);

        if let Some(secondary) = &mut self.secondary {
            let (alt_mark, alt_space) = secondary.process(sample);
            if alt_mark + alt_space > mark + space {
                mark = alt_mark;
                space = alt_space;
                self.selected = ToneConvention::Alternate;
            }
            else {
                self.selected = ToneConvention::Standard;
            }
        }

        ToneEnvelopes {
            leader,
            sync,
            mark,
            space,
        }
    }
}

impl Scanner<f64> for ToneBank {
    type Output = ToneEnvelopes;

    #[inline]
    fn scan(&mut self, sample: f64) -> Self::Output {
        self.process(sample)
    }
}

#[cfg(test)]
mod tests {
    use crate::{
        modem::sstv::{
            ToneBank,
            ToneConvention,
            ToneEnvelopes,
        },
        source::sine,
    };

    fn settled(bank: &mut ToneBank, frequency: f64, sample_rate: f64) -> ToneEnvelopes {
        let mut envelopes = ToneEnvelopes::default();
        for x in sine(frequency, sample_rate).take((0.2 * sample_rate) as usize) {
            envelopes = bank.process(16384.0 * x);
        }
        envelopes
    }

    #[test]
    fn each_tone_dominates_its_own_envelope() {
        let sample_rate = 11025.0;
        let mut bank = ToneBank::new(sample_rate, ToneConvention::Standard).unwrap();

        let leader = settled(&mut bank, 1900.0, sample_rate);
        assert!(leader.leader > 3.0 * leader.sync.max(leader.mark).max(leader.space));

        let sync = settled(&mut bank, 1200.0, sample_rate);
        assert!(sync.sync > 3.0 * sync.leader);

        let mark = settled(&mut bank, 1100.0, sample_rate);
        assert!(mark.mark > 3.0 * mark.space);

        let space = settled(&mut bank, 1300.0, sample_rate);
        assert!(space.space > 3.0 * space.mark);
    }

    #[test]
    fn auto_selects_the_stronger_pair() {
        let sample_rate = 11025.0;
        let mut bank = ToneBank::new(sample_rate, ToneConvention::Auto).unwrap();

        settled(&mut bank, 1320.0, sample_rate);
        assert_eq!(bank.selected(), ToneConvention::Alternate);

        settled(&mut bank, 1100.0, sample_rate);
        assert_eq!(bank.selected(), ToneConvention::Standard);
    }

    #[test]
    fn envelopes_are_never_negative() {
        let sample_rate = 8000.0;
        let mut bank = ToneBank::new(sample_rate, ToneConvention::Auto).unwrap();
        let burst = sine(1200.0, sample_rate)
            .take(400)
            .map(|x| 20000.0 * x)
            .chain(std::iter::repeat_n(0.0, 4000));
        for x in burst {
            let envelopes = bank.process(x);
            assert!(envelopes.leader >= 0.0);
            assert!(envelopes.sync >= 0.0);
            assert!(envelopes.mark >= 0.0);
            assert!(envelopes.space >= 0.0);
        }
    }

    #[test]
    fn custom_tones_retune_the_primary_pair() {
        let sample_rate = 11025.0;
        let mut bank = ToneBank::new(sample_rate, ToneConvention::Auto).unwrap();
        bank.set_convention(ToneConvention::Custom {
            mark: 1500.0,
            space: 1700.0,
        });
        let envelopes = settled(&mut bank, 1500.0, sample_rate);
        assert!(envelopes.mark > 3.0 * envelopes.space);
        assert_eq!(
            bank.selected(),
            ToneConvention::Custom {
                mark: 1500.0,
                space: 1700.0
            }
        );
    }
}
