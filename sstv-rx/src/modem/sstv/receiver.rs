use crate::{
    agc::LevelAgc,
    filter::{
        CircularFirFilter,
        FilterError,
        FilterSpec,
        TapSet,
        design_fir,
    },
    modem::sstv::{
        ACQUISITION_BAND,
        BAND_ATTENUATION,
        CLIP_LEVEL,
        FULL_SCALE,
        LOCKED_BAND,
        ReceiverConfig,
        Sensitivity,
        SyncDecoder,
        SyncEvent,
        SyncState,
        ToneBank,
        ToneConvention,
        ToneEnvelopes,
        VisCode,
        band_tap_count,
    },
    scan::Scanner,
};

#[derive(Clone, Debug, PartialEq, thiserror::Error)]
pub enum ReceiverError {
    #[error("invalid sample rate: {sample_rate}")]
    InvalidSampleRate { sample_rate: f64 },
    #[error("invalid vis tone: {frequency} Hz")]
    InvalidTone { frequency: f64 },
    #[error("filter design failed")]
    Filter(#[from] FilterError),
}

/// Signal at each stage of the receive chain for the last sample.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct StageTaps {
    /// Input after scaling and clipping.
    pub input: f64,
    pub prefiltered: f64,
    pub band_limited: f64,
    pub normalized: f64,
}

/// Complete receive chain for one audio stream.
///
/// Samples are clipped, averaged with their predecessor, band-limited,
/// normalized by the AGC, turned into tone envelopes and fed to the
/// [`SyncDecoder`]. Internally everything runs on a 16-bit scale.
#[derive(Clone, Debug)]
pub struct SstvReceiver {
    config: ReceiverConfig,
    previous: f64,
    band_limit: CircularFirFilter,
    acquisition_taps: TapSet,
    locked_taps: TapSet,
    locked: bool,
    agc: LevelAgc,
    tones: ToneBank,
    decoder: SyncDecoder,
    overflow: bool,
    stage_taps: StageTaps,
    envelopes: ToneEnvelopes,
}

impl SstvReceiver {
    pub fn new(config: ReceiverConfig) -> Result<Self, ReceiverError> {
        let sample_rate = config.sample_rate;
        if !(sample_rate.is_finite() && sample_rate > 0.0) {
            return Err(ReceiverError::InvalidSampleRate { sample_rate });
        }
        check_tones(config.tone_convention, sample_rate)?;

        let tap_count = band_tap_count(sample_rate);
        let band = |(low, high): (f64, f64)| {
            design_fir(
                &FilterSpec::bandpass(sample_rate, low, high, tap_count)
                    .with_attenuation(BAND_ATTENUATION),
            )
        };
        let acquisition_taps = band(ACQUISITION_BAND)?;
        let locked_taps = band(LOCKED_BAND)?;

        let tones = ToneBank::new(sample_rate, config.tone_convention)?;
        let decoder = SyncDecoder::new(sample_rate, config.levels());

        tracing::debug!(
            sample_rate,
            tap_count,
            sensitivity = ?config.sensitivity,
            tone_convention = ?config.tone_convention,
            "sstv receiver"
        );

        Ok(Self {
            config,
            previous: 0.0,
            band_limit: CircularFirFilter::new(acquisition_taps.clone()),
            acquisition_taps,
            locked_taps,
            locked: false,
            agc: LevelAgc::new(sample_rate),
            tones,
            decoder,
            overflow: false,
            stage_taps: StageTaps::default(),
            envelopes: ToneEnvelopes::default(),
        })
    }

    #[inline]
    pub fn config(&self) -> &ReceiverConfig {
        &self.config
    }

    #[inline]
    pub fn sample_rate(&self) -> f64 {
        self.config.sample_rate
    }

    #[inline]
    pub fn state(&self) -> &SyncState {
        self.decoder.state()
    }

    /// VIS code of the current transmission, once decoded.
    #[inline]
    pub fn vis_code(&self) -> Option<VisCode> {
        self.decoder.state().vis_code()
    }

    #[inline]
    pub fn envelopes(&self) -> &ToneEnvelopes {
        &self.envelopes
    }

    #[inline]
    pub fn stage_taps(&self) -> &StageTaps {
        &self.stage_taps
    }

    #[inline]
    pub fn gain(&self) -> f64 {
        self.agc.gain()
    }

    /// Mark/space pair currently reported to the decoder.
    #[inline]
    pub fn selected_tones(&self) -> ToneConvention {
        self.tones.selected()
    }

    /// Whether the band-limit runs on the post-lock profile.
    #[inline]
    pub fn is_locked(&self) -> bool {
        self.locked
    }

    /// Whether any input was clipped since the flag was last taken.
    #[inline]
    pub fn overflow(&self) -> bool {
        self.overflow
    }

    pub fn take_overflow(&mut self) -> bool {
        std::mem::take(&mut self.overflow)
    }

    pub fn set_sensitivity(&mut self, sensitivity: Sensitivity) {
        self.config.sensitivity = sensitivity;
        self.config.sense_levels = None;
        self.decoder.set_levels(sensitivity.levels());
    }

    pub fn set_tone_convention(&mut self, convention: ToneConvention) -> Result<(), ReceiverError> {
        check_tones(convention, self.config.sample_rate)?;
        self.config.tone_convention = convention;
        self.tones.set_convention(convention);
        Ok(())
    }

    /// Starts listening for the next transmission.
    pub fn reset(&mut self) {
        self.decoder.reset();
        self.switch_band(false);
    }

    /// Feeds a sample on the 16-bit scale.
    pub fn feed(&mut self, sample: f64) -> Option<SyncEvent> {
        let sample = if sample.is_finite() { sample } else { 0.0 };
        let input = sample.clamp(-CLIP_LEVEL, CLIP_LEVEL);
        if input != sample {
            if !self.overflow {
                tracing::warn!(sample, "input clipped");
            }
            self.overflow = true;
        }

        let prefiltered = 0.5 * (input + self.previous);
        self.previous = input;

        let band_limited = self.band_limit.process(prefiltered);
        let normalized = self.agc.process(band_limited);
        self.envelopes = self.tones.process(normalized);
        self.stage_taps = StageTaps {
            input,
            prefiltered,
            band_limited,
            normalized,
        };

        let event = self.decoder.process(&self.envelopes);
        if let Some(SyncEvent::VisDecoded(_)) = event {
            self.switch_band(true);
        }
        event
    }

    #[inline]
    pub fn feed_i16(&mut self, sample: i16) -> Option<SyncEvent> {
        self.feed(f64::from(sample))
    }

    /// Feeds a sample with full scale at ±1.0.
    #[inline]
    pub fn feed_f32(&mut self, sample: f32) -> Option<SyncEvent> {
        self.feed(f64::from(sample) * FULL_SCALE)
    }

    /// Feeds a block of samples with full scale at ±1.0 and returns the
    /// events it produced.
    pub fn feed_block(&mut self, samples: &[f32]) -> Vec<SyncEvent> {
        samples
            .iter()
            .filter_map(|sample| self.feed_f32(*sample))
            .collect()
    }

    fn switch_band(&mut self, locked: bool) {
        if self.is_locked() == locked {
            return;
        }
        let taps = if locked {
            self.locked_taps.clone()
        }
        else {
            self.acquisition_taps.clone()
        };
        match self.band_limit.set_taps(taps) {
            Ok(()) => {
                self.locked = locked;
                tracing::debug!(locked, "band-limit switched");
            }
            Err(error) => tracing::warn!(%error, "band-limit switch failed"),
        }
    }
}

impl Scanner<f64> for SstvReceiver {
    type Output = Option<SyncEvent>;

    #[inline]
    fn scan(&mut self, sample: f64) -> Self::Output {
        self.feed(sample)
    }
}

fn check_tones(convention: ToneConvention, sample_rate: f64) -> Result<(), ReceiverError> {
    if let ToneConvention::Custom { mark, space } = convention {
        for frequency in [mark, space] {
            if !(frequency > 0.0 && frequency < 0.5 * sample_rate) {
                return Err(ReceiverError::InvalidTone { frequency });
            }
        }
    }
    Ok(())
}
