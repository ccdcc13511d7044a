use crate::{
    modem::sstv::{
        LEADER_CONFIRM_TIME,
        MIN_LEADER_TIME,
        START_BIT_CHECK_TIME,
        SenseLevels,
        ToneEnvelopes,
        VIS_BIT_TIME,
        VisCode,
        state::{
            SyncState,
            VisAccumulator,
        },
    },
    scan::Scanner,
};

/// Durations used by the [`SyncDecoder`], in samples.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct SyncTiming {
    pub leader_confirm: usize,
    pub min_leader: usize,
    pub start_bit_check: usize,
    pub start_bit: usize,
    pub bit: usize,
    /// Delay from the end of the start bit to the first bit decision. Half a
    /// bit, so that decisions happen late in each bit when the envelopes have
    /// settled.
    pub first_decision: usize,
}

impl SyncTiming {
    pub fn new(sample_rate: f64) -> Self {
        let samples = |time: f64| ((time * sample_rate) as usize).max(1);
        Self {
            leader_confirm: samples(LEADER_CONFIRM_TIME),
            min_leader: samples(MIN_LEADER_TIME),
            start_bit_check: samples(START_BIT_CHECK_TIME),
            start_bit: samples(VIS_BIT_TIME),
            bit: samples(VIS_BIT_TIME),
            first_decision: samples(0.5 * VIS_BIT_TIME),
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub enum SyncEvent {
    LeaderDetected,
    StartBitDetected,
    VisDecoded(VisCode),
    /// The decoder went back to idle.
    Reset(ResetReason),
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub enum ResetReason {
    /// Mark and space could not be told apart.
    Discrimination {
        bit_index: u8,
        mark: f64,
        space: f64,
        leader: f64,
    },
    /// All 8 bits received, but the parity bit doesn't match.
    Parity { data: u8 },
}

/// VIS header state machine over tone envelopes.
///
/// Discrimination and parity failures are not errors: the decoder emits
/// [`SyncEvent::Reset`] and starts listening for a leader again. There are no
/// timeouts.
#[derive(Clone, Debug)]
pub struct SyncDecoder {
    timing: SyncTiming,
    levels: SenseLevels,
    state: SyncState,
    samples_consumed: u64,
}

impl SyncDecoder {
    pub fn new(sample_rate: f64, levels: SenseLevels) -> Self {
        Self::with_timing(SyncTiming::new(sample_rate), levels)
    }

    pub fn with_timing(timing: SyncTiming, levels: SenseLevels) -> Self {
        Self {
            timing,
            levels,
            state: SyncState::default(),
            samples_consumed: 0,
        }
    }

    #[inline]
    pub fn state(&self) -> &SyncState {
        &self.state
    }

    #[inline]
    pub fn timing(&self) -> &SyncTiming {
        &self.timing
    }

    #[inline]
    pub fn levels(&self) -> &SenseLevels {
        &self.levels
    }

    pub fn set_levels(&mut self, levels: SenseLevels) {
        self.levels = levels;
    }

    #[inline]
    pub fn samples_consumed(&self) -> u64 {
        self.samples_consumed
    }

    /// Back to idle, dropping any partially received code.
    pub fn reset(&mut self) {
        tracing::debug!(t = self.samples_consumed, from = self.state.name(), "reset");
        self.state = SyncState::default();
    }

    pub fn process(&mut self, envelopes: &ToneEnvelopes) -> Option<SyncEvent> {
        let levels = self.levels;
        let timing = self.timing;
        let t = self.samples_consumed;
        self.samples_consumed += 1;

        let leader_dominant = envelopes.leader > levels.s_lvl
            && envelopes.leader - envelopes.sync >= levels.s_lvl;
        let sync_dominant =
            envelopes.sync > levels.s_lvl && envelopes.sync - envelopes.leader >= levels.s_lvl;

        let (next_state, event) = match self.state {
            SyncState::Idle { run } => {
                let run = if leader_dominant { run + 1 } else { 0 };
                if run >= timing.leader_confirm {
                    (
                        SyncState::LeaderDetect { leader: run },
                        Some(SyncEvent::LeaderDetected),
                    )
                }
                else {
                    (SyncState::Idle { run }, None)
                }
            }
            SyncState::LeaderDetect { leader } => {
                let leader = leader + usize::from(leader_dominant);
                if sync_dominant && leader >= timing.min_leader {
                    (
                        SyncState::StartBitValidate {
                            elapsed: 0,
                            peak_sync: 0.0,
                            leader,
                        },
                        Some(SyncEvent::StartBitDetected),
                    )
                }
                else {
                    (SyncState::LeaderDetect { leader }, None)
                }
            }
            SyncState::StartBitValidate {
                elapsed,
                peak_sync,
                leader,
            } => {
                let elapsed = elapsed + 1;
                let peak_sync = peak_sync.max(envelopes.sync);

                if elapsed <= timing.start_bit_check && !sync_dominant {
                    tracing::debug!(t, elapsed, "sync too short for a start bit");
                    (SyncState::LeaderDetect { leader }, None)
                }
                else if elapsed == timing.start_bit_check && peak_sync < levels.s_lvl3 {
                    tracing::debug!(t, peak_sync, "start bit too weak");
                    (SyncState::LeaderDetect { leader }, None)
                }
                else if elapsed >= timing.start_bit {
                    (
                        SyncState::VisDecoding(VisAccumulator::new(timing.first_decision)),
                        None,
                    )
                }
                else {
                    (
                        SyncState::StartBitValidate {
                            elapsed,
                            peak_sync,
                            leader,
                        },
                        None,
                    )
                }
            }
            SyncState::VisDecoding(mut accumulator) => {
                accumulator.latch(envelopes);
                accumulator.remaining = accumulator.remaining.saturating_sub(1);
                if accumulator.remaining > 0 {
                    (SyncState::VisDecoding(accumulator), None)
                }
                else {
                    self.decide_bit(t, accumulator)
                }
            }
            SyncState::DataWait { vis } => (SyncState::DataWait { vis }, None),
        };

        if std::mem::discriminant(&next_state) != std::mem::discriminant(&self.state) {
            tracing::debug!(t, from = self.state.name(), to = next_state.name(), "sync state");
        }
        self.state = next_state;

        event
    }

    fn decide_bit(
        &self,
        t: u64,
        mut accumulator: VisAccumulator,
    ) -> (SyncState, Option<SyncEvent>) {
        if accumulator.is_ambiguous(self.levels.s_lvl2) {
            let reason = ResetReason::Discrimination {
                bit_index: accumulator.bits_received,
                mark: accumulator.mark_energy,
                space: accumulator.space_energy,
                leader: accumulator.leader_energy,
            };
            tracing::debug!(t, ?reason, "vis bit ambiguous");
            return (SyncState::default(), Some(SyncEvent::Reset(reason)));
        }

        let bit = accumulator.bit();
        tracing::debug!(
            t,
            index = accumulator.bits_received,
            bit,
            mark = accumulator.mark_energy,
            space = accumulator.space_energy,
            "vis bit"
        );
        accumulator.push_bit(bit);

        if !accumulator.is_complete() {
            accumulator.remaining = self.timing.bit;
            return (SyncState::VisDecoding(accumulator), None);
        }

        match accumulator.vis_code() {
            Some(vis) => {
                tracing::info!(t, vis = vis.get(), "vis code decoded");
                (
                    SyncState::DataWait { vis },
                    Some(SyncEvent::VisDecoded(vis)),
                )
            }
            None => {
                let reason = ResetReason::Parity {
                    data: accumulator.data,
                };
                tracing::debug!(t, ?reason, "vis parity mismatch");
                (SyncState::default(), Some(SyncEvent::Reset(reason)))
            }
        }
    }
}

impl Scanner<ToneEnvelopes> for SyncDecoder {
    type Output = Option<SyncEvent>;

    #[inline]
    fn scan(&mut self, envelopes: ToneEnvelopes) -> Self::Output {
        self.process(&envelopes)
    }
}
