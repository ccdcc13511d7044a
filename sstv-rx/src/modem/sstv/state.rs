use crate::modem::sstv::{
    ToneEnvelopes,
    VisCode,
};

/// State of the [`SyncDecoder`](super::SyncDecoder). Counters are in samples.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum SyncState {
    /// Waiting for leader tone. `run` counts consecutive samples in which the
    /// leader dominates.
    Idle { run: usize },
    /// Leader confirmed, waiting for the start bit.
    LeaderDetect { leader: usize },
    /// Sync tone seen after enough leader. Checks that it lasts long enough to
    /// be the start bit and not the break.
    StartBitValidate {
        elapsed: usize,
        peak_sync: f64,
        leader: usize,
    },
    VisDecoding(VisAccumulator),
    /// VIS code received. Stays here until reset.
    DataWait { vis: VisCode },
}

impl Default for SyncState {
    fn default() -> Self {
        Self::Idle { run: 0 }
    }
}

impl SyncState {
    pub fn name(&self) -> &'static str {
        match self {
            Self::Idle { .. } => "idle",
            Self::LeaderDetect { .. } => "leader-detect",
            Self::StartBitValidate { .. } => "start-bit-validate",
            Self::VisDecoding(_) => "vis-decoding",
            Self::DataWait { .. } => "data-wait",
        }
    }

    #[inline]
    pub fn is_idle(&self) -> bool {
        matches!(self, Self::Idle { .. })
    }

    #[inline]
    pub fn vis_code(&self) -> Option<VisCode> {
        match self {
            Self::DataWait { vis } => Some(*vis),
            _ => None,
        }
    }
}

/// Bits received so far plus the envelopes seen at the last sample.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct VisAccumulator {
    pub bits_received: u8,
    /// LSB first, parity in bit 7.
    pub data: u8,
    pub leader_energy: f64,
    pub mark_energy: f64,
    pub space_energy: f64,
    pub sync_energy: f64,
    /// Samples until the next bit decision.
    pub remaining: usize,
}

impl VisAccumulator {
    pub const NUM_BITS: u8 = 8;

    pub fn new(first_decision: usize) -> Self {
        Self {
            remaining: first_decision,
            ..Default::default()
        }
    }

    #[inline]
    pub fn latch(&mut self, envelopes: &ToneEnvelopes) {
        self.leader_energy = envelopes.leader;
        self.mark_energy = envelopes.mark;
        self.space_energy = envelopes.space;
        self.sync_energy = envelopes.sync;
    }

    /// Neither VIS tone beats the leader, or mark and space are too close to
    /// tell apart.
    pub fn is_ambiguous(&self, min_separation: f64) -> bool {
        (self.mark_energy < self.leader_energy && self.space_energy < self.leader_energy)
            || (self.mark_energy - self.space_energy).abs() < min_separation
    }

    #[inline]
    pub fn bit(&self) -> bool {
        self.mark_energy > self.space_energy
    }

    pub fn push_bit(&mut self, bit: bool) {
        debug_assert!(self.bits_received < Self::NUM_BITS);
        self.data |= u8::from(bit) << self.bits_received;
        self.bits_received += 1;
    }

    #[inline]
    pub fn is_complete(&self) -> bool {
        self.bits_received == Self::NUM_BITS
    }

    /// The 7 data bits with matching parity, once complete.
    pub fn vis_code(&self) -> Option<VisCode> {
        if self.is_complete() {
            VisCode::from_byte(self.data)
        }
        else {
            None
        }
    }
}
