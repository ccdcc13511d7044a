use sstv_rx::{
    modem::sstv::{
        ALT_VIS_MARK_TONE,
        ALT_VIS_SPACE_TONE,
        LEADER_TONE,
        ReceiverConfig,
        ResetReason,
        Sensitivity,
        SstvReceiver,
        SyncEvent,
        ToneConvention,
        VisCode,
        VisEncoder,
        VIS_MARK_TONE,
        VIS_SPACE_TONE,
    },
    source::white_noise,
};
use tracing_subscriber::EnvFilter;

fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

/// Header with a bit of silence before and after.
fn transmission(encoder: VisEncoder, sample_rate: f64) -> Vec<f32> {
    let silence = |seconds: f64| std::iter::repeat_n(0.0f32, (seconds * sample_rate) as usize);
    silence(0.1).chain(encoder).chain(silence(0.05)).collect()
}

/// Events that end a decoding attempt.
fn outcomes(events: Vec<SyncEvent>) -> Vec<SyncEvent> {
    events
        .into_iter()
        .filter(|event| matches!(event, SyncEvent::VisDecoded(_) | SyncEvent::Reset(_)))
        .collect()
}

fn receive(config: ReceiverConfig, samples: &[f32]) -> (SstvReceiver, Vec<SyncEvent>) {
    let mut receiver = SstvReceiver::new(config).unwrap();
    let events = receiver.feed_block(samples);
    (receiver, outcomes(events))
}

fn codes(step: usize) -> impl Iterator<Item = VisCode> {
    (0..128u8)
        .step_by(step)
        .filter_map(VisCode::new)
}

#[test]
fn every_byte_comes_back() {
    init_tracing();
    let sample_rate = 11025.0;

    for byte in 0..=255u8 {
        let encoder = VisEncoder::new(VisCode::default(), sample_rate).with_raw_byte(byte);
        let (receiver, outcomes) = receive(
            ReceiverConfig::new(sample_rate),
            &transmission(encoder, sample_rate),
        );

        match VisCode::from_byte(byte) {
            Some(vis) => {
                assert_eq!(outcomes, vec![SyncEvent::VisDecoded(vis)], "byte {byte:#04x}");
                assert_eq!(receiver.vis_code(), Some(vis));
                assert_eq!(vis.to_byte(), byte);
            }
            None => {
                assert_eq!(
                    outcomes,
                    vec![SyncEvent::Reset(ResetReason::Parity { data: byte })],
                    "byte {byte:#04x}"
                );
                assert!(receiver.state().is_idle());
            }
        }
    }
}

#[test]
fn it_decodes_at_common_sample_rates() {
    init_tracing();
    for (sample_rate, sensitivity, step) in [
        (8000.0, Sensitivity::Level0, 11),
        (44100.0, Sensitivity::Level1, 13),
        (48000.0, Sensitivity::Level2, 7),
    ] {
        for vis in codes(step) {
            let config = ReceiverConfig::new(sample_rate)
                .with_sensitivity(sensitivity)
                .with_tone_convention(ToneConvention::Standard);
            let (_, outcomes) = receive(
                config,
                &transmission(VisEncoder::new(vis, sample_rate), sample_rate),
            );
            assert_eq!(
                outcomes,
                vec![SyncEvent::VisDecoded(vis)],
                "{sample_rate} Hz, code {vis:?}"
            );
        }
    }
}

#[test]
fn least_sensitive_preset_still_decodes_clean_signal() {
    let sample_rate = 11025.0;
    for vis in codes(3) {
        let config = ReceiverConfig::new(sample_rate).with_sensitivity(Sensitivity::Level3);
        let (_, outcomes) = receive(
            config,
            &transmission(VisEncoder::new(vis, sample_rate), sample_rate),
        );
        assert_eq!(outcomes, vec![SyncEvent::VisDecoded(vis)]);
    }
}

#[test]
fn alternate_tone_pair_is_detected() {
    let sample_rate = 11025.0;
    for convention in [ToneConvention::Auto, ToneConvention::Alternate] {
        for vis in codes(5) {
            let encoder = VisEncoder::new(vis, sample_rate)
                .with_tones(ALT_VIS_MARK_TONE, ALT_VIS_SPACE_TONE);
            let (_, outcomes) = receive(
                ReceiverConfig::new(sample_rate).with_tone_convention(convention),
                &transmission(encoder, sample_rate),
            );
            assert_eq!(
                outcomes,
                vec![SyncEvent::VisDecoded(vis)],
                "{convention:?}, code {vis:?}"
            );
        }
    }
}

#[test]
fn foreign_tone_in_bit_slot_resets() {
    init_tracing();
    for sample_rate in [11025.0, 48000.0] {
        for vis in [0x2c, 0x08, 0x7f, 0x00].into_iter().filter_map(VisCode::new) {
            for bit in [0, 3, 7] {
                // far from both mark and space
                let encoder = VisEncoder::new(vis, sample_rate).with_bit_override(bit, 2300.0);
                let (receiver, outcomes) =
                    receive(ReceiverConfig::new(sample_rate), &transmission(encoder, sample_rate));

                assert_eq!(outcomes.len(), 1, "{outcomes:?}");
                assert!(
                    matches!(
                        outcomes[0],
                        SyncEvent::Reset(ResetReason::Discrimination { bit_index, .. })
                            if usize::from(bit_index) == bit
                    ),
                    "{sample_rate} Hz, code {vis:?}, bit {bit}: {outcomes:?}"
                );
                assert!(receiver.state().is_idle());
            }
        }
    }
}

/// Bisects the tone of one bit slot between mark and space until the
/// receiver can no longer tell which one it is.
fn tie_outcome(vis: VisCode, bit: usize, sample_rate: f64) -> Vec<SyncEvent> {
    let config = ReceiverConfig::new(sample_rate).with_tone_convention(ToneConvention::Standard);
    let (mut mark_side, mut space_side) = (VIS_MARK_TONE, VIS_SPACE_TONE);

    for _ in 0..40 {
        let frequency = 0.5 * (mark_side + space_side);
        let encoder = VisEncoder::new(vis, sample_rate).with_bit_override(bit, frequency);
        let (_, outcomes) = receive(config, &transmission(encoder, sample_rate));

        let byte = match outcomes.as_slice() {
            [SyncEvent::Reset(ResetReason::Discrimination { .. })] => return outcomes,
            [SyncEvent::VisDecoded(decoded)] => decoded.to_byte(),
            [SyncEvent::Reset(ResetReason::Parity { data })] => *data,
            _ => panic!("{sample_rate} Hz, code {vis:?}, bit {bit} at {frequency} Hz: {outcomes:?}"),
        };
        if byte & (1 << bit) != 0 {
            mark_side = frequency;
        }
        else {
            space_side = frequency;
        }
    }

    panic!("{sample_rate} Hz, code {vis:?}, bit {bit}: no tie between {mark_side} and {space_side} Hz");
}

#[test]
fn equal_mark_and_space_energy_resets() {
    init_tracing();
    let s_lvl2 = Sensitivity::Level0.levels().s_lvl2;

    for sample_rate in [8000.0, 11025.0, 48000.0] {
        for vis in [0x2c, 0x08, 0x7f, 0x00].into_iter().filter_map(VisCode::new) {
            for bit in [0, 3, 5, 7] {
                let outcomes = tie_outcome(vis, bit, sample_rate);
                let SyncEvent::Reset(ResetReason::Discrimination {
                    bit_index,
                    mark,
                    space,
                    leader,
                }) = outcomes[0]
                else {
                    unreachable!();
                };

                assert_eq!(usize::from(bit_index), bit, "{sample_rate} Hz, code {vis:?}");
                assert!((mark - space).abs() < s_lvl2, "{mark} vs {space}");
                assert!(mark.max(space) > leader, "{mark}, {space} vs leader {leader}");
            }
        }
    }
}

#[test]
fn flipped_parity_bit_is_rejected() {
    let sample_rate = 11025.0;
    for vis in [0x2c, 0x08, 0x01, 0x7e].into_iter().filter_map(VisCode::new) {
        let byte = vis.to_byte() ^ 0x80;
        let encoder = VisEncoder::new(vis, sample_rate).with_raw_byte(byte);
        let (receiver, outcomes) =
            receive(ReceiverConfig::new(sample_rate), &transmission(encoder, sample_rate));
        assert_eq!(
            outcomes,
            vec![SyncEvent::Reset(ResetReason::Parity { data: byte })]
        );
        assert!(receiver.state().is_idle());
        assert_eq!(receiver.vis_code(), None);
    }
}

#[test]
fn leader_through_the_bits_resets_at_first_bit() {
    for sample_rate in [11025.0, 48000.0] {
        let encoder = (0..8).fold(
            VisEncoder::new(VisCode::new(0x2c).unwrap(), sample_rate),
            |encoder, bit| encoder.with_bit_override(bit, LEADER_TONE),
        );
        let (_, outcomes) = receive(
            ReceiverConfig::new(sample_rate),
            &transmission(encoder, sample_rate),
        );

        assert!(matches!(
            outcomes.first(),
            Some(SyncEvent::Reset(ResetReason::Discrimination { bit_index: 0, .. }))
        ));
        assert!(
            !outcomes
                .iter()
                .any(|event| matches!(event, SyncEvent::VisDecoded(_)))
        );
    }
}

#[test]
fn level_differences_are_normalized() {
    let sample_rate = 11025.0;
    let vis = VisCode::new(0x2c).unwrap();
    for (amplitude, clipped) in [(500.0, false), (3000.0, false), (32768.0, true), (60000.0, true)] {
        let encoder = VisEncoder::new(vis, sample_rate).with_amplitude(amplitude / 32768.0);
        let (receiver, outcomes) =
            receive(ReceiverConfig::new(sample_rate), &transmission(encoder, sample_rate));
        assert_eq!(outcomes, vec![SyncEvent::VisDecoded(vis)], "amplitude {amplitude}");
        assert_eq!(receiver.overflow(), clipped);
    }
}

#[test]
fn noisy_header_decodes() {
    let sample_rate = 11025.0;
    let vis = VisCode::new(0x2c).unwrap();
    for seed in 1..=4 {
        let samples = transmission(VisEncoder::new(vis, sample_rate), sample_rate)
            .into_iter()
            .zip(white_noise(seed))
            .map(|(x, noise)| x + (noise * 3000.0 / 32768.0) as f32)
            .collect::<Vec<_>>();
        let (_, outcomes) = receive(ReceiverConfig::new(sample_rate), &samples);
        assert_eq!(outcomes, vec![SyncEvent::VisDecoded(vis)], "seed {seed}");
    }
}

#[test]
fn consecutive_transmissions_after_reset() {
    let sample_rate = 11025.0;
    let first = VisCode::new(0x2c).unwrap();
    let second = VisCode::new(0x08).unwrap();
    let mut receiver = SstvReceiver::new(ReceiverConfig::new(sample_rate)).unwrap();

    let events = outcomes(receiver.feed_block(&transmission(
        VisEncoder::new(first, sample_rate),
        sample_rate,
    )));
    assert_eq!(events, vec![SyncEvent::VisDecoded(first)]);

    // ignored until reset
    let events = outcomes(receiver.feed_block(&transmission(
        VisEncoder::new(second, sample_rate),
        sample_rate,
    )));
    assert!(events.is_empty());
    assert_eq!(receiver.vis_code(), Some(first));

    receiver.reset();
    let mut samples = vec![0.0; (0.4 * sample_rate) as usize];
    samples.extend(transmission(VisEncoder::new(second, sample_rate), sample_rate));
    let events = outcomes(receiver.feed_block(&samples));
    assert_eq!(events, vec![SyncEvent::VisDecoded(second)]);
}

#[test]
fn integer_samples_decode() {
    let sample_rate = 11025.0;
    for vis in codes(9) {
        let mut receiver = SstvReceiver::new(ReceiverConfig::new(sample_rate)).unwrap();
        let events = transmission(VisEncoder::new(vis, sample_rate), sample_rate)
            .into_iter()
            .map(|x| (f64::from(x) * 32768.0).round().clamp(-32768.0, 32767.0) as i16)
            .filter_map(|x| receiver.feed_i16(x))
            .collect::<Vec<_>>();
        assert_eq!(outcomes(events), vec![SyncEvent::VisDecoded(vis)]);
    }
}
