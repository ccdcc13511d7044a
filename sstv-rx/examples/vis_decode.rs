use std::path::{
    Path,
    PathBuf,
};

use clap::Parser;
use color_eyre::eyre::{
    Error,
    bail,
    eyre,
};
use hound::{
    SampleFormat,
    WavReader,
    WavSpec,
    WavWriter,
};
use sstv_rx::modem::sstv::{
    ReceiverConfig,
    SstvReceiver,
    SyncEvent,
    VisCode,
    VisEncoder,
};
use tracing_subscriber::EnvFilter;

fn main() -> Result<(), Error> {
    let _ = dotenvy::dotenv();
    color_eyre::install()?;
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let args = Args::parse();
    tracing::debug!(?args);

    match args {
        Args::Decode { input, config } => {
            let mut reader = WavReader::open(&input)?;
            let spec = reader.spec();
            tracing::info!(?spec, "reading {}", input.display());

            let config = load_config(config.as_deref(), spec.sample_rate.into())?;
            let mut receiver = SstvReceiver::new(config)?;

            let channels = usize::from(spec.channels);
            let events = match spec.sample_format {
                SampleFormat::Float => {
                    reader
                        .samples::<f32>()
                        .step_by(channels)
                        .map(|sample| Ok(receiver.feed_f32(sample?)))
                        .collect::<Result<Vec<_>, hound::Error>>()?
                }
                SampleFormat::Int => {
                    // rescale to 16 bits
                    let scale = 2f64.powi(16 - i32::from(spec.bits_per_sample));
                    reader
                        .samples::<i32>()
                        .step_by(channels)
                        .map(|sample| Ok(receiver.feed(f64::from(sample?) * scale)))
                        .collect::<Result<Vec<_>, hound::Error>>()?
                }
            };

            report(&receiver, events.into_iter().flatten());
        }
        Args::Loopback {
            code,
            sample_rate,
            output,
            config,
        } => {
            let vis = VisCode::new(code).ok_or_else(|| eyre!("VIS code must be below 128"))?;
            let silence = std::iter::repeat_n(0.0, (0.1 * f64::from(sample_rate)) as usize);
            let samples = silence
                .clone()
                .chain(VisEncoder::new(vis, sample_rate.into()))
                .chain(silence)
                .collect::<Vec<f32>>();

            if let Some(output) = output {
                write_wav(&output, &samples, sample_rate)?;
            }

            let config = load_config(config.as_deref(), sample_rate.into())?;
            let mut receiver = SstvReceiver::new(config)?;
            let events = receiver.feed_block(&samples);
            report(&receiver, events);

            if receiver.vis_code() != Some(vis) {
                bail!("sent {vis:?}, received {:?}", receiver.vis_code());
            }
        }
    }

    Ok(())
}

#[derive(Debug, clap::Parser)]
enum Args {
    /// Look for a VIS header in a WAV file.
    Decode {
        input: PathBuf,
        /// Receiver settings as TOML. The sample rate is taken from the file.
        #[clap(short, long)]
        config: Option<PathBuf>,
    },
    /// Synthesize a VIS header and decode it again.
    Loopback {
        #[clap(short, long, default_value = "44")]
        code: u8,
        #[clap(short, long, default_value = "11025")]
        sample_rate: u32,
        /// Also write the synthesized audio here.
        #[clap(short, long)]
        output: Option<PathBuf>,
        /// Receiver settings as TOML, without the sample rate.
        #[clap(long)]
        config: Option<PathBuf>,
    },
}

fn load_config(path: Option<&Path>, sample_rate: f64) -> Result<ReceiverConfig, Error> {
    let Some(path) = path
    else {
        return Ok(ReceiverConfig::new(sample_rate));
    };
    let config = parse_config(&std::fs::read_to_string(path)?, sample_rate)?;
    tracing::debug!(?config, "loaded {}", path.display());
    Ok(config)
}

/// Parses receiver settings. The sample rate always comes from the audio, so
/// the file may leave it out.
fn parse_config(text: &str, sample_rate: f64) -> Result<ReceiverConfig, Error> {
    let mut table: toml::Table = toml::from_str(text)?;
    table.insert("sample_rate".to_owned(), toml::Value::Float(sample_rate));
    Ok(toml::Value::Table(table).try_into()?)
}

fn write_wav(path: &Path, samples: &[f32], sample_rate: u32) -> Result<(), Error> {
    let mut writer = WavWriter::create(
        path,
        WavSpec {
            channels: 1,
            sample_rate,
            bits_per_sample: 32,
            sample_format: SampleFormat::Float,
        },
    )?;
    for sample in samples {
        writer.write_sample(*sample)?;
    }
    writer.finalize()?;
    Ok(())
}

fn report(receiver: &SstvReceiver, events: impl IntoIterator<Item = SyncEvent>) {
    for event in events {
        println!("{event:?}");
    }
    if receiver.overflow() {
        tracing::warn!("input was clipped");
    }
    match receiver.vis_code() {
        Some(vis) => println!("VIS code: {} ({:#04x})", vis.get(), vis.to_byte()),
        None => println!("no VIS code found"),
    }
}

#[cfg(test)]
mod tests {
    use sstv_rx::modem::sstv::{
        Sensitivity,
        ToneConvention,
    };

    use super::parse_config;

    #[test]
    fn settings_without_sample_rate_take_the_audio_rate() {
        let config = parse_config("sensitivity = 1\ntone_convention = \"alternate\"", 8000.0).unwrap();
        assert_eq!(config.sample_rate, 8000.0);
        assert_eq!(config.sensitivity, Sensitivity::Level1);
        assert_eq!(config.tone_convention, ToneConvention::Alternate);

        assert_eq!(parse_config("", 11025.0).unwrap().sample_rate, 11025.0);
    }

    #[test]
    fn audio_rate_replaces_configured_sample_rate() {
        let config = parse_config("sample_rate = 48000.0\nsensitivity = 3", 44100.0).unwrap();
        assert_eq!(config.sample_rate, 44100.0);
        assert_eq!(config.sensitivity, Sensitivity::Level3);
    }

    #[test]
    fn invalid_settings_are_reported() {
        assert!(parse_config("sensitivity = 4", 8000.0).is_err());
        assert!(parse_config("sensitivity = ", 8000.0).is_err());
    }
}
