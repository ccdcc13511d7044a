use serde::{
    Deserialize,
    Serialize,
};

use crate::modem::sstv::{
    ALT_VIS_MARK_TONE,
    ALT_VIS_SPACE_TONE,
    VIS_MARK_TONE,
    VIS_SPACE_TONE,
};

/// Thresholds of the sync decoder, in AGC-normalized envelope units.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct SenseLevels {
    /// A tone dominates if its envelope is above this and exceeds the
    /// competing envelope by at least this much.
    pub s_lvl: f64,
    /// Minimum mark/space separation for a VIS bit.
    pub s_lvl2: f64,
    /// Minimum peak sync envelope during start bit validation.
    pub s_lvl3: f64,
}

/// Sensitivity presets. `Level0` is the most sensitive.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "u8", into = "u8")]
pub enum Sensitivity {
    #[default]
    Level0,
    Level1,
    Level2,
    Level3,
}

impl Sensitivity {
    pub fn levels(&self) -> SenseLevels {
        let (s_lvl, s_lvl2, s_lvl3) = match self {
            Self::Level0 => (2400.0, 80.0, 5000.0),
            Self::Level1 => (3500.0, 80.0, 5700.0),
            Self::Level2 => (4800.0, 80.0, 6800.0),
            Self::Level3 => (6000.0, 80.0, 8000.0),
        };
        SenseLevels {
            s_lvl,
            s_lvl2,
            s_lvl3,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, thiserror::Error)]
#[error("invalid sensitivity level: {0}")]
pub struct InvalidSensitivity(pub u8);

impl TryFrom<u8> for Sensitivity {
    type Error = InvalidSensitivity;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            0 => Ok(Self::Level0),
            1 => Ok(Self::Level1),
            2 => Ok(Self::Level2),
            3 => Ok(Self::Level3),
            _ => Err(InvalidSensitivity(value)),
        }
    }
}

impl From<Sensitivity> for u8 {
    fn from(value: Sensitivity) -> Self {
        match value {
            Sensitivity::Level0 => 0,
            Sensitivity::Level1 => 1,
            Sensitivity::Level2 => 2,
            Sensitivity::Level3 => 3,
        }
    }
}

/// Which mark/space pair the VIS bits are expected on.
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ToneConvention {
    /// 1100 Hz mark, 1300 Hz space.
    Standard,
    /// 1080 Hz mark, 1320 Hz space.
    Alternate,
    Custom {
        mark: f64,
        space: f64,
    },
    /// Listen on both built-in pairs and use the stronger one.
    #[default]
    Auto,
}

impl ToneConvention {
    /// `(mark, space)` for a fixed convention, `None` for [`Self::Auto`].
    pub fn tones(&self) -> Option<(f64, f64)> {
        match self {
            Self::Standard => Some((VIS_MARK_TONE, VIS_SPACE_TONE)),
            Self::Alternate => Some((ALT_VIS_MARK_TONE, ALT_VIS_SPACE_TONE)),
            Self::Custom { mark, space } => Some((*mark, *space)),
            Self::Auto => None,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct ReceiverConfig {
    pub sample_rate: f64,
    #[serde(default)]
    pub sensitivity: Sensitivity,
    /// Overrides the thresholds of `sensitivity`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sense_levels: Option<SenseLevels>,
    #[serde(default)]
    pub tone_convention: ToneConvention,
}

impl ReceiverConfig {
    pub fn new(sample_rate: f64) -> Self {
        Self {
            sample_rate,
            sensitivity: Sensitivity::default(),
            sense_levels: None,
            tone_convention: ToneConvention::default(),
        }
    }

    pub fn with_sensitivity(mut self, sensitivity: Sensitivity) -> Self {
        self.sensitivity = sensitivity;
        self
    }

    pub fn with_sense_levels(mut self, sense_levels: SenseLevels) -> Self {
        self.sense_levels = Some(sense_levels);
        self
    }

    pub fn with_tone_convention(mut self, tone_convention: ToneConvention) -> Self {
        self.tone_convention = tone_convention;
        self
    }

    pub fn levels(&self) -> SenseLevels {
        self.sense_levels
            .unwrap_or_else(|| self.sensitivity.levels())
    }
}

#[cfg(test)]
mod tests {
    use crate::modem::sstv::{
        ReceiverConfig,
        SenseLevels,
        Sensitivity,
        ToneConvention,
    };

    #[test]
    fn it_parses_minimal_toml() {
        let config: ReceiverConfig = toml::from_str("sample_rate = 11025.0").unwrap();
        assert_eq!(config, ReceiverConfig::new(11025.0));
        assert_eq!(config.tone_convention, ToneConvention::Auto);
        assert_eq!(config.levels(), Sensitivity::Level0.levels());
    }

    #[test]
    fn it_parses_full_toml() {
        let config: ReceiverConfig = toml::from_str(
            r#"
            sample_rate = 48000.0
            sensitivity = 2
            tone_convention = { custom = { mark = 1090.0, space = 1310.0 } }
            "#,
        )
        .unwrap();
        assert_eq!(config.sensitivity, Sensitivity::Level2);
        assert_eq!(config.levels().s_lvl, 4800.0);
        assert_eq!(config.tone_convention.tones(), Some((1090.0, 1310.0)));

        let config: ReceiverConfig = toml::from_str(
            r#"
            sample_rate = 8000.0
            tone_convention = "alternate"

            [sense_levels]
            s_lvl = 1000.0
            s_lvl2 = 50.0
            s_lvl3 = 2000.0
            "#,
        )
        .unwrap();
        assert_eq!(config.tone_convention, ToneConvention::Alternate);
        assert_eq!(
            config.levels(),
            SenseLevels {
                s_lvl: 1000.0,
                s_lvl2: 50.0,
                s_lvl3: 2000.0,
            }
        );
    }

    #[test]
    fn it_rejects_unknown_sensitivity() {
        assert!(toml::from_str::<ReceiverConfig>("sample_rate = 8000.0\nsensitivity = 4").is_err());
    }

    #[test]
    fn config_survives_toml_round_trip() {
        let config = ReceiverConfig::new(44100.0)
            .with_sensitivity(Sensitivity::Level3)
            .with_tone_convention(ToneConvention::Standard);
        let text = toml::to_string(&config).unwrap();
        assert_eq!(toml::from_str::<ReceiverConfig>(&text).unwrap(), config);
    }
}
