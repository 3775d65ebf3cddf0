use clap::ValueEnum;

use surge_core::{RunConfig, StageConfig};

/// Named load profiles selectable from the command line.
///
/// Preset selection is plain configuration: each preset expands to a full
/// [`RunConfig`] that flags can still override.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum Preset {
    /// Gentle profile: ramp to 10 users, hold, ramp down.
    Low,
    /// Heavy profile: ramp to 50, push to 100, ramp down.
    High,
}

impl Preset {
    /// Expands the preset into its run configuration.
    #[must_use]
    pub fn config(self) -> RunConfig {
        match self {
            Self::Low => RunConfig::default(),
            Self::High => RunConfig {
                stages: vec![
                    StageConfig {
                        duration_secs: 10.0,
                        target: 50,
                    },
                    StageConfig {
                        duration_secs: 30.0,
                        target: 100,
                    },
                    StageConfig {
                        duration_secs: 10.0,
                        target: 0,
                    },
                ],
                ..RunConfig::default()
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_presets_validate() {
        assert!(Preset::Low.config().validate().is_ok());
        assert!(Preset::High.config().validate().is_ok());
    }

    #[test]
    fn test_high_preset_peaks_at_100() {
        let peak = Preset::High
            .config()
            .stages
            .iter()
            .map(|stage| stage.target)
            .max()
            .unwrap();
        assert_eq!(peak, 100);
    }
}
