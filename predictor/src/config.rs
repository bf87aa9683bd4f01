use std::{fmt, fs, num::NonZeroUsize, path::Path, str::FromStr};

use serde::{Deserialize, Serialize};

use crate::{PredictorErr, Result};

const DEFAULT_LEARNING_RATE: f32 = 0.001;
const DEFAULT_BATCH_SIZE: NonZeroUsize = NonZeroUsize::new(32).unwrap();
const DEFAULT_HIDDEN_UNITS: NonZeroUsize = NonZeroUsize::new(10).unwrap();
const DEFAULT_EPOCHS_PER_STEP: NonZeroUsize = NonZeroUsize::new(5).unwrap();

/// The kind of recurrent cell the classifier is built around.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Architecture {
    SimpleRnn,
    Lstm,
    Gru,
}

impl FromStr for Architecture {
    type Err = PredictorErr;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "simple_rnn" | "simplernn" | "rnn" => Ok(Self::SimpleRnn),
            "lstm" => Ok(Self::Lstm),
            "gru" => Ok(Self::Gru),
            other => Err(PredictorErr::InvalidConfig(format!(
                "unknown architecture: {other}"
            ))),
        }
    }
}

impl fmt::Display for Architecture {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::SimpleRnn => "simple_rnn",
            Self::Lstm => "lstm",
            Self::Gru => "gru",
        };

        f.write_str(name)
    }
}

/// The settings a model is built and trained with.
///
/// Changing any of them means building a new model from scratch.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Configuration {
    pub architecture: Architecture,
    pub hidden_units: NonZeroUsize,
    pub epochs_per_step: NonZeroUsize,
    #[serde(default = "default_learning_rate")]
    pub learning_rate: f32,
    #[serde(default = "default_batch_size")]
    pub batch_size: NonZeroUsize,
    #[serde(default = "default_shuffle")]
    pub shuffle: bool,
    #[serde(default)]
    pub seed: Option<u64>,
}

fn default_learning_rate() -> f32 {
    DEFAULT_LEARNING_RATE
}

fn default_batch_size() -> NonZeroUsize {
    DEFAULT_BATCH_SIZE
}

fn default_shuffle() -> bool {
    true
}

impl Configuration {
    /// Creates a new `Configuration` with the default training knobs.
    ///
    /// # Arguments
    /// * `architecture` - The recurrent cell to use.
    /// * `hidden_units` - The amount of hidden units of the recurrent cell.
    /// * `epochs_per_step` - The amount of epochs to train for on every new digit.
    ///
    /// # Returns
    /// A new `Configuration` or an error if any of the counts is zero.
    pub fn new(
        architecture: Architecture,
        hidden_units: usize,
        epochs_per_step: usize,
    ) -> Result<Self> {
        let hidden_units = NonZeroUsize::new(hidden_units)
            .ok_or_else(|| PredictorErr::InvalidConfig("hidden_units must be positive".into()))?;
        let epochs_per_step = NonZeroUsize::new(epochs_per_step).ok_or_else(|| {
            PredictorErr::InvalidConfig("epochs_per_step must be positive".into())
        })?;

        Ok(Self {
            architecture,
            hidden_units,
            epochs_per_step,
            learning_rate: DEFAULT_LEARNING_RATE,
            batch_size: DEFAULT_BATCH_SIZE,
            shuffle: true,
            seed: None,
        })
    }

    /// Sets the seed used for initializing and shuffling.
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }

    /// Checks the values the type system can't.
    pub fn validate(&self) -> Result<()> {
        if !self.learning_rate.is_finite() || self.learning_rate <= 0. {
            return Err(PredictorErr::InvalidConfig(format!(
                "learning_rate must be a positive number, got {}",
                self.learning_rate
            )));
        }

        Ok(())
    }

    /// Loads and validates a `Configuration` from a JSON file.
    pub fn from_json_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = fs::read_to_string(path)?;
        let config: Self = serde_json::from_str(&content)?;
        config.validate()?;
        Ok(config)
    }
}

impl Default for Configuration {
    fn default() -> Self {
        Self {
            architecture: Architecture::Lstm,
            hidden_units: DEFAULT_HIDDEN_UNITS,
            epochs_per_step: DEFAULT_EPOCHS_PER_STEP,
            learning_rate: DEFAULT_LEARNING_RATE,
            batch_size: DEFAULT_BATCH_SIZE,
            shuffle: true,
            seed: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ErrorKind;

    #[test]
    fn architectures_parse_from_their_tags() {
        assert_eq!("lstm".parse::<Architecture>().unwrap(), Architecture::Lstm);
        assert_eq!(" GRU ".parse::<Architecture>().unwrap(), Architecture::Gru);
        assert_eq!(
            "SimpleRNN".parse::<Architecture>().unwrap(),
            Architecture::SimpleRnn
        );

        let err = "transformer".parse::<Architecture>().unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Configuration);
    }

    #[test]
    fn display_round_trips_through_from_str() {
        for arch in [Architecture::SimpleRnn, Architecture::Lstm, Architecture::Gru] {
            assert_eq!(arch.to_string().parse::<Architecture>().unwrap(), arch);
        }
    }

    #[test]
    fn zero_counts_are_rejected() {
        assert!(Configuration::new(Architecture::Gru, 0, 5).is_err());
        assert!(Configuration::new(Architecture::Gru, 4, 0).is_err());
        assert!(Configuration::new(Architecture::Gru, 4, 5).is_ok());
    }

    #[test]
    fn learning_rate_must_be_positive() {
        let mut config = Configuration::default();
        for lr in [0., -0.1, f32::NAN, f32::INFINITY] {
            config.learning_rate = lr;
            assert!(config.validate().is_err());
        }

        config.learning_rate = 0.01;
        assert!(config.validate().is_ok());
    }

    #[test]
    fn json_fills_in_training_defaults() {
        let json = r#"{"architecture": "gru", "hidden_units": 8, "epochs_per_step": 3}"#;
        let config: Configuration = serde_json::from_str(json).unwrap();

        assert_eq!(config, Configuration::new(Architecture::Gru, 8, 3).unwrap());
    }

    #[test]
    fn json_rejects_unknown_architectures_and_zero_units() {
        let bad_arch = r#"{"architecture": "cnn", "hidden_units": 8, "epochs_per_step": 3}"#;
        let zero_units = r#"{"architecture": "lstm", "hidden_units": 0, "epochs_per_step": 3}"#;

        assert!(serde_json::from_str::<Configuration>(bad_arch).is_err());
        assert!(serde_json::from_str::<Configuration>(zero_units).is_err());
    }

    #[test]
    fn default_is_a_small_lstm() {
        let config = Configuration::default();

        assert_eq!(config.architecture, Architecture::Lstm);
        assert_eq!(config.hidden_units.get(), 10);
        assert_eq!(config.epochs_per_step.get(), 5);
        assert!(config.validate().is_ok());
    }
}
