use std::{error::Error, fmt, io};

use machine_learning::MlErr;

/// The predictor's result type.
pub type Result<T> = std::result::Result<T, PredictorErr>;

/// The broad family an error belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// The configuration can't be used to build a model.
    Configuration,
    /// The caller submitted something that can't be accepted right now.
    Input,
    /// A training pass failed.
    Training,
}

/// All errors that can occur in the predictor.
#[derive(Debug)]
pub enum PredictorErr {
    /// Invalid configuration, caught before building a model.
    InvalidConfig(String),
    /// Failed to read a configuration file.
    Io(io::Error),
    /// A configuration file isn't valid JSON for a configuration.
    Json(serde_json::Error),
    /// A digit was observed while the previous one is still being trained on.
    TrainingInProgress,
    /// A value outside `0..=9` was given as a digit.
    InvalidDigit(u8),
    /// A driver command couldn't be understood.
    InvalidCommand(String),
    /// The model failed while training or predicting.
    Training(MlErr),
    /// The background training task panicked or was cancelled.
    TaskFailed(String),
}

impl PredictorErr {
    /// Returns the family this error belongs to.
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::InvalidConfig(_) | Self::Io(_) | Self::Json(_) => ErrorKind::Configuration,
            Self::TrainingInProgress | Self::InvalidDigit(_) | Self::InvalidCommand(_) => {
                ErrorKind::Input
            }
            Self::Training(_) | Self::TaskFailed(_) => ErrorKind::Training,
        }
    }
}

impl fmt::Display for PredictorErr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::InvalidConfig(msg) => write!(f, "invalid config: {msg}"),
            Self::Io(e) => write!(f, "io error: {e}"),
            Self::Json(e) => write!(f, "invalid JSON: {e}"),
            Self::TrainingInProgress => write!(f, "still training on the previous digit"),
            Self::InvalidDigit(value) => write!(f, "{value} is not a digit between 0 and 9"),
            Self::InvalidCommand(cmd) => write!(f, "unknown command: {cmd}"),
            Self::Training(e) => write!(f, "training failed: {e}"),
            Self::TaskFailed(msg) => write!(f, "training task failed: {msg}"),
        }
    }
}

impl Error for PredictorErr {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Io(e) => Some(e),
            Self::Json(e) => Some(e),
            Self::Training(e) => Some(e),
            _ => None,
        }
    }
}

impl From<io::Error> for PredictorErr {
    fn from(e: io::Error) -> Self {
        Self::Io(e)
    }
}

impl From<serde_json::Error> for PredictorErr {
    fn from(e: serde_json::Error) -> Self {
        Self::Json(e)
    }
}

impl From<MlErr> for PredictorErr {
    fn from(e: MlErr) -> Self {
        Self::Training(e)
    }
}
