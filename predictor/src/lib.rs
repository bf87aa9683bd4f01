pub mod classifier;
pub mod command;
mod config;
mod digit;
mod error;
mod events;
mod factory;
mod prediction;
mod trainer;

pub use config::{Architecture, Configuration};
pub use digit::{Digit, NUM_CLASSES};
pub use error::{ErrorKind, PredictorErr, Result};
pub use events::TrainingEvent;
pub use factory::{ModelFactory, RecurrentClassifier};
pub use prediction::{Prediction, TracePoint, TrainingTrace};
pub use trainer::{IncrementalTrainer, Outcome, Retraining};
