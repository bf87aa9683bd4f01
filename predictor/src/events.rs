use crate::{Configuration, Prediction, TracePoint};

/// Progress notifications of an incremental training session.
#[derive(Debug, Clone, PartialEq)]
pub enum TrainingEvent {
    /// A training pass started over `pairs` samples.
    Started { pairs: usize, epochs: usize },
    /// An epoch of the current pass finished.
    Epoch(TracePoint),
    /// The current pass finished and the model predicted the next digit.
    Predicted(Prediction),
    /// The current pass failed, the previous trace and prediction are kept.
    Failed(String),
    /// The session was reset with a new configuration.
    Reset(Configuration),
}
