use std::num::NonZeroUsize;

use crate::{Configuration, Result};

/// A trainable classifier over single scalar inputs.
pub trait Classifier: Send {
    /// Trains the classifier on `inputs[i] -> targets[i]` pairs, continuing from its current
    /// weights.
    ///
    /// # Arguments
    /// * `inputs` - One scalar per sample.
    /// * `targets` - The class index of each sample.
    /// * `epochs` - The amount of passes over the samples.
    /// * `on_epoch_end` - Called after every epoch with its index, starting from 0, and its loss.
    fn fit(
        &mut self,
        inputs: &[f32],
        targets: &[usize],
        epochs: NonZeroUsize,
        on_epoch_end: &mut dyn FnMut(usize, f32),
    ) -> Result<()>;

    /// Returns the probability of each class for the given input.
    fn predict(&mut self, input: f32) -> Result<Vec<f32>>;
}

/// Builds fresh classifiers out of a configuration.
pub trait ClassifierFactory: Send + Sync {
    /// Builds a newly initialized classifier, sharing nothing with previously built ones.
    fn new_classifier(&self, config: &Configuration) -> Result<Box<dyn Classifier>>;
}
