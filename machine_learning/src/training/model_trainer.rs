use std::num::NonZeroUsize;

use log::debug;
use ndarray::{Array2, ArrayView2};
use rand::Rng;

use crate::{
    MlErr, Result,
    arch::{Model, loss::LossFn},
    dataset::Dataset,
    optimization::Optimizer,
};

/// A model trainer. Contains the relevant components needed for training a model, including
/// the model itself.
pub struct ModelTrainer<M, O, L, R>
where
    M: Model,
    O: Optimizer,
    L: LossFn,
    R: Rng,
{
    model: M,
    optimizer: O,
    loss_fn: L,
    batch_size: NonZeroUsize,
    shuffle: bool,
    rng: R,
}

impl<M, O, L, R> ModelTrainer<M, O, L, R>
where
    M: Model,
    O: Optimizer,
    L: LossFn,
    R: Rng,
{
    /// Returns a new `ModelTrainer`.
    ///
    /// # Arguments
    /// * `model` - The model that will be trained.
    /// * `optimizer` - The optimizer used on every batch, it keeps its state between `fit` calls.
    /// * `loss_fn` - The loss function used to measure the difference between a model's output and the expected one.
    /// * `batch_size` - The maximum amount of samples per parameter update.
    /// * `shuffle` - Whether to shuffle the dataset before every epoch.
    /// * `rng` - A random number generator.
    pub fn new(
        model: M,
        optimizer: O,
        loss_fn: L,
        batch_size: NonZeroUsize,
        shuffle: bool,
        rng: R,
    ) -> Self {
        Self {
            model,
            optimizer,
            loss_fn,
            batch_size,
            shuffle,
            rng,
        }
    }

    /// Performs `epochs` epochs of training over `dataset`.
    ///
    /// # Arguments
    /// * `dataset` - The dataset to train with.
    /// * `epochs` - The amount of passes over the dataset.
    /// * `on_epoch_end` - Called after every epoch with its index, starting from 0, and its loss.
    ///
    /// # Returns
    /// The loss of every epoch, or an error if the training failed or diverged.
    pub fn fit<F>(
        &mut self,
        dataset: &mut Dataset,
        epochs: NonZeroUsize,
        mut on_epoch_end: F,
    ) -> Result<Vec<f32>>
    where
        F: FnMut(usize, f32),
    {
        let epochs = epochs.get();
        let mut losses = Vec::with_capacity(epochs);

        for epoch in 0..epochs {
            if self.shuffle {
                dataset.shuffle(&mut self.rng);
            }

            let batches = dataset.batches(self.batch_size)?;
            let loss = self
                .model
                .backprop(&mut self.optimizer, &self.loss_fn, batches)?;

            if !loss.is_finite() {
                return Err(MlErr::Diverged { epoch: epoch + 1 });
            }

            debug!(epoch = epoch + 1, loss = loss; "finished epoch");
            on_epoch_end(epoch, loss);
            losses.push(loss);
        }

        Ok(losses)
    }

    /// Makes a prediction with the model being trained.
    pub fn predict(&mut self, x: ArrayView2<f32>) -> Result<Array2<f32>> {
        self.model.forward(x)
    }

    /// Returns the model being trained.
    pub fn model(&self) -> &M {
        &self.model
    }
}
