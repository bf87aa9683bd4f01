use std::{iter, num::NonZeroUsize};

use ndarray::{ArrayView2, Axis};
use rand::{Rng, seq::SliceRandom};

use crate::{MlErr, Result};

/// A dataset of samples laid out row by row: each row holds `x_size` input values followed by
/// `y_size` expected output values.
#[derive(Debug, Clone)]
pub struct Dataset {
    x_size: usize,
    y_size: usize,
    data: Vec<f32>,
}

impl Dataset {
    /// Creates a new `Dataset`.
    ///
    /// # Arguments
    /// * `data` - The samples, one after the other.
    /// * `x_size` - The amount of input values per sample.
    /// * `y_size` - The amount of output values per sample.
    ///
    /// # Returns
    /// A new `Dataset` or an error if `data` can't be split in whole samples.
    pub fn new(data: Vec<f32>, x_size: usize, y_size: usize) -> Result<Self> {
        let row = x_size + y_size;

        if x_size == 0 || y_size == 0 || data.len() % row != 0 {
            return Err(MlErr::SizeMismatch {
                what: "dataset",
                got: data.len(),
                expected: data.len().next_multiple_of(row.max(1)),
            });
        }

        Ok(Self {
            x_size,
            y_size,
            data,
        })
    }

    /// Returns the amount of samples in the dataset.
    pub fn len(&self) -> usize {
        self.data.len() / self.row_size()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    fn row_size(&self) -> usize {
        self.x_size + self.y_size
    }

    /// Shuffles the samples of the dataset in place.
    pub fn shuffle<R: Rng>(&mut self, rng: &mut R) {
        let row = self.row_size();
        let mut order: Vec<_> = (0..self.len()).collect();
        order.shuffle(rng);

        let mut shuffled = Vec::with_capacity(self.data.len());
        for i in order {
            shuffled.extend_from_slice(&self.data[i * row..(i + 1) * row]);
        }

        self.data = shuffled;
    }

    /// Splits the dataset in consecutive batches of at most `batch_size` samples, the last one
    /// holding the remainder.
    ///
    /// # Returns
    /// An iterator of `(x, y)` views, one sample per row.
    pub fn batches(
        &self,
        batch_size: NonZeroUsize,
    ) -> Result<impl Iterator<Item = (ArrayView2<'_, f32>, ArrayView2<'_, f32>)>> {
        let mut rest = ArrayView2::from_shape((self.len(), self.row_size()), &self.data)?;
        let x_size = self.x_size;

        Ok(iter::from_fn(move || {
            if rest.nrows() == 0 {
                return None;
            }

            let n = batch_size.get().min(rest.nrows());
            let (batch, tail) = rest.split_at(Axis(0), n);
            rest = tail;

            Some(batch.split_at(Axis(1), x_size))
        }))
    }
}
