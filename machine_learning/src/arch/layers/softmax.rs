use ndarray::{Array2, ArrayView2, Axis};

use crate::{MlErr, Result};

/// Normalizes each row into a probability distribution.
#[derive(Clone, Debug, Default)]
pub struct Softmax {
    a: Option<Array2<f32>>,
}

impl Softmax {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn forward(&mut self, x: ArrayView2<f32>) -> Array2<f32> {
        let mut a = x.to_owned();

        for mut row in a.rows_mut() {
            let max = row.fold(f32::NEG_INFINITY, |max, &z| max.max(z));
            row.mapv_inplace(|z| (z - max).exp());
            let sum = row.sum();
            row /= sum;
        }

        self.a = Some(a.clone());
        a
    }

    /// Applies the softmax jacobian row by row: `a ⊙ (d - Σ d ⊙ a)`.
    pub fn backward(&mut self, d: Array2<f32>) -> Result<Array2<f32>> {
        let a = self
            .a
            .as_ref()
            .ok_or(MlErr::NoForwardPass { layer: "softmax" })?;

        let dot = (&d * a).sum_axis(Axis(1)).insert_axis(Axis(1));
        Ok(a * &(&d - &dot))
    }
}
