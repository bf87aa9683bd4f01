use ndarray::{Array2, ArrayView2};

use super::LossFn;

const EPSILON: f32 = 1e-7;

/// Categorical cross-entropy against integer class labels.
///
/// `y_pred` holds one probability distribution per row and `y` a single column with the index
/// of the correct class for that row. The probabilities are clipped to `[EPSILON, 1 - EPSILON]`
/// so a confident wrong answer doesn't blow up to infinity.
#[derive(Default, Clone, Copy)]
pub struct SparseCrossEntropy;

impl SparseCrossEntropy {
    /// Returns a new `SparseCrossEntropy`.
    pub fn new() -> Self {
        Self
    }

    fn target_probs(y_pred: ArrayView2<f32>, y: ArrayView2<f32>) -> Vec<(usize, usize, f32)> {
        y.column(0)
            .iter()
            .enumerate()
            .map(|(row, &class)| {
                let class = class as usize;
                let p = y_pred[(row, class)].clamp(EPSILON, 1. - EPSILON);
                (row, class, p)
            })
            .collect()
    }
}

impl LossFn for SparseCrossEntropy {
    fn loss(&self, y_pred: ArrayView2<f32>, y: ArrayView2<f32>) -> f32 {
        let n = y_pred.nrows();
        if n == 0 {
            return 0.;
        }

        let total: f32 = Self::target_probs(y_pred, y)
            .into_iter()
            .map(|(_, _, p)| -p.ln())
            .sum();
        total / n as f32
    }

    fn loss_prime(&self, y_pred: ArrayView2<f32>, y: ArrayView2<f32>) -> Array2<f32> {
        let n = y_pred.nrows() as f32;
        let mut d = Array2::zeros(y_pred.raw_dim());

        for (row, class, p) in Self::target_probs(y_pred, y) {
            d[(row, class)] = -1. / (p * n);
        }

        d
    }
}

#[cfg(test)]
mod tests {
    use ndarray::array;

    use super::*;

    #[test]
    fn loss_is_the_mean_negative_log_likelihood() {
        let y_pred = array![[0.25, 0.5, 0.25], [0.1, 0.1, 0.8]];
        let y = array![[1.], [2.]];

        let loss = SparseCrossEntropy::new().loss(y_pred.view(), y.view());
        let expected = -(0.5f32.ln() + 0.8f32.ln()) / 2.;

        assert!((loss - expected).abs() < 1e-6);
    }

    #[test]
    fn a_certain_wrong_answer_is_clipped() {
        let y_pred = array![[1., 0.]];
        let y = array![[1.]];

        let loss = SparseCrossEntropy::new().loss(y_pred.view(), y.view());

        assert!(loss.is_finite());
        assert!((loss - -(EPSILON.ln())).abs() < 1e-3);
    }

    #[test]
    fn derivative_only_touches_the_target_class() {
        let y_pred = array![[0.25, 0.5, 0.25], [0.1, 0.1, 0.8]];
        let y = array![[1.], [2.]];

        let d = SparseCrossEntropy::new().loss_prime(y_pred.view(), y.view());

        assert_eq!(d[(0, 0)], 0.);
        assert_eq!(d[(0, 2)], 0.);
        assert!((d[(0, 1)] - -1.).abs() < 1e-6);
        assert!((d[(1, 2)] - -1. / 1.6).abs() < 1e-6);
    }
}
