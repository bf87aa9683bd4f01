use std::{cell::RefCell, rc::Rc};

use ndarray::{Array2, ArrayView2};
use rand::Rng;

use super::{Model, layers::Layer, loss::LossFn};
use crate::{MlErr, Result, optimization::Optimizer};

/// A sequential model: information flows forward when computing an output and backward when
/// computing the *deltas* of its layers.
///
/// The parameters of every layer live contiguously in a single buffer, in layer order, and so
/// does the gradient.
#[derive(Clone)]
pub struct Sequential {
    layers: Vec<Layer>,
    params: Vec<f32>,
    grad: Vec<f32>,
}

impl Sequential {
    /// Creates a new `Sequential`.
    ///
    /// # Arguments
    /// * `layers` - The layers the sequential is composed of.
    /// * `params` - The initial parameters of all the layers, in order.
    ///
    /// # Returns
    /// A new `Sequential` instance or an error if `params` doesn't fit the layers.
    pub fn new<I>(layers: I, params: Vec<f32>) -> Result<Self>
    where
        I: IntoIterator<Item = Layer>,
    {
        let layers: Vec<_> = layers.into_iter().collect();
        let size = layers.iter().map(Layer::size).sum();

        if params.len() != size {
            return Err(MlErr::SizeMismatch {
                what: "model parameters",
                got: params.len(),
                expected: size,
            });
        }

        Ok(Self {
            layers,
            grad: vec![0.; size],
            params,
        })
    }

    /// Creates a new `Sequential` initializing the parameters the way each layer prefers.
    ///
    /// # Arguments
    /// * `layers` - The layers the sequential is composed of.
    /// * `rng` - The random number generator used for sampling the initial parameters.
    pub fn initialized<I, R>(layers: I, rng: &Rc<RefCell<R>>) -> Result<Self>
    where
        I: IntoIterator<Item = Layer>,
        R: Rng + 'static,
    {
        let layers: Vec<_> = layers.into_iter().collect();
        let mut params = Vec::with_capacity(layers.iter().map(Layer::size).sum());

        for layer in &layers {
            let Some(mut param_gen) = layer.param_gen(rng)? else {
                continue;
            };

            let size = layer.size();
            let sample = param_gen.sample(size).unwrap_or_default();
            if sample.len() != size {
                return Err(MlErr::SizeMismatch {
                    what: "initial layer parameters",
                    got: sample.len(),
                    expected: size,
                });
            }

            params.extend(sample);
        }

        Self::new(layers, params)
    }

    /// Returns the current parameters of the model.
    pub fn params(&self) -> &[f32] {
        &self.params
    }
}

impl Model for Sequential {
    fn size(&self) -> usize {
        self.params.len()
    }

    fn forward(&mut self, x: ArrayView2<f32>) -> Result<Array2<f32>> {
        let mut y = x.to_owned();
        let mut rest = &self.params[..];

        for layer in self.layers.iter_mut() {
            let (params, tail) = rest.split_at(layer.size());
            y = layer.forward(params, y.view())?;
            rest = tail;
        }

        Ok(y)
    }

    // NOTE: the epoch loss is the mean of the batch losses weighted by the batch sizes, measured
    // while the parameters are still moving, instead of a second pass over the whole dataset.
    fn backprop<'a, O, L, I>(&mut self, optimizer: &mut O, loss_fn: &L, batches: I) -> Result<f32>
    where
        O: Optimizer,
        L: LossFn,
        I: Iterator<Item = (ArrayView2<'a, f32>, ArrayView2<'a, f32>)>,
    {
        let mut total_loss = 0.;
        let mut samples = 0;

        for (x, y) in batches {
            let y_pred = self.forward(x)?;
            total_loss += loss_fn.loss(y_pred.view(), y) * x.nrows() as f32;
            samples += x.nrows();

            let Self {
                layers,
                params,
                grad,
            } = self;

            grad.fill(0.);
            let mut d = loss_fn.loss_prime(y_pred.view(), y);
            let mut end = params.len();

            for layer in layers.iter_mut().rev() {
                let start = end - layer.size();
                d = layer.backward(&params[start..end], &mut grad[start..end], d)?;
                end = start;
            }

            optimizer.update_params(grad, params)?;
        }

        if samples == 0 {
            return Err(MlErr::EmptyDataset);
        }

        Ok(total_loss / samples as f32)
    }
}

#[cfg(test)]
mod tests {
    use ndarray::array;
    use rand::{SeedableRng, rngs::StdRng};

    use super::*;
    use crate::{arch::loss::SparseCrossEntropy, optimization::GradientDescent};

    fn classifier(seed: u64) -> Sequential {
        let rng = Rc::new(RefCell::new(StdRng::seed_from_u64(seed)));
        let layers = [Layer::lstm(1, 4), Layer::dense((4, 3)), Layer::softmax()];
        Sequential::initialized(layers, &rng).unwrap()
    }

    #[test]
    fn parameters_must_fit_the_layers() {
        let layers = [Layer::dense((2, 2))];
        assert!(Sequential::new(layers.clone(), vec![0.; 5]).is_err());
        assert!(Sequential::new(layers, vec![0.; 6]).is_ok());
    }

    #[test]
    fn output_rows_are_distributions() {
        let mut model = classifier(0);
        let y = model.forward(array![[0.], [3.], [9.]].view()).unwrap();

        assert_eq!(y.dim(), (3, 3));
        for row in y.rows() {
            assert!((row.sum() - 1.).abs() < 1e-5);
            assert!(row.iter().all(|&p| p >= 0.));
        }
    }

    #[test]
    fn same_seed_same_initial_parameters() {
        assert_eq!(classifier(3).params(), classifier(3).params());
        assert_ne!(classifier(3).params(), classifier(4).params());
    }

    #[test]
    fn backprop_reduces_the_loss() {
        let mut model = classifier(1);
        let mut optimizer = GradientDescent::new(0.5);
        let loss_fn = SparseCrossEntropy::new();
        let x = array![[1.], [2.]];
        let y = array![[2.], [0.]];

        let batches = || std::iter::once((x.view(), y.view()));
        let first = model.backprop(&mut optimizer, &loss_fn, batches()).unwrap();
        let mut last = first;
        for _ in 0..50 {
            last = model.backprop(&mut optimizer, &loss_fn, batches()).unwrap();
        }

        assert!(last < first);
    }

    #[test]
    fn backprop_over_no_batches_fails() {
        let mut model = classifier(1);
        let mut optimizer = GradientDescent::new(0.1);
        let empty = std::iter::empty::<(ArrayView2<f32>, ArrayView2<f32>)>();

        let result = model.backprop(&mut optimizer, &SparseCrossEntropy::new(), empty);
        assert!(matches!(result, Err(MlErr::EmptyDataset)));
    }
}
