use std::{cell::RefCell, rc::Rc};

use ndarray::{Array2, ArrayView2};
use rand::Rng;

use super::{Dense, Gru, Lstm, SimpleRnn, Softmax};
use crate::{Result, initialization::ParamGen};

#[derive(Clone)]
pub enum Layer {
    Dense(Dense),
    Softmax(Softmax),
    SimpleRnn(SimpleRnn),
    Lstm(Lstm),
    Gru(Gru),
}

impl Layer {
    pub fn dense(dim: (usize, usize)) -> Self {
        Self::Dense(Dense::new(dim))
    }

    pub fn softmax() -> Self {
        Self::Softmax(Softmax::new())
    }

    pub fn simple_rnn(n_in: usize, units: usize) -> Self {
        Self::SimpleRnn(SimpleRnn::new(n_in, units))
    }

    pub fn lstm(n_in: usize, units: usize) -> Self {
        Self::Lstm(Lstm::new(n_in, units))
    }

    pub fn gru(n_in: usize, units: usize) -> Self {
        Self::Gru(Gru::new(n_in, units))
    }

    /// Returns the amount of parameters this layer has.
    pub fn size(&self) -> usize {
        match self {
            Self::Dense(l) => l.size(),
            Self::Softmax(_) => 0,
            Self::SimpleRnn(l) => l.size(),
            Self::Lstm(l) => l.size(),
            Self::Gru(l) => l.size(),
        }
    }

    /// Returns a generator for the initial values of this layer's parameters, `None` for layers
    /// without parameters.
    pub fn param_gen<R: Rng + 'static>(
        &self,
        rng: &Rc<RefCell<R>>,
    ) -> Result<Option<Box<dyn ParamGen>>> {
        let param_gen = match self {
            Self::Dense(l) => l.param_gen(rng)?,
            Self::Softmax(_) => return Ok(None),
            Self::SimpleRnn(l) => l.param_gen(rng)?,
            Self::Lstm(l) => l.param_gen(rng)?,
            Self::Gru(l) => l.param_gen(rng)?,
        };

        Ok(Some(param_gen))
    }

    pub fn forward(&mut self, params: &[f32], x: ArrayView2<f32>) -> Result<Array2<f32>> {
        match self {
            Self::Dense(l) => l.forward(params, x),
            Self::Softmax(l) => Ok(l.forward(x)),
            Self::SimpleRnn(l) => l.forward(params, x),
            Self::Lstm(l) => l.forward(params, x),
            Self::Gru(l) => l.forward(params, x),
        }
    }

    /// Backpropagates `d`, the derivative of the loss with respect to this layer's last output,
    /// writing the parameters' gradient into `grad`.
    ///
    /// # Returns
    /// The derivative of the loss with respect to this layer's input.
    pub fn backward(
        &mut self,
        params: &[f32],
        grad: &mut [f32],
        d: Array2<f32>,
    ) -> Result<Array2<f32>> {
        match self {
            Self::Dense(l) => l.backward(params, grad, d),
            Self::Softmax(l) => l.backward(d),
            Self::SimpleRnn(l) => l.backward(params, grad, d),
            Self::Lstm(l) => l.backward(params, grad, d),
            Self::Gru(l) => l.backward(params, grad, d),
        }
    }
}
