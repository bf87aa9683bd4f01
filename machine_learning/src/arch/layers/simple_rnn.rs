use std::{cell::RefCell, rc::Rc};

use ndarray::{Array2, ArrayView2, Axis, linalg, s};
use rand::Rng;

use super::recurrent::RecurrentDims;
use crate::{
    MlErr, Result,
    arch::activations::ActFn,
    initialization::{ConstParamGen, ParamGen},
};

/// A fully-connected recurrent layer: `h_t = act(x_t W + h_{t-1} U + b)`.
///
/// The input holds `timesteps * n_in` columns per row, the state starts at zero and the output
/// is the state after the last timestep.
#[derive(Clone)]
pub struct SimpleRnn {
    dims: RecurrentDims,
    act_fn: ActFn,

    // Forward metadata, `hs[0]` is the initial state.
    xs: Vec<Array2<f32>>,
    hs: Vec<Array2<f32>>,
}

impl SimpleRnn {
    /// Creates a new `SimpleRnn` with a `tanh` activation.
    ///
    /// # Arguments
    /// * `n_in` - The amount of features per timestep.
    /// * `units` - The dimension of the hidden state.
    pub fn new(n_in: usize, units: usize) -> Self {
        Self {
            dims: RecurrentDims::new(n_in, units, 1),
            act_fn: ActFn::tanh(),
            xs: Vec::new(),
            hs: Vec::new(),
        }
    }

    /// Returns the amount of parameters this layer has.
    pub fn size(&self) -> usize {
        self.dims.size()
    }

    pub fn param_gen<R: Rng + 'static>(&self, rng: &Rc<RefCell<R>>) -> Result<Box<dyn ParamGen>> {
        let bias = ConstParamGen::zeros(self.dims.width());
        let param_gen = self.dims.param_gen(rng, vec![Box::new(bias)])?;
        Ok(Box::new(param_gen))
    }

    pub fn forward(&mut self, params: &[f32], x: ArrayView2<f32>) -> Result<Array2<f32>> {
        let (w, u, b) = self.dims.view_params(params)?;
        let steps = self.dims.timesteps(x.ncols())?;
        let n_in = self.dims.n_in;

        let mut h = Array2::<f32>::zeros((x.nrows(), self.dims.units));
        self.xs.clear();
        self.hs.clear();
        self.hs.push(h.clone());

        for t in 0..steps {
            let x_t = x.slice(s![.., t * n_in..(t + 1) * n_in]).to_owned();

            let mut z = x_t.dot(&w) + h.dot(&u) + &b;
            z.mapv_inplace(|z| self.act_fn.f(z));
            h = z;

            self.xs.push(x_t);
            self.hs.push(h.clone());
        }

        Ok(h)
    }

    pub fn backward(
        &mut self,
        params: &[f32],
        grad: &mut [f32],
        d: Array2<f32>,
    ) -> Result<Array2<f32>> {
        if self.xs.is_empty() {
            return Err(MlErr::NoForwardPass {
                layer: "simple_rnn",
            });
        }

        let (w, u, _) = self.dims.view_params(params)?;
        let (mut dw, mut du, mut db) = self.dims.view_grad(grad)?;
        let n_in = self.dims.n_in;
        let steps = self.xs.len();

        let mut dx = Array2::zeros((d.nrows(), steps * n_in));
        let mut dh = d;

        for t in (0..steps).rev() {
            let (x_t, h_prev, h) = (&self.xs[t], &self.hs[t], &self.hs[t + 1]);

            let mut dz = dh;
            dz.zip_mut_with(h, |d, &a| *d *= self.act_fn.df(a));

            linalg::general_mat_mul(1., &x_t.t(), &dz, 1., &mut dw);
            linalg::general_mat_mul(1., &h_prev.t(), &dz, 1., &mut du);
            db += &dz.sum_axis(Axis(0));

            dx.slice_mut(s![.., t * n_in..(t + 1) * n_in])
                .assign(&dz.dot(&w.t()));
            dh = dz.dot(&u.t());
        }

        Ok(dx)
    }
}
