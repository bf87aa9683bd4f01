use std::{cell::RefCell, rc::Rc};

use ndarray::{Array2, ArrayView2, Axis, linalg, s};
use rand::Rng;

use super::recurrent::RecurrentDims;
use crate::{
    MlErr, Result,
    arch::activations::ActFn,
    initialization::{ConstParamGen, ParamGen},
};

#[derive(Clone)]
struct GruStep {
    x: Array2<f32>,
    h_prev: Array2<f32>,
    /// The activated update and reset gates, in `[update, reset]` column blocks.
    zr: Array2<f32>,
    /// `r ⊙ h_prev`, the state as seen by the candidate.
    rh: Array2<f32>,
    candidate: Array2<f32>,
}

/// A gated recurrent unit layer.
///
/// Gates are laid out as update, reset and candidate, with the reset gate applied before the
/// recurrent kernel:
///
/// ```text
/// z = σ(x W_z + h U_z + b_z)    r = σ(x W_r + h U_r + b_r)
/// h̃ = tanh(x W_h + (r ⊙ h) U_h + b_h)
/// h' = z ⊙ h + (1 - z) ⊙ h̃
/// ```
#[derive(Clone)]
pub struct Gru {
    dims: RecurrentDims,
    act_fn: ActFn,
    recurrent_act_fn: ActFn,

    steps: Vec<GruStep>,
}

impl Gru {
    /// Creates a new `Gru` with `tanh` as activation and a sigmoid for the gates.
    ///
    /// # Arguments
    /// * `n_in` - The amount of features per timestep.
    /// * `units` - The dimension of the hidden state.
    pub fn new(n_in: usize, units: usize) -> Self {
        Self {
            dims: RecurrentDims::new(n_in, units, 3),
            act_fn: ActFn::tanh(),
            recurrent_act_fn: ActFn::sigmoid(1.),
            steps: Vec::new(),
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
        let (n_in, units) = (self.dims.n_in, self.dims.units);

        let u_zr = u.slice(s![.., ..2 * units]);
        let u_h = u.slice(s![.., 2 * units..]);

        let mut h = Array2::<f32>::zeros((x.nrows(), units));
        self.steps.clear();

        for t in 0..steps {
            let x_t = x.slice(s![.., t * n_in..(t + 1) * n_in]).to_owned();
            let xw = x_t.dot(&w) + &b;

            let mut zr = &xw.slice(s![.., ..2 * units]) + &h.dot(&u_zr);
            zr.mapv_inplace(|z| self.recurrent_act_fn.f(z));

            let z = zr.slice(s![.., ..units]);
            let rh = &zr.slice(s![.., units..]) * &h;

            let mut candidate = &xw.slice(s![.., 2 * units..]) + &rh.dot(&u_h);
            candidate.mapv_inplace(|z| self.act_fn.f(z));

            let h_next = &z * &h + &z.mapv(|z| 1. - z) * &candidate;

            self.steps.push(GruStep {
                x: x_t,
                h_prev: h,
                zr,
                rh,
                candidate,
            });

            h = h_next;
        }

        Ok(h)
    }

    pub fn backward(
        &mut self,
        params: &[f32],
        grad: &mut [f32],
        d: Array2<f32>,
    ) -> Result<Array2<f32>> {
        if self.steps.is_empty() {
            return Err(MlErr::NoForwardPass { layer: "gru" });
        }

        let (w, u, _) = self.dims.view_params(params)?;
        let (mut dw, mut du, mut db) = self.dims.view_grad(grad)?;
        let (n_in, units) = (self.dims.n_in, self.dims.units);
        let (act_fn, rec_fn) = (self.act_fn, self.recurrent_act_fn);

        let u_zr = u.slice(s![.., ..2 * units]);
        let u_h = u.slice(s![.., 2 * units..]);

        let batch = d.nrows();
        let mut dx = Array2::zeros((batch, self.steps.len() * n_in));
        let mut da = Array2::<f32>::zeros((batch, self.dims.width()));
        let mut dh = d;

        for (t, step) in self.steps.iter().enumerate().rev() {
            let z = step.zr.slice(s![.., ..units]);
            let r = step.zr.slice(s![.., units..]);

            let mut d_z = &dh * &(&step.h_prev - &step.candidate);
            let mut d_candidate = &dh * &z.mapv(|z| 1. - z);
            let mut dh_prev = &dh * &z;

            d_candidate.zip_mut_with(&step.candidate, |d, &a| *d *= act_fn.df(a));
            linalg::general_mat_mul(
                1.,
                &step.rh.t(),
                &d_candidate,
                1.,
                &mut du.slice_mut(s![.., 2 * units..]),
            );

            let d_rh = d_candidate.dot(&u_h.t());
            let mut d_r = &d_rh * &step.h_prev;
            dh_prev += &(&d_rh * &r);

            d_z.zip_mut_with(&z, |d, &a| *d *= rec_fn.df(a));
            d_r.zip_mut_with(&r, |d, &a| *d *= rec_fn.df(a));

            da.slice_mut(s![.., ..units]).assign(&d_z);
            da.slice_mut(s![.., units..2 * units]).assign(&d_r);
            da.slice_mut(s![.., 2 * units..]).assign(&d_candidate);

            let da_zr = da.slice(s![.., ..2 * units]);
            linalg::general_mat_mul(
                1.,
                &step.h_prev.t(),
                &da_zr,
                1.,
                &mut du.slice_mut(s![.., ..2 * units]),
            );
            dh_prev += &da_zr.dot(&u_zr.t());

            linalg::general_mat_mul(1., &step.x.t(), &da, 1., &mut dw);
            db += &da.sum_axis(Axis(0));

            dx.slice_mut(s![.., t * n_in..(t + 1) * n_in])
                .assign(&da.dot(&w.t()));
            dh = dh_prev;
        }

        Ok(dx)
    }
}
