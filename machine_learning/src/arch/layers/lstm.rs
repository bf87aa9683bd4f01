use std::{cell::RefCell, ops::Range, rc::Rc};

use ndarray::{Array2, ArrayView2, Axis, linalg, s};
use rand::Rng;

use super::recurrent::RecurrentDims;
use crate::{
    MlErr, Result,
    arch::activations::ActFn,
    initialization::{ConstParamGen, ParamGen},
};

/// Everything a timestep's backward pass needs from its forward pass.
#[derive(Clone)]
struct LstmStep {
    x: Array2<f32>,
    h_prev: Array2<f32>,
    c_prev: Array2<f32>,
    /// The activated gates, in `[input, forget, cell, output]` column blocks.
    gates: Array2<f32>,
    c: Array2<f32>,
}

/// A long short-term memory layer.
///
/// Gates are laid out as input, forget, cell and output:
///
/// ```text
/// i = σ(x W_i + h U_i + b_i)    f = σ(x W_f + h U_f + b_f)
/// g = tanh(x W_c + h U_c + b_c) o = σ(x W_o + h U_o + b_o)
/// c' = f ⊙ c + i ⊙ g            h' = o ⊙ tanh(c')
/// ```
///
/// The forget gate's bias starts at one so the cell remembers by default.
#[derive(Clone)]
pub struct Lstm {
    dims: RecurrentDims,
    act_fn: ActFn,
    recurrent_act_fn: ActFn,

    steps: Vec<LstmStep>,
}

impl Lstm {
    /// Creates a new `Lstm` with `tanh` as activation and a sigmoid for the gates.
    ///
    /// # Arguments
    /// * `n_in` - The amount of features per timestep.
    /// * `units` - The dimension of the hidden and cell states.
    pub fn new(n_in: usize, units: usize) -> Self {
        Self {
            dims: RecurrentDims::new(n_in, units, 4),
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
        let units = self.dims.units;
        let bias: Vec<Box<dyn ParamGen>> = vec![
            Box::new(ConstParamGen::zeros(units)),
            Box::new(ConstParamGen::new(1., units)),
            Box::new(ConstParamGen::zeros(2 * units)),
        ];

        Ok(Box::new(self.dims.param_gen(rng, bias)?))
    }

    fn gate(&self, k: usize) -> Range<usize> {
        let units = self.dims.units;
        k * units..(k + 1) * units
    }

    pub fn forward(&mut self, params: &[f32], x: ArrayView2<f32>) -> Result<Array2<f32>> {
        let (w, u, b) = self.dims.view_params(params)?;
        let steps = self.dims.timesteps(x.ncols())?;
        let n_in = self.dims.n_in;
        let (i, f, g, o) = (self.gate(0), self.gate(1), self.gate(2), self.gate(3));

        let mut h = Array2::<f32>::zeros((x.nrows(), self.dims.units));
        let mut c = h.clone();
        self.steps.clear();

        for t in 0..steps {
            let x_t = x.slice(s![.., t * n_in..(t + 1) * n_in]).to_owned();

            let mut gates = x_t.dot(&w) + h.dot(&u) + &b;
            for (range, act_fn) in [
                (i.start..f.end, self.recurrent_act_fn),
                (g.clone(), self.act_fn),
                (o.clone(), self.recurrent_act_fn),
            ] {
                gates
                    .slice_mut(s![.., range])
                    .mapv_inplace(|z| act_fn.f(z));
            }

            let c_next = &gates.slice(s![.., f.clone()]) * &c
                + &gates.slice(s![.., i.clone()]) * &gates.slice(s![.., g.clone()]);
            let h_next = &gates.slice(s![.., o.clone()]) * &c_next.mapv(|c| self.act_fn.f(c));

            self.steps.push(LstmStep {
                x: x_t,
                h_prev: h,
                c_prev: c,
                gates,
                c: c_next.clone(),
            });

            h = h_next;
            c = c_next;
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
            return Err(MlErr::NoForwardPass { layer: "lstm" });
        }

        let (w, u, _) = self.dims.view_params(params)?;
        let (mut dw, mut du, mut db) = self.dims.view_grad(grad)?;
        let n_in = self.dims.n_in;
        let (i, f, g, o) = (self.gate(0), self.gate(1), self.gate(2), self.gate(3));
        let (act_fn, rec_fn) = (self.act_fn, self.recurrent_act_fn);

        let batch = d.nrows();
        let mut dx = Array2::zeros((batch, self.steps.len() * n_in));
        let mut dgates = Array2::<f32>::zeros((batch, self.dims.width()));
        let mut dh = d;
        let mut dc = Array2::<f32>::zeros(dh.raw_dim());

        for (t, step) in self.steps.iter().enumerate().rev() {
            let gate_i = step.gates.slice(s![.., i.clone()]);
            let gate_f = step.gates.slice(s![.., f.clone()]);
            let gate_g = step.gates.slice(s![.., g.clone()]);
            let gate_o = step.gates.slice(s![.., o.clone()]);
            let tanh_c = step.c.mapv(|c| act_fn.f(c));

            let d_o = &dh * &tanh_c;
            let dc_total = dc + &dh * &gate_o * &tanh_c.mapv(|a| act_fn.df(a));
            let d_i = &dc_total * &gate_g;
            let d_g = &dc_total * &gate_i;
            let d_f = &dc_total * &step.c_prev;
            dc = &dc_total * &gate_f;

            for (range, delta, gate, act_fn) in [
                (&i, d_i, &gate_i, rec_fn),
                (&f, d_f, &gate_f, rec_fn),
                (&g, d_g, &gate_g, act_fn),
                (&o, d_o, &gate_o, rec_fn),
            ] {
                let mut block = dgates.slice_mut(s![.., range.clone()]);
                block.assign(&delta);
                block.zip_mut_with(gate, |d, &a| *d *= act_fn.df(a));
            }

            linalg::general_mat_mul(1., &step.x.t(), &dgates, 1., &mut dw);
            linalg::general_mat_mul(1., &step.h_prev.t(), &dgates, 1., &mut du);
            db += &dgates.sum_axis(Axis(0));

            dx.slice_mut(s![.., t * n_in..(t + 1) * n_in])
                .assign(&dgates.dot(&w.t()));
            dh = dgates.dot(&u.t());
        }

        Ok(dx)
    }
}
