use std::{cell::RefCell, rc::Rc};

use ndarray::{ArrayView1, ArrayView2, ArrayViewMut1, ArrayViewMut2};
use rand::Rng;

use crate::{
    MlErr, Result,
    initialization::{ChainedParamGen, ParamGen, RandParamGen},
};

type Params<'a> = (ArrayView2<'a, f32>, ArrayView2<'a, f32>, ArrayView1<'a, f32>);
type Grads<'a> = (
    ArrayViewMut2<'a, f32>,
    ArrayViewMut2<'a, f32>,
    ArrayViewMut1<'a, f32>,
);

/// The parameter layout every recurrent layer shares.
///
/// The parameter slice holds, in order, the kernel `W` with shape `(n_in, gates * units)`, the
/// recurrent kernel `U` with shape `(units, gates * units)` and the bias with `gates * units`
/// values. Gate `k` owns the columns `k * units..(k + 1) * units` of all three.
#[derive(Clone, Copy, Debug)]
pub(super) struct RecurrentDims {
    pub n_in: usize,
    pub units: usize,
    pub gates: usize,
}

impl RecurrentDims {
    pub fn new(n_in: usize, units: usize, gates: usize) -> Self {
        Self {
            n_in,
            units,
            gates,
        }
    }

    /// The amount of columns of the pre-activations, one block of `units` per gate.
    pub fn width(&self) -> usize {
        self.gates * self.units
    }

    pub fn size(&self) -> usize {
        (self.n_in + self.units + 1) * self.width()
    }

    /// Returns the amount of timesteps packed in an input with `cols` columns.
    pub fn timesteps(&self, cols: usize) -> Result<usize> {
        if cols == 0 || cols % self.n_in != 0 {
            return Err(MlErr::SizeMismatch {
                what: "recurrent input features",
                got: cols,
                expected: self.n_in,
            });
        }

        Ok(cols / self.n_in)
    }

    /// Gives a view of the raw parameter slice as the kernel, recurrent kernel and bias.
    pub fn view_params<'a>(&self, params: &'a [f32]) -> Result<Params<'a>> {
        self.check(params.len())?;

        let width = self.width();
        let (w, rest) = params.split_at(self.n_in * width);
        let (u, b) = rest.split_at(self.units * width);

        Ok((
            ArrayView2::from_shape((self.n_in, width), w)?,
            ArrayView2::from_shape((self.units, width), u)?,
            ArrayView1::from(b),
        ))
    }

    /// Gives a view of the raw gradient slice as the deltas of the kernel, recurrent kernel and
    /// bias.
    pub fn view_grad<'a>(&self, grad: &'a mut [f32]) -> Result<Grads<'a>> {
        self.check(grad.len())?;

        let width = self.width();
        let (dw, rest) = grad.split_at_mut(self.n_in * width);
        let (du, db) = rest.split_at_mut(self.units * width);

        Ok((
            ArrayViewMut2::from_shape((self.n_in, width), dw)?,
            ArrayViewMut2::from_shape((self.units, width), du)?,
            ArrayViewMut1::from(db),
        ))
    }

    /// Chains Xavier uniform generators for both kernels with the given bias generators.
    pub fn param_gen<R>(
        &self,
        rng: &Rc<RefCell<R>>,
        bias: Vec<Box<dyn ParamGen>>,
    ) -> Result<ChainedParamGen>
    where
        R: Rng + 'static,
    {
        let width = self.width();
        let kernel =
            RandParamGen::xavier_uniform(rng.clone(), self.n_in * width, self.n_in, width)?;
        let recurrent =
            RandParamGen::xavier_uniform(rng.clone(), self.units * width, self.units, width)?;

        let mut param_gens: Vec<Box<dyn ParamGen>> = vec![Box::new(kernel), Box::new(recurrent)];
        param_gens.extend(bias);

        Ok(ChainedParamGen::new(param_gens))
    }

    fn check(&self, len: usize) -> Result<()> {
        if len != self.size() {
            return Err(MlErr::SizeMismatch {
                what: "recurrent layer parameters",
                got: len,
                expected: self.size(),
            });
        }

        Ok(())
    }
}
