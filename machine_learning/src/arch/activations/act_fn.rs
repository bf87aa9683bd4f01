use super::{Sigmoid, Tanh};

/// An element-wise activation function.
///
/// The derivatives are expressed in terms of the activation's *output*, since that is what the
/// recurrent layers keep around between the forward and the backward pass.
#[derive(Clone, Copy, Debug)]
pub enum ActFn {
    Sigmoid(Sigmoid),
    Tanh(Tanh),
}

impl ActFn {
    pub fn sigmoid(amp: f32) -> Self {
        Self::Sigmoid(Sigmoid::new(amp))
    }

    pub fn tanh() -> Self {
        Self::Tanh(Tanh)
    }

    pub fn f(&self, z: f32) -> f32 {
        match self {
            Self::Sigmoid(a) => a.f(z),
            Self::Tanh(a) => a.f(z),
        }
    }

    /// The derivative of the activation given its output `a = f(z)`.
    pub fn df(&self, a: f32) -> f32 {
        match self {
            Self::Sigmoid(act) => act.df(a),
            Self::Tanh(act) => act.df(a),
        }
    }
}
