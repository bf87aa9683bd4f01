use std::{
    error::Error,
    fmt::{self, Display},
};

use ndarray::ShapeError;
use rand_distr::uniform::Error as UniformError;

/// The result type used in the entire machine learning module.
pub type Result<T> = std::result::Result<T, MlErr>;

/// The machine learning module's error type.
#[derive(Debug)]
pub enum MlErr {
    SizeMismatch {
        what: &'static str,
        got: usize,
        expected: usize,
    },
    Shape(ShapeError),
    NoForwardPass {
        layer: &'static str,
    },
    InvalidTarget {
        class: usize,
        classes: usize,
    },
    InvalidInit(String),
    EmptyDataset,
    Diverged {
        epoch: usize,
    },
}

impl Display for MlErr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MlErr::SizeMismatch {
                what,
                got,
                expected,
            } => write!(
                f,
                "There's a size mismatch for {what}, got {got} and expected {expected}"
            ),
            MlErr::Shape(e) => write!(f, "Invalid array shape: {e}"),
            MlErr::NoForwardPass { layer } => write!(
                f,
                "Tried to backpropagate through a {layer} layer before forwarding through it"
            ),
            MlErr::InvalidTarget { class, classes } => write!(
                f,
                "The target class {class} is out of range, the model has {classes} classes"
            ),
            MlErr::InvalidInit(msg) => write!(f, "Failed to initialize parameters: {msg}"),
            MlErr::EmptyDataset => write!(f, "Tried to train over an empty dataset"),
            MlErr::Diverged { epoch } => {
                write!(f, "The training diverged at epoch {epoch}, the loss is not finite")
            }
        }
    }
}

impl Error for MlErr {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            MlErr::Shape(e) => Some(e),
            _ => None,
        }
    }
}

impl From<ShapeError> for MlErr {
    fn from(value: ShapeError) -> Self {
        Self::Shape(value)
    }
}

impl From<UniformError> for MlErr {
    fn from(value: UniformError) -> Self {
        Self::InvalidInit(value.to_string())
    }
}
