mod dense;
mod gru;
mod layer;
mod lstm;
mod recurrent;
mod simple_rnn;
mod softmax;

pub use dense::Dense;
pub use gru::Gru;
pub use layer::Layer;
pub use lstm::Lstm;
pub use simple_rnn::SimpleRnn;
pub use softmax::Softmax;
