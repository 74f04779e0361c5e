//! Pure summary computation (spec components B and C). Nothing in
//! this module touches the backend or the tree shape.

pub mod evaluator;
pub mod summariser;

pub use evaluator::{evaluate, Carriers, EvaluatorError};
pub use summariser::{summarise, Override, SummariseError, Summarised};
