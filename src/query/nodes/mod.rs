//! Expression node library
//!
//! Window nodes and their aggregators live in [`crate::window`].

mod alias;
mod arithmetic;
mod get_deep;
mod sampling;

pub use alias::Alias;
pub use arithmetic::{Arithmetic, ArithmeticOp};
pub use get_deep::GetDeep;
pub use sampling::{EveryNth, RandomSample};
