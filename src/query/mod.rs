//! Rivulet Query Language
//!
//! A small expression language evaluated repeatedly against JSON events:
//!
//! - **Literal**: integers, floats and quoted strings
//! - **Parser**: splits `Name(arg, ...)` calls and builds expression trees
//! - **Registry**: maps function names to node constructors
//! - **Nodes**: path lookup, arithmetic, aliasing, sampling
//!
//! Window nodes and aggregators are in [`crate::window`].
//!
//! # Example
//!
//! ```rust
//! use rivulet::query::{parse, Value};
//! use serde_json::json;
//!
//! let mut query = parse("WindowAve(RollingWindow(latency, 3))").unwrap();
//! for latency in [10, 20, 30, 40] {
//!     query.evaluate(&json!({ "latency": latency })).unwrap();
//! }
//! let avg = query.evaluate(&json!({})).unwrap();
//! assert_eq!(avg, Value::Float(30.0));
//! ```

mod error;
mod expression;
mod literal;
pub mod nodes;
mod parser;
mod path;
mod registry;
mod value;

pub use error::{QueryError, QueryResult};
pub use expression::{take_args, BoxedExpression, Expression};
pub use literal::{parse_literal, Literal};
pub use parser::{parse, split_args, split_call, Parser};
pub use path::get_deep;
pub use registry::{FunctionRegistry, FunctionSpec, NodeFactory};
pub use value::Value;
