//! Expression trait shared by every node kind
//!
//! A parsed statement is a tree of boxed expressions. Nodes own their children
//! outright and some keep state between evaluations (windows, aliases), so a
//! tree is a single-owner query instance: evaluate it from one task at a time.

use std::fmt;

use super::error::{QueryError, QueryResult};
use super::value::Value;
use crate::window::Window;

/// A node of a query tree
pub trait Expression: fmt::Display + Send {
    /// Evaluate against one event, possibly advancing internal state
    fn evaluate(&mut self, data: &serde_json::Value) -> QueryResult<Value>;

    /// Window view of this node, for aggregators that attach to one
    fn as_window(&mut self) -> Option<&mut dyn Window> {
        None
    }
}

/// Owned node of a query tree
pub type BoxedExpression = Box<dyn Expression>;

impl fmt::Debug for dyn Expression {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Expression({})", self)
    }
}

/// Destructure an argument list of exactly `N` children
pub fn take_args<const N: usize>(
    function: &str,
    args: Vec<BoxedExpression>,
) -> QueryResult<[BoxedExpression; N]> {
    let got = args.len();
    args.try_into().map_err(|_| QueryError::Arity {
        function: function.to_string(),
        expected: N,
        got,
    })
}
