//! `As(value, alias)`

use std::fmt;

use crate::query::error::QueryResult;
use crate::query::expression::{take_args, BoxedExpression, Expression};
use crate::query::value::Value;

/// Passes its value through unchanged and renders as the alias
///
/// The alias is evaluated on every call. A failed or non-string alias leaves
/// no label, and the node renders as its value child instead.
pub struct Alias {
    value: BoxedExpression,
    alias: BoxedExpression,
    label: Option<String>,
}

impl Alias {
    pub fn from_args(function: &str, args: Vec<BoxedExpression>) -> QueryResult<Self> {
        let [value, alias] = take_args(function, args)?;
        Ok(Self {
            value,
            alias,
            label: None,
        })
    }

    pub fn build(function: &str, args: Vec<BoxedExpression>) -> QueryResult<BoxedExpression> {
        Ok(Box::new(Self::from_args(function, args)?))
    }

    pub fn label(&self) -> Option<&str> {
        self.label.as_deref()
    }
}

impl Expression for Alias {
    fn evaluate(&mut self, data: &serde_json::Value) -> QueryResult<Value> {
        // Alias errors are dropped on purpose: they cannot affect the value.
        self.label = match self.alias.evaluate(data) {
            Ok(Value::Str(s)) => Some(s),
            _ => None,
        };
        self.value.evaluate(data)
    }
}

impl fmt::Display for Alias {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.label {
            Some(label) => write!(f, "{}", label),
            None => write!(f, "{}", self.value),
        }
    }
}
