//! `GetDeep(path)`, also written as a bare `a.b.c`

use std::fmt;

use crate::query::error::{QueryError, QueryResult};
use crate::query::expression::{take_args, BoxedExpression, Expression};
use crate::query::literal::Literal;
use crate::query::path::get_deep;
use crate::query::value::Value;

/// Looks a dotted path up in the event; missing paths evaluate to `Null`
pub struct GetDeep {
    path: BoxedExpression,
}

impl GetDeep {
    pub fn from_args(function: &str, args: Vec<BoxedExpression>) -> QueryResult<Self> {
        let [path] = take_args(function, args)?;
        Ok(Self { path })
    }

    /// Shorthand form: the whole statement is the path
    pub fn from_path(path: &str) -> QueryResult<Self> {
        if !is_path(path) {
            return Err(QueryError::InvalidPath(path.to_string()));
        }
        Ok(Self {
            path: Box::new(Literal::new(Value::Str(path.to_string()))),
        })
    }

    pub fn build(function: &str, args: Vec<BoxedExpression>) -> QueryResult<BoxedExpression> {
        Ok(Box::new(Self::from_args(function, args)?))
    }
}

fn is_path(s: &str) -> bool {
    !s.is_empty()
        && !s
            .chars()
            .any(|c| c.is_whitespace() || matches!(c, '(' | ')' | ',' | '"' | '\'' | '`'))
}

impl Expression for GetDeep {
    fn evaluate(&mut self, data: &serde_json::Value) -> QueryResult<Value> {
        let key = self.path.evaluate(data)?;
        match key.as_str() {
            Some(path) if !path.is_empty() => {
                Ok(get_deep(path, data).map(Value::from_json).unwrap_or(Value::Null))
            }
            _ => Err(QueryError::ExpectedString {
                found: key.type_name(),
                value: key.to_string(),
            }),
        }
    }
}

impl fmt::Display for GetDeep {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_lookup_and_miss() {
        let data = json!({"user": {"age": 31}, "tags": ["a", "b"]});

        let mut gd = GetDeep::from_path("user.age").unwrap();
        assert_eq!(gd.evaluate(&data).unwrap(), Value::Float(31.0));
        assert_eq!(gd.to_string(), "user.age");

        let mut gd = GetDeep::from_path("tags.1").unwrap();
        assert_eq!(gd.evaluate(&data).unwrap(), Value::from("b"));

        let mut gd = GetDeep::from_path("user.name").unwrap();
        assert_eq!(gd.evaluate(&data).unwrap(), Value::Null);
    }

    #[test]
    fn test_non_string_key_is_error() {
        let mut gd = GetDeep::from_args("GetDeep", vec![Box::new(Literal::new(Value::Int(3)))])
            .unwrap();
        let err = gd.evaluate(&json!({})).unwrap_err();
        assert!(matches!(err, QueryError::ExpectedString { found: "int", .. }));

        let mut gd =
            GetDeep::from_args("GetDeep", vec![Box::new(Literal::new(Value::from("")))]).unwrap();
        assert!(gd.evaluate(&json!({})).is_err());
    }

    #[test]
    fn test_invalid_shorthand() {
        assert!(GetDeep::from_path("").is_err());
        assert!(GetDeep::from_path("a b").is_err());
        assert!(GetDeep::from_path("a,b").is_err());
    }
}
