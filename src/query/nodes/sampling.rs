//! Downsampling pass-throughs: `EveryNth(element, n)` and
//! `RandomSample(element, probability)`
//!
//! Both evaluate their element on every call, so windows nested inside keep
//! advancing, and report `Null` for the events they skip.

use rand::Rng;
use std::fmt;

use crate::query::error::{QueryError, QueryResult};
use crate::query::expression::{take_args, BoxedExpression, Expression};
use crate::query::value::Value;
use crate::window::evaluate_bound;

pub struct EveryNth {
    element: BoxedExpression,
    n: BoxedExpression,
    seen: u64,
}

impl EveryNth {
    pub fn from_args(function: &str, args: Vec<BoxedExpression>) -> QueryResult<Self> {
        let [element, n] = take_args(function, args)?;
        Ok(Self {
            element,
            n,
            seen: 0,
        })
    }

    pub fn build(function: &str, args: Vec<BoxedExpression>) -> QueryResult<BoxedExpression> {
        Ok(Box::new(Self::from_args(function, args)?))
    }
}

impl Expression for EveryNth {
    fn evaluate(&mut self, data: &serde_json::Value) -> QueryResult<Value> {
        let value = self.element.evaluate(data)?;
        let n = evaluate_bound("EveryNth", &mut self.n, data)?;
        if n == 0 {
            return Err(QueryError::InvalidArgument {
                function: "EveryNth".to_string(),
                message: "n must be positive".to_string(),
            });
        }
        let hit = self.seen % n == 0;
        self.seen = self.seen.wrapping_add(1);
        Ok(if hit { value } else { Value::Null })
    }
}

impl fmt::Display for EveryNth {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "EveryNth({},{})", self.element, self.n)
    }
}

pub struct RandomSample {
    element: BoxedExpression,
    probability: BoxedExpression,
}

impl RandomSample {
    pub fn from_args(function: &str, args: Vec<BoxedExpression>) -> QueryResult<Self> {
        let [element, probability] = take_args(function, args)?;
        Ok(Self {
            element,
            probability,
        })
    }

    pub fn build(function: &str, args: Vec<BoxedExpression>) -> QueryResult<BoxedExpression> {
        Ok(Box::new(Self::from_args(function, args)?))
    }
}

impl Expression for RandomSample {
    fn evaluate(&mut self, data: &serde_json::Value) -> QueryResult<Value> {
        let value = self.element.evaluate(data)?;
        let p = match self.probability.evaluate(data)? {
            Value::Float(p) => p,
            Value::Int(p) => p as f64,
            other => {
                return Err(QueryError::InvalidArgument {
                    function: "RandomSample".to_string(),
                    message: format!("probability must be numeric, got {}", other.type_name()),
                })
            }
        };
        if !(0.0..=1.0).contains(&p) {
            return Err(QueryError::InvalidArgument {
                function: "RandomSample".to_string(),
                message: format!("probability {} is outside [0, 1]", p),
            });
        }
        Ok(if rand::rng().random_bool(p) {
            value
        } else {
            Value::Null
        })
    }
}

impl fmt::Display for RandomSample {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "RandomSample({},{})", self.element, self.probability)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::query::literal::Literal;
    use crate::query::nodes::GetDeep;
    use serde_json::json;

    fn args(path: &str, second: Value) -> Vec<BoxedExpression> {
        vec![
            Box::new(GetDeep::from_path(path).unwrap()),
            Box::new(Literal::new(second)),
        ]
    }

    #[test]
    fn test_every_nth() {
        let mut node = EveryNth::from_args("EveryNth", args("v", Value::Int(3))).unwrap();
        let out: Vec<Value> = (1..=7)
            .map(|i| node.evaluate(&json!({ "v": i })).unwrap())
            .collect();
        assert_eq!(
            out,
            vec![
                Value::Float(1.0),
                Value::Null,
                Value::Null,
                Value::Float(4.0),
                Value::Null,
                Value::Null,
                Value::Float(7.0),
            ]
        );
    }

    #[test]
    fn test_every_nth_rejects_zero() {
        let mut node = EveryNth::from_args("EveryNth", args("v", Value::Int(0))).unwrap();
        assert!(node.evaluate(&json!({"v": 1})).is_err());
    }

    #[test]
    fn test_random_sample_extremes() {
        let data = json!({"v": 5});
        let mut always = RandomSample::from_args("RandomSample", args("v", Value::Int(1))).unwrap();
        let mut never =
            RandomSample::from_args("RandomSample", args("v", Value::Float(0.0))).unwrap();
        for _ in 0..20 {
            assert_eq!(always.evaluate(&data).unwrap(), Value::Float(5.0));
            assert_eq!(never.evaluate(&data).unwrap(), Value::Null);
        }
    }

    #[test]
    fn test_random_sample_out_of_range() {
        let mut node =
            RandomSample::from_args("RandomSample", args("v", Value::Float(1.5))).unwrap();
        assert!(node.evaluate(&json!({"v": 1})).is_err());
    }
}
