//! `Add`, `Subtract`, `Multiply` and `Divide` over two float operands

use std::fmt;

use crate::query::error::{QueryError, QueryResult};
use crate::query::expression::{take_args, BoxedExpression, Expression};
use crate::query::value::Value;

/// Binary operator applied by an [`Arithmetic`] node
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArithmeticOp {
    Add,
    Subtract,
    Multiply,
    Divide,
}

impl ArithmeticOp {
    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            "Add" => Some(Self::Add),
            "Subtract" => Some(Self::Subtract),
            "Multiply" => Some(Self::Multiply),
            "Divide" => Some(Self::Divide),
            _ => None,
        }
    }

    /// IEEE semantics: dividing by zero gives an infinity or NaN
    pub fn apply(&self, a: f64, b: f64) -> f64 {
        match self {
            Self::Add => a + b,
            Self::Subtract => a - b,
            Self::Multiply => a * b,
            Self::Divide => a / b,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Self::Add => "Add",
            Self::Subtract => "Subtract",
            Self::Multiply => "Multiply",
            Self::Divide => "Divide",
        }
    }
}

pub struct Arithmetic {
    op: ArithmeticOp,
    lhs: BoxedExpression,
    rhs: BoxedExpression,
}

impl Arithmetic {
    pub fn from_args(function: &str, args: Vec<BoxedExpression>) -> QueryResult<Self> {
        let op = ArithmeticOp::from_name(function).ok_or_else(|| QueryError::InvalidArgument {
            function: function.to_string(),
            message: "not a supported arithmetic operator".to_string(),
        })?;
        let [lhs, rhs] = take_args(function, args)?;
        Ok(Self { op, lhs, rhs })
    }

    pub fn build(function: &str, args: Vec<BoxedExpression>) -> QueryResult<BoxedExpression> {
        Ok(Box::new(Self::from_args(function, args)?))
    }

    fn operand(&self, index: usize, value: &Value) -> QueryResult<f64> {
        value.as_f64().ok_or_else(|| QueryError::OperandType {
            function: self.op.name().to_string(),
            operand: index,
            found: value.type_name(),
        })
    }
}

impl Expression for Arithmetic {
    fn evaluate(&mut self, data: &serde_json::Value) -> QueryResult<Value> {
        // Both sides see every event so windows underneath stay in step
        let a = self.lhs.evaluate(data);
        let b = self.rhs.evaluate(data);
        let (a, b) = (a?, b?);
        let a = self.operand(1, &a)?;
        let b = self.operand(2, &b)?;
        Ok(Value::Float(self.op.apply(a, b)))
    }
}

impl fmt::Display for Arithmetic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}({},{})", self.op.name(), self.lhs, self.rhs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::query::nodes::GetDeep;
    use serde_json::json;

    fn path(p: &str) -> BoxedExpression {
        Box::new(GetDeep::from_path(p).unwrap())
    }

    #[test]
    fn test_ops() {
        let data = json!({"a": 6, "b": 3});
        for (name, expected) in [
            ("Add", 9.0),
            ("Subtract", 3.0),
            ("Multiply", 18.0),
            ("Divide", 2.0),
        ] {
            let mut node = Arithmetic::from_args(name, vec![path("a"), path("b")]).unwrap();
            assert_eq!(node.evaluate(&data).unwrap(), Value::Float(expected), "{}", name);
        }
    }

    #[test]
    fn test_failing_lhs_still_feeds_rhs_window() {
        let mut node =
            crate::query::parse("Add(WindowAve(RollingWindow(a,3)), WindowSum(RollingWindow(b,3)))")
                .unwrap();
        assert_eq!(
            node.evaluate(&json!({"b": 5})).unwrap_err(),
            QueryError::EmptyWindow
        );
        assert_eq!(
            node.evaluate(&json!({"a": 1, "b": 7})).unwrap(),
            Value::Float(13.0)
        );
    }

    #[test]
    fn test_divide_by_zero_is_infinite() {
        let data = json!({"a": 1, "z": 0});
        let mut node = Arithmetic::from_args("Divide", vec![path("a"), path("z")]).unwrap();
        let v = node.evaluate(&data).unwrap().as_f64().unwrap();
        assert!(v.is_infinite());
    }

    #[test]
    fn test_operand_type_names_operand() {
        let data = json!({"a": 1, "s": "text"});
        let mut node = Arithmetic::from_args("Add", vec![path("a"), path("s")]).unwrap();
        let err = node.evaluate(&data).unwrap_err();
        assert_eq!(
            err,
            QueryError::OperandType {
                function: "Add".to_string(),
                operand: 2,
                found: "string",
            }
        );
    }

    #[test]
    fn test_display() {
        let node = Arithmetic::from_args("Subtract", vec![path("a.b"), path("c")]).unwrap();
        assert_eq!(node.to_string(), "Subtract(a.b,c)");
    }
}
