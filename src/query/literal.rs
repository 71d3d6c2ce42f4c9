//! Literal Parser
//!
//! Recognizes, in order, an integer, a float, and a quoted string. Double and
//! single quoted strings resolve backslash escapes; backtick strings are raw.

use nom::{
    branch::alt,
    bytes::complete::{escaped_transform, is_not, take_while},
    character::complete::char,
    combinator::{all_consuming, map, opt, value},
    sequence::delimited,
    IResult,
};
use std::fmt;

use super::error::{QueryError, QueryResult};
use super::expression::Expression;
use super::value::Value;

/// Parse a token as a literal value
pub fn parse_literal(token: &str) -> QueryResult<Value> {
    if let Ok(i) = token.parse::<i64>() {
        return Ok(Value::Int(i));
    }
    if looks_numeric(token) {
        if let Ok(f) = token.parse::<f64>() {
            return Ok(Value::Float(f));
        }
    }
    match all_consuming(quoted_string)(token) {
        Ok((_, s)) => Ok(Value::Str(s)),
        Err(_) => Err(QueryError::UnparseableLiteral(token.to_string())),
    }
}

/// Keeps words like `inf` or `nan` available as path names
fn looks_numeric(token: &str) -> bool {
    !token.is_empty()
        && token
            .chars()
            .all(|c| c.is_ascii_digit() || matches!(c, '+' | '-' | '.' | 'e' | 'E'))
}

fn quoted_string(input: &str) -> IResult<&str, String> {
    alt((
        delimited(char('"'), escaped_body("\\\""), char('"')),
        delimited(char('\''), escaped_body("\\'"), char('\'')),
        map(
            delimited(char('`'), take_while(|c| c != '`'), char('`')),
            str::to_string,
        ),
    ))(input)
}

/// Body of an escaping string; `stop` holds the backslash and the closing quote
fn escaped_body(stop: &'static str) -> impl FnMut(&str) -> IResult<&str, String> {
    move |input| {
        map(
            opt(escaped_transform(is_not(stop), '\\', escape_code)),
            Option::unwrap_or_default,
        )(input)
    }
}

fn escape_code(input: &str) -> IResult<&str, &str> {
    alt((
        value("\\", char('\\')),
        value("\"", char('"')),
        value("'", char('\'')),
        value("`", char('`')),
        value("\n", char('n')),
        value("\t", char('t')),
        value("\r", char('r')),
        value("\0", char('0')),
    ))(input)
}

/// Constant leaf of an expression tree
#[derive(Debug, Clone)]
pub struct Literal {
    value: Value,
}

impl Literal {
    pub fn new(value: Value) -> Self {
        Self { value }
    }

    pub fn parse(token: &str) -> QueryResult<Self> {
        parse_literal(token).map(Self::new)
    }

    pub fn value(&self) -> &Value {
        &self.value
    }
}

impl Expression for Literal {
    fn evaluate(&mut self, _data: &serde_json::Value) -> QueryResult<Value> {
        Ok(self.value.clone())
    }
}

impl fmt::Display for Literal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.value)
    }
}
