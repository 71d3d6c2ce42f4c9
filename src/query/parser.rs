//! Statement Parser
//!
//! # Grammar
//!
//! ```text
//! statement := literal | call | path
//! call      := Name "(" arg ("," arg)* ")"
//! arg       := statement
//! path      := token ("." token)*
//! literal   := integer | float | quoted-string
//! ```
//!
//! # Examples
//!
//! ```text
//! Add(1, 2)
//! As(Divide(bytes, 1024), "kib")
//! WindowAve(RollingWindow(response.latency_ms, 100))
//! request.headers.host
//! ```

use nom::{
    character::complete::{alphanumeric1, char},
    sequence::terminated,
    IResult,
};

use super::error::{QueryError, QueryResult};
use super::expression::BoxedExpression;
use super::literal::Literal;
use super::nodes::GetDeep;
use super::registry::FunctionRegistry;

/// Parse a statement with the built-in functions
pub fn parse(statement: &str) -> QueryResult<BoxedExpression> {
    Parser::new(FunctionRegistry::global()).parse(statement)
}

/// Statement parser over a function registry
#[derive(Clone, Copy)]
pub struct Parser<'r> {
    registry: &'r FunctionRegistry,
}

impl<'r> Parser<'r> {
    pub fn new(registry: &'r FunctionRegistry) -> Self {
        Self { registry }
    }

    /// Parse a statement into a fresh, independently-owned tree
    pub fn parse(&self, statement: &str) -> QueryResult<BoxedExpression> {
        let statement = statement.trim();

        if let Ok(literal) = Literal::parse(statement) {
            return Ok(Box::new(literal));
        }

        let Some((name, raw_args)) = split_call(statement)? else {
            return Ok(Box::new(GetDeep::from_path(statement)?));
        };

        let args = raw_args
            .iter()
            .map(|arg| self.parse(arg))
            .collect::<QueryResult<Vec<_>>>()?;

        self.registry.build(name, args)
    }
}

/// `Name(` at the start of a statement
fn call_head(input: &str) -> IResult<&str, &str> {
    terminated(alphanumeric1, char('('))(input)
}

/// Split `Name(arg, ...)` into the name and its raw argument strings
///
/// Returns `Ok(None)` when the statement does not start with `Name(`.
pub fn split_call(statement: &str) -> QueryResult<Option<(&str, Vec<String>)>> {
    let Ok((rest, name)) = call_head(statement) else {
        return Ok(None);
    };
    let body = rest
        .strip_suffix(')')
        .ok_or_else(|| QueryError::UnbalancedParentheses(statement.to_string()))?;
    Ok(Some((name, split_args(body)?)))
}

/// Split an argument list on top-level commas
///
/// Whitespace is dropped outside quotes and kept inside them. The first quote
/// character seen opens a string that only the same character closes.
pub fn split_args(body: &str) -> QueryResult<Vec<String>> {
    let mut args = Vec::new();
    let mut current = String::new();
    let mut depth = 0usize;
    let mut quote: Option<char> = None;
    let mut escaped = false;

    for c in body.chars() {
        if let Some(open) = quote {
            current.push(c);
            if escaped {
                escaped = false;
            } else if c == '\\' && open != '`' {
                escaped = true;
            } else if c == open {
                quote = None;
            }
            continue;
        }

        match c {
            '"' | '`' | '\'' => {
                quote = Some(c);
                current.push(c);
            }
            '(' => {
                depth += 1;
                current.push(c);
            }
            ')' => {
                depth = depth
                    .checked_sub(1)
                    .ok_or_else(|| QueryError::UnbalancedParentheses(body.to_string()))?;
                current.push(c);
            }
            ',' if depth == 0 => {
                if current.is_empty() {
                    return Err(QueryError::EmptyArgument(body.to_string()));
                }
                args.push(std::mem::take(&mut current));
            }
            c if c.is_whitespace() => {}
            c => current.push(c),
        }
    }

    if quote.is_some() {
        return Err(QueryError::UnterminatedQuote(body.to_string()));
    }
    if depth != 0 {
        return Err(QueryError::UnbalancedParentheses(body.to_string()));
    }
    if current.is_empty() {
        // `Name()` has no arguments; `Name(a,)` has an empty one
        if !args.is_empty() {
            return Err(QueryError::EmptyArgument(body.to_string()));
        }
        return Ok(args);
    }
    args.push(current);
    Ok(args)
}
