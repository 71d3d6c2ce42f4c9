//! Query error types
//!
//! Defines every error that can occur while parsing a statement or evaluating
//! an expression tree against an event.

use thiserror::Error;

/// Errors that can occur during query operations
#[derive(Error, Debug, Clone, PartialEq)]
pub enum QueryError {
    /// Token is not an integer, float or quoted string
    #[error("Couldn't parse {0} as a literal")]
    UnparseableLiteral(String),

    /// Argument list has unmatched parentheses
    #[error("Unbalanced parentheses in \"{0}\"")]
    UnbalancedParentheses(String),

    /// Argument list ends inside a quoted string
    #[error("Unbalanced quote marks in \"{0}\"")]
    UnterminatedQuote(String),

    /// Two commas with nothing between them, or a trailing comma
    #[error("Empty argument in \"{0}\"")]
    EmptyArgument(String),

    /// Statement is neither a literal, a call, nor a dotted path
    #[error("\"{0}\" is not a literal, function call or path")]
    InvalidPath(String),

    /// No node is registered under this function name
    #[error("Unrecognized function name '{0}'")]
    UnrecognizedFunction(String),

    /// Function was called with the wrong number of arguments
    #[error("{function} expects {expected} argument(s), got {got}")]
    Arity {
        function: String,
        expected: usize,
        got: usize,
    },

    /// Argument has the right count but the wrong kind (e.g. WindowAve of a non-window)
    #[error("{function}: {message}")]
    InvalidArgument { function: String, message: String },

    /// Path key evaluated to something other than a non-empty string
    #[error("Expected non-empty string. Was type {found} \"{value}\"")]
    ExpectedString { found: &'static str, value: String },

    /// Arithmetic operand was not numeric
    #[error("{function} expects a number, operand {operand} was type {found}")]
    OperandType {
        function: String,
        operand: usize,
        found: &'static str,
    },

    /// Window bound did not evaluate to a non-negative integer
    #[error("{function} expects a non-negative integer bound, got type {found}")]
    InvalidBound {
        function: String,
        found: &'static str,
    },

    /// Aggregator received a non-numeric element from its window
    #[error("Window expected a number, got {value} ({found})")]
    ListenerValue { found: &'static str, value: String },

    /// Average requested over a window holding no elements
    #[error("Empty window")]
    EmptyWindow,

    /// Aggregate state could not be accessed
    #[error("Listener error: {0}")]
    Listener(String),
}

/// Result type for query operations
pub type QueryResult<T> = Result<T, QueryError>;
