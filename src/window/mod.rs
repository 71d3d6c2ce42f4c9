//! Windowing Subsystem
//!
//! Retention buffers over recently seen values, kept newest-first:
//!
//! - **RollingWindow**: keeps the last `n` elements
//! - **TimedWindow**: keeps elements pushed within the last `n` seconds
//! - **WindowAve / WindowSum**: incremental aggregates over one window
//!
//! # Listener protocol
//!
//! A window reports every admitted element to its listener's `on_push` and
//! every evicted element to `on_pop`, synchronously and in order. The window
//! holds only a [`Weak`] reference: the aggregator owns the window and the
//! listener state, never the other way round. Aggregates stay O(1) per event.
//!
//! ```text
//! WindowAve ──owns──▶ RollingWindow
//!     │                    │
//!     └──owns──▶ RunningSum ◀──weak── listener slot
//! ```

mod aggregate;
mod rolling;
mod timed;

pub use aggregate::{WindowAve, WindowSum};
pub use rolling::RollingWindow;
pub use timed::TimedWindow;

use std::sync::{Arc, Mutex, Weak};

use crate::query::{BoxedExpression, Expression, QueryError, QueryResult, Value};

/// Receives push/evict notifications from a window
pub trait WindowListener: Send {
    fn on_push(&mut self, element: &Value) -> QueryResult<()>;
    fn on_pop(&mut self, element: &Value) -> QueryResult<()>;
}

/// Listener state shared between an aggregator and its window
pub type SharedListener = Arc<Mutex<dyn WindowListener>>;

/// A bounded retention buffer that is also an expression
///
/// Evaluating a window admits the current element (when non-null) and
/// returns the newest element, or `Null` while empty.
pub trait Window: Expression {
    /// Insert at the front, then evict from the back down to `bound`
    ///
    /// `bound` is an element count or a number of seconds depending on the kind.
    fn push(&mut self, element: Value, bound: u64) -> QueryResult<()>;

    fn len(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Contents front (newest) to back (oldest)
    fn contents(&self) -> Vec<Value>;

    /// Replace the registered listener
    fn set_listener(&mut self, listener: Weak<Mutex<dyn WindowListener>>);
}

/// At most one listener, held weakly
#[derive(Default)]
pub(crate) struct ListenerSlot {
    listener: Option<Weak<Mutex<dyn WindowListener>>>,
}

impl ListenerSlot {
    pub(crate) fn set(&mut self, listener: Weak<Mutex<dyn WindowListener>>) {
        self.listener = Some(listener);
    }

    pub(crate) fn push(&self, element: &Value) -> QueryResult<()> {
        self.notify(|l| l.on_push(element))
    }

    pub(crate) fn pop(&self, element: &Value) -> QueryResult<()> {
        self.notify(|l| l.on_pop(element))
    }

    fn notify(
        &self,
        f: impl FnOnce(&mut dyn WindowListener) -> QueryResult<()>,
    ) -> QueryResult<()> {
        let Some(listener) = self.listener.as_ref().and_then(Weak::upgrade) else {
            return Ok(());
        };
        let mut guard = listener
            .lock()
            .map_err(|e| QueryError::Listener(e.to_string()))?;
        f(&mut *guard)
    }
}

/// Evaluate a bound expression that must yield a non-negative integer
pub(crate) fn evaluate_bound(
    function: &str,
    bound: &mut BoxedExpression,
    data: &serde_json::Value,
) -> QueryResult<u64> {
    match bound.evaluate(data)? {
        Value::Int(n) if n >= 0 => Ok(n as u64),
        other => Err(QueryError::InvalidBound {
            function: function.to_string(),
            found: other.type_name(),
        }),
    }
}
