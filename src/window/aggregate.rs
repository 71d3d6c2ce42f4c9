//! Incremental window aggregates: `WindowAve(window)` and `WindowSum(window)`

use std::fmt;
use std::sync::{Arc, Mutex};

use super::{SharedListener, WindowListener};
use crate::query::{take_args, BoxedExpression, Expression, QueryError, QueryResult, Value};

/// Running total maintained from push/pop notifications
#[derive(Debug, Default)]
struct RunningSum {
    sum: f64,
}

fn float_of(element: &Value) -> QueryResult<f64> {
    element.as_f64().ok_or_else(|| QueryError::ListenerValue {
        found: element.type_name(),
        value: element.to_string(),
    })
}

impl WindowListener for RunningSum {
    fn on_push(&mut self, element: &Value) -> QueryResult<()> {
        self.sum += float_of(element)?;
        Ok(())
    }

    fn on_pop(&mut self, element: &Value) -> QueryResult<()> {
        self.sum -= float_of(element)?;
        Ok(())
    }
}

/// A window plus the running sum registered as its listener
struct Attached {
    window: BoxedExpression,
    state: Arc<Mutex<RunningSum>>,
}

impl Attached {
    fn new(function: &str, args: Vec<BoxedExpression>) -> QueryResult<Self> {
        let [mut window] = take_args(function, args)?;
        let state = Arc::new(Mutex::new(RunningSum::default()));
        let listener: SharedListener = state.clone();

        window
            .as_window()
            .ok_or_else(|| QueryError::InvalidArgument {
                function: function.to_string(),
                message: "expects a single Window argument".to_string(),
            })?
            .set_listener(Arc::downgrade(&listener));

        Ok(Self { window, state })
    }

    /// Let the window admit the current event, then read (sum, len)
    fn admit(&mut self, data: &serde_json::Value) -> QueryResult<(f64, usize)> {
        self.window.evaluate(data)?;
        let len = self.window.as_window().map(|w| w.len()).unwrap_or(0);
        let sum = self
            .state
            .lock()
            .map_err(|e| QueryError::Listener(e.to_string()))?
            .sum;
        Ok((sum, len))
    }
}

/// Running average of a window's elements
pub struct WindowAve {
    inner: Attached,
}

impl WindowAve {
    pub fn from_args(function: &str, args: Vec<BoxedExpression>) -> QueryResult<Self> {
        Ok(Self {
            inner: Attached::new(function, args)?,
        })
    }

    pub fn build(function: &str, args: Vec<BoxedExpression>) -> QueryResult<BoxedExpression> {
        Ok(Box::new(Self::from_args(function, args)?))
    }
}

impl Expression for WindowAve {
    fn evaluate(&mut self, data: &serde_json::Value) -> QueryResult<Value> {
        let (sum, len) = self.inner.admit(data)?;
        if len == 0 {
            return Err(QueryError::EmptyWindow);
        }
        Ok(Value::Float(sum / len as f64))
    }
}

impl fmt::Display for WindowAve {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "WindowAve({})", self.inner.window)
    }
}

/// Running sum of a window's elements; zero while empty
pub struct WindowSum {
    inner: Attached,
}

impl WindowSum {
    pub fn from_args(function: &str, args: Vec<BoxedExpression>) -> QueryResult<Self> {
        Ok(Self {
            inner: Attached::new(function, args)?,
        })
    }

    pub fn build(function: &str, args: Vec<BoxedExpression>) -> QueryResult<BoxedExpression> {
        Ok(Box::new(Self::from_args(function, args)?))
    }
}

impl Expression for WindowSum {
    fn evaluate(&mut self, data: &serde_json::Value) -> QueryResult<Value> {
        let (sum, _) = self.inner.admit(data)?;
        Ok(Value::Float(sum))
    }
}

impl fmt::Display for WindowSum {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "WindowSum({})", self.inner.window)
    }
}
