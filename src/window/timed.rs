//! Time-bounded window: `TimedWindow(element, seconds)`

use std::collections::VecDeque;
use std::fmt;
use std::sync::{Mutex, Weak};
use std::time::{Duration, Instant};

use super::{evaluate_bound, ListenerSlot, Window, WindowListener};
use crate::query::{take_args, BoxedExpression, Expression, QueryResult, Value};

/// Element tagged with the instant it was admitted
struct Timestamped {
    value: Value,
    at: Instant,
}

/// Keeps the elements pushed within the last `seconds`
///
/// Elements strictly older than `now - length` are evicted oldest-first on
/// every evaluation, whether or not the current event admits a new element.
pub struct TimedWindow {
    element: BoxedExpression,
    length: BoxedExpression,
    buffer: VecDeque<Timestamped>,
    listener: ListenerSlot,
}

impl TimedWindow {
    pub fn from_args(function: &str, args: Vec<BoxedExpression>) -> QueryResult<Self> {
        let [element, length] = take_args(function, args)?;
        Ok(Self {
            element,
            length,
            buffer: VecDeque::new(),
            listener: ListenerSlot::default(),
        })
    }

    pub fn build(function: &str, args: Vec<BoxedExpression>) -> QueryResult<BoxedExpression> {
        Ok(Box::new(Self::from_args(function, args)?))
    }

    /// Push with an explicit clock reading
    pub fn push_at(&mut self, element: Value, length: Duration, now: Instant) -> QueryResult<()> {
        self.buffer.push_front(Timestamped {
            value: element,
            at: now,
        });
        let result = self.listener.push(&self.buffer[0].value);
        if result.is_err() {
            self.buffer.pop_front();
        }
        result.and(self.expire_at(length, now))
    }

    /// Evict everything admitted before `now - length`
    pub fn expire_at(&mut self, length: Duration, now: Instant) -> QueryResult<()> {
        // Nothing can be older than the clock's origin
        let Some(window_start) = now.checked_sub(length) else {
            return Ok(());
        };

        let mut result = Ok(());
        while self
            .buffer
            .back()
            .is_some_and(|oldest| oldest.at < window_start)
        {
            if let Some(evicted) = self.buffer.pop_back() {
                result = result.and(self.listener.pop(&evicted.value));
            }
        }
        result
    }
}

impl Expression for TimedWindow {
    fn evaluate(&mut self, data: &serde_json::Value) -> QueryResult<Value> {
        let value = self.element.evaluate(data)?;
        let length = Duration::from_secs(evaluate_bound("TimedWindow", &mut self.length, data)?);
        let now = Instant::now();
        if value.is_null() {
            self.expire_at(length, now)?;
        } else {
            self.push_at(value, length, now)?;
        }
        Ok(self
            .buffer
            .front()
            .map(|e| e.value.clone())
            .unwrap_or(Value::Null))
    }

    fn as_window(&mut self) -> Option<&mut dyn Window> {
        Some(self)
    }
}

impl Window for TimedWindow {
    fn push(&mut self, element: Value, bound: u64) -> QueryResult<()> {
        self.push_at(element, Duration::from_secs(bound), Instant::now())
    }

    fn len(&self) -> usize {
        self.buffer.len()
    }

    fn contents(&self) -> Vec<Value> {
        self.buffer.iter().map(|e| e.value.clone()).collect()
    }

    fn set_listener(&mut self, listener: Weak<Mutex<dyn WindowListener>>) {
        self.listener.set(listener);
    }
}

impl fmt::Display for TimedWindow {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "TimedWindow({},{})", self.element, self.length)
    }
}
