//! Count-bounded window: `RollingWindow(element, size)`

use std::collections::VecDeque;
use std::fmt;
use std::sync::{Mutex, Weak};

use super::{evaluate_bound, ListenerSlot, Window, WindowListener};
use crate::query::{take_args, BoxedExpression, Expression, QueryResult, Value};

pub struct RollingWindow {
    element: BoxedExpression,
    size: BoxedExpression,
    buffer: VecDeque<Value>,
    listener: ListenerSlot,
}

impl RollingWindow {
    pub fn from_args(function: &str, args: Vec<BoxedExpression>) -> QueryResult<Self> {
        let [element, size] = take_args(function, args)?;
        Ok(Self {
            element,
            size,
            buffer: VecDeque::new(),
            listener: ListenerSlot::default(),
        })
    }

    pub fn build(function: &str, args: Vec<BoxedExpression>) -> QueryResult<BoxedExpression> {
        Ok(Box::new(Self::from_args(function, args)?))
    }
}

impl Expression for RollingWindow {
    fn evaluate(&mut self, data: &serde_json::Value) -> QueryResult<Value> {
        let value = self.element.evaluate(data)?;
        let size = evaluate_bound("RollingWindow", &mut self.size, data)?;
        if !value.is_null() {
            self.push(value, size)?;
        }
        Ok(self.buffer.front().cloned().unwrap_or(Value::Null))
    }

    fn as_window(&mut self) -> Option<&mut dyn Window> {
        Some(self)
    }
}

impl Window for RollingWindow {
    fn push(&mut self, element: Value, bound: u64) -> QueryResult<()> {
        self.buffer.push_front(element);
        let mut result = self.listener.push(&self.buffer[0]);
        // A rejected element must not count towards the aggregate's length
        if result.is_err() {
            self.buffer.pop_front();
        }

        while self.buffer.len() as u64 > bound {
            if let Some(evicted) = self.buffer.pop_back() {
                result = result.and(self.listener.pop(&evicted));
            }
        }
        result
    }

    fn len(&self) -> usize {
        self.buffer.len()
    }

    fn contents(&self) -> Vec<Value> {
        self.buffer.iter().cloned().collect()
    }

    fn set_listener(&mut self, listener: Weak<Mutex<dyn WindowListener>>) {
        self.listener.set(listener);
    }
}

impl fmt::Display for RollingWindow {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "RollingWindow({},{})", self.element, self.size)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::query::{parse, Literal};
    use crate::window::test_support::attach;
    use serde_json::json;

    fn window(size: i64) -> RollingWindow {
        RollingWindow::from_args(
            "RollingWindow",
            vec![
                parse("v").unwrap(),
                Box::new(Literal::new(Value::Int(size))),
            ],
        )
        .unwrap()
    }

    #[test]
    fn test_rolling_window_evicts_oldest() {
        let mut w = window(3);
        let recorder = attach(&mut w);

        for i in 1..=4 {
            let front = w.evaluate(&json!({ "v": i })).unwrap();
            assert_eq!(front, Value::Float(i as f64));
        }

        assert_eq!(
            w.contents(),
            vec![Value::Float(4.0), Value::Float(3.0), Value::Float(2.0)]
        );
        let recorder = recorder.lock().unwrap();
        assert_eq!(recorder.pushed.len(), 4);
        assert_eq!(recorder.popped, vec![Value::Float(1.0)]);
    }

    #[test]
    fn test_null_element_not_pushed() {
        let mut w = window(3);
        w.evaluate(&json!({"v": 1})).unwrap();
        let front = w.evaluate(&json!({"other": 2})).unwrap();
        assert_eq!(front, Value::Float(1.0));
        assert_eq!(w.len(), 1);
    }

    #[test]
    fn test_empty_window_evaluates_null() {
        let mut w = window(2);
        assert_eq!(w.evaluate(&json!({})).unwrap(), Value::Null);
        assert!(w.is_empty());
    }

    #[test]
    fn test_bound_must_be_integer() {
        let mut w = RollingWindow::from_args(
            "RollingWindow",
            vec![parse("v").unwrap(), parse("size").unwrap()],
        )
        .unwrap();
        // JSON numbers are floats, never integer bounds
        assert!(w.evaluate(&json!({"v": 1, "size": 3})).is_err());

        let mut w = window(-1);
        assert!(w.evaluate(&json!({"v": 1})).is_err());
    }

    #[test]
    fn test_shrinking_bound_evicts_in_order() {
        let mut w = window(3);
        let recorder = attach(&mut w);
        for i in 1..=3 {
            w.push(Value::Float(i as f64), 3).unwrap();
        }
        w.push(Value::Float(4.0), 1).unwrap();

        assert_eq!(w.contents(), vec![Value::Float(4.0)]);
        assert_eq!(
            recorder.lock().unwrap().popped,
            vec![Value::Float(1.0), Value::Float(2.0), Value::Float(3.0)]
        );
    }

    #[test]
    fn test_dropped_listener_is_ignored() {
        let mut w = window(1);
        drop(attach(&mut w));
        w.push(Value::Float(1.0), 1).unwrap();
        w.push(Value::Float(2.0), 1).unwrap();
        assert_eq!(w.len(), 1);
    }
}
