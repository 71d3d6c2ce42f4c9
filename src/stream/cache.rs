//! Recency cache
//!
//! Bounded FIFO of recently seen events, keyed by the string value of one
//! configured field. Eviction removes the key and its event together.

use std::collections::{HashMap, VecDeque};

use super::distributor::Event;
use crate::query::get_deep;

/// Default number of cached events per feed
pub const DEFAULT_CACHE_CAPACITY: usize = 64;

#[derive(Debug)]
pub struct RecencyCache {
    key_field: String,
    capacity: usize,
    /// Keys oldest first
    order: VecDeque<String>,
    entries: HashMap<String, Event>,
}

impl RecencyCache {
    pub fn new(key_field: impl Into<String>, capacity: usize) -> Self {
        Self {
            key_field: key_field.into(),
            capacity,
            order: VecDeque::with_capacity(capacity + 1),
            entries: HashMap::with_capacity(capacity + 1),
        }
    }

    pub fn key_field(&self) -> &str {
        &self.key_field
    }

    /// Cache `event` under its key field; returns false if it has no string key
    ///
    /// A key seen again replaces the stored event and becomes the newest.
    pub fn record(&mut self, event: &Event) -> bool {
        let Some(key) = get_deep(&self.key_field, event).and_then(|v| v.as_str()) else {
            return false;
        };

        if self.entries.insert(key.to_string(), Event::clone(event)).is_some() {
            if let Some(pos) = self.order.iter().position(|k| k == key) {
                self.order.remove(pos);
            }
        }
        self.order.push_back(key.to_string());

        while self.order.len() > self.capacity {
            if let Some(oldest) = self.order.pop_front() {
                self.entries.remove(&oldest);
            }
        }
        true
    }

    pub fn get(&self, key: &str) -> Option<Event> {
        self.entries.get(key).cloned()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::sync::Arc;

    fn event(id: &str, n: i64) -> Event {
        Arc::new(json!({"meta": {"id": id}, "n": n}))
    }

    #[test]
    fn test_lookup_by_key() {
        let mut cache = RecencyCache::new("meta.id", 4);
        assert!(cache.record(&event("a", 1)));
        assert_eq!(cache.get("a").unwrap()["n"], json!(1));
        assert!(cache.get("b").is_none());
    }

    #[test]
    fn test_missing_or_non_string_key_not_cached() {
        let mut cache = RecencyCache::new("meta.id", 4);
        assert!(!cache.record(&Arc::new(json!({"n": 1}))));
        assert!(!cache.record(&Arc::new(json!({"meta": {"id": 7}}))));
        assert!(cache.is_empty());
    }

    #[test]
    fn test_fifo_eviction_drops_key_and_value() {
        let mut cache = RecencyCache::new("meta.id", DEFAULT_CACHE_CAPACITY);
        for i in 0..(DEFAULT_CACHE_CAPACITY + 10) {
            cache.record(&event(&format!("k{}", i), i as i64));
        }
        assert_eq!(cache.len(), DEFAULT_CACHE_CAPACITY);
        assert_eq!(cache.order.len(), DEFAULT_CACHE_CAPACITY);
        assert!(cache.get("k9").is_none());
        assert!(cache.get("k10").is_some());
        assert!(cache.get(&format!("k{}", DEFAULT_CACHE_CAPACITY + 9)).is_some());
    }

    #[test]
    fn test_repeated_key_refreshes() {
        let mut cache = RecencyCache::new("meta.id", 2);
        cache.record(&event("a", 1));
        cache.record(&event("b", 2));
        cache.record(&event("a", 3));
        cache.record(&event("c", 4));

        // "b" was the oldest once "a" was refreshed
        assert!(cache.get("b").is_none());
        assert_eq!(cache.get("a").unwrap()["n"], json!(3));
        assert_eq!(cache.len(), 2);
        assert_eq!(cache.order.len(), 2);
    }
}
