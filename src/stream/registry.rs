//! Feed registry
//!
//! Maps feed names to their distributors so every query on the same feed
//! shares one upstream connection.

use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;

use super::distributor::{DataStream, DistributorConfig};

/// Lazily created distributors, one per feed name
#[derive(Clone)]
pub struct StreamRegistry {
    streams: Arc<RwLock<HashMap<String, DataStream>>>,
    config: DistributorConfig,
}

impl StreamRegistry {
    pub fn new(config: DistributorConfig) -> Self {
        Self {
            streams: Arc::new(RwLock::new(HashMap::new())),
            config,
        }
    }

    /// Distributor for `name`, starting one on first use
    pub async fn get(&self, name: &str) -> DataStream {
        let streams = self.streams.read().await;
        if let Some(stream) = streams.get(name) {
            return stream.clone();
        }
        drop(streams);

        let mut streams = self.streams.write().await;
        streams
            .entry(name.to_string())
            .or_insert_with(|| {
                tracing::debug!(feed = name, "Creating distributor");
                DataStream::spawn(name, self.config.clone())
            })
            .clone()
    }

    /// Registered feed names, sorted
    pub async fn names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.streams.read().await.keys().cloned().collect();
        names.sort();
        names
    }

    pub async fn len(&self) -> usize {
        self.streams.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.streams.read().await.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_get_reuses_distributor() {
        let registry = StreamRegistry::new(DistributorConfig::default());
        assert!(registry.is_empty().await);

        let a = registry.get("requests").await;
        let b = registry.get("requests").await;
        let c = registry.get("errors").await;

        assert_eq!(a.name(), "requests");
        assert_eq!(b.name(), "requests");
        assert_eq!(c.name(), "errors");
        assert_eq!(registry.len().await, 2);
        assert_eq!(registry.names().await, vec!["errors", "requests"]);
    }
}
