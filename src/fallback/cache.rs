use super::FallbackOp;
use moka::future::Cache;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};

/// Last-known-good cache configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LastKnownGoodConfig {
    /// Maximum number of remembered responses
    #[serde(default = "default_max_capacity")]
    pub max_capacity: u64,
    /// How long a remembered response may be served, in seconds
    #[serde(default = "default_ttl_secs")]
    pub ttl_secs: u64,
}

fn default_max_capacity() -> u64 {
    1000
}

fn default_ttl_secs() -> u64 {
    900 // 15 minutes
}

impl Default for LastKnownGoodConfig {
    fn default() -> Self {
        Self {
            max_capacity: default_max_capacity(),
            ttl_secs: default_ttl_secs(),
        }
    }
}

/// Remembers successful primary responses so they can be served as a
/// dynamic fallback while the dependency is down.
#[derive(Debug, Clone)]
pub struct LastKnownGood {
    cache: Arc<Cache<String, Value>>,
}

impl LastKnownGood {
    pub fn new(config: LastKnownGoodConfig) -> Self {
        let cache = Cache::builder()
            .max_capacity(config.max_capacity)
            .time_to_live(Duration::from_secs(config.ttl_secs))
            .build();

        info!(
            max_capacity = config.max_capacity,
            ttl_secs = config.ttl_secs,
            "Initialized last-known-good cache"
        );

        Self {
            cache: Arc::new(cache),
        }
    }

    /// Store a response under `key`
    pub async fn remember<T: Serialize>(&self, key: &str, value: &T) {
        match serde_json::to_value(value) {
            Ok(value) => {
                self.cache.insert(key.to_string(), value).await;
                debug!(key = %key, "Remembered last-known-good response");
            }
            Err(e) => {
                warn!(key = %key, error = %e, "Response could not be cached");
            }
        }
    }

    /// Fetch the response stored under `key`
    pub async fn recall<T: DeserializeOwned>(&self, key: &str) -> anyhow::Result<T> {
        let value = self
            .cache
            .get(key)
            .await
            .ok_or_else(|| anyhow::anyhow!("No cached response for key: {}", key))?;

        Ok(serde_json::from_value(value)?)
    }

    /// A fallback operation that recalls `key`
    pub fn fallback<T>(&self, key: &str) -> FallbackOp<'static, T>
    where
        T: DeserializeOwned + Send + 'static,
    {
        let cache = self.clone();
        let key = key.to_string();
        Box::pin(async move { cache.recall(&key).await })
    }

    /// Drop a remembered response
    pub async fn forget(&self, key: &str) {
        self.cache.invalidate(key).await;
    }

    /// Number of remembered responses
    pub fn entry_count(&self) -> u64 {
        self.cache.entry_count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_default_config() {
        let config = LastKnownGoodConfig::default();
        assert_eq!(config.max_capacity, 1000);
        assert_eq!(config.ttl_secs, 900);
    }

    #[tokio::test]
    async fn test_remember_and_recall() {
        let cache = LastKnownGood::new(LastKnownGoodConfig::default());
        cache
            .remember("qloo:user-1", &json!({"recommendations": ["Dune"]}))
            .await;

        let value: Value = cache.recall("qloo:user-1").await.unwrap();
        assert_eq!(value, json!({"recommendations": ["Dune"]}));
    }

    #[tokio::test]
    async fn test_recall_missing_key_fails() {
        let cache = LastKnownGood::new(LastKnownGoodConfig::default());
        let result: anyhow::Result<Value> = cache.recall("qloo:nobody").await;
        assert!(result.is_err());
    }

    #[tokio::test]
    async fn test_fallback_op_recalls_value() {
        let cache = LastKnownGood::new(LastKnownGoodConfig::default());
        cache.remember("search:rust", &vec!["result".to_string()]).await;

        let op = cache.fallback::<Vec<String>>("search:rust");
        assert_eq!(op.await.unwrap(), vec!["result".to_string()]);

        cache.forget("search:rust").await;
        let op = cache.fallback::<Vec<String>>("search:rust");
        assert!(op.await.is_err());
    }
}
