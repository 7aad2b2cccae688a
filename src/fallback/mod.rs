//! Fallback chain resolution
//!
//! When the primary operation of a dependency is exhausted (or its circuit
//! is open) the resolver walks two tiers, in order:
//!
//! 1. **Dynamic fallbacks** supplied by the caller, e.g. a cache lookup or a
//!    cheaper alternative service. Each gets exactly one attempt.
//! 2. **Static fallbacks**: canned degraded data looked up by
//!    `(dependency, identifier)` for every identifier in the dependency's
//!    configured `fallback_chain`. No network call is made.
//!
//! If neither tier produces a value the call fails with
//! [`ResilienceError::Exhausted`].

pub mod cache;

pub use cache::{LastKnownGood, LastKnownGoodConfig};

use crate::error::{ResilienceError, Result};
use crate::metrics;
use futures::future::BoxFuture;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashMap;
use tracing::{debug, info, warn};

/// A caller-supplied degraded alternative, attempted at most once
pub type FallbackOp<'a, T> = BoxFuture<'a, anyhow::Result<T>>;

/// Immutable table of canned degraded responses
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct StaticFallbacks(HashMap<String, HashMap<String, Value>>);

impl StaticFallbacks {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add an entry, builder style
    pub fn with(mut self, dependency: &str, identifier: &str, data: Value) -> Self {
        self.0
            .entry(dependency.to_string())
            .or_default()
            .insert(identifier.to_string(), data);
        self
    }

    /// Look up an entry. Missing and empty entries both return `None`.
    pub fn get(&self, dependency: &str, identifier: &str) -> Option<&Value> {
        self.0
            .get(dependency)
            .and_then(|entries| entries.get(identifier))
            .filter(|data| !is_empty(data))
    }

    /// Number of dependencies with at least one entry
    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

fn is_empty(data: &Value) -> bool {
    match data {
        Value::Null => true,
        Value::String(s) => s.is_empty(),
        Value::Array(items) => items.is_empty(),
        Value::Object(fields) => fields.is_empty(),
        _ => false,
    }
}

/// Resolves the fallback chain of one dependency
pub struct FallbackResolver<'a> {
    name: &'a str,
    chain: &'a [String],
    data: &'a StaticFallbacks,
}

impl<'a> FallbackResolver<'a> {
    pub fn new(name: &'a str, chain: &'a [String], data: &'a StaticFallbacks) -> Self {
        Self { name, chain, data }
    }

    /// Try dynamic fallbacks, then static data, returning the first success
    pub async fn resolve<T>(&self, fallbacks: Vec<FallbackOp<'_, T>>) -> Result<T>
    where
        T: DeserializeOwned,
    {
        let total = fallbacks.len();
        for (index, fallback) in fallbacks.into_iter().enumerate() {
            match fallback.await {
                Ok(value) => {
                    info!(
                        dependency = %self.name,
                        fallback = index,
                        "Served response from dynamic fallback"
                    );
                    metrics::record_fallback(self.name, "dynamic");
                    return Ok(value);
                }
                Err(e) => {
                    warn!(
                        dependency = %self.name,
                        fallback = index,
                        remaining = total - index - 1,
                        error = %e,
                        "Dynamic fallback failed"
                    );
                }
            }
        }

        for identifier in self.chain {
            let Some(data) = self.data.get(self.name, identifier) else {
                debug!(
                    dependency = %self.name,
                    fallback = %identifier,
                    "No static fallback data"
                );
                continue;
            };

            match serde_json::from_value::<T>(data.clone()) {
                Ok(value) => {
                    info!(
                        dependency = %self.name,
                        fallback = %identifier,
                        "Served response from static fallback"
                    );
                    metrics::record_fallback(self.name, "static");
                    return Ok(value);
                }
                Err(e) => {
                    warn!(
                        dependency = %self.name,
                        fallback = %identifier,
                        error = %e,
                        "Static fallback data does not match the expected type"
                    );
                }
            }
        }

        warn!(dependency = %self.name, "All fallback options exhausted");
        metrics::record_fallback(self.name, "exhausted");
        Err(ResilienceError::Exhausted(self.name.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures::FutureExt;
    use serde_json::json;

    fn chain(ids: &[&str]) -> Vec<String> {
        ids.iter().map(|id| id.to_string()).collect()
    }

    #[test]
    fn test_static_fallbacks_lookup() {
        let data = StaticFallbacks::new()
            .with("qloo", "popular_items", json!(["Dune"]))
            .with("qloo", "empty_list", json!([]))
            .with("qloo", "nothing", Value::Null);

        assert_eq!(data.get("qloo", "popular_items"), Some(&json!(["Dune"])));
        assert!(data.get("qloo", "empty_list").is_none());
        assert!(data.get("qloo", "nothing").is_none());
        assert!(data.get("qloo", "missing").is_none());
        assert!(data.get("search", "popular_items").is_none());
        assert_eq!(data.len(), 1);
    }

    #[tokio::test]
    async fn test_dynamic_fallback_wins_over_static() {
        let data = StaticFallbacks::new().with("qloo", "popular_items", json!("static"));
        let chain = chain(&["popular_items"]);
        let resolver = FallbackResolver::new("qloo", &chain, &data);

        let result: String = resolver
            .resolve(vec![async { Ok::<_, anyhow::Error>("dynamic".to_string()) }.boxed()])
            .await
            .unwrap();

        assert_eq!(result, "dynamic");
    }

    #[tokio::test]
    async fn test_failed_dynamic_fallbacks_fall_through_in_order() {
        let data = StaticFallbacks::new();
        let resolver = FallbackResolver::new("qloo", &[], &data);

        let result: String = resolver
            .resolve(vec![
                async { Err(anyhow::anyhow!("cache miss")) }.boxed(),
                async { Ok::<_, anyhow::Error>("second".to_string()) }.boxed(),
                async { Ok::<_, anyhow::Error>("third".to_string()) }.boxed(),
            ])
            .await
            .unwrap();

        assert_eq!(result, "second");
    }

    #[tokio::test]
    async fn test_static_chain_skips_missing_entries() {
        let data = StaticFallbacks::new().with("qloo", "b", json!({"items": ["B"]}));
        let chain = chain(&["a", "b"]);
        let resolver = FallbackResolver::new("qloo", &chain, &data);

        let result: Value = resolver.resolve(vec![]).await.unwrap();
        assert_eq!(result, json!({"items": ["B"]}));
    }

    #[tokio::test]
    async fn test_static_data_of_wrong_type_is_skipped() {
        let data = StaticFallbacks::new()
            .with("llm", "structured", json!({"reply": "hi"}))
            .with("llm", "plain", json!("plain reply"));
        let chain = chain(&["structured", "plain"]);
        let resolver = FallbackResolver::new("llm", &chain, &data);

        let result: String = resolver.resolve(vec![]).await.unwrap();
        assert_eq!(result, "plain reply");
    }

    #[tokio::test]
    async fn test_exhausted_when_nothing_succeeds() {
        let data = StaticFallbacks::new();
        let chain = chain(&["a"]);
        let resolver = FallbackResolver::new("payments", &chain, &data);

        let err = resolver
            .resolve::<Value>(vec![async { Err(anyhow::anyhow!("down")) }.boxed()])
            .await
            .unwrap_err();

        assert!(err.is_exhausted());
        assert_eq!(err.exhausted_dependency(), Some("payments"));
    }
}
