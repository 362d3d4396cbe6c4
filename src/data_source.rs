//! Abstract account-intelligence data source and a run-scoped response cache.

use crate::errors::AppError;
use crate::models::ContentBlock;
use crate::parsing::extract_structured_payload;
use async_trait::async_trait;
use moka::future::Cache;
use serde_json::Value;
use sha2::{Digest, Sha256};
use std::sync::Arc;
use std::time::Duration;

/// Logical tool names exposed by the account-intelligence server.
pub mod tools {
    pub const FIRMOGRAPHIC: &str = "company_firmographic";
    pub const TECHNOGRAPHIC: &str = "company_technographic";
    pub const CLOUD_SPEND: &str = "company_cloud_spend";
    pub const SPEND: &str = "company_spend";
    pub const CONTRACTS: &str = "company_contracts";
    pub const FUNCTIONAL_AREAS: &str = "company_fai";
}

/// Anything that can execute a named remote tool and return its content blocks.
#[async_trait]
pub trait DataSource: Send + Sync {
    async fn call_tool(&self, name: &str, params: Value) -> Result<Vec<ContentBlock>, AppError>;
}

#[async_trait]
impl<T: DataSource + ?Sized> DataSource for Arc<T> {
    async fn call_tool(&self, name: &str, params: Value) -> Result<Vec<ContentBlock>, AppError> {
        (**self).call_tool(name, params).await
    }
}

/// Caches successful tool responses for the lifetime of one batch.
///
/// A domain that fails halfway and is retried does not refetch the calls that
/// already succeeded, and a domain listed twice costs one set of calls.
/// Failures are never cached, and neither are responses without a structured
/// payload, so a retry after a data format error queries the tool again.
pub struct CachedDataSource<'a> {
    inner: &'a dyn DataSource,
    cache: Cache<String, Arc<Vec<ContentBlock>>>,
}

impl<'a> CachedDataSource<'a> {
    pub fn new(inner: &'a dyn DataSource, ttl: Duration) -> Self {
        let cache = Cache::builder()
            .time_to_live(ttl)
            .max_capacity(10_000)
            .build();
        Self { inner, cache }
    }

    /// Stable key for a tool call: SHA-256 of the tool name and its canonical params.
    pub fn cache_key(name: &str, params: &Value) -> String {
        let mut hasher = Sha256::new();
        hasher.update(name.as_bytes());
        hasher.update(b"\n");
        hasher.update(params.to_string().as_bytes());
        hex::encode(hasher.finalize())
    }
}

#[async_trait]
impl DataSource for CachedDataSource<'_> {
    async fn call_tool(&self, name: &str, params: Value) -> Result<Vec<ContentBlock>, AppError> {
        let key = Self::cache_key(name, &params);

        if let Some(cached) = self.cache.get(&key).await {
            tracing::debug!("Tool cache hit: {}", name);
            return Ok(cached.as_ref().clone());
        }

        let blocks = self.inner.call_tool(name, params).await?;
        if extract_structured_payload(&blocks).is_ok() {
            self.cache.insert(key, Arc::new(blocks.clone())).await;
        } else {
            tracing::debug!("Not caching {} response without a structured payload", name);
        }
        Ok(blocks)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct CountingSource {
        calls: AtomicUsize,
        fail: bool,
        prose: bool,
    }

    #[async_trait]
    impl DataSource for CountingSource {
        async fn call_tool(
            &self,
            _name: &str,
            _params: Value,
        ) -> Result<Vec<ContentBlock>, AppError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if self.fail {
                return Err(AppError::ExternalApiError("boom".into()));
            }
            if self.prose {
                return Ok(vec![ContentBlock::text("Service temporarily busy, try again")]);
            }
            Ok(vec![ContentBlock::text("{}")])
        }
    }

    #[test]
    fn test_cache_key_is_order_independent() {
        let a = CachedDataSource::cache_key(
            tools::SPEND,
            &json!({"companyDomain": "acme.com", "limit": 5}),
        );
        let b = CachedDataSource::cache_key(
            tools::SPEND,
            &json!({"limit": 5, "companyDomain": "acme.com"}),
        );
        let c = CachedDataSource::cache_key(
            tools::CONTRACTS,
            &json!({"companyDomain": "acme.com", "limit": 5}),
        );

        assert_eq!(a, b);
        assert_ne!(a, c);
        assert_eq!(a.len(), 64);
    }

    #[tokio::test]
    async fn test_successful_calls_are_cached() {
        let source = CountingSource {
            calls: AtomicUsize::new(0),
            fail: false,
            prose: false,
        };
        let cached = CachedDataSource::new(&source, Duration::from_secs(60));

        let params = json!({"companyDomain": "acme.com"});
        cached.call_tool(tools::FIRMOGRAPHIC, params.clone()).await.unwrap();
        cached.call_tool(tools::FIRMOGRAPHIC, params).await.unwrap();
        cached
            .call_tool(tools::FIRMOGRAPHIC, json!({"companyDomain": "other.com"}))
            .await
            .unwrap();

        assert_eq!(source.calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_failures_are_not_cached() {
        let source = CountingSource {
            calls: AtomicUsize::new(0),
            fail: true,
            prose: false,
        };
        let cached = CachedDataSource::new(&source, Duration::from_secs(60));

        let params = json!({"companyDomain": "acme.com"});
        assert!(cached.call_tool(tools::SPEND, params.clone()).await.is_err());
        assert!(cached.call_tool(tools::SPEND, params).await.is_err());

        assert_eq!(source.calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_responses_without_payload_are_not_cached() {
        let source = CountingSource {
            calls: AtomicUsize::new(0),
            fail: false,
            prose: true,
        };
        let cached = CachedDataSource::new(&source, Duration::from_secs(60));

        let params = json!({"companyDomain": "acme.com"});
        cached.call_tool(tools::FIRMOGRAPHIC, params.clone()).await.unwrap();
        cached.call_tool(tools::FIRMOGRAPHIC, params).await.unwrap();

        assert_eq!(source.calls.load(Ordering::SeqCst), 2);
    }
}
