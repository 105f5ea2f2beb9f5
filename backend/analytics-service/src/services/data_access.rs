//! Cached access to the dashboard collections
//!
//! Each collection is served from the freshness cache while it is inside the
//! window and fetched from the data source otherwise. Fetches are retried with
//! backoff and bounded by a per-attempt timeout; once retries are spent the
//! caller sees a single `FetchFailed`.

use crate::config::FetchConfig;
use crate::error::{AnalyticsError, Result};
use crate::metrics;
use crate::models::{Comment, Post, User};
use crate::services::data_source::DataSource;
use crate::utils::{with_retry, RetryConfig};
use dashboard_cache::{CacheKey, CacheOperations, MemoryCache};
use std::future::Future;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, info};

/// The three collections as of one read
#[derive(Debug, Clone)]
pub struct DashboardSnapshot {
    pub users: Arc<Vec<User>>,
    pub posts: Arc<Vec<Post>>,
    pub comments: Arc<Vec<Comment>>,
}

pub struct DataAccessLayer {
    source: Arc<dyn DataSource>,
    cache: MemoryCache,
    retry: RetryConfig,
    timeout: Duration,
}

impl DataAccessLayer {
    pub fn new(source: Arc<dyn DataSource>, cache: MemoryCache, fetch: &FetchConfig) -> Self {
        Self {
            source,
            cache,
            retry: RetryConfig::from(fetch),
            timeout: fetch.timeout,
        }
    }

    pub fn cache(&self) -> &MemoryCache {
        &self.cache
    }

    pub async fn users(&self) -> Result<Arc<Vec<User>>> {
        self.cached(&CacheKey::users(), "users", || self.source.fetch_users())
            .await
    }

    pub async fn posts(&self) -> Result<Arc<Vec<Post>>> {
        self.cached(&CacheKey::posts(), "posts", || self.source.fetch_posts())
            .await
    }

    pub async fn comments(&self) -> Result<Arc<Vec<Comment>>> {
        self.cached(&CacheKey::comments(), "comments", || {
            self.source.fetch_comments()
        })
        .await
    }

    /// All three collections, fetching the stale ones in parallel
    pub async fn snapshot(&self) -> Result<DashboardSnapshot> {
        let (users, posts, comments) =
            tokio::try_join!(self.users(), self.posts(), self.comments())?;

        Ok(DashboardSnapshot {
            users,
            posts,
            comments,
        })
    }

    /// Drop freshness for every collection and fetch all three again in parallel
    pub async fn refresh_all(&self) -> Result<DashboardSnapshot> {
        let invalidated = self.cache.invalidate_all();
        info!(invalidated, "Refreshing all dashboard collections");
        self.snapshot().await
    }

    async fn cached<T, F, Fut>(&self, key: &str, collection: &str, fetch: F) -> Result<Arc<Vec<T>>>
    where
        T: Send + Sync + 'static,
        F: Fn() -> Fut,
        Fut: Future<Output = Result<Vec<T>>>,
    {
        if let Some(items) = self.cache.get::<Vec<T>>(key)? {
            debug!(collection, "Serving collection from cache");
            return Ok(items);
        }

        let started = Instant::now();
        let timeout = self.timeout;
        let result = with_retry(&self.retry, collection, || {
            let attempt = fetch();
            async move {
                match tokio::time::timeout(timeout, attempt).await {
                    Ok(result) => result,
                    Err(_) => Err(AnalyticsError::FetchFailed(format!(
                        "{} fetch timed out after {}ms",
                        collection,
                        timeout.as_millis()
                    ))),
                }
            }
        })
        .await;

        metrics::record_fetch(collection, result.is_ok(), started.elapsed());

        let items = result.map_err(|e| match e {
            AnalyticsError::FetchFailed(msg) => AnalyticsError::FetchFailed(msg),
            other => AnalyticsError::FetchFailed(format!("{}: {}", collection, other)),
        })?;

        debug!(
            collection,
            count = items.len(),
            elapsed_ms = started.elapsed().as_millis() as u64,
            "Fetched collection"
        );

        Ok(self.cache.set(key, items))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::data_source::{FixtureDataSource, MockDataSource, SimulatedLatency};
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicU32, Ordering};
    use tokio_test::{assert_err, assert_ok};

    fn fetch_config() -> FetchConfig {
        FetchConfig {
            retries: 2,
            timeout: Duration::from_secs(5),
            initial_backoff: Duration::from_millis(10),
            max_backoff: Duration::from_millis(100),
            jitter: false,
        }
    }

    fn long_lived_cache() -> MemoryCache {
        MemoryCache::new(Duration::from_secs(3600)).unwrap()
    }

    fn user(id: &str) -> User {
        User {
            id: id.to_string(),
            username: id.to_string(),
            name: id.to_string(),
        }
    }

    fn mock_with_counts(calls: u32) -> MockDataSource {
        let mut mock = MockDataSource::new();
        mock.expect_fetch_users()
            .times(calls as usize)
            .returning(|| Ok(vec![user("u1")]));
        mock.expect_fetch_posts()
            .times(calls as usize)
            .returning(|| Ok(Vec::new()));
        mock.expect_fetch_comments()
            .times(calls as usize)
            .returning(|| Ok(Vec::new()));
        mock
    }

    #[tokio::test]
    async fn test_snapshot_served_from_cache_while_fresh() {
        let dal = DataAccessLayer::new(
            Arc::new(mock_with_counts(1)),
            long_lived_cache(),
            &fetch_config(),
        );

        let first = dal.snapshot().await.unwrap();
        let second = dal.snapshot().await.unwrap();

        assert_eq!(first.users.len(), 1);
        assert!(Arc::ptr_eq(&first.users, &second.users));
    }

    #[tokio::test]
    async fn test_refresh_all_refetches_everything() {
        let dal = DataAccessLayer::new(
            Arc::new(mock_with_counts(2)),
            long_lived_cache(),
            &fetch_config(),
        );

        let first = dal.snapshot().await.unwrap();
        let refreshed = dal.refresh_all().await.unwrap();

        assert!(!Arc::ptr_eq(&first.users, &refreshed.users));
        assert!(dal.cache().is_fresh(&CacheKey::users()));
    }

    #[tokio::test(start_paused = true)]
    async fn test_fetch_retries_transient_failures() {
        let attempts = Arc::new(AtomicU32::new(0));
        let attempts_clone = attempts.clone();

        let mut mock = MockDataSource::new();
        mock.expect_fetch_users().returning(move || {
            if attempts_clone.fetch_add(1, Ordering::SeqCst) < 2 {
                Err(AnalyticsError::Internal("connection reset".to_string()))
            } else {
                Ok(vec![user("u1")])
            }
        });

        let dal = DataAccessLayer::new(Arc::new(mock), long_lived_cache(), &fetch_config());

        let users = assert_ok!(dal.users().await);
        assert_eq!(users.len(), 1);
        assert_eq!(attempts.load(Ordering::SeqCst), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn test_exhausted_retries_surface_fetch_failed() {
        let mut mock = MockDataSource::new();
        mock.expect_fetch_posts()
            .times(3)
            .returning(|| Err(AnalyticsError::Internal("backend down".to_string())));

        let dal = DataAccessLayer::new(Arc::new(mock), long_lived_cache(), &fetch_config());

        let err = dal.posts().await.unwrap_err();
        assert!(matches!(err, AnalyticsError::FetchFailed(msg) if msg.contains("posts")));
        assert!(!dal.cache().is_fresh(&CacheKey::posts()));
    }

    #[tokio::test(start_paused = true)]
    async fn test_failed_collection_fails_snapshot() {
        let mut mock = MockDataSource::new();
        mock.expect_fetch_users().returning(|| Ok(vec![user("u1")]));
        mock.expect_fetch_posts().returning(|| Ok(Vec::new()));
        mock.expect_fetch_comments()
            .returning(|| Err(AnalyticsError::Internal("boom".to_string())));

        let dal = DataAccessLayer::new(Arc::new(mock), long_lived_cache(), &fetch_config());

        assert!(matches!(
            dal.snapshot().await,
            Err(AnalyticsError::FetchFailed(_))
        ));
    }

    struct StalledSource;

    #[async_trait]
    impl DataSource for StalledSource {
        async fn fetch_users(&self) -> Result<Vec<User>> {
            tokio::time::sleep(Duration::from_secs(3600)).await;
            Ok(Vec::new())
        }

        async fn fetch_posts(&self) -> Result<Vec<Post>> {
            Ok(Vec::new())
        }

        async fn fetch_comments(&self) -> Result<Vec<Comment>> {
            Ok(Vec::new())
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_fetch_timeout() {
        let config = FetchConfig {
            retries: 0,
            timeout: Duration::from_millis(50),
            ..fetch_config()
        };
        let dal = DataAccessLayer::new(Arc::new(StalledSource), long_lived_cache(), &config);

        let err = assert_err!(dal.users().await);
        assert!(matches!(err, AnalyticsError::FetchFailed(msg) if msg.contains("timed out")));
    }

    #[tokio::test(start_paused = true)]
    async fn test_parallel_fetch_bounded_by_slowest_collection() {
        let latency = SimulatedLatency {
            users: Duration::from_millis(500),
            posts: Duration::from_millis(700),
            comments: Duration::from_millis(600),
        };
        let source = FixtureDataSource::bundled(latency).unwrap();
        let dal = DataAccessLayer::new(Arc::new(source), long_lived_cache(), &fetch_config());

        let start = tokio::time::Instant::now();
        let snapshot = dal.refresh_all().await.unwrap();
        let elapsed = start.elapsed();

        assert_eq!(snapshot.comments.len(), 17);
        assert!(elapsed >= Duration::from_millis(700));
        assert!(elapsed < Duration::from_millis(1800));
    }

    #[tokio::test]
    async fn test_stale_entries_refetched() {
        let mut mock = MockDataSource::new();
        mock.expect_fetch_users()
            .times(2)
            .returning(|| Ok(vec![user("u1")]));

        let cache = MemoryCache::new(Duration::from_millis(1)).unwrap();
        let dal = DataAccessLayer::new(Arc::new(mock), cache, &fetch_config());

        dal.users().await.unwrap();
        tokio::time::sleep(Duration::from_millis(5)).await;
        dal.users().await.unwrap();
    }
}
