//! Keyword cache with in-flight coalescing
//!
//! Concurrent non-forced reads share a single backend fetch. A forced
//! refresh always starts its own fetch. The cached set is swapped whole
//! once a fetch completes, so readers never see a partial list.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, PoisonError};

use futures::future::{BoxFuture, FutureExt, Shared};
use log::{debug, info};
use ss_core::KeywordSet;
use tokio::sync::RwLock;

use crate::backend::Backend;
use crate::error::Result;

type SharedFetch = Shared<BoxFuture<'static, Result<KeywordSet>>>;

/// Outcome of a cache read.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeywordFetch {
    pub keywords: KeywordSet,
    /// The cached set differs from the one held before this read
    pub changed: bool,
}

pub struct KeywordCache {
    backend: Arc<dyn Backend>,
    current: RwLock<KeywordSet>,
    loaded: AtomicBool,
    in_flight: Mutex<Option<SharedFetch>>,
}

impl KeywordCache {
    pub fn new(backend: Arc<dyn Backend>) -> Self {
        Self {
            backend,
            current: RwLock::new(KeywordSet::default()),
            loaded: AtomicBool::new(false),
            in_flight: Mutex::new(None),
        }
    }

    /// Last successfully fetched set (empty before the first fetch).
    pub async fn current(&self) -> KeywordSet {
        self.current.read().await.clone()
    }

    pub fn is_loaded(&self) -> bool {
        self.loaded.load(Ordering::SeqCst)
    }

    /// Return the keyword set, fetching when not loaded or when `force`.
    pub async fn get(&self, force: bool) -> Result<KeywordFetch> {
        if !force && self.is_loaded() {
            return Ok(KeywordFetch { keywords: self.current().await, changed: false });
        }

        let fetch = self.fetch_handle(force);
        let result = fetch.clone().await;
        self.release(&fetch);

        let keywords = result?;
        let changed = self.swap(keywords.clone()).await;
        Ok(KeywordFetch { keywords, changed })
    }

    /// The slot only ever holds a complete handle or `None`, so a poisoned
    /// lock is still safe to use.
    fn slot(&self) -> std::sync::MutexGuard<'_, Option<SharedFetch>> {
        self.in_flight.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn fetch_handle(&self, force: bool) -> SharedFetch {
        let mut slot = self.slot();

        if !force {
            if let Some(existing) = slot.as_ref() {
                debug!("joining in-flight keyword fetch");
                return existing.clone();
            }
        }

        let backend = Arc::clone(&self.backend);
        let fetch = async move {
            let raw = backend.fetch_keywords().await?;
            Ok(KeywordSet::normalize(raw))
        }
        .boxed()
        .shared();
        *slot = Some(fetch.clone());
        fetch
    }

    fn release(&self, fetch: &SharedFetch) {
        let mut slot = self.slot();
        if slot.as_ref().is_some_and(|current| current.ptr_eq(fetch)) {
            *slot = None;
        }
    }

    async fn swap(&self, keywords: KeywordSet) -> bool {
        let mut current = self.current.write().await;
        self.loaded.store(true, Ordering::SeqCst);
        if *current == keywords {
            return false;
        }
        info!("keyword list updated ({} keywords)", keywords.len());
        *current = keywords;
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::FakeBackend;

    fn cache(backend: &Arc<FakeBackend>) -> KeywordCache {
        KeywordCache::new(backend.clone())
    }

    #[tokio::test]
    async fn test_first_get_fetches_then_caches() {
        let backend = Arc::new(FakeBackend::with_keywords(&["Spam", "spam", "bad word"]));
        let cache = cache(&backend);

        let first = cache.get(false).await.unwrap();
        assert!(first.changed);
        assert_eq!(first.keywords.as_slice(), &["bad word".to_string(), "spam".to_string()]);

        let second = cache.get(false).await.unwrap();
        assert!(!second.changed);
        assert_eq!(backend.keyword_fetches.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_concurrent_gets_share_one_fetch() {
        let backend = Arc::new(FakeBackend::with_keywords(&["spam"]));
        backend.slow_keywords.store(true, Ordering::SeqCst);
        let cache = cache(&backend);

        let (a, b, c) = tokio::join!(cache.get(false), cache.get(false), cache.get(false));
        assert_eq!(a.unwrap().keywords, b.unwrap().keywords);
        assert!(c.is_ok());
        assert_eq!(backend.keyword_fetches.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_force_always_fetches() {
        let backend = Arc::new(FakeBackend::with_keywords(&["spam"]));
        backend.slow_keywords.store(true, Ordering::SeqCst);
        let cache = cache(&backend);

        let (a, b) = tokio::join!(cache.get(false), cache.get(true));
        assert!(a.is_ok() && b.is_ok());
        assert_eq!(backend.keyword_fetches.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_refresh_detects_change() {
        let backend = Arc::new(FakeBackend::with_keywords(&["spam"]));
        let cache = cache(&backend);
        cache.get(false).await.unwrap();

        assert!(!cache.get(true).await.unwrap().changed);

        *backend.keywords.lock().unwrap() = vec!["eggs".to_string()];
        let refreshed = cache.get(true).await.unwrap();
        assert!(refreshed.changed);
        assert_eq!(cache.current().await.as_slice(), &["eggs".to_string()]);
    }

    #[tokio::test]
    async fn test_failed_fetch_keeps_previous_set() {
        let backend = Arc::new(FakeBackend::with_keywords(&["spam"]));
        let cache = cache(&backend);
        cache.get(false).await.unwrap();

        backend.set_offline(true);
        assert!(cache.get(true).await.is_err());
        assert_eq!(cache.current().await.as_slice(), &["spam".to_string()]);
    }

    #[tokio::test]
    async fn test_failed_first_fetch_is_retried() {
        let backend = Arc::new(FakeBackend::with_keywords(&["spam"]));
        backend.set_offline(true);
        let cache = cache(&backend);
        assert!(cache.get(false).await.is_err());
        assert!(!cache.is_loaded());

        backend.set_offline(false);
        assert!(cache.get(false).await.unwrap().changed);
    }

    #[tokio::test]
    async fn test_poisoned_fetch_slot_still_serves() {
        let backend = Arc::new(FakeBackend::with_keywords(&["spam"]));
        let cache = cache(&backend);

        std::thread::scope(|scope| {
            let _ = scope
                .spawn(|| {
                    let _slot = cache.in_flight.lock();
                    panic!("holder died");
                })
                .join();
        });
        assert!(cache.in_flight.is_poisoned());

        let fetched = cache.get(false).await.unwrap();
        assert_eq!(fetched.keywords.as_slice(), &["spam".to_string()]);
    }
}
