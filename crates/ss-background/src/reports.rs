//! Flagged-content forwarding over the time-windowed report cache.

use std::sync::{Arc, Mutex, PoisonError};
use std::time::{Duration, Instant};

use log::{debug, info, warn};
use ss_core::types::FlaggedContent;
use ss_core::ReportCache;

use crate::backend::{Backend, ModerationReport};
use crate::error::Result;

pub struct ReportForwarder {
    backend: Arc<dyn Backend>,
    cache: Mutex<ReportCache>,
    user: String,
}

impl ReportForwarder {
    pub fn new(backend: Arc<dyn Backend>, ttl: Duration, user: impl Into<String>) -> Self {
        Self {
            backend,
            cache: Mutex::new(ReportCache::new(ttl)),
            user: user.into(),
        }
    }

    /// Forward `content` unless it was reported within the TTL.
    ///
    /// Returns `Ok(false)` when suppressed.
    pub async fn forward(&self, content: &FlaggedContent) -> Result<bool> {
        self.forward_at(content, Instant::now()).await
    }

    pub async fn forward_at(&self, content: &FlaggedContent, now: Instant) -> Result<bool> {
        if content.text.trim().is_empty() {
            return Ok(false);
        }
        if !self.with_cache(|cache| cache.try_claim(&content.text, &content.url, now)) {
            debug!("suppressed repeat report of {:?} on {}", content.text, content.url);
            return Ok(false);
        }

        let report = ModerationReport {
            text: content.text.clone(),
            user: self.user.clone(),
            url: content.url.clone(),
            context: content.title.clone(),
        };

        match self.backend.report(&report).await {
            Ok(verdict) => {
                info!(
                    "reported flagged content on {} (flagged: {}, categories: {:?})",
                    content.url,
                    verdict.flagged,
                    verdict.matched_categories()
                );
                Ok(true)
            }
            Err(e) => {
                warn!("failed to report flagged content: {}", e);
                self.with_cache(|cache| cache.rollback(&content.text, &content.url));
                Err(e)
            }
        }
    }

    /// Cache operations never leave an entry half-written, so a poisoned
    /// lock is recovered rather than reported.
    fn with_cache<T>(&self, f: impl FnOnce(&mut ReportCache) -> T) -> T {
        let mut cache = self.cache.lock().unwrap_or_else(PoisonError::into_inner);
        f(&mut cache)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::FakeBackend;

    fn flagged(text: &str, url: &str) -> FlaggedContent {
        FlaggedContent { text: text.to_string(), url: url.to_string(), title: "Title".to_string() }
    }

    #[tokio::test]
    async fn test_ttl_suppresses_then_expires() {
        let backend = Arc::new(FakeBackend::default());
        let forwarder = ReportForwarder::new(backend.clone(), Duration::from_secs(60), "extension");
        let t0 = Instant::now();
        let item = flagged("spam", "https://a.test/");

        assert!(forwarder.forward_at(&item, t0).await.unwrap());
        assert!(!forwarder.forward_at(&item, t0 + Duration::from_secs(10)).await.unwrap());
        assert!(forwarder.forward_at(&item, t0 + Duration::from_secs(61)).await.unwrap());

        let reports = backend.reports.lock().unwrap();
        assert_eq!(reports.len(), 2);
        assert_eq!(reports[0].context, "Title");
        assert_eq!(reports[0].user, "extension");
    }

    #[tokio::test]
    async fn test_failed_report_can_be_retried() {
        let backend = Arc::new(FakeBackend::default());
        let forwarder = ReportForwarder::new(backend.clone(), Duration::from_secs(60), "extension");
        let t0 = Instant::now();
        let item = flagged("spam", "https://a.test/");

        backend.set_offline(true);
        assert!(forwarder.forward_at(&item, t0).await.is_err());
        backend.set_offline(false);
        assert!(forwarder.forward_at(&item, t0 + Duration::from_secs(1)).await.unwrap());
    }

    #[tokio::test]
    async fn test_distinct_urls_are_independent() {
        let backend = Arc::new(FakeBackend::default());
        let forwarder = ReportForwarder::new(backend.clone(), Duration::from_secs(60), "extension");
        let t0 = Instant::now();
        assert!(forwarder.forward_at(&flagged("spam", "https://a.test/"), t0).await.unwrap());
        assert!(forwarder.forward_at(&flagged("Spam", "https://b.test/"), t0).await.unwrap());
    }

    #[tokio::test]
    async fn test_poisoned_cache_still_forwards() {
        let backend = Arc::new(FakeBackend::default());
        let forwarder = ReportForwarder::new(backend.clone(), Duration::from_secs(60), "extension");

        std::thread::scope(|scope| {
            let _ = scope
                .spawn(|| {
                    let _cache = forwarder.cache.lock();
                    panic!("holder died");
                })
                .join();
        });
        assert!(forwarder.cache.is_poisoned());

        let item = flagged("spam", "https://a.test/");
        let t0 = Instant::now();
        assert!(forwarder.forward_at(&item, t0).await.unwrap());
        assert!(!forwarder.forward_at(&item, t0).await.unwrap());
    }
}
