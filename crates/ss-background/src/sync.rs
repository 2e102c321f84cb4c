//! Periodic state synchronization
//!
//! Re-fetches focus state and keywords on a fixed interval. This is the
//! eventual-consistency path for missed pushes and for state changed
//! elsewhere (another browser instance, the dashboard). A failed tick is
//! logged and the next tick retries.

use std::sync::Arc;
use std::time::Duration;

use log::{debug, info};
use tokio::task::JoinHandle;
use tokio::time::{self, MissedTickBehavior};

use crate::background::{Background, SyncReport};

pub struct StateSyncLoop {
    background: Arc<Background>,
    interval: Duration,
    ticker: Option<JoinHandle<()>>,
}

impl StateSyncLoop {
    pub fn new(background: Arc<Background>) -> Self {
        let interval = background.config().sync_interval();
        Self::with_interval(background, interval)
    }

    pub fn with_interval(background: Arc<Background>, interval: Duration) -> Self {
        Self { background, interval, ticker: None }
    }

    pub fn is_running(&self) -> bool {
        self.ticker.as_ref().is_some_and(|handle| !handle.is_finished())
    }

    /// Run one pass immediately.
    pub async fn tick(&self) -> SyncReport {
        self.background.sync_once().await
    }

    /// Spawn the ticker, replacing any previous one. The first pass runs
    /// one interval from now; startup performs its own sync.
    pub fn start(&mut self) {
        self.stop();

        let background = Arc::clone(&self.background);
        let period = self.interval;
        info!("state sync every {:?}", period);

        self.ticker = Some(tokio::spawn(async move {
            let mut interval = time::interval_at(time::Instant::now() + period, period);
            interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
            loop {
                interval.tick().await;
                let report = background.sync_once().await;
                debug!("sync tick: {:?}", report);
            }
        }));
    }

    pub fn stop(&mut self) {
        if let Some(handle) = self.ticker.take() {
            handle.abort();
        }
    }
}

impl Drop for StateSyncLoop {
    fn drop(&mut self) {
        self.stop();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::BackgroundConfig;
    use crate::storage::MemoryStorage;
    use crate::tabs::Tab;
    use crate::testing::{FakeBackend, FakeTabs};
    use std::sync::atomic::Ordering;

    fn background(backend: Arc<FakeBackend>, tabs: Arc<FakeTabs>) -> Arc<Background> {
        Background::new(BackgroundConfig::default(), backend, tabs, Arc::new(MemoryStorage::new()))
    }

    #[tokio::test]
    async fn test_ticker_resyncs_periodically() {
        let backend = Arc::new(FakeBackend::with_keywords(&["spam"]));
        let tabs = Arc::new(FakeTabs::with_tabs(vec![Tab::new(1, "https://example.com/")]));
        let mut sync = StateSyncLoop::with_interval(background(backend.clone(), tabs.clone()), Duration::from_millis(20));
        sync.start();
        assert!(sync.is_running());

        {
            let mut remote = backend.focus.lock().unwrap();
            remote.active = true;
            remote.blocked_sites = vec!["example.com".to_string()];
        }
        tokio::time::sleep(Duration::from_millis(120)).await;

        assert!(backend.keyword_fetches.load(Ordering::SeqCst) >= 2);
        assert_eq!(tabs.redirects().len(), 1);

        sync.stop();
        assert!(!sync.is_running());
    }

    #[tokio::test]
    async fn test_failed_tick_does_not_stop_loop() {
        let backend = Arc::new(FakeBackend::with_keywords(&["spam"]));
        backend.set_offline(true);
        let tabs = Arc::new(FakeTabs::default());
        let mut sync = StateSyncLoop::with_interval(background(backend.clone(), tabs), Duration::from_millis(10));

        assert_eq!(sync.tick().await, SyncReport::default());
        sync.start();
        tokio::time::sleep(Duration::from_millis(50)).await;
        assert!(sync.is_running());

        backend.set_offline(false);
        let report = sync.tick().await;
        assert!(report.focus_synced && report.keywords_synced);
    }
}
