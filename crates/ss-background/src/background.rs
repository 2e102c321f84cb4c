//! Background coordinator and message dispatch
//!
//! One [`Background`] exists per extension process. It is the only writer of
//! persisted state; every other surface talks to it through [`Message`]s.

use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;
use std::time::Instant;

use log::{debug, info, warn};
use ss_core::content::ACTIVITY_INTERVAL;
use ss_core::types::{FlaggedContent, Payload};
use ss_core::url::web_hostname;
use ss_core::{FocusState, Message, Response};
use tokio::sync::{broadcast, Mutex, RwLock};

use crate::backend::Backend;
use crate::config::BackgroundConfig;
use crate::error::Result;
use crate::focus::FocusController;
use crate::keywords::KeywordCache;
use crate::reports::ReportForwarder;
use crate::storage::{self, Storage, SAFE_MODE_KEY, SITE_TIME_KEY};
use crate::tabs::{Tab, Tabs};

/// Capacity of the push channel to listeners.
const EVENT_CAPACITY: usize = 64;

#[derive(Debug, Default)]
struct UsageTracker {
    /// Domain → seconds of activity
    site_time: BTreeMap<String, f64>,
    last_ping: HashMap<i32, Instant>,
}

impl UsageTracker {
    /// Credit `host` with the time since the tab's previous ping.
    ///
    /// A gap longer than the activity window ends the run and credits
    /// nothing. Tabs idle for longer than the window are forgotten.
    fn credit(&mut self, tab_id: i32, host: String, now: Instant) {
        let elapsed = self
            .last_ping
            .insert(tab_id, now)
            .map(|last| now.saturating_duration_since(last))
            .filter(|gap| *gap <= ACTIVITY_INTERVAL)
            .unwrap_or_default();
        *self.site_time.entry(host).or_default() += elapsed.as_secs_f64();
        self.last_ping
            .retain(|_, last| now.saturating_duration_since(*last) <= ACTIVITY_INTERVAL);
    }
}

/// Outcome of one sync pass.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SyncReport {
    pub focus_synced: bool,
    pub keywords_synced: bool,
    pub keywords_changed: bool,
}

pub struct Background {
    config: BackgroundConfig,
    storage: Arc<dyn Storage>,
    focus: FocusController,
    keywords: KeywordCache,
    reports: ReportForwarder,
    safe_mode: RwLock<bool>,
    usage: Mutex<UsageTracker>,
    events: broadcast::Sender<Message>,
}

impl Background {
    pub fn new(
        config: BackgroundConfig,
        backend: Arc<dyn Backend>,
        tabs: Arc<dyn Tabs>,
        storage: Arc<dyn Storage>,
    ) -> Arc<Self> {
        let (events, _) = broadcast::channel(EVENT_CAPACITY);
        let focus = FocusController::new(
            Arc::clone(&backend),
            tabs,
            Arc::clone(&storage),
            events.clone(),
            config.blocked_page.clone(),
        );
        let keywords = KeywordCache::new(Arc::clone(&backend));
        let reports = ReportForwarder::new(backend, config.report_ttl(), config.report_user.clone());

        Arc::new(Self {
            config,
            storage,
            focus,
            keywords,
            reports,
            safe_mode: RwLock::new(true),
            usage: Mutex::new(UsageTracker::default()),
            events,
        })
    }

    pub fn config(&self) -> &BackgroundConfig {
        &self.config
    }

    pub fn focus(&self) -> &FocusController {
        &self.focus
    }

    pub fn keywords(&self) -> &KeywordCache {
        &self.keywords
    }

    /// Listen for pushes (`keywords-updated`, `safe-mode-changed`,
    /// `focus-status`).
    pub fn subscribe(&self) -> broadcast::Receiver<Message> {
        self.events.subscribe()
    }

    pub async fn safe_mode(&self) -> bool {
        *self.safe_mode.read().await
    }

    /// Seconds of activity per domain.
    pub async fn site_time(&self) -> BTreeMap<String, f64> {
        self.usage.lock().await.site_time.clone()
    }

    /// Restore persisted state and warm caches. Every step is best-effort.
    pub async fn startup(&self) {
        match storage::load::<bool>(self.storage.as_ref(), SAFE_MODE_KEY).await {
            Ok(Some(enabled)) => *self.safe_mode.write().await = enabled,
            Ok(None) => {}
            Err(e) => warn!("failed to restore safe mode: {}", e),
        }
        match storage::load::<BTreeMap<String, f64>>(self.storage.as_ref(), SITE_TIME_KEY).await {
            Ok(Some(site_time)) => self.usage.lock().await.site_time = site_time,
            Ok(None) => {}
            Err(e) => warn!("failed to restore site time: {}", e),
        }
        if let Err(e) = self.focus.restore().await {
            warn!("failed to restore focus state: {}", e);
        }

        let report = self.sync_once().await;
        info!(
            "background started (focus synced: {}, keywords synced: {})",
            report.focus_synced, report.keywords_synced
        );
    }

    /// Re-fetch focus state and keywords. Failures are logged and reported
    /// in the result, never returned.
    pub async fn sync_once(&self) -> SyncReport {
        let mut report = SyncReport::default();

        match self.focus.resync().await {
            Ok(_) => report.focus_synced = true,
            Err(e) => warn!("focus sync failed: {}", e),
        }

        match self.keywords.get(true).await {
            Ok(fetch) => {
                report.keywords_synced = true;
                report.keywords_changed = fetch.changed;
                if fetch.changed {
                    self.broadcast(Message::KeywordsUpdated { keywords: fetch.keywords.into_vec() });
                }
            }
            Err(e) => warn!("keyword sync failed: {}", e),
        }

        report
    }

    /// Tab finished starting a navigation or became active.
    pub async fn on_tab_event(&self, tab: &Tab) {
        self.focus.on_tab_event(tab).await;
    }

    fn broadcast(&self, message: Message) {
        // No receivers is fine; nothing may be listening yet.
        let _ = self.events.send(message);
    }

    /// Dispatch a message. `sender` is the originating tab, if any.
    ///
    /// Returns `None` for fire-and-forget messages and for pushes, which the
    /// background does not consume.
    pub async fn handle(&self, message: Message, sender: Option<&Tab>) -> Option<Response> {
        debug!("handling {}", message.tag());
        match message {
            Message::UserActive => {
                self.record_activity(sender).await;
                None
            }
            Message::GetKeywords { force } => Some(self.get_keywords(force).await),
            Message::GetSafeMode => Some(Response::with(Payload::SafeMode(self.safe_mode().await))),
            Message::SetSafeMode { enabled } => Some(self.set_safe_mode(enabled).await),
            Message::ContentFlagged { text, url, title } => {
                Some(self.content_flagged(FlaggedContent { text, url, title }).await)
            }
            Message::FocusStart { blocked_sites } => {
                Some(focus_response(self.focus.start(&blocked_sites).await))
            }
            Message::FocusStop => Some(focus_response(self.focus.stop().await)),
            Message::GetFocusStatus => Some(Response::with(Payload::Focus(self.focus.state().await))),
            Message::KeywordsUpdated { .. }
            | Message::SafeModeChanged { .. }
            | Message::FocusStatus { .. } => None,
        }
    }

    async fn get_keywords(&self, force: bool) -> Response {
        match self.keywords.get(force).await {
            Ok(fetch) => {
                if fetch.changed {
                    self.broadcast(Message::KeywordsUpdated { keywords: fetch.keywords.as_slice().to_vec() });
                }
                Response::with(Payload::Keywords(fetch.keywords.into_vec()))
            }
            Err(e) => Response::error(e.to_string()),
        }
    }

    async fn set_safe_mode(&self, enabled: bool) -> Response {
        if let Err(e) = storage::save(self.storage.as_ref(), SAFE_MODE_KEY, &enabled).await {
            return Response::error(e.to_string());
        }
        let changed = {
            let mut current = self.safe_mode.write().await;
            let changed = *current != enabled;
            *current = enabled;
            changed
        };
        if changed {
            info!("safe mode {}", if enabled { "enabled" } else { "disabled" });
            self.broadcast(Message::SafeModeChanged { enabled });
        }
        Response::with(Payload::SafeMode(enabled))
    }

    async fn content_flagged(&self, content: FlaggedContent) -> Response {
        if !self.safe_mode().await {
            return Response::ack();
        }
        match self.reports.forward(&content).await {
            Ok(_) => Response::ack(),
            Err(e) => Response::error(e.to_string()),
        }
    }

    async fn record_activity(&self, sender: Option<&Tab>) {
        let Some(tab) = sender else {
            return;
        };
        let Some(host) = tab.url.as_deref().and_then(web_hostname) else {
            return;
        };

        let snapshot = {
            let mut usage = self.usage.lock().await;
            usage.credit(tab.id, host, Instant::now());
            usage.site_time.clone()
        };
        if let Err(e) = storage::save(self.storage.as_ref(), SITE_TIME_KEY, &snapshot).await {
            warn!("failed to persist site time: {}", e);
        }
    }
}

fn focus_response(result: Result<FocusState>) -> Response {
    match result {
        Ok(state) => Response::with(Payload::Focus(state)),
        Err(e) => Response::error(e.to_string()),
    }
}
