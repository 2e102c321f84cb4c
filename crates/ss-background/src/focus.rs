//! Focus-mode controller
//!
//! Holds the cached mirror of the backend's focus state and enforces it on
//! tabs. The mirror only changes after the backend answers: `start` and
//! `stop` are round-trips, and the periodic re-sync overwrites the mirror
//! with whatever the backend reports.

use std::sync::Arc;

use log::{debug, info, warn};
use ss_core::focus::{blocked_redirect, normalize_sites};
use ss_core::{FocusState, Message};
use tokio::sync::{broadcast, RwLock};

use crate::backend::Backend;
use crate::error::Result;
use crate::storage::{self, Storage, FOCUS_STATE_KEY};
use crate::tabs::{Tab, Tabs};

pub struct FocusController {
    state: RwLock<FocusState>,
    backend: Arc<dyn Backend>,
    tabs: Arc<dyn Tabs>,
    storage: Arc<dyn Storage>,
    events: broadcast::Sender<Message>,
    blocked_page: String,
}

impl FocusController {
    pub fn new(
        backend: Arc<dyn Backend>,
        tabs: Arc<dyn Tabs>,
        storage: Arc<dyn Storage>,
        events: broadcast::Sender<Message>,
        blocked_page: impl Into<String>,
    ) -> Self {
        Self {
            state: RwLock::new(FocusState::inactive()),
            backend,
            tabs,
            storage,
            events,
            blocked_page: blocked_page.into(),
        }
    }

    /// Current cached state.
    pub async fn state(&self) -> FocusState {
        self.state.read().await.clone()
    }

    pub fn blocked_page(&self) -> &str {
        &self.blocked_page
    }

    /// Load the persisted mirror, if any. Used before the first sync.
    pub async fn restore(&self) -> Result<()> {
        if let Some(state) = storage::load::<FocusState>(self.storage.as_ref(), FOCUS_STATE_KEY).await? {
            debug!("restored focus state (active: {})", state.active);
            *self.state.write().await = state;
        }
        Ok(())
    }

    /// Start focus mode blocking `blocked_sites`.
    ///
    /// On failure the cached state is untouched and the error is returned.
    pub async fn start(&self, blocked_sites: &[String]) -> Result<FocusState> {
        let sites = normalize_sites(blocked_sites);
        let state = self.backend.focus_start(&sites).await?;
        info!("focus mode started ({} blocked site(s))", state.blocked_sites.len());
        self.apply(state.clone(), true).await;
        Ok(state)
    }

    /// Stop focus mode. On failure the cached state is untouched.
    pub async fn stop(&self) -> Result<FocusState> {
        let state = self.backend.focus_stop().await?;
        info!("focus mode stopped");
        self.apply(state.clone(), true).await;
        Ok(state)
    }

    /// Overwrite the mirror with the backend's current state.
    pub async fn resync(&self) -> Result<FocusState> {
        let state = self.backend.focus_status().await?;
        self.apply(state.clone(), false).await;
        Ok(state)
    }

    /// Swap in `state`, persist it, broadcast it and re-enforce all tabs.
    async fn apply(&self, state: FocusState, always_broadcast: bool) {
        let changed = {
            let mut guard = self.state.write().await;
            let changed = *guard != state;
            *guard = state.clone();
            changed
        };

        if let Err(e) = storage::save(self.storage.as_ref(), FOCUS_STATE_KEY, &state).await {
            warn!("failed to persist focus state: {}", e);
        }

        if changed || always_broadcast {
            // No receivers is fine; the UI may be closed.
            let _ = self.events.send(Message::FocusStatus { state });
        }

        self.enforce_all().await;
    }

    /// Redirect `tab` if it shows a blocked site. Returns whether it did.
    pub async fn enforce_tab(&self, tab: &Tab) -> Result<bool> {
        let Some(url) = tab.url.as_deref() else {
            return Ok(false);
        };
        let target = {
            let state = self.state.read().await;
            blocked_redirect(url, &state, &self.blocked_page)
        };
        match target {
            Some(target) => {
                debug!("redirecting tab {} to {}", tab.id, target);
                self.tabs.redirect(tab.id, &target).await?;
                Ok(true)
            }
            None => Ok(false),
        }
    }

    /// Tab navigation or activation hook. Failures are logged only.
    pub async fn on_tab_event(&self, tab: &Tab) {
        if let Err(e) = self.enforce_tab(tab).await {
            warn!("failed to enforce focus on tab {}: {}", tab.id, e);
        }
    }

    /// Enforce on every open tab. Returns the number redirected.
    pub async fn enforce_all(&self) -> usize {
        if !self.state.read().await.active {
            return 0;
        }
        let tabs = match self.tabs.list().await {
            Ok(tabs) => tabs,
            Err(e) => {
                warn!("failed to list tabs: {}", e);
                return 0;
            }
        };

        let mut redirected = 0;
        for tab in &tabs {
            match self.enforce_tab(tab).await {
                Ok(true) => redirected += 1,
                Ok(false) => {}
                Err(e) => warn!("failed to enforce focus on tab {}: {}", tab.id, e),
            }
        }
        redirected
    }
}
