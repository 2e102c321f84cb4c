//! In-memory fakes for the background's collaborators.

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;
use ss_core::FocusState;

use crate::backend::{Backend, ModerationReport, ModerationVerdict};
use crate::error::{Error, Result};
use crate::tabs::{Tab, Tabs};

#[derive(Default)]
pub struct FakeBackend {
    pub keywords: Mutex<Vec<String>>,
    pub focus: Mutex<FocusState>,
    pub reports: Mutex<Vec<ModerationReport>>,
    pub keyword_fetches: AtomicUsize,
    pub offline: AtomicBool,
    pub slow_keywords: AtomicBool,
}

impl FakeBackend {
    pub fn with_keywords(keywords: &[&str]) -> Self {
        let backend = Self::default();
        *backend.keywords.lock().unwrap() = keywords.iter().map(|k| k.to_string()).collect();
        backend
    }

    pub fn set_offline(&self, offline: bool) {
        self.offline.store(offline, Ordering::SeqCst);
    }

    fn check_online(&self) -> Result<()> {
        if self.offline.load(Ordering::SeqCst) {
            Err(Error::Transport("connection refused".to_string()))
        } else {
            Ok(())
        }
    }
}

#[async_trait]
impl Backend for FakeBackend {
    async fn fetch_keywords(&self) -> Result<Vec<String>> {
        self.keyword_fetches.fetch_add(1, Ordering::SeqCst);
        if self.slow_keywords.load(Ordering::SeqCst) {
            tokio::time::sleep(Duration::from_millis(50)).await;
        }
        self.check_online()?;
        Ok(self.keywords.lock().unwrap().clone())
    }

    async fn report(&self, report: &ModerationReport) -> Result<ModerationVerdict> {
        self.check_online()?;
        self.reports.lock().unwrap().push(report.clone());
        Ok(ModerationVerdict { flagged: true, ..ModerationVerdict::default() })
    }

    async fn focus_status(&self) -> Result<FocusState> {
        self.check_online()?;
        Ok(self.focus.lock().unwrap().clone())
    }

    async fn focus_start(&self, blocked_sites: &[String]) -> Result<FocusState> {
        self.check_online()?;
        let mut focus = self.focus.lock().unwrap();
        focus.active = true;
        focus.blocked_sites = blocked_sites.iter().map(|s| s.to_lowercase()).collect();
        Ok(focus.clone())
    }

    async fn focus_stop(&self) -> Result<FocusState> {
        self.check_online()?;
        let mut focus = self.focus.lock().unwrap();
        focus.active = false;
        Ok(focus.clone())
    }
}

#[derive(Default)]
pub struct FakeTabs {
    pub tabs: Mutex<Vec<Tab>>,
    pub redirects: Mutex<Vec<(i32, String)>>,
}

impl FakeTabs {
    pub fn with_tabs(tabs: Vec<Tab>) -> Self {
        Self { tabs: Mutex::new(tabs), redirects: Mutex::new(Vec::new()) }
    }

    pub fn redirects(&self) -> Vec<(i32, String)> {
        self.redirects.lock().unwrap().clone()
    }
}

#[async_trait]
impl Tabs for FakeTabs {
    async fn list(&self) -> Result<Vec<Tab>> {
        Ok(self.tabs.lock().unwrap().clone())
    }

    async fn redirect(&self, tab_id: i32, url: &str) -> Result<()> {
        let mut tabs = self.tabs.lock().unwrap();
        match tabs.iter_mut().find(|t| t.id == tab_id) {
            Some(tab) => tab.url = Some(url.to_string()),
            None => return Err(Error::Tabs(format!("no tab with id {tab_id}"))),
        }
        self.redirects.lock().unwrap().push((tab_id, url.to_string()));
        Ok(())
    }
}
