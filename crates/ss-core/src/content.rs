//! Per-page content-script coordinator
//!
//! One [`ContentSession`] exists per page. It owns the keyword set, the mask
//! engine and the mutation watcher, reacts to pushes from the background,
//! and queues outgoing messages for the host to deliver.

use std::time::{Duration, Instant};

use log::{debug, info};

use crate::dom::Document;
use crate::keywords::{KeywordError, KeywordSet};
use crate::mask::MaskEngine;
use crate::types::Message;
use crate::watcher::MutationWatcher;

/// Minimum spacing between `user-active` pings.
pub const ACTIVITY_INTERVAL: Duration = Duration::from_secs(2);

pub struct ContentSession {
    keywords: KeywordSet,
    engine: MaskEngine,
    watcher: MutationWatcher,
    last_activity: Option<Instant>,
    outbox: Vec<Message>,
}

impl ContentSession {
    pub fn new(page_url: impl Into<String>, page_title: impl Into<String>) -> Self {
        Self {
            keywords: KeywordSet::default(),
            engine: MaskEngine::new(page_url, page_title),
            watcher: MutationWatcher::new(),
            last_activity: None,
            outbox: Vec::new(),
        }
    }

    pub fn keywords(&self) -> &KeywordSet {
        &self.keywords
    }

    pub fn safe_mode(&self) -> bool {
        self.engine.is_enabled()
    }

    /// Masking is on, a matcher exists and the watcher is observing.
    pub fn is_masking(&self) -> bool {
        self.engine.is_active() && self.watcher.is_running()
    }

    /// Replace the keyword list.
    ///
    /// Returns `Ok(false)` without touching the page when the list is
    /// unchanged after normalization.
    pub fn apply_keywords<S: AsRef<str>>(
        &mut self,
        doc: &mut Document,
        raw: &[S],
    ) -> Result<bool, KeywordError> {
        let set = KeywordSet::normalize(raw);
        if set == self.keywords {
            return Ok(false);
        }

        let matcher = set.compile()?;
        info!("keyword set updated ({} keywords)", set.len());
        self.keywords = set;

        self.watcher.stop(doc);
        self.engine.remove_all(doc);
        self.engine.set_matcher(matcher);
        if self.keywords.is_empty() {
            self.engine.reset_reports();
        } else {
            self.rescan(doc);
        }
        Ok(true)
    }

    /// Turn masking on or off. Returns `false` if the flag did not change.
    pub fn set_safe_mode(&mut self, doc: &mut Document, enabled: bool) -> bool {
        if enabled == self.engine.is_enabled() {
            return false;
        }
        self.engine.set_enabled(enabled);

        if enabled {
            self.rescan(doc);
        } else {
            self.watcher.stop(doc);
            self.engine.remove_all(doc);
            self.engine.reset_reports();
        }
        debug!("safe mode {}", if enabled { "enabled" } else { "disabled" });
        true
    }

    fn rescan(&mut self, doc: &mut Document) {
        if !self.engine.is_active() {
            self.watcher.stop(doc);
            return;
        }
        let Some(body) = doc.body() else {
            return;
        };
        let masked = self.engine.apply_to_subtree(doc, body);
        debug!("initial scan masked {} match(es)", masked);
        self.watcher.start(doc);
        self.collect_flagged();
    }

    /// Deliver pending mutations to the watcher.
    pub fn process_mutations(&mut self, doc: &mut Document) -> usize {
        if !self.watcher.is_running() && self.engine.is_active() && doc.body().is_some() {
            // Body appeared after activation.
            self.rescan(doc);
        }
        let masked = self.watcher.settle(doc, &mut self.engine);
        self.collect_flagged();
        masked
    }

    /// Apply a push from the background. Unrelated messages are ignored.
    pub fn handle_message(&mut self, doc: &mut Document, message: &Message) -> Result<(), KeywordError> {
        match message {
            Message::KeywordsUpdated { keywords } => {
                self.apply_keywords(doc, keywords.as_slice())?;
            }
            Message::SafeModeChanged { enabled } => {
                self.set_safe_mode(doc, *enabled);
            }
            _ => {}
        }
        Ok(())
    }

    /// Record user activity. Queues `user-active` at most once per
    /// [`ACTIVITY_INTERVAL`] and returns whether it did.
    pub fn note_activity(&mut self, now: Instant) -> bool {
        if let Some(last) = self.last_activity {
            if now.saturating_duration_since(last) < ACTIVITY_INTERVAL {
                return false;
            }
        }
        self.last_activity = Some(now);
        self.outbox.push(Message::UserActive);
        true
    }

    /// Messages waiting to be sent to the background.
    pub fn drain_outbox(&mut self) -> Vec<Message> {
        std::mem::take(&mut self.outbox)
    }

    fn collect_flagged(&mut self) {
        self.outbox
            .extend(self.engine.take_flagged().into_iter().map(Message::from));
    }
}
