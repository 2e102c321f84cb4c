//! Incremental re-masking of live DOM changes
//!
//! The watcher owns the body observer. It only runs while masking is
//! active; [`MutationWatcher::stop`] disconnects and drops the subscription
//! so the next [`MutationWatcher::start`] gets a fresh one.

use log::debug;

use crate::dom::{Document, MutationRecord, Subscription};
use crate::mask::MaskEngine;

/// Upper bound on batches drained by [`MutationWatcher::settle`].
const MAX_SETTLE_ROUNDS: usize = 8;

#[derive(Debug, Default)]
pub struct MutationWatcher {
    subscription: Option<Subscription>,
}

impl MutationWatcher {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_running(&self) -> bool {
        self.subscription.is_some()
    }

    /// Start observing the body. Returns `false` if already running or the
    /// document has no body yet.
    pub fn start(&mut self, doc: &mut Document) -> bool {
        if self.subscription.is_some() {
            return false;
        }
        let Some(body) = doc.body() else {
            return false;
        };
        self.subscription = Some(doc.observe(body));
        debug!("mutation watcher started");
        true
    }

    /// Disconnect the observer, discarding undelivered records.
    pub fn stop(&mut self, doc: &mut Document) {
        if let Some(subscription) = self.subscription.take() {
            doc.disconnect(subscription);
            debug!("mutation watcher stopped");
        }
    }

    /// Handle one pending batch. Returns the number of placeholders inserted.
    pub fn process(&mut self, doc: &mut Document, engine: &mut MaskEngine) -> usize {
        let Some(subscription) = self.subscription.as_ref() else {
            return 0;
        };
        let records = doc.take_records(subscription);
        if records.is_empty() || !engine.is_active() {
            return 0;
        }

        let mut masked = 0;
        for record in records {
            match record {
                MutationRecord::CharacterData { target } => {
                    if doc.is_connected(target) && !MaskEngine::has_excluded_ancestor(doc, target) {
                        masked += engine.mask_text_node(doc, target);
                    }
                }
                MutationRecord::ChildList { added, .. } => {
                    for node in added {
                        if !doc.is_connected(node) || MaskEngine::has_excluded_ancestor(doc, node) {
                            continue;
                        }
                        masked += if doc.is_text(node) {
                            engine.mask_text_node(doc, node)
                        } else {
                            engine.apply_to_subtree(doc, node)
                        };
                    }
                }
            }
        }
        masked
    }

    /// Drain batches until the observer is quiet.
    ///
    /// Placeholder insertion queues records of its own; those are no-ops on
    /// the next pass because placeholders are never rescanned.
    pub fn settle(&mut self, doc: &mut Document, engine: &mut MaskEngine) -> usize {
        let mut masked = 0;
        for _ in 0..MAX_SETTLE_ROUNDS {
            let before = doc.mutation_count();
            masked += self.process(doc, engine);
            if doc.mutation_count() == before {
                break;
            }
        }
        masked
    }
}
