//! Report deduplication
//!
//! Two layers with different lifetimes:
//!
//! - [`ReportedMatches`] lives in the content script for one masking session
//!   and lets each phrase be reported once per page.
//! - [`ReportCache`] lives in the background and suppresses repeats of the
//!   same phrase on the same URL for a fixed TTL, across page loads.

use std::collections::{HashMap, HashSet};
use std::time::{Duration, Instant};

/// Default background suppression window.
pub const DEFAULT_REPORT_TTL: Duration = Duration::from_secs(60);

/// Entry count above which expired cache entries are pruned on insert.
const PRUNE_THRESHOLD: usize = 512;

/// Normalize matched text for use as a dedup key.
///
/// Lowercases, trims and collapses internal whitespace so `"Bad   Word"` and
/// `"bad word"` share a key.
pub fn normalize_match_text(text: &str) -> String {
    text.split_whitespace()
        .map(str::to_lowercase)
        .collect::<Vec<_>>()
        .join(" ")
}

type ReportKey = (String, String);

fn report_key(text: &str, url: &str) -> ReportKey {
    (normalize_match_text(text), url.to_string())
}

// =============================================================================
// Content-script layer
// =============================================================================

/// Per-session set of (normalized text, URL) pairs already reported.
#[derive(Debug, Default, Clone)]
pub struct ReportedMatches {
    seen: HashSet<ReportKey>,
}

impl ReportedMatches {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a match. Returns `true` the first time the pair is seen.
    pub fn insert(&mut self, text: &str, url: &str) -> bool {
        self.seen.insert(report_key(text, url))
    }

    pub fn contains(&self, text: &str, url: &str) -> bool {
        self.seen.contains(&report_key(text, url))
    }

    pub fn clear(&mut self) {
        self.seen.clear();
    }

    pub fn len(&self) -> usize {
        self.seen.len()
    }

    pub fn is_empty(&self) -> bool {
        self.seen.is_empty()
    }
}

// =============================================================================
// Background layer
// =============================================================================

/// Time-windowed report cache keyed by (normalized text, URL).
#[derive(Debug, Clone)]
pub struct ReportCache {
    ttl: Duration,
    entries: HashMap<ReportKey, Instant>,
}

impl Default for ReportCache {
    fn default() -> Self {
        Self::new(DEFAULT_REPORT_TTL)
    }
}

impl ReportCache {
    pub fn new(ttl: Duration) -> Self {
        Self { ttl, entries: HashMap::new() }
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    fn is_fresh(&self, reported_at: Instant, now: Instant) -> bool {
        now.saturating_duration_since(reported_at) < self.ttl
    }

    /// Claim the right to report `(text, url)` at `now`.
    ///
    /// Returns `false` if the pair was reported within the TTL. On `true`
    /// the entry is stamped with `now`; call [`ReportCache::rollback`] if the
    /// report then fails so a retry is not suppressed.
    pub fn try_claim(&mut self, text: &str, url: &str, now: Instant) -> bool {
        let key = report_key(text, url);
        if let Some(&reported_at) = self.entries.get(&key) {
            if self.is_fresh(reported_at, now) {
                return false;
            }
        }

        if self.entries.len() >= PRUNE_THRESHOLD {
            self.prune(now);
        }
        self.entries.insert(key, now);
        true
    }

    /// Forget a claim made by [`ReportCache::try_claim`].
    pub fn rollback(&mut self, text: &str, url: &str) {
        self.entries.remove(&report_key(text, url));
    }

    /// Drop every expired entry.
    pub fn prune(&mut self, now: Instant) {
        let ttl = self.ttl;
        self.entries
            .retain(|_, reported_at| now.saturating_duration_since(*reported_at) < ttl);
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_match_text() {
        assert_eq!(normalize_match_text("  Bad \n  Word "), "bad word");
        assert_eq!(normalize_match_text("SPAM"), "spam");
    }

    #[test]
    fn test_reported_matches_once_per_page() {
        let mut seen = ReportedMatches::new();
        assert!(seen.insert("Spam", "https://a.test/"));
        assert!(!seen.insert("spam", "https://a.test/"));
        assert!(!seen.insert("SPAM ", "https://a.test/"));
        assert!(seen.insert("spam", "https://b.test/"));
        assert_eq!(seen.len(), 2);

        seen.clear();
        assert!(seen.insert("spam", "https://a.test/"));
    }

    #[test]
    fn test_report_cache_ttl() {
        let mut cache = ReportCache::new(Duration::from_secs(60));
        let t0 = Instant::now();
        assert!(cache.try_claim("spam", "https://a.test/", t0));
        assert!(!cache.try_claim("Spam", "https://a.test/", t0 + Duration::from_secs(30)));
        assert!(cache.try_claim("spam", "https://a.test/", t0 + Duration::from_secs(61)));
    }

    #[test]
    fn test_report_cache_rollback_allows_retry() {
        let mut cache = ReportCache::default();
        let t0 = Instant::now();
        assert!(cache.try_claim("spam", "https://a.test/", t0));
        cache.rollback("spam", "https://a.test/");
        assert!(cache.try_claim("spam", "https://a.test/", t0));
    }

    #[test]
    fn test_report_cache_prune() {
        let mut cache = ReportCache::new(Duration::from_secs(10));
        let t0 = Instant::now();
        cache.try_claim("a", "u", t0);
        cache.try_claim("b", "u", t0 + Duration::from_secs(8));
        cache.prune(t0 + Duration::from_secs(12));
        assert_eq!(cache.len(), 1);
    }
}
