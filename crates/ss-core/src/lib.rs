//! SafeSpace Core Library
//!
//! This crate provides the in-page moderation pipeline and the focus-mode
//! blocking decision used by the SafeSpace browser extension. Nothing here
//! performs I/O: the background coordinator (`ss-background`) and the wasm
//! bindings (`ss-wasm`) drive it.
//!
//! # Architecture
//!
//! The keyword list fetched from the backend is normalized into a
//! [`KeywordSet`] and compiled into a single [`CompiledMatcher`]. The
//! [`MaskEngine`] walks a [`Document`] and swaps matched text for placeholder
//! spans that keep the original text, so masking can always be undone. A
//! [`MutationWatcher`] keeps masking current as the page changes.
//!
//! # Modules
//!
//! - `keywords`: keyword normalization and matcher compilation
//! - `dom`: arena document model with mutation observation
//! - `mask`: placeholder insertion and removal
//! - `watcher`: incremental re-masking of live mutations
//! - `dedup`: per-page and time-windowed report suppression
//! - `focus`: blocked-site decision for focus mode
//! - `content`: per-page coordinator tying the above together
//! - `url`: allocation-free URL helpers
//! - `types`: shared data model and extension messages

pub mod content;
pub mod dedup;
pub mod dom;
pub mod focus;
pub mod keywords;
pub mod mask;
pub mod types;
pub mod url;
pub mod watcher;

// Re-export commonly used types
pub use content::ContentSession;
pub use dedup::{normalize_match_text, ReportCache, ReportedMatches};
pub use dom::{Document, NodeId, Subscription};
pub use focus::{blocked_redirect, is_blocked_host, matching_site, normalize_sites};
pub use keywords::{CompiledMatcher, KeywordError, KeywordSet, Segment};
pub use mask::MaskEngine;
pub use types::{FocusState, Message, Response};
pub use watcher::MutationWatcher;
