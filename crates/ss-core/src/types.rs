//! Shared data model for SafeSpace
//!
//! These types cross process boundaries: the backend REST payloads, the
//! background's persisted mirror and the messages exchanged between the
//! content script, the background coordinator and the popup/dashboard.

use serde::{Deserialize, Serialize};

// =============================================================================
// Focus State
// =============================================================================

/// Authoritative focus-mode state as reported by the backend.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FocusState {
    pub active: bool,
    #[serde(default)]
    pub blocked_sites: Vec<String>,
    #[serde(default)]
    pub duration_seconds: u64,
    /// ISO-8601 start of the running session, if any.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub started_at: Option<String>,
}

impl FocusState {
    /// State the background assumes before the first successful sync.
    pub fn inactive() -> Self {
        Self::default()
    }
}

// =============================================================================
// Flagged Content
// =============================================================================

/// A masked match, as reported from a page.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FlaggedContent {
    /// Matched text exactly as it appeared in the page
    pub text: String,
    /// Page URL
    pub url: String,
    /// Page title, sent to the backend as report context
    #[serde(default)]
    pub title: String,
}

// =============================================================================
// Messages
// =============================================================================

/// Extension-internal message, discriminated by its `type` tag.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "kebab-case")]
pub enum Message {
    /// Content → background, fire-and-forget activity ping.
    UserActive,
    /// Pull the current keyword list. `force` bypasses the cache.
    GetKeywords {
        #[serde(default)]
        force: bool,
    },
    /// Background → content push after the keyword list changed.
    KeywordsUpdated { keywords: Vec<String> },
    GetSafeMode,
    SetSafeMode { enabled: bool },
    /// Background → all listeners push after the flag changed.
    SafeModeChanged { enabled: bool },
    ContentFlagged {
        text: String,
        url: String,
        #[serde(default)]
        title: String,
    },
    FocusStart { blocked_sites: Vec<String> },
    FocusStop,
    GetFocusStatus,
    /// Background → all listeners push on every focus state change.
    FocusStatus { state: FocusState },
}

impl From<FlaggedContent> for Message {
    fn from(content: FlaggedContent) -> Self {
        Self::ContentFlagged { text: content.text, url: content.url, title: content.title }
    }
}

impl Message {
    /// Tag of the message as it appears on the wire.
    pub fn tag(&self) -> &'static str {
        match self {
            Self::UserActive => "user-active",
            Self::GetKeywords { .. } => "get-keywords",
            Self::KeywordsUpdated { .. } => "keywords-updated",
            Self::GetSafeMode => "get-safe-mode",
            Self::SetSafeMode { .. } => "set-safe-mode",
            Self::SafeModeChanged { .. } => "safe-mode-changed",
            Self::ContentFlagged { .. } => "content-flagged",
            Self::FocusStart { .. } => "focus-start",
            Self::FocusStop => "focus-stop",
            Self::GetFocusStatus => "get-focus-status",
            Self::FocusStatus { .. } => "focus-status",
        }
    }
}

// =============================================================================
// Responses
// =============================================================================

/// Data carried by a successful response.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Payload {
    Keywords(Vec<String>),
    SafeMode(bool),
    Focus(FocusState),
}

/// Uniform success/error envelope returned for every request message.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Response {
    pub ok: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub payload: Option<Payload>,
}

impl Response {
    /// Success without data.
    pub fn ack() -> Self {
        Self { ok: true, error: None, payload: None }
    }

    pub fn with(payload: Payload) -> Self {
        Self { ok: true, error: None, payload: Some(payload) }
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self { ok: false, error: Some(message.into()), payload: None }
    }
}
