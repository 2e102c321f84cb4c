//! SafeSpace background coordinator
//!
//! The long-lived half of the extension. It mirrors authoritative state
//! from the backend, answers messages from content scripts and UI surfaces,
//! enforces focus-mode blocking across tabs and forwards flagged content.
//!
//! All browser and network access goes through the [`Backend`], [`Tabs`] and
//! [`Storage`] traits so the coordinator runs unchanged against the real
//! extension host, the CLI, or in-memory fakes.

pub mod background;
pub mod backend;
pub mod config;
pub mod error;
pub mod focus;
pub mod keywords;
pub mod reports;
pub mod storage;
pub mod sync;
pub mod tabs;

#[cfg(test)]
pub(crate) mod testing;

pub use background::Background;
pub use backend::{Backend, HttpBackend, ModerationReport, ModerationVerdict};
pub use config::BackgroundConfig;
pub use error::{Error, Result};
pub use focus::FocusController;
pub use keywords::KeywordCache;
pub use reports::ReportForwarder;
pub use storage::{JsonFileStorage, MemoryStorage, Storage};
pub use sync::StateSyncLoop;
pub use tabs::{Tab, Tabs};
