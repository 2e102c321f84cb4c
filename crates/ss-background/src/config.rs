//! Background configuration.

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct BackgroundConfig {
    /// Base URL of the SafeSpace backend
    pub backend_url: String,
    /// Period of the focus/keyword re-sync loop
    pub sync_interval_secs: u64,
    /// Window during which a repeated report is suppressed
    pub report_ttl_secs: u64,
    /// Extension page tabs are redirected to while blocked
    pub blocked_page: String,
    /// `user` field sent with moderation reports
    pub report_user: String,
    /// JSON file for persisted state; in-memory when unset
    pub storage_path: Option<PathBuf>,
}

impl Default for BackgroundConfig {
    fn default() -> Self {
        Self {
            backend_url: "http://127.0.0.1:5000".to_string(),
            sync_interval_secs: 30,
            report_ttl_secs: 60,
            blocked_page: "blocked.html".to_string(),
            report_user: "extension".to_string(),
            storage_path: None,
        }
    }
}

impl BackgroundConfig {
    /// Load from a JSON file; missing fields take their defaults.
    pub fn from_file(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path)
            .map_err(|e| Error::Config(format!("Failed to read '{}': {}", path.display(), e)))?;
        let config: Self = serde_json::from_str(&text)
            .map_err(|e| Error::Config(format!("Failed to parse '{}': {}", path.display(), e)))?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if self.backend_url.trim().is_empty() {
            return Err(Error::Config("backend_url must not be empty".to_string()));
        }
        if self.sync_interval_secs == 0 {
            return Err(Error::Config("sync_interval_secs must be greater than zero".to_string()));
        }
        Ok(())
    }

    pub fn sync_interval(&self) -> Duration {
        Duration::from_secs(self.sync_interval_secs)
    }

    pub fn report_ttl(&self) -> Duration {
        Duration::from_secs(self.report_ttl_secs)
    }
}
