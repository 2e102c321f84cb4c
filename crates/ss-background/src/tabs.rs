//! Browser tab abstraction.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::Result;

/// Snapshot of a browser tab.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Tab {
    pub id: i32,
    /// Absent for tabs the extension may not inspect
    #[serde(default)]
    pub url: Option<String>,
}

impl Tab {
    pub fn new(id: i32, url: impl Into<String>) -> Self {
        Self { id, url: Some(url.into()) }
    }
}

#[async_trait]
pub trait Tabs: Send + Sync {
    /// Every open tab.
    async fn list(&self) -> Result<Vec<Tab>>;

    /// Navigate `tab_id` to `url`.
    async fn redirect(&self, tab_id: i32, url: &str) -> Result<()>;
}
