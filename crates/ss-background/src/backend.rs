//! SafeSpace backend REST client
//!
//! Endpoints consumed:
//!
//! - `GET  /moderation/keywords` → `{keywords: [string]}`
//! - `POST /moderate`            ← `{text, user, url, context}`
//! - `GET  /focus/status`        → focus state
//! - `POST /focus/start`         ← `{blocked_sites: [string]}` → focus state
//! - `POST /focus/stop`          → focus state

use std::collections::BTreeMap;

use async_trait::async_trait;
use log::debug;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use ss_core::FocusState;

use crate::error::{Error, Result};

/// Body of a `POST /moderate` report.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModerationReport {
    pub text: String,
    pub user: String,
    pub url: String,
    /// Page title the text was found on
    pub context: String,
}

/// Backend verdict for a report.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModerationVerdict {
    #[serde(default)]
    pub flagged: bool,
    #[serde(default)]
    pub categories: BTreeMap<String, bool>,
}

impl ModerationVerdict {
    /// Names of the categories that matched.
    pub fn matched_categories(&self) -> Vec<&str> {
        self.categories
            .iter()
            .filter(|(_, hit)| **hit)
            .map(|(name, _)| name.as_str())
            .collect()
    }
}

#[derive(Debug, Deserialize)]
struct KeywordsBody {
    #[serde(default)]
    keywords: Vec<String>,
}

#[derive(Debug, Serialize)]
struct FocusStartBody<'a> {
    blocked_sites: &'a [String],
}

/// The authoritative remote service.
#[async_trait]
pub trait Backend: Send + Sync {
    /// Raw keyword list, not yet normalized.
    async fn fetch_keywords(&self) -> Result<Vec<String>>;

    async fn report(&self, report: &ModerationReport) -> Result<ModerationVerdict>;

    async fn focus_status(&self) -> Result<FocusState>;

    async fn focus_start(&self, blocked_sites: &[String]) -> Result<FocusState>;

    async fn focus_stop(&self) -> Result<FocusState>;
}

/// [`Backend`] over HTTP.
#[derive(Debug, Clone)]
pub struct HttpBackend {
    client: reqwest::Client,
    base_url: String,
}

impl HttpBackend {
    pub fn new(base_url: &str) -> Self {
        Self::with_client(reqwest::Client::new(), base_url)
    }

    pub fn with_client(client: reqwest::Client, base_url: &str) -> Self {
        Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    async fn decode<T: DeserializeOwned>(response: reqwest::Response) -> Result<T> {
        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(Error::Status { status: status.as_u16(), body });
        }
        let bytes = response.bytes().await?;
        Ok(serde_json::from_slice(&bytes)?)
    }

    async fn get<T: DeserializeOwned>(&self, path: &str) -> Result<T> {
        debug!("GET {}", path);
        let response = self.client.get(self.url(path)).send().await?;
        Self::decode(response).await
    }

    async fn post<B: Serialize + ?Sized, T: DeserializeOwned>(&self, path: &str, body: &B) -> Result<T> {
        debug!("POST {}", path);
        let response = self.client.post(self.url(path)).json(body).send().await?;
        Self::decode(response).await
    }
}

#[async_trait]
impl Backend for HttpBackend {
    async fn fetch_keywords(&self) -> Result<Vec<String>> {
        let body: KeywordsBody = self.get("/moderation/keywords").await?;
        Ok(body.keywords)
    }

    async fn report(&self, report: &ModerationReport) -> Result<ModerationVerdict> {
        self.post("/moderate", report).await
    }

    async fn focus_status(&self) -> Result<FocusState> {
        self.get("/focus/status").await
    }

    async fn focus_start(&self, blocked_sites: &[String]) -> Result<FocusState> {
        self.post("/focus/start", &FocusStartBody { blocked_sites }).await
    }

    async fn focus_stop(&self) -> Result<FocusState> {
        self.post("/focus/stop", &serde_json::json!({})).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_base_url_is_trimmed() {
        let backend = HttpBackend::new("http://localhost:5000/");
        assert_eq!(backend.url("/focus/status"), "http://localhost:5000/focus/status");
    }

    #[test]
    fn test_verdict_decoding() {
        let verdict: ModerationVerdict = serde_json::from_str(
            r#"{"flagged":true,"categories":{"violence":false,"profanity":true}}"#,
        )
        .unwrap();
        assert!(verdict.flagged);
        assert_eq!(verdict.matched_categories(), vec!["profanity"]);
    }

    #[test]
    fn test_report_body_shape() {
        let report = ModerationReport {
            text: "spam".into(),
            user: "extension".into(),
            url: "https://a.test/".into(),
            context: "A".into(),
        };
        assert_eq!(
            serde_json::to_value(&report).unwrap(),
            serde_json::json!({"text":"spam","user":"extension","url":"https://a.test/","context":"A"})
        );
    }
}
