//! External activity collaborators: uploads, chat sessions, and study
//! metrics, all owned by remote services.

use std::env;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use study_core::model::{ChatSessionStat, Upload, UserId};
use study_core::summary::StudyMetrics;
use url::Url;

use crate::error::UpstreamError;

const DEFAULT_TIMEOUT_MS: u64 = 3000;

/// Lists a user's uploaded documents.
#[async_trait]
pub trait UploadSource: Send + Sync {
    async fn list_uploads(&self, user: UserId) -> Result<Vec<Upload>, UpstreamError>;
}

/// Lists a user's chat sessions with their message counts.
#[async_trait]
pub trait ChatActivitySource: Send + Sync {
    async fn list_sessions(&self, user: UserId) -> Result<Vec<ChatSessionStat>, UpstreamError>;
}

/// Supplies time spent and efficiency score, both computed elsewhere.
#[async_trait]
pub trait StudyMetricsSource: Send + Sync {
    async fn study_metrics(&self, user: UserId) -> Result<StudyMetrics, UpstreamError>;
}

#[derive(Clone, Debug)]
pub struct ActivityApiConfig {
    pub base_url: String,
    pub token: Option<String>,
    pub timeout: Duration,
}

impl ActivityApiConfig {
    /// Read `STUDY_API_BASE_URL`, `STUDY_API_TOKEN`, and `STUDY_API_TIMEOUT_MS`.
    ///
    /// Returns `None` when no base URL is set.
    #[must_use]
    pub fn from_env() -> Option<Self> {
        let base_url = env::var("STUDY_API_BASE_URL").ok()?;
        if base_url.trim().is_empty() {
            return None;
        }
        let token = env::var("STUDY_API_TOKEN")
            .ok()
            .filter(|token| !token.trim().is_empty());
        let timeout_ms = env::var("STUDY_API_TIMEOUT_MS")
            .ok()
            .and_then(|value| value.parse::<u64>().ok())
            .unwrap_or(DEFAULT_TIMEOUT_MS);
        Some(Self {
            base_url,
            token,
            timeout: Duration::from_millis(timeout_ms),
        })
    }

    #[must_use]
    pub fn default_timeout() -> Duration {
        Duration::from_millis(DEFAULT_TIMEOUT_MS)
    }
}

/// Parse the API base URL. Requires an http(s) scheme and a host.
///
/// The path always ends in `/` so endpoints join beneath it.
///
/// # Errors
///
/// Returns `UpstreamError::Url` if the URL does not parse and
/// `UpstreamError::InvalidBaseUrl` for a non-http scheme or a missing host.
pub fn parse_base_url(raw: &str) -> Result<Url, UpstreamError> {
    let mut url = Url::parse(raw.trim())?;
    if !matches!(url.scheme(), "http" | "https") {
        return Err(UpstreamError::InvalidBaseUrl(format!(
            "unsupported scheme {}",
            url.scheme()
        )));
    }
    if url.host_str().is_none_or(str::is_empty) {
        return Err(UpstreamError::InvalidBaseUrl(format!("missing host in {raw}")));
    }
    if !url.path().ends_with('/') {
        let path = format!("{}/", url.path());
        url.set_path(&path);
    }
    Ok(url)
}

/// HTTP client for the study API. Without configuration every call fails
/// with `UpstreamError::Disabled`.
#[derive(Clone)]
pub struct HttpActivityClient {
    client: Client,
    config: Option<ActivityApiConfig>,
}

impl HttpActivityClient {
    #[must_use]
    pub fn from_env() -> Self {
        Self::new(ActivityApiConfig::from_env())
    }

    #[must_use]
    pub fn new(config: Option<ActivityApiConfig>) -> Self {
        Self {
            client: Client::new(),
            config,
        }
    }

    #[must_use]
    pub fn enabled(&self) -> bool {
        self.config.is_some()
    }

    async fn get_json<T: for<'de> Deserialize<'de>>(
        &self,
        path: &str,
        user: UserId,
    ) -> Result<T, UpstreamError> {
        let config = self.config.as_ref().ok_or(UpstreamError::Disabled)?;
        let url = parse_base_url(&config.base_url)?.join(path)?;

        let mut request = self
            .client
            .get(url)
            .query(&[("user_id", user.value())]);
        if let Some(token) = &config.token {
            request = request.bearer_auth(token);
        }
        let response = request.send().await?;

        if !response.status().is_success() {
            return Err(UpstreamError::HttpStatus(response.status()));
        }
        Ok(response.json().await?)
    }
}

#[derive(Debug, Deserialize)]
struct UploadList {
    #[serde(default)]
    uploads: Vec<Upload>,
}

#[derive(Debug, Deserialize)]
struct SessionList {
    #[serde(default)]
    sessions: Vec<ChatSessionStat>,
}

#[derive(Debug, Deserialize)]
struct MetricsResponse {
    #[serde(default)]
    study_minutes: Vec<u32>,
    #[serde(default)]
    efficiency_score: f64,
}

#[async_trait]
impl UploadSource for HttpActivityClient {
    async fn list_uploads(&self, user: UserId) -> Result<Vec<Upload>, UpstreamError> {
        let body: UploadList = self.get_json("uploads/uploads", user).await?;
        Ok(body.uploads)
    }
}

#[async_trait]
impl ChatActivitySource for HttpActivityClient {
    async fn list_sessions(&self, user: UserId) -> Result<Vec<ChatSessionStat>, UpstreamError> {
        let body: SessionList = self.get_json("ai/chat/sessions", user).await?;
        Ok(body.sessions)
    }
}

#[async_trait]
impl StudyMetricsSource for HttpActivityClient {
    async fn study_metrics(&self, user: UserId) -> Result<StudyMetrics, UpstreamError> {
        let body: MetricsResponse = self.get_json("progress/metrics", user).await?;
        Ok(StudyMetrics {
            session_minutes: body.study_minutes,
            efficiency_score: body.efficiency_score,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn unconfigured_client_is_disabled() {
        let client = HttpActivityClient::new(None);
        assert!(!client.enabled());
        let err = client.list_uploads(UserId::new(1)).await.unwrap_err();
        assert!(matches!(err, UpstreamError::Disabled));
    }

    #[test]
    fn upload_listing_parses_optional_counts() {
        let raw = r#"{
            "uploads": [{
                "id": 7,
                "filename": "notes.pdf",
                "file_type": "pdf",
                "file_size": 2048,
                "status": "completed",
                "created_at": "2024-03-01T10:00:00Z",
                "parsed_data": { "total_questions": 12 }
            }]
        }"#;
        let body: UploadList = serde_json::from_str(raw).unwrap();
        assert_eq!(body.uploads.len(), 1);
        assert_eq!(body.uploads[0].parsed_data.total_questions, Some(12));
        assert_eq!(body.uploads[0].parsed_data.total_concepts, None);
    }

    #[test]
    fn base_url_requires_http_scheme_and_host() {
        assert!(parse_base_url("https://").is_err());
        assert!(parse_base_url("localhost:8000").is_err());
        assert!(parse_base_url("ftp://files.example.com").is_err());
        assert!(parse_base_url("not a url").is_err());
    }

    #[test]
    fn endpoints_join_under_base_path() {
        let base = parse_base_url("http://127.0.0.1:5000/api").unwrap();
        assert_eq!(
            base.join("uploads/uploads").unwrap().as_str(),
            "http://127.0.0.1:5000/api/uploads/uploads"
        );
        let bare = parse_base_url("https://study.example.com").unwrap();
        assert_eq!(
            bare.join("progress/metrics").unwrap().as_str(),
            "https://study.example.com/progress/metrics"
        );
    }

    #[test]
    fn upload_listing_accepts_backend_timestamps() {
        let raw = r#"{
            "uploads": [{
                "id": 3,
                "user_id": 1,
                "filename": "notes.pdf",
                "file_url": "/uploads/notes.pdf",
                "file_type": "pdf",
                "file_size": 2048,
                "parsed_data": {},
                "status": "uploaded",
                "created_at": "2024-03-01T10:00:00.123456",
                "updated_at": "2024-03-01T10:00:00.123456"
            }]
        }"#;
        let body: UploadList = serde_json::from_str(raw).unwrap();
        assert_eq!(body.uploads.len(), 1);
        assert_eq!(body.uploads[0].filename, "notes.pdf");
    }

    #[test]
    fn metrics_default_when_fields_missing() {
        let body: MetricsResponse = serde_json::from_str("{}").unwrap();
        assert!(body.study_minutes.is_empty());
        assert_eq!(body.efficiency_score, 0.0);
    }
}
