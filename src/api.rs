//! Authenticated backend API seam.
//!
//! Every call carries `Authorization: Bearer <token>`. A 401 response maps
//! to [`ApiError::Unauthorized`] - the one externally observable trigger for
//! forced logout. The trait exists so the poller and tests can run against
//! mock collaborators.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use reqwest::{Client, StatusCode};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// API errors
#[derive(Debug, Error)]
pub enum ApiError {
    /// The backend rejected the bearer token (401).
    #[error("Session expired or invalid")]
    Unauthorized,

    #[error("Backend error: {0}")]
    Backend(String),

    #[error("Transport error: {0}")]
    Transport(String),
}

/// Volatile dashboard metrics refreshed by the poller.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MetricsSnapshot {
    pub active_claims: u64,
    pub flagged_claims: u64,
    pub open_investigations: u64,
    pub fraud_prevented_usd: f64,
    #[serde(default = "Utc::now")]
    pub fetched_at: DateTime<Utc>,
}

/// Backend collaborator behind the dashboard.
#[async_trait]
pub trait BackendApi: Send + Sync {
    async fn fetch_metrics(&self, token: Option<&str>) -> Result<MetricsSnapshot, ApiError>;

    async fn alert_count(&self, token: Option<&str>) -> Result<u64, ApiError>;
}

#[derive(Debug, Deserialize)]
struct AlertCountResponse {
    count: u64,
}

/// Production backend over HTTP.
#[derive(Clone)]
pub struct HttpBackend {
    client: Client,
    origin: String,
}

impl HttpBackend {
    pub fn new(origin: &str) -> Self {
        Self {
            client: Client::new(),
            origin: origin.trim_end_matches('/').to_string(),
        }
    }

    async fn get_json<T: serde::de::DeserializeOwned>(
        &self,
        path: &str,
        token: Option<&str>,
    ) -> Result<T, ApiError> {
        let mut request = self.client.get(format!("{}{}", self.origin, path));
        if let Some(token) = token {
            request = request.bearer_auth(token);
        }

        let response = request
            .send()
            .await
            .map_err(|e| ApiError::Transport(e.to_string()))?;

        match response.status() {
            StatusCode::UNAUTHORIZED => Err(ApiError::Unauthorized),
            status if status.is_success() => response
                .json()
                .await
                .map_err(|e| ApiError::Backend(format!("malformed body: {}", e))),
            status => Err(ApiError::Backend(format!("{} returned {}", path, status))),
        }
    }
}

#[async_trait]
impl BackendApi for HttpBackend {
    async fn fetch_metrics(&self, token: Option<&str>) -> Result<MetricsSnapshot, ApiError> {
        self.get_json("/api/metrics", token).await
    }

    async fn alert_count(&self, token: Option<&str>) -> Result<u64, ApiError> {
        let body: AlertCountResponse = self.get_json("/api/alerts/count", token).await?;
        Ok(body.count)
    }
}
