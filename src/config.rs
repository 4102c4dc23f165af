//! Configuration management

use crate::auth::DEFAULT_LOGIN_TIMEOUT;
use crate::poller::DEFAULT_POLL_INTERVAL;
use anyhow::Result;
use std::path::PathBuf;
use std::time::Duration;

/// Dashboard core configuration
#[derive(Debug, Clone)]
pub struct Config {
    /// Backend origin for the auth service and metrics API
    pub api_origin: String,

    /// Where the session file lives
    pub session_path: PathBuf,

    /// Metrics refresh cadence
    pub poll_interval: Duration,

    /// Remote login attempt timeout
    pub login_timeout: Duration,
}

impl Config {
    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self> {
        let api_origin = std::env::var("CLAIMWATCH_API_ORIGIN")
            .unwrap_or_else(|_| "http://127.0.0.1:3000".to_string());

        let session_path = std::env::var("CLAIMWATCH_SESSION_PATH")
            .map(PathBuf::from)
            .unwrap_or_else(|_| {
                dirs::data_local_dir()
                    .unwrap_or_else(|| PathBuf::from("."))
                    .join("claimwatch")
                    .join("session.json")
            });

        let poll_interval = std::env::var("CLAIMWATCH_POLL_INTERVAL_SECS")
            .ok()
            .and_then(|v| v.parse().ok())
            .map(Duration::from_secs)
            .unwrap_or(DEFAULT_POLL_INTERVAL);

        let login_timeout = std::env::var("CLAIMWATCH_LOGIN_TIMEOUT_SECS")
            .ok()
            .and_then(|v| v.parse().ok())
            .map(Duration::from_secs)
            .unwrap_or(DEFAULT_LOGIN_TIMEOUT);

        Ok(Self {
            api_origin,
            session_path,
            poll_interval,
            login_timeout,
        })
    }
}
