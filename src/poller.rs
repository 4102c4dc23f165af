//! Metrics refresh loop.
//!
//! While a session is authenticated, a background task refreshes the
//! volatile dashboard metrics and the alert-count badge: one immediate
//! refresh on start, then a fixed interval (30 s by default). Ticks are
//! independent - a failed fetch is logged and the previously displayed
//! values stay put; the interval never dies from a tick error. A 401 on a
//! tick is reported through a notification channel for the controller to
//! act on; the loop itself never tears down session state.
//!
//! Shutdown runs through a 1-slot channel so `stop()` cancels the task
//! synchronously with respect to the select loop, and `stop()` is
//! idempotent.

use crate::api::{ApiError, BackendApi, MetricsSnapshot};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{mpsc, RwLock};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

/// Default refresh cadence.
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(30);

/// What the dashboard currently shows. Retained across failed ticks.
#[derive(Debug, Clone, Default)]
pub struct DisplayedMetrics {
    pub metrics: Option<MetricsSnapshot>,
    pub alert_count: Option<u64>,
    /// Completed refresh attempts, successful or not.
    pub ticks: u64,
    pub failed_ticks: u64,
}

/// Fixed-interval metrics poller.
pub struct MetricsPoller {
    backend: Arc<dyn BackendApi>,
    interval: Duration,
    displayed: Arc<RwLock<DisplayedMetrics>>,
    unauthorized_tx: mpsc::Sender<()>,
    shutdown_tx: Option<mpsc::Sender<()>>,
    handle: Option<JoinHandle<()>>,
}

impl MetricsPoller {
    /// Create a poller. `unauthorized_tx` receives a unit message when a
    /// tick observes a 401.
    pub fn new(
        backend: Arc<dyn BackendApi>,
        interval: Duration,
        unauthorized_tx: mpsc::Sender<()>,
    ) -> Self {
        Self {
            backend,
            interval,
            displayed: Arc::new(RwLock::new(DisplayedMetrics::default())),
            unauthorized_tx,
            shutdown_tx: None,
            handle: None,
        }
    }

    /// Start polling with the session's bearer token. No-op if already
    /// running.
    pub fn start(&mut self, token: Option<String>) {
        if self.shutdown_tx.is_some() {
            debug!("Poller already running, not restarting");
            return;
        }

        let (tx, mut rx) = mpsc::channel::<()>(1);
        self.shutdown_tx = Some(tx);

        let backend = Arc::clone(&self.backend);
        let displayed = Arc::clone(&self.displayed);
        let unauthorized_tx = self.unauthorized_tx.clone();
        let interval = self.interval;

        self.handle = Some(tokio::spawn(async move {
            // First tick fires immediately, then on the fixed cadence.
            let mut ticker = tokio::time::interval(interval);
            loop {
                tokio::select! {
                    _ = ticker.tick() => {
                        Self::refresh_once(&backend, &displayed, &unauthorized_tx, token.as_deref()).await;
                    }
                    _ = rx.recv() => {
                        info!("Metrics poller shutting down");
                        break;
                    }
                }
            }
        }));

        info!("Metrics poller started ({}s interval)", self.interval.as_secs());
    }

    async fn refresh_once(
        backend: &Arc<dyn BackendApi>,
        displayed: &Arc<RwLock<DisplayedMetrics>>,
        unauthorized_tx: &mpsc::Sender<()>,
        token: Option<&str>,
    ) {
        let metrics = backend.fetch_metrics(token).await;
        let alerts = backend.alert_count(token).await;

        let mut state = displayed.write().await;
        state.ticks += 1;

        let mut failed = false;
        match metrics {
            Ok(snapshot) => state.metrics = Some(snapshot),
            Err(ApiError::Unauthorized) => {
                warn!("Metrics refresh rejected with 401");
                failed = true;
                // Full channel means a forced logout is already pending.
                let _ = unauthorized_tx.try_send(());
            }
            Err(err) => {
                warn!("Metrics refresh failed ({}), keeping previous values", err);
                failed = true;
            }
        }

        match alerts {
            Ok(count) => state.alert_count = Some(count),
            Err(ApiError::Unauthorized) => {
                failed = true;
                let _ = unauthorized_tx.try_send(());
            }
            Err(err) => {
                warn!("Alert count refresh failed ({}), keeping previous value", err);
                failed = true;
            }
        }

        if failed {
            state.failed_ticks += 1;
        }
    }

    /// Stop polling and wait for the task to exit. Safe to call when not
    /// running; never re-arms the timer.
    pub async fn stop(&mut self) {
        let Some(tx) = self.shutdown_tx.take() else {
            return;
        };
        let _ = tx.send(()).await;

        if let Some(handle) = self.handle.take() {
            let _ = handle.await;
        }
        info!("Metrics poller stopped");
    }

    pub fn is_running(&self) -> bool {
        self.shutdown_tx.is_some()
    }

    /// Snapshot of what the dashboard currently displays.
    pub async fn displayed(&self) -> DisplayedMetrics {
        self.displayed.read().await.clone()
    }
}
