//! Dashboard Controller Integration Tests
//!
//! Drives the full state machine over a file-backed session store and a
//! mock backend API.

use async_trait::async_trait;
use chrono::Utc;
use claimwatch::{
    ApiError, Authenticator, BackendApi, ContentLoader, DashboardController, DashboardState,
    FileStore, MetricsSnapshot, NavigationResolver, Role, SessionStore,
};
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tempfile::TempDir;

struct MockBackend {
    metric_calls: AtomicU64,
    reject_with_401: AtomicBool,
}

impl MockBackend {
    fn new() -> Arc<Self> {
        Arc::new(Self {
            metric_calls: AtomicU64::new(0),
            reject_with_401: AtomicBool::new(false),
        })
    }
}

#[async_trait]
impl BackendApi for MockBackend {
    async fn fetch_metrics(&self, _token: Option<&str>) -> Result<MetricsSnapshot, ApiError> {
        self.metric_calls.fetch_add(1, Ordering::SeqCst);
        if self.reject_with_401.load(Ordering::SeqCst) {
            return Err(ApiError::Unauthorized);
        }
        Ok(MetricsSnapshot {
            active_claims: 240,
            flagged_claims: 18,
            open_investigations: 5,
            fraud_prevented_usd: 1_250_000.0,
            fetched_at: Utc::now(),
        })
    }

    async fn alert_count(&self, _token: Option<&str>) -> Result<u64, ApiError> {
        if self.reject_with_401.load(Ordering::SeqCst) {
            return Err(ApiError::Unauthorized);
        }
        Ok(18)
    }
}

fn create_controller(session_path: PathBuf, backend: Arc<MockBackend>) -> DashboardController {
    DashboardController::new(
        SessionStore::new(Box::new(
            FileStore::open(session_path).expect("Failed to open session store"),
        )),
        // Nothing listens on port 9, so every login takes the fallback path.
        Authenticator::with_timeout("http://127.0.0.1:9", Duration::from_millis(200)),
        NavigationResolver::with_defaults(),
        ContentLoader::with_defaults(),
        backend as Arc<dyn BackendApi>,
        Duration::from_millis(25),
    )
}

#[tokio::test]
async fn test_login_navigate_logout_scenario() {
    let temp = TempDir::new().unwrap();
    let path = temp.path().join("session.json");
    let backend = MockBackend::new();
    let mut controller = create_controller(path.clone(), Arc::clone(&backend));

    assert_eq!(*controller.state(), DashboardState::LoggedOut);
    assert!(!controller.is_polling());

    // Remote unreachable: provider/password lands via fallback on home.
    let report = controller.login("provider", "password").await.unwrap();
    assert!(report.used_fallback);
    assert_eq!(report.home.section, "home");
    assert_eq!(
        *controller.state(),
        DashboardState::LoggedIn { section: "home".into() }
    );
    assert!(controller.is_polling());

    // The first refresh is immediate.
    tokio::time::sleep(Duration::from_millis(15)).await;
    let displayed = controller.displayed_metrics().await;
    assert_eq!(displayed.alert_count, Some(18));

    // Navigating changes the section and leaves the poller alone.
    let rendered = controller.navigate("claim-tracker").unwrap();
    assert_eq!(rendered.title, "Claim Tracker");
    assert_eq!(
        *controller.state(),
        DashboardState::LoggedIn { section: "claim-tracker".into() }
    );
    assert!(controller.is_polling());

    // Logout: state machine back to LoggedOut, session gone from disk,
    // and no poll tick after teardown.
    controller.logout().await;
    assert_eq!(*controller.state(), DashboardState::LoggedOut);

    let calls_after_logout = backend.metric_calls.load(Ordering::SeqCst);
    tokio::time::sleep(Duration::from_millis(100)).await;
    assert_eq!(backend.metric_calls.load(Ordering::SeqCst), calls_after_logout);

    let mut fresh = create_controller(path, MockBackend::new());
    assert!(fresh.restore_session().unwrap().is_none());
}

#[tokio::test]
async fn test_restored_session_matches_login_identity() {
    let temp = TempDir::new().unwrap();
    let path = temp.path().join("session.json");

    let identity = {
        let mut controller = create_controller(path.clone(), MockBackend::new());
        let report = controller.login("investigator", "password").await.unwrap();
        assert_eq!(report.navigation.iter().map(|e| e.id).next(), Some("home"));
        controller.session().unwrap().identity.clone()
        // Dropped without logout: the session stays on disk.
    };

    let mut resumed = create_controller(path, MockBackend::new());
    let report = resumed
        .restore_session()
        .unwrap()
        .expect("persisted session expected");
    assert_eq!(resumed.session().unwrap().identity, identity);
    assert_eq!(resumed.session().unwrap().identity.role, Role::Investigator);
    assert_eq!(report.home.section, "home");
    assert!(resumed.is_polling());

    resumed.logout().await;
}

#[tokio::test]
async fn test_corrupt_session_file_is_discarded() {
    let temp = TempDir::new().unwrap();
    let path = temp.path().join("session.json");

    // A valid store file whose session entry is not a valid identity.
    std::fs::write(
        &path,
        r#"{"claimwatch_session": "{\"id\": \"truncated"}"#,
    )
    .unwrap();

    let mut controller = create_controller(path.clone(), MockBackend::new());
    assert!(controller.restore_session().unwrap().is_none());
    assert_eq!(*controller.state(), DashboardState::LoggedOut);

    // The corrupt entry was removed, not left to fail again.
    let data = std::fs::read_to_string(&path).unwrap();
    assert!(!data.contains("truncated"));
}

#[tokio::test]
async fn test_poller_401_forces_logout() {
    let temp = TempDir::new().unwrap();
    let path = temp.path().join("session.json");
    let backend = MockBackend::new();
    let mut controller = create_controller(path.clone(), Arc::clone(&backend));

    controller.login("analyst", "password").await.unwrap();
    assert!(controller.is_polling());

    // The backend starts rejecting the credential mid-session.
    backend.reject_with_401.store(true, Ordering::SeqCst);
    tokio::time::sleep(Duration::from_millis(80)).await;

    assert!(controller.check_forced_logout().await);
    assert_eq!(*controller.state(), DashboardState::LoggedOut);
    assert!(!controller.is_polling());

    // Forced logout also cleared the persisted session.
    let mut fresh = create_controller(path, MockBackend::new());
    assert!(fresh.restore_session().unwrap().is_none());
}

#[tokio::test]
async fn test_unknown_section_renders_placeholder_for_any_role() {
    let temp = TempDir::new().unwrap();
    let mut controller =
        create_controller(temp.path().join("session.json"), MockBackend::new());

    controller.login("admin", "password").await.unwrap();
    let rendered = controller.navigate("unknown-section-xyz").unwrap();
    assert!(rendered.body.contains("Unknown Section Xyz"));

    controller.logout().await;
}
