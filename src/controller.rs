//! Dashboard controller.
//!
//! Owns the whole session lifecycle as an explicit state machine:
//!
//! ```text
//! LoggedOut --login--> Authenticating --success--> LoggedIn(home)
//!                                      --failure--> LoggedOut
//! LoggedIn(s) --navigate(s')--> LoggedIn(s')   (poller untouched)
//! LoggedIn(s) --logout------> LoggedOut        (poller stopped first)
//! LoggedIn(s) --401---------> LoggedOut        (forced logout)
//! ```
//!
//! Teardown ordering is the invariant that matters: logout stops the poller
//! before the session store is cleared, so no tick can observe a cleared
//! identity. Login results carry the epoch at which the attempt began; a
//! result whose epoch no longer matches (logout won the race) is discarded
//! instead of resurrecting a dead session.

use crate::api::{ApiError, BackendApi};
use crate::auth::{AuthError, Authenticator, LoginOutcome};
use crate::content::{ContentLoader, RenderedSection};
use crate::identity::Session;
use crate::nav::{NavEntry, NavError, NavigationResolver};
use crate::poller::MetricsPoller;
use crate::store::SessionStore;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

/// Section every successful login lands on.
pub const DEFAULT_SECTION: &str = "home";

/// Controller errors
#[derive(Debug, Error)]
pub enum ControllerError {
    #[error(transparent)]
    Auth(#[from] AuthError),

    #[error(transparent)]
    Nav(#[from] NavError),

    #[error("Not logged in")]
    NotLoggedIn,

    #[error("Already logged in - log out first")]
    AlreadyLoggedIn,

    #[error("Login result discarded: session changed while the request was in flight")]
    Superseded,
}

/// Controller state.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DashboardState {
    LoggedOut,
    Authenticating,
    LoggedIn { section: String },
}

/// Epoch marker handed out when a login attempt begins. A completed attempt
/// is applied only if the controller's epoch still matches.
#[derive(Debug, Clone, Copy)]
pub struct LoginAttempt(u64);

/// Everything the UI needs after a successful login.
#[derive(Debug)]
pub struct LoginReport {
    pub used_fallback: bool,
    pub navigation: Vec<NavEntry>,
    pub home: RenderedSection,
}

pub struct DashboardController {
    store: SessionStore,
    authenticator: Authenticator,
    resolver: NavigationResolver,
    loader: ContentLoader,
    poller: MetricsPoller,
    unauthorized_rx: mpsc::Receiver<()>,
    session: Option<Session>,
    state: DashboardState,
    epoch: u64,
}

impl DashboardController {
    pub fn new(
        store: SessionStore,
        authenticator: Authenticator,
        resolver: NavigationResolver,
        loader: ContentLoader,
        backend: Arc<dyn BackendApi>,
        poll_interval: Duration,
    ) -> Self {
        let (unauthorized_tx, unauthorized_rx) = mpsc::channel(1);
        let poller = MetricsPoller::new(backend, poll_interval, unauthorized_tx);

        Self {
            store,
            authenticator,
            resolver,
            loader,
            poller,
            unauthorized_rx,
            session: None,
            state: DashboardState::LoggedOut,
            epoch: 0,
        }
    }

    pub fn state(&self) -> &DashboardState {
        &self.state
    }

    pub fn session(&self) -> Option<&Session> {
        self.session.as_ref()
    }

    pub fn is_polling(&self) -> bool {
        self.poller.is_running()
    }

    /// Adopt a persisted session at startup, if one exists. Lands on the
    /// default section with the poller running under the persisted bearer
    /// token. A no-op while a session is already resident.
    pub fn restore_session(&mut self) -> Result<Option<LoginReport>, ControllerError> {
        if self.session.is_some() {
            return Ok(None);
        }
        let Some(session) = self.store.restore() else {
            return Ok(None);
        };

        info!(
            "Resuming session for {} ({})",
            session.identity.username, session.identity.role
        );
        self.enter_logged_in(session, false).map(Some)
    }

    /// Authenticate and, on success, enter the dashboard. Failure leaves the
    /// controller in `LoggedOut` with the error surfaced for the form.
    pub async fn login(
        &mut self,
        username: &str,
        password: &str,
    ) -> Result<LoginReport, ControllerError> {
        let attempt = self.begin_login()?;
        let result = self.authenticator.login(username, password).await;
        self.complete_login(attempt, result)
    }

    /// Enter the dashboard from an externally-issued bearer token (OAuth
    /// redirect). `MalformedToken` surfaces without retry.
    pub fn login_with_token(&mut self, token: &str) -> Result<LoginReport, ControllerError> {
        let attempt = self.begin_login()?;
        let result = self
            .authenticator
            .login_with_external_token(token)
            .map(LoginOutcome::Remote);
        self.complete_login(attempt, result)
    }

    /// Mark the start of a login attempt. Public so callers driving the
    /// authenticator themselves (or tests) can split the attempt from its
    /// completion. Rejected while a session is resident: a re-login must go
    /// through `logout` first so the poller and store are torn down in
    /// order.
    pub fn begin_login(&mut self) -> Result<LoginAttempt, ControllerError> {
        if self.session.is_some() {
            return Err(ControllerError::AlreadyLoggedIn);
        }
        self.state = DashboardState::Authenticating;
        Ok(LoginAttempt(self.epoch))
    }

    /// Apply a finished login attempt. A result from a superseded epoch is
    /// discarded: the session it would create is already dead.
    pub fn complete_login(
        &mut self,
        attempt: LoginAttempt,
        result: Result<LoginOutcome, AuthError>,
    ) -> Result<LoginReport, ControllerError> {
        if self.session.is_some() {
            return Err(ControllerError::AlreadyLoggedIn);
        }
        if attempt.0 != self.epoch {
            warn!("Discarding late login result from a previous session epoch");
            return Err(ControllerError::Superseded);
        }

        match result {
            Ok(outcome) => {
                let used_fallback = outcome.used_fallback();
                self.enter_logged_in(outcome.into_session(), used_fallback)
            }
            Err(err) => {
                debug!("Login failed: {}", err);
                self.state = DashboardState::LoggedOut;
                Err(err.into())
            }
        }
    }

    fn enter_logged_in(
        &mut self,
        session: Session,
        used_fallback: bool,
    ) -> Result<LoginReport, ControllerError> {
        let navigation = self.resolver.entries_for(session.role())?.to_vec();

        self.store.save(&session);
        let home = self.loader.load_section(&session.identity, DEFAULT_SECTION);
        self.poller.start(session.token.clone());

        self.state = DashboardState::LoggedIn {
            section: DEFAULT_SECTION.to_string(),
        };
        self.session = Some(session);

        Ok(LoginReport {
            used_fallback,
            navigation,
            home,
        })
    }

    /// Render another section. Only valid while logged in; never restarts
    /// the poller.
    pub fn navigate(&mut self, section_id: &str) -> Result<RenderedSection, ControllerError> {
        let session = self.session.as_ref().ok_or(ControllerError::NotLoggedIn)?;

        let rendered = self.loader.load_section(&session.identity, section_id);
        self.state = DashboardState::LoggedIn {
            section: section_id.to_string(),
        };
        Ok(rendered)
    }

    /// The menu for the current role.
    pub fn navigation(&self) -> Result<&[NavEntry], ControllerError> {
        let session = self.session.as_ref().ok_or(ControllerError::NotLoggedIn)?;
        Ok(self.resolver.entries_for(session.role())?)
    }

    /// Stop the poller, then clear the session. Idempotent.
    pub async fn logout(&mut self) {
        // Poller first: no tick may fire against a cleared session.
        self.poller.stop().await;
        self.loader.reset();
        self.store.clear();
        self.session = None;
        self.epoch += 1;
        self.state = DashboardState::LoggedOut;
        info!("Logged out");
    }

    /// React to an API error from any collaborator; a 401 forces logout.
    /// Returns true if the session was torn down.
    pub async fn handle_api_error(&mut self, err: &ApiError) -> bool {
        if matches!(err, ApiError::Unauthorized) && self.session.is_some() {
            warn!("Backend rejected the session credential, forcing logout");
            self.logout().await;
            return true;
        }
        false
    }

    /// Consume a pending 401 notification from the poller, forcing logout
    /// if one arrived. Call from the event loop.
    pub async fn check_forced_logout(&mut self) -> bool {
        if self.unauthorized_rx.try_recv().is_ok() {
            self.handle_api_error(&ApiError::Unauthorized).await
        } else {
            false
        }
    }

    /// Current displayed metrics (what the poller last managed to fetch).
    pub async fn displayed_metrics(&self) -> crate::poller::DisplayedMetrics {
        self.poller.displayed().await
    }
}
