//! Authentication.
//!
//! Produces an identity + token pair from credentials, preferring the real
//! backend. The flow is remote-first with a static local fallback:
//!
//! 1. Empty fields fail fast - no network call is issued.
//! 2. One remote attempt against `POST <origin>/auth/login` with a bounded
//!    timeout. A 2xx payload carrying a user object wins outright.
//! 3. Anything else (transport error, non-2xx, payload without a user) falls
//!    back to the built-in demo credential table, which accepts the shared
//!    literal password `"password"` for its known usernames.
//!
//! The external-token entry point decodes the middle segment of a
//! three-segment bearer token to recover the identity fields. No signature
//! verification happens client-side; the backend owns that.

use crate::identity::{AuthMethod, Identity, Role, Session};
use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine};
use reqwest::Client;
use serde::Deserialize;
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, info, warn};

/// Remote login attempt timeout. The source dashboard had none; an
/// unresponsive backend would have delayed fallback indefinitely.
pub const DEFAULT_LOGIN_TIMEOUT: Duration = Duration::from_secs(5);

/// Shared password for the demo fallback table.
const FALLBACK_PASSWORD: &str = "password";

/// One demo account per role, keyed by username.
const FALLBACK_ACCOUNTS: &[(&str, &str, Role)] = &[
    ("admin", "System Administrator", Role::Admin),
    ("analyst", "Fraud Analyst", Role::Analyst),
    ("investigator", "Claims Investigator", Role::Investigator),
    ("provider", "Healthcare Provider", Role::Provider),
    ("patient", "Patient", Role::Patient),
    ("regulator", "Insurance Regulator", Role::Regulator),
];

/// Authentication errors
#[derive(Debug, Error)]
pub enum AuthError {
    #[error("Username and password are required")]
    InvalidInput,

    #[error("Invalid credentials")]
    InvalidCredentials,

    #[error("Login succeeded but user data could not be decoded")]
    MalformedToken,

    #[error("Auth service error: {0}")]
    Service(String),
}

/// How a successful login was satisfied. Lets callers (and tests) tell the
/// remote path apart from the local fallback.
#[derive(Debug, Clone)]
pub enum LoginOutcome {
    /// The remote auth service accepted the credentials.
    Remote(Session),
    /// The remote was unreachable or rejected the request and the demo
    /// table matched.
    Fallback(Session),
}

impl LoginOutcome {
    pub fn session(&self) -> &Session {
        match self {
            LoginOutcome::Remote(s) | LoginOutcome::Fallback(s) => s,
        }
    }

    pub fn into_session(self) -> Session {
        match self {
            LoginOutcome::Remote(s) | LoginOutcome::Fallback(s) => s,
        }
    }

    pub fn used_fallback(&self) -> bool {
        matches!(self, LoginOutcome::Fallback(_))
    }
}

/// Remote login response body.
#[derive(Debug, Deserialize)]
struct LoginResponse {
    user: Option<RemoteUser>,
    token: Option<String>,
}

#[derive(Debug, Deserialize)]
struct RemoteUser {
    id: serde_json::Value,
    username: String,
    #[serde(default)]
    name: Option<String>,
    #[serde(default)]
    email: Option<String>,
    role: Role,
}

impl RemoteUser {
    fn into_identity(self) -> Identity {
        // Backend ids may arrive as numbers or strings.
        let id = match &self.id {
            serde_json::Value::String(s) => s.clone(),
            other => other.to_string(),
        };
        let email = self
            .email
            .unwrap_or_else(|| format!("{}@claimwatch.local", self.username));
        let display_name = self.name.unwrap_or_else(|| self.username.clone());
        Identity {
            id,
            username: self.username,
            display_name,
            email,
            role: self.role,
            auth_method: AuthMethod::Linked,
        }
    }
}

/// Claims carried in the external bearer token's payload segment.
#[derive(Debug, Deserialize)]
struct TokenClaims {
    id: serde_json::Value,
    username: String,
    email: String,
    role: Role,
    #[serde(default)]
    name: Option<String>,
}

#[derive(Debug, Deserialize)]
struct GoogleAuthResponse {
    #[serde(rename = "authUrl")]
    auth_url: String,
}

/// Remote-first authenticator with a local demo fallback.
#[derive(Clone)]
pub struct Authenticator {
    client: Client,
    origin: String,
    login_timeout: Duration,
}

impl Authenticator {
    pub fn new(origin: &str) -> Self {
        Self::with_timeout(origin, DEFAULT_LOGIN_TIMEOUT)
    }

    pub fn with_timeout(origin: &str, login_timeout: Duration) -> Self {
        Self {
            client: Client::new(),
            origin: origin.trim_end_matches('/').to_string(),
            login_timeout,
        }
    }

    /// Authenticate with username/password. One remote attempt, then the
    /// fallback table; no retries.
    pub async fn login(&self, username: &str, password: &str) -> Result<LoginOutcome, AuthError> {
        if username.is_empty() || password.is_empty() {
            return Err(AuthError::InvalidInput);
        }

        match self.login_remote(username, password).await {
            Ok(session) => {
                info!("Remote login succeeded for {}", username);
                return Ok(LoginOutcome::Remote(session));
            }
            Err(err) => {
                debug!("Remote login unavailable ({}), trying fallback table", err);
            }
        }

        self.login_fallback(username, password)
            .map(LoginOutcome::Fallback)
    }

    async fn login_remote(&self, username: &str, password: &str) -> Result<Session, AuthError> {
        let url = format!("{}/auth/login", self.origin);

        let response = self
            .client
            .post(&url)
            .timeout(self.login_timeout)
            .json(&serde_json::json!({
                "username": username,
                "password": password,
            }))
            .send()
            .await
            .map_err(|e| AuthError::Service(e.to_string()))?;

        if !response.status().is_success() {
            return Err(AuthError::Service(format!(
                "login returned {}",
                response.status()
            )));
        }

        let body: LoginResponse = response
            .json()
            .await
            .map_err(|e| AuthError::Service(format!("malformed login body: {}", e)))?;

        let user = body
            .user
            .ok_or_else(|| AuthError::Service("login body missing user".into()))?;

        Ok(Session::new(user.into_identity(), body.token))
    }

    fn login_fallback(&self, username: &str, password: &str) -> Result<Session, AuthError> {
        let (name, role) = FALLBACK_ACCOUNTS
            .iter()
            .find(|(user, _, _)| *user == username)
            .map(|(_, name, role)| (*name, *role))
            .ok_or(AuthError::InvalidCredentials)?;

        if password != FALLBACK_PASSWORD {
            return Err(AuthError::InvalidCredentials);
        }

        warn!("Backend unreachable - using demo account for {} ({})", username, role);
        Ok(Session::new(Identity::local(username, name, role), None))
    }

    /// Build a session from an externally-issued bearer token (OAuth
    /// redirect). The payload segment is decoded without verification.
    pub fn login_with_external_token(&self, token: &str) -> Result<Session, AuthError> {
        let claims = decode_token_claims(token)?;

        let id = match &claims.id {
            serde_json::Value::String(s) => s.clone(),
            other => other.to_string(),
        };
        let display_name = claims.name.unwrap_or_else(|| claims.username.clone());

        let identity = Identity {
            id,
            username: claims.username,
            display_name,
            email: claims.email,
            role: claims.role,
            auth_method: AuthMethod::External,
        };

        Ok(Session::new(identity, Some(token.to_string())))
    }

    /// Fetch the Google OAuth hand-off URL from the backend.
    pub async fn google_auth_url(&self) -> Result<String, AuthError> {
        let url = format!("{}/auth/google", self.origin);

        let response = self
            .client
            .get(&url)
            .timeout(self.login_timeout)
            .send()
            .await
            .map_err(|e| AuthError::Service(e.to_string()))?;

        if !response.status().is_success() {
            return Err(AuthError::Service(format!(
                "auth/google returned {}",
                response.status()
            )));
        }

        let body: GoogleAuthResponse = response
            .json()
            .await
            .map_err(|e| AuthError::Service(format!("malformed auth/google body: {}", e)))?;

        Ok(body.auth_url)
    }
}

/// Decode the middle payload segment of a three-segment bearer token.
fn decode_token_claims(token: &str) -> Result<TokenClaims, AuthError> {
    let mut segments = token.split('.');
    let (Some(_), Some(payload), Some(_), None) = (
        segments.next(),
        segments.next(),
        segments.next(),
        segments.next(),
    ) else {
        return Err(AuthError::MalformedToken);
    };

    let bytes = URL_SAFE_NO_PAD
        .decode(payload)
        .map_err(|_| AuthError::MalformedToken)?;

    serde_json::from_slice(&bytes).map_err(|_| AuthError::MalformedToken)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn unreachable_authenticator() -> Authenticator {
        // Nothing listens here; remote attempts fail immediately.
        Authenticator::with_timeout("http://127.0.0.1:9", Duration::from_millis(200))
    }

    fn make_token(claims: &serde_json::Value) -> String {
        let payload = URL_SAFE_NO_PAD.encode(serde_json::to_vec(claims).unwrap());
        format!("header.{}.signature", payload)
    }

    #[tokio::test]
    async fn test_empty_fields_fail_fast() {
        let auth = unreachable_authenticator();
        assert!(matches!(
            auth.login("", "x").await,
            Err(AuthError::InvalidInput)
        ));
        assert!(matches!(
            auth.login("x", "").await,
            Err(AuthError::InvalidInput)
        ));
    }

    #[tokio::test]
    async fn test_fallback_accepts_demo_credentials() {
        let auth = unreachable_authenticator();
        let outcome = auth.login("analyst", "password").await.unwrap();

        assert!(outcome.used_fallback());
        let session = outcome.session();
        assert_eq!(session.role(), Role::Analyst);
        assert!(session.authenticated);
        assert!(session.token.is_none());
    }

    #[tokio::test]
    async fn test_fallback_rejects_wrong_password() {
        let auth = unreachable_authenticator();
        assert!(matches!(
            auth.login("analyst", "wrong").await,
            Err(AuthError::InvalidCredentials)
        ));
    }

    #[tokio::test]
    async fn test_fallback_rejects_unknown_username() {
        let auth = unreachable_authenticator();
        assert!(matches!(
            auth.login("nobody", "password").await,
            Err(AuthError::InvalidCredentials)
        ));
    }

    #[tokio::test]
    async fn test_every_role_has_a_fallback_account() {
        let auth = unreachable_authenticator();
        for role in Role::ALL {
            let outcome = auth.login(role.as_str(), "password").await.unwrap();
            assert_eq!(outcome.session().role(), role);
        }
    }

    #[test]
    fn test_external_token_decodes() {
        let auth = unreachable_authenticator();
        let token = make_token(&serde_json::json!({
            "id": 42,
            "username": "gmail-user",
            "email": "gmail-user@example.com",
            "role": "investigator",
            "name": "G. Mail User",
        }));

        let session = auth.login_with_external_token(&token).unwrap();
        assert_eq!(session.identity.id, "42");
        assert_eq!(session.identity.role, Role::Investigator);
        assert_eq!(session.identity.auth_method, AuthMethod::External);
        assert_eq!(session.token.as_deref(), Some(token.as_str()));
    }

    #[test]
    fn test_malformed_tokens_rejected() {
        let auth = unreachable_authenticator();

        // Wrong segment count.
        assert!(matches!(
            auth.login_with_external_token("just-one-segment"),
            Err(AuthError::MalformedToken)
        ));
        assert!(matches!(
            auth.login_with_external_token("a.b.c.d"),
            Err(AuthError::MalformedToken)
        ));

        // Payload is not base64.
        assert!(matches!(
            auth.login_with_external_token("a.!!!.c"),
            Err(AuthError::MalformedToken)
        ));

        // Payload is base64 but not JSON.
        let junk = URL_SAFE_NO_PAD.encode(b"not json");
        assert!(matches!(
            auth.login_with_external_token(&format!("a.{}.c", junk)),
            Err(AuthError::MalformedToken)
        ));

        // Claims carry a role outside the closed set.
        let token = make_token(&serde_json::json!({
            "id": 1,
            "username": "u",
            "email": "u@example.com",
            "role": "superuser",
        }));
        assert!(matches!(
            auth.login_with_external_token(&token),
            Err(AuthError::MalformedToken)
        ));
    }
}
