//! Identity and session data model.
//!
//! An [`Identity`] is created on successful authentication and is immutable
//! for the lifetime of its session. A [`Session`] wraps the identity together
//! with the opaque bearer credential the backend issued (the local fallback
//! path issues none).

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

/// Dashboard roles. Closed set - navigation and content are keyed off these.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Admin,
    Analyst,
    Investigator,
    Provider,
    Patient,
    Regulator,
}

impl Role {
    /// All roles, in display order.
    pub const ALL: [Role; 6] = [
        Role::Admin,
        Role::Analyst,
        Role::Investigator,
        Role::Provider,
        Role::Patient,
        Role::Regulator,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Admin => "admin",
            Role::Analyst => "analyst",
            Role::Investigator => "investigator",
            Role::Provider => "provider",
            Role::Patient => "patient",
            Role::Regulator => "regulator",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Role {
    type Err = UnknownRole;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "admin" => Ok(Role::Admin),
            "analyst" => Ok(Role::Analyst),
            "investigator" => Ok(Role::Investigator),
            "provider" => Ok(Role::Provider),
            "patient" => Ok(Role::Patient),
            "regulator" => Ok(Role::Regulator),
            _ => Err(UnknownRole(s.to_string())),
        }
    }
}

/// A role string outside the closed set.
#[derive(Debug, Clone, thiserror::Error)]
#[error("unknown role: {0}")]
pub struct UnknownRole(pub String);

/// How the identity was established.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AuthMethod {
    /// Matched against the built-in demo credential table.
    Local,
    /// Issued by the external identity provider (OAuth redirect token).
    External,
    /// Backend account linked to an external identity.
    Linked,
}

/// The authenticated user. Owned by the session store; everything else reads.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Identity {
    pub id: String,
    pub username: String,
    pub display_name: String,
    pub email: String,
    pub role: Role,
    pub auth_method: AuthMethod,
}

impl Identity {
    /// Identity for the local fallback path. Gets a fresh local id and a
    /// placeholder email derived from the username.
    pub fn local(username: &str, display_name: &str, role: Role) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            username: username.to_string(),
            display_name: display_name.to_string(),
            email: format!("{}@claimwatch.local", username),
            role,
            auth_method: AuthMethod::Local,
        }
    }
}

/// An identity plus its bearer credential and liveness flag.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Session {
    pub identity: Identity,
    /// Opaque bearer token. `None` on the local fallback path.
    pub token: Option<String>,
    pub authenticated: bool,
}

impl Session {
    pub fn new(identity: Identity, token: Option<String>) -> Self {
        Self {
            identity,
            token,
            authenticated: true,
        }
    }

    pub fn role(&self) -> Role {
        self.identity.role
    }
}
