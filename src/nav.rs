//! Role-scoped navigation.
//!
//! Maps a role to its ordered menu entries from a registry populated at
//! construction. Pure reads after that - no I/O, safe to call any number of
//! times. Every role's list starts with the `home` entry.

use crate::identity::Role;
use std::collections::HashMap;
use thiserror::Error;

/// One menu entry. The icon is an opaque styling reference for the frontend.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NavEntry {
    pub id: &'static str,
    pub label: &'static str,
    pub icon: &'static str,
}

const fn entry(id: &'static str, label: &'static str, icon: &'static str) -> NavEntry {
    NavEntry { id, label, icon }
}

const HOME: NavEntry = entry("home", "Dashboard", "fa-home");

/// Navigation errors
#[derive(Debug, Error)]
pub enum NavError {
    /// A role reached the resolver with no registered entries. Indicates an
    /// identity invariant violation upstream; unreachable through
    /// [`NavigationResolver::with_defaults`].
    #[error("No navigation registered for role: {0}")]
    Configuration(Role),
}

/// Role -> ordered navigation entries.
pub struct NavigationResolver {
    entries: HashMap<Role, Vec<NavEntry>>,
}

impl NavigationResolver {
    /// Empty resolver; callers register per-role menus themselves.
    pub fn new() -> Self {
        Self {
            entries: HashMap::new(),
        }
    }

    /// Resolver covering all six roles with the product's standard menus.
    pub fn with_defaults() -> Self {
        let mut resolver = Self::new();

        resolver.register(
            Role::Admin,
            vec![
                HOME,
                entry("user-management", "User Management", "fa-users"),
                entry("fraud-alerts", "Fraud Alerts", "fa-bell"),
                entry("audit-log", "Audit Log", "fa-list"),
                entry("settings", "System Settings", "fa-cog"),
            ],
        );
        resolver.register(
            Role::Analyst,
            vec![
                HOME,
                entry("fraud-alerts", "Fraud Alerts", "fa-bell"),
                entry("risk-scoring", "Risk Scoring", "fa-chart-line"),
                entry("network-graph", "Fraud Networks", "fa-project-diagram"),
                entry("reports", "Reports", "fa-file-alt"),
            ],
        );
        resolver.register(
            Role::Investigator,
            vec![
                HOME,
                entry("case-queue", "Case Queue", "fa-inbox"),
                entry("fraud-alerts", "Fraud Alerts", "fa-bell"),
                entry("evidence", "Evidence Locker", "fa-folder-open"),
                entry("reports", "Reports", "fa-file-alt"),
            ],
        );
        resolver.register(
            Role::Provider,
            vec![
                HOME,
                entry("claims", "Submit Claims", "fa-file-medical"),
                entry("claim-tracker", "Claim Tracker", "fa-search"),
                entry("payments", "Payments", "fa-credit-card"),
            ],
        );
        resolver.register(
            Role::Patient,
            vec![
                HOME,
                entry("claims", "My Claims", "fa-file-medical"),
                entry("claim-tracker", "Claim Tracker", "fa-search"),
                entry("coverage", "Coverage", "fa-shield-alt"),
            ],
        );
        resolver.register(
            Role::Regulator,
            vec![
                HOME,
                entry("compliance", "Compliance", "fa-balance-scale"),
                entry("fraud-alerts", "Fraud Alerts", "fa-bell"),
                entry("reports", "Industry Reports", "fa-file-alt"),
            ],
        );

        resolver
    }

    /// Register (or replace) the menu for a role.
    pub fn register(&mut self, role: Role, entries: Vec<NavEntry>) {
        self.entries.insert(role, entries);
    }

    /// The ordered menu for `role`.
    pub fn entries_for(&self, role: Role) -> Result<&[NavEntry], NavError> {
        self.entries
            .get(&role)
            .map(|v| v.as_slice())
            .ok_or(NavError::Configuration(role))
    }
}

impl Default for NavigationResolver {
    fn default() -> Self {
        Self::with_defaults()
    }
}
