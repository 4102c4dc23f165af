//! Claimwatch Dashboard Core
//!
//! Session, navigation and content-loading core for a multi-role
//! insurance-claims fraud-management dashboard.
//!
//! # Features
//!
//! - **Session Store**: one persisted session (identity + token), self-healing restore
//! - **Authenticator**: remote-first login with a local demo fallback,
//!   plus OAuth bearer-token ingestion
//! - **Navigation Resolver**: role -> ordered menu from a static registry
//! - **Content Loader**: explicit `(role, section)` provider registry with
//!   built-in fallbacks and chart-slot management
//! - **Poller**: 30 s metrics refresh that survives failed ticks
//! - **Controller**: the LoggedOut/Authenticating/LoggedIn state machine
//!
//! # Architecture
//!
//! ```text
//! UI events ──► DashboardController ──► Authenticator ──► auth service
//!                      │                     (remote-first, local fallback)
//!                      ├── SessionStore (one durable key)
//!                      ├── NavigationResolver (role -> entries)
//!                      ├── ContentLoader (provider registry + charts)
//!                      └── MetricsPoller ──► BackendApi (bearer auth, 401 -> logout)
//! ```

pub mod api;
pub mod auth;
pub mod config;
pub mod content;
pub mod controller;
pub mod identity;
pub mod nav;
pub mod poller;
pub mod store;

pub use api::{ApiError, BackendApi, HttpBackend, MetricsSnapshot};
pub use auth::{AuthError, Authenticator, LoginOutcome};
pub use config::Config;
pub use content::{
    ChartBindings, ContentLoader, ContentProvider, ContentRegistry, ContentSource,
    RenderedSection,
};
pub use controller::{ControllerError, DashboardController, DashboardState, LoginReport};
pub use identity::{AuthMethod, Identity, Role, Session};
pub use nav::{NavEntry, NavError, NavigationResolver};
pub use poller::{DisplayedMetrics, MetricsPoller};
pub use store::{FileStore, KeyValueStore, MemoryStore, SessionStore, StoreError};
