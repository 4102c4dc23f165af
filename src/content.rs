//! Section content loading.
//!
//! Content for a dashboard section comes from an explicit registry keyed by
//! `(role, section id)` - role modules register their providers at startup
//! rather than being discovered through name mangling. Resolution order:
//!
//! 1. A registered role-scoped provider. A provider that errors is logged
//!    and demoted to "absent" - display-layer degradation, never a failure
//!    the caller sees.
//! 2. A built-in generator for the well-known section ids.
//! 3. A generic placeholder carrying the title-cased section id.
//!
//! After rendering, the role's chart initializer (if registered) runs exactly
//! once; a chart bound to an already-occupied visual slot replaces the
//! previous one so repeated navigation never stacks duplicates.

use crate::identity::{Identity, Role};
use std::collections::HashMap;
use thiserror::Error;
use tracing::{debug, warn};

/// Raised by a role-scoped provider while rendering. Always caught by the
/// loader and demoted to the built-in/placeholder path.
#[derive(Debug, Error)]
#[error("Content provider failed: {0}")]
pub struct ProviderError(pub String);

/// Renders the markup for one section for one role.
pub trait ContentProvider: Send + Sync {
    fn render(&self, identity: &Identity) -> Result<String, ProviderError>;
}

impl<F> ContentProvider for F
where
    F: Fn(&Identity) -> Result<String, ProviderError> + Send + Sync,
{
    fn render(&self, identity: &Identity) -> Result<String, ProviderError> {
        self(identity)
    }
}

/// Which path produced a rendered section.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ContentSource {
    /// A registered role-scoped provider.
    Provider,
    /// The built-in generator for a well-known id.
    BuiltIn,
    /// The generic placeholder.
    Placeholder,
}

/// A rendered section body plus its derived page heading.
#[derive(Debug, Clone)]
pub struct RenderedSection {
    pub section: String,
    pub title: String,
    pub body: String,
    pub source: ContentSource,
}

/// A chart bound to a visual slot.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChartHandle {
    pub slot: String,
    pub kind: String,
    /// Monotonic per-binding id; bumps when a slot is rebound.
    pub generation: u64,
}

/// Tracks which chart occupies each visual slot. Rebinding a slot replaces
/// the previous chart.
#[derive(Default)]
pub struct ChartBindings {
    slots: HashMap<String, ChartHandle>,
    next_generation: u64,
}

impl ChartBindings {
    pub fn new() -> Self {
        Self::default()
    }

    /// Bind `kind` to `slot`, replacing whatever was there.
    pub fn bind(&mut self, slot: &str, kind: &str) -> &ChartHandle {
        self.next_generation += 1;
        let handle = ChartHandle {
            slot: slot.to_string(),
            kind: kind.to_string(),
            generation: self.next_generation,
        };
        if self.slots.insert(slot.to_string(), handle).is_some() {
            debug!("Replaced chart in slot {}", slot);
        }
        &self.slots[slot]
    }

    pub fn bound(&self, slot: &str) -> Option<&ChartHandle> {
        self.slots.get(slot)
    }

    /// Number of live charts. Never exceeds the number of distinct slots.
    pub fn len(&self) -> usize {
        self.slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    pub fn clear(&mut self) {
        self.slots.clear();
    }
}

/// Wires up a role's visualizations after its content renders.
pub trait ChartInitializer: Send + Sync {
    fn initialize(&self, identity: &Identity, section: &str, charts: &mut ChartBindings);
}

impl<F> ChartInitializer for F
where
    F: Fn(&Identity, &str, &mut ChartBindings) + Send + Sync,
{
    fn initialize(&self, identity: &Identity, section: &str, charts: &mut ChartBindings) {
        self(identity, section, charts)
    }
}

/// Explicit `(role, section) -> provider` registry plus per-role chart hooks.
#[derive(Default)]
pub struct ContentRegistry {
    providers: HashMap<(Role, String), Box<dyn ContentProvider>>,
    chart_initializers: HashMap<Role, Box<dyn ChartInitializer>>,
}

impl ContentRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry pre-loaded with the product's role-scoped sections.
    pub fn with_defaults() -> Self {
        let mut registry = Self::new();

        registry.register(Role::Analyst, "fraud-alerts", |identity: &Identity| {
            Ok(format!(
                "<section class=\"fraud-alerts\">\
                 <p>Open alerts assigned to {}</p>\
                 <div id=\"alert-table\"></div></section>",
                identity.display_name
            ))
        });
        registry.register(Role::Analyst, "risk-scoring", |_: &Identity| {
            Ok("<section class=\"risk-scoring\">\
                <div id=\"risk-chart\" class=\"chart-slot\"></div></section>"
                .to_string())
        });
        registry.register(Role::Analyst, "network-graph", |_: &Identity| {
            Ok("<section class=\"network-graph\">\
                <div id=\"network-canvas\" class=\"chart-slot\"></div></section>"
                .to_string())
        });

        registry.register(Role::Investigator, "case-queue", |identity: &Identity| {
            Ok(format!(
                "<section class=\"case-queue\">\
                 <p>Case queue for {}</p><div id=\"case-list\"></div></section>",
                identity.display_name
            ))
        });

        registry.register(Role::Provider, "claim-tracker", |_: &Identity| {
            Ok("<section class=\"claim-tracker\">\
                <input id=\"claim-search\" placeholder=\"Claim number\"/>\
                <div id=\"claim-status\"></div></section>"
                .to_string())
        });
        registry.register(Role::Patient, "claim-tracker", |_: &Identity| {
            Ok("<section class=\"claim-tracker\">\
                <div id=\"my-claims\"></div></section>"
                .to_string())
        });

        registry.register(Role::Admin, "user-management", |_: &Identity| {
            Ok("<section class=\"user-management\">\
                <div id=\"user-table\"></div></section>"
                .to_string())
        });

        registry.register(Role::Regulator, "compliance", |_: &Identity| {
            Ok("<section class=\"compliance\">\
                <div id=\"compliance-summary\"></div></section>"
                .to_string())
        });

        registry.register_charts(Role::Analyst, |_: &Identity, section: &str, charts: &mut ChartBindings| {
            match section {
                "risk-scoring" => {
                    charts.bind("risk-chart", "bar");
                }
                "network-graph" => {
                    charts.bind("network-canvas", "force-graph");
                }
                "home" => {
                    charts.bind("trend-chart", "line");
                }
                _ => {}
            }
        });
        registry.register_charts(Role::Regulator, |_: &Identity, section: &str, charts: &mut ChartBindings| {
            if section == "compliance" || section == "home" {
                charts.bind("compliance-chart", "donut");
            }
        });

        registry
    }

    /// Register (or replace) the provider for `(role, section)`.
    pub fn register<P>(&mut self, role: Role, section: &str, provider: P)
    where
        P: ContentProvider + 'static,
    {
        self.providers
            .insert((role, section.to_string()), Box::new(provider));
    }

    /// Register (or replace) the chart initializer for a role.
    pub fn register_charts<C>(&mut self, role: Role, initializer: C)
    where
        C: ChartInitializer + 'static,
    {
        self.chart_initializers.insert(role, Box::new(initializer));
    }

    fn provider(&self, role: Role, section: &str) -> Option<&dyn ContentProvider> {
        self.providers
            .get(&(role, section.to_string()))
            .map(|b| b.as_ref())
    }

    fn charts(&self, role: Role) -> Option<&dyn ChartInitializer> {
        self.chart_initializers.get(&role).map(|b| b.as_ref())
    }
}

/// Renders sections and tracks the current one. Never errors outward -
/// unknown ids get the placeholder, broken providers get the fallback.
pub struct ContentLoader {
    registry: ContentRegistry,
    charts: ChartBindings,
    current_section: Option<String>,
}

impl ContentLoader {
    pub fn new(registry: ContentRegistry) -> Self {
        Self {
            registry,
            charts: ChartBindings::new(),
            current_section: None,
        }
    }

    pub fn with_defaults() -> Self {
        Self::new(ContentRegistry::with_defaults())
    }

    /// Render `section_id` for `identity`, run the role's chart hook, and
    /// record the section as current.
    pub fn load_section(&mut self, identity: &Identity, section_id: &str) -> RenderedSection {
        let title = title_for(section_id);

        let (body, source) = match self.registry.provider(identity.role, section_id) {
            Some(provider) => match provider.render(identity) {
                Ok(body) => (body, ContentSource::Provider),
                Err(err) => {
                    // Display-layer degradation only; fall through.
                    warn!(
                        "Provider for {}/{} failed ({}), using fallback content",
                        identity.role, section_id, err
                    );
                    builtin_or_placeholder(identity, section_id, &title)
                }
            },
            None => builtin_or_placeholder(identity, section_id, &title),
        };

        if let Some(initializer) = self.registry.charts(identity.role) {
            initializer.initialize(identity, section_id, &mut self.charts);
        }

        debug!("Rendered section {} ({:?}) for {}", section_id, source, identity.role);
        self.current_section = Some(section_id.to_string());

        RenderedSection {
            section: section_id.to_string(),
            title,
            body,
            source,
        }
    }

    /// The most recently rendered section id.
    pub fn current_section(&self) -> Option<&str> {
        self.current_section.as_deref()
    }

    /// Live chart bindings (one per slot at most).
    pub fn charts(&self) -> &ChartBindings {
        &self.charts
    }

    /// Reset section and chart state on logout.
    pub fn reset(&mut self) {
        self.current_section = None;
        self.charts.clear();
    }
}

fn builtin_or_placeholder(
    identity: &Identity,
    section_id: &str,
    title: &str,
) -> (String, ContentSource) {
    match builtin_content(identity, section_id) {
        Some(body) => (body, ContentSource::BuiltIn),
        None => (
            format!(
                "<section class=\"placeholder\"><h2>{}</h2>\
                 <p>This section is not yet available for your role.</p></section>",
                title
            ),
            ContentSource::Placeholder,
        ),
    }
}

/// Default content for the handful of well-known section ids.
fn builtin_content(identity: &Identity, section_id: &str) -> Option<String> {
    let body = match section_id {
        "home" => format!(
            "<section class=\"home\"><h2>Welcome back, {}</h2>\
             <div id=\"metric-cards\"></div>\
             <div id=\"trend-chart\" class=\"chart-slot\"></div></section>",
            identity.display_name
        ),
        "fraud-alerts" => "<section class=\"fraud-alerts\">\
             <div id=\"alert-table\"></div></section>"
            .to_string(),
        "claims" => "<section class=\"claims\"><div id=\"claim-list\"></div></section>".to_string(),
        "reports" => "<section class=\"reports\"><div id=\"report-list\"></div></section>".to_string(),
        "settings" => "<section class=\"settings\"><div id=\"settings-form\"></div></section>".to_string(),
        _ => return None,
    };
    Some(body)
}

/// `"fraud-alerts"` -> `"Fraud Alerts"`.
pub fn title_for(section_id: &str) -> String {
    section_id
        .split('-')
        .filter(|word| !word.is_empty())
        .map(|word| {
            let mut chars = word.chars();
            match chars.next() {
                Some(first) => first.to_uppercase().chain(chars).collect::<String>(),
                None => String::new(),
            }
        })
        .collect::<Vec<_>>()
        .join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn analyst() -> Identity {
        Identity::local("analyst", "Fraud Analyst", Role::Analyst)
    }

    #[test]
    fn test_title_for() {
        assert_eq!(title_for("fraud-alerts"), "Fraud Alerts");
        assert_eq!(title_for("home"), "Home");
        assert_eq!(title_for("unknown-section-xyz"), "Unknown Section Xyz");
        assert_eq!(title_for("double--hyphen"), "Double Hyphen");
    }

    #[test]
    fn test_provider_path() {
        let mut loader = ContentLoader::with_defaults();
        let rendered = loader.load_section(&analyst(), "fraud-alerts");

        assert_eq!(rendered.source, ContentSource::Provider);
        assert!(rendered.body.contains("Fraud Analyst"));
        assert_eq!(loader.current_section(), Some("fraud-alerts"));
    }

    #[test]
    fn test_builtin_path_for_role_without_provider() {
        let mut loader = ContentLoader::with_defaults();
        let patient = Identity::local("patient", "Patient", Role::Patient);
        let rendered = loader.load_section(&patient, "fraud-alerts");

        assert_eq!(rendered.source, ContentSource::BuiltIn);
    }

    #[test]
    fn test_unknown_section_renders_placeholder() {
        let mut loader = ContentLoader::with_defaults();
        let rendered = loader.load_section(&analyst(), "unknown-section-xyz");

        assert_eq!(rendered.source, ContentSource::Placeholder);
        assert_eq!(rendered.title, "Unknown Section Xyz");
        assert!(rendered.body.contains("Unknown Section Xyz"));
        assert_eq!(loader.current_section(), Some("unknown-section-xyz"));
    }

    #[test]
    fn test_broken_provider_falls_back_silently() {
        let mut registry = ContentRegistry::new();
        registry.register(Role::Analyst, "home", |_: &Identity| {
            Err(ProviderError("boom".into()))
        });
        let mut loader = ContentLoader::new(registry);

        let rendered = loader.load_section(&analyst(), "home");
        // The built-in home generator covers the failure.
        assert_eq!(rendered.source, ContentSource::BuiltIn);
        assert!(rendered.body.contains("Welcome back"));
    }

    #[test]
    fn test_broken_provider_unknown_section_gets_placeholder() {
        let mut registry = ContentRegistry::new();
        registry.register(Role::Analyst, "weird-panel", |_: &Identity| {
            Err(ProviderError("boom".into()))
        });
        let mut loader = ContentLoader::new(registry);

        let rendered = loader.load_section(&analyst(), "weird-panel");
        assert_eq!(rendered.source, ContentSource::Placeholder);
        assert!(rendered.body.contains("Weird Panel"));
    }

    #[test]
    fn test_charts_replace_never_stack() {
        let mut loader = ContentLoader::with_defaults();
        let identity = analyst();

        loader.load_section(&identity, "risk-scoring");
        let first = loader.charts().bound("risk-chart").cloned().unwrap();
        assert_eq!(first.kind, "bar");

        // Navigate away and back; the slot holds one chart, rebound.
        loader.load_section(&identity, "fraud-alerts");
        loader.load_section(&identity, "risk-scoring");

        let second = loader.charts().bound("risk-chart").cloned().unwrap();
        assert!(second.generation > first.generation);
        // One chart per slot, however many times we navigated.
        assert_eq!(loader.charts().len(), 1);
    }

    #[test]
    fn test_reset_clears_section_and_charts() {
        let mut loader = ContentLoader::with_defaults();
        loader.load_section(&analyst(), "risk-scoring");
        assert!(!loader.charts().is_empty());

        loader.reset();
        assert!(loader.current_section().is_none());
        assert!(loader.charts().is_empty());
    }
}
