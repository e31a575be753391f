//! Endpoints, route entries, and the shared route-set builder.
//!
//! A [`RouteSet`] collects [`Endpoint`]s with their templates, defaults,
//! and constraints, producing the sorted entry list every match engine
//! compiles from. The sort order (entry order first, then precedence) is
//! what makes the three engines agree on every path.

use std::fmt;
use std::sync::Arc;

use tracing::{debug, info};

use routex_core::{RouteError, RouteResult, RouteValues};
use routex_template::{
    check_constraints, parse_template, resolve_constraint, ConstraintDirection, ConstraintMap,
    PrecedenceKey, TemplateMatcher,
};

/// The narrow seam to the host pipeline.
///
/// The router stores a handler on each endpoint and hands it back on a
/// successful match; it never invokes one. The name is used in logs and
/// route dumps.
pub trait Handler: Send + Sync {
    /// A human-readable name for diagnostics.
    fn name(&self) -> &str;
}

/// A [`Handler`] that is nothing but a name. Convenient for hosts that
/// dispatch by name and for tests.
#[derive(Debug, Clone)]
pub struct NamedHandler(pub String);

impl NamedHandler {
    /// Creates a named handler.
    pub fn new(name: impl Into<String>) -> Arc<Self> {
        Arc::new(Self(name.into()))
    }
}

impl Handler for NamedHandler {
    fn name(&self) -> &str {
        &self.0
    }
}

/// The terminus of a successful match: an opaque handle the host pipeline
/// dispatches on.
#[derive(Clone)]
pub struct Endpoint {
    template_text: String,
    defaults: RouteValues,
    address: Option<String>,
    metadata: Vec<(String, String)>,
    handler: Arc<dyn Handler>,
    order: i32,
}

impl Endpoint {
    /// Creates an endpoint for `template_text` dispatching to `handler`.
    pub fn new(template_text: impl Into<String>, handler: Arc<dyn Handler>) -> Self {
        Self {
            template_text: template_text.into(),
            defaults: RouteValues::new(),
            address: None,
            metadata: Vec::new(),
            handler,
            order: 0,
        }
    }

    /// Sets the endpoint's default values.
    #[must_use]
    pub fn with_defaults(mut self, defaults: RouteValues) -> Self {
        self.defaults = defaults;
        self
    }

    /// Sets the logical address used by link generation.
    #[must_use]
    pub fn with_address(mut self, address: impl Into<String>) -> Self {
        self.address = Some(address.into());
        self
    }

    /// Appends a metadata entry.
    #[must_use]
    pub fn with_metadata(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.metadata.push((key.into(), value.into()));
        self
    }

    /// Sets the entry order. Lower orders are matched first regardless of
    /// precedence.
    #[must_use]
    pub const fn with_order(mut self, order: i32) -> Self {
        self.order = order;
        self
    }

    /// The raw template text this endpoint was registered with.
    pub fn template_text(&self) -> &str {
        &self.template_text
    }

    /// The endpoint's default values.
    pub const fn defaults(&self) -> &RouteValues {
        &self.defaults
    }

    /// The logical address, if one was assigned.
    pub fn address(&self) -> Option<&str> {
        self.address.as_deref()
    }

    /// Looks up a metadata value by key.
    pub fn metadata(&self, key: &str) -> Option<&str> {
        self.metadata
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }

    /// The handler to dispatch to.
    pub fn handler(&self) -> &Arc<dyn Handler> {
        &self.handler
    }

    /// The entry order.
    pub const fn order(&self) -> i32 {
        self.order
    }

    /// A display name for logs: the handler name.
    pub fn display_name(&self) -> &str {
        self.handler.name()
    }
}

impl fmt::Debug for Endpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Endpoint")
            .field("template_text", &self.template_text)
            .field("address", &self.address)
            .field("handler", &self.handler.name())
            .field("order", &self.order)
            .finish_non_exhaustive()
    }
}

/// One registered route: the per-template matcher, its constraints, the
/// endpoint it terminates in, and the ordering key.
pub struct RouteEntry {
    pub(crate) matcher: TemplateMatcher,
    pub(crate) constraints: ConstraintMap,
    pub(crate) endpoint: Arc<Endpoint>,
    pub(crate) precedence: PrecedenceKey,
    pub(crate) order: i32,
}

impl RouteEntry {
    /// The per-template matcher.
    pub const fn matcher(&self) -> &TemplateMatcher {
        &self.matcher
    }

    /// The endpoint this entry terminates in.
    pub const fn endpoint(&self) -> &Arc<Endpoint> {
        &self.endpoint
    }

    /// The entry's precedence key.
    pub const fn precedence(&self) -> &PrecedenceKey {
        &self.precedence
    }
}

impl fmt::Debug for RouteEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RouteEntry")
            .field("template", &self.matcher.template().text())
            .field("endpoint", &self.endpoint.display_name())
            .field("order", &self.order)
            .finish_non_exhaustive()
    }
}

/// The result of a successful match: the winning endpoint and the values
/// extracted from the path (with defaults overlaid).
#[derive(Debug, Clone)]
pub struct RouteMatch {
    /// The endpoint that won.
    pub endpoint: Arc<Endpoint>,
    /// Captured parameter values plus defaults.
    pub values: RouteValues,
}

/// A compiled dispatcher. All three engines implement this; a built
/// matcher is immutable and safe to share across threads.
pub trait Matcher: Send + Sync {
    /// Dispatches `path` to at most one endpoint.
    fn match_path(&self, path: &str) -> Option<RouteMatch>;
}

/// Collects route registrations and produces the sorted entry list the
/// engines compile from.
///
/// # Examples
///
/// ```
/// use routex_core::RouteValues;
/// use routex_matcher::{NamedHandler, Endpoint, RouteSet, TreeMatcher, Matcher};
///
/// let mut routes = RouteSet::new();
/// routes
///     .add(
///         "{controller}/{action}/{id?}",
///         RouteValues::new(),
///         Vec::new(),
///         Endpoint::new("{controller}/{action}/{id?}", NamedHandler::new("default")),
///     )
///     .unwrap();
///
/// let matcher = TreeMatcher::build(&routes).unwrap();
/// let matched = matcher.match_path("/Home/Index").unwrap();
/// assert_eq!(matched.endpoint.display_name(), "default");
/// ```
#[derive(Default)]
pub struct RouteSet {
    entries: Vec<Arc<RouteEntry>>,
}

impl RouteSet {
    /// Creates an empty route set.
    pub fn new() -> Self {
        Self {
            entries: Vec::new(),
        }
    }

    /// Registers a route.
    ///
    /// `constraints` carries out-of-band constraint expressions as
    /// `(parameter, expression)` pairs; inline constraints from the
    /// template are appended after them, per parameter, in declaration
    /// order. Defaults merge with the template's inline defaults.
    ///
    /// # Errors
    ///
    /// Returns a template parse error or an
    /// [`ImproperlyConfigured`](RouteError::ImproperlyConfigured) error for
    /// an unknown constraint expression.
    pub fn add(
        &mut self,
        template: &str,
        defaults: RouteValues,
        constraints: Vec<(String, String)>,
        endpoint: Endpoint,
    ) -> RouteResult<()> {
        let parsed = parse_template(template)?;

        let mut map: ConstraintMap = Vec::new();
        for (name, expression) in &constraints {
            let resolved = resolve_constraint(expression)?;
            match map.iter_mut().find(|(n, _)| n.eq_ignore_ascii_case(name)) {
                Some((_, list)) => list.push(resolved),
                None => map.push((name.clone(), vec![resolved])),
            }
        }
        for (name, _) in parsed.parameters() {
            let Some(part) = parsed.parameter(name) else {
                continue;
            };
            for expression in &part.inline_constraints {
                let resolved = resolve_constraint(expression)?;
                match map.iter_mut().find(|(n, _)| n.eq_ignore_ascii_case(name)) {
                    Some((_, list)) => list.push(resolved),
                    None => map.push((name.clone(), vec![resolved])),
                }
            }
        }

        let matcher = TemplateMatcher::new(parsed, defaults);

        let constrained: Vec<String> = map.iter().map(|(n, _)| n.clone()).collect();
        let defaulted = matcher
            .template()
            .parameters()
            .iter()
            .filter(|(name, _)| matcher.defaults().contains_key(name))
            .count();
        let precedence = PrecedenceKey::compute(matcher.template(), &constrained, defaulted);

        let order = endpoint.order();
        self.entries.push(Arc::new(RouteEntry {
            matcher,
            constraints: map,
            endpoint: Arc::new(endpoint),
            precedence,
            order,
        }));
        Ok(())
    }

    /// The registered entries, in declaration order.
    pub fn entries(&self) -> &[Arc<RouteEntry>] {
        &self.entries
    }

    /// Returns the entries sorted for matching: by order, then precedence
    /// (most specific first).
    ///
    /// # Errors
    ///
    /// Returns [`RouteError::DuplicateRoute`] when two entries compare
    /// equal in order, precedence, and text.
    pub fn sorted_entries(&self) -> RouteResult<Vec<Arc<RouteEntry>>> {
        let mut sorted = self.entries.clone();
        sorted.sort_by(|a, b| {
            a.order
                .cmp(&b.order)
                .then_with(|| a.precedence.cmp(&b.precedence))
        });

        for pair in sorted.windows(2) {
            if pair[0].order == pair[1].order
                && pair[0].precedence.is_duplicate_of(&pair[1].precedence)
            {
                return Err(RouteError::DuplicateRoute {
                    template: pair[0].matcher.template().text().to_string(),
                });
            }
        }

        info!(
            routes = sorted.len(),
            "route table sorted for matcher construction"
        );
        Ok(sorted)
    }
}

impl fmt::Debug for RouteSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list().entries(self.entries.iter()).finish()
    }
}

/// Attempts one candidate: template match, then inbound constraints. On
/// failure the values map is rolled back to its state at entry, so the
/// caller can move on to the next candidate.
pub(crate) fn try_candidate(entry: &RouteEntry, path: &str, values: &mut RouteValues) -> bool {
    let mark = values.mark();
    if entry.matcher.try_match(path, values)
        && check_constraints(&entry.constraints, values, ConstraintDirection::Incoming)
    {
        debug!(
            template = entry.matcher.template().text(),
            endpoint = entry.endpoint.display_name(),
            "route matched"
        );
        true
    } else {
        values.rollback(mark);
        false
    }
}

/// Splits a request path into segments: leading `/` skipped, one trailing
/// empty residue (from a trailing slash) dropped, interior empty segments
/// kept so that consecutive slashes are not collapsed.
pub(crate) fn split_path(path: &str) -> Vec<&str> {
    let trimmed = path.strip_prefix('/').unwrap_or(path);
    let mut segments: Vec<&str> = if trimmed.is_empty() {
        Vec::new()
    } else {
        trimmed.split('/').collect()
    };
    if segments.last() == Some(&"") {
        segments.pop();
    }
    segments
}
