//! Link generation: the reverse mapping from values to a URL.
//!
//! A [`LinkGenerator`] resolves candidate endpoints by address through an
//! [`EndpointFinder`], binds each candidate's template parameters from the
//! supplied values (then ambient values, then defaults), checks outbound
//! constraints, and renders the first candidate that binds completely.

use std::collections::HashMap;
use std::sync::Arc;

use serde::Deserialize;
use tracing::debug;

use routex_core::{RouteError, RouteResult, RouteValue, RouteValues};
use routex_template::{check_constraints, ConstraintDirection, RoutePart};

use crate::encoding::{encode_path_segment, encode_query_component};
use crate::endpoint::{RouteEntry, RouteSet};

/// Emission-time URL options. Every flag applies only while rendering;
/// matching behaviour is unaffected.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct RouteOptions {
    /// Lowercase the path portion of generated URLs.
    pub lowercase_urls: bool,
    /// Append a trailing `/` to the path portion.
    pub append_trailing_slash: bool,
    /// Lowercase the query string of generated URLs.
    pub lowercase_query_strings: bool,
}

/// Resolves an address to its candidate route entries, in declaration
/// order. Supplied by the host pipeline; [`RouteEntryFinder`] is the
/// table-backed default.
pub trait EndpointFinder: Send + Sync {
    /// Returns the candidates registered under `address`.
    fn find_endpoints(&self, address: &str) -> Vec<Arc<RouteEntry>>;
}

/// An [`EndpointFinder`] backed by the addresses registered in a
/// [`RouteSet`].
pub struct RouteEntryFinder {
    by_address: HashMap<String, Vec<Arc<RouteEntry>>>,
}

impl RouteEntryFinder {
    /// Indexes every addressable entry of `routes`.
    pub fn new(routes: &RouteSet) -> Self {
        let mut by_address: HashMap<String, Vec<Arc<RouteEntry>>> = HashMap::new();
        for entry in routes.entries() {
            if let Some(address) = entry.endpoint().address() {
                by_address
                    .entry(address.to_string())
                    .or_default()
                    .push(Arc::clone(entry));
            }
        }
        Self { by_address }
    }
}

impl EndpointFinder for RouteEntryFinder {
    fn find_endpoints(&self, address: &str) -> Vec<Arc<RouteEntry>> {
        self.by_address.get(address).cloned().unwrap_or_default()
    }
}

/// Everything one link-generation call needs.
#[derive(Debug, Clone)]
pub struct LinkContext {
    /// The logical endpoint address to resolve.
    pub address: String,
    /// Values supplied explicitly by the caller. Unconsumed keys become
    /// query-string entries, in insertion order.
    pub supplied: RouteValues,
    /// Values ambient from the current request, used as fallbacks.
    pub ambient: RouteValues,
    /// Per-call option override; the generator's options apply when
    /// `None`.
    pub options: Option<RouteOptions>,
}

impl LinkContext {
    /// Creates a context for `address` with empty value sets.
    pub fn new(address: impl Into<String>) -> Self {
        Self {
            address: address.into(),
            supplied: RouteValues::new(),
            ambient: RouteValues::new(),
            options: None,
        }
    }

    /// Sets the supplied values.
    #[must_use]
    pub fn with_supplied(mut self, supplied: RouteValues) -> Self {
        self.supplied = supplied;
        self
    }

    /// Sets the ambient values.
    #[must_use]
    pub fn with_ambient(mut self, ambient: RouteValues) -> Self {
        self.ambient = ambient;
        self
    }

    /// Overrides the generator's options for this call.
    #[must_use]
    pub const fn with_options(mut self, options: RouteOptions) -> Self {
        self.options = Some(options);
        self
    }
}

/// Generates URLs from endpoint addresses and values.
///
/// # Examples
///
/// ```
/// use routex_core::RouteValues;
/// use routex_matcher::{
///     Endpoint, LinkContext, LinkGenerator, NamedHandler, RouteEntryFinder, RouteOptions,
///     RouteSet,
/// };
/// use std::sync::Arc;
///
/// let mut routes = RouteSet::new();
/// routes
///     .add(
///         "{controller}",
///         RouteValues::new(),
///         Vec::new(),
///         Endpoint::new("{controller}", NamedHandler::new("default")).with_address("default"),
///     )
///     .unwrap();
///
/// let generator = LinkGenerator::new(
///     Arc::new(RouteEntryFinder::new(&routes)),
///     RouteOptions::default(),
/// );
///
/// let mut supplied = RouteValues::new();
/// supplied.set("controller", "Home");
/// let link = generator
///     .try_get_link(&LinkContext::new("default").with_supplied(supplied))
///     .unwrap();
/// assert_eq!(link, "/Home");
/// ```
pub struct LinkGenerator {
    finder: Arc<dyn EndpointFinder>,
    options: RouteOptions,
}

impl LinkGenerator {
    /// Creates a generator over `finder` with default `options`.
    pub fn new(finder: Arc<dyn EndpointFinder>, options: RouteOptions) -> Self {
        Self { finder, options }
    }

    /// Attempts to generate a link, returning `None` when no candidate
    /// endpoint binds.
    pub fn try_get_link(&self, context: &LinkContext) -> Option<String> {
        let options = context.options.unwrap_or(self.options);
        for entry in self.finder.find_endpoints(&context.address) {
            if let Some(link) = try_bind(&entry, context, options) {
                return Some(link);
            }
            debug!(
                template = entry.matcher().template().text(),
                address = %context.address,
                "link candidate did not bind"
            );
        }
        None
    }

    /// Generates a link.
    ///
    /// # Errors
    ///
    /// Returns [`RouteError::NoMatchingEndpoint`] when no candidate
    /// endpoint binds the supplied values.
    pub fn get_link(&self, context: &LinkContext) -> RouteResult<String> {
        self.try_get_link(context)
            .ok_or_else(|| RouteError::NoMatchingEndpoint {
                address: context.address.clone(),
            })
    }
}

/// Binds one candidate and renders it, or gives up.
fn try_bind(entry: &RouteEntry, context: &LinkContext, options: RouteOptions) -> Option<String> {
    let template = entry.matcher().template();
    let defaults = entry.matcher().defaults();

    // Bind every template parameter. Ambient values are only usable
    // while every earlier parameter was also satisfied from ambient;
    // the first supplied or defaulted parameter cuts them off.
    let mut bound = RouteValues::new();
    let mut ambient_usable = true;
    for (name, _) in template.parameters() {
        let part = template.parameter(name)?;
        if let Some(value) = context.supplied.get(name) {
            bound.set(name.clone(), value.clone());
            ambient_usable = false;
        } else if let Some(value) = ambient_usable.then(|| context.ambient.get(name)).flatten() {
            bound.set(name.clone(), value.clone());
        } else if let Some(value) = defaults.get(name) {
            bound.set(name.clone(), value.clone());
            ambient_usable = false;
        } else if part.is_optional || part.is_catch_all {
            ambient_usable = false;
        } else {
            return None;
        }
    }

    if !check_constraints(&entry.constraints, &bound, ConstraintDirection::Outgoing) {
        return None;
    }

    // Elide trailing segments whose parameter is unbound or bound to its
    // default.
    let segments = template.segments();
    let mut keep = segments.len();
    for segment in segments.iter().rev() {
        let Some(p) = segment.single_parameter() else {
            break;
        };
        let omissible = p.is_optional || p.is_catch_all || defaults.contains_key(&p.name);
        if !omissible {
            break;
        }
        let elide = match bound.get(&p.name) {
            None => true,
            Some(value) => defaults
                .get(&p.name)
                .is_some_and(|d| d.equals_ignore_case(value)),
        };
        if elide {
            keep -= 1;
        } else {
            break;
        }
    }

    let mut path = String::new();
    for segment in &segments[..keep] {
        path.push('/');
        for part in segment.parts() {
            match part {
                RoutePart::Literal(text) | RoutePart::Separator(text) => path.push_str(text),
                RoutePart::Parameter(p) => {
                    let value = bound.get(&p.name)?;
                    if p.is_catch_all {
                        // Slashes inside a catch-all stay structural.
                        let rendered = value.to_string();
                        let encoded: Vec<String> =
                            rendered.split('/').map(encode_path_segment).collect();
                        path.push_str(&encoded.join("/"));
                    } else {
                        path.push_str(&encode_path_segment(&value.to_string()));
                    }
                }
            }
        }
    }
    if path.is_empty() {
        path.push('/');
    }

    if options.lowercase_urls {
        path = path.to_lowercase();
    }
    if options.append_trailing_slash && !path.ends_with('/') {
        path.push('/');
    }

    // Unconsumed supplied values become the query string, in insertion
    // order; list values repeat their key.
    let mut pairs: Vec<(String, String)> = Vec::new();
    for (key, value) in context.supplied.iter() {
        if template.parameter(key).is_some() {
            continue;
        }
        match value {
            RouteValue::List(items) => {
                for item in items {
                    pairs.push((key.to_string(), item.clone()));
                }
            }
            RouteValue::Null => {}
            other => pairs.push((key.to_string(), other.to_string())),
        }
    }

    if !pairs.is_empty() {
        let mut query = pairs
            .iter()
            .map(|(k, v)| format!("{}={}", encode_query_component(k), encode_query_component(v)))
            .collect::<Vec<_>>()
            .join("&");
        if options.lowercase_query_strings {
            query = query.to_lowercase();
        }
        path.push('?');
        path.push_str(&query);
    }

    Some(path)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::endpoint::{Endpoint, NamedHandler};

    fn values(pairs: &[(&str, &str)]) -> RouteValues {
        let mut map = RouteValues::new();
        for (k, v) in pairs {
            map.set(*k, *v);
        }
        map
    }

    fn generator(routes: &[(&str, &str)]) -> LinkGenerator {
        let mut set = RouteSet::new();
        for (template, address) in routes {
            set.add(
                template,
                RouteValues::new(),
                Vec::new(),
                Endpoint::new(*template, NamedHandler::new(*address)).with_address(*address),
            )
            .unwrap();
        }
        LinkGenerator::new(Arc::new(RouteEntryFinder::new(&set)), RouteOptions::default())
    }

    #[test]
    fn test_simple_link() {
        let generator = generator(&[("{controller}", "default")]);
        let link = generator
            .try_get_link(
                &LinkContext::new("default").with_supplied(values(&[("controller", "Home")])),
            )
            .unwrap();
        assert_eq!(link, "/Home");
    }

    #[test]
    fn test_optional_bound_and_unbound() {
        let generator = generator(&[("{controller}/{action}/{id?}", "default")]);
        let link = generator
            .try_get_link(&LinkContext::new("default").with_supplied(values(&[
                ("controller", "Home"),
                ("action", "Index"),
                ("id", "10"),
            ])))
            .unwrap();
        assert_eq!(link, "/Home/Index/10");

        let link = generator
            .try_get_link(&LinkContext::new("default").with_supplied(values(&[
                ("controller", "Home"),
                ("action", "Index"),
            ])))
            .unwrap();
        assert_eq!(link, "/Home/Index");
    }

    #[test]
    fn test_defaulted_segment_elided_when_equal() {
        let generator = generator(&[("{controller}/{action=Index}", "default")]);
        let link = generator
            .try_get_link(
                &LinkContext::new("default").with_supplied(values(&[("controller", "Home")])),
            )
            .unwrap();
        assert_eq!(link, "/Home");

        let link = generator
            .try_get_link(&LinkContext::new("default").with_supplied(values(&[
                ("controller", "Home"),
                ("action", "Edit"),
            ])))
            .unwrap();
        assert_eq!(link, "/Home/Edit");
    }

    #[test]
    fn test_ambient_fallback() {
        let generator = generator(&[("{controller}/{action}", "default")]);
        let link = generator
            .try_get_link(
                &LinkContext::new("default")
                    .with_supplied(values(&[("action", "Edit")]))
                    .with_ambient(values(&[("controller", "Home"), ("action", "Index")])),
            )
            .unwrap();
        assert_eq!(link, "/Home/Edit");
    }

    #[test]
    fn test_ambient_cut_off_after_supplied_parameter() {
        // Once "controller" is supplied explicitly, the ambient "action"
        // may no longer be used; with no default the candidate fails.
        let generator = generator(&[("{controller}/{action}", "default")]);
        let result = generator.try_get_link(
            &LinkContext::new("default")
                .with_supplied(values(&[("controller", "Store")]))
                .with_ambient(values(&[("action", "Index")])),
        );
        assert!(result.is_none());
    }

    #[test]
    fn test_query_string_from_unconsumed_supplied() {
        let generator = generator(&[("{controller}/{action}", "default")]);
        let link = generator
            .try_get_link(
                &LinkContext::new("default")
                    .with_supplied(values(&[("name", "name with %special #characters")]))
                    .with_ambient(values(&[("controller", "Home"), ("action", "Index")])),
            )
            .unwrap();
        assert_eq!(
            link,
            "/Home/Index?name=name%20with%20%25special%20%23characters"
        );
    }

    #[test]
    fn test_query_string_list_expansion() {
        let generator = generator(&[("{controller}/{action}", "default")]);
        let mut supplied = RouteValues::new();
        supplied.set(
            "items",
            RouteValue::List(vec!["10".into(), "20".into(), "30".into()]),
        );
        let link = generator
            .try_get_link(
                &LinkContext::new("default")
                    .with_supplied(supplied)
                    .with_ambient(values(&[("controller", "Home"), ("action", "Index")])),
            )
            .unwrap();
        assert_eq!(link, "/Home/Index?items=10&items=20&items=30");
    }

    #[test]
    fn test_empty_list_contributes_nothing() {
        let generator = generator(&[("{controller}", "default")]);
        let mut supplied = values(&[("controller", "Home")]);
        supplied.set("items", RouteValue::List(Vec::new()));
        let link = generator
            .try_get_link(&LinkContext::new("default").with_supplied(supplied))
            .unwrap();
        assert_eq!(link, "/Home");
    }

    #[test]
    fn test_catch_all_keeps_slashes() {
        let generator = generator(&[("files/{*path}", "files")]);
        let link = generator
            .try_get_link(
                &LinkContext::new("files").with_supplied(values(&[("path", "docs/read me.md")])),
            )
            .unwrap();
        assert_eq!(link, "/files/docs/read%20me.md");
    }

    #[test]
    fn test_missing_required_parameter_fails() {
        let generator = generator(&[("{controller}/{action}", "default")]);
        let result = generator.get_link(
            &LinkContext::new("default").with_supplied(values(&[("controller", "Home")])),
        );
        assert!(matches!(
            result,
            Err(RouteError::NoMatchingEndpoint { .. })
        ));
    }

    #[test]
    fn test_unknown_address_fails() {
        let generator = generator(&[("{controller}", "default")]);
        assert!(generator.try_get_link(&LinkContext::new("missing")).is_none());
    }

    #[test]
    fn test_outbound_constraint_vetoes_candidate() {
        let mut set = RouteSet::new();
        set.add(
            "orders/{id:int}",
            RouteValues::new(),
            Vec::new(),
            Endpoint::new("orders/{id:int}", NamedHandler::new("orders")).with_address("orders"),
        )
        .unwrap();
        let generator =
            LinkGenerator::new(Arc::new(RouteEntryFinder::new(&set)), RouteOptions::default());

        assert!(generator
            .try_get_link(&LinkContext::new("orders").with_supplied(values(&[("id", "42")])))
            .is_some());
        assert!(generator
            .try_get_link(&LinkContext::new("orders").with_supplied(values(&[("id", "abc")])))
            .is_none());
    }

    #[test]
    fn test_candidates_tried_in_declaration_order() {
        let mut set = RouteSet::new();
        set.add(
            "{controller}/{action}",
            RouteValues::new(),
            Vec::new(),
            Endpoint::new("{controller}/{action}", NamedHandler::new("two")).with_address("multi"),
        )
        .unwrap();
        set.add(
            "{controller}",
            RouteValues::new(),
            Vec::new(),
            Endpoint::new("{controller}", NamedHandler::new("one")).with_address("multi"),
        )
        .unwrap();
        let generator =
            LinkGenerator::new(Arc::new(RouteEntryFinder::new(&set)), RouteOptions::default());

        // The first declared candidate needs an action; without one the
        // second candidate renders.
        let link = generator
            .try_get_link(&LinkContext::new("multi").with_supplied(values(&[("controller", "Home")])))
            .unwrap();
        assert_eq!(link, "/Home");
    }

    #[test]
    fn test_options_apply_at_emission() {
        let generator = generator(&[("{controller}/{action}", "default")]);
        let options = RouteOptions {
            lowercase_urls: true,
            append_trailing_slash: true,
            lowercase_query_strings: true,
        };
        let link = generator
            .try_get_link(
                &LinkContext::new("default")
                    .with_supplied(values(&[
                        ("controller", "Home"),
                        ("action", "Index"),
                        ("Tag", "VIP"),
                    ]))
                    .with_options(options),
            )
            .unwrap();
        assert_eq!(link, "/home/index/?tag=vip");
    }

    #[test]
    fn test_route_options_deserialize_with_defaults() {
        let options: RouteOptions = serde_json::from_str(r#"{"lowercase_urls": true}"#).unwrap();
        assert!(options.lowercase_urls);
        assert!(!options.append_trailing_slash);
        assert!(!options.lowercase_query_strings);

        let options: RouteOptions = serde_json::from_str("{}").unwrap();
        assert_eq!(options, RouteOptions::default());
    }

    #[test]
    fn test_empty_template_renders_root() {
        let generator = generator(&[("", "root")]);
        let link = generator.try_get_link(&LinkContext::new("root")).unwrap();
        assert_eq!(link, "/");
    }
}
