//! Per-template path matching.
//!
//! [`TemplateMatcher`] binds one [`RouteTemplate`] to a defaults map and
//! answers the question "does this request path fit this template, and with
//! which parameter values?". The match engines build one of these per route
//! entry and re-run it on the full path once a candidate terminal is
//! reached.

use routex_core::{RouteValue, RouteValues};

use crate::template::{RoutePart, RouteTemplate};

/// Matches request paths against a single route template.
///
/// Defaults passed at construction are merged with the template's inline
/// defaults (`{action=Index}`); explicit entry defaults win on collision.
/// On a successful match, defaults fill every parameter the path did not
/// supply.
#[derive(Debug, Clone)]
pub struct TemplateMatcher {
    template: RouteTemplate,
    defaults: RouteValues,
}

impl TemplateMatcher {
    /// Creates a matcher for `template` with entry-level `defaults`.
    pub fn new(template: RouteTemplate, defaults: RouteValues) -> Self {
        let mut defaults = defaults;
        for segment in template.segments() {
            for part in segment.parts() {
                if let RoutePart::Parameter(p) = part {
                    if let Some(default) = &p.default_value {
                        if !defaults.contains_key(&p.name) {
                            defaults.set(p.name.clone(), default.clone());
                        }
                    }
                }
            }
        }
        Self { template, defaults }
    }

    /// The template this matcher was built from.
    pub fn template(&self) -> &RouteTemplate {
        &self.template
    }

    /// The merged defaults (entry-level plus inline).
    pub fn defaults(&self) -> &RouteValues {
        &self.defaults
    }

    /// The minimum number of path segments this matcher accepts, taking
    /// both optional parameters and merged defaults into account: a
    /// trailing run of parameter segments that are optional or defaulted
    /// can be omitted from the path, as can a final catch-all.
    pub fn min_required_segments(&self) -> usize {
        let segments = self.template.segments();
        let mut required = segments.len();
        for segment in segments.iter().rev() {
            let omissible = segment.is_catch_all()
                || segment.single_parameter().is_some_and(|p| {
                    p.is_optional || self.defaults.contains_key(&p.name)
                });
            if omissible {
                required -= 1;
            } else {
                break;
            }
        }
        required
    }

    /// Attempts to match `path` against the template.
    ///
    /// Splits the path on `/` (a single trailing `/` is tolerated),
    /// compares literals case-insensitively, captures parameter segments
    /// case-preservingly, lets a catch-all swallow the remaining residue
    /// verbatim, and overlays defaults for anything unbound. Complex
    /// (multi-part) segments never match; none of the engines implement
    /// them.
    ///
    /// Returns `true` and populates `values` on success. On failure the
    /// map is rolled back to its state at entry.
    pub fn try_match(&self, path: &str, values: &mut RouteValues) -> bool {
        let mark = values.mark();
        if self.try_match_inner(path, values) {
            true
        } else {
            values.rollback(mark);
            false
        }
    }

    fn try_match_inner(&self, path: &str, values: &mut RouteValues) -> bool {
        let trimmed = path.strip_prefix('/').unwrap_or(path);
        let mut segments: Vec<&str> = if trimmed.is_empty() {
            Vec::new()
        } else {
            trimmed.split('/').collect()
        };
        // A trailing slash produces one empty residue segment; accept it.
        if segments.last() == Some(&"") {
            segments.pop();
        }

        let mut index = 0;
        for segment in self.template.segments() {
            if segment.is_catch_all() {
                let Some(p) = segment.single_parameter() else {
                    // Complex catch-all segments are unsupported.
                    return false;
                };
                let residue = segments[index..].join("/");
                if !residue.is_empty() {
                    values.set(p.name.clone(), residue);
                }
                index = segments.len();
                break;
            }

            if index >= segments.len() {
                // Path exhausted: the rest must be omissible.
                let omissible = segment.single_parameter().is_some_and(|p| {
                    p.is_optional || self.defaults.contains_key(&p.name)
                });
                if !omissible {
                    return false;
                }
                continue;
            }

            if !segment.is_simple() {
                return false;
            }

            let text = segments[index];
            match &segment.parts()[0] {
                RoutePart::Literal(literal) | RoutePart::Separator(literal) => {
                    if !literal.eq_ignore_ascii_case(text) {
                        return false;
                    }
                }
                RoutePart::Parameter(p) => {
                    if text.is_empty() {
                        return false;
                    }
                    values.set(p.name.clone(), RouteValue::Str(text.to_string()));
                }
            }
            index += 1;
        }

        if index < segments.len() {
            return false;
        }

        for (name, default) in self.defaults.iter() {
            if !values.contains_key(name) {
                values.set(name.to_string(), default.clone());
            }
        }
        true
    }
}
