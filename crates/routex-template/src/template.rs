//! The route template model.
//!
//! A [`RouteTemplate`] is an ordered list of [`RouteSegment`]s, each holding
//! one or more [`RoutePart`]s. Templates are produced by
//! [`parse_template`](crate::parser::parse_template), which enforces the
//! structural invariants; the types here only expose the parsed shape.

use std::fmt;

/// A `{name}` placeholder within a segment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParameterPart {
    /// The parameter name. Unique within a template, case-insensitively.
    pub name: String,
    /// `true` for `{name?}`.
    pub is_optional: bool,
    /// `true` for `{*name}`.
    pub is_catch_all: bool,
    /// The inline default from `{name=value}`.
    pub default_value: Option<String>,
    /// Raw inline constraint expressions from `{name:int:min(1)}`, in
    /// declaration order. Resolved later by the constraint engine.
    pub inline_constraints: Vec<String>,
}

/// One part of a segment: literal text, a parameter, or the literal text
/// separating two parameters in a complex segment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RoutePart {
    /// Verbatim literal text (brace escapes already unescaped).
    Literal(String),
    /// A `{name}` placeholder.
    Parameter(ParameterPart),
    /// Literal text with a parameter on both sides, e.g. the `.` in
    /// `{file}.{ext}`.
    Separator(String),
}

impl RoutePart {
    /// Returns `true` for literal and separator parts.
    pub const fn is_literal(&self) -> bool {
        matches!(self, Self::Literal(_) | Self::Separator(_))
    }

    /// Returns the parameter, if this part is one.
    pub const fn parameter(&self) -> Option<&ParameterPart> {
        match self {
            Self::Parameter(p) => Some(p),
            _ => None,
        }
    }

    /// Returns the literal text, if this part carries any.
    pub fn text(&self) -> Option<&str> {
        match self {
            Self::Literal(t) | Self::Separator(t) => Some(t),
            Self::Parameter(_) => None,
        }
    }
}

/// The portion of a template between `/` separators.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RouteSegment {
    parts: Vec<RoutePart>,
}

impl RouteSegment {
    pub(crate) fn new(parts: Vec<RoutePart>) -> Self {
        Self { parts }
    }

    /// The parts of this segment, in order.
    pub fn parts(&self) -> &[RoutePart] {
        &self.parts
    }

    /// A segment is simple when it consists of exactly one part. Complex
    /// (multi-part) segments parse but are not matched by the engines.
    pub fn is_simple(&self) -> bool {
        self.parts.len() == 1
    }

    /// Returns the parameter of a simple parameter segment.
    pub fn single_parameter(&self) -> Option<&ParameterPart> {
        if self.is_simple() {
            self.parts[0].parameter()
        } else {
            None
        }
    }

    /// `true` when the segment is a single optional parameter.
    pub fn is_optional_parameter(&self) -> bool {
        self.single_parameter().is_some_and(|p| p.is_optional)
    }

    /// `true` when the segment's last part is a catch-all parameter.
    pub fn is_catch_all(&self) -> bool {
        self.parts
            .last()
            .and_then(RoutePart::parameter)
            .is_some_and(|p| p.is_catch_all)
    }
}

/// A parsed route template such as `{controller}/{action}/{id?}`.
///
/// The stored text is canonical: a leading `~/` or `/` has been stripped.
/// Parameter names are unique case-insensitively, catch-alls only appear at
/// the very end, and optional parameters only in trailing segments; the
/// parser rejects anything else.
#[derive(Debug, Clone)]
pub struct RouteTemplate {
    text: String,
    segments: Vec<RouteSegment>,
    parameters: Vec<(String, usize)>,
}

impl RouteTemplate {
    pub(crate) fn new(text: String, segments: Vec<RouteSegment>) -> Self {
        let mut parameters = Vec::new();
        for (index, segment) in segments.iter().enumerate() {
            for part in segment.parts() {
                if let RoutePart::Parameter(p) = part {
                    parameters.push((p.name.clone(), index));
                }
            }
        }
        Self {
            text,
            segments,
            parameters,
        }
    }

    /// Parses a template string. Equivalent to
    /// [`parse_template`](crate::parser::parse_template).
    ///
    /// # Errors
    ///
    /// Returns [`RouteError::TemplateParse`](routex_core::RouteError) with
    /// the character offset and cause on invalid input.
    pub fn parse(template: &str) -> routex_core::RouteResult<Self> {
        crate::parser::parse_template(template)
    }

    /// The canonical template text (leading `/` and `~/` stripped).
    pub fn text(&self) -> &str {
        &self.text
    }

    /// The segments of this template, in order.
    pub fn segments(&self) -> &[RouteSegment] {
        &self.segments
    }

    /// Parameter names with the index of the segment each appears in, in
    /// declaration order.
    pub fn parameters(&self) -> &[(String, usize)] {
        &self.parameters
    }

    /// Looks up the parameter part for `name` (case-insensitive).
    pub fn parameter(&self, name: &str) -> Option<&ParameterPart> {
        self.segments.iter().flat_map(RouteSegment::parts).find_map(|part| {
            part.parameter()
                .filter(|p| p.name.eq_ignore_ascii_case(name))
        })
    }

    /// `true` when the template ends in a catch-all parameter.
    pub fn has_catch_all(&self) -> bool {
        self.segments.last().is_some_and(RouteSegment::is_catch_all)
    }

    /// The number of segments a path must supply at minimum, counting
    /// only inline template information: the trailing run of optional or
    /// inline-defaulted parameter segments and a final catch-all are not
    /// required. Entry-level defaults can lower the effective minimum
    /// further; that is the per-entry matcher's concern.
    pub fn required_segment_count(&self) -> usize {
        let mut required = self.segments.len();
        for segment in self.segments.iter().rev() {
            let omissible = segment.is_catch_all()
                || segment
                    .single_parameter()
                    .is_some_and(|p| p.is_optional || p.default_value.is_some());
            if omissible {
                required -= 1;
            } else {
                break;
            }
        }
        required
    }
}

impl fmt::Display for RouteTemplate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.text)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(t: &str) -> RouteTemplate {
        RouteTemplate::parse(t).unwrap()
    }

    #[test]
    fn test_parameters_index() {
        let t = parse("{controller}/{action}/{id?}");
        let names: Vec<&str> = t.parameters().iter().map(|(n, _)| n.as_str()).collect();
        assert_eq!(names, vec!["controller", "action", "id"]);
        assert_eq!(t.parameters()[2].1, 2);
    }

    #[test]
    fn test_parameter_lookup_case_insensitive() {
        let t = parse("{Controller}");
        assert!(t.parameter("controller").is_some());
        assert!(t.parameter("missing").is_none());
    }

    #[test]
    fn test_required_segment_count_all_required() {
        assert_eq!(parse("a/{b}/c").required_segment_count(), 3);
    }

    #[test]
    fn test_required_segment_count_trailing_optional() {
        assert_eq!(parse("{a}/{b?}/{c?}").required_segment_count(), 1);
    }

    #[test]
    fn test_required_segment_count_inline_default() {
        assert_eq!(parse("{a}/{b=Index}").required_segment_count(), 1);
    }

    #[test]
    fn test_required_segment_count_catch_all() {
        let t = parse("files/{*path}");
        assert!(t.has_catch_all());
        assert_eq!(t.required_segment_count(), 1);
    }

    #[test]
    fn test_segment_shape_helpers() {
        let t = parse("a/{b}/{c?}");
        let segments = t.segments();
        assert!(segments[0].is_simple());
        assert!(segments[0].parts()[0].is_literal());
        assert!(segments[1].single_parameter().is_some());
        assert!(!segments[1].is_optional_parameter());
        assert!(segments[2].is_optional_parameter());
    }
}
