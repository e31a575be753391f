//! Core error types for the routex routing library.
//!
//! This module provides the [`RouteError`] enum covering build-time template
//! errors, route-table configuration errors, and link-generation failures.
//! Match-time code never surfaces errors for user-supplied path content; a
//! failed match is an `Option::None`, not an `Err`.

use std::fmt;

use thiserror::Error;

/// The reason a route template failed to parse.
///
/// Carried inside [`RouteError::TemplateParse`] together with the character
/// offset of the offending construct in the original template string.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TemplateParseErrorKind {
    /// A parameter has no name, e.g. `{}` or `{:int}`.
    EmptyName,
    /// The same parameter name appears twice (compared case-insensitively).
    DuplicateName,
    /// A `{` without a matching `}`, or a stray `}`.
    UnbalancedBrace,
    /// A catch-all parameter that is not the last part of the last segment.
    CatchAllNotLast,
    /// An optional parameter followed by a non-optional segment.
    OptionalNotTrailing,
    /// A catch-all parameter with a default value, e.g. `{*path=x}`.
    DefaultOnCatchAll,
    /// A catch-all parameter marked optional, e.g. `{*path?}`.
    OptionalCatchAll,
    /// An optional parameter with a default value, e.g. `{id=5?}`.
    DefaultOnOptional,
    /// An empty path segment, e.g. `a//b` or a trailing `/`.
    EmptySegment,
}

impl fmt::Display for TemplateParseErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let text = match self {
            Self::EmptyName => "parameter name is empty",
            Self::DuplicateName => "parameter name is used more than once",
            Self::UnbalancedBrace => "unbalanced brace",
            Self::CatchAllNotLast => "a catch-all parameter must be the last part of the template",
            Self::OptionalNotTrailing => {
                "optional parameters may only appear in trailing segments"
            }
            Self::DefaultOnCatchAll => "a catch-all parameter cannot have a default value",
            Self::OptionalCatchAll => "a catch-all parameter cannot be optional",
            Self::DefaultOnOptional => "an optional parameter cannot have a default value",
            Self::EmptySegment => "empty path segment",
        };
        f.write_str(text)
    }
}

/// The primary error type for the routex routing library.
///
/// Build-time errors (template parsing, duplicate routes, unknown inline
/// constraints) are raised immediately and carry a user-readable location.
/// [`RouteError::NoMatchingEndpoint`] is the only error surfaced at runtime,
/// and only from explicit link generation.
#[derive(Error, Debug)]
pub enum RouteError {
    /// A route template string could not be parsed.
    #[error("invalid route template at offset {offset}: {kind}")]
    TemplateParse {
        /// Character offset into the original template string.
        offset: usize,
        /// What went wrong.
        kind: TemplateParseErrorKind,
    },

    /// Two route entries compare equal in order, precedence, and text.
    #[error("duplicate route: '{template}' is registered more than once")]
    DuplicateRoute {
        /// Canonical text of the colliding template.
        template: String,
    },

    /// Link generation found no endpoint compatible with the supplied values.
    #[error("no endpoint matches address '{address}' with the supplied values")]
    NoMatchingEndpoint {
        /// The address that was looked up.
        address: String,
    },

    /// The routing table is improperly configured (e.g. an unknown inline
    /// constraint name).
    #[error("improperly configured: {0}")]
    ImproperlyConfigured(String),
}

impl RouteError {
    /// Creates a [`RouteError::TemplateParse`] for the given offset and kind.
    pub const fn parse(offset: usize, kind: TemplateParseErrorKind) -> Self {
        Self::TemplateParse { offset, kind }
    }
}

/// A convenience type alias for `Result<T, RouteError>`.
pub type RouteResult<T> = Result<T, RouteError>;
