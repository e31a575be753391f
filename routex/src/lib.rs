//! # routex
//!
//! A URL routing core: route templates are compiled into a compact
//! matching automaton that dispatches request paths to endpoints, and the
//! same templates drive link generation in reverse.
//!
//! This is the meta-crate that re-exports the sub-crates for convenient
//! access. Depend on `routex` for everything, or on individual crates for
//! finer-grained control.

/// Errors, logging helpers, and the route values map.
pub use routex_core as core;

/// Template model, parser, per-template matching, constraints, precedence.
pub use routex_template as template;

/// The three match engines and link generation.
pub use routex_matcher as matcher;
