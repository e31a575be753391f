//! # routex-template
//!
//! The route template model and everything that operates on a single
//! template: the parser, the per-template path matcher, parameter
//! constraints, and the precedence calculator that gives a set of templates
//! a deterministic match order.

pub mod constraints;
pub mod matcher;
pub mod parser;
pub mod precedence;
pub mod template;

pub use constraints::{
    check_constraints, resolve_constraint, ConstraintDirection, ConstraintMap, RouteConstraint,
};
pub use matcher::TemplateMatcher;
pub use parser::parse_template;
pub use precedence::PrecedenceKey;
pub use template::{ParameterPart, RoutePart, RouteSegment, RouteTemplate};
