//! # routex-core
//!
//! Core types shared by every routex crate: the [`RouteError`] taxonomy,
//! [`tracing`]-based logging helpers, and the [`RouteValues`] map used to
//! carry extracted parameter values through matching and link generation.

pub mod error;
pub mod logging;
pub mod values;

pub use error::{RouteError, RouteResult, TemplateParseErrorKind};
pub use values::{RouteValue, RouteValues};
