//! # routex-matcher
//!
//! Compiles a set of route templates into a dispatcher and, in reverse,
//! generates URLs from values. Three interchangeable match engines share
//! one [`RouteSet`] builder: a breadth-first-packed tree
//! ([`TreeMatcher`]), a DFA with per-state jump tables ([`DfaMatcher`]),
//! and a flat instruction stream ([`ProgramMatcher`]). All three return
//! the same winning endpoint on every path; they differ only in execution
//! model.

pub mod dfa;
pub mod encoding;
pub mod endpoint;
pub mod link;
pub mod program;
pub mod tree;

pub use dfa::DfaMatcher;
pub use endpoint::{
    Endpoint, Handler, Matcher, NamedHandler, RouteEntry, RouteMatch, RouteSet,
};
pub use link::{EndpointFinder, LinkContext, LinkGenerator, RouteEntryFinder, RouteOptions};
pub use program::ProgramMatcher;
pub use tree::TreeMatcher;
