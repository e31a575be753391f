//! Logging integration for the routex routing library.
//!
//! Provides a helper for installing a [`tracing`]-based subscriber and for
//! creating per-match spans. Hosts that already install their own subscriber
//! can ignore this module entirely; routex only ever emits through the
//! `tracing` facade.

/// Sets up a global tracing subscriber for the given filter directive.
///
/// `filter` follows `tracing_subscriber::EnvFilter` syntax (e.g. `"debug"`,
/// `"routex_matcher=debug,info"`). When `pretty` is set a human-readable
/// format is used; otherwise output is structured JSON.
///
/// Installation is best-effort: if a subscriber is already set, this is a
/// no-op.
pub fn setup_logging(filter: &str, pretty: bool) {
    use tracing_subscriber::fmt;
    use tracing_subscriber::EnvFilter;

    let filter = EnvFilter::try_new(filter).unwrap_or_else(|_| EnvFilter::new("info"));

    if pretty {
        fmt::Subscriber::builder()
            .with_env_filter(filter)
            .with_target(true)
            .pretty()
            .try_init()
            .ok();
    } else {
        fmt::Subscriber::builder()
            .with_env_filter(filter)
            .with_target(true)
            .json()
            .try_init()
            .ok();
    }
}

/// Creates a tracing span for a single match operation.
///
/// Attach this span around a call into a matcher so that candidate and
/// constraint logs emitted during the match carry the request path.
///
/// # Examples
///
/// ```
/// use routex_core::logging::match_span;
///
/// let span = match_span("/users/42");
/// let _guard = span.enter();
/// tracing::debug!("attempting match");
/// ```
pub fn match_span(path: &str) -> tracing::Span {
    tracing::debug_span!("route_match", path = path)
}
