//! Diagnostic logging to stderr

use tracing_subscriber::EnvFilter;

/// Install the global subscriber.
///
/// `filter` takes EnvFilter directives; without it the level is `warn`, or
/// `info` with `--verbose`. Invalid directives fall back to the default.
pub fn init(filter: Option<&str>, verbose: bool) {
    let default = if verbose { "info" } else { "warn" };
    let filter = filter
        .and_then(|directives| EnvFilter::try_new(directives).ok())
        .unwrap_or_else(|| EnvFilter::new(default));

    // Already installed is fine
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .try_init();
}
