//! Tracing setup for the `pushgate` binary.
//!
//! A pre-push hook's stdout is what the pushing agent reads, so it carries
//! only the status lines built by [`crate::check::CheckOutcome::report_lines`].
//! Everything emitted through `tracing` (skipped RFC files, unreadable
//! revisions, a failed diff, tree-diff timeouts) goes to stderr, filtered by
//! `RUST_LOG`. With no filter set only warnings get through, so a clean push
//! prints nothing on stderr.

use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

/// Install the global subscriber. Call once, before any gate work.
///
/// `RUST_LOG=pushgate=debug pushgate check` shows every git call and gate
/// decision.
pub fn init() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_writer(std::io::stderr).compact())
        .init();
}
