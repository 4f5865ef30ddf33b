//! Pre-push policy gate for multi-agent repositories.
//!
//! Before an agent's change set is pushed, the gate checks it against the
//! agent's file and semantic scope, enforces the proposal queue budget and the
//! RFC gates, annotates every modified file with risk signals and a dependency
//! scan, and appends one proposal per file to the shared knowledge store.
//!
//! - **[`core`]**: Pure, deterministic logic (tree differ, signature
//!   extractor, pattern scanner, scope and dependency validation, gates,
//!   proposal builder). No I/O, fully testable in isolation.
//! - **[`io`]**: Side-effecting operations (git, `.skl/` documents, atomic
//!   knowledge store writes).
//!
//! [`check`] and [`classify`] coordinate core logic with I/O to implement the
//! CLI commands.

pub mod check;
pub mod classify;
pub mod core;
pub mod exit_codes;
pub mod io;
pub mod logging;
pub mod model;
#[cfg(any(test, feature = "test-support"))]
pub mod test_support;
