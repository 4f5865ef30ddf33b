//! Stable exit codes for the pushgate CLI.
//!
//! The hook treats any non-zero status as "abort the push".

/// All checks passed; the push may proceed.
pub const OK: i32 = 0;
/// A gate (queue, acceptance criteria, scope pause) blocked the push.
pub const BLOCKED: i32 = 1;
/// Setup or persistence failure: missing identity, missing/corrupt documents,
/// invalid config, or a failed knowledge store write.
pub const INVALID: i32 = 2;
