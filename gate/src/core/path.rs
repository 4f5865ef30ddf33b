//! Lexical path normalization and prefix matching.
//!
//! Every path the engine compares (modified files, declared dependencies,
//! scope entries, resolved imports) goes through [`normalize`] first so that
//! `./src/a.py`, `src//a.py` and `src/a.py` are the same file.

/// Normalize a repo-relative path lexically.
///
/// Collapses repeated separators, drops `.` components and resolves `..`
/// against preceding components. Leading `..` components that cannot be
/// resolved are kept. An empty result normalizes to `"."`. Backslashes are
/// treated as separators.
pub fn normalize(path: &str) -> String {
    let absolute = path.starts_with('/');
    let mut parts: Vec<&str> = Vec::new();
    for component in path.split(['/', '\\']) {
        match component {
            "" | "." => {}
            ".." => match parts.last() {
                Some(&last) if last != ".." => {
                    parts.pop();
                }
                _ if absolute => {}
                _ => parts.push(".."),
            },
            other => parts.push(other),
        }
    }
    let joined = parts.join("/");
    match (absolute, joined.is_empty()) {
        (true, _) => format!("/{joined}"),
        (false, true) => ".".to_string(),
        (false, false) => joined,
    }
}

/// True if `path` falls under `prefix`.
///
/// A prefix written with a trailing separator (`app/`) is a directory entry
/// and only matches the directory itself or paths below it. Any other prefix
/// is a plain string prefix over the normalized path, so `src/api` matches
/// both `src/api/x.py` and `src/api_v2.py`.
pub fn has_prefix(path: &str, prefix: &str) -> bool {
    let norm_path = normalize(path);
    let norm_prefix = normalize(prefix);
    if norm_prefix == "." {
        return true;
    }
    if prefix.ends_with('/') || prefix.ends_with('\\') {
        return norm_path == norm_prefix
            || norm_path
                .strip_prefix(norm_prefix.as_str())
                .is_some_and(|rest| rest.starts_with('/'));
    }
    norm_path.starts_with(norm_prefix.as_str())
}

/// Compare two paths after normalization.
pub fn same_path(a: &str, b: &str) -> bool {
    normalize(a) == normalize(b)
}
