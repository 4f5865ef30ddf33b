//! Scope validation: file scope (check 1) and semantic scope (check 2).

use crate::core::path::{has_prefix, same_path};
use crate::core::types::ScopeFlags;
use crate::model::ScopeDefinition;

/// True if `path` is outside a non-empty `file_scope`.
///
/// An empty file scope places no restriction on the agent.
pub fn out_of_file_scope(path: &str, file_scope: &[String]) -> bool {
    !file_scope.is_empty() && !file_scope.iter().any(|entry| same_path(entry, path))
}

/// True if `path` crosses into a forbidden region of `definition`.
///
/// Exact `allowed_paths` entries win over every prefix rule, then allowed
/// prefixes win over forbidden ones.
pub fn crosses_semantic_scope(path: &str, definition: &ScopeDefinition) -> bool {
    if definition.allowed_paths.iter().any(|p| same_path(p, path)) {
        return false;
    }
    if definition
        .allowed_path_prefixes
        .iter()
        .any(|prefix| has_prefix(path, prefix))
    {
        return false;
    }
    definition
        .forbidden_path_prefixes
        .iter()
        .any(|prefix| has_prefix(path, prefix))
}

/// Scope flags for one file. `definition` is `None` when the semantic check
/// does not apply (bootstrap mode, or no definition for the agent's scope).
pub fn scope_flags(
    path: &str,
    file_scope: &[String],
    definition: Option<&ScopeDefinition>,
) -> ScopeFlags {
    ScopeFlags {
        out_of_scope: out_of_file_scope(path, file_scope),
        cross_scope: definition.is_some_and(|def| crosses_semantic_scope(path, def)),
    }
}
