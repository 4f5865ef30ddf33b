//! Dependency resolver and validator.
//!
//! The resolver maps a unit's imports to repo-relative files; the validator
//! compares them with the file's declared dependencies and flags undeclared
//! imports that reach into another agent's scope.

use std::collections::{BTreeMap, BTreeSet};

use tracing::debug;

use crate::core::budget::Budget;
use crate::core::path::{has_prefix, normalize, same_path};
use crate::core::syntax::SourceLanguage;
use crate::core::types::DependencyScan;
use crate::model::{ExpectedImport, StateRecord};

/// Answers whether a repo-relative path is a file in the working tree.
pub trait FileProbe {
    fn is_file(&self, rel_path: &str) -> bool;
}

impl FileProbe for BTreeSet<String> {
    fn is_file(&self, rel_path: &str) -> bool {
        self.contains(&normalize(rel_path))
    }
}

/// Resolve every import in `head` to a project file.
///
/// Each module probes its candidates in order and the first existing file
/// wins; modules with no candidate on disk are external and dropped. A unit
/// that does not parse resolves to nothing.
pub fn resolve_imports(
    lang: &dyn SourceLanguage,
    head: &str,
    probe: &dyn FileProbe,
) -> BTreeSet<String> {
    let tree = match lang.parse(head, &Budget::unbounded()) {
        Ok(tree) => tree,
        Err(err) => {
            debug!(language = lang.name(), %err, "unparseable head; no imports resolved");
            return BTreeSet::new();
        }
    };
    lang.collect_imports(&tree)
        .iter()
        .filter_map(|module| {
            lang.module_candidates(module)
                .into_iter()
                .find(|candidate| probe.is_file(candidate))
        })
        .map(|path| normalize(&path))
        .collect()
}

/// Owning semantic scope of every tracked file.
#[derive(Debug, Clone, Default)]
pub struct ScopeIndex {
    owners: BTreeMap<String, String>,
}

impl ScopeIndex {
    /// Later records for the same path override earlier ones.
    pub fn from_records(records: &[StateRecord]) -> Self {
        let owners = records
            .iter()
            .map(|record| (normalize(&record.path), record.semantic_scope.clone()))
            .collect();
        Self { owners }
    }

    pub fn owner(&self, path: &str) -> Option<&str> {
        self.owners.get(&normalize(path)).map(String::as_str)
    }
}

/// True if `path` matches a known-expected cross-scope import entry.
pub fn is_known_expected(path: &str, expected: &[ExpectedImport]) -> bool {
    expected.iter().any(|entry| {
        let entry = entry.path();
        if entry.ends_with('/') || entry.ends_with('\\') {
            has_prefix(path, entry)
        } else {
            same_path(path, entry)
        }
    })
}

/// Compare resolved imports with what the file's ledger entry declares.
///
/// `own` is `None` for a file the ledger does not track yet: undeclared and
/// stale stay empty, but the whole resolved set is still checked for
/// cross-scope reach.
pub fn validate_dependencies(
    resolved: &BTreeSet<String>,
    own: Option<&StateRecord>,
    index: &ScopeIndex,
    expected: &[ExpectedImport],
    agent_scope: &str,
) -> DependencyScan {
    let mut scan = DependencyScan::default();
    let candidates = match own {
        Some(record) => {
            let declared: BTreeSet<String> =
                record.dependencies.iter().map(|dep| normalize(dep)).collect();
            scan.undeclared = resolved.difference(&declared).cloned().collect();
            scan.stale = declared.difference(resolved).cloned().collect();
            scan.undeclared.clone()
        }
        None => resolved.clone(),
    };
    scan.cross_scope_undeclared = candidates
        .into_iter()
        .filter(|path| {
            index
                .owner(path)
                .is_some_and(|owner| !owner.is_empty() && owner != agent_scope)
        })
        .filter(|path| !is_known_expected(path, expected))
        .collect();
    scan
}
