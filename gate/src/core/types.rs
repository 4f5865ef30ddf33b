//! Shared deterministic types for gate core logic.
//!
//! These types are serialized into proposal records, so their wire names are
//! a contract with the downstream reviewer tooling and must stay stable.

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

/// One modified file with its content at the base and head revisions.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChangeUnit {
    pub path: String,
    /// `None` when the file does not exist at the base revision.
    pub base: Option<String>,
    /// Empty for deleted or non-text files.
    pub head: String,
}

/// Classification of a change by what its syntax tree delta touches.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChangeType {
    /// Identical once documentation literals and no-op statements are ignored.
    Mechanical,
    /// A top-level declaration was added, removed or re-signatured.
    Structural,
    /// Anything else.
    Behavioral,
}

impl ChangeType {
    /// Mechanical wins over structural, structural over behavioral.
    pub fn derive(mechanical_only: bool, public_api_changed: bool) -> Self {
        if mechanical_only {
            ChangeType::Mechanical
        } else if public_api_changed {
            ChangeType::Structural
        } else {
            ChangeType::Behavioral
        }
    }
}

/// Per-file risk record attached to a proposal.
///
/// A stored `mechanical_only` is ignored on load and derived again.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "StoredRiskSignals")]
pub struct RiskSignals {
    #[serde(rename = "touched_auth_or_permission_patterns")]
    pub touched_sensitive_pattern: bool,
    #[serde(rename = "public_api_signature_changed")]
    pub public_api_changed: bool,
    #[serde(rename = "invariant_referenced_file_modified")]
    pub invariant_referenced: bool,
    #[serde(rename = "high_fan_in_module_modified")]
    pub high_fan_in: bool,
    #[serde(rename = "ast_change_type")]
    pub change_type: ChangeType,
    mechanical_only: bool,
}

impl RiskSignals {
    /// Build a record; `mechanical_only` is derived, never supplied.
    pub fn new(
        change_type: ChangeType,
        public_api_changed: bool,
        touched_sensitive_pattern: bool,
        invariant_referenced: bool,
        high_fan_in: bool,
    ) -> Self {
        let mechanical_only = change_type == ChangeType::Mechanical
            && !touched_sensitive_pattern
            && !invariant_referenced
            && !high_fan_in;
        Self {
            touched_sensitive_pattern,
            public_api_changed,
            invariant_referenced,
            high_fan_in,
            change_type,
            mechanical_only,
        }
    }

    pub fn mechanical_only(&self) -> bool {
        self.mechanical_only
    }
}

#[derive(Deserialize)]
struct StoredRiskSignals {
    #[serde(rename = "touched_auth_or_permission_patterns")]
    touched_sensitive_pattern: bool,
    #[serde(rename = "public_api_signature_changed")]
    public_api_changed: bool,
    #[serde(rename = "invariant_referenced_file_modified")]
    invariant_referenced: bool,
    #[serde(rename = "high_fan_in_module_modified")]
    high_fan_in: bool,
    #[serde(rename = "ast_change_type")]
    change_type: ChangeType,
}

impl From<StoredRiskSignals> for RiskSignals {
    fn from(stored: StoredRiskSignals) -> Self {
        RiskSignals::new(
            stored.change_type,
            stored.public_api_changed,
            stored.touched_sensitive_pattern,
            stored.invariant_referenced,
            stored.high_fan_in,
        )
    }
}

/// Imports compared against a file's declared dependencies.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DependencyScan {
    #[serde(rename = "undeclared_imports")]
    pub undeclared: BTreeSet<String>,
    #[serde(rename = "stale_declared_deps")]
    pub stale: BTreeSet<String>,
    pub cross_scope_undeclared: BTreeSet<String>,
}

/// Scope flags for one modified file.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ScopeFlags {
    pub out_of_scope: bool,
    pub cross_scope: bool,
}
