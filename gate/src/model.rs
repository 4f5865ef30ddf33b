//! Document schemas for the `.skl/` project state.
//!
//! The knowledge store is shared with other tools. This crate only ever
//! appends to its queue, so [`Knowledge`] keeps the document as loaded and
//! writes the queue back into it in place: key order, unknown sections and
//! explicit nulls survive a load/save cycle.

use std::collections::BTreeMap;

use serde::de::{self, DeserializeOwned, Deserializer};
use serde::ser::{self, Serializer};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::core::types::{DependencyScan, RiskSignals};

/// Status value of a queue entry awaiting review.
pub const PENDING: &str = "pending";

/// The knowledge store: proposal queue, per-file ledger and invariants.
///
/// `state` and `invariants` are read-only views of the loaded document.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Knowledge {
    pub queue: Vec<QueueEntry>,
    state: Vec<StateRecord>,
    invariants: Invariants,
    document: Map<String, Value>,
}

impl Knowledge {
    pub fn state(&self) -> &[StateRecord] {
        &self.state
    }

    pub fn invariants(&self) -> &Invariants {
        &self.invariants
    }

    /// Number of queue entries still awaiting review.
    pub fn pending_count(&self) -> usize {
        self.queue
            .iter()
            .filter(|entry| entry.status() == Some(PENDING))
            .count()
    }

    /// Index of queue entries by proposal id (later duplicates win).
    pub fn queue_by_id(&self) -> BTreeMap<&str, &QueueEntry> {
        self.queue
            .iter()
            .filter_map(|entry| entry.proposal_id().map(|id| (id, entry)))
            .collect()
    }

    fn from_document(document: Map<String, Value>) -> Result<Self, serde_json::Error> {
        Ok(Knowledge {
            queue: section(&document, "queue")?,
            state: section(&document, "state")?,
            invariants: section(&document, "invariants")?,
            document,
        })
    }
}

fn section<T: DeserializeOwned + Default>(
    document: &Map<String, Value>,
    key: &str,
) -> Result<T, serde_json::Error> {
    match document.get(key) {
        Some(value) => T::deserialize(value),
        None => Ok(T::default()),
    }
}

impl<'de> Deserialize<'de> for Knowledge {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let document = Map::deserialize(deserializer)?;
        Knowledge::from_document(document).map_err(<D::Error as de::Error>::custom)
    }
}

impl Serialize for Knowledge {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut document = self.document.clone();
        let queue =
            serde_json::to_value(&self.queue).map_err(<S::Error as ser::Error>::custom)?;
        // Replacing an existing key keeps its position.
        document.insert("queue".to_string(), queue);
        document.serialize(serializer)
    }
}

/// A proposal as stored in the queue, kept exactly as written.
///
/// Only the fields the gates read have accessors; a field that is missing,
/// null or not a string reads as `None`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct QueueEntry {
    fields: Map<String, Value>,
}

impl QueueEntry {
    /// Set `key`, keeping its position if already present.
    pub fn with(mut self, key: &str, value: impl Into<Value>) -> Self {
        self.fields.insert(key.to_string(), value.into());
        self
    }

    pub fn proposal_id(&self) -> Option<&str> {
        self.text("proposal_id")
    }

    pub fn status(&self) -> Option<&str> {
        self.text("status")
    }

    pub fn branch(&self) -> Option<&str> {
        self.text("branch")
    }

    pub fn semantic_scope(&self) -> Option<&str> {
        self.text("semantic_scope")
    }

    pub fn fields(&self) -> &Map<String, Value> {
        &self.fields
    }

    fn text(&self, key: &str) -> Option<&str> {
        self.fields.get(key).and_then(Value::as_str)
    }
}

impl From<Map<String, Value>> for QueueEntry {
    fn from(fields: Map<String, Value>) -> Self {
        Self { fields }
    }
}

/// Per-file ledger entry owned by the knowledge store.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct StateRecord {
    #[serde(default)]
    pub path: String,
    #[serde(default)]
    pub semantic_scope: String,
    #[serde(default)]
    pub dependencies: Vec<String>,
    #[serde(default)]
    pub invariants_touched: Vec<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Invariants {
    #[serde(default)]
    pub security_patterns: Vec<String>,
}

/// Who is pushing and what they are allowed to touch.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AgentContext {
    #[serde(default)]
    pub agent_id: String,
    #[serde(default)]
    pub semantic_scope: String,
    /// Empty means no file-level restriction.
    #[serde(default)]
    pub file_scope: Vec<String>,
}

/// `scope_definitions.json`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScopeDocument {
    #[serde(default)]
    pub scope_definitions: ScopeTable,
    #[serde(default)]
    pub known_expected_cross_scope_imports: Vec<ExpectedImport>,
}

impl ScopeDocument {
    pub fn scope(&self, name: &str) -> Option<&ScopeDefinition> {
        self.scope_definitions.scopes.get(name)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScopeTable {
    #[serde(default)]
    pub scopes: BTreeMap<String, ScopeDefinition>,
}

/// Path boundaries of one semantic scope.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScopeDefinition {
    #[serde(default)]
    pub allowed_paths: Vec<String>,
    #[serde(default)]
    pub allowed_path_prefixes: Vec<String>,
    #[serde(default)]
    pub forbidden_path_prefixes: Vec<String>,
}

/// A cross-scope import that needs no declaration.
///
/// Entries ending in a separator match by prefix, all others exactly.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ExpectedImport {
    Path(String),
    Entry { imported_path: String },
}

impl ExpectedImport {
    pub fn path(&self) -> &str {
        match self {
            ExpectedImport::Path(path) => path,
            ExpectedImport::Entry { imported_path } => imported_path,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RfcStatus {
    Open,
    Resolved,
    #[serde(other)]
    Other,
}

/// A request-for-change record from `.skl/rfcs/`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Rfc {
    /// Filled from the file name when the document has no id.
    #[serde(default)]
    pub id: String,
    #[serde(default = "unknown_rfc_status")]
    pub status: RfcStatus,
    #[serde(default)]
    pub triggering_proposal: Option<String>,
    #[serde(default)]
    pub merge_blocked_until_criteria_pass: bool,
    #[serde(default)]
    pub acceptance_criteria: Vec<Criterion>,
    /// Kept raw so block messages can quote it verbatim.
    #[serde(default)]
    pub human_response_deadline: Option<String>,
}

impl Rfc {
    pub fn is_open(&self) -> bool {
        self.status == RfcStatus::Open
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CriterionStatus {
    Pending,
    Passed,
    Failed,
    #[serde(other)]
    Other,
}

/// One acceptance criterion of an RFC.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Criterion {
    #[serde(default = "unknown_ac_id")]
    pub ac_id: String,
    #[serde(default = "missing_description")]
    pub description: String,
    #[serde(default)]
    pub check_type: String,
    #[serde(default)]
    pub check_reference: String,
    #[serde(default = "pending_criterion")]
    pub status: CriterionStatus,
}

fn unknown_rfc_status() -> RfcStatus {
    RfcStatus::Other
}

fn unknown_ac_id() -> String {
    "?".to_string()
}

fn missing_description() -> String {
    "(no description)".to_string()
}

fn pending_criterion() -> CriterionStatus {
    CriterionStatus::Pending
}

/// The engine's per-file output record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Proposal {
    pub proposal_id: String,
    pub agent_id: String,
    pub path: String,
    pub semantic_scope: String,
    pub status: String,
    pub submitted_at: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub branch: Option<String>,
    pub out_of_scope: bool,
    pub cross_scope_flag: bool,
    pub risk_signals: RiskSignals,
    pub dependency_scan: DependencyScan,
    pub classification_verification: ClassificationVerification,
    pub blocking_reasons: Vec<String>,
}

/// Reviewer-owned classification block; always starts empty.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClassificationVerification {
    pub agent_classification: Option<String>,
    pub verifier_classification: Option<String>,
    pub agreement: Option<bool>,
    pub stage1_override: bool,
}

impl TryFrom<&Proposal> for QueueEntry {
    type Error = serde_json::Error;

    fn try_from(proposal: &Proposal) -> Result<Self, Self::Error> {
        serde_json::from_value::<Map<String, Value>>(serde_json::to_value(proposal)?)
            .map(QueueEntry::from)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn knowledge_round_trip_keeps_unknown_fields() {
        let raw = json!({
            "queue": [{"proposal_id": "p1", "status": "pending", "reviewer": "r"}],
            "state": [{
                "path": "a.py",
                "semantic_scope": "core",
                "dependencies": ["b.py"],
                "invariants_touched": [],
                "owner": "x"
            }],
            "invariants": {"security_patterns": ["verify_token"], "tech_stack": ["py"]},
            "project": {"name": "demo"}
        });
        let knowledge: Knowledge = serde_json::from_value(raw.clone()).expect("parse");
        assert_eq!(knowledge.pending_count(), 1);
        assert_eq!(knowledge.invariants().security_patterns, vec!["verify_token"]);
        let back = serde_json::to_value(&knowledge).expect("serialize");
        assert_eq!(back, raw);
    }

    #[test]
    fn write_back_keeps_key_order_and_nulls() {
        let raw = r#"{"project":{"name":"demo"},"queue":[{"status":"pending","branch":null,"proposal_id":"p1"}],"state":[{"owner":"x","path":"a.py"}]}"#;
        let mut knowledge: Knowledge = serde_json::from_str(raw).expect("parse");
        assert_eq!(knowledge.queue[0].branch(), None);
        assert_eq!(serde_json::to_string(&knowledge).expect("serialize"), raw);

        knowledge
            .queue
            .push(QueueEntry::default().with("proposal_id", "p2"));
        assert_eq!(
            serde_json::to_string(&knowledge).expect("serialize"),
            r#"{"project":{"name":"demo"},"queue":[{"status":"pending","branch":null,"proposal_id":"p1"},{"proposal_id":"p2"}],"state":[{"owner":"x","path":"a.py"}]}"#
        );
    }

    #[test]
    fn missing_sections_default_to_empty() {
        let knowledge: Knowledge = serde_json::from_value(json!({})).expect("parse");
        assert!(knowledge.queue.is_empty());
        assert!(knowledge.state().is_empty());
        assert!(knowledge.invariants().security_patterns.is_empty());
    }

    #[test]
    fn queue_index_uses_last_duplicate() {
        let knowledge: Knowledge = serde_json::from_value(json!({
            "queue": [
                {"proposal_id": "p1", "branch": "old"},
                {"status": "pending"},
                {"proposal_id": "p1", "branch": "new"}
            ]
        }))
        .expect("parse");
        let index = knowledge.queue_by_id();
        assert_eq!(index.len(), 1);
        assert_eq!(index["p1"].branch(), Some("new"));
    }

    #[test]
    fn expected_imports_accept_both_shapes() {
        let doc: ScopeDocument = serde_json::from_value(json!({
            "scope_definitions": {"scopes": {"api": {"allowed_path_prefixes": ["api/"]}}},
            "known_expected_cross_scope_imports": ["shared/", {"imported_path": "core/db.py"}]
        }))
        .expect("parse");
        let paths: Vec<&str> = doc
            .known_expected_cross_scope_imports
            .iter()
            .map(ExpectedImport::path)
            .collect();
        assert_eq!(paths, vec!["shared/", "core/db.py"]);
        assert_eq!(
            doc.scope("api").map(|s| s.allowed_path_prefixes.clone()),
            Some(vec!["api/".to_string()])
        );
    }

    #[test]
    fn rfc_defaults_and_unknown_status() {
        let rfc: Rfc = serde_json::from_value(json!({
            "status": "escalated",
            "acceptance_criteria": [{"status": "passed"}, {"ac_id": "AC-2"}]
        }))
        .expect("parse");
        assert_eq!(rfc.status, RfcStatus::Other);
        assert!(!rfc.merge_blocked_until_criteria_pass);
        assert_eq!(rfc.acceptance_criteria[0].ac_id, "?");
        assert_eq!(rfc.acceptance_criteria[1].description, "(no description)");
        assert_eq!(rfc.acceptance_criteria[1].status, CriterionStatus::Pending);
    }
}
