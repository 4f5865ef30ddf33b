//! Proposal builder.

use chrono::{DateTime, Utc};

use crate::core::types::{DependencyScan, RiskSignals, ScopeFlags};
use crate::model::{AgentContext, ClassificationVerification, PENDING, Proposal};

/// Blocking reason attached when a file imports undeclared code from another
/// agent's scope.
pub const CROSS_SCOPE_TAG: &str = "cross_scope_undeclared_dependency";

/// Run-wide fields shared by every proposal of one push.
#[derive(Debug, Clone, Copy)]
pub struct Submission<'a> {
    pub agent: &'a AgentContext,
    pub branch: Option<&'a str>,
    pub now: DateTime<Utc>,
    /// Queue length before this run appended anything.
    pub queue_len: usize,
}

/// Deterministic id: `prop_<YYYYMMDD>_<agent>_<seq:03>`.
pub fn proposal_id(now: DateTime<Utc>, agent_id: &str, seq: usize) -> String {
    format!("prop_{}_{agent_id}_{seq:03}", now.format("%Y%m%d"))
}

/// Assemble the proposal for the file at `batch_index` in this run.
pub fn build_proposal(
    submission: &Submission<'_>,
    batch_index: usize,
    path: &str,
    flags: ScopeFlags,
    risk_signals: RiskSignals,
    dependency_scan: DependencyScan,
) -> Proposal {
    let seq = submission.queue_len + batch_index + 1;
    let mut blocking_reasons = Vec::new();
    if !dependency_scan.cross_scope_undeclared.is_empty() {
        blocking_reasons.push(CROSS_SCOPE_TAG.to_string());
    }
    Proposal {
        proposal_id: proposal_id(submission.now, &submission.agent.agent_id, seq),
        agent_id: submission.agent.agent_id.clone(),
        path: path.to_string(),
        semantic_scope: submission.agent.semantic_scope.clone(),
        status: PENDING.to_string(),
        submitted_at: submission.now.format("%Y-%m-%dT%H:%M:%SZ").to_string(),
        branch: submission.branch.map(str::to_string),
        out_of_scope: flags.out_of_scope,
        cross_scope_flag: flags.cross_scope,
        risk_signals,
        dependency_scan,
        classification_verification: ClassificationVerification::default(),
        blocking_reasons,
    }
}
