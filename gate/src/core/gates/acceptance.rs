//! Acceptance gate: holds a branch back while its RFC has unmet criteria.

use super::GateBlock;
use crate::model::{CriterionStatus, Knowledge, Rfc};

/// Block on the first open, merge-blocking RFC whose triggering proposal was
/// pushed from `branch` and which still has criteria that have not passed.
///
/// RFCs whose triggering proposal is missing from the queue, or was recorded
/// without a branch, are skipped.
pub fn check_acceptance(
    rfcs: &[Rfc],
    knowledge: &Knowledge,
    branch: &str,
) -> Result<(), GateBlock> {
    let queue = knowledge.queue_by_id();
    for rfc in rfcs {
        if !rfc.is_open() || !rfc.merge_blocked_until_criteria_pass {
            continue;
        }
        let Some(entry) = rfc
            .triggering_proposal
            .as_deref()
            .and_then(|id| queue.get(id))
        else {
            continue;
        };
        if entry.branch() != Some(branch) {
            continue;
        }
        let failing: Vec<_> = rfc
            .acceptance_criteria
            .iter()
            .filter(|criterion| criterion.status != CriterionStatus::Passed)
            .cloned()
            .collect();
        if !failing.is_empty() {
            return Err(GateBlock::UnmetCriteria {
                rfc_id: rfc.id.clone(),
                failing,
            });
        }
    }
    Ok(())
}
