//! Queue gate: caps the number of pending proposals.

use super::GateBlock;
use crate::model::Knowledge;

/// Block once the pending count reaches `max`.
pub fn check_queue(knowledge: &Knowledge, max: usize) -> Result<(), GateBlock> {
    let pending = knowledge.pending_count();
    if pending >= max {
        return Err(GateBlock::QueueFull { pending, max });
    }
    Ok(())
}
