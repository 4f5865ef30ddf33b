//! Push-halting gates.
//!
//! Each gate inspects the knowledge store (and RFCs where relevant) and
//! either passes or returns a [`GateBlock`] describing why the push must stop.
//! Gates never touch the filesystem; callers hand them loaded documents.

pub mod acceptance;
pub mod queue;
pub mod scope_pause;

use std::fmt;

use crate::model::Criterion;

pub use acceptance::check_acceptance;
pub use queue::check_queue;
pub use scope_pause::{check_scope_pause, parse_deadline};

/// Why a gate halted the push.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GateBlock {
    QueueFull {
        pending: usize,
        max: usize,
    },
    UnmetCriteria {
        rfc_id: String,
        failing: Vec<Criterion>,
    },
    ScopePaused {
        rfc_id: String,
        /// Deadline exactly as written in the RFC.
        deadline: String,
        scope: String,
    },
}

impl GateBlock {
    /// Short stable name of the gate that produced this block.
    pub fn gate(&self) -> &'static str {
        match self {
            GateBlock::QueueFull { .. } => "queue",
            GateBlock::UnmetCriteria { .. } => "acceptance",
            GateBlock::ScopePaused { .. } => "scope_pause",
        }
    }
}

impl fmt::Display for GateBlock {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            GateBlock::QueueFull { pending, max } => write!(
                f,
                "Queue is full ({pending}/{max} pending proposals). \
                 Review pending proposals before pushing again."
            ),
            GateBlock::UnmetCriteria { rfc_id, failing } => {
                write!(f, "RFC {rfc_id} has unmet acceptance criteria:")?;
                for criterion in failing {
                    write!(
                        f,
                        "\n  - [{}] {} (check_type: {}, reference: {})",
                        criterion.ac_id,
                        criterion.description,
                        criterion.check_type,
                        criterion.check_reference
                    )?;
                }
                Ok(())
            }
            GateBlock::ScopePaused {
                rfc_id,
                deadline,
                scope,
            } => write!(
                f,
                "RFC {rfc_id} response deadline passed {deadline}. \
                 Semantic scope '{scope}' is paused until this RFC is resolved."
            ),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::CriterionStatus;

    #[test]
    fn queue_full_names_count_and_limit() {
        let block = GateBlock::QueueFull { pending: 15, max: 15 };
        assert!(block.to_string().contains("15/15 pending proposals"));
        assert_eq!(block.gate(), "queue");
    }

    #[test]
    fn unmet_criteria_lists_each_failing_criterion() {
        let block = GateBlock::UnmetCriteria {
            rfc_id: "RFC-007".to_string(),
            failing: vec![Criterion {
                ac_id: "AC-2".to_string(),
                description: "Login returns 401 on bad token".to_string(),
                check_type: "test".to_string(),
                check_reference: "tests/test_auth.py::test_401".to_string(),
                status: CriterionStatus::Pending,
            }],
        };
        assert_eq!(
            block.to_string(),
            "RFC RFC-007 has unmet acceptance criteria:\n  \
             - [AC-2] Login returns 401 on bad token \
             (check_type: test, reference: tests/test_auth.py::test_401)"
        );
    }

    #[test]
    fn scope_pause_quotes_raw_deadline() {
        let block = GateBlock::ScopePaused {
            rfc_id: "RFC-003".to_string(),
            deadline: "2024-01-01T00:00:00Z".to_string(),
            scope: "auth".to_string(),
        };
        let text = block.to_string();
        assert!(text.contains("RFC RFC-003"));
        assert!(text.contains("2024-01-01T00:00:00Z"));
        assert!(text.contains("'auth'"));
    }
}
