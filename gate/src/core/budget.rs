//! Wall-clock budget for bounded tree comparison.

use std::fmt;
use std::time::{Duration, Instant};

/// Time allowed for one mechanical-only comparison (parse, strip, compare).
pub const TREE_DIFF_BUDGET: Duration = Duration::from_millis(500);

/// A deadline checked cooperatively by long-running tree walks.
#[derive(Debug, Clone, Copy)]
pub struct Budget {
    started: Instant,
    limit: Duration,
}

/// The budget ran out before the work completed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BudgetExceeded {
    pub elapsed: Duration,
    pub limit: Duration,
}

impl fmt::Display for BudgetExceeded {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "exceeded {}ms budget ({}ms elapsed)",
            self.limit.as_millis(),
            self.elapsed.as_millis()
        )
    }
}

impl Budget {
    pub fn start(limit: Duration) -> Self {
        Self {
            started: Instant::now(),
            limit,
        }
    }

    /// A budget that never runs out (used where no deadline applies).
    pub fn unbounded() -> Self {
        Self::start(Duration::MAX)
    }

    pub fn elapsed(&self) -> Duration {
        self.started.elapsed()
    }

    /// Fail once the elapsed time is past the limit.
    pub fn check(&self) -> Result<(), BudgetExceeded> {
        let elapsed = self.elapsed();
        if elapsed > self.limit {
            return Err(BudgetExceeded {
                elapsed,
                limit: self.limit,
            });
        }
        Ok(())
    }
}
