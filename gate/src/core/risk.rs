//! Risk signal engine: combines the tree differ, signature extractor and
//! pattern scanner with ledger lookups into one record per file.

use crate::core::differ::mechanical_only;
use crate::core::patterns::touched_sensitive_pattern;
use crate::core::path::same_path;
use crate::core::signature::public_api_signature_changed;
use crate::core::syntax::language_for_path;
use crate::core::types::{ChangeType, ChangeUnit, RiskSignals};
use crate::model::StateRecord;

/// Distinct dependents at which a file counts as high fan-in.
pub const HIGH_FAN_IN_THRESHOLD: usize = 3;

/// True if any record that guards invariants depends on `path`.
pub fn invariant_referenced(path: &str, records: &[StateRecord]) -> bool {
    records
        .iter()
        .filter(|record| !record.invariants_touched.is_empty())
        .any(|record| depends_on(record, path))
}

/// Number of distinct records that list `path` among their dependencies.
pub fn fan_in(path: &str, records: &[StateRecord]) -> usize {
    records
        .iter()
        .filter(|record| depends_on(record, path))
        .count()
}

pub fn high_fan_in(path: &str, records: &[StateRecord]) -> bool {
    fan_in(path, records) >= HIGH_FAN_IN_THRESHOLD
}

fn depends_on(record: &StateRecord, path: &str) -> bool {
    record.dependencies.iter().any(|dep| same_path(dep, path))
}

/// Build the risk record for one change unit.
///
/// Non-source files skip syntax analysis and take the non-source defaults
/// (not mechanical, no API change, no pattern touched); the ledger checks
/// still apply.
pub fn build_risk_signals(
    unit: &ChangeUnit,
    records: &[StateRecord],
    security_patterns: &[String],
) -> RiskSignals {
    let (mechanical, api_changed, touched) = match language_for_path(&unit.path) {
        Some(lang) => {
            let base = unit.base.as_deref();
            (
                mechanical_only(lang, base, &unit.head),
                public_api_signature_changed(lang, base, &unit.head),
                touched_sensitive_pattern(lang, &unit.head, security_patterns),
            )
        }
        None => (false, false, false),
    };
    RiskSignals::new(
        ChangeType::derive(mechanical, api_changed),
        api_changed,
        touched,
        invariant_referenced(&unit.path, records),
        high_fan_in(&unit.path, records),
    )
}
