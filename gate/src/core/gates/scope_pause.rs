//! Scope-pause gate: an RFC left unanswered past its deadline freezes the
//! semantic scope it was raised against.

use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use tracing::warn;

use super::GateBlock;
use crate::model::{Knowledge, Rfc};

const NAIVE_FORMATS: &[&str] = &[
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%dT%H:%M",
];

/// Parse an RFC deadline into UTC.
///
/// Accepts RFC 3339 with `Z` or an offset, an offset-less timestamp (taken as
/// UTC) and a bare date (midnight UTC).
pub fn parse_deadline(raw: &str) -> Option<DateTime<Utc>> {
    let raw = raw.trim();
    if let Ok(parsed) = DateTime::parse_from_rfc3339(raw) {
        return Some(parsed.with_timezone(&Utc));
    }
    if let Some(naive) = NAIVE_FORMATS
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(raw, fmt).ok())
    {
        return Some(naive.and_utc());
    }
    NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .ok()
        .and_then(|date| date.and_hms_opt(0, 0, 0))
        .map(|naive| naive.and_utc())
}

/// Block on the first open RFC whose deadline is at or before `now` and whose
/// triggering proposal belongs to `agent_scope`.
pub fn check_scope_pause(
    rfcs: &[Rfc],
    knowledge: &Knowledge,
    agent_scope: &str,
    now: DateTime<Utc>,
) -> Result<(), GateBlock> {
    let queue = knowledge.queue_by_id();
    for rfc in rfcs {
        if !rfc.is_open() {
            continue;
        }
        let Some(raw) = rfc.human_response_deadline.as_deref() else {
            continue;
        };
        let Some(deadline) = parse_deadline(raw) else {
            warn!(
                rfc = %rfc.id,
                deadline = raw,
                "unparseable human_response_deadline; skipping RFC"
            );
            continue;
        };
        if deadline > now {
            continue;
        }
        let Some(entry) = rfc
            .triggering_proposal
            .as_deref()
            .and_then(|id| queue.get(id))
        else {
            continue;
        };
        if entry.semantic_scope() == Some(agent_scope) {
            return Err(GateBlock::ScopePaused {
                rfc_id: rfc.id.clone(),
                deadline: raw.to_string(),
                scope: agent_scope.to_string(),
            });
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use chrono::TimeZone;

    use super::*;
    use crate::model::{QueueEntry, RfcStatus};
    use crate::test_support::rfc;

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 6, 1, 12, 0, 0).single().expect("valid time")
    }

    fn knowledge() -> Knowledge {
        let mut knowledge = Knowledge::default();
        knowledge.queue.push(
            QueueEntry::default()
                .with("proposal_id", "prop_9")
                .with("status", "pending")
                .with("semantic_scope", "auth"),
        );
        knowledge
    }

    fn with_deadline(deadline: &str, proposal: &str) -> Rfc {
        Rfc {
            human_response_deadline: Some(deadline.to_string()),
            ..rfc("RFC-010", proposal)
        }
    }

    #[test]
    fn lapsed_deadline_in_agent_scope_blocks() {
        let block = check_scope_pause(
            &[with_deadline("2025-05-01T00:00:00Z", "prop_9")],
            &knowledge(),
            "auth",
            now(),
        )
        .expect_err("blocked");
        assert_eq!(
            block,
            GateBlock::ScopePaused {
                rfc_id: "RFC-010".to_string(),
                deadline: "2025-05-01T00:00:00Z".to_string(),
                scope: "auth".to_string(),
            }
        );
    }

    #[test]
    fn other_scope_future_deadline_or_missing_proposal_pass() {
        let lapsed = with_deadline("2025-05-01T00:00:00Z", "prop_9");
        assert_eq!(check_scope_pause(&[lapsed], &knowledge(), "billing", now()), Ok(()));

        let future = with_deadline("2025-07-01T00:00:00Z", "prop_9");
        assert_eq!(check_scope_pause(&[future], &knowledge(), "auth", now()), Ok(()));

        let orphan = with_deadline("2025-05-01T00:00:00Z", "prop_missing");
        assert_eq!(check_scope_pause(&[orphan], &knowledge(), "auth", now()), Ok(()));
    }

    #[test]
    fn closed_or_deadline_free_rfcs_pass() {
        let resolved = Rfc {
            status: RfcStatus::Resolved,
            ..with_deadline("2025-05-01T00:00:00Z", "prop_9")
        };
        let no_deadline = rfc("RFC-011", "prop_9");
        assert_eq!(
            check_scope_pause(&[resolved, no_deadline], &knowledge(), "auth", now()),
            Ok(())
        );
    }

    #[test]
    fn deadline_equal_to_now_has_passed() {
        let exact = with_deadline("2025-06-01T12:00:00Z", "prop_9");
        assert!(check_scope_pause(&[exact], &knowledge(), "auth", now()).is_err());
    }

    #[test]
    fn garbage_deadline_is_skipped() {
        let garbage = with_deadline("next tuesday", "prop_9");
        assert_eq!(check_scope_pause(&[garbage], &knowledge(), "auth", now()), Ok(()));
    }

    #[test]
    fn deadline_formats() {
        let expected = Utc.with_ymd_and_hms(2025, 5, 1, 8, 30, 0).single();
        assert_eq!(parse_deadline("2025-05-01T08:30:00Z"), expected);
        assert_eq!(parse_deadline("2025-05-01T10:30:00+02:00"), expected);
        assert_eq!(parse_deadline("2025-05-01T08:30:00"), expected);
        assert_eq!(parse_deadline("2025-05-01 08:30:00"), expected);
        assert_eq!(
            parse_deadline("2025-05-01"),
            Utc.with_ymd_and_hms(2025, 5, 1, 0, 0, 0).single()
        );
        assert_eq!(parse_deadline("01/05/2025"), None);
    }
}
