//! One gate run for `pushgate check`.
//!
//! Order is fixed: scope checks over the whole change set, then the queue,
//! acceptance and scope-pause gates, then per-file risk and dependency
//! analysis, and finally one atomic append to the knowledge store. A gate
//! block ends the run before any proposal is built.

use std::collections::BTreeMap;

use anyhow::{Context, Result, anyhow};
use chrono::{DateTime, Utc};
use tracing::{debug, instrument, warn};

use crate::core::dependencies::{ScopeIndex, resolve_imports, validate_dependencies};
use crate::core::gates::{GateBlock, check_acceptance, check_queue, check_scope_pause};
use crate::core::path::normalize;
use crate::core::proposal::{Submission, build_proposal};
use crate::core::risk::build_risk_signals;
use crate::core::scope::scope_flags;
use crate::core::syntax::language_for_path;
use crate::core::types::{ChangeUnit, ScopeFlags};
use crate::io::config::{HookConfig, Mode, load_config};
use crate::io::documents::{load_agent_context, load_rfcs, load_scope_document};
use crate::io::git::ChangeSource;
use crate::io::knowledge_store::{load_knowledge, write_knowledge_atomic};
use crate::io::layout::SklPaths;
use crate::io::probe::RepoFiles;
use crate::model::{ExpectedImport, Knowledge, Proposal, QueueEntry, StateRecord};

/// Files flagged by the scope checks, in change-set order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ScopeReport {
    pub out_of_scope: Vec<String>,
    pub cross_scope: Vec<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Verdict {
    Blocked(GateBlock),
    /// Proposals appended to the queue by this run.
    Allowed(Vec<Proposal>),
}

#[derive(Debug, Clone, PartialEq)]
pub struct CheckOutcome {
    pub mode: Mode,
    pub scope: ScopeReport,
    pub verdict: Verdict,
}

impl CheckOutcome {
    pub fn is_blocked(&self) -> bool {
        matches!(self.verdict, Verdict::Blocked(_))
    }

    /// Operator-facing status lines, in the order they should be printed.
    pub fn report_lines(&self) -> Vec<String> {
        let mut lines = Vec::new();
        if !self.scope.out_of_scope.is_empty() {
            lines.push(format!(
                "pushgate: {} file(s) outside agent file_scope; proposals will be flagged out_of_scope:",
                self.scope.out_of_scope.len()
            ));
            lines.extend(self.scope.out_of_scope.iter().map(|p| format!("  - {p}")));
        }
        if !self.scope.cross_scope.is_empty() {
            lines.push(format!(
                "pushgate: {} file(s) cross semantic scope boundaries; proposals will be flagged cross_scope:",
                self.scope.cross_scope.len()
            ));
            lines.extend(self.scope.cross_scope.iter().map(|p| format!("  - {p}")));
        }
        match &self.verdict {
            Verdict::Blocked(block) => lines.push(format!("pushgate: push blocked. {block}")),
            Verdict::Allowed(proposals) => lines.push(summary_line(self.mode, proposals)),
        }
        lines
    }
}

fn summary_line(mode: Mode, proposals: &[Proposal]) -> String {
    match mode {
        Mode::Full => {
            let blocking = proposals
                .iter()
                .filter(|p| !p.blocking_reasons.is_empty())
                .count();
            format!(
                "pushgate: {} proposal(s) submitted to queue. {blocking} blocking flag(s).",
                proposals.len()
            )
        }
        Mode::Bootstrap => format!(
            "pushgate: {} activity record(s) logged.",
            proposals.len()
        ),
    }
}

/// Run every check for `agent_id` against the repository at `paths.root`.
///
/// Errors are setup or persistence failures. Gate blocks are not errors;
/// they come back as [`Verdict::Blocked`] with the knowledge store untouched.
#[instrument(skip_all, fields(agent_id))]
pub fn run_check(
    paths: &SklPaths,
    agent_id: &str,
    source: &dyn ChangeSource,
    now: DateTime<Utc>,
) -> Result<CheckOutcome> {
    if agent_id.trim().is_empty() {
        return Err(anyhow!(
            "agent identity is missing (set SKL_AGENT_ID or pass --agent)"
        ));
    }
    let config = load_config(&paths.config_path)?;
    let mut knowledge = load_knowledge(&paths.knowledge_path)?;
    let agent = load_agent_context(&paths.agent_context_path(agent_id))
        .context("load agent context")?;
    if agent.agent_id != agent_id {
        warn!(
            identity = agent_id,
            context = %agent.agent_id,
            "agent context names a different agent"
        );
    }
    let mode = config.mode;

    let scope_doc = load_scope_document(&paths.scope_definitions_path);
    let definition = scope_doc.as_ref().and_then(|doc| {
        let found = doc.scope(&agent.semantic_scope);
        if found.is_none() && !agent.semantic_scope.is_empty() {
            warn!(
                scope = %agent.semantic_scope,
                "agent scope has no definition; semantic scope check skipped"
            );
        }
        found
    });
    let expected: &[ExpectedImport] = scope_doc
        .as_ref()
        .map(|doc| doc.known_expected_cross_scope_imports.as_slice())
        .unwrap_or_default();

    let modified = match source.modified_files(&config.base_branch) {
        Ok(files) => files,
        Err(err) => {
            warn!(
                base = %config.base_branch,
                "could not list modified files; treating change set as empty: {err:#}"
            );
            Vec::new()
        }
    };

    // Checks 1 and 2.
    let semantic = match mode {
        Mode::Full => definition,
        Mode::Bootstrap => None,
    };
    let flags: Vec<ScopeFlags> = modified
        .iter()
        .map(|path| scope_flags(path, &agent.file_scope, semantic))
        .collect();
    let scope = ScopeReport {
        out_of_scope: flagged(&modified, &flags, |f| f.out_of_scope),
        cross_scope: flagged(&modified, &flags, |f| f.cross_scope),
    };

    let branch = match source.current_branch() {
        Ok(branch) => Some(branch),
        Err(err) => {
            warn!("could not resolve current branch; acceptance gate skipped: {err:#}");
            None
        }
    };

    let gates = run_gates(
        paths,
        &knowledge,
        &config,
        branch.as_deref(),
        &agent.semantic_scope,
        now,
    );
    if let Err(block) = gates {
        debug!(gate = block.gate(), "push blocked");
        return Ok(CheckOutcome {
            mode,
            scope,
            verdict: Verdict::Blocked(block),
        });
    }

    let probe = RepoFiles::new(&paths.root);
    let index = ScopeIndex::from_records(knowledge.state());
    let by_path: BTreeMap<String, &StateRecord> = knowledge
        .state()
        .iter()
        .map(|record| (normalize(&record.path), record))
        .collect();
    let submission = Submission {
        agent: &agent,
        branch: branch.as_deref(),
        now,
        queue_len: knowledge.queue.len(),
    };

    let mut proposals = Vec::with_capacity(modified.len());
    for (batch_index, (path, file_flags)) in modified.iter().zip(&flags).enumerate() {
        let unit = load_unit(source, &config.base_branch, path);
        let risk = build_risk_signals(
            &unit,
            knowledge.state(),
            &knowledge.invariants().security_patterns,
        );
        let resolved = match language_for_path(path) {
            Some(lang) if !unit.head.is_empty() => resolve_imports(lang, &unit.head, &probe),
            _ => Default::default(),
        };
        let own = by_path.get(&normalize(path)).copied();
        let scan =
            validate_dependencies(&resolved, own, &index, expected, &agent.semantic_scope);
        proposals.push(build_proposal(
            &submission,
            batch_index,
            path,
            *file_flags,
            risk,
            scan,
        ));
    }

    if !proposals.is_empty() {
        for proposal in &proposals {
            let entry = QueueEntry::try_from(proposal).context("encode proposal")?;
            knowledge.queue.push(entry);
        }
        write_knowledge_atomic(&paths.knowledge_path, &knowledge)
            .context("persist knowledge store")?;
    }

    Ok(CheckOutcome {
        mode,
        scope,
        verdict: Verdict::Allowed(proposals),
    })
}

fn run_gates(
    paths: &SklPaths,
    knowledge: &Knowledge,
    config: &HookConfig,
    branch: Option<&str>,
    agent_scope: &str,
    now: DateTime<Utc>,
) -> Result<(), GateBlock> {
    check_queue(knowledge, config.effective_queue_max())?;
    if config.mode == Mode::Bootstrap {
        return Ok(());
    }
    let rfcs = load_rfcs(&paths.rfcs_dir);
    if let Some(branch) = branch {
        check_acceptance(&rfcs, knowledge, branch)?;
    }
    check_scope_pause(&rfcs, knowledge, agent_scope, now)
}

/// Fetch both revisions of `path`. Non-source files are not read: they skip
/// syntax analysis entirely.
fn load_unit(source: &dyn ChangeSource, base_ref: &str, path: &str) -> ChangeUnit {
    if language_for_path(path).is_none() {
        return ChangeUnit {
            path: path.to_string(),
            base: None,
            head: String::new(),
        };
    }
    let base = source.content_at(base_ref, path).unwrap_or_else(|err| {
        warn!(path, "could not read base revision; treating as new file: {err:#}");
        None
    });
    let head = source
        .content_at("HEAD", path)
        .unwrap_or_else(|err| {
            warn!(path, "could not read head revision; treating as empty: {err:#}");
            None
        })
        .unwrap_or_default();
    ChangeUnit {
        path: path.to_string(),
        base,
        head,
    }
}

fn flagged(
    paths: &[String],
    flags: &[ScopeFlags],
    pick: impl Fn(&ScopeFlags) -> bool,
) -> Vec<String> {
    paths
        .iter()
        .zip(flags)
        .filter(|(_, f)| pick(f))
        .map(|(path, _)| path.clone())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::types::ChangeType;

    fn proposal(reasons: &[&str]) -> Proposal {
        serde_json::from_value(serde_json::json!({
            "proposal_id": "p",
            "agent_id": "a",
            "path": "x.py",
            "semantic_scope": "s",
            "status": "pending",
            "submitted_at": "2025-01-01T00:00:00Z",
            "out_of_scope": false,
            "cross_scope_flag": false,
            "risk_signals": crate::core::types::RiskSignals::new(ChangeType::Behavioral, false, false, false, false),
            "dependency_scan": {"undeclared_imports": [], "stale_declared_deps": [], "cross_scope_undeclared": []},
            "classification_verification": {
                "agent_classification": null,
                "verifier_classification": null,
                "agreement": null,
                "stage1_override": false
            },
            "blocking_reasons": reasons
        }))
        .expect("proposal")
    }

    #[test]
    fn summary_counts_blocking_flags_in_full_mode() {
        let outcome = CheckOutcome {
            mode: Mode::Full,
            scope: ScopeReport::default(),
            verdict: Verdict::Allowed(vec![
                proposal(&[]),
                proposal(&["cross_scope_undeclared_dependency"]),
            ]),
        };
        assert_eq!(
            outcome.report_lines(),
            vec!["pushgate: 2 proposal(s) submitted to queue. 1 blocking flag(s).".to_string()]
        );
    }

    #[test]
    fn bootstrap_summary_logs_activity() {
        let outcome = CheckOutcome {
            mode: Mode::Bootstrap,
            scope: ScopeReport::default(),
            verdict: Verdict::Allowed(vec![proposal(&[])]),
        };
        assert_eq!(
            outcome.report_lines(),
            vec!["pushgate: 1 activity record(s) logged.".to_string()]
        );
    }

    #[test]
    fn scope_listing_precedes_block_message() {
        let outcome = CheckOutcome {
            mode: Mode::Full,
            scope: ScopeReport {
                out_of_scope: vec!["core/db.py".to_string()],
                cross_scope: Vec::new(),
            },
            verdict: Verdict::Blocked(GateBlock::QueueFull { pending: 2, max: 2 }),
        };
        let lines = outcome.report_lines();
        assert_eq!(lines.len(), 3);
        assert!(lines[0].contains("1 file(s) outside agent file_scope"));
        assert_eq!(lines[1], "  - core/db.py");
        assert!(lines[2].starts_with("pushgate: push blocked. Queue is full (2/2"));
        assert!(outcome.is_blocked());
    }
}
