//! Test-only helpers: document fixtures, a scratch git repository and an
//! in-memory change source.

use std::collections::BTreeMap;
use std::fs;
use std::path::Path;
use std::process::Command;

use anyhow::{Context, Result, anyhow};
use serde_json::Value;
use tempfile::TempDir;

use crate::io::git::ChangeSource;
use crate::io::layout::SklPaths;
use crate::model::{Knowledge, QueueEntry, Rfc, RfcStatus, StateRecord};

/// Ledger entry with the given dependencies and guarded invariants.
pub fn state_record(path: &str, scope: &str, deps: &[&str], invariants: &[&str]) -> StateRecord {
    StateRecord {
        path: path.to_string(),
        semantic_scope: scope.to_string(),
        dependencies: deps.iter().map(|d| d.to_string()).collect(),
        invariants_touched: invariants.iter().map(|i| i.to_string()).collect(),
        ..StateRecord::default()
    }
}

/// Knowledge whose queue holds `(proposal_id, status, branch)` entries.
pub fn knowledge_with_queue(entries: &[(&str, &str, Option<&str>)]) -> Knowledge {
    let mut knowledge = Knowledge::default();
    knowledge.queue = entries
        .iter()
        .map(|(id, status, branch)| {
            let entry = QueueEntry::default()
                .with("proposal_id", *id)
                .with("status", *status);
            match branch {
                Some(branch) => entry.with("branch", *branch),
                None => entry,
            }
        })
        .collect();
    knowledge
}

/// Open RFC raised by `proposal`, with no criteria and no deadline.
pub fn rfc(id: &str, proposal: &str) -> Rfc {
    Rfc {
        id: id.to_string(),
        status: RfcStatus::Open,
        triggering_proposal: Some(proposal.to_string()),
        merge_blocked_until_criteria_pass: false,
        acceptance_criteria: Vec::new(),
        human_response_deadline: None,
    }
}

/// Write `value` as pretty JSON to `path`, creating parent directories.
pub fn write_json(path: &Path, value: &Value) -> Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).with_context(|| format!("create {}", parent.display()))?;
    }
    let mut buf = serde_json::to_string_pretty(value)?;
    buf.push('\n');
    fs::write(path, buf).with_context(|| format!("write {}", path.display()))
}

/// Scratch git repository on branch `main` with a committer configured.
pub struct TestRepo {
    dir: TempDir,
}

impl TestRepo {
    pub fn new() -> Result<Self> {
        let dir = tempfile::tempdir().context("create tempdir")?;
        let repo = Self { dir };
        repo.git(&["init", "--quiet"])?;
        repo.git(&["symbolic-ref", "HEAD", "refs/heads/main"])?;
        repo.git(&["config", "user.email", "gate@example.com"])?;
        repo.git(&["config", "user.name", "Gate Tests"])?;
        repo.git(&["config", "commit.gpgsign", "false"])?;
        Ok(repo)
    }

    pub fn path(&self) -> &Path {
        self.dir.path()
    }

    pub fn paths(&self) -> SklPaths {
        SklPaths::new(self.path())
    }

    /// Write a repo-relative file, creating parent directories.
    pub fn write(&self, rel: &str, contents: &str) -> Result<()> {
        let path = self.path().join(rel);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).with_context(|| format!("create {}", parent.display()))?;
        }
        fs::write(&path, contents).with_context(|| format!("write {}", path.display()))
    }

    pub fn commit_all(&self, message: &str) -> Result<()> {
        self.git(&["add", "-A"])?;
        self.git(&["commit", "--quiet", "--allow-empty", "-m", message])
    }

    pub fn checkout_new_branch(&self, branch: &str) -> Result<()> {
        self.git(&["checkout", "--quiet", "-b", branch])
    }

    pub fn git(&self, args: &[&str]) -> Result<()> {
        let output = Command::new("git")
            .args(args)
            .current_dir(self.path())
            .output()
            .with_context(|| format!("spawn git {}", args.join(" ")))?;
        if !output.status.success() {
            return Err(anyhow!(
                "git {} failed: {}",
                args.join(" "),
                String::from_utf8_lossy(&output.stderr).trim()
            ));
        }
        Ok(())
    }
}

/// In-memory [`ChangeSource`] keyed by revision name.
#[derive(Debug, Clone, Default)]
pub struct FakeChangeSource {
    pub files: Vec<String>,
    /// Content per path at the base ref.
    pub base: BTreeMap<String, String>,
    /// Content per path at HEAD.
    pub head: BTreeMap<String, String>,
    /// `None` behaves like a detached HEAD.
    pub branch: Option<String>,
    pub diff_fails: bool,
}

impl FakeChangeSource {
    pub fn on_branch(branch: &str) -> Self {
        Self {
            branch: Some(branch.to_string()),
            ..Self::default()
        }
    }

    /// Record a modification of `path` from `base` (absent = new file) to `head`.
    pub fn change(mut self, path: &str, base: Option<&str>, head: &str) -> Self {
        self.files.push(path.to_string());
        if let Some(base) = base {
            self.base.insert(path.to_string(), base.to_string());
        }
        self.head.insert(path.to_string(), head.to_string());
        self
    }
}

impl ChangeSource for FakeChangeSource {
    fn modified_files(&self, base_ref: &str) -> Result<Vec<String>> {
        if self.diff_fails {
            return Err(anyhow!("git diff --name-only {base_ref}...HEAD failed: unknown revision"));
        }
        Ok(self.files.clone())
    }

    fn content_at(&self, rev: &str, path: &str) -> Result<Option<String>> {
        let side = if rev == "HEAD" { &self.head } else { &self.base };
        Ok(side.get(path).cloned())
    }

    fn current_branch(&self) -> Result<String> {
        self.branch.clone().ok_or_else(|| anyhow!("detached HEAD"))
    }
}
