//! Git adapter for the push gate.
//!
//! The gate only reads from git: the modified-file list, file contents at a
//! revision and the current branch. Every call runs under a timeout so a hung
//! git process cannot hang the push.

use std::path::{Path, PathBuf};
use std::process::Command;
use std::time::Duration;

use anyhow::{Result, anyhow};
use tracing::{debug, instrument, warn};

use super::process::{CommandOutput, run_command_with_timeout};

pub const GIT_TIMEOUT: Duration = Duration::from_secs(30);
pub const GIT_OUTPUT_LIMIT_BYTES: usize = 16 * 1024 * 1024;

/// Where the gate gets its change set from.
pub trait ChangeSource {
    /// Files changed between `base_ref` and HEAD, repo-relative.
    fn modified_files(&self, base_ref: &str) -> Result<Vec<String>>;

    /// Content of `path` at `rev`, or `None` if the file does not exist there.
    /// Non-UTF-8 content comes back empty.
    fn content_at(&self, rev: &str, path: &str) -> Result<Option<String>>;

    /// Name of the checked-out branch; an error on detached HEAD.
    fn current_branch(&self) -> Result<String>;
}

/// Wrapper for executing git commands in a working directory.
#[derive(Debug, Clone)]
pub struct Git {
    workdir: PathBuf,
}

impl Git {
    pub fn new(workdir: impl Into<PathBuf>) -> Self {
        Self {
            workdir: workdir.into(),
        }
    }

    pub fn workdir(&self) -> &Path {
        &self.workdir
    }

    fn run_capture(&self, args: &[&str]) -> Result<String> {
        let output = self.run_checked(args)?;
        Ok(String::from_utf8_lossy(&output.stdout).to_string())
    }

    fn run_checked(&self, args: &[&str]) -> Result<CommandOutput> {
        let output = self.run(args)?;
        if !output.is_complete_success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(anyhow!(
                "git {} failed: {}",
                args.join(" "),
                failure_detail(&output, stderr.trim())
            ));
        }
        Ok(output)
    }

    fn run(&self, args: &[&str]) -> Result<CommandOutput> {
        let mut cmd = Command::new("git");
        cmd.args(args).current_dir(&self.workdir);
        run_command_with_timeout(cmd, GIT_TIMEOUT, GIT_OUTPUT_LIMIT_BYTES)
            .map_err(|err| err.context(format!("run git {}", args.join(" "))))
    }
}

impl ChangeSource for Git {
    #[instrument(skip_all, fields(base_ref))]
    fn modified_files(&self, base_ref: &str) -> Result<Vec<String>> {
        let range = format!("{base_ref}...HEAD");
        let out = self.run_capture(&["diff", "--name-only", &range])?;
        let files: Vec<String> = out
            .lines()
            .map(str::trim)
            .filter(|line| !line.is_empty())
            .map(str::to_string)
            .collect();
        debug!(count = files.len(), "modified files");
        Ok(files)
    }

    fn content_at(&self, rev: &str, path: &str) -> Result<Option<String>> {
        let spec = format!("{rev}:{path}");
        let output = self.run(&["show", &spec])?;
        if output.timed_out || output.stdout_truncated > 0 {
            return Err(anyhow!("git show {spec} failed: {}", failure_detail(&output, "")));
        }
        if !output.status.success() {
            debug!(rev, path, "path absent at revision");
            return Ok(None);
        }
        match String::from_utf8(output.stdout) {
            Ok(text) => Ok(Some(text)),
            Err(_) => {
                debug!(rev, path, "non-UTF-8 content treated as empty");
                Ok(Some(String::new()))
            }
        }
    }

    #[instrument(skip_all)]
    fn current_branch(&self) -> Result<String> {
        let out = self.run_capture(&["rev-parse", "--abbrev-ref", "HEAD"])?;
        let name = out.trim().to_string();
        if name == "HEAD" {
            warn!("detached HEAD detected");
            return Err(anyhow!("detached HEAD"));
        }
        debug!(branch = %name, "current branch");
        Ok(name)
    }
}

fn failure_detail(output: &CommandOutput, stderr: &str) -> String {
    if output.timed_out {
        format!("timed out after {}s", GIT_TIMEOUT.as_secs())
    } else if output.stdout_truncated > 0 {
        format!("output exceeded {GIT_OUTPUT_LIMIT_BYTES} bytes")
    } else {
        stderr.to_string()
    }
}
