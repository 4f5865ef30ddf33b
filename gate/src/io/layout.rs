//! Repository discovery and the canonical `.skl/` document locations.

use std::path::{Path, PathBuf};

use anyhow::{Result, anyhow};

/// All canonical paths within `.skl/` for a repository root.
#[derive(Debug, Clone)]
pub struct SklPaths {
    pub root: PathBuf,
    pub skl_dir: PathBuf,
    pub config_path: PathBuf,
    pub knowledge_path: PathBuf,
    pub scope_definitions_path: PathBuf,
    pub scratch_dir: PathBuf,
    pub rfcs_dir: PathBuf,
}

impl SklPaths {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        let root = root.into();
        let skl_dir = root.join(".skl");
        Self {
            root: root.clone(),
            skl_dir: skl_dir.clone(),
            config_path: skl_dir.join("hook_config.json"),
            knowledge_path: skl_dir.join("knowledge.json"),
            scope_definitions_path: skl_dir.join("scope_definitions.json"),
            scratch_dir: skl_dir.join("scratch"),
            rfcs_dir: skl_dir.join("rfcs"),
        }
    }

    /// Per-agent context document.
    pub fn agent_context_path(&self, agent_id: &str) -> PathBuf {
        self.scratch_dir.join(format!("{agent_id}_context.json"))
    }
}

/// Walk up from `start` to the first directory containing `.git`.
pub fn find_repo_root(start: &Path) -> Result<PathBuf> {
    start
        .ancestors()
        .find(|dir| dir.join(".git").exists())
        .map(Path::to_path_buf)
        .ok_or_else(|| anyhow!("not inside a git repository: {}", start.display()))
}
