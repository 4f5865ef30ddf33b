//! Hook configuration stored under `.skl/hook_config.json`.

use std::fs;
use std::path::Path;

use anyhow::{Context, Result, anyhow};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

/// Queue ceiling while the project is bootstrapping.
pub const BOOTSTRAP_QUEUE_MAX: usize = 50;

/// Policy strictness.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
pub enum Mode {
    /// Every check and gate runs.
    #[default]
    #[serde(rename = "full")]
    Full,
    /// Activity logging only: semantic scope, acceptance and scope-pause
    /// checks are skipped and the queue ceiling is relaxed.
    #[serde(rename = "phase_0", alias = "bootstrap")]
    Bootstrap,
}

/// Hook configuration (JSON).
///
/// Missing fields default to the values the hook ships with.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct HookConfig {
    pub skl_version: String,

    /// Maximum pending proposals before pushes are refused (full mode).
    pub queue_max: usize,

    /// Part of the config surface for the reviewer; not read by the gates.
    pub circuit_breaker_threshold: u32,

    /// Part of the config surface for the reviewer; not read by the gates.
    pub review_threshold: u32,

    /// Ref the change set is diffed against.
    pub base_branch: String,

    #[serde(rename = "skl_mode")]
    pub mode: Mode,
}

impl Default for HookConfig {
    fn default() -> Self {
        Self {
            skl_version: "1.4".to_string(),
            queue_max: 15,
            circuit_breaker_threshold: 3,
            review_threshold: 5,
            base_branch: "main".to_string(),
            mode: Mode::Full,
        }
    }
}

impl HookConfig {
    pub fn validate(&self) -> Result<()> {
        if self.queue_max == 0 {
            return Err(anyhow!("queue_max must be > 0"));
        }
        if self.base_branch.trim().is_empty() {
            return Err(anyhow!("base_branch must be a non-empty string"));
        }
        Ok(())
    }

    /// Queue ceiling for the active mode.
    pub fn effective_queue_max(&self) -> usize {
        match self.mode {
            Mode::Full => self.queue_max,
            Mode::Bootstrap => BOOTSTRAP_QUEUE_MAX,
        }
    }
}

/// Load config from a JSON file.
///
/// A missing file yields defaults. A file that is not valid JSON (or has
/// fields of the wrong type) also yields defaults, with a warning. A
/// well-formed file with unusable values is an error.
pub fn load_config(path: &Path) -> Result<HookConfig> {
    if !path.exists() {
        debug!(path = %path.display(), "no hook config; using defaults");
        let cfg = HookConfig::default();
        cfg.validate()?;
        return Ok(cfg);
    }
    let contents = fs::read_to_string(path).with_context(|| format!("read {}", path.display()))?;
    let cfg: HookConfig = match serde_json::from_str(&contents) {
        Ok(cfg) => cfg,
        Err(err) => {
            warn!(path = %path.display(), %err, "unreadable hook config; using defaults");
            HookConfig::default()
        }
    };
    cfg.validate()
        .with_context(|| format!("invalid hook config {}", path.display()))?;
    Ok(cfg)
}
