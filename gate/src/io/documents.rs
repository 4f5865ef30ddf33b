//! Loading of the `.skl/` JSON documents the gate reads.
//!
//! Every document is checked against its embedded JSON Schema before it is
//! deserialized.

use std::fs;
use std::path::Path;

use anyhow::{Context, Result, anyhow};
use jsonschema::validator_for;
use serde::de::DeserializeOwned;
use serde_json::Value;
use tracing::{debug, warn};

use crate::model::{AgentContext, Rfc, ScopeDocument};

pub(crate) const KNOWLEDGE_SCHEMA: &str = include_str!("../../schemas/knowledge.schema.json");
const AGENT_CONTEXT_SCHEMA: &str = include_str!("../../schemas/agent_context.schema.json");
const SCOPE_DEFINITIONS_SCHEMA: &str = include_str!("../../schemas/scope_definitions.schema.json");
const RFC_SCHEMA: &str = include_str!("../../schemas/rfc.schema.json");

/// Read `path`, validate it against `schema` and deserialize it.
pub(crate) fn read_validated<T: DeserializeOwned>(path: &Path, schema: &str) -> Result<T> {
    let contents = fs::read_to_string(path).with_context(|| format!("read {}", path.display()))?;
    let value: Value =
        serde_json::from_str(&contents).with_context(|| format!("parse {}", path.display()))?;
    validate_schema(schema, &value).with_context(|| format!("validate {}", path.display()))?;
    serde_json::from_value(value).with_context(|| format!("deserialize {}", path.display()))
}

fn validate_schema(schema: &str, instance: &Value) -> Result<()> {
    let schema_value: Value = serde_json::from_str(schema).context("parse embedded schema")?;
    let compiled =
        validator_for(&schema_value).map_err(|err| anyhow!("invalid schema: {}", err))?;
    if !compiled.is_valid(instance) {
        let messages = compiled
            .iter_errors(instance)
            .map(|err| err.to_string())
            .collect::<Vec<_>>();
        return Err(anyhow!("schema validation failed: {}", messages.join("; ")));
    }
    Ok(())
}

/// Load the acting agent's context. Missing or malformed is a setup failure.
pub fn load_agent_context(path: &Path) -> Result<AgentContext> {
    if !path.exists() {
        return Err(anyhow!("agent context not found at {}", path.display()));
    }
    read_validated(path, AGENT_CONTEXT_SCHEMA)
}

/// Load scope definitions, or `None` (with a warning) when scope validation
/// has to be skipped.
pub fn load_scope_document(path: &Path) -> Option<ScopeDocument> {
    if !path.exists() {
        warn!(path = %path.display(), "scope definitions not found; scope validation skipped");
        return None;
    }
    match read_validated(path, SCOPE_DEFINITIONS_SCHEMA) {
        Ok(doc) => Some(doc),
        Err(err) => {
            warn!("unusable scope definitions; scope validation skipped: {err:#}");
            None
        }
    }
}

/// Load every `*.json` RFC in `dir`, in file-name order.
///
/// A missing directory means no RFCs. Files that fail to read or validate are
/// skipped with a warning. An RFC without an id takes its file name.
pub fn load_rfcs(dir: &Path) -> Vec<Rfc> {
    let entries = match fs::read_dir(dir) {
        Ok(entries) => entries,
        Err(err) => {
            debug!(dir = %dir.display(), %err, "no readable RFC directory");
            return Vec::new();
        }
    };
    let mut paths: Vec<_> = entries
        .filter_map(|entry| entry.ok().map(|e| e.path()))
        .filter(|path| path.is_file() && path.extension().is_some_and(|ext| ext == "json"))
        .collect();
    paths.sort();

    let mut rfcs = Vec::with_capacity(paths.len());
    for path in paths {
        match read_validated::<Rfc>(&path, RFC_SCHEMA) {
            Ok(mut rfc) => {
                if rfc.id.is_empty() {
                    rfc.id = path
                        .file_name()
                        .map(|name| name.to_string_lossy().into_owned())
                        .unwrap_or_default();
                }
                rfcs.push(rfc);
            }
            Err(err) => warn!("skipping unreadable RFC file: {err:#}"),
        }
    }
    debug!(count = rfcs.len(), "RFCs loaded");
    rfcs
}
