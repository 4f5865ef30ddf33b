//! Knowledge store load and atomic write-back.

use std::fs::{self, File};
use std::io::Write;
use std::path::Path;

use anyhow::{Context, Result, anyhow};
use tracing::{debug, warn};

use super::documents::{KNOWLEDGE_SCHEMA, read_validated};
use crate::model::Knowledge;

/// Load the knowledge document. Missing or corrupt is a setup failure.
pub fn load_knowledge(path: &Path) -> Result<Knowledge> {
    debug!(path = %path.display(), "loading knowledge");
    if !path.exists() {
        return Err(anyhow!("knowledge store not found at {}", path.display()));
    }
    let knowledge: Knowledge = read_validated(path, KNOWLEDGE_SCHEMA)?;
    debug!(
        queue = knowledge.queue.len(),
        state = knowledge.state().len(),
        "knowledge loaded"
    );
    Ok(knowledge)
}

/// Atomically replace the knowledge document (temp file + fsync + rename).
///
/// On failure the previous document is untouched and the temp file is removed.
pub fn write_knowledge_atomic(path: &Path, knowledge: &Knowledge) -> Result<()> {
    debug!(path = %path.display(), queue = knowledge.queue.len(), "writing knowledge");
    let mut buf = serde_json::to_string_pretty(knowledge).context("serialize knowledge")?;
    buf.push('\n');
    write_atomic(path, &buf)
}

fn write_atomic(path: &Path, contents: &str) -> Result<()> {
    let parent = path
        .parent()
        .with_context(|| format!("knowledge path missing parent {}", path.display()))?;
    fs::create_dir_all(parent).with_context(|| format!("create directory {}", parent.display()))?;
    let tmp_path = path.with_extension("json.tmp");
    let result = write_and_sync(&tmp_path, contents).and_then(|()| {
        fs::rename(&tmp_path, path)
            .with_context(|| format!("replace knowledge {}", path.display()))
    });
    if result.is_err()
        && tmp_path.is_file()
        && let Err(err) = fs::remove_file(&tmp_path)
    {
        warn!(path = %tmp_path.display(), %err, "could not remove temp knowledge file");
    }
    result
}

fn write_and_sync(tmp_path: &Path, contents: &str) -> Result<()> {
    let mut file = File::create(tmp_path)
        .with_context(|| format!("create temp knowledge {}", tmp_path.display()))?;
    file.write_all(contents.as_bytes())
        .with_context(|| format!("write temp knowledge {}", tmp_path.display()))?;
    file.sync_all()
        .with_context(|| format!("sync temp knowledge {}", tmp_path.display()))
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;
    use crate::model::QueueEntry;

    fn sample() -> Knowledge {
        serde_json::from_value(json!({
            "queue": [{"proposal_id": "p1", "status": "pending"}],
            "state": [],
            "invariants": {"security_patterns": []},
            "project": {"name": "demo"}
        }))
        .expect("sample knowledge")
    }

    #[test]
    fn write_then_load_round_trips() {
        let temp = tempfile::tempdir().expect("tempdir");
        let path = temp.path().join("knowledge.json");
        write_knowledge_atomic(&path, &sample()).expect("write");
        assert_eq!(load_knowledge(&path).expect("load"), sample());
        assert!(!path.with_extension("json.tmp").exists());
    }

    #[test]
    fn missing_or_corrupt_store_is_an_error() {
        let temp = tempfile::tempdir().expect("tempdir");
        let path = temp.path().join("knowledge.json");
        assert!(load_knowledge(&path).is_err());
        fs::write(&path, "{\"queue\": [").expect("write");
        assert!(load_knowledge(&path).is_err());
        fs::write(&path, "{\"queue\": {}}").expect("write");
        assert!(load_knowledge(&path).is_err());
    }

    #[test]
    fn failed_write_leaves_previous_document_intact() {
        let temp = tempfile::tempdir().expect("tempdir");
        let path = temp.path().join("knowledge.json");
        write_knowledge_atomic(&path, &sample()).expect("write");
        let before = fs::read(&path).expect("read");

        // A directory squatting on the temp path makes the write fail.
        fs::create_dir(path.with_extension("json.tmp")).expect("block temp path");
        let mut grown = sample();
        grown
            .queue
            .push(QueueEntry::default().with("proposal_id", "p2"));
        assert!(write_knowledge_atomic(&path, &grown).is_err());
        assert_eq!(fs::read(&path).expect("read"), before);
    }
}
