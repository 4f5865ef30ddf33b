//! `pushgate classify`: run the tree differ and signature extractor on two
//! local files.

use std::fs;
use std::path::Path;

use anyhow::{Context, Result, anyhow};
use serde::Serialize;

use crate::core::differ::mechanical_only;
use crate::core::signature::public_api_signature_changed;
use crate::core::syntax::language_for_path;
use crate::core::types::ChangeType;

/// Classification of one base/head pair.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Classification {
    pub path: String,
    pub language: &'static str,
    pub mechanical_only: bool,
    pub public_api_signature_changed: bool,
    pub ast_change_type: ChangeType,
}

/// Classify `head` against `base` (absent = new file). The language is picked
/// from `path`.
pub fn classify(path: &str, base: Option<&str>, head: &str) -> Result<Classification> {
    let lang = language_for_path(path)
        .ok_or_else(|| anyhow!("no source language for {path}; expected a .py path"))?;
    let mechanical = mechanical_only(lang, base, head);
    let api_changed = public_api_signature_changed(lang, base, head);
    Ok(Classification {
        path: path.to_string(),
        language: lang.name(),
        mechanical_only: mechanical,
        public_api_signature_changed: api_changed,
        ast_change_type: ChangeType::derive(mechanical, api_changed),
    })
}

/// Read the two files and classify them. `path` defaults to the head file name.
pub fn classify_files(
    base: Option<&Path>,
    head: &Path,
    path: Option<&str>,
) -> Result<Classification> {
    let head_text =
        fs::read_to_string(head).with_context(|| format!("read {}", head.display()))?;
    let base_text = base
        .map(|p| fs::read_to_string(p).with_context(|| format!("read {}", p.display())))
        .transpose()?;
    let path = match path {
        Some(path) => path.to_string(),
        None => head.to_string_lossy().into_owned(),
    };
    classify(&path, base_text.as_deref(), &head_text)
}
