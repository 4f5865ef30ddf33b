//! Language capability interface used by the tree differ, signature
//! extractor, pattern scanner and dependency resolver.
//!
//! Each governed source language lowers its concrete syntax into an owned
//! [`SyntaxNode`] tree and answers a handful of structural questions about
//! it. Languages are selected by file extension via [`language_for_path`].

pub mod python;

use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

use crate::core::budget::{Budget, BudgetExceeded};

pub use python::Python;

/// Owned, position-free syntax node.
///
/// Layout, comments and punctuation are dropped during lowering, so two
/// trees compare equal when they differ only in formatting.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SyntaxNode {
    pub kind: &'static str,
    /// Field name of this node within its parent, if any.
    pub field: Option<&'static str>,
    /// Leaf text, literal string bodies, or source no child node covers.
    pub text: Option<String>,
    pub children: Vec<SyntaxNode>,
}

impl SyntaxNode {
    pub fn child_by_field(&self, field: &str) -> Option<&SyntaxNode> {
        self.children.iter().find(|c| c.field == Some(field))
    }

    pub fn children_by_field<'a>(
        &'a self,
        field: &'a str,
    ) -> impl Iterator<Item = &'a SyntaxNode> + 'a {
        self.children.iter().filter(move |c| c.field == Some(field))
    }

    /// Concatenated leaf text of this subtree (no separators).
    pub fn flat_text(&self) -> String {
        let mut out = String::new();
        self.push_text(&mut out);
        out
    }

    fn push_text(&self, out: &mut String) {
        if let Some(text) = &self.text {
            out.push_str(text);
        }
        for child in &self.children {
            child.push_text(out);
        }
    }
}

/// Why a source unit could not be turned into a comparable tree.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SyntaxError {
    /// The grammar could not be loaded.
    Grammar(String),
    /// The source contains syntax errors.
    Invalid,
    /// Nesting exceeded the supported depth.
    TooDeep(usize),
    /// The comparison budget ran out while lowering.
    Budget(BudgetExceeded),
}

impl fmt::Display for SyntaxError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SyntaxError::Grammar(msg) => write!(f, "grammar unavailable: {msg}"),
            SyntaxError::Invalid => write!(f, "source does not parse"),
            SyntaxError::TooDeep(limit) => write!(f, "nesting deeper than {limit}"),
            SyntaxError::Budget(exceeded) => write!(f, "{exceeded}"),
        }
    }
}

impl From<BudgetExceeded> for SyntaxError {
    fn from(value: BudgetExceeded) -> Self {
        SyntaxError::Budget(value)
    }
}

/// Comparable fingerprint of one top-level declaration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SignatureKey {
    Callable {
        name: String,
        positional: Vec<String>,
        variadic_positional: bool,
        variadic_keyword: bool,
        positional_defaults: usize,
        keyword_only: Vec<String>,
        keyword_defaults: usize,
    },
    /// Type declarations compare by name only.
    Type { name: String },
}

/// Capability set one governed language must provide.
pub trait SourceLanguage {
    fn name(&self) -> &'static str;

    /// Parse `source` into an owned tree, failing on any syntax error.
    fn parse(&self, source: &str, budget: &Budget) -> Result<SyntaxNode, SyntaxError>;

    /// Copy of `tree` without documentation literals and no-op statements.
    fn strip_cosmetic(&self, tree: &SyntaxNode, budget: &Budget)
    -> Result<SyntaxNode, BudgetExceeded>;

    /// Top-level declarations keyed by name. A later declaration with the
    /// same name replaces an earlier one.
    fn extract_top_level_signatures(&self, tree: &SyntaxNode) -> BTreeMap<String, SignatureKey>;

    /// Every referenced identifier: plain names, member accesses and callees.
    fn collect_identifier_references(&self, tree: &SyntaxNode) -> BTreeSet<String>;

    /// Imported module references, in source order. Imports that name no
    /// module are omitted.
    fn collect_imports(&self, tree: &SyntaxNode) -> Vec<String>;

    /// Repo-relative files an imported module may live in, most specific first.
    fn module_candidates(&self, module: &str) -> Vec<String>;
}

/// Pick the language implementation for a path by its extension.
pub fn language_for_path(path: &str) -> Option<&'static dyn SourceLanguage> {
    let ext = path.rsplit_once('.').map(|(_, ext)| ext)?;
    if ext.contains('/') {
        return None;
    }
    match ext {
        "py" => Some(&Python),
        _ => None,
    }
}

/// Structural equality under a budget.
pub fn structural_equal(
    a: &SyntaxNode,
    b: &SyntaxNode,
    budget: &Budget,
) -> Result<bool, BudgetExceeded> {
    budget.check()?;
    if a.kind != b.kind || a.text != b.text || a.children.len() != b.children.len() {
        return Ok(false);
    }
    for (left, right) in a.children.iter().zip(&b.children) {
        if !structural_equal(left, right, budget)? {
            return Ok(false);
        }
    }
    Ok(true)
}
