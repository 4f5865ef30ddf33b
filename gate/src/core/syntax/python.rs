//! Python support backed by `tree-sitter-python`.

use std::collections::{BTreeMap, BTreeSet};

use tree_sitter::{Parser, TreeCursor};

use super::{SignatureKey, SourceLanguage, SyntaxError, SyntaxNode};
use crate::core::budget::{Budget, BudgetExceeded};

/// Deepest nesting accepted before a unit is treated as unparseable.
pub const MAX_NESTING: usize = 512;

/// Python as a governed language (`.py`).
#[derive(Debug, Clone, Copy, Default)]
pub struct Python;

impl SourceLanguage for Python {
    fn name(&self) -> &'static str {
        "python"
    }

    fn parse(&self, source: &str, budget: &Budget) -> Result<SyntaxNode, SyntaxError> {
        let mut parser = Parser::new();
        parser
            .set_language(&tree_sitter_python::LANGUAGE.into())
            .map_err(|e| SyntaxError::Grammar(e.to_string()))?;
        let tree = parser.parse(source, None).ok_or(SyntaxError::Invalid)?;
        if tree.root_node().has_error() {
            return Err(SyntaxError::Invalid);
        }
        budget.check()?;
        let mut cursor = tree.walk();
        lower(&mut cursor, source.as_bytes(), 0, budget)
    }

    fn strip_cosmetic(
        &self,
        tree: &SyntaxNode,
        budget: &Budget,
    ) -> Result<SyntaxNode, BudgetExceeded> {
        budget.check()?;
        let mut children = Vec::with_capacity(tree.children.len());
        for child in &tree.children {
            if is_cosmetic_statement(child) {
                continue;
            }
            children.push(self.strip_cosmetic(child, budget)?);
        }
        Ok(SyntaxNode {
            kind: tree.kind,
            field: tree.field,
            text: tree.text.clone(),
            children,
        })
    }

    fn extract_top_level_signatures(&self, tree: &SyntaxNode) -> BTreeMap<String, SignatureKey> {
        let mut defs = BTreeMap::new();
        for stmt in &tree.children {
            let def = match stmt.kind {
                "decorated_definition" => match stmt.child_by_field("definition") {
                    Some(def) => def,
                    None => continue,
                },
                _ => stmt,
            };
            if let Some(key) = signature_key(def) {
                let name = match &key {
                    SignatureKey::Callable { name, .. } | SignatureKey::Type { name } => {
                        name.clone()
                    }
                };
                defs.insert(name, key);
            }
        }
        defs
    }

    fn collect_identifier_references(&self, tree: &SyntaxNode) -> BTreeSet<String> {
        let mut out = BTreeSet::new();
        collect_references(tree, &mut out);
        out
    }

    fn collect_imports(&self, tree: &SyntaxNode) -> Vec<String> {
        let mut out = Vec::new();
        collect_imports(tree, &mut out);
        out
    }

    fn module_candidates(&self, module: &str) -> Vec<String> {
        let rel = module.split('.').collect::<Vec<_>>().join("/");
        vec![format!("{rel}.py"), format!("{rel}/__init__.py")]
    }
}

fn lower(
    cursor: &mut TreeCursor<'_>,
    source: &[u8],
    depth: usize,
    budget: &Budget,
) -> Result<SyntaxNode, SyntaxError> {
    if depth > MAX_NESTING {
        return Err(SyntaxError::TooDeep(MAX_NESTING));
    }
    budget.check()?;
    let node = cursor.node();
    let field = cursor.field_name();

    let mut children = Vec::new();
    let mut gaps = Vec::new();
    let mut covered = node.start_byte();
    if cursor.goto_first_child() {
        loop {
            let child = cursor.node();
            push_gap(source, covered, child.start_byte(), &mut gaps)?;
            covered = child.end_byte();
            if !child.is_extra() && !is_punctuation(child.kind()) {
                children.push(lower(cursor, source, depth + 1, budget)?);
            }
            if !cursor.goto_next_sibling() {
                break;
            }
        }
        cursor.goto_parent();
    }
    push_gap(source, covered, node.end_byte(), &mut gaps)?;

    let text = if node.child_count() == 0 || is_literal_body(node.kind()) {
        let raw = node.utf8_text(source).map_err(|_| SyntaxError::Invalid)?;
        Some(leaf_text(node.kind(), raw))
    } else if gaps.is_empty() {
        None
    } else {
        // Hidden tokens carry text that no child node covers.
        Some(gaps.join(" "))
    };

    let lowered = SyntaxNode {
        kind: node.kind(),
        field,
        text,
        children,
    };
    Ok(unwrap_parentheses(lowered))
}

/// Literal text is meaning, whitespace included; escapes and interpolations
/// inside it are children but do not cover it.
fn is_literal_body(kind: &str) -> bool {
    matches!(kind, "string_content" | "format_specifier")
}

/// Record non-blank source between `start` and `end` that no child covers.
fn push_gap(
    source: &[u8],
    start: usize,
    end: usize,
    gaps: &mut Vec<String>,
) -> Result<(), SyntaxError> {
    let Some(bytes) = source.get(start..end) else {
        return Ok(());
    };
    let gap = std::str::from_utf8(bytes).map_err(|_| SyntaxError::Invalid)?;
    let gap = gap.trim();
    if !gap.is_empty() {
        gaps.push(gap.to_string());
    }
    Ok(())
}

/// Grouping tokens whose meaning is already carried by the parent's kind.
fn is_punctuation(kind: &str) -> bool {
    matches!(kind, "," | ";" | "(" | ")" | "[" | "]" | "{" | "}")
}

/// Quote style is not structure: keep only the string prefix (`b`, `f`, `r`).
fn leaf_text(kind: &str, raw: &str) -> String {
    match kind {
        "string_start" => raw
            .chars()
            .filter(|c| !matches!(c, '"' | '\'' | 'u' | 'U'))
            .flat_map(char::to_lowercase)
            .collect(),
        "string_end" => String::new(),
        _ => raw.to_string(),
    }
}

fn unwrap_parentheses(mut node: SyntaxNode) -> SyntaxNode {
    if node.kind == "parenthesized_expression" && node.children.len() == 1 {
        if let Some(mut inner) = node.children.pop() {
            inner.field = node.field;
            return inner;
        }
    }
    node
}

fn is_cosmetic_statement(node: &SyntaxNode) -> bool {
    match node.kind {
        "pass_statement" => true,
        "expression_statement" => node.children.len() == 1 && is_constant(&node.children[0]),
        _ => false,
    }
}

fn is_constant(node: &SyntaxNode) -> bool {
    match node.kind {
        "string" => !node.children.iter().any(|c| c.kind == "interpolation"),
        "concatenated_string" => node.children.iter().all(is_constant),
        "integer" | "float" | "true" | "false" | "none" | "ellipsis" => true,
        _ => false,
    }
}

fn signature_key(def: &SyntaxNode) -> Option<SignatureKey> {
    let name = def.child_by_field("name")?.flat_text();
    match def.kind {
        "class_definition" => Some(SignatureKey::Type { name }),
        "function_definition" => {
            let mut key = SignatureParts::default();
            if let Some(params) = def.child_by_field("parameters") {
                key.read(params);
            }
            Some(SignatureKey::Callable {
                name,
                positional: key.positional,
                variadic_positional: key.variadic_positional,
                variadic_keyword: key.variadic_keyword,
                positional_defaults: key.positional_defaults,
                keyword_only: key.keyword_only,
                keyword_defaults: key.keyword_defaults,
            })
        }
        _ => None,
    }
}

#[derive(Default)]
struct SignatureParts {
    positional: Vec<String>,
    variadic_positional: bool,
    variadic_keyword: bool,
    positional_defaults: usize,
    keyword_only: Vec<String>,
    keyword_defaults: usize,
    after_star: bool,
}

impl SignatureParts {
    fn read(&mut self, params: &SyntaxNode) {
        for param in &params.children {
            match param.kind {
                "identifier" => self.push_name(param.flat_text(), false),
                "typed_parameter" => match param.children.first() {
                    Some(inner) if inner.kind == "identifier" => {
                        self.push_name(inner.flat_text(), false);
                    }
                    Some(inner) => self.read_splat(inner.kind),
                    None => {}
                },
                "default_parameter" | "typed_default_parameter" => {
                    if let Some(name) = param.child_by_field("name") {
                        self.push_name(name.flat_text(), true);
                    }
                }
                "keyword_separator" => self.after_star = true,
                kind => self.read_splat(kind),
            }
        }
    }

    fn read_splat(&mut self, kind: &str) {
        match kind {
            "list_splat_pattern" => {
                self.variadic_positional = true;
                self.after_star = true;
            }
            "dictionary_splat_pattern" => self.variadic_keyword = true,
            _ => {}
        }
    }

    fn push_name(&mut self, name: String, has_default: bool) {
        if self.after_star {
            self.keyword_only.push(name);
            if has_default {
                self.keyword_defaults += 1;
            }
        } else {
            self.positional.push(name);
            if has_default {
                self.positional_defaults += 1;
            }
        }
    }
}

fn collect_references(node: &SyntaxNode, out: &mut BTreeSet<String>) {
    match node.kind {
        "identifier" => {
            if let Some(text) = &node.text {
                out.insert(text.clone());
            }
        }
        "import_statement"
        | "import_from_statement"
        | "future_import_statement"
        | "global_statement"
        | "nonlocal_statement" => {}
        "function_definition" | "class_definition" | "keyword_argument" => {
            for child in &node.children {
                if child.field != Some("name") {
                    collect_references(child, out);
                }
            }
        }
        "parameters" | "lambda_parameters" => {
            for param in &node.children {
                match param.kind {
                    "default_parameter" | "typed_default_parameter" | "typed_parameter" => {
                        for part in &param.children {
                            if matches!(part.field, Some("value") | Some("type")) {
                                collect_references(part, out);
                            }
                        }
                    }
                    _ => {}
                }
            }
        }
        "attribute" => {
            for child in &node.children {
                if child.field == Some("attribute") {
                    out.insert(child.flat_text());
                } else {
                    collect_references(child, out);
                }
            }
        }
        _ => {
            for child in &node.children {
                collect_references(child, out);
            }
        }
    }
}

fn collect_imports(node: &SyntaxNode, out: &mut Vec<String>) {
    match node.kind {
        "import_statement" => {
            for name in node.children_by_field("name") {
                let dotted = match name.kind {
                    "aliased_import" => name.child_by_field("name"),
                    _ => Some(name),
                };
                if let Some(dotted) = dotted {
                    out.push(dotted_module(dotted));
                }
            }
        }
        "import_from_statement" => {
            let Some(module) = node.child_by_field("module_name") else {
                return;
            };
            let dotted = match module.kind {
                "relative_import" => module.children.iter().find(|c| c.kind == "dotted_name"),
                _ => Some(module),
            };
            if let Some(dotted) = dotted {
                out.push(dotted_module(dotted));
            }
        }
        "future_import_statement" => {}
        _ => {
            for child in &node.children {
                collect_imports(child, out);
            }
        }
    }
}

fn dotted_module(node: &SyntaxNode) -> String {
    if node.kind != "dotted_name" {
        return node.flat_text();
    }
    node.children
        .iter()
        .filter(|c| c.kind == "identifier")
        .map(SyntaxNode::flat_text)
        .collect::<Vec<_>>()
        .join(".")
}
