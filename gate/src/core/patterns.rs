//! Sensitive-pattern scanner over identifier references.

use crate::core::budget::Budget;
use crate::core::syntax::SourceLanguage;

/// True if `head` references any of `patterns` (exact, case-sensitive).
///
/// A unit that does not parse cannot be confirmed to match and answers
/// `false`.
pub fn touched_sensitive_pattern(
    lang: &dyn SourceLanguage,
    head: &str,
    patterns: &[String],
) -> bool {
    if patterns.is_empty() {
        return false;
    }
    let Ok(tree) = lang.parse(head, &Budget::unbounded()) else {
        return false;
    };
    let references = lang.collect_identifier_references(&tree);
    patterns.iter().any(|p| references.contains(p.as_str()))
}
