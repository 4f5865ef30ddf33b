//! Tree differ: decides whether a change is mechanical-only.

use tracing::{debug, warn};

use crate::core::budget::{Budget, TREE_DIFF_BUDGET};
use crate::core::syntax::{SourceLanguage, SyntaxError, structural_equal};

/// True when `head` is structurally identical to `base` once documentation
/// literals and no-op statements are ignored.
///
/// Every failure mode answers `false`: a new file (`base` is `None`), a
/// parse failure on either side, or running past [`TREE_DIFF_BUDGET`].
pub fn mechanical_only(lang: &dyn SourceLanguage, base: Option<&str>, head: &str) -> bool {
    mechanical_only_within(lang, base, head, &Budget::start(TREE_DIFF_BUDGET))
}

/// [`mechanical_only`] under an explicit budget.
pub fn mechanical_only_within(
    lang: &dyn SourceLanguage,
    base: Option<&str>,
    head: &str,
    budget: &Budget,
) -> bool {
    let Some(base) = base else {
        return false;
    };
    match compare(lang, base, head, budget) {
        Ok(equal) => equal,
        Err(SyntaxError::Budget(exceeded)) => {
            warn!(
                language = lang.name(),
                "mechanical-only check {exceeded}; defaulting to non-mechanical"
            );
            false
        }
        Err(err) => {
            debug!(language = lang.name(), %err, "unparseable revision; not mechanical");
            false
        }
    }
}

fn compare(
    lang: &dyn SourceLanguage,
    base: &str,
    head: &str,
    budget: &Budget,
) -> Result<bool, SyntaxError> {
    let base_tree = lang.parse(base, budget)?;
    let head_tree = lang.parse(head, budget)?;
    let base_stripped = lang.strip_cosmetic(&base_tree, budget)?;
    let head_stripped = lang.strip_cosmetic(&head_tree, budget)?;
    Ok(structural_equal(&base_stripped, &head_stripped, budget)?)
}
