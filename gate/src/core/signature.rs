//! Public API signature comparison between two revisions.

use tracing::debug;

use crate::core::budget::Budget;
use crate::core::syntax::SourceLanguage;

/// True if the set of top-level declarations or any surviving declaration's
/// signature differs between `base` and `head`.
///
/// A new file (`base` is `None`) always introduces API, and a revision that
/// fails to parse counts as changed.
pub fn public_api_signature_changed(
    lang: &dyn SourceLanguage,
    base: Option<&str>,
    head: &str,
) -> bool {
    let Some(base) = base else {
        return true;
    };
    let budget = Budget::unbounded();
    let (base_tree, head_tree) = match (lang.parse(base, &budget), lang.parse(head, &budget)) {
        (Ok(base_tree), Ok(head_tree)) => (base_tree, head_tree),
        (Err(err), _) | (_, Err(err)) => {
            debug!(language = lang.name(), %err, "unparseable revision; assuming API changed");
            return true;
        }
    };
    let base_defs = lang.extract_top_level_signatures(&base_tree);
    let head_defs = lang.extract_top_level_signatures(&head_tree);
    // Maps keyed by name: equal maps mean same names and same keys.
    base_defs != head_defs
}
