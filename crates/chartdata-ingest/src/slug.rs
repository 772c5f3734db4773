use std::sync::LazyLock;

use regex::Regex;

static DISALLOWED: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[^a-z0-9_\- ]+").expect("valid slug pattern"));
static SEPARATORS: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[ \-]+").expect("valid separator pattern"));

/// Lowercase kebab-case form of a display name.
///
/// Characters other than ASCII letters, digits, `_`, `-` and spaces are
/// dropped; runs of spaces and hyphens become a single `-`.
pub fn slugify(name: &str) -> String {
    let lowered = name.to_lowercase();
    let kept = DISALLOWED.replace_all(&lowered, "");
    let joined = SEPARATORS.replace_all(kept.trim(), "-");
    joined.trim_matches('-').to_string()
}
