//! Duplicate-keyword heuristics for file names.
//!
//! Other tools mark copies with words like "copy" or "backup", or with a
//! trailing counter such as `photo (1)`. Names carrying such a marker are
//! worse master candidates than a plain name.

use std::path::Path;
use std::sync::LazyLock;

use regex::RegexSet;

/// Words that mark a copy when they appear anywhere in the stem.
pub const DUPLICATE_KEYWORDS: &[&str] = &[
    "copy",
    "duplicate",
    "version",
    "backup",
    "alt",
    "alternative",
    "copy of",
    "copie",
    "kopie",
    "copia",
];

/// Trailing counters, anchored at the end of the stem.
const NUMBERED_PATTERNS: &[&str] = &[
    r"\(\d+\)$",
    r"_copy_?\d+$",
    r"_duplicate_?\d+$",
    r" \d+$",
];

static NUMBERED: LazyLock<Option<RegexSet>> = LazyLock::new(|| RegexSet::new(NUMBERED_PATTERNS).ok());

/// Whether the file name looks like a copy made by another program.
///
/// The check runs on the lowercased stem (extension stripped).
///
/// ```
/// use orgphoto::duplicates::has_duplicate_keyword;
///
/// assert!(has_duplicate_keyword("Copy of beach.jpg"));
/// assert!(has_duplicate_keyword("beach (2).jpg"));
/// assert!(!has_duplicate_keyword("20221023_171427392.jpg"));
/// ```
#[must_use]
pub fn has_duplicate_keyword(file_name: &str) -> bool {
    let stem = Path::new(file_name)
        .file_stem()
        .map(|s| s.to_string_lossy().to_lowercase())
        .unwrap_or_default();

    if DUPLICATE_KEYWORDS.iter().any(|kw| stem.contains(kw)) {
        return true;
    }

    NUMBERED.as_ref().is_some_and(|set| set.is_match(&stem))
}
