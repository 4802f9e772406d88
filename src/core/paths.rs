//! Small helpers for the string-like entry paths used as identifiers.
//!
//! Path comparisons are exact. Only name comparisons fold case.

use camino::{Utf8Path, Utf8PathBuf};

/// The last path segment, or the whole path when it has none (e.g. `/`).
pub fn leaf_name(path: &Utf8Path) -> &str {
    path.file_name().unwrap_or(path.as_str())
}

/// The containing folder of `path`, or `path` itself for a root.
pub fn parent_of(path: &Utf8Path) -> &Utf8Path {
    path.parent().unwrap_or(path)
}

/// `true` if `path` equals `ancestor` or lives somewhere below it.
pub fn is_within(path: &Utf8Path, ancestor: &Utf8Path) -> bool {
    path.starts_with(ancestor)
}

/// Rewrites `path` from under `old_root` to under `new_root`.
///
/// Returns `None` when `path` is not inside `old_root`.
pub fn rebase(path: &Utf8Path, old_root: &Utf8Path, new_root: &Utf8Path) -> Option<Utf8PathBuf> {
    let relative = path.strip_prefix(old_root).ok()?;
    if relative.as_str().is_empty() {
        Some(new_root.to_path_buf())
    } else {
        Some(new_root.join(relative))
    }
}
