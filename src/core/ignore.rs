//! Glob matching for the collection's `excluded_files` setting.

use camino::Utf8Path;
use globset::{Glob, GlobSet, GlobSetBuilder};

/// Builds a `GlobSet` from `.gitignore`-style patterns.
///
/// Blank lines and `#` comments are skipped. A trailing `/` marks a directory
/// pattern, which matches the directory itself and everything below it.
/// Invalid patterns are logged and skipped.
pub fn build_globset_from_patterns<'a, I>(patterns: I) -> GlobSet
where
    I: IntoIterator<Item = &'a String>,
{
    let mut builder = GlobSetBuilder::new();

    for pattern in patterns {
        let trimmed_pattern = pattern.trim();
        if trimmed_pattern.is_empty() || trimmed_pattern.starts_with('#') {
            continue;
        }

        let globs = if let Some(dir_pattern) = trimmed_pattern.strip_suffix('/') {
            vec![format!("**/{dir_pattern}"), format!("**/{dir_pattern}/**")]
        } else {
            vec![format!("**/{trimmed_pattern}")]
        };

        for glob in globs {
            match Glob::new(&glob) {
                Ok(glob) => {
                    builder.add(glob);
                }
                Err(e) => tracing::warn!("Skipping invalid exclude pattern '{}': {}", pattern, e),
            }
        }
    }

    builder.build().unwrap_or_else(|e| {
        tracing::error!("Failed to build glob set from patterns: {}", e);
        GlobSet::empty()
    })
}

/// `true` if `path`, taken relative to `root`, matches one of the excluded patterns.
pub fn is_excluded(excluded: &GlobSet, root: &Utf8Path, path: &Utf8Path) -> bool {
    if excluded.is_empty() {
        return false;
    }
    let relative = path.strip_prefix(root).unwrap_or(path);
    excluded.is_match(relative.as_std_path())
}
