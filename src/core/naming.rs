//! Naming policy: untitled-name generation, note-name sanitizing and
//! sibling conflict checks.
//!
//! Name comparisons are case-insensitive throughout.

use regex::Regex;
use std::sync::LazyLock;

use super::{CoreError, CoreResult, Entry};

/// Characters that can never appear in an entry name.
pub const FORBIDDEN_CHARS: &[char] = &['/', '\\', '?', '%', '*', ':', '|', '"', '<', '>'];

/// Extension given to every note.
pub const NOTE_EXTENSION: &str = ".md";

/// Prefix used for generated entry names.
pub const UNTITLED_PREFIX: &str = "Untitled";

static DUPLICATE_SUFFIX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\s\(\d+\)$").expect("static regex is valid"));

/// Returns the first free name in the sequence `prefix`, `prefix 1`, `prefix 2`, ...
/// (each followed by `extension`).
///
/// Existing names matching `^<prefix>(?: (\d+))?<extension>$` determine the
/// highest used suffix `N` (a bare `prefix` counts as 0). Candidates `0..=N+1`
/// are tried in order, so gaps are filled first.
pub fn next_untitled_name<'a, I>(siblings: I, prefix: &str, extension: &str) -> String
where
    I: IntoIterator<Item = &'a str>,
{
    let prefix_lower = prefix.to_lowercase();
    let extension_lower = extension.to_lowercase();

    // Only names that could collide with a candidate matter.
    let taken: Vec<String> = siblings
        .into_iter()
        .map(str::to_lowercase)
        .filter(|name| name.starts_with(&prefix_lower) && name.ends_with(&extension_lower))
        .collect();

    let pattern = format!(
        "(?i)^{}(?: (\\d+))?{}$",
        regex::escape(prefix),
        regex::escape(extension)
    );
    let max_number = match Regex::new(&pattern) {
        Ok(number_pattern) => taken
            .iter()
            .filter_map(|name| number_pattern.captures(name))
            .map(|caps| {
                caps.get(1)
                    .and_then(|digits| digits.as_str().parse::<u64>().ok())
                    .unwrap_or(0)
            })
            .max()
            .unwrap_or(0),
        Err(e) => {
            tracing::warn!("Failed to build untitled-name pattern: {}", e);
            0
        }
    };

    let candidate = |i: u64| {
        if i == 0 {
            format!("{prefix}{extension}")
        } else {
            format!("{prefix} {i}{extension}")
        }
    };

    (0..=max_number.saturating_add(1))
        .map(candidate)
        .find(|name| !taken.contains(&name.to_lowercase()))
        .unwrap_or_else(|| candidate(max_number.saturating_add(1)))
}

/// Strips forbidden characters and makes sure the name ends in `.md`.
pub fn sanitize_note_name(name: &str) -> String {
    let mut clean: String = name.chars().filter(|c| !FORBIDDEN_CHARS.contains(c)).collect();
    if !clean.ends_with(NOTE_EXTENSION) {
        clean.push_str(NOTE_EXTENSION);
    }
    clean
}

/// Strips forbidden characters from a folder name.
pub fn sanitize_folder_name(name: &str) -> String {
    name.chars().filter(|c| !FORBIDDEN_CHARS.contains(c)).collect()
}

/// Fails for names that cannot denote a child of their parent: blank names,
/// `.`, `..`, and a note name made of the extension alone.
pub fn validate_name(name: &str) -> CoreResult<()> {
    let stem = name.strip_suffix(NOTE_EXTENSION).unwrap_or(name);
    if stem.trim().is_empty() || name == "." || name == ".." {
        return Err(CoreError::InvalidName(name.to_string()));
    }
    Ok(())
}

/// `true` if a sibling of the same kind already uses `candidate` (ignoring case).
pub fn check_conflict(siblings: &[Entry], candidate: &str, is_folder: bool) -> bool {
    siblings
        .iter()
        .any(|entry| entry.is_folder == is_folder && names_equal(&entry.name, candidate))
}

/// Case-insensitive name equality.
pub fn names_equal(a: &str, b: &str) -> bool {
    a.to_lowercase() == b.to_lowercase()
}

/// Derives the name for a copy of the note `name`: `<base> (<n>).<ext>`.
///
/// `base` is the name without its extension and without an existing `" (<n>)"`
/// suffix; `n` starts at the number of sibling notes whose name starts with
/// `base` and is bumped until the name is free.
pub fn duplicate_note_name(name: &str, siblings: &[Entry]) -> String {
    let (stem, extension) = match name.rsplit_once('.') {
        Some((stem, ext)) if !stem.is_empty() => (stem, Some(ext)),
        _ => (name, None),
    };
    let base = DUPLICATE_SUFFIX.replace(stem, "").into_owned();

    let mut n = siblings
        .iter()
        .filter(|entry| !entry.is_folder && entry.name.starts_with(&base))
        .count();

    loop {
        let candidate = match extension {
            Some(ext) => format!("{base} ({n}).{ext}"),
            None => format!("{base} ({n})"),
        };
        if !check_conflict(siblings, &candidate, false) {
            return candidate;
        }
        n += 1;
    }
}
