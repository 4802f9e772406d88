//! Full-text search over note content with per-line context previews.

use super::ignore::is_excluded;
use super::{Entry, SearchResult};
use camino::Utf8Path;
use globset::GlobSet;
use rayon::prelude::*;
use regex::{Regex, RegexBuilder};

/// Toggles for a content search.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SearchOptions {
    pub case_sensitive: bool,
    /// Require whitespace (or line start/end) around the match.
    pub match_word: bool,
}

/// A utility struct for searching note content.
///
/// This struct is stateless and provides methods as associated functions.
pub struct SearchEngine;

impl SearchEngine {
    /// Builds the per-line matcher for `query`, or `None` for an empty query.
    pub fn line_matcher(query: &str, options: SearchOptions) -> Option<Regex> {
        if query.is_empty() {
            return None;
        }
        let escaped = regex::escape(query);
        let pattern = if options.match_word {
            format!(r"(?:^|\s){escaped}(?:$|\s)")
        } else {
            escaped
        };

        match RegexBuilder::new(&pattern)
            .case_insensitive(!options.case_sensitive)
            .build()
        {
            Ok(matcher) => Some(matcher),
            Err(e) => {
                tracing::warn!("Could not build search pattern for '{}': {}", query, e);
                None
            }
        }
    }

    /// One preview per matching line: the line plus its direct neighbours.
    pub fn context_previews(content: &str, matcher: &Regex) -> Vec<String> {
        let lines: Vec<&str> = content.split('\n').collect();
        lines
            .iter()
            .enumerate()
            .filter(|(_, line)| matcher.is_match(line))
            .map(|(i, _)| {
                let start = i.saturating_sub(1);
                let end = (i + 1).min(lines.len() - 1);
                lines[start..=end].join("\n")
            })
            .collect()
    }

    /// Searches `notes`, skipping folders and paths matched by `excluded`.
    ///
    /// Results are ordered by note path, then by line.
    pub fn search_notes(
        notes: &[Entry],
        query: &str,
        options: SearchOptions,
        excluded: &GlobSet,
        collection_root: &Utf8Path,
    ) -> Vec<SearchResult> {
        let Some(matcher) = Self::line_matcher(query, options) else {
            return Vec::new();
        };

        let mut results: Vec<SearchResult> = notes
            .par_iter()
            .filter(|note| !note.is_folder && !is_excluded(excluded, collection_root, &note.path))
            .flat_map_iter(|note| {
                let content = note.content.as_deref().unwrap_or_default();
                Self::context_previews(content, &matcher)
                    .into_iter()
                    .map(move |context_preview| SearchResult {
                        path: note.path.clone(),
                        context_preview,
                    })
            })
            .collect();

        results.sort_by(|a, b| a.path.cmp(&b.path));
        tracing::debug!("Search for '{}' produced {} results", query, results.len());
        results
    }
}
