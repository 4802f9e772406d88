//! Builds, orders and filters the nested `FileEntry` tree of a collection.

use camino::Utf8Path;
use globset::GlobSet;
use std::cmp::Ordering;
use std::collections::{HashMap, HashSet};

use super::ignore::is_excluded;
use super::{Entry, FileEntry, SortMode};

/// A utility struct for turning flat entry lists into trees.
///
/// This struct is stateless and provides methods as associated functions.
pub struct TreeBuilder;

impl TreeBuilder {
    /// Nests a flat list of entries by `parent_path`.
    ///
    /// Entries whose parent is `root_path` or `collection_root` become roots.
    /// Everything else hangs under its parent folder. Entries whose parent is
    /// missing (or is a note) are dropped without error.
    pub fn build_tree(
        entries: &[Entry],
        root_path: &Utf8Path,
        collection_root: &Utf8Path,
    ) -> Vec<FileEntry> {
        let mut by_parent: HashMap<&Utf8Path, Vec<&Entry>> = HashMap::new();
        let mut roots = Vec::new();

        for entry in entries {
            if entry.path == entry.parent_path {
                continue;
            }
            if entry.parent_path == root_path || entry.parent_path == collection_root {
                roots.push(entry);
            } else {
                by_parent
                    .entry(entry.parent_path.as_path())
                    .or_default()
                    .push(entry);
            }
        }

        let mut visited = HashSet::new();
        let tree: Vec<FileEntry> = roots
            .into_iter()
            .filter_map(|entry| Self::assemble(entry, &by_parent, &mut visited))
            .collect();

        let dropped = entries.len().saturating_sub(visited.len());
        if dropped > 0 {
            tracing::debug!("Dropped {} entries without a reachable parent", dropped);
        }

        tree
    }

    fn assemble<'a>(
        entry: &'a Entry,
        by_parent: &HashMap<&Utf8Path, Vec<&'a Entry>>,
        visited: &mut HashSet<&'a Utf8Path>,
    ) -> Option<FileEntry> {
        if !visited.insert(entry.path.as_path()) {
            return None;
        }

        let mut node = FileEntry::from(entry);
        if let Some(children) = node.children.as_mut() {
            if let Some(kids) = by_parent.get(entry.path.as_path()) {
                children.extend(
                    kids.iter()
                        .filter_map(|kid| Self::assemble(*kid, by_parent, visited)),
                );
            }
        }
        Some(node)
    }

    /// Orders a tree in place, recursively.
    ///
    /// `SortMode::Date` is not supported yet and leaves the order untouched.
    pub fn sort_tree(entries: &mut [FileEntry], mode: SortMode) {
        match mode {
            SortMode::Name => Self::sort_by_name(entries),
            SortMode::Date => {
                tracing::warn!("Sorting by date is not implemented yet");
            }
        }
    }

    fn sort_by_name(entries: &mut [FileEntry]) {
        entries.sort_by(|a, b| natural_cmp(&a.name, &b.name));
        for entry in entries.iter_mut() {
            if let Some(children) = entry.children.as_mut() {
                Self::sort_by_name(children);
            }
        }
    }

    /// Removes dotfiles and their subtrees unless `show_dotfiles` is set.
    pub fn filter_dotfiles(entries: Vec<FileEntry>, show_dotfiles: bool) -> Vec<FileEntry> {
        if show_dotfiles {
            return entries;
        }
        Self::retain_recursive(entries, &|entry: &FileEntry| !entry.name.starts_with('.'))
    }

    /// Removes entries (and their subtrees) matching the excluded patterns.
    pub fn filter_excluded(
        entries: Vec<FileEntry>,
        excluded: &GlobSet,
        collection_root: &Utf8Path,
    ) -> Vec<FileEntry> {
        if excluded.is_empty() {
            return entries;
        }
        Self::retain_recursive(entries, &|entry: &FileEntry| {
            !is_excluded(excluded, collection_root, &entry.path)
        })
    }

    fn retain_recursive<F>(entries: Vec<FileEntry>, keep: &F) -> Vec<FileEntry>
    where
        F: Fn(&FileEntry) -> bool,
    {
        entries
            .into_iter()
            .filter(|entry| keep(entry))
            .map(|mut entry| {
                entry.children = entry
                    .children
                    .take()
                    .map(|children| Self::retain_recursive(children, keep));
                entry
            })
            .collect()
    }

    /// Pre-order list of every path in the tree.
    pub fn flatten(entries: &[FileEntry]) -> Vec<&Utf8Path> {
        let mut paths = Vec::new();
        Self::flatten_into(entries, &mut paths);
        paths
    }

    fn flatten_into<'a>(entries: &'a [FileEntry], paths: &mut Vec<&'a Utf8Path>) {
        for entry in entries {
            paths.push(entry.path.as_path());
            if let Some(children) = &entry.children {
                Self::flatten_into(children, paths);
            }
        }
    }

    /// Renders the tree as ASCII art below a `root_name/` header line.
    pub fn render_ascii(entries: &[FileEntry], root_name: &str) -> String {
        let mut result = format!("{root_name}/\n");
        Self::render_children(entries, &mut result, "");
        result
    }

    fn render_children(entries: &[FileEntry], result: &mut String, prefix: &str) {
        for (i, node) in entries.iter().enumerate() {
            let is_last = i == entries.len() - 1;

            let connector = if is_last { "└── " } else { "├── " };
            let icon = if node.is_folder() { "📁 " } else { "📄 " };

            result.push_str(&format!("{prefix}{connector}{icon}{}\n", node.name));

            if let Some(children) = node.children.as_deref().filter(|c| !c.is_empty()) {
                let new_prefix = if is_last {
                    format!("{prefix}    ")
                } else {
                    format!("{prefix}│   ")
                };
                Self::render_children(children, result, &new_prefix);
            }
        }
    }
}

/// Case-insensitive, numeric-aware ordering ("Note 2" < "note 10").
///
/// Names that compare equal ignoring case fall back to a byte comparison so
/// the order is total.
pub fn natural_cmp(a: &str, b: &str) -> Ordering {
    let a_lower = a.to_lowercase();
    let b_lower = b.to_lowercase();
    let mut a_chars = a_lower.chars().peekable();
    let mut b_chars = b_lower.chars().peekable();

    loop {
        match (a_chars.peek().copied(), b_chars.peek().copied()) {
            (None, None) => return a.cmp(b),
            (None, Some(_)) => return Ordering::Less,
            (Some(_), None) => return Ordering::Greater,
            (Some(x), Some(y)) if x.is_ascii_digit() && y.is_ascii_digit() => {
                let a_digits = take_digits(&mut a_chars);
                let b_digits = take_digits(&mut b_chars);
                let a_num = a_digits.trim_start_matches('0');
                let b_num = b_digits.trim_start_matches('0');
                let ordering = a_num
                    .len()
                    .cmp(&b_num.len())
                    .then_with(|| a_num.cmp(b_num))
                    .then_with(|| a_digits.len().cmp(&b_digits.len()));
                if ordering != Ordering::Equal {
                    return ordering;
                }
            }
            (Some(x), Some(y)) => {
                if x != y {
                    return x.cmp(&y);
                }
                a_chars.next();
                b_chars.next();
            }
        }
    }
}

fn take_digits<I: Iterator<Item = char>>(chars: &mut std::iter::Peekable<I>) -> String {
    let mut digits = String::new();
    while let Some(c) = chars.next_if(|c| c.is_ascii_digit()) {
        digits.push(c);
    }
    digits
}
