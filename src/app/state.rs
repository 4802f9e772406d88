//! Navigation state: the open note and the history of opened notes.

use camino::{Utf8Path, Utf8PathBuf};
use serde::Serialize;

use crate::core::paths::{is_within, rebase};

/// Which note is open, and which notes were opened before it.
///
/// A derived view over the store: it is only changed after the storage
/// mutation it mirrors has succeeded.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NavigationState {
    active_file: Option<Utf8PathBuf>,
    /// Oldest first, never two equal neighbours.
    note_history: Vec<Utf8PathBuf>,
}

impl NavigationState {
    pub fn active_file(&self) -> Option<&Utf8Path> {
        self.active_file.as_deref()
    }

    pub fn note_history(&self) -> &[Utf8PathBuf] {
        &self.note_history
    }

    /// Marks `path` as open, recording it unless `skip_history` is set or it
    /// is already the newest history entry.
    pub fn open(&mut self, path: &Utf8Path, skip_history: bool) {
        self.active_file = Some(path.to_path_buf());
        if !skip_history && self.note_history.last().map(Utf8PathBuf::as_path) != Some(path) {
            self.note_history.push(path.to_path_buf());
        }
    }

    pub fn clear_active(&mut self) {
        self.active_file = None;
    }

    /// Clears the active file when it lives inside `folder`.
    pub fn clear_active_within(&mut self, folder: &Utf8Path) {
        if self.active_file.as_deref().is_some_and(|active| is_within(active, folder)) {
            self.active_file = None;
        }
    }

    /// Rewrites the active file and every history entry below `old_root`
    /// to live below `new_root` instead.
    pub fn remap_prefix(&mut self, old_root: &Utf8Path, new_root: &Utf8Path) {
        if let Some(moved) = self
            .active_file
            .as_deref()
            .and_then(|active| rebase(active, old_root, new_root))
        {
            self.active_file = Some(moved);
        }
        for entry in &mut self.note_history {
            if let Some(moved) = rebase(entry, old_root, new_root) {
                *entry = moved;
            }
        }
        self.note_history.dedup();
    }

    /// The history entry before the newest one, where going back leads.
    pub fn previous(&self) -> Option<&Utf8Path> {
        let len = self.note_history.len();
        (len >= 2).then(|| self.note_history[len - 2].as_path())
    }

    /// Forgets the newest history entry.
    pub fn pop_newest(&mut self) {
        self.note_history.pop();
    }

    pub fn reset(&mut self) {
        *self = Self::default();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn p(path: &str) -> &Utf8Path {
        Utf8Path::new(path)
    }

    #[test]
    fn test_open_skips_consecutive_duplicates() {
        let mut nav = NavigationState::default();
        nav.open(p("/col/a.md"), false);
        nav.open(p("/col/b.md"), false);
        nav.open(p("/col/b.md"), false);
        nav.open(p("/col/a.md"), false);
        assert_eq!(
            nav.note_history(),
            &[
                Utf8PathBuf::from("/col/a.md"),
                Utf8PathBuf::from("/col/b.md"),
                Utf8PathBuf::from("/col/a.md")
            ]
        );
        assert_eq!(nav.active_file(), Some(p("/col/a.md")));
    }

    #[test]
    fn test_skip_history() {
        let mut nav = NavigationState::default();
        nav.open(p("/col/a.md"), true);
        assert!(nav.note_history().is_empty());
        assert_eq!(nav.active_file(), Some(p("/col/a.md")));
    }

    #[test]
    fn test_remap_prefix_moves_active_and_history() {
        let mut nav = NavigationState::default();
        nav.open(p("/col/f/a.md"), false);
        nav.open(p("/col/other.md"), false);
        nav.open(p("/col/f/g/b.md"), false);

        nav.remap_prefix(p("/col/f"), p("/col/t/f"));
        assert_eq!(nav.active_file(), Some(p("/col/t/f/g/b.md")));
        assert_eq!(nav.note_history()[0], Utf8PathBuf::from("/col/t/f/a.md"));
        assert_eq!(nav.note_history()[1], Utf8PathBuf::from("/col/other.md"));
    }

    #[test]
    fn test_clear_active_within_is_component_based() {
        let mut nav = NavigationState::default();
        nav.open(p("/col/fx/a.md"), false);
        nav.clear_active_within(p("/col/f"));
        assert!(nav.active_file().is_some());
        nav.clear_active_within(p("/col/fx"));
        assert!(nav.active_file().is_none());
        assert_eq!(nav.note_history().len(), 1);
    }

    #[test]
    fn test_previous_and_pop() {
        let mut nav = NavigationState::default();
        nav.open(p("/col/a.md"), false);
        assert_eq!(nav.previous(), None);
        nav.open(p("/col/b.md"), false);
        assert_eq!(nav.previous(), Some(p("/col/a.md")));
        nav.pop_newest();
        assert_eq!(nav.note_history(), &[Utf8PathBuf::from("/col/a.md")]);
    }
}
