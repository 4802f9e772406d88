//! Note operations: create, open, save, rename, move, duplicate, delete.

use camino::{Utf8Path, Utf8PathBuf};
use chrono::{DateTime, Utc};
use serde::Serialize;

use super::session::Session;
use crate::core::naming::{
    check_conflict, duplicate_note_name, next_untitled_name, sanitize_note_name, validate_name,
    NOTE_EXTENSION, UNTITLED_PREFIX,
};
use crate::core::{CoreError, CoreResult, Entry, EntryPatch};
use crate::utils::calculate_reading_time;

/// Storage and editor facts about one note.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NoteMetadata {
    pub path: Utf8PathBuf,
    pub size: u64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub words: usize,
    pub characters: usize,
    pub avg_reading_time: String,
}

/// Drops a leading `# <title>` line, which the editor shows as the inline title.
fn strip_inline_title(markdown: &str) -> &str {
    match markdown.strip_prefix("# ") {
        Some(rest) => match rest.find('\n') {
            Some(end) => &rest[end + 1..],
            None => markdown,
        },
        None => markdown,
    }
}

impl Session {
    /// Creates an empty note in `dir` and opens it.
    ///
    /// Without `name` the next free `Untitled` name is used. An explicit name
    /// is sanitized and must not clash with a sibling note.
    pub async fn create_note(&mut self, dir: &Utf8Path, name: Option<&str>) -> CoreResult<Utf8PathBuf> {
        let collection = self.collection()?.to_path_buf();
        let siblings = self.siblings_for_new_entry(dir).await?;

        let name = match name {
            Some(requested) => {
                let name = sanitize_note_name(requested);
                validate_name(&name)?;
                if check_conflict(&siblings, &name, false) {
                    return Err(CoreError::NameConflict {
                        name,
                        parent: dir.to_path_buf(),
                    });
                }
                name
            }
            None => next_untitled_name(
                siblings.iter().map(|entry| entry.name.as_str()),
                UNTITLED_PREFIX,
                NOTE_EXTENSION,
            ),
        };

        let note = Entry::note(dir, &name, "");
        self.store.insert(&collection, &note).await?;
        tracing::info!("Created note {}", note.path);

        self.open_note(&note.path, false).await?;
        Ok(note.path)
    }

    /// Loads the note into the editor and makes it the active file.
    pub async fn open_note(&mut self, path: &Utf8Path, skip_history: bool) -> CoreResult<()> {
        let note = self.require_note(path).await?;
        self.editor
            .set_content(note.content.as_deref().unwrap_or_default());
        self.editor.focus();
        self.navigation.open(path, skip_history);
        tracing::debug!("Opened {}", path);
        Ok(())
    }

    /// Writes the editor's content to the note, without the inline title line.
    pub async fn save_note(&mut self, path: &Utf8Path) -> CoreResult<Entry> {
        self.require_note(path).await?;
        let markdown = self.editor.get_markdown();
        let content = strip_inline_title(&markdown).to_string();
        let saved = self.store.update(path, EntryPatch::content(content)).await?;
        tracing::debug!("Saved {} ({} bytes)", path, saved.size);
        Ok(saved)
    }

    /// Deletes the note according to the trash policy. No note stays active.
    pub async fn delete_note(&mut self, path: &Utf8Path) -> CoreResult<()> {
        self.require_note(path).await?;
        let disposal = self.trash_router()?.disposal_for(path);
        self.store.delete(path, &disposal).await?;
        self.navigation.clear_active();
        tracing::info!("Deleted note {} ({:?})", path, disposal);
        Ok(())
    }

    /// Renames the note in place. `new_name` is sanitized first.
    pub async fn rename_note(&mut self, path: &Utf8Path, new_name: &str) -> CoreResult<Utf8PathBuf> {
        let note = self.require_note(path).await?;
        let name = sanitize_note_name(new_name);
        validate_name(&name)?;

        let siblings: Vec<Entry> = self
            .store
            .list(&note.parent_path)
            .await?
            .into_iter()
            .filter(|sibling| sibling.path.as_path() != path)
            .collect();
        if check_conflict(&siblings, &name, false) {
            return Err(CoreError::NameConflict {
                name,
                parent: note.parent_path,
            });
        }

        let new_path = note.parent_path.join(&name);
        self.store
            .update(path, EntryPatch::relocate(&new_path))
            .await?;
        self.navigation.remap_prefix(path, &new_path);
        tracing::info!("Renamed note {} to {}", path, new_path);
        Ok(new_path)
    }

    /// Moves the note into the folder `target` and opens it there.
    pub async fn move_note(&mut self, source: &Utf8Path, target: &Utf8Path) -> CoreResult<Utf8PathBuf> {
        let note = self.require_note(source).await?;
        let children = self.children_of(target).await?;
        if check_conflict(&children, &note.name, false) {
            return Err(CoreError::NameConflict {
                name: note.name,
                parent: target.to_path_buf(),
            });
        }

        let new_path = target.join(&note.name);
        self.store
            .update(source, EntryPatch::relocate(&new_path))
            .await?;
        self.navigation.remap_prefix(source, &new_path);
        tracing::info!("Moved note {} to {}", source, new_path);

        self.open_note(&new_path, false).await?;
        Ok(new_path)
    }

    /// Copies the note next to itself as `<base> (<n>).<ext>` and opens the copy.
    pub async fn duplicate_note(&mut self, path: &Utf8Path) -> CoreResult<Utf8PathBuf> {
        let collection = self.collection()?.to_path_buf();
        let note = self.require_note(path).await?;
        let siblings = self.store.list(&note.parent_path).await?;
        let name = duplicate_note_name(&note.name, &siblings);

        let copy = Entry::note(
            &note.parent_path,
            &name,
            note.content.as_deref().unwrap_or_default(),
        );
        self.store.insert(&collection, &copy).await?;
        tracing::info!("Duplicated {} as {}", path, copy.path);

        self.open_note(&copy.path, false).await?;
        Ok(copy.path)
    }

    /// File facts from the store plus word and character counts from the editor.
    pub async fn note_metadata(&self, path: &Utf8Path) -> CoreResult<NoteMetadata> {
        let note = self.require_note(path).await?;
        let words = self.editor.word_count();
        Ok(NoteMetadata {
            path: note.path,
            size: note.size,
            created_at: note.created_at,
            updated_at: note.updated_at,
            words,
            characters: self.editor.character_count(),
            avg_reading_time: calculate_reading_time(words),
        })
    }

    /// Reopens the note before the newest history entry, without recording it again.
    ///
    /// Returns `None` when there is nothing to go back to.
    pub async fn navigate_back(&mut self) -> CoreResult<Option<Utf8PathBuf>> {
        let Some(previous) = self.navigation.previous().map(Utf8Path::to_path_buf) else {
            return Ok(None);
        };
        self.open_note(&previous, true).await?;
        self.navigation.pop_newest();
        Ok(Some(previous))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_strip_inline_title() {
        assert_eq!(strip_inline_title("# Title\nbody"), "body");
        assert_eq!(strip_inline_title("# Title\n# Second\nbody"), "# Second\nbody");
        assert_eq!(strip_inline_title("## Sub\nbody"), "## Sub\nbody");
        assert_eq!(strip_inline_title("# Only a title"), "# Only a title");
        assert_eq!(strip_inline_title("body\n# Late"), "body\n# Late");
    }
}
