//! Filesystem backing: folders are directories, notes are files.

use async_trait::async_trait;
use camino::{Utf8Path, Utf8PathBuf};
use chrono::{DateTime, Utc};
use std::fs::Metadata;
use std::io::ErrorKind;
use tokio::io::AsyncWriteExt;
use walkdir::WalkDir;

use super::EntryStore;
use crate::config::{DAILY_DIR, HAPTIC_DIR, TRASH_DIR};
use crate::core::naming::NOTE_EXTENSION;
use crate::core::paths::{leaf_name, parent_of};
use crate::core::{CoreError, CoreResult, Disposal, Entry, EntryPatch};

/// Stores a collection as a plain directory tree.
///
/// Listings leave `content` unset; `get` and `notes_matching` read it.
#[derive(Debug, Default, Clone)]
pub struct FsEntryStore;

impl FsEntryStore {
    pub fn new() -> Self {
        Self
    }

    fn entry_from_metadata(path: Utf8PathBuf, metadata: &Metadata, content: Option<String>) -> Entry {
        let updated_at = metadata
            .modified()
            .map(DateTime::<Utc>::from)
            .unwrap_or_else(|_| Utc::now());
        let created_at = metadata
            .created()
            .map(DateTime::<Utc>::from)
            .unwrap_or(updated_at);
        let is_folder = metadata.is_dir();

        Entry {
            name: leaf_name(&path).to_string(),
            parent_path: parent_of(&path).to_path_buf(),
            is_folder,
            content,
            size: if is_folder { 0 } else { metadata.len() },
            created_at,
            updated_at,
            path,
        }
    }

    /// `destination`, or the first free `<stem> (<n>)<ext>` beside it.
    async fn free_destination(destination: &Utf8Path) -> CoreResult<Utf8PathBuf> {
        let parent = parent_of(destination);
        let (stem, extension) = match (destination.file_stem(), destination.extension()) {
            (Some(stem), Some(ext)) => (stem, format!(".{ext}")),
            _ => (leaf_name(destination), String::new()),
        };

        let mut candidate = destination.to_path_buf();
        let mut n = 1;
        while tokio::fs::try_exists(&candidate)
            .await
            .map_err(|e| CoreError::io(e, candidate.clone()))?
        {
            candidate = parent.join(format!("{stem} ({n}){extension}"));
            n += 1;
        }
        Ok(candidate)
    }

    /// Walks `collection` on a blocking thread, keeping entries `keep` accepts.
    async fn walk<F>(collection: &Utf8Path, skip_support_dir: bool, keep: F) -> CoreResult<Vec<Entry>>
    where
        F: Fn(&Utf8Path, &Metadata) -> Option<Option<String>> + Send + 'static,
    {
        let root = collection.to_path_buf();
        if !tokio::fs::try_exists(&root)
            .await
            .map_err(|e| CoreError::io(e, root.clone()))?
        {
            return Err(CoreError::NotFound(root));
        }

        tokio::task::spawn_blocking(move || {
            let support_dir = root.join(HAPTIC_DIR);
            let mut entries = Vec::new();

            for dir_entry in WalkDir::new(&root)
                .min_depth(1)
                .follow_links(false)
                .into_iter()
                .filter_entry(|e| !(skip_support_dir && e.path() == support_dir.as_std_path()))
            {
                let dir_entry = match dir_entry {
                    Ok(entry) => entry,
                    Err(e) => {
                        tracing::warn!("Skipping unreadable entry under {}: {}", root, e);
                        continue;
                    }
                };
                let path = match Utf8PathBuf::from_path_buf(dir_entry.path().to_path_buf()) {
                    Ok(path) => path,
                    Err(path) => {
                        tracing::warn!("Skipping non UTF-8 path {}", path.display());
                        continue;
                    }
                };
                let metadata = match dir_entry.metadata() {
                    Ok(metadata) => metadata,
                    Err(e) => {
                        tracing::warn!("Skipping {}: {}", path, e);
                        continue;
                    }
                };
                if let Some(content) = keep(&path, &metadata) {
                    entries.push(Self::entry_from_metadata(path, &metadata, content));
                }
            }

            entries
        })
        .await
        .map_err(CoreError::from)
    }
}

#[async_trait]
impl EntryStore for FsEntryStore {
    async fn list(&self, parent: &Utf8Path) -> CoreResult<Vec<Entry>> {
        let mut dir = match tokio::fs::read_dir(parent).await {
            Ok(dir) => dir,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                return Err(CoreError::NotFound(parent.to_path_buf()))
            }
            Err(e) => return Err(CoreError::io(e, parent)),
        };

        let mut entries = Vec::new();
        while let Some(dir_entry) = dir
            .next_entry()
            .await
            .map_err(|e| CoreError::io(e, parent))?
        {
            let path = match Utf8PathBuf::from_path_buf(dir_entry.path()) {
                Ok(path) => path,
                Err(path) => {
                    tracing::warn!("Skipping non UTF-8 path {}", path.display());
                    continue;
                }
            };
            let metadata = dir_entry
                .metadata()
                .await
                .map_err(|e| CoreError::io(e, path.clone()))?;
            entries.push(Self::entry_from_metadata(path, &metadata, None));
        }
        Ok(entries)
    }

    async fn get(&self, path: &Utf8Path) -> CoreResult<Option<Entry>> {
        let metadata = match tokio::fs::metadata(path).await {
            Ok(metadata) => metadata,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(CoreError::io(e, path)),
        };

        let content = if metadata.is_dir() {
            None
        } else {
            Some(
                tokio::fs::read_to_string(path)
                    .await
                    .map_err(|e| CoreError::io(e, path))?,
            )
        };
        Ok(Some(Self::entry_from_metadata(
            path.to_path_buf(),
            &metadata,
            content,
        )))
    }

    async fn insert(&self, _collection: &Utf8Path, entry: &Entry) -> CoreResult<()> {
        if entry.is_folder {
            tokio::fs::create_dir(&entry.path)
                .await
                .map_err(|e| CoreError::io(e, entry.path.clone()))?;
        } else {
            let mut file = tokio::fs::OpenOptions::new()
                .write(true)
                .create_new(true)
                .open(&entry.path)
                .await
                .map_err(|e| CoreError::io(e, entry.path.clone()))?;
            let content = entry.content.as_deref().unwrap_or_default();
            file.write_all(content.as_bytes())
                .await
                .map_err(|e| CoreError::io(e, entry.path.clone()))?;
            file.flush()
                .await
                .map_err(|e| CoreError::io(e, entry.path.clone()))?;
        }
        tracing::debug!("Created {}", entry.path);
        Ok(())
    }

    async fn update(&self, path: &Utf8Path, patch: EntryPatch) -> CoreResult<Entry> {
        let mut current = path.to_path_buf();

        if let Some(new_path) = patch.path.as_deref().filter(|p| *p != path) {
            tokio::fs::rename(path, new_path)
                .await
                .map_err(|e| CoreError::io(e, path))?;
            current = new_path.to_path_buf();
        }

        if let Some(content) = &patch.content {
            tokio::fs::write(&current, content)
                .await
                .map_err(|e| CoreError::io(e, current.clone()))?;
        }

        self.get(&current)
            .await?
            .ok_or(CoreError::NotFound(current))
    }

    async fn delete(&self, path: &Utf8Path, disposal: &Disposal) -> CoreResult<()> {
        match disposal {
            Disposal::MoveTo(destination) => {
                let destination = Self::free_destination(destination).await?;
                tokio::fs::rename(path, &destination)
                    .await
                    .map_err(|e| CoreError::io(e, destination.clone()))?;
                tracing::debug!("Moved {} to {}", path, destination);
            }
            Disposal::Delete => {
                let metadata = tokio::fs::metadata(path)
                    .await
                    .map_err(|e| CoreError::io(e, path))?;
                let removed = if metadata.is_dir() {
                    tokio::fs::remove_dir_all(path).await
                } else {
                    tokio::fs::remove_file(path).await
                };
                removed.map_err(|e| CoreError::io(e, path))?;
                tracing::debug!("Removed {}", path);
            }
        }
        Ok(())
    }

    async fn list_by_collection(&self, collection: &Utf8Path) -> CoreResult<Vec<Entry>> {
        Self::walk(collection, false, |_, _| Some(None)).await
    }

    async fn notes_matching(
        &self,
        collection: &Utf8Path,
        query: &str,
        case_sensitive: bool,
    ) -> CoreResult<Vec<Entry>> {
        let needle = if case_sensitive {
            query.to_string()
        } else {
            query.to_lowercase()
        };

        Self::walk(collection, true, move |path, metadata| {
            if !metadata.is_file() || !path.as_str().ends_with(NOTE_EXTENSION) {
                return None;
            }
            let content = match std::fs::read_to_string(path) {
                Ok(content) => content,
                Err(e) => {
                    tracing::debug!("Not searching {}: {}", path, e);
                    return None;
                }
            };
            let found = if case_sensitive {
                content.contains(&needle)
            } else {
                content.to_lowercase().contains(&needle)
            };
            found.then_some(Some(content))
        })
        .await
    }

    async fn prepare_collection(&self, collection: &Utf8Path) -> CoreResult<()> {
        if !tokio::fs::metadata(collection)
            .await
            .map(|metadata| metadata.is_dir())
            .unwrap_or(false)
        {
            return Err(CoreError::NotFound(collection.to_path_buf()));
        }

        let support = collection.join(HAPTIC_DIR);
        for dir in [support.join(TRASH_DIR), support.join(DAILY_DIR)] {
            if !tokio::fs::try_exists(&dir)
                .await
                .map_err(|e| CoreError::io(e, dir.clone()))?
            {
                tokio::fs::create_dir_all(&dir)
                    .await
                    .map_err(|e| CoreError::io(e, dir.clone()))?;
                tracing::info!("Created support folder {}", dir);
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::utils::test_helpers::setup_test_logging;
    use tempfile::TempDir;

    fn temp_collection() -> (TempDir, Utf8PathBuf) {
        let dir = tempfile::tempdir().unwrap();
        let root = Utf8PathBuf::from_path_buf(dir.path().to_path_buf()).unwrap();
        (dir, root)
    }

    #[tokio::test]
    async fn test_insert_get_and_list() {
        setup_test_logging();
        let (_guard, root) = temp_collection();
        let store = FsEntryStore::new();

        store.insert(&root, &Entry::folder(&root, "sub")).await.unwrap();
        store
            .insert(&root, &Entry::note(&root, "a.md", "héllo"))
            .await
            .unwrap();

        let note = store.get(&root.join("a.md")).await.unwrap().unwrap();
        assert_eq!(note.content.as_deref(), Some("héllo"));
        assert_eq!(note.size, "héllo".len() as u64);
        assert!(!note.is_folder);

        let mut names: Vec<_> = store
            .list(&root)
            .await
            .unwrap()
            .into_iter()
            .map(|e| (e.name, e.is_folder))
            .collect();
        names.sort();
        assert_eq!(names, vec![("a.md".to_string(), false), ("sub".to_string(), true)]);

        assert!(store.get(&root.join("missing.md")).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_insert_never_overwrites_a_note() {
        let (_guard, root) = temp_collection();
        let store = FsEntryStore::new();
        store.insert(&root, &Entry::note(&root, "a.md", "one")).await.unwrap();
        assert!(store.insert(&root, &Entry::note(&root, "a.md", "two")).await.is_err());
        let note = store.get(&root.join("a.md")).await.unwrap().unwrap();
        assert_eq!(note.content.as_deref(), Some("one"));
    }

    #[tokio::test]
    async fn test_update_moves_folder_subtree() {
        let (_guard, root) = temp_collection();
        let store = FsEntryStore::new();
        store.insert(&root, &Entry::folder(&root, "f")).await.unwrap();
        store
            .insert(&root, &Entry::note(&root.join("f"), "n.md", "x"))
            .await
            .unwrap();
        store.insert(&root, &Entry::folder(&root, "t")).await.unwrap();

        let target = root.join("t").join("f");
        let moved = store
            .update(&root.join("f"), EntryPatch::relocate(&target))
            .await
            .unwrap();
        assert_eq!(moved.path, target);
        assert_eq!(moved.parent_path, root.join("t"));
        assert!(store.get(&target.join("n.md")).await.unwrap().is_some());
        assert!(store.get(&root.join("f")).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_delete_routes_to_trash_or_removes() {
        let (_guard, root) = temp_collection();
        let store = FsEntryStore::new();
        store.prepare_collection(&root).await.unwrap();
        store.insert(&root, &Entry::note(&root, "a.md", "")).await.unwrap();
        store.insert(&root, &Entry::note(&root, "b.md", "")).await.unwrap();

        let trashed = root.join(HAPTIC_DIR).join(TRASH_DIR).join("a.md");
        store
            .delete(&root.join("a.md"), &Disposal::MoveTo(trashed.clone()))
            .await
            .unwrap();
        assert!(trashed.exists());
        assert!(!root.join("a.md").exists());

        store.delete(&root.join("b.md"), &Disposal::Delete).await.unwrap();
        assert!(!root.join("b.md").exists());
    }

    #[tokio::test]
    async fn test_walks_skip_support_dir_for_search_only() {
        let (_guard, root) = temp_collection();
        let store = FsEntryStore::new();
        store.prepare_collection(&root).await.unwrap();
        store
            .insert(&root, &Entry::note(&root, "a.md", "Hello there"))
            .await
            .unwrap();
        let trash = root.join(HAPTIC_DIR).join(TRASH_DIR);
        store
            .insert(&root, &Entry::note(&trash, "old.md", "hello again"))
            .await
            .unwrap();

        let all = store.list_by_collection(&root).await.unwrap();
        assert!(all.iter().any(|e| e.path == trash.join("old.md")));

        let hits = store.notes_matching(&root, "hello", false).await.unwrap();
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].path, root.join("a.md"));

        assert!(store.notes_matching(&root, "hello", true).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_list_missing_dir_is_not_found() {
        let (_guard, root) = temp_collection();
        let err = FsEntryStore::new().list(&root.join("nope")).await.unwrap_err();
        assert!(matches!(err, CoreError::NotFound(_)));
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_insert_into_read_only_folder_is_io_error() {
        use crate::utils::test_helpers::running_as_root;
        use std::os::unix::fs::PermissionsExt;

        if running_as_root() {
            return;
        }
        setup_test_logging();
        let (_guard, root) = temp_collection();
        let locked = root.join("locked");
        std::fs::create_dir(&locked).unwrap();
        std::fs::set_permissions(&locked, std::fs::Permissions::from_mode(0o555)).unwrap();

        let result = FsEntryStore::new()
            .insert(&root, &Entry::note(&locked, "a.md", "x"))
            .await;

        std::fs::set_permissions(&locked, std::fs::Permissions::from_mode(0o755)).unwrap();
        assert!(matches!(result, Err(CoreError::Io(_, _))));
    }

    #[tokio::test]
    async fn test_trash_collisions_get_numbered() {
        setup_test_logging();
        let (_guard, root) = temp_collection();
        let store = FsEntryStore::new();
        let trash = root.join("trash");
        std::fs::create_dir(&trash).unwrap();

        for folder in ["one", "two"] {
            let dir = root.join(folder);
            store.insert(&root, &Entry::folder(&root, folder)).await.unwrap();
            store.insert(&root, &Entry::note(&dir, "a.md", folder)).await.unwrap();
            store.insert(&root, &Entry::folder(&dir, "sub")).await.unwrap();
            store.insert(&root, &Entry::note(&dir.join("sub"), "x.md", "")).await.unwrap();

            store
                .delete(&dir.join("a.md"), &Disposal::MoveTo(trash.join("a.md")))
                .await
                .unwrap();
            store
                .delete(&dir.join("sub"), &Disposal::MoveTo(trash.join("sub")))
                .await
                .unwrap();
        }

        assert_eq!(std::fs::read_to_string(trash.join("a.md")).unwrap(), "one");
        assert_eq!(std::fs::read_to_string(trash.join("a (1).md")).unwrap(), "two");
        assert!(trash.join("sub").join("x.md").is_file());
        assert!(trash.join("sub (1)").join("x.md").is_file());
    }
}
