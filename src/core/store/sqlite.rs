//! Relational backing: one row per entry, keyed by path.
//!
//! Also serves as the catalog for the collections it holds, so a single
//! database file carries entries, known collections and their settings.

use async_trait::async_trait;
use camino::{Utf8Path, Utf8PathBuf};
use chrono::{DateTime, Utc};
use rusqlite::functions::FunctionFlags;
use rusqlite::{params, Connection, OptionalExtension};
use std::sync::{Arc, Mutex, MutexGuard};

use super::EntryStore;
use crate::config::CollectionSettings;
use crate::core::catalog::CollectionCatalog;
use crate::core::paths::rebase;
use crate::core::{Collection, CoreError, CoreResult, Disposal, Entry, EntryPatch};

const SCHEMA_SQL: &str = include_str!("schema.sql");

const ENTRY_COLUMNS: &str =
    "path, name, parent_path, is_folder, content, size, created_at, updated_at";

/// Full Unicode lowercasing, registered on every connection. SQLite's own
/// `lower()` and `LIKE` fold ASCII letters only.
const UNICODE_LOWER: &str = "unicode_lower";

/// Clones share one connection.
#[derive(Debug, Clone)]
pub struct SqliteEntryStore {
    conn: Arc<Mutex<Connection>>,
}

impl SqliteEntryStore {
    /// Opens (or creates) the database at `path` and applies the schema.
    pub fn open(path: &Utf8Path) -> CoreResult<Self> {
        if let Some(parent) = path.parent().filter(|p| !p.as_str().is_empty()) {
            std::fs::create_dir_all(parent).map_err(|e| CoreError::io(e, parent))?;
        }
        Self::with_connection(Connection::open(path)?)
    }

    pub fn open_in_memory() -> CoreResult<Self> {
        Self::with_connection(Connection::open_in_memory()?)
    }

    fn with_connection(conn: Connection) -> CoreResult<Self> {
        conn.execute_batch(SCHEMA_SQL)?;
        conn.create_scalar_function(
            UNICODE_LOWER,
            1,
            FunctionFlags::SQLITE_UTF8 | FunctionFlags::SQLITE_DETERMINISTIC,
            |ctx| {
                let text: Option<String> = ctx.get(0)?;
                Ok(text.map(|text| text.to_lowercase()))
            },
        )?;
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    /// Runs `op` on the blocking pool so rusqlite I/O stays off the executor.
    async fn blocking<T, F>(&self, op: F) -> CoreResult<T>
    where
        T: Send + 'static,
        F: FnOnce(&SqliteEntryStore) -> CoreResult<T> + Send + 'static,
    {
        let store = self.clone();
        tokio::task::spawn_blocking(move || op(&store)).await?
    }

    fn lock(&self) -> CoreResult<MutexGuard<'_, Connection>> {
        self.conn
            .lock()
            .map_err(|_| CoreError::Internal("database mutex poisoned".to_string()))
    }

    /// `"<path>/"`, matched against the start of descendant paths.
    fn subtree_prefix(path: &Utf8Path) -> String {
        format!("{}{}", path, std::path::MAIN_SEPARATOR)
    }

    fn list_sync(&self, parent: &Utf8Path) -> CoreResult<Vec<Entry>> {
        let conn = self.lock()?;
        let mut stmt = conn.prepare(&format!(
            "SELECT {ENTRY_COLUMNS} FROM entry WHERE parent_path = ?1 ORDER BY name"
        ))?;
        let entries = stmt
            .query_map([parent.as_str()], parse_entry_row)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(entries)
    }

    fn get_sync(&self, path: &Utf8Path) -> CoreResult<Option<Entry>> {
        let conn = self.lock()?;
        conn.query_row(
            &format!("SELECT {ENTRY_COLUMNS} FROM entry WHERE path = ?1"),
            [path.as_str()],
            parse_entry_row,
        )
        .optional()
        .map_err(CoreError::from)
    }

    fn insert_sync(&self, collection: &Utf8Path, entry: &Entry) -> CoreResult<()> {
        let conn = self.lock()?;
        conn.execute(
            "INSERT INTO entry (
               path, name, parent_path, collection_path, content, is_folder, size, created_at, updated_at
             ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)",
            params![
                entry.path.as_str(),
                entry.name,
                entry.parent_path.as_str(),
                collection.as_str(),
                entry.content,
                entry.is_folder,
                entry.size as i64,
                entry.created_at,
                entry.updated_at,
            ],
        )?;
        tracing::debug!("Inserted row for {}", entry.path);
        Ok(())
    }

    fn update_sync(&self, path: &Utf8Path, patch: EntryPatch) -> CoreResult<Entry> {
        let mut conn = self.lock()?;
        let tx = conn.transaction()?;

        let current = tx
            .query_row(
                &format!("SELECT {ENTRY_COLUMNS} FROM entry WHERE path = ?1"),
                [path.as_str()],
                parse_entry_row,
            )
            .optional()?
            .ok_or_else(|| CoreError::NotFound(path.to_path_buf()))?;

        let target = patch.path.clone().unwrap_or_else(|| current.path.clone());
        let name = patch.name.clone().unwrap_or_else(|| current.name.clone());
        let parent = patch
            .parent_path
            .clone()
            .unwrap_or_else(|| current.parent_path.clone());

        tx.execute(
            "UPDATE entry SET path = ?1, name = ?2, parent_path = ?3 WHERE path = ?4",
            params![target.as_str(), name, parent.as_str(), path.as_str()],
        )?;

        if current.is_folder && target != current.path {
            let prefix = Self::subtree_prefix(path);
            let descendants = {
                let mut stmt = tx.prepare(
                    "SELECT path, parent_path FROM entry WHERE substr(path, 1, length(?1)) = ?1",
                )?;
                let rows = stmt
                    .query_map([prefix.as_str()], |row| {
                        Ok((row.get::<_, String>(0)?, row.get::<_, String>(1)?))
                    })?
                    .collect::<Result<Vec<_>, _>>()?;
                rows
            };

            for (old_path, old_parent) in &descendants {
                let (Some(new_path), Some(new_parent)) = (
                    rebase(Utf8Path::new(old_path), path, &target),
                    rebase(Utf8Path::new(old_parent), path, &target),
                ) else {
                    continue;
                };
                tx.execute(
                    "UPDATE entry SET path = ?1, parent_path = ?2 WHERE path = ?3",
                    params![new_path.as_str(), new_parent.as_str(), old_path],
                )?;
            }
            tracing::debug!("Re-keyed {} rows below {}", descendants.len(), path);
        }

        if let Some(content) = &patch.content {
            let size = patch.size.unwrap_or(content.len() as u64);
            let updated_at = patch.updated_at.unwrap_or_else(Utc::now);
            tx.execute(
                "UPDATE entry SET content = ?1, size = ?2, updated_at = ?3 WHERE path = ?4",
                params![content, size as i64, updated_at, target.as_str()],
            )?;
        }

        let updated = tx.query_row(
            &format!("SELECT {ENTRY_COLUMNS} FROM entry WHERE path = ?1"),
            [target.as_str()],
            parse_entry_row,
        )?;
        tx.commit()?;
        Ok(updated)
    }

    fn delete_sync(&self, path: &Utf8Path, disposal: &Disposal) -> CoreResult<()> {
        if let Disposal::MoveTo(destination) = disposal {
            tracing::debug!(
                "Rows are not moved to {}; deleting {} permanently",
                destination,
                path
            );
        }
        let conn = self.lock()?;
        let removed = conn.execute(
            "DELETE FROM entry WHERE path = ?1 OR substr(path, 1, length(?2)) = ?2",
            params![path.as_str(), Self::subtree_prefix(path)],
        )?;
        tracing::debug!("Deleted {} rows for {}", removed, path);
        Ok(())
    }

    fn list_by_collection_sync(&self, collection: &Utf8Path) -> CoreResult<Vec<Entry>> {
        let conn = self.lock()?;
        let mut stmt = conn.prepare(&format!(
            "SELECT {ENTRY_COLUMNS} FROM entry WHERE collection_path = ?1"
        ))?;
        let entries = stmt
            .query_map([collection.as_str()], parse_entry_row)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(entries)
    }

    fn notes_matching_sync(
        &self,
        collection: &Utf8Path,
        query: &str,
        case_sensitive: bool,
    ) -> CoreResult<Vec<Entry>> {
        let conn = self.lock()?;
        let (filter, needle) = if case_sensitive {
            ("instr(content, ?2) > 0".to_string(), query.to_string())
        } else {
            (
                format!("instr({UNICODE_LOWER}(content), ?2) > 0"),
                query.to_lowercase(),
            )
        };
        let mut stmt = conn.prepare(&format!(
            "SELECT {ENTRY_COLUMNS} FROM entry
             WHERE collection_path = ?1 AND is_folder = 0 AND {filter}"
        ))?;
        let entries = stmt
            .query_map(params![collection.as_str(), needle], parse_entry_row)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(entries)
    }

    fn record_opened_sync(&self, collection: &Utf8Path) -> CoreResult<Collection> {
        let record = Collection::opened_now(collection);
        let conn = self.lock()?;
        conn.execute(
            "INSERT INTO collection (path, name, last_opened) VALUES (?1, ?2, ?3)
             ON CONFLICT(path) DO UPDATE SET name = excluded.name, last_opened = excluded.last_opened",
            params![record.path.as_str(), record.name, record.last_opened],
        )?;
        Ok(record)
    }

    fn list_collections_sync(&self) -> CoreResult<Vec<Collection>> {
        let conn = self.lock()?;
        let mut stmt =
            conn.prepare("SELECT path, name, last_opened FROM collection ORDER BY last_opened")?;
        let collections = stmt
            .query_map([], |row| {
                Ok(Collection {
                    path: Utf8PathBuf::from(row.get::<_, String>(0)?),
                    name: row.get(1)?,
                    last_opened: row.get::<_, DateTime<Utc>>(2)?,
                })
            })?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(collections)
    }

    fn load_settings_sync(&self, collection: &Utf8Path) -> CoreResult<Option<CollectionSettings>> {
        let conn = self.lock()?;
        let raw: Option<String> = conn
            .query_row(
                "SELECT settings_json FROM collection_settings WHERE collection_path = ?1",
                [collection.as_str()],
                |row| row.get(0),
            )
            .optional()?;

        Ok(raw.and_then(|raw| match serde_json::from_str(&raw) {
            Ok(settings) => Some(settings),
            Err(e) => {
                tracing::warn!("Ignoring malformed settings for {}: {}", collection, e);
                None
            }
        }))
    }

    fn save_settings_sync(
        &self,
        collection: &Utf8Path,
        settings: &CollectionSettings,
    ) -> CoreResult<()> {
        let json = serde_json::to_string(settings)?;
        let conn = self.lock()?;
        conn.execute(
            "INSERT INTO collection_settings (collection_path, settings_json) VALUES (?1, ?2)
             ON CONFLICT(collection_path) DO UPDATE SET settings_json = excluded.settings_json",
            params![collection.as_str(), json],
        )?;
        Ok(())
    }
}

fn parse_entry_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Entry> {
    Ok(Entry {
        path: Utf8PathBuf::from(row.get::<_, String>(0)?),
        name: row.get(1)?,
        parent_path: Utf8PathBuf::from(row.get::<_, String>(2)?),
        is_folder: row.get(3)?,
        content: row.get(4)?,
        size: row.get::<_, i64>(5)?.max(0) as u64,
        created_at: row.get(6)?,
        updated_at: row.get(7)?,
    })
}

#[async_trait]
impl EntryStore for SqliteEntryStore {
    async fn list(&self, parent: &Utf8Path) -> CoreResult<Vec<Entry>> {
        let parent = parent.to_path_buf();
        self.blocking(move |store| store.list_sync(&parent)).await
    }

    async fn get(&self, path: &Utf8Path) -> CoreResult<Option<Entry>> {
        let path = path.to_path_buf();
        self.blocking(move |store| store.get_sync(&path)).await
    }

    async fn insert(&self, collection: &Utf8Path, entry: &Entry) -> CoreResult<()> {
        let collection = collection.to_path_buf();
        let entry = entry.clone();
        self.blocking(move |store| store.insert_sync(&collection, &entry))
            .await
    }

    async fn update(&self, path: &Utf8Path, patch: EntryPatch) -> CoreResult<Entry> {
        let path = path.to_path_buf();
        self.blocking(move |store| store.update_sync(&path, patch)).await
    }

    async fn delete(&self, path: &Utf8Path, disposal: &Disposal) -> CoreResult<()> {
        let path = path.to_path_buf();
        let disposal = disposal.clone();
        self.blocking(move |store| store.delete_sync(&path, &disposal))
            .await
    }

    async fn list_by_collection(&self, collection: &Utf8Path) -> CoreResult<Vec<Entry>> {
        let collection = collection.to_path_buf();
        self.blocking(move |store| store.list_by_collection_sync(&collection))
            .await
    }

    async fn notes_matching(
        &self,
        collection: &Utf8Path,
        query: &str,
        case_sensitive: bool,
    ) -> CoreResult<Vec<Entry>> {
        let collection = collection.to_path_buf();
        let query = query.to_string();
        self.blocking(move |store| store.notes_matching_sync(&collection, &query, case_sensitive))
            .await
    }

    async fn prepare_collection(&self, _collection: &Utf8Path) -> CoreResult<()> {
        Ok(())
    }
}

#[async_trait]
impl CollectionCatalog for SqliteEntryStore {
    async fn record_opened(&self, collection: &Utf8Path) -> CoreResult<Collection> {
        let collection = collection.to_path_buf();
        self.blocking(move |store| store.record_opened_sync(&collection))
            .await
    }

    async fn list_collections(&self) -> CoreResult<Vec<Collection>> {
        self.blocking(|store| store.list_collections_sync()).await
    }

    async fn load_settings(&self, collection: &Utf8Path) -> CoreResult<Option<CollectionSettings>> {
        let collection = collection.to_path_buf();
        self.blocking(move |store| store.load_settings_sync(&collection))
            .await
    }

    async fn save_settings(
        &self,
        collection: &Utf8Path,
        settings: &CollectionSettings,
    ) -> CoreResult<()> {
        let collection = collection.to_path_buf();
        let settings = settings.clone();
        self.blocking(move |store| store.save_settings_sync(&collection, &settings))
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::TrashDir;

    const COL: &str = "/col";

    async fn seeded() -> SqliteEntryStore {
        let store = SqliteEntryStore::open_in_memory().unwrap();
        let col = Utf8Path::new(COL);
        store.insert(col, &Entry::folder(col, "f")).await.unwrap();
        store.insert(col, &Entry::folder(&col.join("f"), "g")).await.unwrap();
        store
            .insert(col, &Entry::note(&col.join("f/g"), "deep.md", "x"))
            .await
            .unwrap();
        store
            .insert(col, &Entry::note(col, "a.md", "Hello World\nbye"))
            .await
            .unwrap();
        store.insert(col, &Entry::folder(col, "fx")).await.unwrap();
        store
    }

    #[tokio::test]
    async fn test_list_and_get() {
        let store = seeded().await;
        let names: Vec<_> = store
            .list(Utf8Path::new(COL))
            .await
            .unwrap()
            .into_iter()
            .map(|e| e.name)
            .collect();
        assert_eq!(names, vec!["a.md", "f", "fx"]);

        let note = store.get(Utf8Path::new("/col/a.md")).await.unwrap().unwrap();
        assert_eq!(note.size, "Hello World\nbye".len() as u64);
        assert_eq!(store.list_by_collection(Utf8Path::new(COL)).await.unwrap().len(), 5);
    }

    #[tokio::test]
    async fn test_folder_move_rekeys_subtree_only() {
        let store = seeded().await;
        let target = Utf8Path::new("/col/fx/f");
        store
            .update(Utf8Path::new("/col/f"), EntryPatch::relocate(target))
            .await
            .unwrap();

        let deep = store
            .get(Utf8Path::new("/col/fx/f/g/deep.md"))
            .await
            .unwrap()
            .unwrap();
        assert_eq!(deep.parent_path, Utf8PathBuf::from("/col/fx/f/g"));
        assert!(store.get(Utf8Path::new("/col/f/g")).await.unwrap().is_none());
        // A sibling sharing the name prefix is untouched.
        assert!(store.get(Utf8Path::new("/col/fx")).await.unwrap().is_some());
    }

    #[tokio::test]
    async fn test_content_update_sets_size() {
        let store = seeded().await;
        let updated = store
            .update(Utf8Path::new("/col/a.md"), EntryPatch::content("é".to_string()))
            .await
            .unwrap();
        assert_eq!(updated.size, 2);
        assert_eq!(updated.content.as_deref(), Some("é"));
    }

    #[tokio::test]
    async fn test_delete_cascades() {
        let store = seeded().await;
        store
            .delete(Utf8Path::new("/col/f"), &Disposal::Delete)
            .await
            .unwrap();
        let left: Vec<_> = store
            .list_by_collection(Utf8Path::new(COL))
            .await
            .unwrap()
            .into_iter()
            .map(|e| e.path.to_string())
            .collect();
        assert_eq!(left.len(), 2);
        assert!(left.iter().all(|p| !p.starts_with("/col/f/")));
    }

    #[tokio::test]
    async fn test_notes_matching_case_modes_and_wildcards() {
        let store = seeded().await;
        let col = Utf8Path::new(COL);
        assert_eq!(store.notes_matching(col, "hello", false).await.unwrap().len(), 1);
        assert!(store.notes_matching(col, "hello", true).await.unwrap().is_empty());
        assert!(store.notes_matching(col, "%", false).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_notes_matching_folds_non_ascii_case() {
        let store = SqliteEntryStore::open_in_memory().unwrap();
        let col = Utf8Path::new(COL);
        store
            .insert(col, &Entry::note(col, "fr.md", "une école ici"))
            .await
            .unwrap();

        assert_eq!(store.notes_matching(col, "ÉCOLE", false).await.unwrap().len(), 1);
        assert!(store.notes_matching(col, "ÉCOLE", true).await.unwrap().is_empty());
        assert_eq!(store.notes_matching(col, "école", true).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_clones_share_the_connection() {
        let store = SqliteEntryStore::open_in_memory().unwrap();
        let other = store.clone();
        let col = Utf8Path::new(COL);
        store.insert(col, &Entry::folder(col, "shared")).await.unwrap();
        assert!(other.get(&col.join("shared")).await.unwrap().is_some());
    }

    #[tokio::test]
    async fn test_catalog_upserts() {
        let store = SqliteEntryStore::open_in_memory().unwrap();
        let col = Utf8Path::new(COL);
        store.record_opened(col).await.unwrap();
        store.record_opened(col).await.unwrap();
        assert_eq!(store.list_collections().await.unwrap().len(), 1);

        assert_eq!(store.load_settings(col).await.unwrap(), None);
        let mut settings = CollectionSettings::default();
        settings.notes.trash_dir = TrashDir::Haptic;
        store.save_settings(col, &settings).await.unwrap();
        settings.notes.excluded_files.push("*.tmp".to_string());
        store.save_settings(col, &settings).await.unwrap();
        assert_eq!(store.load_settings(col).await.unwrap(), Some(settings));
    }

    #[test]
    fn test_open_file_backed_database() {
        let dir = tempfile::tempdir().unwrap();
        let path = Utf8PathBuf::from_path_buf(dir.path().join("nested/haptic.db")).unwrap();
        assert!(SqliteEntryStore::open(&path).is_ok());
        assert!(path.exists());
    }
}
