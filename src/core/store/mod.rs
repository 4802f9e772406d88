//! The storage contract for a collection's folder/note tree.
//!
//! Two backings implement it: [`fs::FsEntryStore`] maps folders to directories
//! and notes to `.md` files, [`sqlite::SqliteEntryStore`] keeps one row per
//! entry. Operations only ever talk to `dyn EntryStore`.

pub mod fs;
pub mod sqlite;

use async_trait::async_trait;
use camino::Utf8Path;

use super::{CoreResult, Disposal, Entry, EntryPatch};

#[async_trait]
pub trait EntryStore: Send + Sync {
    /// Direct children of `parent`.
    async fn list(&self, parent: &Utf8Path) -> CoreResult<Vec<Entry>>;

    /// The entry at `path`, with note content loaded.
    async fn get(&self, path: &Utf8Path) -> CoreResult<Option<Entry>>;

    /// Stores a new entry belonging to `collection`.
    async fn insert(&self, collection: &Utf8Path, entry: &Entry) -> CoreResult<()>;

    /// Applies `patch` to the entry at `path` and returns the updated entry.
    ///
    /// A path change on a folder carries its whole subtree along.
    async fn update(&self, path: &Utf8Path, patch: EntryPatch) -> CoreResult<Entry>;

    /// Removes the entry at `path` and everything below it.
    async fn delete(&self, path: &Utf8Path, disposal: &Disposal) -> CoreResult<()>;

    /// Every entry of `collection`, at any depth.
    async fn list_by_collection(&self, collection: &Utf8Path) -> CoreResult<Vec<Entry>>;

    /// Notes of `collection` whose content contains `query`, content loaded.
    async fn notes_matching(
        &self,
        collection: &Utf8Path,
        query: &str,
        case_sensitive: bool,
    ) -> CoreResult<Vec<Entry>>;

    /// Makes sure the backing has whatever support structure `collection` needs.
    async fn prepare_collection(&self, collection: &Utf8Path) -> CoreResult<()>;
}
