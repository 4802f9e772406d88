//! Collection-level operations: opening, settings, the tree view and search.

use camino::Utf8Path;

use super::session::Session;
use crate::config::CollectionSettings;
use crate::core::paths::is_within;
use crate::core::{
    Collection, CoreResult, Entry, FileEntry, SearchEngine, SearchOptions, SearchResult, SortMode,
    TreeBuilder,
};

impl Session {
    /// Makes `path` the active collection.
    ///
    /// Prepares the backing's support structure, loads the collection
    /// settings (writing defaults when absent or unreadable), records the
    /// collection in the catalog and resets navigation.
    pub async fn open_collection(&mut self, path: &Utf8Path) -> CoreResult<Collection> {
        self.store.prepare_collection(path).await?;

        let settings = match self.catalog.load_settings(path).await? {
            Some(settings) => settings,
            None => {
                let defaults = CollectionSettings::default();
                self.catalog.save_settings(path, &defaults).await?;
                defaults
            }
        };
        let record = self.catalog.record_opened(path).await?;

        self.collection = Some(path.to_path_buf());
        self.navigation.reset();
        self.apply_settings(path, settings);
        tracing::info!("Opened collection {}", path);
        Ok(record)
    }

    /// All collections known to the catalog, oldest opening first.
    pub async fn list_collections(&self) -> CoreResult<Vec<Collection>> {
        self.catalog.list_collections().await
    }

    /// Persists new settings for the open collection and applies them.
    pub async fn update_collection_settings(&mut self, settings: CollectionSettings) -> CoreResult<()> {
        let collection = self.collection()?.to_path_buf();
        self.catalog.save_settings(&collection, &settings).await?;
        self.apply_settings(&collection, settings);
        tracing::info!("Updated settings of {}", collection);
        Ok(())
    }

    /// The sorted, filtered tree below `dir` (the collection root by default).
    ///
    /// Dotfiles are hidden unless `show_dotfiles`; entries matching the
    /// collection's `excluded_files` are always hidden.
    pub async fn fetch_collection_entries(
        &self,
        dir: Option<&Utf8Path>,
        sort: SortMode,
        show_dotfiles: bool,
    ) -> CoreResult<Vec<FileEntry>> {
        let collection = self.collection()?;
        let root = dir.unwrap_or(collection);

        let entries: Vec<Entry> = self
            .store
            .list_by_collection(collection)
            .await?
            .into_iter()
            .filter(|entry| entry.path.as_path() != root && is_within(&entry.path, root))
            .collect();

        let mut tree = TreeBuilder::build_tree(&entries, root, collection);
        TreeBuilder::sort_tree(&mut tree, sort);
        let tree = TreeBuilder::filter_dotfiles(tree, show_dotfiles);
        let tree = TreeBuilder::filter_excluded(tree, &self.excluded, collection);
        tracing::debug!("Built tree for {} from {} entries", root, entries.len());
        Ok(tree)
    }

    /// Searches note content in the open collection.
    ///
    /// Each matching line of each note yields one result with one line of
    /// context on either side.
    pub async fn search_entries(
        &self,
        query: &str,
        case_sensitive: bool,
        match_word: bool,
    ) -> CoreResult<Vec<SearchResult>> {
        let collection = self.collection()?;
        if query.is_empty() {
            return Ok(Vec::new());
        }

        let notes = self
            .store
            .notes_matching(collection, query, case_sensitive)
            .await?;
        let options = SearchOptions {
            case_sensitive,
            match_word,
        };
        Ok(SearchEngine::search_notes(
            &notes,
            query,
            options,
            &self.excluded,
            collection,
        ))
    }
}
