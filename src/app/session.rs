//! The session: explicit context every entry operation runs against.

use camino::{Utf8Path, Utf8PathBuf};
use globset::GlobSet;
use std::sync::Arc;

use super::editor::Editor;
use super::state::NavigationState;
use crate::config::CollectionSettings;
use crate::core::trash::platform_trash_dir;
use crate::core::{
    build_globset_from_patterns, CollectionCatalog, CoreError, CoreResult, Entry, EntryStore,
    TrashRouter,
};

/// Owns everything an operation needs: the backing store, the catalog, the
/// editor, the open collection with its settings, and navigation state.
///
/// One caller drives a session at a time; independent sessions do not share
/// any state besides what their stores share.
pub struct Session {
    pub(super) store: Arc<dyn EntryStore>,
    pub(super) catalog: Arc<dyn CollectionCatalog>,
    pub(super) editor: Box<dyn Editor>,
    pub(super) collection: Option<Utf8PathBuf>,
    pub(super) settings: CollectionSettings,
    pub(super) excluded: GlobSet,
    pub(super) system_trash: Option<Utf8PathBuf>,
    pub(super) trash: Option<TrashRouter>,
    pub(super) navigation: NavigationState,
}

impl Session {
    /// A session without an open collection. The platform trash folder is
    /// looked up once, here.
    pub fn new(
        store: Arc<dyn EntryStore>,
        catalog: Arc<dyn CollectionCatalog>,
        editor: Box<dyn Editor>,
    ) -> Self {
        Self {
            store,
            catalog,
            editor,
            collection: None,
            settings: CollectionSettings::default(),
            excluded: GlobSet::empty(),
            system_trash: platform_trash_dir(),
            trash: None,
            navigation: NavigationState::default(),
        }
    }

    /// Replaces the system trash location used by the `system` policy.
    pub fn with_system_trash(mut self, system_trash: Option<Utf8PathBuf>) -> Self {
        self.system_trash = system_trash;
        self
    }

    /// Root of the open collection.
    pub fn collection(&self) -> CoreResult<&Utf8Path> {
        self.collection.as_deref().ok_or(CoreError::NoCollection)
    }

    pub fn settings(&self) -> &CollectionSettings {
        &self.settings
    }

    pub fn navigation(&self) -> &NavigationState {
        &self.navigation
    }

    pub fn active_file(&self) -> Option<&Utf8Path> {
        self.navigation.active_file()
    }

    pub fn note_history(&self) -> &[Utf8PathBuf] {
        self.navigation.note_history()
    }

    pub fn editor(&self) -> &dyn Editor {
        self.editor.as_ref()
    }

    pub fn editor_mut(&mut self) -> &mut dyn Editor {
        self.editor.as_mut()
    }

    pub fn store(&self) -> &dyn EntryStore {
        self.store.as_ref()
    }

    pub(super) fn trash_router(&self) -> CoreResult<&TrashRouter> {
        self.trash.as_ref().ok_or(CoreError::NoCollection)
    }

    /// Installs `settings` for the open collection and re-resolves the
    /// derived exclusion set and trash routing.
    pub(super) fn apply_settings(&mut self, collection: &Utf8Path, settings: CollectionSettings) {
        self.excluded = build_globset_from_patterns(&settings.notes.excluded_files);
        self.trash = Some(TrashRouter::new(
            settings.notes.trash_dir,
            collection,
            self.system_trash.clone(),
        ));
        self.settings = settings;
    }

    /// Loads `path` and fails unless it is a note.
    pub(super) async fn require_note(&self, path: &Utf8Path) -> CoreResult<Entry> {
        match self.store.get(path).await? {
            Some(entry) if !entry.is_folder => Ok(entry),
            Some(_) => Err(CoreError::NotANote(path.to_path_buf())),
            None => Err(CoreError::NotFound(path.to_path_buf())),
        }
    }

    /// Loads `path` and fails unless it is a folder.
    pub(super) async fn require_folder(&self, path: &Utf8Path) -> CoreResult<Entry> {
        match self.store.get(path).await? {
            Some(entry) if entry.is_folder => Ok(entry),
            Some(_) => Err(CoreError::NotAFolder(path.to_path_buf())),
            None => Err(CoreError::NotFound(path.to_path_buf())),
        }
    }

    /// Siblings a new entry created in `dir` is named against. A `dir` not
    /// stored as an entry falls back to the collection root.
    pub(super) async fn siblings_for_new_entry(&self, dir: &Utf8Path) -> CoreResult<Vec<Entry>> {
        let collection = self.collection()?;
        match self.store.get(dir).await? {
            Some(entry) if entry.is_folder => self.store.list(dir).await,
            Some(_) => Err(CoreError::NotAFolder(dir.to_path_buf())),
            None => self.store.list(collection).await,
        }
    }

    /// Children of `dir`, which is either the collection root or an existing folder.
    pub(super) async fn children_of(&self, dir: &Utf8Path) -> CoreResult<Vec<Entry>> {
        if dir != self.collection()? {
            self.require_folder(dir).await?;
        }
        self.store.list(dir).await
    }
}
