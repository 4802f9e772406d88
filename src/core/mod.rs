pub mod catalog;
pub mod error;
pub mod ignore;
pub mod naming;
pub mod paths;
pub mod search;
pub mod store;
pub mod trash;
pub mod tree_builder;

use camino::{Utf8Path, Utf8PathBuf};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A folder or a note inside a collection.
///
/// `content` is only meaningful for notes. Listings from the filesystem
/// backing leave it `None`; `EntryStore::get` always loads it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Entry {
    pub path: Utf8PathBuf,
    pub name: String,
    pub parent_path: Utf8PathBuf,
    pub is_folder: bool,
    pub content: Option<String>,
    pub size: u64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Entry {
    /// A new, empty folder named `name` under `parent`.
    pub fn folder(parent: &Utf8Path, name: &str) -> Self {
        let now = Utc::now();
        Self {
            path: parent.join(name),
            name: name.to_string(),
            parent_path: parent.to_path_buf(),
            is_folder: true,
            content: None,
            size: 0,
            created_at: now,
            updated_at: now,
        }
    }

    /// A new note named `name` under `parent` holding `content`.
    pub fn note(parent: &Utf8Path, name: &str, content: &str) -> Self {
        let now = Utc::now();
        Self {
            path: parent.join(name),
            name: name.to_string(),
            parent_path: parent.to_path_buf(),
            is_folder: false,
            content: Some(content.to_string()),
            size: content.len() as u64,
            created_at: now,
            updated_at: now,
        }
    }

    /// Dotfile convention: hidden by default, but still stored.
    pub fn is_excluded(&self) -> bool {
        self.name.starts_with('.')
    }
}

/// A partial update applied through `EntryStore::update`.
///
/// Changing `path` on a folder relocates its whole subtree.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EntryPatch {
    pub path: Option<Utf8PathBuf>,
    pub parent_path: Option<Utf8PathBuf>,
    pub name: Option<String>,
    pub content: Option<String>,
    pub size: Option<u64>,
    pub updated_at: Option<DateTime<Utc>>,
}

impl EntryPatch {
    /// Moves or renames an entry to `new_path`, deriving name and parent from it.
    pub fn relocate(new_path: &Utf8Path) -> Self {
        Self {
            path: Some(new_path.to_path_buf()),
            parent_path: new_path.parent().map(Utf8Path::to_path_buf),
            name: new_path.file_name().map(str::to_string),
            ..Default::default()
        }
    }

    /// Replaces a note body, recomputing the UTF-8 byte size and touching `updated_at`.
    pub fn content(content: String) -> Self {
        Self {
            size: Some(content.len() as u64),
            content: Some(content),
            updated_at: Some(Utc::now()),
            ..Default::default()
        }
    }

    pub fn changes_location(&self) -> bool {
        self.path.is_some()
    }
}

/// Structural projection of an `Entry` used for tree rendering.
///
/// `children` is present (possibly empty) iff the source is a folder.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileEntry {
    pub path: Utf8PathBuf,
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub children: Option<Vec<FileEntry>>,
}

impl FileEntry {
    pub fn is_folder(&self) -> bool {
        self.children.is_some()
    }
}

impl From<&Entry> for FileEntry {
    fn from(entry: &Entry) -> Self {
        Self {
            path: entry.path.clone(),
            name: entry.name.clone(),
            children: entry.is_folder.then(Vec::new),
        }
    }
}

/// One matching line of one note, with up to one line of context on each side.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SearchResult {
    pub path: Utf8PathBuf,
    pub context_preview: String,
}

/// Ordering applied to a collection tree.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortMode {
    #[default]
    Name,
    /// Accepted but not supported yet; sorting by date leaves the order untouched.
    Date,
}

/// A known collection as recorded in the catalog.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Collection {
    pub path: Utf8PathBuf,
    pub name: String,
    pub last_opened: DateTime<Utc>,
}

impl Collection {
    /// A record for `path`, stamped as opened now.
    pub fn opened_now(path: &Utf8Path) -> Self {
        Self {
            path: path.to_path_buf(),
            name: paths::leaf_name(path).to_string(),
            last_opened: Utc::now(),
        }
    }
}

pub use catalog::{CollectionCatalog, FsCatalog};
pub use error::{CoreError, CoreResult};
pub use ignore::build_globset_from_patterns;
pub use search::{SearchEngine, SearchOptions};
pub use store::{fs::FsEntryStore, sqlite::SqliteEntryStore, EntryStore};
pub use trash::{Disposal, TrashDir, TrashRouter};
pub use tree_builder::TreeBuilder;
