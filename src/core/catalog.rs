//! Bookkeeping around collections: which ones are known, and their settings.

use async_trait::async_trait;
use camino::{Utf8Path, Utf8PathBuf};
use std::io::ErrorKind;

use super::{Collection, CoreError, CoreResult};
use crate::config::settings::parse_or_default;
use crate::config::{CollectionSettings, COLLECTION_SETTINGS_FILE, HAPTIC_DIR};

/// File in the application data directory listing known collections.
pub const CATALOG_FILE: &str = "collections.json";

#[async_trait]
pub trait CollectionCatalog: Send + Sync {
    /// Upserts `collection` by path, stamped as opened now.
    async fn record_opened(&self, collection: &Utf8Path) -> CoreResult<Collection>;

    async fn list_collections(&self) -> CoreResult<Vec<Collection>>;

    /// Stored settings for `collection`; `None` when absent or unreadable.
    async fn load_settings(&self, collection: &Utf8Path) -> CoreResult<Option<CollectionSettings>>;

    async fn save_settings(
        &self,
        collection: &Utf8Path,
        settings: &CollectionSettings,
    ) -> CoreResult<()>;
}

/// Catalog kept in JSON files: `collections.json` in the application data
/// directory and `.haptic/settings.json` inside each collection.
#[derive(Debug, Clone)]
pub struct FsCatalog {
    catalog_file: Utf8PathBuf,
}

impl FsCatalog {
    pub fn new(data_dir: &Utf8Path) -> Self {
        Self {
            catalog_file: data_dir.join(CATALOG_FILE),
        }
    }

    fn settings_file(collection: &Utf8Path) -> Utf8PathBuf {
        collection.join(HAPTIC_DIR).join(COLLECTION_SETTINGS_FILE)
    }

    /// Reads a JSON file, `None` when it does not exist.
    async fn read_optional(path: &Utf8Path) -> CoreResult<Option<String>> {
        match tokio::fs::read_to_string(path).await {
            Ok(raw) => Ok(Some(raw)),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
            Err(e) => Err(CoreError::io(e, path)),
        }
    }

    async fn write_json<T: serde::Serialize + Sync>(path: &Utf8Path, value: &T) -> CoreResult<()> {
        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|e| CoreError::io(e, parent))?;
        }
        let json = serde_json::to_string_pretty(value)?;
        tokio::fs::write(path, json)
            .await
            .map_err(|e| CoreError::io(e, path))
    }
}

#[async_trait]
impl CollectionCatalog for FsCatalog {
    async fn record_opened(&self, collection: &Utf8Path) -> CoreResult<Collection> {
        let mut collections = self.list_collections().await?;
        collections.retain(|known| known.path.as_path() != collection);

        let record = Collection::opened_now(collection);
        collections.push(record.clone());
        Self::write_json(&self.catalog_file, &collections).await?;

        tracing::info!("Recorded collection {} in {}", collection, self.catalog_file);
        Ok(record)
    }

    async fn list_collections(&self) -> CoreResult<Vec<Collection>> {
        Ok(Self::read_optional(&self.catalog_file)
            .await?
            .map(|raw| parse_or_default(&raw, self.catalog_file.as_std_path()))
            .unwrap_or_default())
    }

    async fn load_settings(&self, collection: &Utf8Path) -> CoreResult<Option<CollectionSettings>> {
        let path = Self::settings_file(collection);
        let Some(raw) = Self::read_optional(&path).await? else {
            return Ok(None);
        };
        match serde_json::from_str::<CollectionSettings>(&raw) {
            Ok(settings) => Ok(Some(settings)),
            Err(e) => {
                tracing::warn!("Ignoring malformed settings at {}: {}", path, e);
                Ok(None)
            }
        }
    }

    async fn save_settings(
        &self,
        collection: &Utf8Path,
        settings: &CollectionSettings,
    ) -> CoreResult<()> {
        let path = Self::settings_file(collection);
        Self::write_json(&path, settings).await?;
        tracing::debug!("Saved collection settings to {}", path);
        Ok(())
    }
}
