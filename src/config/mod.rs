pub mod settings;

use anyhow::Result;
use camino::Utf8PathBuf;
use serde::{Deserialize, Serialize};

use crate::core::{SortMode, TrashDir};

/// Support folder kept at the root of every filesystem collection.
pub const HAPTIC_DIR: &str = ".haptic";
/// In-collection trash, below [`HAPTIC_DIR`].
pub const TRASH_DIR: &str = "trash";
/// Daily notes, below [`HAPTIC_DIR`].
pub const DAILY_DIR: &str = "daily";
/// Collection settings file, below [`HAPTIC_DIR`].
pub const COLLECTION_SETTINGS_FILE: &str = "settings.json";

/// Application-wide preferences.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct AppConfig {
    pub sort_mode: SortMode,
    pub show_dotfiles: bool,
    pub last_collection: Option<Utf8PathBuf>,
    pub theme: String,
    pub theme_mode: String,
    pub interface_font: String,
}

impl AppConfig {
    pub fn load() -> Result<Self> {
        settings::load_config(None)
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            sort_mode: SortMode::Name,
            show_dotfiles: false,
            last_collection: None,
            theme: "dark".to_string(),
            theme_mode: "system".to_string(),
            interface_font: "system-ui".to_string(),
        }
    }
}

/// Per-collection settings. Missing fields take their defaults.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct CollectionSettings {
    pub editor: EditorSettings,
    pub notes: NotesSettings,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct EditorSettings {
    pub font: String,
    pub size: u32,
    pub auto_save: bool,
    /// Milliseconds.
    pub auto_save_debounce: u64,
    pub auto_correct: bool,
    pub spell_check: bool,
    pub show_inline_title: bool,
    pub show_line_numbers: bool,
    pub show_toolbar: bool,
}

impl Default for EditorSettings {
    fn default() -> Self {
        Self {
            font: "system-ui".to_string(),
            size: 14,
            auto_save: true,
            auto_save_debounce: 750,
            auto_correct: false,
            spell_check: false,
            show_inline_title: true,
            show_line_numbers: false,
            show_toolbar: true,
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct NotesSettings {
    pub trash_dir: TrashDir,
    /// Glob patterns hidden from the tree and from search.
    pub excluded_files: Vec<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_collection_settings_defaults() {
        let settings = CollectionSettings::default();
        assert_eq!(settings.editor.auto_save_debounce, 750);
        assert_eq!(settings.editor.size, 14);
        assert_eq!(settings.notes.trash_dir, TrashDir::System);
        assert!(settings.notes.excluded_files.is_empty());
    }

    #[test]
    fn test_partial_collection_settings_fill_in_defaults() {
        let settings: CollectionSettings =
            serde_json::from_str(r#"{"notes":{"trash_dir":"haptic"}}"#).unwrap();
        assert_eq!(settings.notes.trash_dir, TrashDir::Haptic);
        assert_eq!(settings.editor, EditorSettings::default());
    }

    #[test]
    fn test_app_config_serializes_sort_mode_lowercase() {
        let config = AppConfig {
            sort_mode: SortMode::Date,
            ..Default::default()
        };
        let json = serde_json::to_value(&config).unwrap();
        assert_eq!(json["sort_mode"], "date");
        assert_eq!(json["theme"], "dark");
    }
}
