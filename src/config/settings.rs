use anyhow::Result;
use directories::ProjectDirs;
use serde::de::DeserializeOwned;
use std::fs;
use std::path::{Path, PathBuf};

use super::AppConfig;

const APP_NAME: &str = "Haptic";
const CONFIG_FILE: &str = "settings.json";

fn project_dirs() -> Option<ProjectDirs> {
    ProjectDirs::from("app", "haptic", APP_NAME)
}

/// Returns the platform-specific configuration directory for the application.
pub fn get_config_directory() -> Option<PathBuf> {
    project_dirs().map(|proj_dirs| proj_dirs.config_dir().to_path_buf())
}

/// Returns the platform-specific data directory, home of `collections.json`.
pub fn get_data_directory() -> Option<PathBuf> {
    project_dirs().map(|proj_dirs| proj_dirs.data_dir().to_path_buf())
}

fn resolve_config_directory(dir_override: Option<&Path>) -> Result<PathBuf> {
    match dir_override {
        Some(dir) => Ok(dir.to_path_buf()),
        None => get_config_directory()
            .ok_or_else(|| anyhow::anyhow!("Could not determine config directory")),
    }
}

/// Parses `raw` as JSON, treating malformed data like absent data.
pub fn parse_or_default<T>(raw: &str, origin: &Path) -> T
where
    T: DeserializeOwned + Default,
{
    match serde_json::from_str::<T>(raw) {
        Ok(value) => value,
        Err(e) => {
            tracing::warn!(
                "Failed to parse {:?}: {}. Falling back to defaults.",
                origin,
                e
            );
            T::default()
        }
    }
}

/// Loads the application configuration from the config file.
/// If the file doesn't exist, it creates a default one.
/// A file that cannot be parsed falls back to the default configuration.
pub fn load_config(dir_override: Option<&Path>) -> Result<AppConfig> {
    let config_dir = resolve_config_directory(dir_override)?;
    let config_path = config_dir.join(CONFIG_FILE);

    if !config_path.exists() {
        tracing::info!(
            "Config file not found, creating default config at {:?}",
            config_path
        );
        let default_config = AppConfig::default();
        save_config(&default_config, Some(&config_dir))?;
        return Ok(default_config);
    }

    let config_content = fs::read_to_string(&config_path)?;
    let config = parse_or_default(&config_content, &config_path);
    tracing::info!("Loaded config from {:?}", config_path);
    Ok(config)
}

/// Saves the provided configuration to the config file.
pub fn save_config(config: &AppConfig, dir_override: Option<&Path>) -> Result<()> {
    let config_dir = resolve_config_directory(dir_override)?;

    if !config_dir.exists() {
        fs::create_dir_all(&config_dir)?;
        tracing::info!("Created config directory: {:?}", config_dir);
    }

    let config_path = config_dir.join(CONFIG_FILE);
    let config_json = serde_json::to_string_pretty(config)?;

    fs::write(&config_path, config_json)?;
    tracing::info!("Saved config to {:?}", config_path);

    Ok(())
}

// Platform-specific configuration paths for reference:
// macOS:   ~/Library/Application Support/app.haptic.Haptic/
// Linux:   ~/.config/haptic/
// Windows: %APPDATA%/haptic/Haptic/config/

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::SortMode;
    use serial_test::serial;

    #[test]
    #[serial]
    fn test_load_creates_default_file() {
        let dir = tempfile::tempdir().unwrap();
        let config = load_config(Some(dir.path())).unwrap();
        assert_eq!(config, AppConfig::default());
        assert!(dir.path().join(CONFIG_FILE).exists());
    }

    #[test]
    #[serial]
    fn test_save_then_load() {
        let dir = tempfile::tempdir().unwrap();
        let config = AppConfig {
            sort_mode: SortMode::Date,
            show_dotfiles: true,
            ..Default::default()
        };
        save_config(&config, Some(dir.path())).unwrap();
        assert_eq!(load_config(Some(dir.path())).unwrap(), config);
    }

    #[test]
    #[serial]
    fn test_malformed_config_falls_back_to_defaults() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join(CONFIG_FILE), "{ not json").unwrap();
        assert_eq!(load_config(Some(dir.path())).unwrap(), AppConfig::default());
    }

    #[test]
    fn test_partial_config_keeps_known_fields() {
        let config: AppConfig = parse_or_default(r#"{"show_dotfiles": true}"#, Path::new("x"));
        assert!(config.show_dotfiles);
        assert_eq!(config.theme, "dark");
    }
}
