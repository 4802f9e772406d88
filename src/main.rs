use anyhow::Context;
use camino::Utf8PathBuf;
use haptic_core::app::{BufferEditor, Session};
use haptic_core::config::{settings, AppConfig};
use haptic_core::core::paths::leaf_name;
use haptic_core::core::{FsCatalog, FsEntryStore, TreeBuilder};
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

const USAGE: &str = "usage: haptic [--tree] [collection-dir] [query]";

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")))
        .with_writer(std::io::stderr)
        .init();

    let mut config = AppConfig::load().unwrap_or_else(|e| {
        tracing::warn!("Could not load config: {}. Using defaults.", e);
        AppConfig::default()
    });

    let mut args = std::env::args().skip(1).peekable();
    let ascii_tree = args.next_if(|arg| arg == "--tree").is_some();
    let collection = match args.next() {
        Some(dir) => {
            let canonical = std::fs::canonicalize(&dir)
                .with_context(|| format!("Cannot open collection directory {dir}"))?;
            Utf8PathBuf::from_path_buf(canonical)
                .map_err(|path| anyhow::anyhow!("Path is not valid UTF-8: {}", path.display()))?
        }
        None => config
            .last_collection
            .clone()
            .ok_or_else(|| anyhow::anyhow!("{USAGE}"))?,
    };
    let query = args.next();

    let data_dir = settings::get_data_directory()
        .and_then(|dir| Utf8PathBuf::from_path_buf(dir).ok())
        .ok_or_else(|| anyhow::anyhow!("Could not determine data directory"))?;

    let mut session = Session::new(
        Arc::new(FsEntryStore::new()),
        Arc::new(FsCatalog::new(&data_dir)),
        Box::new(BufferEditor::new()),
    );
    session.open_collection(&collection).await?;

    let output = match query {
        Some(query) => serde_json::to_string_pretty(&session.search_entries(&query, false, false).await?)?,
        None => {
            let tree = session
                .fetch_collection_entries(None, config.sort_mode, config.show_dotfiles)
                .await?;
            if ascii_tree {
                TreeBuilder::render_ascii(&tree, leaf_name(&collection))
            } else {
                serde_json::to_string_pretty(&tree)?
            }
        }
    };
    println!("{output}");

    config.last_collection = Some(collection);
    if let Err(e) = settings::save_config(&config, None) {
        tracing::warn!("Could not remember last collection: {}", e);
    }
    Ok(())
}
