//! Recoverable problems are logged and fall back to defaults instead of failing.

use camino::Utf8PathBuf;
use haptic_core::app::{BufferEditor, Session};
use haptic_core::config::{CollectionSettings, COLLECTION_SETTINGS_FILE, HAPTIC_DIR};
use haptic_core::core::{FsCatalog, FsEntryStore, TrashDir};
use std::sync::Arc;
use tempfile::TempDir;
use tracing_test::traced_test;

fn fs_session(data: &TempDir) -> Session {
    let data_path = Utf8PathBuf::from_path_buf(data.path().to_path_buf()).unwrap();
    Session::new(
        Arc::new(FsEntryStore::new()),
        Arc::new(FsCatalog::new(&data_path)),
        Box::new(BufferEditor::new()),
    )
}

fn utf8(dir: &TempDir) -> Utf8PathBuf {
    Utf8PathBuf::from_path_buf(dir.path().to_path_buf()).unwrap()
}

#[tokio::test]
#[traced_test]
async fn test_malformed_collection_settings_are_replaced() {
    let collection = tempfile::tempdir().unwrap();
    let data = tempfile::tempdir().unwrap();
    let root = utf8(&collection);
    let settings_path = root.join(HAPTIC_DIR).join(COLLECTION_SETTINGS_FILE);
    std::fs::create_dir_all(settings_path.parent().unwrap()).unwrap();
    std::fs::write(&settings_path, "{ not json").unwrap();

    let mut session = fs_session(&data).with_system_trash(None);
    session.open_collection(&root).await.unwrap();

    assert!(logs_contain("Ignoring malformed settings"));
    assert_eq!(session.settings(), &CollectionSettings::default());
    let rewritten: CollectionSettings =
        serde_json::from_str(&std::fs::read_to_string(&settings_path).unwrap()).unwrap();
    assert_eq!(rewritten, CollectionSettings::default());
}

#[tokio::test]
#[traced_test]
async fn test_invalid_exclude_pattern_is_skipped() {
    let collection = tempfile::tempdir().unwrap();
    let data = tempfile::tempdir().unwrap();
    let root = utf8(&collection);
    std::fs::write(root.join("keep.md"), "").unwrap();
    std::fs::write(root.join("drop.md"), "").unwrap();

    let mut session = fs_session(&data).with_system_trash(None);
    session.open_collection(&root).await.unwrap();
    let mut settings = CollectionSettings::default();
    settings.notes.excluded_files = vec!["[unclosed".to_string(), "drop.md".to_string()];
    session.update_collection_settings(settings).await.unwrap();

    assert!(logs_contain("Skipping invalid exclude pattern"));
    let tree = session
        .fetch_collection_entries(None, Default::default(), false)
        .await
        .unwrap();
    let names: Vec<_> = tree.iter().map(|entry| entry.name.as_str()).collect();
    assert_eq!(names, vec!["keep.md"]);
}

#[tokio::test]
#[traced_test]
async fn test_system_policy_without_platform_trash_warns() {
    let collection = tempfile::tempdir().unwrap();
    let data = tempfile::tempdir().unwrap();
    let root = utf8(&collection);

    let mut session = fs_session(&data).with_system_trash(None);
    session.open_collection(&root).await.unwrap();

    assert_eq!(session.settings().notes.trash_dir, TrashDir::System);
    assert!(logs_contain("No system trash known"));

    let note = session.create_note(&root, None).await.unwrap();
    session.delete_note(&note).await.unwrap();
    assert!(root.join(HAPTIC_DIR).join("trash").join("Untitled.md").is_file());
}
