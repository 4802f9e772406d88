//! Trash routing: decides where a deleted entry goes.
//!
//! The platform table is consulted once per session; the resulting
//! `TrashRouter` is handed to delete operations.

use camino::{Utf8Path, Utf8PathBuf};
use serde::{Deserialize, Serialize};

use super::paths::leaf_name;
use crate::config::{HAPTIC_DIR, TRASH_DIR};

/// Where deleted entries go, as configured in `notes.trash_dir`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TrashDir {
    /// The operating system's trash folder.
    #[default]
    System,
    /// `<collection>/.haptic/trash`.
    Haptic,
    /// Removed permanently.
    Delete,
}

/// Platform -> trash folder relative to the home directory.
pub const OS_TRASH_DIRS: &[(&str, &str)] = &[
    ("macos", ".Trash"),
    ("linux", ".local/share/Trash/files"),
    ("freebsd", ".local/share/Trash/files"),
    ("openbsd", ".local/share/Trash/files"),
    ("netbsd", ".local/share/Trash/files"),
];

/// Looks up the system trash folder for `platform` below `home`.
pub fn system_trash_dir(platform: &str, home: &Utf8Path) -> Option<Utf8PathBuf> {
    OS_TRASH_DIRS
        .iter()
        .find(|(os, _)| *os == platform)
        .map(|(_, suffix)| home.join(suffix))
}

/// The system trash folder of the running platform, if it has one.
pub fn platform_trash_dir() -> Option<Utf8PathBuf> {
    dirs::home_dir()
        .and_then(|home| Utf8PathBuf::from_path_buf(home).ok())
        .and_then(|home| system_trash_dir(std::env::consts::OS, &home))
}

/// What the store should do with an entry being deleted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Disposal {
    /// Move the entry (and its subtree) to this exact path.
    MoveTo(Utf8PathBuf),
    /// Remove the entry (and its subtree) for good.
    Delete,
}

/// A resolved trash policy for one collection.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TrashRouter {
    policy: TrashDir,
    system_trash: Option<Utf8PathBuf>,
    collection_trash: Utf8PathBuf,
}

impl TrashRouter {
    /// Builds a router for `collection_root` given the platform's trash folder.
    pub fn new(
        policy: TrashDir,
        collection_root: &Utf8Path,
        system_trash: Option<Utf8PathBuf>,
    ) -> Self {
        if policy == TrashDir::System && system_trash.is_none() {
            tracing::warn!(
                "No system trash known for platform '{}', using the collection trash",
                std::env::consts::OS
            );
        }
        Self {
            policy,
            system_trash,
            collection_trash: collection_root.join(HAPTIC_DIR).join(TRASH_DIR),
        }
    }

    pub fn policy(&self) -> TrashDir {
        self.policy
    }

    /// The folder entries are moved into, if the policy keeps them at all.
    pub fn trash_folder(&self) -> Option<&Utf8Path> {
        match self.policy {
            TrashDir::System => Some(
                self.system_trash
                    .as_deref()
                    .unwrap_or(self.collection_trash.as_path()),
            ),
            TrashDir::Haptic => Some(self.collection_trash.as_path()),
            TrashDir::Delete => None,
        }
    }

    /// Decides the disposal of the entry at `path`.
    pub fn disposal_for(&self, path: &Utf8Path) -> Disposal {
        match self.trash_folder() {
            Some(folder) => Disposal::MoveTo(folder.join(leaf_name(path))),
            None => Disposal::Delete,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_platform_table() {
        let home = Utf8Path::new("/home/ada");
        assert_eq!(
            system_trash_dir("linux", home),
            Some(Utf8PathBuf::from("/home/ada/.local/share/Trash/files"))
        );
        assert_eq!(
            system_trash_dir("macos", Utf8Path::new("/Users/ada")),
            Some(Utf8PathBuf::from("/Users/ada/.Trash"))
        );
        assert_eq!(system_trash_dir("windows", home), None);
    }

    #[test]
    fn test_disposal_per_policy() {
        let col = Utf8Path::new("/col");
        let system = Some(Utf8PathBuf::from("/home/ada/.Trash"));
        let note = Utf8Path::new("/col/sub/a.md");

        let router = TrashRouter::new(TrashDir::System, col, system.clone());
        assert_eq!(
            router.disposal_for(note),
            Disposal::MoveTo(Utf8PathBuf::from("/home/ada/.Trash/a.md"))
        );

        let router = TrashRouter::new(TrashDir::Haptic, col, system.clone());
        assert_eq!(
            router.disposal_for(note),
            Disposal::MoveTo(Utf8PathBuf::from("/col/.haptic/trash/a.md"))
        );

        let router = TrashRouter::new(TrashDir::Delete, col, system);
        assert_eq!(router.disposal_for(note), Disposal::Delete);
    }

    #[test]
    fn test_system_policy_without_platform_entry_uses_collection_trash() {
        let router = TrashRouter::new(TrashDir::System, Utf8Path::new("/col"), None);
        assert_eq!(
            router.disposal_for(Utf8Path::new("/col/f")),
            Disposal::MoveTo(Utf8PathBuf::from("/col/.haptic/trash/f"))
        );
    }
}
