//! Folder operations: create, delete, rename, move.

use camino::{Utf8Path, Utf8PathBuf};
use std::collections::{HashMap, HashSet};

use super::session::Session;
use crate::core::naming::{
    check_conflict, next_untitled_name, sanitize_folder_name, validate_name, UNTITLED_PREFIX,
};
use crate::core::paths::{is_within, leaf_name, parent_of, rebase};
use crate::core::{CoreError, CoreResult, Entry, EntryPatch};

/// Finder metadata, not counted as folder content.
const DS_STORE: &str = ".DS_Store";

/// One entry's relocation within a folder move.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlannedMove {
    pub from: Utf8PathBuf,
    pub to: Utf8PathBuf,
    pub is_folder: bool,
}

/// Lists every relocation moving `source` to `new_root` implies, depth-first
/// with each folder ahead of its contents.
pub fn plan_folder_move(entries: &[Entry], source: &Utf8Path, new_root: &Utf8Path) -> Vec<PlannedMove> {
    let mut by_parent: HashMap<&Utf8Path, Vec<&Entry>> = HashMap::new();
    for entry in entries {
        if entry.path != entry.parent_path && is_within(&entry.path, source) {
            by_parent
                .entry(entry.parent_path.as_path())
                .or_default()
                .push(entry);
        }
    }

    let mut plan = vec![PlannedMove {
        from: source.to_path_buf(),
        to: new_root.to_path_buf(),
        is_folder: true,
    }];
    let mut visited = HashSet::from([source]);
    visit_subtree(source, &by_parent, source, new_root, &mut visited, &mut plan);
    plan
}

fn visit_subtree<'a>(
    folder: &Utf8Path,
    by_parent: &HashMap<&Utf8Path, Vec<&'a Entry>>,
    source: &Utf8Path,
    new_root: &Utf8Path,
    visited: &mut HashSet<&'a Utf8Path>,
    plan: &mut Vec<PlannedMove>,
) {
    let Some(children) = by_parent.get(folder) else {
        return;
    };
    for child in children {
        if !visited.insert(child.path.as_path()) {
            continue;
        }
        if let Some(to) = rebase(&child.path, source, new_root) {
            plan.push(PlannedMove {
                from: child.path.clone(),
                to,
                is_folder: child.is_folder,
            });
        }
        if child.is_folder {
            visit_subtree(&child.path, by_parent, source, new_root, visited, plan);
        }
    }
}

impl Session {
    /// Creates the next free `Untitled` folder in `dir` and returns its path.
    pub async fn create_folder(&mut self, dir: &Utf8Path) -> CoreResult<Utf8PathBuf> {
        let collection = self.collection()?.to_path_buf();
        let siblings = self.siblings_for_new_entry(dir).await?;
        let name = next_untitled_name(
            siblings.iter().map(|entry| entry.name.as_str()),
            UNTITLED_PREFIX,
            "",
        );

        let folder = Entry::folder(dir, &name);
        self.store.insert(&collection, &folder).await?;
        tracing::info!("Created folder {}", folder.path);
        Ok(folder.path)
    }

    /// Deletes the folder according to the trash policy.
    ///
    /// Unless `recursive`, a folder holding anything besides `.DS_Store`
    /// is refused with `NotEmpty`.
    pub async fn delete_folder(&mut self, path: &Utf8Path, recursive: bool) -> CoreResult<()> {
        self.require_folder(path).await?;

        if !recursive {
            let remaining = self
                .store
                .list(path)
                .await?
                .iter()
                .filter(|child| child.name != DS_STORE)
                .count();
            if remaining > 0 {
                return Err(CoreError::NotEmpty(path.to_path_buf()));
            }
        }

        let disposal = self.trash_router()?.disposal_for(path);
        self.store.delete(path, &disposal).await?;
        self.navigation.clear_active_within(path);
        tracing::info!("Deleted folder {} ({:?})", path, disposal);
        Ok(())
    }

    /// Renames the folder in place, carrying its contents along.
    ///
    /// Sibling names are not checked here: an existing sibling folder of the
    /// same name is left for the backing store to reject.
    pub async fn rename_folder(&mut self, path: &Utf8Path, new_name: &str) -> CoreResult<Utf8PathBuf> {
        self.require_folder(path).await?;
        let name = sanitize_folder_name(new_name);
        validate_name(&name)?;

        let new_path = parent_of(path).join(&name);
        self.store
            .update(path, EntryPatch::relocate(&new_path))
            .await?;
        self.navigation.remap_prefix(path, &new_path);
        tracing::info!("Renamed folder {} to {}", path, new_path);
        Ok(new_path)
    }

    /// Moves the folder, with everything below it, into the folder `target`.
    ///
    /// The whole relocation is planned and checked before anything is written.
    pub async fn move_folder(&mut self, source: &Utf8Path, target: &Utf8Path) -> CoreResult<Utf8PathBuf> {
        let collection = self.collection()?.to_path_buf();
        let folder = self.require_folder(source).await?;
        if is_within(target, source) {
            return Err(CoreError::InvalidMove {
                from: source.to_path_buf(),
                target: target.to_path_buf(),
            });
        }

        let children = self.children_of(target).await?;
        if check_conflict(&children, &folder.name, true) {
            return Err(CoreError::NameConflict {
                name: folder.name,
                parent: target.to_path_buf(),
            });
        }

        let new_root = target.join(leaf_name(source));
        let entries = self.store.list_by_collection(&collection).await?;
        let plan = plan_folder_move(&entries, source, &new_root);

        let occupied: HashSet<&Utf8Path> = entries
            .iter()
            .filter(|entry| !is_within(&entry.path, source))
            .map(|entry| entry.path.as_path())
            .collect();
        if let Some(clash) = plan.iter().find(|step| occupied.contains(step.to.as_path())) {
            return Err(CoreError::NameConflict {
                name: leaf_name(&clash.to).to_string(),
                parent: parent_of(&clash.to).to_path_buf(),
            });
        }

        self.store
            .update(source, EntryPatch::relocate(&new_root))
            .await?;
        self.navigation.remap_prefix(source, &new_root);
        tracing::info!(
            "Moved folder {} to {} ({} entries)",
            source,
            new_root,
            plan.len()
        );
        Ok(new_root)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_plan_is_depth_first_parents_first() {
        let col = Utf8Path::new("/col");
        let f = col.join("f");
        let g = f.join("g");
        let entries = vec![
            Entry::folder(col, "f"),
            Entry::note(&f, "a.md", ""),
            Entry::folder(&f, "g"),
            Entry::note(&g, "b.md", ""),
            Entry::note(col, "outside.md", ""),
            Entry::folder(col, "fx"),
        ];

        let plan = plan_folder_move(&entries, &f, Utf8Path::new("/col/t/f"));
        let pairs: Vec<_> = plan
            .iter()
            .map(|step| (step.from.as_str(), step.to.as_str()))
            .collect();
        assert_eq!(
            pairs,
            vec![
                ("/col/f", "/col/t/f"),
                ("/col/f/a.md", "/col/t/f/a.md"),
                ("/col/f/g", "/col/t/f/g"),
                ("/col/f/g/b.md", "/col/t/f/g/b.md"),
            ]
        );

        for (i, step) in plan.iter().enumerate() {
            let parent = parent_of(&step.from);
            if let Some(parent_index) = plan.iter().position(|p| p.from == parent) {
                assert!(parent_index < i);
            }
        }
    }
}
