//! Tree-to-tree change computation.
//!
//! Diffs two stored trees into per-path [`Change`] records over flattened
//! full-path entries. An optional [`RenameDetector`] refines the raw
//! add/delete stream into renames; content-similarity detection is an
//! external collaborator, but an exact-identifier detector ships here so
//! rename handling can be exercised end to end.

use std::collections::{BTreeSet, HashMap, VecDeque};

use bstr::BString;
use trimerge_hash::ContentId;
use trimerge_object::TreeEntry;
use trimerge_store::treewalk::flatten_tree;
use trimerge_store::ObjectStore;

use crate::DiffError;

/// The kind of a per-path change between two trees.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ChangeKind {
    Add,
    Copy,
    Delete,
    Modify,
    Rename,
    Unchanged,
}

/// A per-path change. `old` is absent for Add/Copy, `new` for Delete;
/// entry names carry full repository-relative paths.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Change {
    pub kind: ChangeKind,
    pub old: Option<TreeEntry>,
    pub new: Option<TreeEntry>,
}

impl Change {
    pub fn add(new: TreeEntry) -> Self {
        Self {
            kind: ChangeKind::Add,
            old: None,
            new: Some(new),
        }
    }

    pub fn delete(old: TreeEntry) -> Self {
        Self {
            kind: ChangeKind::Delete,
            old: Some(old),
            new: None,
        }
    }

    pub fn modify(old: TreeEntry, new: TreeEntry) -> Self {
        Self {
            kind: ChangeKind::Modify,
            old: Some(old),
            new: Some(new),
        }
    }

    pub fn rename(old: TreeEntry, new: TreeEntry) -> Self {
        Self {
            kind: ChangeKind::Rename,
            old: Some(old),
            new: Some(new),
        }
    }
}

/// Refines a raw change stream, pairing adds and deletes into renames.
pub trait RenameDetector: Send + Sync {
    fn pair(&self, changes: &mut Vec<Change>);
}

/// Exact-rename detection: a deleted path and an added path carrying the
/// same content identifier become one rename. Each delete pairs at most
/// once, in path order.
#[derive(Debug, Default, Clone, Copy)]
pub struct ExactRenames;

impl RenameDetector for ExactRenames {
    fn pair(&self, changes: &mut Vec<Change>) {
        let mut deletes_by_cid: HashMap<ContentId, VecDeque<usize>> = HashMap::new();
        for (idx, change) in changes.iter().enumerate() {
            if change.kind == ChangeKind::Delete {
                if let Some(old) = &change.old {
                    deletes_by_cid.entry(old.cid).or_default().push_back(idx);
                }
            }
        }

        let mut consumed: Vec<usize> = Vec::new();
        for idx in 0..changes.len() {
            if changes[idx].kind != ChangeKind::Add {
                continue;
            }
            let cid = match &changes[idx].new {
                Some(new) => new.cid,
                None => continue,
            };
            if let Some(delete_idx) = deletes_by_cid.get_mut(&cid).and_then(VecDeque::pop_front) {
                let old = changes[delete_idx].old.take();
                let new = changes[idx].new.take();
                changes[idx] = Change {
                    kind: ChangeKind::Rename,
                    old,
                    new,
                };
                consumed.push(delete_idx);
            }
        }

        consumed.sort_unstable();
        for idx in consumed.into_iter().rev() {
            changes.remove(idx);
        }
    }
}

/// Compute the changes from `old_tree` to `new_tree`, in path order.
///
/// `None` stands for the empty tree. Unchanged paths are not reported.
pub fn changes_between<S: ObjectStore + ?Sized>(
    store: &S,
    old_tree: Option<&ContentId>,
    new_tree: Option<&ContentId>,
    rename_detector: Option<&dyn RenameDetector>,
) -> Result<Vec<Change>, DiffError> {
    let old = match old_tree {
        Some(cid) => flatten_tree(store, cid)?,
        None => Default::default(),
    };
    let new = match new_tree {
        Some(cid) => flatten_tree(store, cid)?,
        None => Default::default(),
    };

    let paths: BTreeSet<&BString> = old.keys().chain(new.keys()).collect();

    let mut changes = Vec::new();
    for path in paths {
        match (old.get(path), new.get(path)) {
            (Some(&(old_mode, old_cid)), Some(&(new_mode, new_cid))) => {
                if old_mode != new_mode || old_cid != new_cid {
                    changes.push(Change::modify(
                        TreeEntry::new(path.clone(), old_mode, old_cid),
                        TreeEntry::new(path.clone(), new_mode, new_cid),
                    ));
                }
            }
            (Some(&(mode, cid)), None) => {
                changes.push(Change::delete(TreeEntry::new(path.clone(), mode, cid)));
            }
            (None, Some(&(mode, cid))) => {
                changes.push(Change::add(TreeEntry::new(path.clone(), mode, cid)));
            }
            (None, None) => unreachable!("path came from one of the maps"),
        }
    }

    if let Some(detector) = rename_detector {
        detector.pair(&mut changes);
    }

    Ok(changes)
}
