//! Tree-level three-way merge.
//!
//! Diffs both side trees against the common base tree and reconciles the
//! two change streams path by path: clean updates pass through, content
//! overlaps delegate to the diff3 file merge, and incompatible structural
//! changes (both-add, modify/delete, rename/rename, rename/delete) surface
//! as conflicts without an output entry.

use std::collections::{BTreeMap, HashMap, VecDeque};

use bstr::BString;
use trimerge_diff::binary::is_binary;
use trimerge_diff::tree::{changes_between, Change, ChangeKind};
use trimerge_hash::ContentId;
use trimerge_object::TreeEntry;
use trimerge_store::treewalk::{flatten_tree, write_nested_tree};
use trimerge_store::ObjectStore;

use crate::diff3::merge_blobs;
use crate::{MergeConflict, MergeError, MergeOptions};

/// A per-path update produced by the tree merge.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EntryUpdate {
    /// Write (or overwrite) the entry at its path.
    Write(TreeEntry),
    /// Remove the path from the merged tree.
    Remove(BString),
}

impl EntryUpdate {
    /// The path this update applies to.
    pub fn path(&self) -> &BString {
        match self {
            Self::Write(entry) => &entry.name,
            Self::Remove(path) => path,
        }
    }
}

/// One outcome of the tree merge walk. `update` is absent when a
/// structural conflict blocked the path from producing an entry.
#[derive(Debug, Clone)]
pub struct MergeTreeItem {
    pub update: Option<EntryUpdate>,
    pub conflicts: Vec<MergeConflict>,
}

impl MergeTreeItem {
    fn update(update: EntryUpdate) -> Self {
        Self {
            update: Some(update),
            conflicts: Vec::new(),
        }
    }

    fn conflict(conflict: MergeConflict) -> Self {
        Self {
            update: None,
            conflicts: vec![conflict],
        }
    }
}

/// Merge `this_tree` and `other_tree` against `base_tree`, yielding one
/// item per reconciled path.
///
/// The change streams are computed up front; file-level content merges run
/// lazily as the iterator advances.
pub fn merge_trees<'a, S: ObjectStore + ?Sized>(
    store: &'a S,
    options: &'a MergeOptions,
    this_tree: &ContentId,
    other_tree: &ContentId,
    base_tree: &ContentId,
) -> Result<TreeMerge<'a, S>, MergeError> {
    let detector = options.rename_detector.as_deref();
    let this_changes = changes_between(store, Some(base_tree), Some(this_tree), detector)?;
    let other_changes = changes_between(store, Some(base_tree), Some(other_tree), detector)?;

    let mut by_old_path = HashMap::new();
    let mut by_new_path = HashMap::new();
    for change in &this_changes {
        if let Some(old) = &change.old {
            by_old_path.insert(old.name.clone(), change.clone());
        }
        if let Some(new) = &change.new {
            by_new_path.insert(new.name.clone(), change.clone());
        }
    }

    Ok(TreeMerge {
        store,
        options,
        by_old_path,
        by_new_path,
        other_changes: other_changes.into_iter(),
        queued: VecDeque::new(),
    })
}

/// Lazy iterator over tree-merge outcomes.
pub struct TreeMerge<'a, S: ObjectStore + ?Sized> {
    store: &'a S,
    options: &'a MergeOptions,
    by_old_path: HashMap<BString, Change>,
    by_new_path: HashMap<BString, Change>,
    other_changes: std::vec::IntoIter<Change>,
    /// Follow-up items (rename source removals) emitted after their change.
    queued: VecDeque<MergeTreeItem>,
}

impl<'a, S: ObjectStore + ?Sized> Iterator for TreeMerge<'a, S> {
    type Item = Result<MergeTreeItem, MergeError>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            if self.options.is_cancelled() {
                return Some(Err(MergeError::Cancelled));
            }
            if let Some(item) = self.queued.pop_front() {
                return Some(Ok(item));
            }
            let other_change = self.other_changes.next()?;
            let this_change = other_change
                .old
                .as_ref()
                .and_then(|old| self.by_old_path.get(&old.name))
                .cloned();

            // Identical changes on both sides need no reconciliation.
            if this_change.as_ref() == Some(&other_change) {
                continue;
            }

            match self.reconcile(other_change, this_change) {
                Ok(Some(item)) => return Some(Ok(item)),
                Ok(None) => continue,
                Err(err) => return Some(Err(err)),
            }
        }
    }
}

impl<'a, S: ObjectStore + ?Sized> TreeMerge<'a, S> {
    fn reconcile(
        &mut self,
        other_change: Change,
        this_change: Option<Change>,
    ) -> Result<Option<MergeTreeItem>, MergeError> {
        match other_change.kind {
            ChangeKind::Add | ChangeKind::Copy => {
                let Some(new) = other_change.new else {
                    return Ok(Some(not_implemented(&other_change.kind, None)));
                };
                match self.by_new_path.get(&new.name) {
                    None => Ok(Some(MergeTreeItem::update(EntryUpdate::Write(new)))),
                    Some(this_at_path) if this_at_path.new.as_ref() == Some(&new) => Ok(None),
                    Some(this_at_path) => Ok(Some(MergeTreeItem::conflict(
                        MergeConflict::structural(
                            format!("both this and other add new file {}", new.name),
                            this_at_path.new.clone(),
                            Some(new),
                            other_change.old,
                        ),
                    ))),
                }
            }

            ChangeKind::Delete => {
                let Some(old) = other_change.old else {
                    return Ok(Some(not_implemented(&other_change.kind, None)));
                };
                match &this_change {
                    None => Ok(Some(MergeTreeItem::update(EntryUpdate::Remove(old.name)))),
                    Some(tc) if matches!(tc.kind, ChangeKind::Delete | ChangeKind::Unchanged) => {
                        Ok(Some(MergeTreeItem::update(EntryUpdate::Remove(old.name))))
                    }
                    Some(tc) => Ok(Some(MergeTreeItem::conflict(MergeConflict::structural(
                        format!("{} is deleted in other but modified in this", old.name),
                        tc.new.clone(),
                        other_change.new,
                        Some(old),
                    )))),
                }
            }

            ChangeKind::Rename => {
                let (Some(old), Some(new)) = (other_change.old, other_change.new) else {
                    return Ok(Some(not_implemented(&other_change.kind, None)));
                };
                match this_change {
                    Some(tc) if tc.kind == ChangeKind::Rename => {
                        match tc.new {
                            Some(this_new) if this_new.name == new.name => {
                                let item =
                                    self.merge_entry(&new.name.clone(), &this_new, &new, &old)?;
                                Ok(self.with_rename_source_removed(item, old.name))
                            }
                            this_new => Ok(Some(MergeTreeItem::conflict(
                                MergeConflict::structural(
                                    format!(
                                        "{} was renamed by both sides ({} / {})",
                                        old.name,
                                        new.name,
                                        this_new
                                            .as_ref()
                                            .map(|e| e.name.clone())
                                            .unwrap_or_default(),
                                    ),
                                    this_new,
                                    Some(new),
                                    Some(old),
                                ),
                            ))),
                        }
                    }
                    Some(tc) if tc.kind == ChangeKind::Modify => match tc.new {
                        Some(this_new) => {
                            let item =
                                self.merge_entry(&new.name.clone(), &this_new, &new, &old)?;
                            Ok(self.with_rename_source_removed(item, old.name))
                        }
                        None => Ok(Some(not_implemented(&ChangeKind::Modify, Some(&new)))),
                    },
                    Some(tc) if tc.kind == ChangeKind::Delete => {
                        Ok(Some(MergeTreeItem::conflict(MergeConflict::structural(
                            format!(
                                "{} is deleted in this but renamed to {} in other",
                                old.name, new.name
                            ),
                            None,
                            Some(new),
                            Some(old),
                        ))))
                    }
                    Some(tc) => Ok(Some(not_implemented(&tc.kind, Some(&new)))),
                    None => {
                        // The other side moved the file; drop the source path
                        // once the target entry is out.
                        self.queued
                            .push_back(MergeTreeItem::update(EntryUpdate::Remove(old.name)));
                        Ok(Some(MergeTreeItem::update(EntryUpdate::Write(new))))
                    }
                }
            }

            ChangeKind::Modify => {
                let (Some(old), Some(new)) = (other_change.old, other_change.new) else {
                    return Ok(Some(not_implemented(&other_change.kind, None)));
                };
                match this_change {
                    Some(tc) if tc.kind == ChangeKind::Delete => {
                        Ok(Some(MergeTreeItem::conflict(MergeConflict::structural(
                            format!("{} is deleted in this but modified in other", old.name),
                            None,
                            Some(new),
                            Some(old),
                        ))))
                    }
                    Some(tc) if matches!(tc.kind, ChangeKind::Modify | ChangeKind::Rename) => {
                        match tc.new {
                            // The merged entry lands wherever this side put it.
                            Some(this_new) => {
                                self.merge_entry(&this_new.name.clone(), &this_new, &new, &old)
                            }
                            None => Ok(Some(not_implemented(&tc.kind, Some(&new)))),
                        }
                    }
                    Some(tc) => Ok(Some(not_implemented(&tc.kind, Some(&new)))),
                    None => Ok(Some(MergeTreeItem::update(EntryUpdate::Write(new)))),
                }
            }

            ChangeKind::Unchanged => Ok(None),
        }
    }

    /// Queue removal of a rename's source path, unless the merge of its
    /// target produced nothing (structural conflicts leave the tree alone).
    fn with_rename_source_removed(
        &mut self,
        item: Option<MergeTreeItem>,
        old_path: BString,
    ) -> Option<MergeTreeItem> {
        if let Some(item) = &item {
            if item.update.is_some() && item.update.as_ref().map(|u| u.path()) != Some(&old_path) {
                self.queued
                    .push_back(MergeTreeItem::update(EntryUpdate::Remove(old_path)));
            }
        }
        item
    }

    /// Three-way merge a single entry at `new_path`.
    fn merge_entry(
        &self,
        new_path: &BString,
        this_entry: &TreeEntry,
        other_entry: &TreeEntry,
        base_entry: &TreeEntry,
    ) -> Result<Option<MergeTreeItem>, MergeError> {
        // Identical content needs no merge.
        if this_entry.cid == other_entry.cid {
            return Ok(Some(MergeTreeItem::update(EntryUpdate::Write(
                this_entry.clone(),
            ))));
        }

        let Some(variant) = self.options.file_merger else {
            return Ok(Some(MergeTreeItem::conflict(MergeConflict::structural(
                format!("conflict in {} but no file merger configured", new_path),
                Some(this_entry.clone()),
                Some(other_entry.clone()),
                Some(base_entry.clone()),
            ))));
        };

        let this_content = self.store.get_blob(&this_entry.cid)?;
        let other_content = self.store.get_blob(&other_entry.cid)?;
        let base_content = self.store.get_blob(&base_entry.cid)?;

        if is_binary(&this_content) || is_binary(&other_content) || is_binary(&base_content) {
            return Ok(Some(self.resolve_binary(this_entry, other_entry, base_entry)));
        }

        let merged = merge_blobs(
            &this_content,
            &other_content,
            &base_content,
            variant,
            self.options.strategy,
            &self.options.labels,
        );

        let mut conflicts = Vec::new();
        for range in &merged.conflicts {
            conflicts.push(MergeConflict::chunk(
                format!(
                    "{}: conflict in line ranges {:?} {:?} {:?}",
                    new_path, range.base, range.this, range.other
                ),
                Some(this_entry.clone()),
                Some(other_entry.clone()),
                Some(base_entry.clone()),
            ));
        }

        let merged_cid = self.store.add_blob(merged.content)?;

        // Two-of-three mode rule: a side that left the mode alone defers to
        // the side that changed it.
        let mode = if this_entry.mode == base_entry.mode || this_entry.mode == other_entry.mode {
            other_entry.mode
        } else if base_entry.mode == other_entry.mode {
            this_entry.mode
        } else {
            return Ok(Some(MergeTreeItem::conflict(MergeConflict::unsupported(
                "tree entry mode changes are not supported",
                Some(this_entry.clone()),
                Some(other_entry.clone()),
                Some(base_entry.clone()),
            ))));
        };

        Ok(Some(MergeTreeItem {
            update: Some(EntryUpdate::Write(TreeEntry::new(
                new_path.clone(),
                mode,
                merged_cid,
            ))),
            conflicts,
        }))
    }

    fn resolve_binary(
        &self,
        this_entry: &TreeEntry,
        other_entry: &TreeEntry,
        base_entry: &TreeEntry,
    ) -> MergeTreeItem {
        if self.options.strategy.favors_ours() {
            MergeTreeItem::update(EntryUpdate::Write(this_entry.clone()))
        } else if self.options.strategy.favors_theirs() {
            MergeTreeItem::update(EntryUpdate::Write(other_entry.clone()))
        } else {
            MergeTreeItem::conflict(MergeConflict::structural(
                format!("binary-merge-unsupported: {}", this_entry.name),
                Some(this_entry.clone()),
                Some(other_entry.clone()),
                Some(base_entry.clone()),
            ))
        }
    }
}

fn not_implemented(kind: &ChangeKind, entry: Option<&TreeEntry>) -> MergeTreeItem {
    MergeTreeItem::conflict(MergeConflict::unsupported(
        format!("change combination involving {:?} is not implemented", kind),
        entry.cloned(),
        None,
        None,
    ))
}

/// Overlay updates onto `this_tree` and write the merged tree: paths the
/// merge did not mention keep this side's value, writes replace, removals
/// delete. Entries land in lexicographic path order.
pub fn overlay_and_write<S: ObjectStore + ?Sized>(
    store: &S,
    this_tree: &ContentId,
    updates: &[EntryUpdate],
) -> Result<ContentId, MergeError> {
    let mut merged: BTreeMap<BString, _> = flatten_tree(store, this_tree)?;
    for update in updates {
        match update {
            EntryUpdate::Write(entry) => {
                merged.insert(entry.name.clone(), (entry.mode, entry.cid));
            }
            EntryUpdate::Remove(path) => {
                merged.remove(path);
            }
        }
    }
    Ok(write_nested_tree(store, &merged)?)
}
