//! Tree flattening and rebuilding.
//!
//! The tree merge works over flat maps of full repository-relative paths;
//! the store holds nested trees. These helpers convert in both directions.

use std::collections::BTreeMap;

use bstr::BString;
use trimerge_hash::ContentId;
use trimerge_object::{FileMode, Tree, TreeEntry};

use crate::{ObjectStore, StoreError};

/// Flatten a stored tree into `path → (mode, cid)` for every leaf entry.
///
/// Directories are descended into, not recorded; the resulting map iterates
/// in lexicographic path order.
pub fn flatten_tree<S: ObjectStore + ?Sized>(
    store: &S,
    tree_id: &ContentId,
) -> Result<BTreeMap<BString, (FileMode, ContentId)>, StoreError> {
    let mut map = BTreeMap::new();
    flatten_into(store, tree_id, &BString::from(""), &mut map)?;
    Ok(map)
}

fn flatten_into<S: ObjectStore + ?Sized>(
    store: &S,
    tree_id: &ContentId,
    prefix: &BString,
    map: &mut BTreeMap<BString, (FileMode, ContentId)>,
) -> Result<(), StoreError> {
    let tree = store.get_tree(tree_id)?;
    for entry in tree.entries() {
        let path = join_path(prefix, &entry.name);
        if entry.mode.is_tree() {
            flatten_into(store, &entry.cid, &path, map)?;
        } else {
            map.insert(path, (entry.mode, entry.cid));
        }
    }
    Ok(())
}

/// Flatten a stored tree into full-path [`TreeEntry`] values, sorted by path.
pub fn flatten_tree_entries<S: ObjectStore + ?Sized>(
    store: &S,
    tree_id: &ContentId,
) -> Result<Vec<TreeEntry>, StoreError> {
    Ok(flatten_tree(store, tree_id)?
        .into_iter()
        .map(|(path, (mode, cid))| TreeEntry::new(path, mode, cid))
        .collect())
}

/// Write a flat `path → (mode, cid)` map back as nested trees, returning the
/// root tree's identifier. An empty map writes the empty tree.
pub fn write_nested_tree<S: ObjectStore + ?Sized>(
    store: &S,
    entries: &BTreeMap<BString, (FileMode, ContentId)>,
) -> Result<ContentId, StoreError> {
    // Group by leading path component; leaves stay at this level.
    let mut subdirs: BTreeMap<BString, BTreeMap<BString, (FileMode, ContentId)>> = BTreeMap::new();
    let mut tree = Tree::new();

    for (path, &(mode, cid)) in entries {
        match path.iter().position(|&b| b == b'/') {
            Some(slash) => {
                let dir = BString::from(&path[..slash]);
                let rest = BString::from(&path[slash + 1..]);
                subdirs.entry(dir).or_default().insert(rest, (mode, cid));
            }
            None => tree.add(TreeEntry::new(path.clone(), mode, cid)),
        }
    }

    for (dir, sub_entries) in &subdirs {
        let sub_id = write_nested_tree(store, sub_entries)?;
        tree.add(TreeEntry::new(dir.clone(), FileMode::Tree, sub_id));
    }

    store.add_tree(tree)
}

fn join_path(prefix: &BString, name: &BString) -> BString {
    if prefix.is_empty() {
        name.clone()
    } else {
        let mut p = prefix.clone();
        p.push(b'/');
        p.extend_from_slice(name);
        p
    }
}
