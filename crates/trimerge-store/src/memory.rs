use std::collections::HashMap;
use std::sync::Mutex;

use trimerge_hash::hasher::Hasher;
use trimerge_hash::{ContentId, HashAlgorithm};
use trimerge_object::{Blob, Commit, Object, Tree};

use crate::{ObjectStore, StoreError};

/// Content-addressed in-memory object store.
///
/// Identifiers are computed over the canonical object serialization with
/// the same `"{type} {len}\0"` framing git uses, so identical content
/// always lands on the same identifier regardless of insertion order.
pub struct MemoryStore {
    algo: HashAlgorithm,
    objects: Mutex<HashMap<ContentId, Object>>,
}

impl MemoryStore {
    /// An empty SHA-1 store.
    pub fn new() -> Self {
        Self::with_algorithm(HashAlgorithm::Sha1)
    }

    /// An empty store using the given hash algorithm.
    pub fn with_algorithm(algo: HashAlgorithm) -> Self {
        Self {
            algo,
            objects: Mutex::new(HashMap::new()),
        }
    }

    /// Number of stored objects.
    pub fn len(&self) -> usize {
        self.objects.lock().unwrap().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Snapshot of every identifier currently in the store.
    pub fn cids(&self) -> Vec<ContentId> {
        self.objects.lock().unwrap().keys().copied().collect()
    }

    /// Fetch a whole object, if present.
    pub fn get(&self, cid: &ContentId) -> Option<Object> {
        self.objects.lock().unwrap().get(cid).cloned()
    }

    fn add(&self, object: Object) -> Result<ContentId, StoreError> {
        let content = object.serialize_content();
        let cid = Hasher::hash_object(self.algo, object.object_type().name(), &content)?;
        self.objects.lock().unwrap().entry(cid).or_insert(object);
        Ok(cid)
    }
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

impl ObjectStore for MemoryStore {
    fn get_blob(&self, cid: &ContentId) -> Result<Vec<u8>, StoreError> {
        match self.get(cid) {
            Some(Object::Blob(blob)) => Ok(blob.data),
            Some(other) => Err(StoreError::UnexpectedType {
                cid: *cid,
                expected: "blob",
                actual: other.object_type().name(),
            }),
            None => Err(StoreError::NotFound(*cid)),
        }
    }

    fn get_tree(&self, cid: &ContentId) -> Result<Tree, StoreError> {
        match self.get(cid) {
            Some(Object::Tree(tree)) => Ok(tree),
            Some(other) => Err(StoreError::UnexpectedType {
                cid: *cid,
                expected: "tree",
                actual: other.object_type().name(),
            }),
            None => Err(StoreError::NotFound(*cid)),
        }
    }

    fn get_commit(&self, cid: &ContentId) -> Result<Commit, StoreError> {
        match self.get(cid) {
            Some(Object::Commit(commit)) => Ok(commit),
            Some(other) => Err(StoreError::UnexpectedType {
                cid: *cid,
                expected: "commit",
                actual: other.object_type().name(),
            }),
            None => Err(StoreError::NotFound(*cid)),
        }
    }

    fn add_blob(&self, data: Vec<u8>) -> Result<ContentId, StoreError> {
        self.add(Object::Blob(Blob::new(data)))
    }

    fn add_tree(&self, tree: Tree) -> Result<ContentId, StoreError> {
        self.add(Object::Tree(tree))
    }

    fn add_commit(&self, commit: Commit) -> Result<ContentId, StoreError> {
        self.add(Object::Commit(commit))
    }

    fn remove_object(&self, cid: &ContentId) -> Result<(), StoreError> {
        self.objects.lock().unwrap().remove(cid);
        Ok(())
    }

    fn contains(&self, cid: &ContentId) -> bool {
        self.objects.lock().unwrap().contains_key(cid)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bstr::BString;
    use trimerge_object::{FileMode, TreeEntry};

    #[test]
    fn blob_roundtrip() {
        let store = MemoryStore::new();
        let cid = store.add_blob(b"hello\n".to_vec()).unwrap();
        assert_eq!(store.get_blob(&cid).unwrap(), b"hello\n");
    }

    #[test]
    fn identical_content_same_cid() {
        let store = MemoryStore::new();
        let a = store.add_blob(b"same".to_vec()).unwrap();
        let b = store.add_blob(b"same".to_vec()).unwrap();
        assert_eq!(a, b);
        assert_eq!(store.len(), 1);
    }

    #[test]
    fn empty_blob_matches_git() {
        let store = MemoryStore::new();
        let cid = store.add_blob(Vec::new()).unwrap();
        assert_eq!(cid.to_hex(), "e69de29bb2d1d6434b8b29ae775ad8c2e48c5391");
    }

    #[test]
    fn type_mismatch_reported() {
        let store = MemoryStore::new();
        let cid = store.add_blob(b"data".to_vec()).unwrap();
        assert!(matches!(
            store.get_tree(&cid),
            Err(StoreError::UnexpectedType { .. })
        ));
    }

    #[test]
    fn missing_object_reported() {
        let store = MemoryStore::new();
        let absent = ContentId::Sha1([9; 20]);
        assert!(matches!(
            store.get_blob(&absent),
            Err(StoreError::NotFound(_))
        ));
    }

    #[test]
    fn remove_is_idempotent() {
        let store = MemoryStore::new();
        let cid = store.add_blob(b"x".to_vec()).unwrap();
        store.remove_object(&cid).unwrap();
        assert!(!store.contains(&cid));
        store.remove_object(&cid).unwrap();
    }

    #[test]
    fn tree_roundtrip_preserves_order() {
        let store = MemoryStore::new();
        let blob = store.add_blob(b"x".to_vec()).unwrap();
        let tree = Tree::from_entries(vec![
            TreeEntry::new(BString::from("b.txt"), FileMode::Regular, blob),
            TreeEntry::new(BString::from("a.txt"), FileMode::Regular, blob),
        ])
        .unwrap();
        let cid = store.add_tree(tree).unwrap();
        let read = store.get_tree(&cid).unwrap();
        let names: Vec<_> = read.entries().iter().map(|e| e.name.clone()).collect();
        assert_eq!(names, vec![BString::from("a.txt"), BString::from("b.txt")]);
    }
}
