//! Object-store interface and in-memory store for the trimerge merge engine.
//!
//! The merge core only needs a narrow window onto wherever objects actually
//! live: fetch a blob, tree, or commit by identifier, add new ones, and
//! delete the synthetic commits it created. [`ObjectStore`] is that window.
//! [`MemoryStore`] is the content-addressed in-memory implementation the
//! test suites run against; persistent storage formats are a separate
//! concern layered behind the same trait.

mod memory;
pub mod treewalk;

pub use memory::MemoryStore;

use trimerge_hash::ContentId;
use trimerge_object::{Commit, Tree};

/// Errors produced by object-store operations.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("object not found: {0}")]
    NotFound(ContentId),

    #[error("expected {expected} object, got {actual} for {cid}")]
    UnexpectedType {
        cid: ContentId,
        expected: &'static str,
        actual: &'static str,
    },

    #[error(transparent)]
    Object(#[from] trimerge_object::ObjectError),

    #[error(transparent)]
    Hash(#[from] trimerge_hash::HashError),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

/// The store interface the merge core requires.
///
/// Methods take `&self`; implementations serialize their own writes so a
/// merge may fan file-level work out across threads without extra locking
/// at the call sites.
pub trait ObjectStore {
    /// Fetch blob content.
    fn get_blob(&self, cid: &ContentId) -> Result<Vec<u8>, StoreError>;

    /// Fetch a tree.
    fn get_tree(&self, cid: &ContentId) -> Result<Tree, StoreError>;

    /// Fetch a commit.
    fn get_commit(&self, cid: &ContentId) -> Result<Commit, StoreError>;

    /// Store blob content, returning its identifier.
    fn add_blob(&self, data: Vec<u8>) -> Result<ContentId, StoreError>;

    /// Store a tree, returning its identifier.
    fn add_tree(&self, tree: Tree) -> Result<ContentId, StoreError>;

    /// Store a commit, returning its identifier.
    fn add_commit(&self, commit: Commit) -> Result<ContentId, StoreError>;

    /// Remove an object. Removing an absent object is not an error.
    fn remove_object(&self, cid: &ContentId) -> Result<(), StoreError>;

    /// Whether an object with this identifier is present.
    fn contains(&self, cid: &ContentId) -> bool;
}
