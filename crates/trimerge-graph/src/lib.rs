//! Commit-graph ancestry and merge-base computation.
//!
//! Finds the lowest common ancestors of commits by painting ancestry flags
//! down the commit DAG, newest first. The flag walk is generic over the
//! parent and timestamp lookups so it can run against any store (or none,
//! in tests); store-facing wrappers with timestamp caching sit on top.

mod merge_base;

pub use merge_base::{
    can_fast_forward, find_lcas, find_merge_base, find_octopus_base, is_ancestor,
};

/// Errors produced by graph traversal.
#[derive(Debug, thiserror::Error)]
pub enum GraphError {
    #[error(transparent)]
    Store(#[from] trimerge_store::StoreError),
}
