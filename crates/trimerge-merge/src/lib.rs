//! Recursive three-way merge engine.
//!
//! Given two commits in a content-addressed object store, computes a merged
//! tree: merge-base discovery over the commit DAG (with recursive virtual
//! merge-base synthesis when the DAG yields several), a tree-level merge
//! classifying per-path outcomes, and diff3 content merges for files both
//! sides touched. Structural conflicts block the merged tree; chunk
//! conflicts are embedded inline with diff3 markers and reported for hand
//! merging.

pub mod diff3;
pub mod orchestrate;
pub mod tree;
pub mod virtual_base;

use std::collections::BTreeSet;
use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use bstr::BString;
use trimerge_diff::tree::RenameDetector;
use trimerge_diff::DiffVariant;
use trimerge_hash::ContentId;
use trimerge_object::TreeEntry;

pub use diff3::{merge_blobs, ConflictRange, FileMergeResult, MergeLabels};
pub use orchestrate::{merge, merge_with_strategy_name};
pub use tree::{merge_trees, EntryUpdate, MergeTreeItem};

/// Merge strategies, by their git-facing string identifiers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum MergeStrategy {
    /// Recursive merge with virtual merge bases (default).
    #[default]
    Ort,
    /// Ort, resolving content conflicts in favor of this side.
    OrtOurs,
    /// Ort, resolving content conflicts in favor of the other side.
    OrtTheirs,
    /// Single merge base, no virtual-base synthesis.
    Resolve,
    /// Resolve, favoring this side.
    ResolveOurs,
    /// Resolve, favoring the other side.
    ResolveTheirs,
    /// Alias family of ort kept for compatibility with older configs.
    Recursive,
}

impl MergeStrategy {
    /// Parse a strategy identifier.
    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            "ort" => Some(Self::Ort),
            "ort-ours" => Some(Self::OrtOurs),
            "ort-theirs" => Some(Self::OrtTheirs),
            "resolve" => Some(Self::Resolve),
            "resolve-ours" => Some(Self::ResolveOurs),
            "resolve-theirs" => Some(Self::ResolveTheirs),
            "recursive" => Some(Self::Recursive),
            _ => None,
        }
    }

    /// The canonical identifier.
    pub fn name(&self) -> &'static str {
        match self {
            Self::Ort => "ort",
            Self::OrtOurs => "ort-ours",
            Self::OrtTheirs => "ort-theirs",
            Self::Resolve => "resolve",
            Self::ResolveOurs => "resolve-ours",
            Self::ResolveTheirs => "resolve-theirs",
            Self::Recursive => "recursive",
        }
    }

    /// Strategies that synthesize a virtual base when several LCAs exist.
    pub fn is_recursive(&self) -> bool {
        matches!(
            self,
            Self::Ort | Self::OrtOurs | Self::OrtTheirs | Self::Recursive
        )
    }

    /// Conflicting chunks resolve to this side.
    pub fn favors_ours(&self) -> bool {
        matches!(self, Self::OrtOurs | Self::ResolveOurs)
    }

    /// Conflicting chunks resolve to the other side.
    pub fn favors_theirs(&self) -> bool {
        matches!(self, Self::OrtTheirs | Self::ResolveTheirs)
    }
}

/// Options for a merge invocation.
#[derive(Clone)]
pub struct MergeOptions {
    /// Line-matching variant for file-level merges. `None` declines file
    /// merging entirely, turning content overlaps into structural conflicts.
    pub file_merger: Option<DiffVariant>,
    /// Optional rename pairing over the raw tree changes.
    pub rename_detector: Option<Arc<dyn RenameDetector>>,
    /// Merge strategy.
    pub strategy: MergeStrategy,
    /// Labels used in diff3 conflict markers.
    pub labels: MergeLabels,
    /// Cooperative cancellation, checked at object-store boundaries.
    pub cancel: Option<Arc<AtomicBool>>,
}

impl Default for MergeOptions {
    fn default() -> Self {
        Self {
            file_merger: Some(DiffVariant::Myers),
            rename_detector: None,
            strategy: MergeStrategy::Ort,
            labels: MergeLabels::default(),
            cancel: None,
        }
    }
}

impl MergeOptions {
    /// Copy of these options running under a different strategy.
    pub fn with_strategy(&self, strategy: MergeStrategy) -> Self {
        let mut options = self.clone();
        options.strategy = strategy;
        options
    }

    /// True once the caller has requested cancellation.
    pub fn is_cancelled(&self) -> bool {
        self.cancel
            .as_ref()
            .map_or(false, |flag| flag.load(Ordering::Relaxed))
    }
}

impl fmt::Debug for MergeOptions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MergeOptions")
            .field("file_merger", &self.file_merger)
            .field("rename_detector", &self.rename_detector.is_some())
            .field("strategy", &self.strategy)
            .field("labels", &self.labels)
            .field("cancel", &self.cancel.is_some())
            .finish()
    }
}

/// Conflict classification.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConflictKind {
    /// Tree-level disagreement; blocks the merged tree.
    Structural,
    /// Line-level disagreement, embedded inline with diff3 markers.
    Chunk,
    /// A documented case the engine declines to handle.
    Unsupported,
}

/// A single merge conflict with the entries involved.
#[derive(Debug, Clone)]
pub struct MergeConflict {
    pub kind: ConflictKind,
    pub this_entry: Option<TreeEntry>,
    pub other_entry: Option<TreeEntry>,
    pub base_entry: Option<TreeEntry>,
    pub message: String,
}

impl MergeConflict {
    pub fn structural(
        message: impl Into<String>,
        this_entry: Option<TreeEntry>,
        other_entry: Option<TreeEntry>,
        base_entry: Option<TreeEntry>,
    ) -> Self {
        Self {
            kind: ConflictKind::Structural,
            this_entry,
            other_entry,
            base_entry,
            message: message.into(),
        }
    }

    pub fn chunk(
        message: impl Into<String>,
        this_entry: Option<TreeEntry>,
        other_entry: Option<TreeEntry>,
        base_entry: Option<TreeEntry>,
    ) -> Self {
        Self {
            kind: ConflictKind::Chunk,
            this_entry,
            other_entry,
            base_entry,
            message: message.into(),
        }
    }

    pub fn unsupported(
        message: impl Into<String>,
        this_entry: Option<TreeEntry>,
        other_entry: Option<TreeEntry>,
        base_entry: Option<TreeEntry>,
    ) -> Self {
        Self {
            kind: ConflictKind::Unsupported,
            this_entry,
            other_entry,
            base_entry,
            message: message.into(),
        }
    }

    /// Does this conflict block the merged tree from being written?
    pub fn is_blocking(&self) -> bool {
        matches!(self.kind, ConflictKind::Structural | ConflictKind::Unsupported)
    }
}

/// Aggregated outcome of a merge invocation.
#[derive(Debug, Default)]
pub struct MergeResults {
    /// Tree-level conflicts (structural and unsupported).
    pub structural_conflicts: Vec<MergeConflict>,
    /// Line-level conflicts carried inline in merged blobs.
    pub chunk_conflicts: Vec<MergeConflict>,
    /// Per-path updates the merge produced.
    pub updated_entries: Vec<EntryUpdate>,
    /// Paths whose merged content needs hand merging.
    pub hand_merge_paths: BTreeSet<BString>,
    /// The merged tree, present only when no structural conflicts arose.
    pub tree_id: Option<ContentId>,
}

impl MergeResults {
    pub fn new() -> Self {
        Self::default()
    }

    /// A result rejected during input validation: one structural conflict,
    /// no merged tree.
    pub fn rejected(message: impl Into<String>) -> Self {
        let mut results = Self::new();
        results
            .structural_conflicts
            .push(MergeConflict::structural(message, None, None, None));
        results
    }

    pub fn add_structural_conflict(&mut self, conflict: MergeConflict) {
        self.structural_conflicts.push(conflict);
    }

    pub fn add_chunk_conflict(&mut self, conflict: MergeConflict) {
        if let Some(entry) = &conflict.this_entry {
            self.hand_merge_paths.insert(entry.name.clone());
        }
        self.chunk_conflicts.push(conflict);
    }

    pub fn add_entry(&mut self, update: EntryUpdate) {
        self.updated_entries.push(update);
    }

    pub fn has_structural_conflicts(&self) -> bool {
        !self.structural_conflicts.is_empty()
    }

    pub fn has_chunk_conflicts(&self) -> bool {
        !self.chunk_conflicts.is_empty()
    }

    /// The merge ran to completion (chunk conflicts do not block it).
    pub fn is_complete(&self) -> bool {
        self.structural_conflicts.is_empty()
    }

    pub fn needs_hand_merge(&self, path: &BString) -> bool {
        self.hand_merge_paths.contains(path)
    }
}

/// Errors produced by merge operations.
#[derive(Debug, thiserror::Error)]
pub enum MergeError {
    #[error("merge cancelled")]
    Cancelled,

    #[error(transparent)]
    Store(#[from] trimerge_store::StoreError),

    #[error(transparent)]
    Diff(#[from] trimerge_diff::DiffError),

    #[error(transparent)]
    Graph(#[from] trimerge_graph::GraphError),
}
