//! Top-level merge orchestration.
//!
//! Resolves the two commits to trees, picks (or synthesizes) the merge
//! base, drives the tree merge, and, when no structural conflict blocked
//! it, overlays the updates onto this side's tree and writes the merged
//! tree. Virtual commits created for base synthesis are removed from the
//! store on every exit path; their trees stay, since the merged result may
//! reference them.

use tracing::{debug, trace};
use trimerge_graph::find_merge_base;
use trimerge_hash::ContentId;
use trimerge_store::ObjectStore;

use crate::tree::{merge_trees, overlay_and_write};
use crate::virtual_base::{synthesize_virtual_base, write_empty_virtual_base};
use crate::{MergeError, MergeOptions, MergeResults, MergeStrategy};

/// Perform a merge of exactly two commits: `commits[0]` is this side,
/// `commits[1]` the other.
///
/// Input validation failures (commit count) come back as a result carrying
/// a single structural conflict; store failures propagate as errors.
pub fn merge<S: ObjectStore + ?Sized>(
    store: &S,
    options: &MergeOptions,
    commits: &[ContentId],
) -> Result<MergeResults, MergeError> {
    let mut vcommits = Vec::new();
    let outcome = merge_inner(store, options, commits, &mut vcommits);

    // Virtual commits never outlive the invocation, even on failure.
    let cleanup = remove_virtual_commits(store, &vcommits);
    match (outcome, cleanup) {
        (Err(err), _) => Err(err),
        (Ok(_), Err(err)) => Err(err),
        (Ok(results), Ok(())) => Ok(results),
    }
}

/// Merge with the strategy given by its string identifier.
///
/// An unknown identifier rejects the merge with a single structural
/// conflict and no tree, without touching the store.
pub fn merge_with_strategy_name<S: ObjectStore + ?Sized>(
    store: &S,
    options: &MergeOptions,
    strategy_name: &str,
    commits: &[ContentId],
) -> Result<MergeResults, MergeError> {
    match MergeStrategy::from_name(strategy_name) {
        Some(strategy) => merge(store, &options.with_strategy(strategy), commits),
        None => Ok(MergeResults::rejected(format!(
            "unknown-strategy: {}",
            strategy_name
        ))),
    }
}

fn merge_inner<S: ObjectStore + ?Sized>(
    store: &S,
    options: &MergeOptions,
    commits: &[ContentId],
    vcommits: &mut Vec<ContentId>,
) -> Result<MergeResults, MergeError> {
    let mut results = MergeResults::new();

    let &[this_commit, other_commit] = commits else {
        return Ok(MergeResults::rejected("can only merge two commits"));
    };
    check_cancelled(options)?;

    let invocation = format!("{}-{}", this_commit.short_hex(), other_commit.short_hex());

    let lcas = find_merge_base(store, commits)?;
    debug!(count = lcas.len(), "merge bases found");

    let mut merge_base = match lcas.last() {
        // Default to the newest merge base by commit time.
        Some(newest) => *newest,
        None => write_empty_virtual_base(store, this_commit, other_commit, &invocation, vcommits)?,
    };

    // Several bases under a recursive strategy: merge them into a single
    // virtual base. A failed synthesis silently keeps the newest real LCA.
    if lcas.len() > 1 && options.strategy.is_recursive() {
        match synthesize_virtual_base(store, options, &lcas, &invocation, vcommits)? {
            Some(virtual_base) => merge_base = virtual_base,
            None => debug!(base = %merge_base.short_hex(), "falling back to newest merge base"),
        }
        debug!(base = %merge_base.short_hex(), "merge base selected");
    }

    check_cancelled(options)?;
    let this_tree = store.get_commit(&this_commit)?.tree;
    let other_tree = store.get_commit(&other_commit)?.tree;
    let base_tree = store.get_commit(&merge_base)?.tree;

    // Walk every changed entry before building the merged tree; chunk
    // conflicts do not stop the walk, structural conflicts only block the
    // final write.
    for item in merge_trees(store, options, &this_tree, &other_tree, &base_tree)? {
        let item = item?;
        for conflict in item.conflicts {
            trace!(kind = ?conflict.kind, message = %conflict.message, "merge conflict");
            if conflict.is_blocking() {
                results.add_structural_conflict(conflict);
            } else {
                results.add_chunk_conflict(conflict);
            }
        }
        if let Some(update) = item.update {
            trace!(path = %update.path(), "merged entry");
            results.add_entry(update);
        }
    }

    if results.is_complete() {
        check_cancelled(options)?;
        let tree_id = overlay_and_write(store, &this_tree, &results.updated_entries)?;
        debug!(tree = %tree_id.short_hex(), "merged tree written");
        results.tree_id = Some(tree_id);
    }

    Ok(results)
}

fn remove_virtual_commits<S: ObjectStore + ?Sized>(
    store: &S,
    vcommits: &[ContentId],
) -> Result<(), MergeError> {
    for vcommit in vcommits {
        debug!(commit = %vcommit.short_hex(), "removing virtual commit");
        store.remove_object(vcommit)?;
    }
    Ok(())
}

fn check_cancelled(options: &MergeOptions) -> Result<(), MergeError> {
    if options.is_cancelled() {
        Err(MergeError::Cancelled)
    } else {
        Ok(())
    }
}
