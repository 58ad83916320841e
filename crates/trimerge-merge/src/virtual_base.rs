//! Virtual merge-base synthesis.
//!
//! When the DAG yields more than one lowest common ancestor, the recursive
//! strategies fold the LCAs pairwise, newest first: each pair is three-way
//! merged against its own merge base (itself synthesized the same way) and
//! the merged tree becomes a synthetic commit with the pair as parents.
//! Chunk conflicts are tolerated inside the synthesized trees; a structural
//! conflict aborts the whole synthesis and the caller falls back to the
//! newest real LCA. The pending pairs live on an explicit stack, so a long
//! LCA chain cannot overflow the call stack.

use std::collections::BTreeMap;

use bstr::BString;
use tracing::debug;
use trimerge_graph::find_merge_base;
use trimerge_hash::ContentId;
use trimerge_object::Commit;
use trimerge_store::treewalk::write_nested_tree;
use trimerge_store::ObjectStore;

use crate::tree::{merge_trees, overlay_and_write};
use crate::{MergeError, MergeOptions};

/// Author marker carried by every synthesized merge-base commit.
pub const VIRTUAL_AUTHOR: &str = "trimerge-virtual <virtual@trimerge>";

/// Is this commit a synthesized merge base?
pub fn is_virtual_commit(commit: &Commit) -> bool {
    commit.author.starts_with(VIRTUAL_AUTHOR.as_bytes())
}

/// Write a virtual commit over `tree` with the two merged commits as
/// parents. The invocation tag keeps concurrent merges from synthesizing
/// colliding commits; the timestamp sits just past both parents so the
/// LCA walk orders it consistently.
pub fn write_virtual_commit<S: ObjectStore + ?Sized>(
    store: &S,
    tree: ContentId,
    parent1: ContentId,
    parent2: ContentId,
    invocation: &str,
) -> Result<ContentId, MergeError> {
    let stamp1 = store.get_commit(&parent1)?.commit_time;
    let stamp2 = store.get_commit(&parent2)?.commit_time;
    let commit = Commit {
        tree,
        parents: vec![parent1, parent2],
        commit_time: stamp1.max(stamp2) + 1,
        author: BString::from(format!("{} {}", VIRTUAL_AUTHOR, invocation)),
        message: BString::from(format!(
            "virtual merge base of {} {}\n",
            parent1.to_hex(),
            parent2.to_hex()
        )),
    };
    let cid = store.add_commit(commit)?;
    debug!(commit = %cid.short_hex(), "created virtual commit");
    Ok(cid)
}

/// Write a virtual commit over the empty tree, used as the merge base when
/// two histories share no ancestor at all.
pub fn write_empty_virtual_base<S: ObjectStore + ?Sized>(
    store: &S,
    parent1: ContentId,
    parent2: ContentId,
    invocation: &str,
    vcommits: &mut Vec<ContentId>,
) -> Result<ContentId, MergeError> {
    let empty_tree = write_nested_tree(store, &BTreeMap::new())?;
    let cid = write_virtual_commit(store, empty_tree, parent1, parent2, invocation)?;
    debug!(commit = %cid.short_hex(), "empty tree acting as ancestor via virtual commit");
    vcommits.push(cid);
    Ok(cid)
}

/// Fold multiple LCAs (oldest-first, as the finder returns them) into one
/// synthesized base commit.
///
/// Returns `None` when a structural conflict aborted the synthesis; every
/// virtual commit created along the way is appended to `vcommits` either
/// way so the orchestrator can clean up.
pub fn synthesize_virtual_base<S: ObjectStore + ?Sized>(
    store: &S,
    options: &MergeOptions,
    lcas: &[ContentId],
    invocation: &str,
    vcommits: &mut Vec<ContentId>,
) -> Result<Option<ContentId>, MergeError> {
    let mut ordered: Vec<ContentId> = lcas.to_vec();
    ordered.reverse(); // newest first
    let mut base = match ordered.first() {
        Some(first) => *first,
        None => return Ok(None),
    };
    for lca in &ordered[1..] {
        match merge_pair(store, options, base, *lca, invocation, vcommits)? {
            Some(merged) => base = merged,
            None => {
                debug!("virtual base synthesis aborted by structural conflict");
                return Ok(None);
            }
        }
    }
    Ok(Some(base))
}

/// One pending pair merge. `base` and `pending` stay unset until the
/// pair's own LCAs have been computed.
struct PairFrame {
    b1: ContentId,
    b2: ContentId,
    base: Option<ContentId>,
    pending: Option<Vec<ContentId>>,
}

impl PairFrame {
    fn new(b1: ContentId, b2: ContentId) -> Self {
        Self {
            b1,
            b2,
            base: None,
            pending: None,
        }
    }
}

/// Merge the pair (b1, b2) into a virtual commit, synthesizing their own
/// merge base first if the pair itself has several LCAs.
fn merge_pair<S: ObjectStore + ?Sized>(
    store: &S,
    options: &MergeOptions,
    b1: ContentId,
    b2: ContentId,
    invocation: &str,
    vcommits: &mut Vec<ContentId>,
) -> Result<Option<ContentId>, MergeError> {
    let mut stack = vec![PairFrame::new(b1, b2)];
    let mut completed: Option<ContentId> = None;

    while !stack.is_empty() {
        if options.is_cancelled() {
            return Err(MergeError::Cancelled);
        }
        let top = stack.len() - 1;

        // First visit: find the pair's own merge base(s).
        if stack[top].pending.is_none() {
            let mut lcas = find_merge_base(store, &[stack[top].b1, stack[top].b2])?;
            lcas.reverse();
            match lcas.split_first() {
                Some((first, rest)) => {
                    stack[top].base = Some(*first);
                    stack[top].pending = Some(rest.to_vec());
                }
                None => {
                    let vbase = write_empty_virtual_base(
                        store,
                        stack[top].b1,
                        stack[top].b2,
                        invocation,
                        vcommits,
                    )?;
                    stack[top].base = Some(vbase);
                    stack[top].pending = Some(Vec::new());
                }
            }
            continue;
        }

        // A child frame just finished: its virtual commit is the new base.
        if let Some(child_result) = completed.take() {
            stack[top].base = Some(child_result);
        }

        let base = match stack[top].base {
            Some(base) => base,
            None => return Ok(None),
        };

        // Fold the next remaining LCA into the running base first.
        let next_lca = stack[top].pending.as_mut().and_then(|pending| {
            if pending.is_empty() {
                None
            } else {
                Some(pending.remove(0))
            }
        });
        if let Some(lca) = next_lca {
            stack.push(PairFrame::new(base, lca));
            continue;
        }

        // Base chain resolved: merge the pair against it.
        match merge_pair_with_base(store, options, stack[top].b1, stack[top].b2, base)? {
            None => return Ok(None),
            Some(tree) => {
                let vcommit =
                    write_virtual_commit(store, tree, stack[top].b1, stack[top].b2, invocation)?;
                vcommits.push(vcommit);
                completed = Some(vcommit);
                stack.pop();
            }
        }
    }

    Ok(completed)
}

/// Tree-merge b1 and b2 against the given base commit, tolerating chunk
/// conflicts. Returns the merged tree, or `None` on a structural conflict.
fn merge_pair_with_base<S: ObjectStore + ?Sized>(
    store: &S,
    options: &MergeOptions,
    b1: ContentId,
    b2: ContentId,
    base: ContentId,
) -> Result<Option<ContentId>, MergeError> {
    let b1_tree = store.get_commit(&b1)?.tree;
    let b2_tree = store.get_commit(&b2)?.tree;
    let base_tree = store.get_commit(&base)?.tree;

    let mut updates = Vec::new();
    for item in merge_trees(store, options, &b1_tree, &b2_tree, &base_tree)? {
        let item = item?;
        if item.conflicts.iter().any(|c| c.is_blocking()) {
            return Ok(None);
        }
        if let Some(update) = item.update {
            updates.push(update);
        }
    }

    let merged_tree = overlay_and_write(store, &b1_tree, &updates)?;
    Ok(Some(merged_tree))
}
