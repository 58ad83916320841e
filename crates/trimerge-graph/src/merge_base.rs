use std::cmp::Ordering;
use std::collections::{BinaryHeap, HashMap};

use trimerge_hash::ContentId;
use trimerge_store::ObjectStore;

use crate::GraphError;

/// Ancestry flags painted onto commits during the LCA walk.
const ANC_OF_1: u8 = 1;
const ANC_OF_2: u8 = 2;
/// Do Not Consider: the commit (and everything it reaches) is superseded.
const DNC: u8 = 4;
/// Already collected as a candidate lowest common ancestor.
const LCA: u8 = 8;

/// Work-list entry, popped newest-first; timestamp ties break on the
/// identifier so the walk order is deterministic.
struct WorkItem {
    stamp: i64,
    cid: ContentId,
}

impl PartialEq for WorkItem {
    fn eq(&self, other: &Self) -> bool {
        self.stamp == other.stamp && self.cid == other.cid
    }
}

impl Eq for WorkItem {}

impl PartialOrd for WorkItem {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for WorkItem {
    fn cmp(&self, other: &Self) -> Ordering {
        self.stamp
            .cmp(&other.stamp)
            .then_with(|| self.cid.cmp(&other.cid))
    }
}

/// Find the lowest common ancestors of `c1` and any of `c2s`.
///
/// Generic over the graph lookups: `parents` returns a commit's parent
/// identifiers, `stamp` its commit timestamp. Parents with a timestamp
/// below `min_stamp` are not walked. The result is sorted oldest-first.
pub fn find_lcas<E, P, T>(
    mut parents: P,
    mut stamp: T,
    c1: &ContentId,
    c2s: &[ContentId],
    min_stamp: i64,
) -> Result<Vec<ContentId>, E>
where
    P: FnMut(&ContentId) -> Result<Vec<ContentId>, E>,
    T: FnMut(&ContentId) -> Result<i64, E>,
{
    let mut states: HashMap<ContentId, u8> = HashMap::new();
    let mut work: BinaryHeap<WorkItem> = BinaryHeap::new();
    let mut candidates: Vec<(i64, ContentId)> = Vec::new();

    states.insert(*c1, ANC_OF_1);
    work.push(WorkItem {
        stamp: stamp(c1)?,
        cid: *c1,
    });
    for c2 in c2s {
        let flags = states.entry(*c2).or_insert(0);
        *flags |= ANC_OF_2;
        work.push(WorkItem {
            stamp: stamp(c2)?,
            cid: *c2,
        });
    }

    // Walk while any queued commit is still viable. Entries already marked
    // DNC keep being popped so the mark propagates to their ancestry.
    while has_viable(&work, &states) {
        let item = match work.pop() {
            Some(item) => item,
            None => break,
        };
        // Only ancestry and DNC travel to parents; the LCA bit stays put so
        // an already-collected candidate can still be demoted by a lower one.
        let mut flags = states.get(&item.cid).copied().unwrap_or(0) & (ANC_OF_1 | ANC_OF_2 | DNC);
        if flags == ANC_OF_1 | ANC_OF_2 {
            let state = states.entry(item.cid).or_insert(0);
            if *state & LCA == 0 {
                *state |= LCA;
                candidates.push((item.stamp, item.cid));
            }
            // Parents of a common ancestor are common ancestors one
            // generation further removed, never lowest ones.
            flags |= DNC;
        }
        for parent in parents(&item.cid)? {
            let parent_flags = states.get(&parent).copied().unwrap_or(0);
            if parent_flags & flags == flags {
                continue;
            }
            let parent_stamp = stamp(&parent)?;
            if parent_stamp < min_stamp {
                continue;
            }
            states.insert(parent, parent_flags | flags);
            work.push(WorkItem {
                stamp: parent_stamp,
                cid: parent,
            });
        }
    }

    // Drop candidates later demoted by a lower common ancestor, dedup, and
    // order oldest first.
    let mut results: Vec<(i64, ContentId)> = Vec::new();
    for (dt, cid) in candidates {
        let demoted = states.get(&cid).copied().unwrap_or(0) & DNC == DNC;
        if !demoted && !results.contains(&(dt, cid)) {
            results.push((dt, cid));
        }
    }
    results.sort_by(|a, b| a.0.cmp(&b.0).then_with(|| a.1.cmp(&b.1)));
    Ok(results.into_iter().map(|(_, cid)| cid).collect())
}

fn has_viable(work: &BinaryHeap<WorkItem>, states: &HashMap<ContentId, u8>) -> bool {
    work.iter()
        .any(|item| states.get(&item.cid).map_or(false, |f| f & DNC == 0))
}

/// Find the lowest common ancestors of `commits[0]` and any of the rest.
///
/// Commit timestamps are fetched once and cached for the walk.
pub fn find_merge_base<S: ObjectStore + ?Sized>(
    store: &S,
    commits: &[ContentId],
) -> Result<Vec<ContentId>, GraphError> {
    let (c1, c2s) = match commits.split_first() {
        Some(split) => split,
        None => return Ok(Vec::new()),
    };
    if c2s.is_empty() || c2s.contains(c1) {
        return Ok(vec![*c1]);
    }
    lcas_via_store(store, c1, c2s, i64::MIN)
}

/// Find the lowest common ancestors of *all* provided commits by pairwise
/// reduction.
pub fn find_octopus_base<S: ObjectStore + ?Sized>(
    store: &S,
    commits: &[ContentId],
) -> Result<Vec<ContentId>, GraphError> {
    if commits.len() <= 2 {
        return find_merge_base(store, commits);
    }
    let mut lcas = vec![commits[0]];
    for commit in &commits[1..] {
        let mut next = Vec::new();
        for ancestor in &lcas {
            next.extend(lcas_via_store(store, commit, &[*ancestor], i64::MIN)?);
        }
        lcas = next;
    }
    Ok(lcas)
}

/// Is `c1` an ancestor of `c2`?
///
/// Runs the LCA walk bounded below by `c1`'s own timestamp; `c1` is an
/// ancestor exactly when it is the sole lowest common ancestor.
pub fn is_ancestor<S: ObjectStore + ?Sized>(
    store: &S,
    c1: &ContentId,
    c2: &ContentId,
) -> Result<bool, GraphError> {
    if c1 == c2 {
        return Ok(true);
    }
    let min_stamp = store.get_commit(c1)?.commit_time;
    let lcas = lcas_via_store(store, c1, &[*c2], min_stamp)?;
    Ok(lcas == [*c1])
}

/// Is it possible to fast-forward from `c1` to `c2`?
pub fn can_fast_forward<S: ObjectStore + ?Sized>(
    store: &S,
    c1: &ContentId,
    c2: &ContentId,
) -> Result<bool, GraphError> {
    is_ancestor(store, c1, c2)
}

fn lcas_via_store<S: ObjectStore + ?Sized>(
    store: &S,
    c1: &ContentId,
    c2s: &[ContentId],
    min_stamp: i64,
) -> Result<Vec<ContentId>, GraphError> {
    let mut stamps: HashMap<ContentId, i64> = HashMap::new();
    find_lcas(
        |cid| Ok(store.get_commit(cid)?.parents),
        |cid| match stamps.get(cid) {
            Some(&stamp) => Ok(stamp),
            None => {
                let stamp = store.get_commit(cid)?.commit_time;
                stamps.insert(*cid, stamp);
                Ok(stamp)
            }
        },
        c1,
        c2s,
        min_stamp,
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cid(n: u8) -> ContentId {
        ContentId::Sha1([n; 20])
    }

    /// Run find_lcas over an in-test DAG: (commit, stamp, parents) triples.
    fn lcas(graph: &[(u8, i64, &[u8])], c1: u8, c2s: &[u8]) -> Vec<ContentId> {
        let parents_of: HashMap<ContentId, Vec<ContentId>> = graph
            .iter()
            .map(|(c, _, ps)| (cid(*c), ps.iter().map(|p| cid(*p)).collect()))
            .collect();
        let stamp_of: HashMap<ContentId, i64> =
            graph.iter().map(|(c, s, _)| (cid(*c), *s)).collect();
        let c2s: Vec<ContentId> = c2s.iter().map(|c| cid(*c)).collect();
        find_lcas::<std::convert::Infallible, _, _>(
            |c| Ok(parents_of.get(c).cloned().unwrap_or_default()),
            |c| Ok(stamp_of[c]),
            &cid(c1),
            &c2s,
            i64::MIN,
        )
        .unwrap()
    }

    #[test]
    fn diamond_has_single_base() {
        // 1 ← 2, 1 ← 3
        let graph: &[(u8, i64, &[u8])] = &[(1, 10, &[]), (2, 20, &[1]), (3, 30, &[1])];
        assert_eq!(lcas(graph, 2, &[3]), vec![cid(1)]);
    }

    #[test]
    fn criss_cross_yields_both_bases() {
        // 1 ← 2, 1 ← 3, then 4 and 5 each have parents {2, 3}.
        let graph: &[(u8, i64, &[u8])] = &[
            (1, 10, &[]),
            (2, 20, &[1]),
            (3, 30, &[1]),
            (4, 40, &[2, 3]),
            (5, 50, &[2, 3]),
        ];
        assert_eq!(lcas(graph, 4, &[5]), vec![cid(2), cid(3)]);
    }

    #[test]
    fn lca_parents_are_excluded() {
        // Chain 1 ← 2 ← 3 ← 4; base of 3 and 4 is 3 itself, never 2 or 1.
        let graph: &[(u8, i64, &[u8])] =
            &[(1, 10, &[]), (2, 20, &[1]), (3, 30, &[2]), (4, 40, &[3])];
        assert_eq!(lcas(graph, 3, &[4]), vec![cid(3)]);
    }

    #[test]
    fn disjoint_histories_have_no_base() {
        let graph: &[(u8, i64, &[u8])] = &[(1, 10, &[]), (2, 20, &[])];
        assert!(lcas(graph, 1, &[2]).is_empty());
    }

    #[test]
    fn results_sorted_oldest_first() {
        // Two common ancestors at different depths along unrelated lines.
        let graph: &[(u8, i64, &[u8])] = &[
            (1, 10, &[]),
            (2, 25, &[]),
            (3, 30, &[1, 2]),
            (4, 40, &[1, 2]),
        ];
        assert_eq!(lcas(graph, 3, &[4]), vec![cid(1), cid(2)]);
    }

    #[test]
    fn min_stamp_bounds_the_walk() {
        let parents_of: HashMap<ContentId, Vec<ContentId>> = [
            (cid(1), vec![]),
            (cid(2), vec![cid(1)]),
            (cid(3), vec![cid(2)]),
        ]
        .into_iter()
        .collect();
        let stamps: HashMap<ContentId, i64> =
            [(cid(1), 10), (cid(2), 20), (cid(3), 30)].into_iter().collect();
        // Bounded at commit 2's stamp, the walk from {2, 3} still finds 2.
        let result = find_lcas::<std::convert::Infallible, _, _>(
            |c| Ok(parents_of.get(c).cloned().unwrap_or_default()),
            |c| Ok(stamps[c]),
            &cid(2),
            &[cid(3)],
            20,
        )
        .unwrap();
        assert_eq!(result, vec![cid(2)]);
    }
}
