//! Patience-style (ndiff) matching.
//!
//! Lines unique to both sequences act as anchors: the longest chain of
//! anchors consistent with both orderings fixes the skeleton of the match
//! and the stretches between anchors are matched independently. Pending
//! stretches live on an explicit work stack rather than the call stack;
//! a stretch with no unique common line defers to Myers.

use std::collections::HashMap;

use super::{all_deletes, all_inserts, Edit, EditOp};

/// One unit of pending work: either a subrange still to be matched, or an
/// edit whose place in the script is already decided (anchors, shared
/// tails). The stack pops in script order.
enum Task {
    Stretch {
        base_lo: usize,
        base_hi: usize,
        side_lo: usize,
        side_hi: usize,
    },
    Emit(Edit),
}

/// Compute an edit script using patience-style matching.
pub fn diff(base: &[&[u8]], side: &[&[u8]]) -> Vec<Edit> {
    let mut edits = Vec::new();
    let mut work = vec![Task::Stretch {
        base_lo: 0,
        base_hi: base.len(),
        side_lo: 0,
        side_hi: side.len(),
    }];

    while let Some(task) = work.pop() {
        let (mut base_lo, mut base_hi, mut side_lo, mut side_hi) = match task {
            Task::Emit(edit) => {
                edits.push(edit);
                continue;
            }
            Task::Stretch {
                base_lo,
                base_hi,
                side_lo,
                side_hi,
            } => (base_lo, base_hi, side_lo, side_hi),
        };

        // Shared head lines are equal right now; emit them as we go.
        while base_lo < base_hi && side_lo < side_hi && base[base_lo] == side[side_lo] {
            edits.push(Edit {
                op: EditOp::Equal,
                base_index: base_lo,
                side_index: side_lo,
            });
            base_lo += 1;
            side_lo += 1;
        }

        // Shared tail lines come after whatever the middle produces, so
        // they are queued below the middle work (popped last, in order).
        let mut tail = 0;
        while base_hi > base_lo && side_hi > side_lo && base[base_hi - 1] == side[side_hi - 1] {
            base_hi -= 1;
            side_hi -= 1;
            tail += 1;
        }
        for j in (0..tail).rev() {
            work.push(Task::Emit(Edit {
                op: EditOp::Equal,
                base_index: base_hi + j,
                side_index: side_hi + j,
            }));
        }

        if base_lo == base_hi {
            edits.extend(all_inserts(side_hi - side_lo, base_lo, side_lo));
            continue;
        }
        if side_lo == side_hi {
            edits.extend(all_deletes(base_hi - base_lo, base_lo, side_lo));
            continue;
        }

        let anchors = longest_chain(&unique_matches(
            &base[base_lo..base_hi],
            &side[side_lo..side_hi],
        ));
        if anchors.is_empty() {
            // No unique line in common: this stretch is Myers territory.
            for mut edit in super::myers::diff(&base[base_lo..base_hi], &side[side_lo..side_hi]) {
                edit.base_index += base_lo;
                edit.side_index += side_lo;
                edits.push(edit);
            }
            continue;
        }

        // Split around the anchors, pushing back-to-front so the pieces
        // pop front-to-back.
        let mut base_end = base_hi;
        let mut side_end = side_hi;
        for &(anchor_base, anchor_side) in anchors.iter().rev() {
            let anchor_base = base_lo + anchor_base;
            let anchor_side = side_lo + anchor_side;
            work.push(Task::Stretch {
                base_lo: anchor_base + 1,
                base_hi: base_end,
                side_lo: anchor_side + 1,
                side_hi: side_end,
            });
            work.push(Task::Emit(Edit {
                op: EditOp::Equal,
                base_index: anchor_base,
                side_index: anchor_side,
            }));
            base_end = anchor_base;
            side_end = anchor_side;
        }
        work.push(Task::Stretch {
            base_lo,
            base_hi: base_end,
            side_lo,
            side_hi: side_end,
        });
    }

    edits
}

/// Occurrence record for a line within one subrange.
#[derive(Clone, Copy)]
enum Seen {
    Once(usize),
    Many,
}

fn tally<'a>(lines: &[&'a [u8]]) -> HashMap<&'a [u8], Seen> {
    let mut seen = HashMap::new();
    for (i, line) in lines.iter().enumerate() {
        seen.entry(*line)
            .and_modify(|s| *s = Seen::Many)
            .or_insert(Seen::Once(i));
    }
    seen
}

/// Positions of lines occurring exactly once in each subrange, as
/// (base, side) pairs ordered by base position.
fn unique_matches(base: &[&[u8]], side: &[&[u8]]) -> Vec<(usize, usize)> {
    let base_seen = tally(base);
    let side_seen = tally(side);

    let mut matches = Vec::new();
    for line in base {
        if let (Some(&Seen::Once(bi)), Some(&Seen::Once(sj))) =
            (base_seen.get(line), side_seen.get(line))
        {
            matches.push((bi, sj));
        }
    }
    matches
}

/// Longest chain of matches increasing on the side as well. Input pairs
/// are sorted by base position; the chain comes back in order.
///
/// `tails[len]` holds the match closing the best known chain of length
/// `len + 1`; each match remembers its predecessor for reconstruction.
fn longest_chain(matches: &[(usize, usize)]) -> Vec<(usize, usize)> {
    let mut tails: Vec<usize> = Vec::new();
    let mut predecessor: Vec<Option<usize>> = Vec::with_capacity(matches.len());

    for (i, &(_, side_pos)) in matches.iter().enumerate() {
        let mut lo = 0;
        let mut hi = tails.len();
        while lo < hi {
            let mid = (lo + hi) / 2;
            if matches[tails[mid]].1 < side_pos {
                lo = mid + 1;
            } else {
                hi = mid;
            }
        }
        predecessor.push(if lo > 0 { Some(tails[lo - 1]) } else { None });
        if lo == tails.len() {
            tails.push(i);
        } else {
            tails[lo] = i;
        }
    }

    let mut chain = Vec::new();
    let mut current = tails.last().copied();
    while let Some(i) = current {
        chain.push(matches[i]);
        current = predecessor[i];
    }
    chain.reverse();
    chain
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn identical_sequences() {
        let a = vec![b"a\n".as_slice(), b"b\n", b"c\n"];
        let edits = diff(&a, &a);
        assert_eq!(edits.len(), 3);
        assert!(edits.iter().all(|e| e.op == EditOp::Equal));
    }

    #[test]
    fn simple_insert() {
        let a = vec![b"a\n".as_slice(), b"c\n"];
        let b = vec![b"a\n".as_slice(), b"b\n", b"c\n"];
        let edits = diff(&a, &b);
        assert_eq!(edits.iter().filter(|e| e.op == EditOp::Insert).count(), 1);
    }

    #[test]
    fn unique_lines_anchor_the_match() {
        let a = vec![b"{\n".as_slice(), b"  a\n", b"}\n", b"{\n", b"  b\n", b"}\n"];
        let b = vec![
            b"{\n".as_slice(),
            b"  a\n",
            b"  x\n",
            b"}\n",
            b"{\n",
            b"  b\n",
            b"}\n",
        ];
        let edits = diff(&a, &b);
        assert_eq!(edits.iter().filter(|e| e.op == EditOp::Insert).count(), 1);
        assert_eq!(edits.iter().filter(|e| e.op == EditOp::Equal).count(), 6);
    }

    #[test]
    fn chain_is_increasing_on_both_sides() {
        let matches = vec![(0, 2), (1, 0), (2, 3), (3, 1)];
        let chain = longest_chain(&matches);
        assert!(chain.len() >= 2);
        for w in chain.windows(2) {
            assert!(w[0].0 < w[1].0);
            assert!(w[0].1 < w[1].1);
        }
    }

    #[test]
    fn crossing_anchors_keep_the_longer_chain() {
        // "one" and "two" swap order; "head"/"tail" stay put.
        let a = vec![b"head\n".as_slice(), b"one\n", b"two\n", b"tail\n"];
        let b = vec![b"head\n".as_slice(), b"two\n", b"one\n", b"tail\n"];
        let edits = diff(&a, &b);
        for e in edits.iter().filter(|e| e.op == EditOp::Equal) {
            assert_eq!(a[e.base_index], b[e.side_index]);
        }
        // One of the swapped lines survives as a match, not both.
        assert_eq!(edits.iter().filter(|e| e.op == EditOp::Equal).count(), 3);
    }

    #[test]
    fn no_unique_lines_falls_back() {
        let a = vec![b"x\n".as_slice(), b"x\n"];
        let b = vec![b"x\n".as_slice(), b"x\n", b"x\n"];
        let edits = diff(&a, &b);
        // Still a valid script: two equals, one insert.
        assert_eq!(edits.iter().filter(|e| e.op == EditOp::Equal).count(), 2);
        assert_eq!(edits.iter().filter(|e| e.op == EditOp::Insert).count(), 1);
    }

    #[test]
    fn empty_inputs() {
        let empty: Vec<&[u8]> = vec![];
        let a = vec![b"x\n".as_slice()];
        assert!(diff(&empty, &empty).is_empty());
        assert_eq!(diff(&empty, &a).len(), 1);
        assert_eq!(diff(&a, &empty).len(), 1);
    }

    #[test]
    fn equal_edits_reference_matching_lines() {
        let a = vec![b"one\n".as_slice(), b"two\n", b"three\n"];
        let b = vec![b"zero\n".as_slice(), b"one\n", b"three\n", b"four\n"];
        for e in diff(&a, &b).iter().filter(|e| e.op == EditOp::Equal) {
            assert_eq!(a[e.base_index], b[e.side_index]);
        }
    }
}
