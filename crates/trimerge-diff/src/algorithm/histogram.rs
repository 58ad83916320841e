//! Histogram matching.
//!
//! Recursively anchors the diff on the rarest base line that both sides
//! share: within the current subranges, count occurrences of each base
//! line, pick the one with the lowest count that also occurs on the side
//! (earliest base occurrence wins ties), pair its occurrences in order,
//! and recurse into the gaps between pairs. Subranges with no common line
//! become a single unstable block.

use std::collections::HashMap;

use super::{all_deletes, all_inserts, line_hash, Edit, EditOp};

/// Maximum recursion depth before falling back to Myers.
const MAX_RECURSION: usize = 64;

/// Compute an edit script using histogram matching.
pub fn diff(base: &[&[u8]], side: &[&[u8]]) -> Vec<Edit> {
    let mut edits = Vec::new();
    recurse(base, side, 0, 0, &mut edits, 0);
    edits
}

fn recurse(
    base: &[&[u8]],
    side: &[&[u8]],
    base_offset: usize,
    side_offset: usize,
    edits: &mut Vec<Edit>,
    depth: usize,
) {
    if base.is_empty() && side.is_empty() {
        return;
    }
    if base.is_empty() {
        edits.extend(all_inserts(side.len(), base_offset, side_offset));
        return;
    }
    if side.is_empty() {
        edits.extend(all_deletes(base.len(), base_offset, side_offset));
        return;
    }
    if depth >= MAX_RECURSION {
        for mut e in super::myers::diff(base, side) {
            e.base_index += base_offset;
            e.side_index += side_offset;
            edits.push(e);
        }
        return;
    }

    // Trim the common prefix and suffix before looking for an anchor.
    let prefix_len = base
        .iter()
        .zip(side.iter())
        .take_while(|(b, s)| b == s)
        .count();
    let suffix_len = base[prefix_len..]
        .iter()
        .rev()
        .zip(side[prefix_len..].iter().rev())
        .take_while(|(b, s)| b == s)
        .count();

    for i in 0..prefix_len {
        edits.push(Edit {
            op: EditOp::Equal,
            base_index: base_offset + i,
            side_index: side_offset + i,
        });
    }

    let base_mid = &base[prefix_len..base.len() - suffix_len];
    let side_mid = &side[prefix_len..side.len() - suffix_len];
    let mid_base_offset = base_offset + prefix_len;
    let mid_side_offset = side_offset + prefix_len;

    if !base_mid.is_empty() || !side_mid.is_empty() {
        match select_anchor(base_mid, side_mid) {
            Some((base_occs, side_occs)) => {
                // Pair occurrences in order; each pair is an anchor line.
                let pairs = base_occs.len().min(side_occs.len());
                let mut prev_base = 0;
                let mut prev_side = 0;
                for j in 0..pairs {
                    let (bi, si) = (base_occs[j], side_occs[j]);
                    recurse(
                        &base_mid[prev_base..bi],
                        &side_mid[prev_side..si],
                        mid_base_offset + prev_base,
                        mid_side_offset + prev_side,
                        edits,
                        depth + 1,
                    );
                    edits.push(Edit {
                        op: EditOp::Equal,
                        base_index: mid_base_offset + bi,
                        side_index: mid_side_offset + si,
                    });
                    prev_base = bi + 1;
                    prev_side = si + 1;
                }
                recurse(
                    &base_mid[prev_base..],
                    &side_mid[prev_side..],
                    mid_base_offset + prev_base,
                    mid_side_offset + prev_side,
                    edits,
                    depth + 1,
                );
            }
            None => {
                // No common line: one unstable block.
                edits.extend(all_deletes(base_mid.len(), mid_base_offset, mid_side_offset));
                edits.extend(all_inserts(
                    side_mid.len(),
                    mid_base_offset + base_mid.len(),
                    mid_side_offset,
                ));
            }
        }
    }

    for i in 0..suffix_len {
        edits.push(Edit {
            op: EditOp::Equal,
            base_index: base.len() - suffix_len + base_offset + i,
            side_index: side.len() - suffix_len + side_offset + i,
        });
    }
}

/// Pick the anchor line: lowest base-side occurrence count among lines that
/// also occur on the side, preferring the earliest base occurrence on ties.
/// Returns the occurrence indices of the chosen line in both sequences.
fn select_anchor(base: &[&[u8]], side: &[&[u8]]) -> Option<(Vec<usize>, Vec<usize>)> {
    if base.is_empty() || side.is_empty() {
        return None;
    }

    // hash → occurrence indices, in order, for each sequence.
    let mut base_occs: HashMap<u64, Vec<usize>> = HashMap::new();
    for (i, line) in base.iter().enumerate() {
        base_occs.entry(line_hash(line)).or_default().push(i);
    }
    let mut side_occs: HashMap<u64, Vec<usize>> = HashMap::new();
    for (j, line) in side.iter().enumerate() {
        side_occs.entry(line_hash(line)).or_default().push(j);
    }

    let mut best: Option<(usize, usize)> = None; // (count, first base occurrence)
    for (i, line) in base.iter().enumerate() {
        let h = line_hash(line);
        let occs = &base_occs[&h];
        // Only the first occurrence of each distinct line nominates it.
        if occs[0] != i {
            continue;
        }
        let on_side = side_occs
            .get(&h)
            .is_some_and(|js| js.iter().any(|&j| side[j] == *line));
        if !on_side {
            continue;
        }
        let count = occs.len();
        // Strict comparison keeps the earliest occurrence on count ties.
        if best.map_or(true, |(best_count, _)| count < best_count) {
            best = Some((count, i));
        }
    }

    let (_, anchor_idx) = best?;
    let anchor_line = base[anchor_idx];
    let h = line_hash(anchor_line);
    let base_matches: Vec<usize> = base_occs[&h]
        .iter()
        .copied()
        .filter(|&i| base[i] == anchor_line)
        .collect();
    let side_matches: Vec<usize> = side_occs[&h]
        .iter()
        .copied()
        .filter(|&j| side[j] == anchor_line)
        .collect();
    Some((base_matches, side_matches))
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
    fn insert_line() {
        let a = vec![b"a\n".as_slice(), b"c\n"];
        let b = vec![b"a\n".as_slice(), b"b\n", b"c\n"];
        let edits = diff(&a, &b);
        assert_eq!(edits.iter().filter(|e| e.op == EditOp::Insert).count(), 1);
    }

    #[test]
    fn delete_line() {
        let a = vec![b"a\n".as_slice(), b"b\n", b"c\n"];
        let b = vec![b"a\n".as_slice(), b"c\n"];
        let edits = diff(&a, &b);
        assert_eq!(edits.iter().filter(|e| e.op == EditOp::Delete).count(), 1);
    }

    #[test]
    fn no_common_line_is_one_block() {
        let a = vec![b"a\n".as_slice(), b"b\n"];
        let b = vec![b"x\n".as_slice(), b"y\n", b"z\n"];
        let edits = diff(&a, &b);
        assert_eq!(edits.iter().filter(|e| e.op == EditOp::Delete).count(), 2);
        assert_eq!(edits.iter().filter(|e| e.op == EditOp::Insert).count(), 3);
        assert_eq!(edits.iter().filter(|e| e.op == EditOp::Equal).count(), 0);
    }

    #[test]
    fn rare_line_preferred_as_anchor() {
        // "unique\n" occurs once on each side; "x\n" occurs twice in base.
        let a = vec![b"x\n".as_slice(), b"unique\n", b"x\n"];
        let b = vec![b"x\n".as_slice(), b"added\n", b"unique\n", b"x\n"];
        let edits = diff(&a, &b);
        let equal_lines: Vec<&[u8]> = edits
            .iter()
            .filter(|e| e.op == EditOp::Equal)
            .map(|e| a[e.base_index])
            .collect();
        assert!(equal_lines.contains(&b"unique\n".as_slice()));
    }

    #[test]
    fn repeated_anchor_occurrences_pair_in_order() {
        let a = vec![b"sep\n".as_slice(), b"one\n", b"sep\n", b"two\n"];
        let b = vec![b"sep\n".as_slice(), b"ONE\n", b"sep\n", b"two\n"];
        let edits = diff(&a, &b);
        for e in edits.iter().filter(|e| e.op == EditOp::Equal) {
            assert_eq!(a[e.base_index], b[e.side_index]);
        }
    }

    #[test]
    fn empty_inputs() {
        let empty: Vec<&[u8]> = vec![];
        let a = vec![b"x\n".as_slice()];
        assert!(diff(&empty, &empty).is_empty());
        assert_eq!(diff(&empty, &a).len(), 1);
        assert_eq!(diff(&a, &empty).len(), 1);
    }
}
