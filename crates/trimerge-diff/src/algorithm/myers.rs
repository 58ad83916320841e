//! Myers shortest-edit-script matching.
//!
//! Eugene Myers' O((m+n)·D) difference algorithm ("An O(ND) Difference
//! Algorithm and Its Variations", 1986): advance furthest-reaching D-paths
//! over the edit graph, one diagonal band per distance. Each reached
//! diagonal records the move that entered it and where its snake began, so
//! the edit script is read straight off those records afterwards; no
//! history of the frontier array is kept. Insertions win the
//! equal-frontier tie, which keeps the produced script stable.

use super::{all_deletes, all_inserts, Edit, EditOp};

/// Compute an edit script using the Myers algorithm.
pub fn diff(base: &[&[u8]], side: &[&[u8]]) -> Vec<Edit> {
    // Peel off the shared head; the search only ever sees the core.
    let mut head = 0;
    while head < base.len() && head < side.len() && base[head] == side[head] {
        head += 1;
    }
    // And the shared tail.
    let mut tail = 0;
    while tail < base.len() - head
        && tail < side.len() - head
        && base[base.len() - 1 - tail] == side[side.len() - 1 - tail]
    {
        tail += 1;
    }

    let mut edits: Vec<Edit> = (0..head)
        .map(|i| Edit {
            op: EditOp::Equal,
            base_index: i,
            side_index: i,
        })
        .collect();

    for mut edit in search(&base[head..base.len() - tail], &side[head..side.len() - tail]) {
        edit.base_index += head;
        edit.side_index += head;
        edits.push(edit);
    }

    for i in 0..tail {
        edits.push(Edit {
            op: EditOp::Equal,
            base_index: base.len() - tail + i,
            side_index: side.len() - tail + i,
        });
    }
    edits
}

/// How a diagonal was entered at a given distance, and where its snake
/// (the run of equal lines that followed) started in the base.
#[derive(Clone, Copy)]
struct Entry {
    from_insert: bool,
    snake_start: usize,
}

/// Furthest-reaching D-path search over trimmed sequences.
fn search(base: &[&[u8]], side: &[&[u8]]) -> Vec<Edit> {
    let n = base.len();
    let m = side.len();

    if n == 0 {
        return all_inserts(m, 0, 0);
    }
    if m == 0 {
        return all_deletes(n, 0, 0);
    }

    let max_d = n + m;
    let offset = max_d as isize;
    // frontier[k + offset]: furthest base position reached on diagonal k.
    let mut frontier = vec![0usize; 2 * max_d + 1];
    // entries[d] holds one Entry per diagonal visited at distance d,
    // in k order (-d, -d+2, ..., d).
    let mut entries: Vec<Vec<Entry>> = Vec::new();
    let mut reached: Option<usize> = None;

    'outer: for d in 0..=max_d {
        let mut band = Vec::with_capacity(d + 1);
        let mut k = -(d as isize);
        while k <= d as isize {
            // A diagonal is entered from below (insertion) or from the
            // left (deletion); at the band edges only one is possible.
            let from_insert = if d == 0 {
                false
            } else if k == -(d as isize) {
                true
            } else if k == d as isize {
                false
            } else {
                frontier[(k - 1 + offset) as usize] < frontier[(k + 1 + offset) as usize]
            };

            let mut x = if d == 0 {
                0
            } else if from_insert {
                frontier[(k + 1 + offset) as usize]
            } else {
                frontier[(k - 1 + offset) as usize] + 1
            };
            let snake_start = x;
            let mut y = (x as isize - k) as usize;
            while x < n && y < m && base[x] == side[y] {
                x += 1;
                y += 1;
            }

            frontier[(k + offset) as usize] = x;
            band.push(Entry {
                from_insert,
                snake_start,
            });

            if x >= n && y >= m {
                entries.push(band);
                reached = Some(d);
                break 'outer;
            }
            k += 2;
        }
        entries.push(band);
    }

    let reached = match reached {
        Some(d) => d,
        // n + m edits always suffice; this is unreachable.
        None => return Vec::new(),
    };

    // Retrace the chosen path from (n, m) back to the origin, collecting
    // one (entry move, snake) leg per distance, then expand the legs in
    // forward order into the edit script.
    let mut legs: Vec<(Option<EditOp>, usize, usize, usize)> = Vec::new();
    let mut x = n;
    let mut y = m;
    for d in (0..=reached).rev() {
        let k = x as isize - y as isize;
        let entry = entries[d][((k + d as isize) / 2) as usize];
        let snake_start = entry.snake_start;
        let snake_side = (snake_start as isize - k) as usize;
        let op = if d == 0 {
            None
        } else if entry.from_insert {
            Some(EditOp::Insert)
        } else {
            Some(EditOp::Delete)
        };
        legs.push((op, snake_start, snake_side, x - snake_start));
        if entry.from_insert {
            x = snake_start;
            y = snake_side.saturating_sub(1);
        } else {
            x = snake_start.saturating_sub(1);
            y = snake_side;
        }
    }

    let mut edits = Vec::new();
    for (op, snake_base, snake_side, snake_len) in legs.into_iter().rev() {
        match op {
            Some(EditOp::Insert) => edits.push(Edit {
                op: EditOp::Insert,
                base_index: snake_base,
                side_index: snake_side - 1,
            }),
            Some(EditOp::Delete) => edits.push(Edit {
                op: EditOp::Delete,
                base_index: snake_base - 1,
                side_index: snake_side,
            }),
            _ => {}
        }
        for j in 0..snake_len {
            edits.push(Edit {
                op: EditOp::Equal,
                base_index: snake_base + j,
                side_index: snake_side + j,
            });
        }
    }
    edits
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
    fn completely_different() {
        let a = vec![b"a\n".as_slice(), b"b\n"];
        let b = vec![b"c\n".as_slice(), b"d\n"];
        let edits = diff(&a, &b);
        assert_eq!(edits.iter().filter(|e| e.op == EditOp::Delete).count(), 2);
        assert_eq!(edits.iter().filter(|e| e.op == EditOp::Insert).count(), 2);
    }

    #[test]
    fn insert_at_end() {
        let a = vec![b"a\n".as_slice(), b"b\n"];
        let b = vec![b"a\n".as_slice(), b"b\n", b"c\n"];
        let edits = diff(&a, &b);
        assert_eq!(edits.iter().filter(|e| e.op == EditOp::Insert).count(), 1);
        assert_eq!(edits.iter().filter(|e| e.op == EditOp::Equal).count(), 2);
    }

    #[test]
    fn delete_from_middle() {
        let a = vec![b"a\n".as_slice(), b"b\n", b"c\n"];
        let b = vec![b"a\n".as_slice(), b"c\n"];
        let edits = diff(&a, &b);
        assert_eq!(edits.iter().filter(|e| e.op == EditOp::Delete).count(), 1);
        assert_eq!(edits.iter().filter(|e| e.op == EditOp::Equal).count(), 2);
    }

    #[test]
    fn single_substitution() {
        let a = vec![b"x\n".as_slice()];
        let b = vec![b"y\n".as_slice()];
        let edits = diff(&a, &b);
        assert_eq!(
            edits,
            vec![
                Edit {
                    op: EditOp::Delete,
                    base_index: 0,
                    side_index: 0,
                },
                Edit {
                    op: EditOp::Insert,
                    base_index: 1,
                    side_index: 0,
                },
            ]
        );
    }

    #[test]
    fn empty_inputs() {
        let empty: Vec<&[u8]> = vec![];
        let a = vec![b"a\n".as_slice(), b"b\n"];
        assert!(diff(&empty, &empty).is_empty());
        assert!(diff(&empty, &a).iter().all(|e| e.op == EditOp::Insert));
        assert!(diff(&a, &empty).iter().all(|e| e.op == EditOp::Delete));
    }

    #[test]
    fn equal_edits_reference_matching_lines() {
        let a = vec![b"x\n".as_slice(), b"same\n", b"y\n"];
        let b = vec![b"p\n".as_slice(), b"same\n", b"q\n", b"r\n"];
        let edits = diff(&a, &b);
        for e in edits.iter().filter(|e| e.op == EditOp::Equal) {
            assert_eq!(a[e.base_index], b[e.side_index]);
        }
    }

    #[test]
    fn script_covers_both_sequences_in_order() {
        let a = vec![b"one\n".as_slice(), b"two\n", b"three\n", b"four\n"];
        let b = vec![b"two\n".as_slice(), b"three\n", b"extra\n", b"four\n"];
        let edits = diff(&a, &b);
        let consumed_base: Vec<usize> = edits
            .iter()
            .filter(|e| e.op != EditOp::Insert)
            .map(|e| e.base_index)
            .collect();
        let consumed_side: Vec<usize> = edits
            .iter()
            .filter(|e| e.op != EditOp::Delete)
            .map(|e| e.side_index)
            .collect();
        assert_eq!(consumed_base, (0..a.len()).collect::<Vec<_>>());
        assert_eq!(consumed_side, (0..b.len()).collect::<Vec<_>>());
    }
}
