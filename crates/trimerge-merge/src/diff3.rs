//! Three-way line-level merge (diff3).
//!
//! Matches each side against the common ancestor with a pluggable line
//! matcher, then walks the three files chunk by chunk: regions where both
//! correspondences agree advance unchanged, everything between two
//! three-way anchors forms an unstable chunk resolved by content
//! comparison and, failing that, by strategy, emitting diff3 conflict
//! markers in the default case.

use std::collections::HashMap;

use bstr::BString;
use trimerge_diff::algorithm::split_lines;
use trimerge_diff::matches::line_matches;
use trimerge_diff::DiffVariant;

use crate::MergeStrategy;

/// Labels placed on diff3 conflict markers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MergeLabels {
    /// Label for this side (the `<<<<<<<<<` line).
    pub this: BString,
    /// Label for the common ancestor (the `|||||||||` line).
    pub base: BString,
    /// Label for the other side (the `>>>>>>>>>` line).
    pub other: BString,
}

impl Default for MergeLabels {
    fn default() -> Self {
        Self {
            this: BString::from("alice"),
            base: BString::from("ancestor"),
            other: BString::from("bob"),
        }
    }
}

impl MergeLabels {
    pub fn new(
        this: impl Into<BString>,
        base: impl Into<BString>,
        other: impl Into<BString>,
    ) -> Self {
        Self {
            this: this.into(),
            base: base.into(),
            other: other.into(),
        }
    }
}

/// A conflicting chunk, as 0-based half-open line ranges into the three
/// inputs: ancestor, this side, other side.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ConflictRange {
    pub base: (usize, usize),
    pub this: (usize, usize),
    pub other: (usize, usize),
}

/// Merged bytes plus the chunk conflicts embedded in them.
#[derive(Debug, Clone)]
pub struct FileMergeResult {
    pub content: Vec<u8>,
    pub conflicts: Vec<ConflictRange>,
}

impl FileMergeResult {
    pub fn is_clean(&self) -> bool {
        self.conflicts.is_empty()
    }
}

/// Three-way merge of `this` and `other` against their common ancestor.
///
/// Splits each input into newline-terminated lines (a missing final
/// newline is preserved through to the output), matches both sides against
/// the base with `variant`, and walks the chunks. With a `*-ours` or
/// `*-theirs` strategy conflicting chunks resolve to the favored side and
/// the conflict list stays empty.
pub fn merge_blobs(
    this: &[u8],
    other: &[u8],
    base: &[u8],
    variant: DiffVariant,
    strategy: MergeStrategy,
    labels: &MergeLabels,
) -> FileMergeResult {
    let o_lines = split_lines(base);
    let a_lines = split_lines(this);
    let b_lines = split_lines(other);
    let a_matches = line_matches(&o_lines, &a_lines, variant);
    let b_matches = line_matches(&o_lines, &b_lines, variant);

    let walk = Merge3Way {
        o_lines,
        a_lines,
        b_lines,
        a_matches,
        b_matches,
        strategy,
        labels,
        output: Vec::new(),
        conflicts: Vec::new(),
        on: 0,
        an: 0,
        bn: 0,
    };
    walk.run()
}

/// Chunk-walk state over ancestor (o), this side (a), and other side (b).
/// Cursors count consumed lines; the correspondences are 1-origin.
struct Merge3Way<'a> {
    o_lines: Vec<&'a [u8]>,
    a_lines: Vec<&'a [u8]>,
    b_lines: Vec<&'a [u8]>,
    a_matches: HashMap<usize, usize>,
    b_matches: HashMap<usize, usize>,
    strategy: MergeStrategy,
    labels: &'a MergeLabels,
    output: Vec<u8>,
    conflicts: Vec<ConflictRange>,
    on: usize,
    an: usize,
    bn: usize,
}

impl<'a> Merge3Way<'a> {
    fn run(mut self) -> FileMergeResult {
        self.generate_chunks();
        FileMergeResult {
            content: self.output,
            conflicts: self.conflicts,
        }
    }

    fn generate_chunks(&mut self) {
        loop {
            match self.find_next_mismatch() {
                None => {
                    self.emit_final_chunk();
                    return;
                }
                Some(1) => match self.find_next_match() {
                    Some((o, a, b)) => self.emit_chunk(o, a, b),
                    None => {
                        self.emit_final_chunk();
                        return;
                    }
                },
                Some(i) => self.emit_chunk(self.on + i, self.an + i, self.bn + i),
            }
        }
    }

    /// Is offset `i` still inside any of the three files?
    fn in_bounds(&self, i: usize) -> bool {
        self.on + i <= self.o_lines.len()
            || self.an + i <= self.a_lines.len()
            || self.bn + i <= self.b_lines.len()
    }

    /// Does the ancestor line at offset `i` map onto the side line at the
    /// same offset past `side_cursor`?
    fn is_match(matches: &HashMap<usize, usize>, base_cursor: usize, side_cursor: usize, i: usize) -> bool {
        matches.get(&(base_cursor + i)) == Some(&(side_cursor + i))
    }

    /// Offset of the first mismatching line, or None past the end.
    fn find_next_mismatch(&self) -> Option<usize> {
        let mut i = 1;
        while self.in_bounds(i)
            && Self::is_match(&self.a_matches, self.on, self.an, i)
            && Self::is_match(&self.b_matches, self.on, self.bn, i)
        {
            i += 1;
        }
        if self.in_bounds(i) {
            Some(i)
        } else {
            None
        }
    }

    /// The next ancestor line matched on both sides: 1-origin line numbers
    /// in (ancestor, this, other).
    fn find_next_match(&self) -> Option<(usize, usize, usize)> {
        let mut ov = self.on + 1;
        while ov <= self.o_lines.len() {
            if let (Some(&av), Some(&bv)) = (self.a_matches.get(&ov), self.b_matches.get(&ov)) {
                return Some((ov, av, bv));
            }
            ov += 1;
        }
        None
    }

    /// Emit everything up to (but not including) the given stable line.
    fn emit_chunk(&mut self, o: usize, a: usize, b: usize) {
        self.write_chunk((self.on, o - 1), (self.an, a - 1), (self.bn, b - 1));
        self.on = o - 1;
        self.an = a - 1;
        self.bn = b - 1;
    }

    /// Emit the tail past the last stable anchor.
    fn emit_final_chunk(&mut self) {
        self.write_chunk(
            (self.on, self.o_lines.len()),
            (self.an, self.a_lines.len()),
            (self.bn, self.b_lines.len()),
        );
    }

    fn write_chunk(
        &mut self,
        o_range: (usize, usize),
        a_range: (usize, usize),
        b_range: (usize, usize),
    ) {
        let oc = join_lines(&self.o_lines, o_range);
        let ac = join_lines(&self.a_lines, a_range);
        let bc = join_lines(&self.b_lines, b_range);

        if oc == ac && oc == bc {
            self.output.extend_from_slice(&oc);
        } else if oc == ac {
            // Only the other side changed.
            self.output.extend_from_slice(&bc);
        } else if oc == bc {
            // Only this side changed.
            self.output.extend_from_slice(&ac);
        } else if ac == bc {
            // Both sides made the same change.
            self.output.extend_from_slice(&ac);
        } else if self.strategy.favors_ours() {
            self.output.extend_from_slice(&ac);
        } else if self.strategy.favors_theirs() {
            self.output.extend_from_slice(&bc);
        } else {
            self.conflicts.push(ConflictRange {
                base: o_range,
                this: a_range,
                other: b_range,
            });
            self.write_conflict_markup(&oc, &ac, &bc);
        }
    }

    fn write_conflict_markup(&mut self, oc: &[u8], ac: &[u8], bc: &[u8]) {
        self.output.extend_from_slice(b"<<<<<<<<< ");
        self.output.extend_from_slice(&self.labels.this);
        self.output.push(b'\n');
        self.output.extend_from_slice(ac);
        self.output.extend_from_slice(b"||||||||| ");
        self.output.extend_from_slice(&self.labels.base);
        self.output.push(b'\n');
        self.output.extend_from_slice(oc);
        self.output.extend_from_slice(b"========= \n");
        self.output.extend_from_slice(bc);
        self.output.extend_from_slice(b">>>>>>>>> ");
        self.output.extend_from_slice(&self.labels.other);
        self.output.push(b'\n');
    }
}

fn join_lines(lines: &[&[u8]], range: (usize, usize)) -> Vec<u8> {
    let end = range.1.min(lines.len());
    let start = range.0.min(end);
    lines[start..end].concat()
}
