//! Edit-script vocabulary shared by the line matchers.

pub mod histogram;
pub mod myers;
pub mod ndiff;

use crate::DiffVariant;

/// An edit operation in the edit script.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EditOp {
    /// Line present in both base and side.
    Equal,
    /// Line inserted (present only on the side).
    Insert,
    /// Line deleted (present only in the base).
    Delete,
}

/// A single edit, referencing lines by 0-based index.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Edit {
    /// The operation.
    pub op: EditOp,
    /// Index into the base sequence (meaningful for Equal and Delete).
    pub base_index: usize,
    /// Index into the side sequence (meaningful for Equal and Insert).
    pub side_index: usize,
}

/// Compute a line-level edit script between two byte slices.
pub fn diff_edits(base: &[u8], side: &[u8], variant: DiffVariant) -> Vec<Edit> {
    let base_lines = split_lines(base);
    let side_lines = split_lines(side);
    diff_lines(&base_lines, &side_lines, variant)
}

/// Compute an edit script over pre-split line sequences.
pub fn diff_lines(base: &[&[u8]], side: &[&[u8]], variant: DiffVariant) -> Vec<Edit> {
    match variant {
        DiffVariant::Myers => myers::diff(base, side),
        DiffVariant::Histogram => histogram::diff(base, side),
        DiffVariant::Ndiff => ndiff::diff(base, side),
    }
}

/// Split a byte slice into lines, each retaining its trailing newline.
/// Content after the last newline becomes a final, unterminated line.
pub fn split_lines(data: &[u8]) -> Vec<&[u8]> {
    if data.is_empty() {
        return Vec::new();
    }
    let mut lines = Vec::new();
    let mut start = 0;
    for (i, &byte) in data.iter().enumerate() {
        if byte == b'\n' {
            lines.push(&data[start..=i]);
            start = i + 1;
        }
    }
    if start < data.len() {
        lines.push(&data[start..]);
    }
    lines
}

/// Line hash for fast comparison: DJB2a (xor variant).
pub(crate) fn line_hash(line: &[u8]) -> u64 {
    let mut hash: u64 = 5381;
    for &b in line {
        hash = hash.wrapping_mul(33) ^ (b as u64);
    }
    hash
}

/// Emit Insert edits for every side line (empty base case).
pub(crate) fn all_inserts(side_len: usize, base_offset: usize, side_offset: usize) -> Vec<Edit> {
    (0..side_len)
        .map(|j| Edit {
            op: EditOp::Insert,
            base_index: base_offset,
            side_index: side_offset + j,
        })
        .collect()
}

/// Emit Delete edits for every base line (empty side case).
pub(crate) fn all_deletes(base_len: usize, base_offset: usize, side_offset: usize) -> Vec<Edit> {
    (0..base_len)
        .map(|i| Edit {
            op: EditOp::Delete,
            base_index: base_offset + i,
            side_index: side_offset,
        })
        .collect()
}
