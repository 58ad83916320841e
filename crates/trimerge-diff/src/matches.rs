//! Line correspondences.
//!
//! A correspondence maps 1-origin base line numbers to 1-origin side line
//! numbers wherever the matcher paired them. Keys absent from the map are
//! lines deleted on that side. The mapping is strictly increasing along
//! its keys and never pairs unequal lines.

use std::collections::HashMap;

use crate::algorithm::{diff_lines, Edit, EditOp};
use crate::DiffVariant;

/// Build a correspondence from an edit script.
pub fn matches_from_edits(edits: &[Edit]) -> HashMap<usize, usize> {
    edits
        .iter()
        .filter(|e| e.op == EditOp::Equal)
        .map(|e| (e.base_index + 1, e.side_index + 1))
        .collect()
}

/// Match base lines against side lines with the given strategy.
///
/// Always succeeds; empty inputs produce an empty correspondence.
pub fn line_matches(
    base_lines: &[&[u8]],
    side_lines: &[&[u8]],
    variant: DiffVariant,
) -> HashMap<usize, usize> {
    matches_from_edits(&diff_lines(base_lines, side_lines, variant))
}
