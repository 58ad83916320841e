//! Line matching and tree change computation for the trimerge merge engine.
//!
//! Three interchangeable line matchers (Myers, histogram, and the
//! patience-style ndiff) produce a correspondence between an ancestor's
//! lines and a descendant's lines; the tree module diffs two stored trees
//! into per-path changes. Both feed the three-way merge.

pub mod algorithm;
pub mod binary;
pub mod matches;
pub mod tree;

/// Errors produced while computing diffs.
#[derive(Debug, thiserror::Error)]
pub enum DiffError {
    #[error(transparent)]
    Store(#[from] trimerge_store::StoreError),
}

/// Line-matching strategies.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DiffVariant {
    /// Myers O((m+n)·D) shortest edit script (default).
    #[default]
    Myers,
    /// Histogram matching: rarest common line anchors the recursion.
    Histogram,
    /// Patience-style matching driven by unique anchor lines.
    Ndiff,
}

impl DiffVariant {
    /// Parse a variant identifier: "myers", "histogram", or "ndiff".
    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            "myers" => Some(Self::Myers),
            "histogram" => Some(Self::Histogram),
            "ndiff" => Some(Self::Ndiff),
            _ => None,
        }
    }

    /// The canonical identifier for this variant.
    pub fn name(&self) -> &'static str {
        match self {
            Self::Myers => "myers",
            Self::Histogram => "histogram",
            Self::Ndiff => "ndiff",
        }
    }
}
