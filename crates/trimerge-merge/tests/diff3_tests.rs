//! File-level three-way merge scenarios, including the exact-bytes
//! grocery-list case and conflict-marker round trips.

use trimerge_diff::DiffVariant;
use trimerge_merge::diff3::{merge_blobs, ConflictRange, FileMergeResult, MergeLabels};
use trimerge_merge::MergeStrategy;

const BASE: &[u8] = b"celery\ngarlic\nonions\nsalmon\ntomatoes\nwine\n";
const ALICE: &[u8] = b"celery\nsalmon\ntomatoes\ngarlic\nonions\nwine\n";
const BOB: &[u8] = b"celery\nsalmon\ngarlic\nonions\ntomatoes\nwine\n";

fn merge(
    this: &[u8],
    other: &[u8],
    base: &[u8],
    variant: DiffVariant,
    strategy: MergeStrategy,
) -> FileMergeResult {
    merge_blobs(this, other, base, variant, strategy, &MergeLabels::default())
}

#[test]
fn grocery_list_myers() {
    // Both sides move the salmon relative to the grocery list's base
    // ordering; the overlapping region conflicts and the rest merges.
    let result = merge(ALICE, BOB, BASE, DiffVariant::Myers, MergeStrategy::Ort);

    assert_eq!(
        result.conflicts,
        vec![ConflictRange {
            base: (1, 4),
            this: (1, 2),
            other: (1, 4),
        }]
    );

    let expected: &[u8] = b"celery\n\
        <<<<<<<<< alice\n\
        salmon\n\
        ||||||||| ancestor\n\
        garlic\n\
        onions\n\
        salmon\n\
        ========= \n\
        salmon\n\
        garlic\n\
        onions\n\
        >>>>>>>>> bob\n\
        tomatoes\n\
        garlic\n\
        onions\n\
        wine\n";
    assert_eq!(result.content, expected);
}

#[test]
fn grocery_list_ours_and_theirs() {
    let ours = merge(ALICE, BOB, BASE, DiffVariant::Myers, MergeStrategy::OrtOurs);
    assert!(ours.is_clean());
    assert_eq!(
        ours.content,
        b"celery\nsalmon\ntomatoes\ngarlic\nonions\nwine\n"
    );

    let theirs = merge(
        ALICE,
        BOB,
        BASE,
        DiffVariant::Myers,
        MergeStrategy::OrtTheirs,
    );
    assert!(theirs.is_clean());
    // The conflicted chunk takes bob's side; alice's clean re-insertion of
    // garlic/onions after the tomatoes still applies.
    assert_eq!(
        theirs.content,
        b"celery\nsalmon\ngarlic\nonions\ntomatoes\ngarlic\nonions\nwine\n"
    );
}

#[test]
fn disjoint_text_edits_merge_cleanly() {
    let base = b"This is a more complete test\nand a few typ0s to fix\nalso I plan to add few lines\n    and to remove\nother lines\n";
    let this = b"Add a line here\nThis is a more complete test\nand a few typ0s to fix\nalso I plan to add few lines\n    and to remove\nother lines\n";
    let other = b"This is a more complete test\nand a few typos to fix\nalso I plan to add few lines\n    and to remove\nother lines\n";

    for variant in [DiffVariant::Myers, DiffVariant::Histogram, DiffVariant::Ndiff] {
        let result = merge(this, other, base, variant, MergeStrategy::Ort);
        assert!(result.is_clean(), "{variant:?} reported conflicts");
        assert_eq!(
            result.content,
            b"Add a line here\nThis is a more complete test\nand a few typos to fix\nalso I plan to add few lines\n    and to remove\nother lines\n"
                .to_vec(),
            "{variant:?} merged wrong"
        );
    }
}

#[test]
fn all_variants_agree_on_clean_merges() {
    let base = b"a\nb\nc\nd\ne\n";
    let this = b"a\nB\nc\nd\ne\n";
    let other = b"a\nb\nc\nD\ne\n";
    for variant in [DiffVariant::Myers, DiffVariant::Histogram, DiffVariant::Ndiff] {
        let result = merge(this, other, base, variant, MergeStrategy::Ort);
        assert!(result.is_clean());
        assert_eq!(result.content, b"a\nB\nc\nD\ne\n".to_vec());
    }
}

/// Recover the three sides of the first conflicted chunk from a
/// diff3-marked buffer.
fn parse_conflict(content: &[u8], labels: &MergeLabels) -> (Vec<u8>, Vec<u8>, Vec<u8>) {
    let text = content.to_vec();
    let this_marker = [b"<<<<<<<<< ".as_slice(), labels.this.as_slice(), b"\n"].concat();
    let base_marker = [b"||||||||| ".as_slice(), labels.base.as_slice(), b"\n"].concat();
    let sep_marker = b"========= \n".to_vec();
    let other_marker = [b">>>>>>>>> ".as_slice(), labels.other.as_slice(), b"\n"].concat();

    let find = |haystack: &[u8], needle: &[u8], from: usize| -> usize {
        haystack[from..]
            .windows(needle.len())
            .position(|w| w == needle)
            .map(|p| p + from)
            .expect("marker present")
    };

    let this_start = find(&text, &this_marker, 0) + this_marker.len();
    let base_start = find(&text, &base_marker, this_start);
    let sep_start = find(&text, &sep_marker, base_start);
    let other_start = find(&text, &other_marker, sep_start);

    (
        text[this_start..base_start].to_vec(),
        text[base_start + base_marker.len()..sep_start].to_vec(),
        text[sep_start + sep_marker.len()..other_start].to_vec(),
    )
}

#[test]
fn conflict_markup_round_trips_the_three_sides() {
    let labels = MergeLabels::default();
    let result = merge(ALICE, BOB, BASE, DiffVariant::Myers, MergeStrategy::Ort);
    let (this_side, base_side, other_side) = parse_conflict(&result.content, &labels);
    assert_eq!(this_side, b"salmon\n");
    assert_eq!(base_side, b"garlic\nonions\nsalmon\n");
    assert_eq!(other_side, b"salmon\ngarlic\nonions\n");
}

#[test]
fn conflict_markup_round_trips_custom_labels() {
    let labels = MergeLabels::new("mine", "common", "upstream");
    let result = merge_blobs(
        b"left\n",
        b"right\n",
        b"middle\n",
        DiffVariant::Histogram,
        MergeStrategy::Ort,
        &labels,
    );
    let (this_side, base_side, other_side) = parse_conflict(&result.content, &labels);
    assert_eq!(this_side, b"left\n");
    assert_eq!(base_side, b"middle\n");
    assert_eq!(other_side, b"right\n");
}

#[test]
fn resolve_strategy_marks_conflicts_like_ort() {
    let result = merge(ALICE, BOB, BASE, DiffVariant::Myers, MergeStrategy::Resolve);
    assert_eq!(result.conflicts.len(), 1);
}

#[test]
fn final_chunk_conflict_uses_input_lengths() {
    // Tail disagreement: the conflict range ends at each input's length.
    let base = b"shared\nend\n";
    let this = b"shared\nmine\n";
    let other = b"shared\nyours\nand more\n";
    let result = merge(this, other, base, DiffVariant::Myers, MergeStrategy::Ort);
    assert_eq!(
        result.conflicts,
        vec![ConflictRange {
            base: (1, 2),
            this: (1, 2),
            other: (1, 3),
        }]
    );
}
