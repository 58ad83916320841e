//! Cross-variant line matcher tests: edit-script validity and the
//! correspondence invariants every strategy must uphold.

use proptest::prelude::*;
use trimerge_diff::algorithm::{diff_edits, split_lines, EditOp};
use trimerge_diff::matches::line_matches;
use trimerge_diff::DiffVariant;

const VARIANTS: [DiffVariant; 3] = [
    DiffVariant::Myers,
    DiffVariant::Histogram,
    DiffVariant::Ndiff,
];

/// Replay an edit script and check it reconstructs the side sequence.
fn replay_side(base: &[u8], side: &[u8], variant: DiffVariant) -> Vec<u8> {
    let base_lines = split_lines(base);
    let side_lines = split_lines(side);
    let mut out = Vec::new();
    for edit in diff_edits(base, side, variant) {
        match edit.op {
            EditOp::Equal => out.extend_from_slice(base_lines[edit.base_index]),
            EditOp::Insert => out.extend_from_slice(side_lines[edit.side_index]),
            EditOp::Delete => {}
        }
    }
    out
}

#[test]
fn edit_script_reconstructs_side() {
    let base = b"celery\ngarlic\nonions\nsalmon\ntomatoes\nwine\n";
    let side = b"celery\nsalmon\ntomatoes\ngarlic\nonions\nwine\n";
    for variant in VARIANTS {
        assert_eq!(
            replay_side(base, side, variant),
            side.to_vec(),
            "{variant:?} edit script does not rebuild the side"
        );
    }
}

#[test]
fn missing_trailing_newline_preserved() {
    let base = b"a\nb";
    let side = b"a\nb\nc";
    for variant in VARIANTS {
        assert_eq!(replay_side(base, side, variant), side.to_vec());
    }
}

#[test]
fn grocery_list_myers_correspondence() {
    // The matcher side of the grocery-list scenario: the base's salmon line
    // (4) survives to alice's line 2; garlic/onions do not.
    let base = split_lines(b"celery\ngarlic\nonions\nsalmon\ntomatoes\nwine\n");
    let alice = split_lines(b"celery\nsalmon\ntomatoes\ngarlic\nonions\nwine\n");
    let m = line_matches(&base, &alice, DiffVariant::Myers);
    assert_eq!(m[&1], 1);
    assert_eq!(m[&4], 2);
    assert_eq!(m[&5], 3);
    assert_eq!(m[&6], 6);
    assert!(!m.contains_key(&2));
    assert!(!m.contains_key(&3));
}

fn lines_strategy() -> impl Strategy<Value = Vec<u8>> {
    proptest::collection::vec(
        prop_oneof![
            Just(b"alpha\n".to_vec()),
            Just(b"beta\n".to_vec()),
            Just(b"gamma\n".to_vec()),
            Just(b"delta\n".to_vec()),
            Just(b"epsilon\n".to_vec()),
        ],
        0..24,
    )
    .prop_map(|lines| lines.concat())
}

proptest! {
    #[test]
    fn correspondence_is_strictly_increasing(
        base in lines_strategy(),
        side in lines_strategy(),
    ) {
        for variant in VARIANTS {
            let base_lines = split_lines(&base);
            let side_lines = split_lines(&side);
            let m = line_matches(&base_lines, &side_lines, variant);

            let mut keys: Vec<_> = m.keys().copied().collect();
            keys.sort_unstable();
            for pair in keys.windows(2) {
                prop_assert!(m[&pair[0]] < m[&pair[1]], "{:?} crossing", variant);
            }
        }
    }

    #[test]
    fn mapped_lines_are_equal(
        base in lines_strategy(),
        side in lines_strategy(),
    ) {
        for variant in VARIANTS {
            let base_lines = split_lines(&base);
            let side_lines = split_lines(&side);
            let m = line_matches(&base_lines, &side_lines, variant);
            for (&b, &s) in &m {
                prop_assert!(b >= 1 && b <= base_lines.len());
                prop_assert!(s >= 1 && s <= side_lines.len());
                prop_assert_eq!(base_lines[b - 1], side_lines[s - 1]);
            }
        }
    }

    #[test]
    fn edit_scripts_replay_for_arbitrary_inputs(
        base in lines_strategy(),
        side in lines_strategy(),
    ) {
        for variant in VARIANTS {
            prop_assert_eq!(replay_side(&base, &side, variant), side.clone());
        }
    }
}
