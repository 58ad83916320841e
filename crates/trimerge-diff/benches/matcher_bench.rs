use criterion::{criterion_group, criterion_main, Criterion};
use trimerge_diff::algorithm::diff_edits;
use trimerge_diff::DiffVariant;

fn synthetic_file(lines: usize, seed: u64) -> Vec<u8> {
    let mut out = Vec::new();
    let mut state = seed;
    for i in 0..lines {
        state = state.wrapping_mul(6364136223846793005).wrapping_add(1442695040888963407);
        out.extend_from_slice(format!("line {} token {}\n", i, state % 97).as_bytes());
    }
    out
}

fn bench_matchers(c: &mut Criterion) {
    let base = synthetic_file(500, 1);
    // Edit every 13th line to force non-trivial matching.
    let side: Vec<u8> = String::from_utf8(base.clone())
        .unwrap()
        .lines()
        .enumerate()
        .map(|(i, l)| {
            if i % 13 == 0 {
                format!("edited {}\n", i)
            } else {
                format!("{}\n", l)
            }
        })
        .collect::<String>()
        .into_bytes();

    let mut group = c.benchmark_group("line_matcher");
    for variant in [DiffVariant::Myers, DiffVariant::Histogram, DiffVariant::Ndiff] {
        group.bench_function(variant.name(), |b| {
            b.iter(|| diff_edits(&base, &side, variant));
        });
    }
    group.finish();
}

criterion_group!(benches, bench_matchers);
criterion_main!(benches);
