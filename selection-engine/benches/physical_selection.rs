//! FILENAME: selection-engine/benches/physical_selection.rs
//! Chart selection synthesis over growing point sets.

use criterion::{criterion_group, criterion_main, BenchmarkId, Criterion};
use std::hint::black_box;

use drill_engine::GroupingField;
use selection_engine::{ConditionSynthesizer, FieldRank, RangeKind, SelectionPoint};

fn points(count: usize) -> Vec<SelectionPoint> {
    (0..count)
        .map(|i| {
            SelectionPoint::new()
                .with("Region", format!("R{}", i % 7))
                .with("State", format!("S{}", i % 31))
                .with("Year", 2000 + (i % 25) as i32)
        })
        .collect()
}

fn rank() -> FieldRank {
    FieldRank::new(
        vec![GroupingField::new("Region"), GroupingField::new("State")],
        vec![GroupingField::new("Year")],
    )
}

fn benchmark_strategies(c: &mut Criterion) {
    let synthesizer = ConditionSynthesizer::default();
    let rank = rank();
    let mut group = c.benchmark_group("chart_selection");

    for size in [10usize, 100, 1000] {
        let selection = points(size);
        for (name, kind) in [
            ("none", RangeKind::None),
            ("logical", RangeKind::Logical),
            ("physical", RangeKind::Physical),
        ] {
            group.bench_with_input(BenchmarkId::new(name, size), &selection, |b, selection| {
                b.iter(|| black_box(synthesizer.from_chart_selection(black_box(selection), kind, &rank)))
            });
        }
    }

    group.finish();
}

criterion_group!(benches, benchmark_strategies);
criterion_main!(benches);
