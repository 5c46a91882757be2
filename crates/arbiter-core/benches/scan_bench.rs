//! Criterion benchmarks for the debounced device scan.
//!
//! Measures [`ConnectedSet::rescan`] with unchanged membership (the common
//! case) and with a full membership swap, scaling with the number of pads.
//!
//! Run with:
//! ```bash
//! cargo bench --package arbiter-core --bench scan_bench
//! ```

use arbiter_core::{ConnectedSet, DevicePreference, DeviceSnapshot};
use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};

// ── Fixtures ──────────────────────────────────────────────────────────────────

/// `n` connected pads in slots `offset..offset + n`.
fn pads(n: u32, offset: u32) -> Vec<DeviceSnapshot> {
    (offset..offset + n)
        .map(|i| {
            DeviceSnapshot::new(i, format!("Pad {i}"))
                .with_axes([0.0; 4])
                .with_buttons(17, &[])
        })
        .collect()
}

// ── Benchmarks: rescan ────────────────────────────────────────────────────────

fn bench_rescan_unchanged(c: &mut Criterion) {
    let mut group = c.benchmark_group("rescan_unchanged");

    for &count in &[1u32, 4, 8] {
        let snapshot = pads(count, 0);
        let mut set = ConnectedSet::new();
        set.rescan(&snapshot, 0.0);

        group.bench_with_input(BenchmarkId::new("pads", count), &snapshot, |b, snap| {
            b.iter(|| set.rescan(black_box(snap), black_box(200.0)))
        });
    }

    group.finish();
}

/// Alternates between two disjoint memberships so every scan adds and removes.
fn bench_rescan_churn(c: &mut Criterion) {
    let mut group = c.benchmark_group("rescan_churn");

    for &count in &[1u32, 4, 8] {
        let a = pads(count, 0);
        let b_side = pads(count, count);
        let mut set = ConnectedSet::new();
        let mut flip = false;

        group.bench_function(BenchmarkId::new("pads", count), |b| {
            b.iter(|| {
                flip = !flip;
                let snap = if flip { &a } else { &b_side };
                set.rescan(black_box(snap), black_box(0.0))
            })
        });
    }

    group.finish();
}

// ── Benchmarks: select ────────────────────────────────────────────────────────

fn bench_select(c: &mut Criterion) {
    let mut set = ConnectedSet::new();
    set.rescan(&pads(8, 0), 0.0);
    let mut group = c.benchmark_group("select");

    group.bench_function("first", |b| {
        b.iter(|| set.select(black_box(DevicePreference::First)).map(|d| d.index))
    });
    group.bench_function("last_connected", |b| {
        b.iter(|| {
            set.select(black_box(DevicePreference::LastConnected))
                .map(|d| d.index)
        })
    });
    group.bench_function("index", |b| {
        b.iter(|| set.select(black_box(DevicePreference::Index(5))).map(|d| d.index))
    });

    group.finish();
}

criterion_group!(benches, bench_rescan_unchanged, bench_rescan_churn, bench_select);
criterion_main!(benches);
