// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Criterion benchmarks for sheet fingerprinting and result storage in the
// sheetgrade-store crate.

use criterion::{BenchmarkId, Criterion, black_box, criterion_group, criterion_main};

use sheetgrade_core::types::{ScoreReport, ScoredSheet, SubjectScore};
use sheetgrade_store::{ResultsDb, sheet_fingerprint};

// ---------------------------------------------------------------------------
// Benchmarks
// ---------------------------------------------------------------------------

/// SHA-256 fingerprinting at typical phone-photo sizes.
fn bench_fingerprint(c: &mut Criterion) {
    let sizes: &[(&str, usize)] = &[("500 KiB", 500 * 1024), ("3 MiB", 3 * 1024 * 1024)];

    let mut group = c.benchmark_group("sheet_fingerprint");
    for &(label, size) in sizes {
        let data = vec![0x5Au8; size];
        group.bench_with_input(BenchmarkId::from_parameter(label), &data, |b, data| {
            b.iter(|| black_box(sheet_fingerprint(black_box(data))));
        });
    }
    group.finish();
}

/// Recording one five-subject sheet into an in-memory database.
fn bench_record(c: &mut Criterion) {
    let report = ScoreReport::from_counts(
        ["Python", "EDA", "MySQL", "PowerBI", "Stats"]
            .iter()
            .map(|subject| SubjectScore {
                subject: subject.to_string(),
                correct: 14,
            })
            .collect(),
    );
    let sheet = ScoredSheet::new("bench".into(), sheet_fingerprint(b"bench"), report);
    let mut db = ResultsDb::open_in_memory().expect("open in-memory db");

    c.bench_function("results_db_record (5 subjects)", |b| {
        b.iter(|| db.record(black_box(&sheet)).expect("record failed"));
    });
}

criterion_group!(benches, bench_fingerprint, bench_record);
criterion_main!(benches);
