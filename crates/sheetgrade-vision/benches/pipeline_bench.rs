// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Criterion benchmarks for the sheetgrade-vision crate: the full evaluation
// pipeline on a synthetic photographed sheet, and grid decoding on its own.

use criterion::{Criterion, black_box, criterion_group, criterion_main};
use image::{DynamicImage, Rgb, RgbImage};

use sheetgrade_core::config::{DecoderConfig, EvaluatorConfig};
use sheetgrade_core::types::{AnswerKey, GridGeometry, SubjectKey};
use sheetgrade_vision::{BinaryMask, GridDecoder, SheetEvaluator};

// ---------------------------------------------------------------------------
// Fixtures
// ---------------------------------------------------------------------------

/// A light sheet with a dark frame and one filled bubble per question, laid
/// on a dark table.
fn synthetic_photo(geometry: &GridGeometry) -> DynamicImage {
    let (width, height) = (320u32, 420u32);
    let (left, top, right, bottom) = (30u32, 30u32, 290u32, 390u32);
    let rows = geometry.total_questions() as u32;
    let cols = geometry.options_per_question as u32;
    let cell_w = (right - left) / cols;
    let cell_h = (bottom - top) / rows;

    let mut img = RgbImage::from_pixel(width, height, Rgb([40, 35, 30]));
    for y in top..bottom {
        for x in left..right {
            img.put_pixel(x, y, Rgb([235, 235, 228]));
        }
    }
    for row in 0..rows {
        let col = row % cols;
        let x0 = left + col * cell_w + cell_w / 4;
        let y0 = top + row * cell_h + cell_h / 4;
        for y in y0..y0 + cell_h / 2 {
            for x in x0..x0 + cell_w / 2 {
                img.put_pixel(x, y, Rgb([25, 25, 25]));
            }
        }
    }
    DynamicImage::ImageRgb8(img)
}

fn cyclic_key(geometry: &GridGeometry) -> AnswerKey {
    let letters: Vec<char> = (0..geometry.questions_per_subject)
        .map(|q| (b'a' + (q % geometry.options_per_question) as u8) as char)
        .collect();
    AnswerKey::new(
        (0..geometry.subject_count)
            .map(|s| SubjectKey {
                name: format!("Subject {}", s + 1),
                letters: letters.clone(),
            })
            .collect(),
    )
}

// ---------------------------------------------------------------------------
// Benchmarks
// ---------------------------------------------------------------------------

/// Full rectify, binarize, decode and score on a 320x420 photo.
fn bench_evaluate(c: &mut Criterion) {
    let geometry = GridGeometry::new(2, 10, 4).expect("valid geometry");
    let config = EvaluatorConfig {
        geometry,
        subjects: Vec::new(),
        ..EvaluatorConfig::default()
    };
    let evaluator = SheetEvaluator::new(&config).expect("valid config");
    let photo = synthetic_photo(&geometry);
    let key = cyclic_key(&geometry);

    c.bench_function("evaluate (320x420, 2x10x4)", |b| {
        b.iter(|| {
            let evaluation = evaluator.evaluate(black_box(&photo), &key);
            black_box(evaluation.map(|e| e.report.total()).ok());
        });
    });
}

/// Grid decoding of a default-layout mask (5 subjects x 20 questions x 4).
fn bench_decode(c: &mut Criterion) {
    let geometry = GridGeometry::default();
    let decoder = GridDecoder::new(geometry, DecoderConfig::default()).expect("valid geometry");
    let rows = geometry.total_questions() as u32;
    let mut mask = BinaryMask::new(400, rows * 12);
    for row in 0..rows {
        let x = (row % 4) * 100;
        mask.fill(x + 20..x + 80, row * 12 + 2..row * 12 + 10);
    }

    c.bench_function("decode (5x20x4)", |b| {
        b.iter(|| black_box(decoder.decode(black_box(&mask)).ok()));
    });
}

criterion_group!(benches, bench_evaluate, bench_decode);
criterion_main!(benches);
