// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Criterion benchmarks for the sheetgrade-vision crate. Runs geometry
// normalization and the full grade on a small synthetic answer sheet.

use criterion::{Criterion, black_box, criterion_group, criterion_main};
use image::{DynamicImage, Rgb, RgbImage};

use sheetgrade_core::types::{AnswerKey, AnswerKeyEntry};
use sheetgrade_vision::{ImageProcessor, SheetGrader};

// ---------------------------------------------------------------------------
// Fixtures
// ---------------------------------------------------------------------------

/// 420x340 photo of a 5x5 ruled table (one header row and column) with
/// pencil marks in three answer cells.
fn synthetic_sheet() -> DynamicImage {
    let (cell_w, cell_h, line) = (60u32, 50u32, 3u32);
    let (ox, oy) = (40u32, 40u32);
    let (table_w, table_h) = (5 * cell_w + line, 5 * cell_h + line);
    let mut img = RgbImage::from_pixel(420, 340, Rgb([255, 255, 255]));

    let mut fill = |x0: u32, y0: u32, x1: u32, y1: u32, color: Rgb<u8>| {
        for y in y0..y1 {
            for x in x0..x1 {
                img.put_pixel(x, y, color);
            }
        }
    };
    for i in 0..=5 {
        fill(ox + i * cell_w, oy, ox + i * cell_w + line, oy + table_h, Rgb([0, 0, 0]));
        fill(ox, oy + i * cell_h, ox + table_w, oy + i * cell_h + line, Rgb([0, 0, 0]));
    }
    for (row, col) in [(1u32, 2u32), (2, 1), (3, 3)] {
        let cx = ox + col * cell_w + line + (cell_w - line) / 2;
        let cy = oy + row * cell_h + line + (cell_h - line) / 2;
        fill(cx - 15, cy - 12, cx + 15, cy + 12, Rgb([30, 30, 30]));
    }
    DynamicImage::ImageRgb8(img)
}

// ---------------------------------------------------------------------------
// Benchmarks
// ---------------------------------------------------------------------------

/// Deskew plus perspective correction on the synthetic photo.
fn bench_normalize(c: &mut Criterion) {
    let sheet = synthetic_sheet();
    let grader = SheetGrader::default();

    c.bench_function("normalize (420x340)", |b| {
        b.iter(|| {
            let corrected = grader.normalize(black_box(&sheet));
            black_box(corrected.ok());
        });
    });
}

/// Full grade from PNG bytes, decoding included.
fn bench_grade(c: &mut Criterion) {
    let png = ImageProcessor::from_dynamic(synthetic_sheet())
        .to_png_bytes()
        .unwrap_or_default();
    let key: AnswerKey = [("1", "B"), ("2", "A"), ("3", "A"), ("4", "D")]
        .into_iter()
        .map(|(q, a)| AnswerKeyEntry::new(q, a))
        .collect();
    let grader = SheetGrader::default();

    c.bench_function("grade (420x340 png)", |b| {
        b.iter(|| {
            let result = grader.grade(black_box(&png), &key);
            black_box(result.ok());
        });
    });
}

criterion_group!(benches, bench_normalize, bench_grade);
criterion_main!(benches);
