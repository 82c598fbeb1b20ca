// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Mark detection: flags interior cells whose mean intensity shows ink.

use image::{DynamicImage, Rgb, RgbImage};
use imageproc::drawing::draw_hollow_rect_mut;
use imageproc::rect::Rect;
use sheetgrade_core::config::MarkConfig;
use sheetgrade_core::types::BoundingBox;
use tracing::{debug, instrument, trace};

use crate::contour::CellContour;
use crate::image::ImageProcessor;
use crate::image::filters::sharpen;

const MARK_COLOR: Rgb<u8> = Rgb([0, 255, 0]);

#[derive(Debug, Clone, Default)]
pub struct MarkDetector {
    config: MarkConfig,
}

impl MarkDetector {
    pub fn new(config: MarkConfig) -> Self {
        Self { config }
    }

    /// Contrast-scaled, sharpened working copy that cell means are taken on.
    pub fn working_copy(&self, image: &DynamicImage) -> RgbImage {
        let scaled = ImageProcessor::from_dynamic(image.clone())
            .scale_contrast(self.config.contrast_gain, self.config.contrast_offset)
            .into_dynamic()
            .to_rgb8();
        sharpen(&scaled, self.config.sharpen_center)
    }

    /// Cells whose mean intensity falls below the fill threshold.
    #[instrument(skip_all, fields(cells = cells.len()))]
    pub fn detect(&self, image: &DynamicImage, cells: &[CellContour]) -> Vec<CellContour> {
        let working = self.working_copy(image);
        let marked: Vec<CellContour> = cells
            .iter()
            .filter(|cell| {
                let mean = mean_intensity(&working, cell.bbox());
                trace!(bbox = ?cell.bbox(), mean, "Cell mean");
                mean.is_some_and(|m| m < self.config.fill_threshold)
            })
            .cloned()
            .collect();
        debug!(marked = marked.len(), "Marked cells detected");
        marked
    }

    /// Outline each marked cell in green on `canvas`.
    pub fn annotate(&self, canvas: &mut RgbImage, marked: &[CellContour]) {
        for cell in marked {
            let bbox = cell.bbox();
            let outer = Rect::at(bbox.x, bbox.y).of_size(bbox.width, bbox.height);
            draw_hollow_rect_mut(canvas, outer, MARK_COLOR);
            if bbox.width > 2 && bbox.height > 2 {
                let inner =
                    Rect::at(bbox.x + 1, bbox.y + 1).of_size(bbox.width - 2, bbox.height - 2);
                draw_hollow_rect_mut(canvas, inner, MARK_COLOR);
            }
        }
    }
}

/// Mean over every channel of the pixels inside `bbox`, clipped to the image.
///
/// `None` when the box lies entirely outside the image.
pub fn mean_intensity(image: &RgbImage, bbox: BoundingBox) -> Option<f64> {
    let (width, height) = image.dimensions();
    let x0 = bbox.x.max(0) as u32;
    let y0 = bbox.y.max(0) as u32;
    let x1 = (bbox.x as i64 + bbox.width as i64).clamp(0, width as i64) as u32;
    let y1 = (bbox.y as i64 + bbox.height as i64).clamp(0, height as i64) as u32;
    if x0 >= x1 || y0 >= y1 {
        return None;
    }

    let mut sum: u64 = 0;
    for y in y0..y1 {
        for x in x0..x1 {
            sum += image.get_pixel(x, y).0.iter().map(|&c| c as u64).sum::<u64>();
        }
    }
    let samples = (x1 - x0) as u64 * (y1 - y0) as u64 * 3;
    Some(sum as f64 / samples as f64)
}

#[cfg(test)]
mod tests {
    use super::*;

    /// White sheet with two 40x30 cells; the second has a dark square inked in.
    fn two_cells() -> (DynamicImage, Vec<CellContour>) {
        let mut img = RgbImage::from_pixel(120, 50, Rgb([255, 255, 255]));
        for y in 17..33 {
            for x in 70..90 {
                img.put_pixel(x, y, Rgb([20, 20, 20]));
            }
        }
        let cells = vec![
            CellContour::rectangle(10, 10, 40, 30),
            CellContour::rectangle(60, 10, 40, 30),
        ];
        (DynamicImage::ImageRgb8(img), cells)
    }

    #[test]
    fn mean_intensity_of_uniform_region() {
        let img = RgbImage::from_pixel(10, 10, Rgb([30, 60, 90]));
        let mean = mean_intensity(&img, BoundingBox::new(2, 2, 4, 4)).unwrap();
        assert!((mean - 60.0).abs() < 1e-9);
    }

    #[test]
    fn mean_intensity_clips_to_image() {
        let img = RgbImage::from_pixel(10, 10, Rgb([100, 100, 100]));
        assert!(mean_intensity(&img, BoundingBox::new(8, 8, 10, 10)).is_some());
        assert!(mean_intensity(&img, BoundingBox::new(20, 20, 5, 5)).is_none());
    }

    #[test]
    fn working_copy_saturates_paper() {
        let (img, _) = two_cells();
        let working = MarkDetector::default().working_copy(&img);
        assert_eq!(working.get_pixel(30, 25), &Rgb([255, 255, 255]));
        // Flat ink is tripled by the kernel but stays well below paper.
        assert!(working.get_pixel(80, 25).0[0] < 100);
    }

    #[test]
    fn only_inked_cell_is_marked() {
        let (img, cells) = two_cells();
        let marked = MarkDetector::default().detect(&img, &cells);
        assert_eq!(marked.len(), 1);
        assert_eq!(marked[0].bbox().x, 60);
    }

    #[test]
    fn stricter_threshold_marks_nothing() {
        let (img, cells) = two_cells();
        let detector = MarkDetector::new(MarkConfig {
            fill_threshold: 100.0,
            ..MarkConfig::default()
        });
        assert!(detector.detect(&img, &cells).is_empty());
    }

    #[test]
    fn annotation_draws_two_pixel_green_outline() {
        let mut canvas = RgbImage::from_pixel(50, 50, Rgb([255, 255, 255]));
        let marked = [CellContour::rectangle(10, 10, 20, 20)];
        MarkDetector::default().annotate(&mut canvas, &marked);
        assert_eq!(canvas.get_pixel(10, 15), &MARK_COLOR);
        assert_eq!(canvas.get_pixel(11, 15), &MARK_COLOR);
        assert_eq!(canvas.get_pixel(12, 15), &Rgb([255, 255, 255]));
        assert_eq!(canvas.get_pixel(29, 29), &MARK_COLOR);
    }
}
