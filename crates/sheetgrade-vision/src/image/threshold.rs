// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Binarization: one Otsu utility shared by the table-boundary and cell-grid
// passes, plus local-mean adaptive thresholding.

use image::{GrayImage, Luma};
use imageproc::contrast::otsu_level;
use imageproc::integral_image::{integral_image, sum_image_pixels};
use sheetgrade_core::config::ThresholdPair;
use tracing::debug;

/// Which side of the cut becomes foreground.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Polarity {
    /// Bright pixels become foreground (`max_value`).
    Normal,
    /// Dark pixels (ink, grid lines) become foreground.
    Inverted,
}

/// Binarize with an Otsu cut, writing `pair.max_value` for foreground.
///
/// `pair.threshold` is only logged; Otsu picks its own cut.
pub fn binarize_otsu(gray: &GrayImage, pair: ThresholdPair, polarity: Polarity) -> GrayImage {
    let level = otsu_level(gray);
    debug!(
        level,
        requested = pair.threshold,
        max_value = pair.max_value,
        ?polarity,
        "Otsu threshold computed"
    );

    GrayImage::from_fn(gray.width(), gray.height(), |x, y| {
        let above = gray.get_pixel(x, y).0[0] > level;
        let foreground = match polarity {
            Polarity::Normal => above,
            Polarity::Inverted => !above,
        };
        Luma([if foreground { pair.max_value } else { 0 }])
    })
}

/// Inverted adaptive threshold against the local mean.
///
/// For each pixel the cut is the mean of its `block_size` x `block_size`
/// neighbourhood minus `offset`; pixels at or below the cut become
/// `max_value`, everything else 0.
pub fn adaptive_threshold_inverted(
    gray: &GrayImage,
    block_size: u32,
    offset: i32,
    max_value: u8,
) -> GrayImage {
    let (width, height) = gray.dimensions();
    if width == 0 || height == 0 {
        return gray.clone();
    }
    let radius = block_size / 2;
    let integral = integral_image::<_, u64>(gray);

    GrayImage::from_fn(width, height, |x, y| {
        // The window is clamped to the image, so edge pixels average fewer samples.
        let (left, top) = (x.saturating_sub(radius), y.saturating_sub(radius));
        let right = (x + radius).min(width - 1);
        let bottom = (y + radius).min(height - 1);
        let area = ((right - left + 1) * (bottom - top + 1)) as f64;
        let local_mean = sum_image_pixels(&integral, left, top, right, bottom)[0] as f64 / area;

        let cut = local_mean - offset as f64;
        let val = gray.get_pixel(x, y).0[0] as f64;
        Luma([if val > cut { 0 } else { max_value }])
    })
}
