// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Smoothing, sharpening, and denoising filters used by the grading stages.

use image::{GrayImage, Luma, Rgb, RgbImage};
use imageproc::edges::canny;
use imageproc::filter::{bilateral_filter, gaussian_blur_f32, median_filter};
use sheetgrade_core::config::{BilateralParams, SheetFilter};
use tracing::{debug, instrument};

/// Gaussian sigma equivalent to a square kernel of edge `kernel`.
///
/// Uses the conventional `0.3 * ((k - 1) * 0.5 - 1) + 0.8` rule so a 5x5
/// kernel maps to sigma 1.1.
pub fn sigma_for_kernel(kernel: u32) -> f32 {
    let k = kernel.max(1) as f32;
    (0.3 * ((k - 1.0) * 0.5 - 1.0) + 0.8).max(0.1)
}

/// Gaussian blur with a kernel size rather than a sigma.
pub fn gaussian_blur(gray: &GrayImage, kernel: u32) -> GrayImage {
    gaussian_blur_f32(gray, sigma_for_kernel(kernel))
}

/// Edge-preserving bilateral smoothing.
pub fn bilateral(gray: &GrayImage, params: BilateralParams) -> GrayImage {
    // imageproc takes the maximum intensity up front, which an empty image lacks.
    if gray.width() == 0 || gray.height() == 0 {
        return gray.clone();
    }
    bilateral_filter(gray, params.diameter, params.sigma_color, params.sigma_space)
}

/// Unsharp mask: `amount * original + blur_weight * gaussian(original)`.
pub fn unsharp_mask(gray: &GrayImage, amount: f32, blur_weight: f32) -> GrayImage {
    let blurred = gaussian_blur(gray, 5);
    GrayImage::from_fn(gray.width(), gray.height(), |x, y| {
        let orig = gray.get_pixel(x, y).0[0] as f32;
        let blur = blurred.get_pixel(x, y).0[0] as f32;
        Luma([(amount * orig + blur_weight * blur).round().clamp(0.0, 255.0) as u8])
    })
}

/// 3x3 sharpening convolution with `center` in the middle and -1 around it.
///
/// Borders are reflected without repeating the edge pixel; `filter3x3`
/// clamps to the edge instead.
pub fn sharpen(rgb: &RgbImage, center: i32) -> RgbImage {
    let (width, height) = rgb.dimensions();
    RgbImage::from_fn(width, height, |x, y| {
        let mut acc = [0i32; 3];
        for dy in -1i32..=1 {
            for dx in -1i32..=1 {
                let weight = if dx == 0 && dy == 0 { center } else { -1 };
                let sx = reflect101(x as i32 + dx, width);
                let sy = reflect101(y as i32 + dy, height);
                let p = rgb.get_pixel(sx, sy);
                for (sum, channel) in acc.iter_mut().zip(p.0) {
                    *sum += weight * channel as i32;
                }
            }
        }
        Rgb(acc.map(|v| v.clamp(0, 255) as u8))
    })
}

fn reflect101(i: i32, len: u32) -> u32 {
    let n = len as i32;
    if n <= 1 {
        return 0;
    }
    let reflected = if i < 0 {
        -i
    } else if i >= n {
        2 * n - 2 - i
    } else {
        i
    };
    reflected.clamp(0, n - 1) as u32
}

/// Non-local-means denoising.
///
/// Each pixel becomes a weighted average of the pixels in a `search_window`
/// neighbourhood, weighted by how similar their `template_window` patches are.
/// Patch distances come from one squared-difference integral image per search
/// offset.
#[instrument(skip(gray), fields(w = gray.width(), h = gray.height()))]
pub fn non_local_means(
    gray: &GrayImage,
    strength: f32,
    template_window: u32,
    search_window: u32,
) -> GrayImage {
    let (width, height) = gray.dimensions();
    if width == 0 || height == 0 {
        return gray.clone();
    }
    let (w, h) = (width as i32, height as i32);
    let template_radius = (template_window / 2) as i32;
    let search_radius = (search_window / 2) as i32;
    let h2 = (strength as f64) * (strength as f64);

    let px = |x: i32, y: i32| -> f64 {
        gray.get_pixel(x.clamp(0, w - 1) as u32, y.clamp(0, h - 1) as u32).0[0] as f64
    };

    let n = width as usize * height as usize;
    let stride = width as usize + 1;
    let mut acc = vec![0f64; n];
    let mut weights = vec![0f64; n];
    let mut integral = vec![0f64; stride * (height as usize + 1)];

    for dy in -search_radius..=search_radius {
        for dx in -search_radius..=search_radius {
            for y in 0..h {
                let mut row_sum = 0f64;
                for x in 0..w {
                    let d = px(x, y) - px(x + dx, y + dy);
                    row_sum += d * d;
                    let idx = (y as usize + 1) * stride + x as usize + 1;
                    integral[idx] = row_sum + integral[y as usize * stride + x as usize + 1];
                }
            }

            for y in 0..h {
                let y0 = (y - template_radius).max(0) as usize;
                let y1 = (y + template_radius + 1).min(h) as usize;
                for x in 0..w {
                    let x0 = (x - template_radius).max(0) as usize;
                    let x1 = (x + template_radius + 1).min(w) as usize;
                    let ssd = integral[y1 * stride + x1] - integral[y0 * stride + x1]
                        - integral[y1 * stride + x0]
                        + integral[y0 * stride + x0];
                    let area = ((x1 - x0) * (y1 - y0)) as f64;
                    let weight = (-(ssd / area).max(0.0) / h2).exp();
                    let idx = y as usize * width as usize + x as usize;
                    acc[idx] += weight * px(x + dx, y + dy);
                    weights[idx] += weight;
                }
            }
        }
    }

    debug!("Non-local-means pass complete");
    GrayImage::from_fn(width, height, |x, y| {
        let idx = y as usize * width as usize + x as usize;
        Luma([(acc[idx] / weights[idx]).round().clamp(0.0, 255.0) as u8])
    })
}

/// Apply the configured pre-segmentation filter.
///
/// `smoothing` only matters for [`SheetFilter::Bilateral`].
pub fn apply_sheet_filter(
    gray: &GrayImage,
    filter: SheetFilter,
    smoothing: BilateralParams,
) -> GrayImage {
    debug!(?filter, "Applying sheet pre-filter");
    match filter {
        SheetFilter::Gaussian => gaussian_blur(gray, 5),
        SheetFilter::Median => median_filter(gray, 2, 2),
        SheetFilter::Bilateral => bilateral(gray, smoothing),
        SheetFilter::Canny => canny(gray, 100.0, 200.0),
        SheetFilter::None => gray.clone(),
    }
}
