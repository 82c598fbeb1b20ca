// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Enhancement selector: decides from the table's bounding box whether a
// corrected sheet needs extra cleanup, and runs the cleanup chain when it does.

use image::{DynamicImage, GrayImage};
use sheetgrade_core::config::{EnhanceConfig, GeometryConfig, ThresholdPair};
use sheetgrade_core::types::BoundingBox;
use tracing::{debug, info, instrument};

use crate::contour::{self, CellContour};
use crate::image::filters::{bilateral, non_local_means, unsharp_mask};
use crate::image::threshold::{Polarity, adaptive_threshold_inverted, binarize_otsu};

/// Shape measurements of the dominant dark structure in a corrected sheet.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TableMetrics {
    pub bbox: BoundingBox,
}

impl TableMetrics {
    /// Measure the bounding box of the largest dark region, binarized with
    /// the same inverted Otsu pass that finds the table boundary.
    ///
    /// Returns `None` when the image has no dark structure at all.
    pub fn measure(image: &DynamicImage, table_threshold: ThresholdPair) -> Option<Self> {
        let gray = image.to_luma8();
        dominant_contour(&gray, table_threshold).map(|c| Self { bbox: c.bbox() })
    }

    pub fn aspect_ratio(&self) -> Option<f32> {
        self.bbox.aspect_ratio()
    }
}

fn dominant_contour(gray: &GrayImage, table_threshold: ThresholdPair) -> Option<CellContour> {
    let binary = binarize_otsu(gray, table_threshold, Polarity::Inverted);
    let contours = contour::external_contours(&binary);
    contour::largest(&contours).cloned()
}

/// Decides whether a measured table warrants enhancement.
pub trait EnhancementPolicy {
    fn should_enhance(&self, metrics: &TableMetrics) -> bool;
}

/// Enhance when the table is much wider than tall, which is what a
/// trapezoidal table looks like after a poor perspective fit.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AspectRatioPolicy {
    pub cutoff: f32,
}

impl Default for AspectRatioPolicy {
    fn default() -> Self {
        Self { cutoff: 1.5 }
    }
}

impl EnhancementPolicy for AspectRatioPolicy {
    fn should_enhance(&self, metrics: &TableMetrics) -> bool {
        metrics.aspect_ratio().is_some_and(|ratio| ratio > self.cutoff)
    }
}

/// Conditionally cleans up a corrected sheet.
///
/// ## Pipeline (when the policy fires)
///
/// 1. Grayscale
/// 2. Unsharp mask
/// 3. Bilateral smoothing
/// 4. Inverted adaptive threshold
/// 5. Non-local-means denoising
#[derive(Debug, Clone)]
pub struct EnhancementSelector<P = AspectRatioPolicy> {
    config: EnhanceConfig,
    table_threshold: ThresholdPair,
    policy: P,
}

impl EnhancementSelector<AspectRatioPolicy> {
    /// Selector using the aspect-ratio policy with the configured cutoff.
    pub fn new(config: EnhanceConfig) -> Self {
        let policy = AspectRatioPolicy {
            cutoff: config.trapezoid_aspect_ratio,
        };
        Self::with_policy(config, policy)
    }
}

impl Default for EnhancementSelector<AspectRatioPolicy> {
    fn default() -> Self {
        Self::new(EnhanceConfig::default())
    }
}

impl<P: EnhancementPolicy> EnhancementSelector<P> {
    pub fn with_policy(config: EnhanceConfig, policy: P) -> Self {
        Self {
            config,
            table_threshold: GeometryConfig::default().table_threshold,
            policy,
        }
    }

    /// Binarization pair used to measure the table; normally the geometry
    /// stage's `table_threshold`.
    pub fn with_table_threshold(mut self, table_threshold: ThresholdPair) -> Self {
        self.table_threshold = table_threshold;
        self
    }

    /// Return the image to segment and whether enhancement ran.
    ///
    /// Never fails: an image with no measurable table passes through unchanged.
    #[instrument(skip_all, fields(w = image.width(), h = image.height()))]
    pub fn maybe_enhance(&self, image: &DynamicImage) -> (DynamicImage, bool) {
        let Some(metrics) = TableMetrics::measure(image, self.table_threshold) else {
            debug!("No table structure measured; skipping enhancement");
            return (image.clone(), false);
        };

        if !self.policy.should_enhance(&metrics) {
            debug!(ratio = ?metrics.aspect_ratio(), "Table shape acceptable");
            return (image.clone(), false);
        }

        info!(ratio = ?metrics.aspect_ratio(), "Enhancing trapezoidal table");
        (DynamicImage::ImageLuma8(self.enhance(image)), true)
    }

    // -- Enhancement chain ----------------------------------------------------

    /// Run the full cleanup chain unconditionally.
    pub fn enhance(&self, image: &DynamicImage) -> GrayImage {
        let cfg = &self.config;

        // Step 1+2: Grayscale and unsharp mask.
        let gray = image.to_luma8();
        let sharpened = unsharp_mask(&gray, cfg.unsharp_amount, cfg.unsharp_blur_weight);

        // Step 3: Edge-preserving smoothing.
        let smoothed = bilateral(&sharpened, cfg.bilateral());

        // Step 4: Local binarization, ink becomes foreground.
        let binary = adaptive_threshold_inverted(
            &smoothed,
            cfg.adaptive_block_size,
            cfg.adaptive_offset,
            255,
        );

        // Step 5: Denoise.
        let denoised = non_local_means(
            &binary,
            cfg.nlm_strength,
            cfg.nlm_template_window,
            cfg.nlm_search_window,
        );
        debug!("Enhancement chain complete");
        denoised
    }
}
