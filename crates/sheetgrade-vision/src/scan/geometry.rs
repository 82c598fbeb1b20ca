// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Geometry normalizer: deskews a photographed answer sheet, finds the outer
// quadrilateral of the answer table, and warps it to a front-facing rectangle.

use image::{DynamicImage, GrayImage, Rgb, RgbImage};
use imageproc::distance_transform::Norm;
use imageproc::geometric_transformations::{Interpolation, Projection, warp_into};
use imageproc::morphology::close;
use sheetgrade_core::config::GeometryConfig;
use sheetgrade_core::error::{Result, SheetgradeError};
use sheetgrade_core::types::{PipelineStage, Quadrilateral};
use tracing::{debug, info, instrument, warn};

use crate::contour::{self, CellContour};
use crate::image::ImageProcessor;
use crate::image::filters::gaussian_blur;
use crate::image::threshold::{Polarity, binarize_otsu};

/// Corrective rotation, in degrees counter-clockwise, for a minimum-area
/// rectangle reporting `angle` in `[0, 90)`.
pub fn deskew_rotation(angle: f32) -> f32 {
    if angle > 45.0 { 90.0 - angle } else { -angle }
}

/// Turns a skewed, perspective-distorted photo into a front-facing image of
/// the answer table.
///
/// ## Pipeline
///
/// 1. Grayscale, Gaussian blur, inverted Otsu binarization
/// 2. Minimum-area rectangle of the dominant contour gives the skew angle;
///    the original image is rotated about its center to undo it
/// 3. On the deskewed image: binarize again, close gaps with a square
///    structuring element, and approximate the largest contour to a polygon
/// 4. Order the polygon by angle, take four corners, and warp the enclosed
///    quadrilateral onto an axis-aligned rectangle
#[derive(Debug, Clone, Default)]
pub struct GeometryNormalizer {
    config: GeometryConfig,
}

impl GeometryNormalizer {
    pub fn new(config: GeometryConfig) -> Self {
        Self { config }
    }

    /// Run the full normalization.
    #[instrument(skip_all, fields(w = image.width(), h = image.height()))]
    pub fn normalize(&self, image: &DynamicImage) -> Result<DynamicImage> {
        let deskewed = self.deskew(image)?;
        let quad = self.find_table_corners(&deskewed)?;
        self.correct_perspective(&deskewed, &quad)
    }

    /// Grayscale, blur, and inverted-Otsu binarize for the table-boundary pass.
    fn table_mask(&self, image: &DynamicImage) -> GrayImage {
        let gray = image.to_luma8();
        let blurred = gaussian_blur(&gray, self.config.blur_kernel);
        binarize_otsu(&blurred, self.config.table_threshold, Polarity::Inverted)
    }

    /// Rotation in degrees (counter-clockwise) that straightens the table.
    pub fn skew_correction(&self, image: &DynamicImage) -> Result<f32> {
        let mask = self.table_mask(image);
        let contours = contour::external_contours(&mask);
        let dominant = contour::largest(&contours).ok_or_else(|| {
            SheetgradeError::geometry(PipelineStage::Deskew, "no contour found in image")
        })?;

        let reported = dominant.min_area_angle();
        let correction = deskew_rotation(reported);
        debug!(reported, correction, "Skew estimated");
        Ok(correction)
    }

    /// Rotate the image about its center so the table is upright.
    ///
    /// The canvas keeps its original size.
    #[instrument(skip_all)]
    pub fn deskew(&self, image: &DynamicImage) -> Result<DynamicImage> {
        let correction = self.skew_correction(image)?;
        info!(degrees = correction, "Deskewing");
        Ok(ImageProcessor::from_dynamic(image.clone())
            .rotate_about_center(correction)
            .into_dynamic())
    }

    /// Locate the outer quadrilateral of the table.
    #[instrument(skip_all)]
    pub fn find_table_corners(&self, image: &DynamicImage) -> Result<Quadrilateral> {
        let mask = self.table_mask(image);
        let radius = (self.config.morph_kernel / 2).min(u8::MAX as u32) as u8;
        let closed = close(&mask, Norm::LInf, radius);

        let contours = contour::external_contours(&closed);
        let table: &CellContour = contour::largest(&contours).ok_or_else(|| {
            SheetgradeError::geometry(PipelineStage::TableCorners, "no table contour found")
        })?;

        let polygon = table.approximate(self.config.approx_epsilon);
        debug!(
            contours = contours.len(),
            table_area = table.area(),
            corners = polygon.len(),
            "Table polygon approximated"
        );
        if polygon.len() < 4 {
            warn!(corners = polygon.len(), "Too few table corners");
            return Err(SheetgradeError::geometry(
                PipelineStage::TableCorners,
                format!("approximated polygon has {} corners", polygon.len()),
            ));
        }

        let quad = Quadrilateral::from_points(&polygon)?;
        debug!(corners = ?quad.corners, "Table corners ordered");
        Ok(quad)
    }

    /// Warp the quadrilateral onto a rectangle sized by its longer edges.
    #[instrument(skip_all)]
    pub fn correct_perspective(
        &self,
        image: &DynamicImage,
        quad: &Quadrilateral,
    ) -> Result<DynamicImage> {
        let (width, height) = (quad.width(), quad.height());
        let (out_w, out_h) = (width as u32, height as u32);
        if out_w < 2 || out_h < 2 {
            return Err(SheetgradeError::geometry(
                PipelineStage::Perspective,
                format!("degenerate table quadrilateral {width:.1}x{height:.1}"),
            ));
        }

        let projection = Projection::from_control_points(quad.corners, quad.destination())
            .ok_or_else(|| {
                SheetgradeError::geometry(
                    PipelineStage::Perspective,
                    format!("no projective transform for corners {:?}", quad.corners),
                )
            })?;

        let rgb = image.to_rgb8();
        let mut output = RgbImage::new(out_w, out_h);
        warp_into(
            &rgb,
            &projection,
            Interpolation::Bilinear,
            Rgb([255u8, 255, 255]),
            &mut output,
        );

        info!(out_w, out_h, "Perspective correction applied");
        Ok(DynamicImage::ImageRgb8(output))
    }
}
