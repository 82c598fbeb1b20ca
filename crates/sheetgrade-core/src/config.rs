// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Pipeline configuration. Every heuristic threshold lives here so callers can
// recalibrate per deployment (paper stock, lighting, camera).

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{Result, SheetgradeError};

/// Complete configuration for one grading invocation.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GradeConfig {
    pub geometry: GeometryConfig,
    pub enhance: EnhanceConfig,
    pub segment: SegmentConfig,
    pub labels: LabelConfig,
    pub marks: MarkConfig,
}

/// Threshold/max-value pair handed to the Otsu binarizer.
///
/// Otsu computes its own cut, so `threshold` is advisory; `max_value` is the
/// intensity written for foreground pixels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ThresholdPair {
    pub threshold: u8,
    pub max_value: u8,
}

impl ThresholdPair {
    pub const fn new(threshold: u8, max_value: u8) -> Self {
        Self {
            threshold,
            max_value,
        }
    }
}

/// Deskew and perspective correction.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GeometryConfig {
    /// Gaussian blur kernel edge length (odd).
    pub blur_kernel: u32,
    /// Inverted Otsu pass used to find the table boundary.
    pub table_threshold: ThresholdPair,
    /// Square structuring element for morphological closing (odd).
    pub morph_kernel: u32,
    /// Polygon approximation tolerance as a fraction of contour perimeter.
    pub approx_epsilon: f64,
}

impl Default for GeometryConfig {
    fn default() -> Self {
        Self {
            blur_kernel: 5,
            table_threshold: ThresholdPair::new(100, 150),
            morph_kernel: 5,
            approx_epsilon: 0.1,
        }
    }
}

/// Conditional denoise/sharpen chain for tables that still look trapezoidal.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EnhanceConfig {
    /// Width/height ratio above which the chain is applied.
    pub trapezoid_aspect_ratio: f32,
    /// Weight of the original image in the unsharp mask.
    pub unsharp_amount: f32,
    /// Weight of the blurred image in the unsharp mask (negative).
    pub unsharp_blur_weight: f32,
    /// Bilateral filter window diameter.
    pub bilateral_diameter: u32,
    pub bilateral_sigma_color: f32,
    pub bilateral_sigma_space: f32,
    /// Adaptive threshold block edge length (odd).
    pub adaptive_block_size: u32,
    /// Constant subtracted from the local mean.
    pub adaptive_offset: i32,
    /// Non-local-means filter strength.
    pub nlm_strength: f32,
    /// Non-local-means patch edge length (odd).
    pub nlm_template_window: u32,
    /// Non-local-means search window edge length (odd).
    pub nlm_search_window: u32,
}

impl Default for EnhanceConfig {
    fn default() -> Self {
        Self {
            trapezoid_aspect_ratio: 1.5,
            unsharp_amount: 1.5,
            unsharp_blur_weight: -0.5,
            bilateral_diameter: 5,
            bilateral_sigma_color: 50.0,
            bilateral_sigma_space: 50.0,
            adaptive_block_size: 11,
            adaptive_offset: 2,
            nlm_strength: 10.0,
            nlm_template_window: 7,
            nlm_search_window: 21,
        }
    }
}

impl EnhanceConfig {
    /// The bilateral smoothing parameters, shared with the segmentation
    /// pre-filter.
    pub fn bilateral(&self) -> BilateralParams {
        BilateralParams {
            diameter: self.bilateral_diameter,
            sigma_color: self.bilateral_sigma_color,
            sigma_space: self.bilateral_sigma_space,
        }
    }
}

/// Window and sigmas for one bilateral smoothing pass.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BilateralParams {
    pub diameter: u32,
    pub sigma_color: f32,
    pub sigma_space: f32,
}

impl Default for BilateralParams {
    fn default() -> Self {
        EnhanceConfig::default().bilateral()
    }
}

/// Pre-filter applied before the cell-grid binarization.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SheetFilter {
    Gaussian,
    Median,
    #[default]
    Bilateral,
    Canny,
    None,
}

/// Cell-grid segmentation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SegmentConfig {
    pub prefilter: SheetFilter,
    /// Non-inverted Otsu pass used to find cell interiors.
    pub threshold: ThresholdPair,
    /// Distance from the top/left table edge that marks a header cell.
    pub edge_margin: i32,
}

impl Default for SegmentConfig {
    fn default() -> Self {
        Self {
            prefilter: SheetFilter::Bilateral,
            threshold: ThresholdPair::new(140, 240),
            edge_margin: 5,
        }
    }
}

/// Header cleanup and label assignment.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LabelConfig {
    /// Header cells closer than this to the origin are discarded as noise.
    pub origin_clearance: i32,
    /// Row-header contours with a smaller area are discarded.
    pub min_header_area: f64,
    /// Row-header contours whose y differs by less than this are merged.
    pub dedup_distance: i32,
}

impl Default for LabelConfig {
    fn default() -> Self {
        Self {
            origin_clearance: 10,
            min_header_area: 120.0,
            dedup_distance: 5,
        }
    }
}

/// Filled-cell classification.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MarkConfig {
    pub contrast_gain: f32,
    pub contrast_offset: f32,
    /// Center weight of the 3x3 sharpening kernel; neighbours weigh -1.
    pub sharpen_center: i32,
    /// Cells with a mean intensity below this are filled.
    pub fill_threshold: f64,
}

impl Default for MarkConfig {
    fn default() -> Self {
        Self {
            contrast_gain: 0.8,
            contrast_offset: 5.0,
            sharpen_center: 11,
            fill_threshold: 240.0,
        }
    }
}

impl GradeConfig {
    /// Parse a (possibly partial) JSON configuration and validate it.
    pub fn from_json_str(json: &str) -> Result<Self> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    /// Load and validate a JSON configuration file.
    pub fn from_path(path: impl AsRef<Path>) -> Result<Self> {
        let data = std::fs::read_to_string(path.as_ref())?;
        Self::from_json_str(&data)
    }

    /// Reject values the pipeline cannot run with.
    pub fn validate(&self) -> Result<()> {
        let odd = [
            ("geometry.blur_kernel", self.geometry.blur_kernel),
            ("geometry.morph_kernel", self.geometry.morph_kernel),
            ("enhance.adaptive_block_size", self.enhance.adaptive_block_size),
            ("enhance.nlm_template_window", self.enhance.nlm_template_window),
            ("enhance.nlm_search_window", self.enhance.nlm_search_window),
        ];
        for (name, value) in odd {
            if value == 0 || value % 2 == 0 {
                return Err(SheetgradeError::InvalidConfig(format!(
                    "{name} must be a positive odd number, got {value}"
                )));
            }
        }
        if self.enhance.bilateral_diameter == 0 {
            return Err(SheetgradeError::InvalidConfig(
                "enhance.bilateral_diameter must be positive".into(),
            ));
        }
        if !(self.geometry.approx_epsilon > 0.0) {
            return Err(SheetgradeError::InvalidConfig(format!(
                "geometry.approx_epsilon must be positive, got {}",
                self.geometry.approx_epsilon
            )));
        }
        if !(self.enhance.trapezoid_aspect_ratio > 0.0) {
            return Err(SheetgradeError::InvalidConfig(format!(
                "enhance.trapezoid_aspect_ratio must be positive, got {}",
                self.enhance.trapezoid_aspect_ratio
            )));
        }
        if self.enhance.nlm_strength <= 0.0 {
            return Err(SheetgradeError::InvalidConfig(
                "enhance.nlm_strength must be positive".into(),
            ));
        }
        Ok(())
    }
}
