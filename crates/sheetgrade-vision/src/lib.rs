// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// sheetgrade-vision: Image pipeline for the sheetgrade answer-sheet grader.
//
// Provides image processing (decoding, rotation, filtering, binarization),
// contour geometry, and the grading stages (geometry normalization,
// enhancement, cell segmentation, labelling, mark detection, scoring).

pub mod contour;
pub mod image;
pub mod pipeline;
pub mod scan;

#[cfg(test)]
mod test_support;

// Re-export the primary structs so callers can use `sheetgrade_vision::SheetGrader` etc.
pub use crate::contour::CellContour;
pub use crate::image::processor::ImageProcessor;
pub use pipeline::{CorrectedSheet, GradeReport, SegmentedSheet, SheetGrader};
pub use scan::{GeometryNormalizer, Segmentation};
