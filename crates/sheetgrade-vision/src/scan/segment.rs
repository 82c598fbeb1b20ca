// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Cell segmentation: splits the corrected table into interior answer cells and
// the header cells that carry row and column labels.

use image::DynamicImage;
use sheetgrade_core::config::{BilateralParams, SegmentConfig};
use tracing::{debug, instrument};

use crate::contour::{self, CellContour};
use crate::image::filters::apply_sheet_filter;
use crate::image::threshold::{Polarity, binarize_otsu};

/// Contours of one corrected sheet, grouped by where they sit in the table.
///
/// A contour touching both the top and left margins (the corner cell) lands
/// in both header groups.
#[derive(Debug, Clone, Default)]
pub struct Segmentation {
    /// Cells away from both the top and left margins.
    pub interior: Vec<CellContour>,
    /// Cells hugging the left margin; they carry the question labels.
    pub header_columns: Vec<CellContour>,
    /// Cells hugging the top margin; they carry the option letters.
    pub header_rows: Vec<CellContour>,
}

#[derive(Debug, Clone, Default)]
pub struct CellSegmenter {
    config: SegmentConfig,
    smoothing: BilateralParams,
}

impl CellSegmenter {
    pub fn new(config: SegmentConfig) -> Self {
        Self {
            config,
            smoothing: BilateralParams::default(),
        }
    }

    /// Bilateral parameters for the [`SheetFilter::Bilateral`] pre-filter.
    ///
    /// [`SheetFilter::Bilateral`]: sheetgrade_core::config::SheetFilter::Bilateral
    pub fn with_smoothing(mut self, smoothing: BilateralParams) -> Self {
        self.smoothing = smoothing;
        self
    }

    #[instrument(skip_all, fields(w = image.width(), h = image.height()))]
    pub fn segment(&self, image: &DynamicImage) -> Segmentation {
        let gray = image.to_luma8();
        let filtered = apply_sheet_filter(&gray, self.config.prefilter, self.smoothing);
        let binary = binarize_otsu(&filtered, self.config.threshold, Polarity::Normal);
        let contours = contour::external_contours(&binary);

        let segmentation = self.classify(contours);
        debug!(
            interior = segmentation.interior.len(),
            header_columns = segmentation.header_columns.len(),
            header_rows = segmentation.header_rows.len(),
            "Cells segmented"
        );
        segmentation
    }

    /// Group contours by the position of their bounding box.
    pub fn classify(&self, contours: Vec<CellContour>) -> Segmentation {
        let margin = self.config.edge_margin;
        let mut out = Segmentation::default();
        for c in contours {
            let bbox = c.bbox();
            if bbox.x < margin {
                out.header_columns.push(c.clone());
            }
            if bbox.y < margin {
                out.header_rows.push(c.clone());
            }
            if bbox.x > margin && bbox.y > margin {
                out.interior.push(c);
            }
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::SheetLayout;

    fn segmenter() -> CellSegmenter {
        CellSegmenter::default()
    }

    #[test]
    fn classify_by_margin() {
        let contours = vec![
            CellContour::rectangle(2, 2, 40, 30),   // corner
            CellContour::rectangle(50, 2, 40, 30),  // top header
            CellContour::rectangle(2, 40, 40, 30),  // left header
            CellContour::rectangle(50, 40, 40, 30), // interior
            CellContour::rectangle(5, 40, 40, 30),  // on the margin itself
        ];
        let seg = segmenter().classify(contours);
        assert_eq!(seg.interior.len(), 1);
        assert_eq!(seg.interior[0].bbox().x, 50);
        assert_eq!(seg.header_rows.len(), 2);
        assert_eq!(seg.header_columns.len(), 2);
    }

    #[test]
    fn rendered_table_splits_into_headers_and_cells() {
        let layout = SheetLayout::standard();
        let table = DynamicImage::ImageRgb8(layout.render_table(&[]));
        let seg = segmenter().segment(&table);

        let (rows, cols) = (layout.rows as usize, layout.cols as usize);
        assert_eq!(seg.interior.len(), (rows - 1) * (cols - 1));
        assert_eq!(seg.header_rows.len(), cols);
        assert_eq!(seg.header_columns.len(), rows);
    }

    #[test]
    fn blank_image_has_no_cells() {
        let blank = DynamicImage::ImageLuma8(image::GrayImage::new(30, 30));
        let seg = segmenter().segment(&blank);
        assert!(seg.interior.is_empty());
        assert!(seg.header_rows.is_empty());
        assert!(seg.header_columns.is_empty());
    }
}
