// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Label assignment: orders the header cells and names them, letters along the
// top strip and question numbers down the left strip.

use sheetgrade_core::config::LabelConfig;
use sheetgrade_core::error::{Result, SheetgradeError};
use sheetgrade_core::types::{LabelSet, LabeledCell, PipelineStage};
use tracing::{debug, instrument, warn};

use crate::contour::CellContour;

const ALPHABET: &str = "ABCDEFGHIJKLMNOPQRSTUVWXYZ";

#[derive(Debug, Clone, Default)]
pub struct LabelAssigner {
    config: LabelConfig,
}

impl LabelAssigner {
    pub fn new(config: LabelConfig) -> Self {
        Self { config }
    }

    /// Label the top strip ("A", "B", ...) and the left strip ("1", "2", ...).
    ///
    /// Fails when either strip ends up empty after cleanup.
    #[instrument(skip_all, fields(top = header_rows.len(), left = header_columns.len()))]
    pub fn assign(
        &self,
        header_rows: &[CellContour],
        header_columns: &[CellContour],
    ) -> Result<LabelSet> {
        let columns = self.option_labels(header_rows);
        if columns.is_empty() {
            return Err(SheetgradeError::segmentation(
                PipelineStage::Labels,
                format!(
                    "no option header cells left out of {} candidates",
                    header_rows.len()
                ),
            ));
        }

        let rows = self.question_labels(header_columns);
        if rows.is_empty() {
            return Err(SheetgradeError::segmentation(
                PipelineStage::Labels,
                format!(
                    "no question header cells left out of {} candidates",
                    header_columns.len()
                ),
            ));
        }

        debug!(rows = rows.len(), columns = columns.len(), "Labels assigned");
        Ok(LabelSet { rows, columns })
    }

    /// Option letters for the top strip, left to right.
    pub fn option_labels(&self, header_rows: &[CellContour]) -> Vec<LabeledCell> {
        let mut cells = without_min_by(header_rows, |c| c.bbox().x);
        cells.retain(|c| c.bbox().x >= self.config.origin_clearance);
        cells.sort_by_key(|c| c.bbox().x);

        if cells.len() > ALPHABET.len() {
            warn!(
                found = cells.len(),
                "More option columns than letters; extra columns dropped"
            );
        }
        cells
            .into_iter()
            .zip(ALPHABET.chars())
            .map(|(c, letter)| LabeledCell {
                label: letter.to_string(),
                bbox: c.bbox(),
            })
            .collect()
    }

    /// Question numbers for the left strip, top to bottom.
    pub fn question_labels(&self, header_columns: &[CellContour]) -> Vec<LabeledCell> {
        let mut cells = without_min_by(header_columns, |c| c.bbox().y);
        cells.retain(|c| c.bbox().y >= self.config.origin_clearance);
        cells.sort_by_key(|c| c.bbox().y);
        cells.retain(|c| c.area() >= self.config.min_header_area);

        let mut kept: Vec<&CellContour> = Vec::with_capacity(cells.len());
        for cell in cells {
            let y = cell.bbox().y;
            let duplicate = kept
                .iter()
                .any(|k| (k.bbox().y - y).abs() < self.config.dedup_distance);
            if duplicate {
                debug!(y, "Duplicate question header suppressed");
            } else {
                kept.push(cell);
            }
        }

        kept.into_iter()
            .enumerate()
            .map(|(i, c)| LabeledCell {
                label: (i + 1).to_string(),
                bbox: c.bbox(),
            })
            .collect()
    }
}

/// All contours except the first one minimising `key`.
fn without_min_by(
    contours: &[CellContour],
    key: impl Fn(&CellContour) -> i32,
) -> Vec<&CellContour> {
    let min_index = contours
        .iter()
        .enumerate()
        .min_by_key(|(_, c)| key(c))
        .map(|(i, _)| i);
    contours
        .iter()
        .enumerate()
        .filter(|(i, _)| Some(*i) != min_index)
        .map(|(_, c)| c)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn assigner() -> LabelAssigner {
        LabelAssigner::default()
    }

    fn top_strip() -> Vec<CellContour> {
        // Out of order on purpose; the corner cell sits at x = 3.
        vec![
            CellContour::rectangle(123, 3, 57, 47),
            CellContour::rectangle(3, 3, 57, 47),
            CellContour::rectangle(63, 3, 57, 47),
            CellContour::rectangle(183, 3, 57, 47),
        ]
    }

    fn left_strip() -> Vec<CellContour> {
        vec![
            CellContour::rectangle(3, 3, 57, 47),
            CellContour::rectangle(3, 103, 57, 47),
            CellContour::rectangle(3, 53, 57, 47),
        ]
    }

    #[test]
    fn option_letters_follow_x_order() {
        let labels = assigner().option_labels(&top_strip());
        let names: Vec<_> = labels.iter().map(|c| c.label.as_str()).collect();
        assert_eq!(names, ["A", "B", "C"]);
        assert!(labels.windows(2).all(|w| w[0].bbox.x < w[1].bbox.x));
        assert_eq!(labels[0].bbox.x, 63);
    }

    #[test]
    fn question_numbers_follow_y_order() {
        let labels = assigner().question_labels(&left_strip());
        let names: Vec<_> = labels.iter().map(|c| c.label.as_str()).collect();
        assert_eq!(names, ["1", "2"]);
        assert_eq!(labels[0].bbox.y, 53);
        assert_eq!(labels[1].bbox.y, 103);
    }

    #[test]
    fn near_duplicate_rows_collapse_to_one() {
        let mut strip = left_strip();
        strip.push(CellContour::rectangle(3, 56, 57, 40));
        let labels = assigner().question_labels(&strip);
        assert_eq!(labels.len(), 2);
        assert_eq!(labels[0].bbox.y, 53);
    }

    #[test]
    fn speckles_are_not_questions() {
        let mut strip = left_strip();
        strip.push(CellContour::rectangle(3, 80, 6, 6));
        let labels = assigner().question_labels(&strip);
        assert_eq!(labels.len(), 2);
    }

    #[test]
    fn cells_near_origin_are_cleared() {
        // After dropping the corner, a cell at x = 7 is still too close.
        let strip = vec![
            CellContour::rectangle(1, 3, 5, 47),
            CellContour::rectangle(7, 3, 57, 47),
            CellContour::rectangle(70, 3, 57, 47),
        ];
        let labels = assigner().option_labels(&strip);
        assert_eq!(labels.len(), 1);
        assert_eq!(labels[0].bbox.x, 70);
    }

    #[test]
    fn letters_stop_at_z() {
        let strip: Vec<_> = (0..30)
            .map(|i| CellContour::rectangle(3 + i * 20, 3, 18, 40))
            .collect();
        let labels = assigner().option_labels(&strip);
        assert_eq!(labels.len(), 26);
        assert_eq!(labels[25].label, "Z");
    }

    #[test]
    fn empty_top_strip_is_an_error() {
        let err = assigner().assign(&[], &left_strip()).unwrap_err();
        assert!(matches!(
            err,
            SheetgradeError::Segmentation {
                stage: PipelineStage::Labels,
                ..
            }
        ));
    }

    #[test]
    fn corner_only_left_strip_is_an_error() {
        let corner = [CellContour::rectangle(3, 3, 57, 47)];
        assert!(assigner().assign(&top_strip(), &corner).is_err());
    }

    #[test]
    fn assign_builds_both_axes() {
        let set = assigner().assign(&top_strip(), &left_strip()).unwrap();
        assert_eq!(set.columns.len(), 3);
        assert_eq!(set.rows.len(), 2);
        assert_eq!(set.row("2").unwrap().bbox.y, 103);
        assert_eq!(set.column("C").unwrap().bbox.x, 183);
    }
}
