// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Grading pipeline: chains the scan stages from raw upload bytes to a scored
// result, one submission at a time.

use chrono::{DateTime, Utc};
use image::{DynamicImage, RgbImage};
use serde::Serialize;
use sheetgrade_core::config::GradeConfig;
use sheetgrade_core::error::{Result, SheetgradeError};
use sheetgrade_core::types::{
    AnswerKey, LabelSet, PipelineStage, Point, ScoringResult, SubmissionId,
};
use tracing::{info, info_span, instrument, warn};

use crate::contour::CellContour;
use crate::image::ImageProcessor;
use crate::scan::{
    AnswerResolver, CellSegmenter, EnhancementSelector, GeometryNormalizer, LabelAssigner,
    MarkDetector,
};

/// A front-facing sheet ready for segmentation.
#[derive(Debug, Clone)]
pub struct CorrectedSheet {
    pub image: DynamicImage,
    /// Whether the enhancement chain ran.
    pub enhanced: bool,
}

/// Marked cells of a sheet together with its header labels.
#[derive(Debug, Clone)]
pub struct SegmentedSheet {
    pub marked: Vec<CellContour>,
    pub labels: LabelSet,
}

impl SegmentedSheet {
    /// Bounding-box centers of the marked cells.
    pub fn centers(&self) -> Vec<Point> {
        self.marked.iter().map(CellContour::center).collect()
    }
}

/// Everything learned while grading one submission.
#[derive(Debug, Clone, Serialize)]
pub struct GradeReport {
    pub submission_id: SubmissionId,
    pub started_at: DateTime<Utc>,
    pub corrected_width: u32,
    pub corrected_height: u32,
    pub enhanced: bool,
    pub labels: LabelSet,
    pub marked_centers: Vec<Point>,
    pub result: ScoringResult,
    /// Corrected sheet with each detected mark outlined in green.
    #[serde(skip)]
    pub annotated: RgbImage,
}

/// Grades photographed answer sheets against an answer key.
///
/// Holds no state between submissions; one grader can serve any number of
/// sheets.
#[derive(Debug, Clone, Default)]
pub struct SheetGrader {
    config: GradeConfig,
    normalizer: GeometryNormalizer,
    selector: EnhancementSelector,
    segmenter: CellSegmenter,
    labeler: LabelAssigner,
    detector: MarkDetector,
    resolver: AnswerResolver,
}

impl SheetGrader {
    /// Build a grader after validating `config`.
    pub fn new(config: GradeConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            normalizer: GeometryNormalizer::new(config.geometry.clone()),
            selector: EnhancementSelector::new(config.enhance.clone())
                .with_table_threshold(config.geometry.table_threshold),
            segmenter: CellSegmenter::new(config.segment.clone())
                .with_smoothing(config.enhance.bilateral()),
            labeler: LabelAssigner::new(config.labels.clone()),
            detector: MarkDetector::new(config.marks.clone()),
            resolver: AnswerResolver,
            config,
        })
    }

    pub fn config(&self) -> &GradeConfig {
        &self.config
    }

    /// Deskew and perspective-correct without enhancement.
    pub fn normalize(&self, image: &DynamicImage) -> Result<DynamicImage> {
        self.normalizer.normalize(image)
    }

    /// Geometry normalization followed by conditional enhancement.
    #[instrument(skip_all)]
    pub fn normalize_and_correct(&self, image: &DynamicImage) -> Result<CorrectedSheet> {
        let normalized = self.normalizer.normalize(image)?;
        let (image, enhanced) = self.selector.maybe_enhance(&normalized);
        Ok(CorrectedSheet { image, enhanced })
    }

    /// Find marked cells and label the header strips of a corrected sheet.
    #[instrument(skip_all)]
    pub fn segment_and_label(&self, corrected: &DynamicImage) -> Result<SegmentedSheet> {
        let segmentation = self.segmenter.segment(corrected);
        if segmentation.header_rows.is_empty() || segmentation.header_columns.is_empty() {
            warn!(
                header_rows = segmentation.header_rows.len(),
                header_columns = segmentation.header_columns.len(),
                "Header strip missing"
            );
            return Err(SheetgradeError::segmentation(
                PipelineStage::Segmentation,
                format!(
                    "found {} top and {} left header cells",
                    segmentation.header_rows.len(),
                    segmentation.header_columns.len()
                ),
            ));
        }

        let labels = self
            .labeler
            .assign(&segmentation.header_rows, &segmentation.header_columns)?;
        let marked = self.detector.detect(corrected, &segmentation.interior);
        Ok(SegmentedSheet { marked, labels })
    }

    /// Score marked cell centers against `key`.
    pub fn score(&self, marked: &[Point], labels: &LabelSet, key: &AnswerKey) -> ScoringResult {
        self.resolver.resolve(marked, labels, key)
    }

    /// Decode, correct, segment, and score one upload.
    pub fn grade(&self, image_bytes: &[u8], key: &AnswerKey) -> Result<ScoringResult> {
        self.grade_report(image_bytes, key).map(|report| report.result)
    }

    /// Like [`grade`](Self::grade), keeping the intermediate results.
    pub fn grade_report(&self, image_bytes: &[u8], key: &AnswerKey) -> Result<GradeReport> {
        let submission_id = SubmissionId::new();
        let span = info_span!("grade", submission = %submission_id);
        let _guard = span.enter();
        let started_at = Utc::now();

        let decoded = ImageProcessor::from_bytes(image_bytes)?.into_dynamic();
        let corrected = self.normalize_and_correct(&decoded)?;
        let sheet = self.segment_and_label(&corrected.image)?;
        let marked_centers = sheet.centers();
        let result = self.score(&marked_centers, &sheet.labels, key);

        let mut annotated = corrected.image.to_rgb8();
        self.detector.annotate(&mut annotated, &sheet.marked);

        info!(
            correct = result.total_correct,
            incorrect = result.total_incorrect,
            enhanced = corrected.enhanced,
            "Submission graded"
        );
        Ok(GradeReport {
            submission_id,
            started_at,
            corrected_width: corrected.image.width(),
            corrected_height: corrected.image.height(),
            enhanced: corrected.enhanced,
            labels: sheet.labels,
            marked_centers,
            result,
            annotated,
        })
    }
}
