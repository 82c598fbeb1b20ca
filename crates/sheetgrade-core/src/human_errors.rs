// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Human-readable error messages for teachers submitting answer-sheet photos.
//
// Every technical error is mapped to plain language with a clear suggestion.
// Severity drives how the surrounding service presents the failure.

use crate::error::SheetgradeError;
use crate::types::PipelineStage;

/// Severity of an error from the submitter's perspective.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Severity {
    /// The photo must be retaken (blurred, cropped, skewed too far).
    RetakePhoto,
    /// The submission can never succeed as-is (not an image at all).
    Permanent,
    /// The grading service itself is misconfigured or failed locally.
    Operator,
}

/// A human-readable error with a plain message and an actionable suggestion.
#[derive(Debug, Clone)]
pub struct HumanError {
    /// Plain summary (shown as a heading).
    pub message: String,
    /// What the submitter should try (shown as body text).
    pub suggestion: String,
    /// Severity level.
    pub severity: Severity,
}

/// Convert a `SheetgradeError` into a `HumanError`.
pub fn humanize_error(err: &SheetgradeError) -> HumanError {
    match err {
        SheetgradeError::Input(_) => HumanError {
            message: "We could not open the submitted file.".into(),
            suggestion: "Send a photo in a common image format such as JPEG or PNG.".into(),
            severity: Severity::Permanent,
        },

        SheetgradeError::Geometry { stage, reason } => match stage {
            PipelineStage::Deskew | PipelineStage::TableCorners => HumanError {
                message: "We could not find the answer table in the photo.".into(),
                suggestion: format!(
                    "Place the sheet on a flat, plain surface and make sure all four corners of the table are visible. ({reason})"
                ),
                severity: Severity::RetakePhoto,
            },
            _ => HumanError {
                message: "We could not straighten the answer table.".into(),
                suggestion: format!(
                    "Hold the camera directly above the sheet rather than at an angle. ({reason})"
                ),
                severity: Severity::RetakePhoto,
            },
        },

        SheetgradeError::Segmentation { reason, .. } => HumanError {
            message: "We could not read the rows and columns of the answer table.".into(),
            suggestion: format!(
                "Make sure the question numbers and option letters are visible and the photo is in focus. ({reason})"
            ),
            severity: Severity::RetakePhoto,
        },

        SheetgradeError::InvalidConfig(detail) => HumanError {
            message: "The grading service is misconfigured.".into(),
            suggestion: format!("Ask the administrator to check the grading settings. ({detail})"),
            severity: Severity::Operator,
        },

        SheetgradeError::Encoding(_)
        | SheetgradeError::Io(_)
        | SheetgradeError::Serialization(_) => HumanError {
            message: "The grading service had a problem saving its results.".into(),
            suggestion: "Try again in a moment. If this keeps happening, contact the administrator.".into(),
            severity: Severity::Operator,
        },
    }
}
