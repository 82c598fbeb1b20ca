// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Unified error types for sheetgrade.

use thiserror::Error;

use crate::types::PipelineStage;

/// Top-level error type for all grading operations.
#[derive(Debug, Error)]
pub enum SheetgradeError {
    // -- Input errors --
    #[error("failed to decode image: {0}")]
    Input(String),

    // -- Pipeline errors --
    #[error("{stage} failed: {reason}")]
    Geometry {
        stage: PipelineStage,
        reason: String,
    },

    #[error("{stage} failed: {reason}")]
    Segmentation {
        stage: PipelineStage,
        reason: String,
    },

    // -- Output errors --
    #[error("image encoding failed: {0}")]
    Encoding(String),

    // -- Configuration --
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("file I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl SheetgradeError {
    /// Build a geometry failure for `stage`.
    pub fn geometry(stage: PipelineStage, reason: impl Into<String>) -> Self {
        Self::Geometry {
            stage,
            reason: reason.into(),
        }
    }

    /// Build a segmentation failure for `stage`.
    pub fn segmentation(stage: PipelineStage, reason: impl Into<String>) -> Self {
        Self::Segmentation {
            stage,
            reason: reason.into(),
        }
    }

    /// The pipeline stage that produced this error, if any.
    pub fn stage(&self) -> Option<PipelineStage> {
        match self {
            Self::Input(_) => Some(PipelineStage::Decode),
            Self::Geometry { stage, .. } | Self::Segmentation { stage, .. } => Some(*stage),
            _ => None,
        }
    }
}

/// Alias used throughout the codebase.
pub type Result<T> = std::result::Result<T, SheetgradeError>;
