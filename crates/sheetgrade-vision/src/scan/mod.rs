// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Answer-sheet scanning stages: geometry normalization, conditional
// enhancement, cell segmentation, label assignment, mark detection, and
// answer resolution.

pub mod enhance;
pub mod geometry;
pub mod labels;
pub mod marks;
pub mod resolve;
pub mod segment;

pub use enhance::{AspectRatioPolicy, EnhancementPolicy, EnhancementSelector, TableMetrics};
pub use geometry::GeometryNormalizer;
pub use labels::LabelAssigner;
pub use marks::MarkDetector;
pub use resolve::AnswerResolver;
pub use segment::{CellSegmenter, Segmentation};

