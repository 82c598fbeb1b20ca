// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Core domain types for the sheetgrade answer-sheet grader.

use serde::{Deserialize, Deserializer, Serialize};
use uuid::Uuid;

use crate::error::SheetgradeError;

/// Unique identifier for one grading invocation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SubmissionId(pub Uuid);

impl SubmissionId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for SubmissionId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for SubmissionId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Stages of the grading pipeline, in execution order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum PipelineStage {
    Decode,
    Deskew,
    TableCorners,
    Perspective,
    Segmentation,
    Labels,
}

impl std::fmt::Display for PipelineStage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Self::Decode => "image decoding",
            Self::Deskew => "deskew",
            Self::TableCorners => "table corner detection",
            Self::Perspective => "perspective correction",
            Self::Segmentation => "cell segmentation",
            Self::Labels => "label assignment",
        };
        f.write_str(name)
    }
}

// -- Geometry -----------------------------------------------------------------

/// A pixel position in image coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Point {
    pub x: i32,
    pub y: i32,
}

impl Point {
    pub const fn new(x: i32, y: i32) -> Self {
        Self { x, y }
    }
}

/// Axis-aligned bounding box of a contour, `(x, y, width, height)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct BoundingBox {
    pub x: i32,
    pub y: i32,
    pub width: u32,
    pub height: u32,
}

impl BoundingBox {
    pub const fn new(x: i32, y: i32, width: u32, height: u32) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    /// Smallest box enclosing every point (inclusive pixel extents).
    ///
    /// Returns `None` for an empty point set.
    pub fn enclosing(points: impl IntoIterator<Item = Point>) -> Option<Self> {
        let mut iter = points.into_iter();
        let first = iter.next()?;
        let (mut min_x, mut min_y, mut max_x, mut max_y) = (first.x, first.y, first.x, first.y);
        for p in iter {
            min_x = min_x.min(p.x);
            min_y = min_y.min(p.y);
            max_x = max_x.max(p.x);
            max_y = max_y.max(p.y);
        }
        Some(Self {
            x: min_x,
            y: min_y,
            width: (max_x - min_x + 1) as u32,
            height: (max_y - min_y + 1) as u32,
        })
    }

    /// Integer center, rounding toward the origin.
    pub fn center(&self) -> Point {
        Point::new(
            self.x + (self.width / 2) as i32,
            self.y + (self.height / 2) as i32,
        )
    }

    /// Whether `x` lies within `[x, x + width]`.
    pub fn contains_x(&self, x: i32) -> bool {
        self.x <= x && x <= self.x + self.width as i32
    }

    /// Whether `y` lies within `[y, y + height]`.
    pub fn contains_y(&self, y: i32) -> bool {
        self.y <= y && y <= self.y + self.height as i32
    }

    pub fn area(&self) -> u64 {
        self.width as u64 * self.height as u64
    }

    /// Width divided by height, or `None` for a zero-height box.
    pub fn aspect_ratio(&self) -> Option<f32> {
        (self.height > 0).then(|| self.width as f32 / self.height as f32)
    }
}

/// Four corners of a detected table, ordered by angle around their centroid.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Quadrilateral {
    pub corners: [(f32, f32); 4],
}

impl Quadrilateral {
    /// Order `points` by their angle around the centroid and keep the first
    /// four.
    ///
    /// Fails with a geometry error when fewer than four points are supplied.
    pub fn from_points(points: &[(f32, f32)]) -> Result<Self, SheetgradeError> {
        let ordered = order_by_angle(points);
        if ordered.len() < 4 {
            return Err(SheetgradeError::geometry(
                PipelineStage::TableCorners,
                format!("need at least 4 corner points, found {}", ordered.len()),
            ));
        }
        Ok(Self {
            corners: [ordered[0], ordered[1], ordered[2], ordered[3]],
        })
    }

    /// Longer of the two edges 0–1 and 2–3.
    pub fn width(&self) -> f32 {
        let c = &self.corners;
        distance(c[0], c[1]).max(distance(c[2], c[3]))
    }

    /// Longer of the two edges 0–3 and 1–2.
    pub fn height(&self) -> f32 {
        let c = &self.corners;
        distance(c[0], c[3]).max(distance(c[1], c[2]))
    }

    /// Axis-aligned target rectangle `[(0,0), (w-1,0), (w-1,h-1), (0,h-1)]`.
    pub fn destination(&self) -> [(f32, f32); 4] {
        let (w, h) = (self.width(), self.height());
        [(0.0, 0.0), (w - 1.0, 0.0), (w - 1.0, h - 1.0), (0.0, h - 1.0)]
    }
}

/// Sort points by ascending `atan2` angle around their centroid.
///
/// The result does not depend on the order in which points are supplied.
pub fn order_by_angle(points: &[(f32, f32)]) -> Vec<(f32, f32)> {
    if points.is_empty() {
        return Vec::new();
    }
    let n = points.len() as f32;
    let cx = points.iter().map(|p| p.0).sum::<f32>() / n;
    let cy = points.iter().map(|p| p.1).sum::<f32>() / n;

    let mut with_angles: Vec<(f32, (f32, f32))> = points
        .iter()
        .map(|&p| ((p.1 - cy).atan2(p.0 - cx), p))
        .collect();
    with_angles.sort_by(|a, b| a.0.total_cmp(&b.0));
    with_angles.into_iter().map(|(_, p)| p).collect()
}

fn distance(a: (f32, f32), b: (f32, f32)) -> f32 {
    (a.0 - b.0).hypot(a.1 - b.1)
}

// -- Labels -------------------------------------------------------------------

/// A header cell with its assigned label.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LabeledCell {
    pub label: String,
    pub bbox: BoundingBox,
}

/// Row (question) and column (option) labels of one answer sheet.
///
/// `rows` are sorted by ascending y and labelled "1", "2", ...; `columns` are
/// sorted by ascending x and labelled "A", "B", ...
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LabelSet {
    pub rows: Vec<LabeledCell>,
    pub columns: Vec<LabeledCell>,
}

impl LabelSet {
    pub fn row(&self, label: &str) -> Option<&LabeledCell> {
        self.rows.iter().find(|c| c.label == label)
    }

    pub fn column(&self, label: &str) -> Option<&LabeledCell> {
        self.columns.iter().find(|c| c.label == label)
    }
}

// -- Answer key ---------------------------------------------------------------

/// One question of an answer key.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AnswerKeyEntry {
    /// Row label; accepts a JSON string or integer.
    #[serde(deserialize_with = "string_or_integer")]
    pub question: String,
    pub correct_answer: String,
}

impl AnswerKeyEntry {
    pub fn new(question: impl Into<String>, correct_answer: impl Into<String>) -> Self {
        Self {
            question: question.into(),
            correct_answer: correct_answer.into(),
        }
    }
}

/// Caller-supplied answer key, kept in the caller's order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AnswerKey {
    pub entries: Vec<AnswerKeyEntry>,
}

impl AnswerKey {
    pub fn new(entries: Vec<AnswerKeyEntry>) -> Self {
        Self { entries }
    }

    /// Correct option for `question`; the first matching entry wins.
    pub fn lookup(&self, question: &str) -> Option<&str> {
        self.entries
            .iter()
            .find(|e| e.question == question)
            .map(|e| e.correct_answer.as_str())
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl FromIterator<AnswerKeyEntry> for AnswerKey {
    fn from_iter<I: IntoIterator<Item = AnswerKeyEntry>>(iter: I) -> Self {
        Self::new(iter.into_iter().collect())
    }
}

fn string_or_integer<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Label {
        Text(String),
        Number(i64),
    }

    Ok(match Label::deserialize(deserializer)? {
        Label::Text(s) => s,
        Label::Number(n) => n.to_string(),
    })
}

// -- Scoring ------------------------------------------------------------------

/// One graded (question, chosen option) pair.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AnswerRecord {
    pub question: String,
    pub answer: String,
    #[serde(rename = "correct-answer")]
    pub correct_answer: String,
}

/// Result of grading one sheet against an answer key.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScoringResult {
    #[serde(rename = "answer")]
    pub answers: Vec<AnswerRecord>,
    #[serde(rename = "total-correct-answers")]
    pub total_correct: u32,
    #[serde(rename = "total-incorrect-answers")]
    pub total_incorrect: u32,
}

/// `{"error": "..."}` body returned to callers when grading fails.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
}

impl From<&SheetgradeError> for ErrorResponse {
    fn from(err: &SheetgradeError) -> Self {
        Self {
            error: format!("could not process the submitted image: {err}"),
        }
    }
}
