// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Answer resolution: maps marked cell centers onto (question, option) pairs by
// header containment and scores them against an answer key.

use std::collections::BTreeSet;

use sheetgrade_core::types::{AnswerKey, AnswerRecord, LabelSet, Point, ScoringResult};
use tracing::{debug, instrument};

/// Resolves marked cells to answers and scores them.
///
/// Records come out in row-major label order: by question number first, then
/// by option letter. A cell that overlaps several headers contributes one
/// record per distinct (question, option) pair.
#[derive(Debug, Clone, Copy, Default)]
pub struct AnswerResolver;

impl AnswerResolver {
    /// Every (row index, column index) pair whose header spans contain a
    /// marked center, de-duplicated and in row-major order.
    pub fn locate(&self, marked: &[Point], labels: &LabelSet) -> BTreeSet<(usize, usize)> {
        let mut pairs = BTreeSet::new();
        for point in marked {
            for (ri, row) in labels.rows.iter().enumerate() {
                if !row.bbox.contains_y(point.y) {
                    continue;
                }
                for (ci, col) in labels.columns.iter().enumerate() {
                    if col.bbox.contains_x(point.x) {
                        pairs.insert((ri, ci));
                    }
                }
            }
        }
        pairs
    }

    #[instrument(skip_all, fields(marked = marked.len(), key = key.len()))]
    pub fn resolve(&self, marked: &[Point], labels: &LabelSet, key: &AnswerKey) -> ScoringResult {
        let mut result = ScoringResult::default();

        for (ri, ci) in self.locate(marked, labels) {
            let question = &labels.rows[ri].label;
            let answer = &labels.columns[ci].label;
            match key.lookup(question) {
                Some(correct) => {
                    if correct == answer.as_str() {
                        result.total_correct += 1;
                    } else {
                        result.total_incorrect += 1;
                    }
                    result.answers.push(AnswerRecord {
                        question: question.clone(),
                        answer: answer.clone(),
                        correct_answer: correct.to_string(),
                    });
                }
                None => {
                    result.total_incorrect += 1;
                    result.answers.push(AnswerRecord {
                        question: question.clone(),
                        answer: String::new(),
                        correct_answer: String::new(),
                    });
                }
            }
        }

        debug!(
            correct = result.total_correct,
            incorrect = result.total_incorrect,
            "Answers scored"
        );
        result
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use sheetgrade_core::types::{AnswerKeyEntry, BoundingBox, LabeledCell};

    /// Two questions (rows spanning y 50..=90 and 100..=140) and options A/B
    /// (columns spanning x 60..=110 and 120..=170).
    fn labels() -> LabelSet {
        let cell = |label: &str, x, y| LabeledCell {
            label: label.to_string(),
            bbox: BoundingBox::new(x, y, 50, 40),
        };
        LabelSet {
            rows: vec![cell("1", 0, 50), cell("2", 0, 100)],
            columns: vec![cell("A", 60, 0), cell("B", 120, 0)],
        }
    }

    fn key() -> AnswerKey {
        AnswerKey::new(vec![AnswerKeyEntry::new("1", "A"), AnswerKeyEntry::new("2", "B")])
    }

    #[test]
    fn wrong_choice_is_counted_incorrect() {
        let key = AnswerKey::new(vec![AnswerKeyEntry::new("1", "A")]);
        let result = AnswerResolver.resolve(&[Point::new(145, 70)], &labels(), &key);
        assert_eq!(
            result.answers,
            vec![AnswerRecord {
                question: "1".into(),
                answer: "B".into(),
                correct_answer: "A".into(),
            }]
        );
        assert_eq!(result.total_correct, 0);
        assert_eq!(result.total_incorrect, 1);
    }

    #[test]
    fn right_choices_are_counted_correct() {
        let marks = [Point::new(85, 70), Point::new(145, 120)];
        let result = AnswerResolver.resolve(&marks, &labels(), &key());
        assert_eq!(result.total_correct, 2);
        assert_eq!(result.total_incorrect, 0);
    }

    #[test]
    fn question_missing_from_key_has_blank_record() {
        let key = AnswerKey::new(vec![AnswerKeyEntry::new("1", "A")]);
        let result = AnswerResolver.resolve(&[Point::new(85, 120)], &labels(), &key);
        assert_eq!(result.answers.len(), 1);
        assert_eq!(result.answers[0].question, "2");
        assert_eq!(result.answers[0].answer, "");
        assert_eq!(result.answers[0].correct_answer, "");
        assert_eq!(result.total_incorrect, 1);
    }

    #[test]
    fn mark_outside_every_header_is_ignored() {
        let result = AnswerResolver.resolve(&[Point::new(300, 300)], &labels(), &key());
        assert!(result.answers.is_empty());
        assert_eq!(result, ScoringResult::default());
    }

    #[test]
    fn duplicate_marks_collapse() {
        let marks = [Point::new(85, 70), Point::new(86, 71)];
        let result = AnswerResolver.resolve(&marks, &labels(), &key());
        assert_eq!(result.answers.len(), 1);
    }

    #[test]
    fn header_edges_are_inclusive() {
        // y = 90 is row 1's bottom edge; x = 110 is column A's right edge.
        let result = AnswerResolver.resolve(&[Point::new(110, 90)], &labels(), &key());
        assert_eq!(result.answers.len(), 1);
        assert_eq!(result.answers[0].answer, "A");

        // Overlapping column headers both claim x = 110.
        let mut overlapping = labels();
        overlapping.columns[1].bbox = BoundingBox::new(110, 0, 50, 40);
        let result = AnswerResolver.resolve(&[Point::new(110, 70)], &overlapping, &key());
        let answers: Vec<_> = result.answers.iter().map(|r| r.answer.as_str()).collect();
        assert_eq!(answers, ["A", "B"]);
    }

    #[test]
    fn records_are_row_major() {
        let marks = [Point::new(145, 120), Point::new(85, 120), Point::new(85, 70)];
        let result = AnswerResolver.resolve(&marks, &labels(), &key());
        let pairs: Vec<_> = result
            .answers
            .iter()
            .map(|r| (r.question.as_str(), r.answer.as_str()))
            .collect();
        assert_eq!(pairs, [("1", "A"), ("2", "A"), ("2", "B")]);
    }

    #[test]
    fn totals_match_record_count() {
        let marks = [Point::new(85, 70), Point::new(145, 70), Point::new(85, 120)];
        let result = AnswerResolver.resolve(&marks, &labels(), &key());
        assert_eq!(
            (result.total_correct + result.total_incorrect) as usize,
            result.answers.len()
        );
    }
}
