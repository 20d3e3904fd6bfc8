// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Scoring: compare a decoded answer record against the answer key.

use tracing::{debug, instrument};

use crate::error::{Result, SheetgradeError};
use crate::types::{Answer, AnswerKey, AnswerRecord, GridGeometry, ScoreReport, SubjectScore, letter_index};

/// Score `record` against `key`.
///
/// The record is consumed in subject order, `questions_per_subject` entries at
/// a time. An entry counts as correct only when it is determined and its index
/// equals the key letter's index. Wrong and undetermined answers score zero.
///
/// Fails with [`SheetgradeError::InvalidGeometry`] for an empty grid, with
/// [`SheetgradeError::GeometryMismatch`] when the record length disagrees with
/// `geometry`, and with [`SheetgradeError::AnswerKey`] when the key does not
/// cover every subject and question.
#[instrument(skip_all, fields(answers = record.len()))]
pub fn score_answers(
    record: &AnswerRecord,
    key: &AnswerKey,
    geometry: &GridGeometry,
) -> Result<ScoreReport> {
    geometry.validate()?;

    let expected = geometry.total_questions();
    if record.len() != expected {
        return Err(SheetgradeError::GeometryMismatch {
            expected,
            actual: record.len(),
        });
    }
    if key.subjects().len() != geometry.subject_count {
        return Err(SheetgradeError::AnswerKey(format!(
            "key has {} subjects but the sheet has {}",
            key.subjects().len(),
            geometry.subject_count
        )));
    }

    let per_subject = geometry.questions_per_subject;
    let mut scores = Vec::with_capacity(geometry.subject_count);

    for (subject, answers) in key
        .subjects()
        .iter()
        .zip(record.answers().chunks_exact(per_subject))
    {
        if subject.letters.len() != per_subject {
            return Err(SheetgradeError::AnswerKey(format!(
                "subject {:?} has {} answers, expected {}",
                subject.name,
                subject.letters.len(),
                per_subject
            )));
        }

        let correct = answers
            .iter()
            .zip(&subject.letters)
            .filter(|(answer, letter)| match answer {
                Answer::Determined(index) => letter_index(**letter) == Some(*index),
                Answer::Undetermined => false,
            })
            .count() as u32;

        debug!(subject = %subject.name, correct, "subject scored");
        scores.push(SubjectScore {
            subject: subject.name.clone(),
            correct,
        });
    }

    Ok(ScoreReport::from_counts(scores))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::SubjectKey;

    fn key(subjects: &[(&str, &str)]) -> AnswerKey {
        AnswerKey::new(
            subjects
                .iter()
                .map(|(name, letters)| SubjectKey {
                    name: name.to_string(),
                    letters: letters.chars().collect(),
                })
                .collect(),
        )
    }

    #[test]
    fn undetermined_never_matches() {
        let geometry = GridGeometry::new(1, 3, 4).unwrap();
        let record = AnswerRecord::from(vec![Some(0), None, Some(2)]);
        let report = score_answers(&record, &key(&[("Python", "abc")]), &geometry).unwrap();
        assert_eq!(report.get("Python"), Some(2));
        assert_eq!(report.total(), 2);
    }

    #[test]
    fn subjects_consume_consecutive_slices() {
        let geometry = GridGeometry::new(2, 2, 4).unwrap();
        // Python: a b (both right); EDA: d c vs key c c (one right).
        let record = AnswerRecord::from(vec![Some(0), Some(1), Some(3), Some(2)]);
        let report =
            score_answers(&record, &key(&[("Python", "ab"), ("EDA", "cc")]), &geometry).unwrap();
        assert_eq!(report.get("Python"), Some(2));
        assert_eq!(report.get("EDA"), Some(1));
        assert_eq!(report.total(), 3);
    }

    #[test]
    fn key_letters_are_case_insensitive() {
        let geometry = GridGeometry::new(1, 2, 4).unwrap();
        let record = AnswerRecord::from(vec![Some(3), Some(1)]);
        let report = score_answers(&record, &key(&[("Stats", "DB")]), &geometry).unwrap();
        assert_eq!(report.total(), 2);
    }

    #[test]
    fn wrong_length_is_geometry_mismatch() {
        let geometry = GridGeometry::new(1, 3, 4).unwrap();
        let record = AnswerRecord::from(vec![Some(0), Some(1)]);
        let err = score_answers(&record, &key(&[("Python", "abc")]), &geometry).unwrap_err();
        assert!(matches!(
            err,
            SheetgradeError::GeometryMismatch { expected: 3, actual: 2 }
        ));
    }

    #[test]
    fn short_key_is_rejected_not_zeroed() {
        let geometry = GridGeometry::new(1, 3, 4).unwrap();
        let record = AnswerRecord::from(vec![Some(0), Some(1), Some(2)]);
        let err = score_answers(&record, &key(&[("Python", "ab")]), &geometry).unwrap_err();
        assert!(matches!(err, SheetgradeError::AnswerKey(_)));
    }

    #[test]
    fn empty_subjects_are_invalid_geometry() {
        let geometry = GridGeometry {
            subject_count: 1,
            questions_per_subject: 0,
            options_per_question: 4,
        };
        let err = score_answers(&AnswerRecord::new(vec![]), &key(&[("Python", "")]), &geometry)
            .unwrap_err();
        assert!(matches!(err, SheetgradeError::InvalidGeometry(_)));
    }

    #[test]
    fn total_equals_sum_for_mixed_records() {
        let geometry = GridGeometry::new(3, 4, 4).unwrap();
        let k = key(&[("A", "abcd"), ("B", "dcba"), ("C", "aaaa")]);
        let raw: Vec<Option<usize>> = (0..12)
            .map(|i| if i % 5 == 0 { None } else { Some(i % 4) })
            .collect();
        let report = score_answers(&AnswerRecord::from(raw), &k, &geometry).unwrap();
        let sum: u32 = report.subjects().iter().map(|s| s.correct).sum();
        assert_eq!(report.total(), sum);
    }
}
