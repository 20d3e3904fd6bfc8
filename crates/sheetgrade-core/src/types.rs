// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Core domain types for Sheetgrade: grid geometry, decoded answers, answer
// keys and score reports.

use std::collections::BTreeMap;
use std::fmt;
use std::path::Path;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::{Result, SheetgradeError};

/// Unique identifier for one evaluation run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct EvaluationId(pub Uuid);

impl EvaluationId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for EvaluationId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for EvaluationId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

// ---------------------------------------------------------------------------
// Grid geometry
// ---------------------------------------------------------------------------

/// Fixed layout of the bubble grid printed on the sheet.
///
/// Subjects are stacked as horizontal bands, each band holds
/// `questions_per_subject` rows and each row holds `options_per_question`
/// bubbles side by side.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct GridGeometry {
    pub subject_count: usize,
    pub questions_per_subject: usize,
    pub options_per_question: usize,
}

impl GridGeometry {
    pub fn new(
        subject_count: usize,
        questions_per_subject: usize,
        options_per_question: usize,
    ) -> Result<Self> {
        let geometry = Self {
            subject_count,
            questions_per_subject,
            options_per_question,
        };
        geometry.validate()?;
        Ok(geometry)
    }

    /// Reject layouts with an empty dimension or more options than letters.
    pub fn validate(&self) -> Result<()> {
        if self.subject_count == 0 || self.questions_per_subject == 0 {
            return Err(SheetgradeError::InvalidGeometry(format!(
                "grid needs at least one subject and one question (got {} x {})",
                self.subject_count, self.questions_per_subject
            )));
        }
        if self.options_per_question == 0 || self.options_per_question > 26 {
            return Err(SheetgradeError::InvalidGeometry(format!(
                "options per question must be within 1..=26 (got {})",
                self.options_per_question
            )));
        }
        Ok(())
    }

    /// Total number of questions on the sheet.
    pub fn total_questions(&self) -> usize {
        self.subject_count * self.questions_per_subject
    }
}

impl Default for GridGeometry {
    /// Five subjects of twenty four-option questions.
    fn default() -> Self {
        Self {
            subject_count: 5,
            questions_per_subject: 20,
            options_per_question: 4,
        }
    }
}

/// How grid partitioning treats pixels left over by integer division.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RemainderPolicy {
    /// Equal cells of `extent / n` pixels; trailing rows/columns are ignored.
    #[default]
    Drop,
    /// Boundaries at `floor(i * extent / n)`; every pixel belongs to one cell.
    Distribute,
    /// Refuse to decode unless the extent divides evenly.
    Exact,
}

// ---------------------------------------------------------------------------
// Decoded answers
// ---------------------------------------------------------------------------

/// Outcome of decoding a single question.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Answer {
    /// The option at this zero-based index was clearly marked.
    Determined(usize),
    /// Blank, or two marks too close in strength to tell apart.
    Undetermined,
}

impl Answer {
    pub fn index(&self) -> Option<usize> {
        match self {
            Self::Determined(index) => Some(*index),
            Self::Undetermined => None,
        }
    }

    pub fn is_determined(&self) -> bool {
        matches!(self, Self::Determined(_))
    }

    /// Option letter ('a' for index 0), if determined.
    pub fn letter(&self) -> Option<char> {
        self.index()
            .and_then(|index| u8::try_from(index).ok())
            .filter(|index| *index < 26)
            .map(|index| (b'a' + index) as char)
    }
}

impl fmt::Display for Answer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.letter() {
            Some(letter) => write!(f, "{letter}"),
            None => f.write_str("-"),
        }
    }
}

/// Decoded answers in subject order, then question order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AnswerRecord(pub Vec<Answer>);

impl AnswerRecord {
    pub fn new(answers: Vec<Answer>) -> Self {
        Self(answers)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn answers(&self) -> &[Answer] {
        &self.0
    }

    pub fn undetermined_count(&self) -> usize {
        self.0.iter().filter(|a| !a.is_determined()).count()
    }
}

impl From<Vec<Option<usize>>> for AnswerRecord {
    fn from(raw: Vec<Option<usize>>) -> Self {
        Self(
            raw.into_iter()
                .map(|entry| entry.map_or(Answer::Undetermined, Answer::Determined))
                .collect(),
        )
    }
}

// ---------------------------------------------------------------------------
// Answer key
// ---------------------------------------------------------------------------

/// Map an option letter to its zero-based index ('a' = 0). Case-insensitive.
pub fn letter_index(letter: char) -> Option<usize> {
    let lower = letter.to_ascii_lowercase();
    lower
        .is_ascii_lowercase()
        .then(|| (lower as u8 - b'a') as usize)
}

/// Correct letters for one subject.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubjectKey {
    pub name: String,
    pub letters: Vec<char>,
}

/// Correct answers for every subject, in sheet order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AnswerKey {
    subjects: Vec<SubjectKey>,
}

/// A subject's entry in the key file: `["a", "b"]` or `"ab"`.
#[derive(Deserialize)]
#[serde(untagged)]
enum KeyEntry {
    Letters(Vec<char>),
    Compact(String),
}

impl KeyEntry {
    fn into_letters(self) -> Vec<char> {
        match self {
            Self::Letters(letters) => letters,
            Self::Compact(text) => text.chars().filter(|c| !c.is_whitespace()).collect(),
        }
    }
}

impl AnswerKey {
    pub fn new(subjects: Vec<SubjectKey>) -> Self {
        Self { subjects }
    }

    /// Parse a JSON object of `subject -> letters`.
    ///
    /// JSON object order carries no meaning, so `subject_order` fixes the
    /// order in which subjects appear on the sheet. When it is empty the
    /// subjects are taken in lexicographic order.
    pub fn from_json_str(json: &str, subject_order: &[String]) -> Result<Self> {
        let mut raw: BTreeMap<String, KeyEntry> = serde_json::from_str(json)?;

        let names: Vec<String> = if subject_order.is_empty() {
            raw.keys().cloned().collect()
        } else {
            subject_order.to_vec()
        };

        let mut subjects = Vec::with_capacity(names.len());
        for name in names {
            let entry = raw.remove(&name).ok_or_else(|| {
                SheetgradeError::AnswerKey(format!("subject {name:?} missing from answer key"))
            })?;
            subjects.push(SubjectKey {
                name,
                letters: entry.into_letters(),
            });
        }

        if !raw.is_empty() {
            tracing::warn!(
                ignored = ?raw.keys().collect::<Vec<_>>(),
                "answer key contains subjects outside the configured order"
            );
        }

        Ok(Self { subjects })
    }

    /// Read and parse a JSON answer key file.
    pub fn from_json_file(path: impl AsRef<Path>, subject_order: &[String]) -> Result<Self> {
        let text = std::fs::read_to_string(path.as_ref())?;
        Self::from_json_str(&text, subject_order)
    }

    pub fn subjects(&self) -> &[SubjectKey] {
        &self.subjects
    }

    pub fn subject_names(&self) -> impl Iterator<Item = &str> {
        self.subjects.iter().map(|s| s.name.as_str())
    }

    /// Check the key covers `geometry` exactly and every letter is a valid option.
    pub fn validate(&self, geometry: &GridGeometry) -> Result<()> {
        if self.subjects.len() != geometry.subject_count {
            return Err(SheetgradeError::AnswerKey(format!(
                "key has {} subjects but the sheet has {}",
                self.subjects.len(),
                geometry.subject_count
            )));
        }
        for subject in &self.subjects {
            if subject.letters.len() != geometry.questions_per_subject {
                return Err(SheetgradeError::AnswerKey(format!(
                    "subject {:?} has {} answers, expected {}",
                    subject.name,
                    subject.letters.len(),
                    geometry.questions_per_subject
                )));
            }
            for (question, letter) in subject.letters.iter().enumerate() {
                match letter_index(*letter) {
                    Some(index) if index < geometry.options_per_question => {}
                    _ => {
                        return Err(SheetgradeError::AnswerKey(format!(
                            "subject {:?} question {} has invalid letter {letter:?}",
                            subject.name,
                            question + 1
                        )));
                    }
                }
            }
        }
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Score report
// ---------------------------------------------------------------------------

/// Correct-answer count for a single subject.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubjectScore {
    pub subject: String,
    pub correct: u32,
}

/// Per-subject correct counts plus their sum.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScoreReport {
    subjects: Vec<SubjectScore>,
    total: u32,
}

impl ScoreReport {
    /// Build a report; the total is always the sum of the subject counts.
    pub fn from_counts(subjects: Vec<SubjectScore>) -> Self {
        let total = subjects.iter().map(|s| s.correct).sum();
        Self { subjects, total }
    }

    pub fn subjects(&self) -> &[SubjectScore] {
        &self.subjects
    }

    pub fn get(&self, subject: &str) -> Option<u32> {
        self.subjects
            .iter()
            .find(|s| s.subject == subject)
            .map(|s| s.correct)
    }

    pub fn total(&self) -> u32 {
        self.total
    }

    /// Total as a percentage of `total_questions`.
    pub fn percentage(&self, total_questions: usize) -> f64 {
        if total_questions == 0 {
            return 0.0;
        }
        f64::from(self.total) * 100.0 / total_questions as f64
    }
}

impl fmt::Display for ScoreReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for s in &self.subjects {
            write!(f, "{}: {}, ", s.subject, s.correct)?;
        }
        write!(f, "Total: {}", self.total)
    }
}

/// A score report tied to the student and sheet it came from, ready for
/// persistence.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScoredSheet {
    pub id: EvaluationId,
    pub student: String,
    /// SHA-256 hash of the uploaded image bytes.
    pub sheet_hash: String,
    pub report: ScoreReport,
    pub evaluated_at: DateTime<Utc>,
}

impl ScoredSheet {
    pub fn new(student: String, sheet_hash: String, report: ScoreReport) -> Self {
        Self {
            id: EvaluationId::new(),
            student,
            sheet_hash,
            report,
            evaluated_at: Utc::now(),
        }
    }
}
