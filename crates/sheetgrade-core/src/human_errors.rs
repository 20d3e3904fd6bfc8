// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Human-readable error messages for the people operating the grader
// (exam staff and graders), not the developers.
//
// Every technical error is mapped to plain English with a clear suggestion.

use crate::error::SheetgradeError;

/// Who has to act for the error to go away.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Severity {
    /// Retake or re-upload the photo.
    Rescan,
    /// Fix the answer key or configuration file.
    FixSetup,
    /// Disk, database or other environment problem.
    Environment,
}

/// A human-readable error with plain English message and actionable suggestion.
#[derive(Debug, Clone)]
pub struct HumanError {
    /// Plain English summary.
    pub message: String,
    /// What the user should try.
    pub suggestion: String,
    pub severity: Severity,
}

/// Convert a `SheetgradeError` into a `HumanError`.
pub fn humanize_error(err: &SheetgradeError) -> HumanError {
    match err {
        SheetgradeError::InvalidImage(detail) => HumanError {
            message: "The answer sheet photo could not be read.".into(),
            suggestion: format!(
                "Upload a JPEG or PNG photo of the whole sheet, taken in even light. ({detail})"
            ),
            severity: Severity::Rescan,
        },

        SheetgradeError::GeometryMismatch { expected, actual } => HumanError {
            message: "The sheet layout does not match the grading setup.".into(),
            suggestion: format!(
                "Check the subject and question counts in the configuration: {expected} answers were expected but {actual} were read."
            ),
            severity: Severity::FixSetup,
        },

        SheetgradeError::InvalidGeometry(detail) => HumanError {
            message: "The sheet layout settings are not usable.".into(),
            suggestion: format!("Review the grid settings in the configuration file. ({detail})"),
            severity: Severity::FixSetup,
        },

        SheetgradeError::AnswerKey(detail) => HumanError {
            message: "The answer key has a problem.".into(),
            suggestion: format!(
                "Make sure every subject lists one letter per question. ({detail})"
            ),
            severity: Severity::FixSetup,
        },

        SheetgradeError::Config(detail) => HumanError {
            message: "The configuration file has an invalid setting.".into(),
            suggestion: detail.clone(),
            severity: Severity::FixSetup,
        },

        SheetgradeError::Serialization(detail) => HumanError {
            message: "A settings file is not valid JSON.".into(),
            suggestion: format!("Fix the file syntax and try again. ({detail})"),
            severity: Severity::FixSetup,
        },

        SheetgradeError::Database(detail) => HumanError {
            message: "The results could not be saved.".into(),
            suggestion: format!(
                "Check that the results folder is writable and not open in another program. ({detail})"
            ),
            severity: Severity::Environment,
        },

        SheetgradeError::Io(detail) => HumanError {
            message: "A file could not be read or written.".into(),
            suggestion: format!("Check the file path and permissions. ({detail})"),
            severity: Severity::Environment,
        },
    }
}
