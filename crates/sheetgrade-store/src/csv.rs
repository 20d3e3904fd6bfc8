// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Flat results file: one CSV line per graded sheet.

use std::fs::OpenOptions;
use std::io::Write;
use std::path::{Path, PathBuf};

use sheetgrade_core::error::SheetgradeError;
use sheetgrade_core::types::ScoredSheet;
use tracing::{debug, instrument};

/// Append-only CSV of `Student,<subjects...>,Total`.
///
/// The header is written when the file is created or found empty. Rows are
/// appended as-is; a later sheet with a different subject list is not
/// reconciled against an existing header.
#[derive(Debug, Clone)]
pub struct ResultsCsv {
    path: PathBuf,
}

impl ResultsCsv {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    #[instrument(skip_all, fields(path = %self.path.display(), student = %sheet.student))]
    pub fn append(&self, sheet: &ScoredSheet) -> Result<(), SheetgradeError> {
        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)?;

        let mut out = String::new();
        if file.metadata()?.len() == 0 {
            let header: Vec<&str> = std::iter::once("Student")
                .chain(sheet.report.subjects().iter().map(|s| s.subject.as_str()))
                .chain(std::iter::once("Total"))
                .collect();
            out.push_str(&join_record(&header));
            out.push('\n');
            debug!("csv header written");
        }

        let mut fields = vec![sheet.student.clone()];
        fields.extend(sheet.report.subjects().iter().map(|s| s.correct.to_string()));
        fields.push(sheet.report.total().to_string());
        out.push_str(&join_record(&fields));
        out.push('\n');

        file.write_all(out.as_bytes())?;
        Ok(())
    }
}

fn join_record<S: AsRef<str>>(fields: &[S]) -> String {
    fields
        .iter()
        .map(|f| escape_field(f.as_ref()))
        .collect::<Vec<_>>()
        .join(",")
}

/// Quote a field containing a comma, quote or line break, doubling quotes.
fn escape_field(field: &str) -> String {
    if field.contains([',', '"', '\n', '\r']) {
        format!("\"{}\"", field.replace('"', "\"\""))
    } else {
        field.to_owned()
    }
}
