// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Results database: append-only SQLite table of graded sheets, one row per
// subject plus a `Total` row per evaluation.
//
// Schema:
//   results(
//     id             INTEGER PRIMARY KEY AUTOINCREMENT,
//     evaluation_id  TEXT    NOT NULL,   -- UUID shared by all rows of one sheet
//     evaluated_at   TEXT    NOT NULL,   -- RFC 3339
//     student        TEXT    NOT NULL,
//     sheet_sha256   TEXT    NOT NULL,   -- SHA-256 hex of the image bytes
//     subject        TEXT    NOT NULL,   -- subject name, or "Total"
//     correct        INTEGER NOT NULL
//   )

use std::path::Path;

use chrono::{DateTime, Utc};
use rusqlite::{Connection, params};
use serde::{Deserialize, Serialize};
use sheetgrade_core::error::SheetgradeError;
use sheetgrade_core::types::{ScoredSheet, SubjectScore};
use tracing::{debug, instrument};

/// Subject label of the per-evaluation sum row.
pub const TOTAL_SUBJECT: &str = "Total";

const SCHEMA: &str = "CREATE TABLE IF NOT EXISTS results (
    id             INTEGER PRIMARY KEY AUTOINCREMENT,
    evaluation_id  TEXT    NOT NULL,
    evaluated_at   TEXT    NOT NULL,
    student        TEXT    NOT NULL,
    sheet_sha256   TEXT    NOT NULL,
    subject        TEXT    NOT NULL,
    correct        INTEGER NOT NULL
);
CREATE INDEX IF NOT EXISTS results_evaluation ON results (evaluation_id);";

fn db_err(e: rusqlite::Error) -> SheetgradeError {
    SheetgradeError::Database(e.to_string())
}

/// One stored evaluation, reassembled from its rows.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResultEntry {
    pub evaluation_id: String,
    pub evaluated_at: DateTime<Utc>,
    pub student: String,
    pub sheet_sha256: String,
    /// Per-subject counts in sheet order.
    pub subjects: Vec<SubjectScore>,
    pub total: u32,
}

/// Append-only results store backed by SQLite.
pub struct ResultsDb {
    conn: Connection,
}

impl ResultsDb {
    /// Open (or create) the results database at `path` in WAL mode.
    #[instrument(skip_all, fields(path = %path.as_ref().display()))]
    pub fn open(path: impl AsRef<Path>) -> Result<Self, SheetgradeError> {
        let conn = Connection::open(path).map_err(db_err)?;
        conn.execute_batch("PRAGMA journal_mode = WAL;")
            .map_err(db_err)?;
        conn.execute_batch(SCHEMA).map_err(db_err)?;

        debug!("results database opened");
        Ok(Self { conn })
    }

    /// In-memory database for tests.
    pub fn open_in_memory() -> Result<Self, SheetgradeError> {
        let conn = Connection::open_in_memory().map_err(db_err)?;
        conn.execute_batch(SCHEMA).map_err(db_err)?;
        Ok(Self { conn })
    }

    /// Store one graded sheet atomically.
    #[instrument(skip_all, fields(student = %sheet.student, id = %sheet.id))]
    pub fn record(&mut self, sheet: &ScoredSheet) -> Result<(), SheetgradeError> {
        let evaluation_id = sheet.id.to_string();
        let evaluated_at = sheet.evaluated_at.to_rfc3339();

        let tx = self.conn.transaction().map_err(db_err)?;
        {
            let mut insert = tx
                .prepare(
                    "INSERT INTO results
                        (evaluation_id, evaluated_at, student, sheet_sha256, subject, correct)
                     VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
                )
                .map_err(db_err)?;

            let rows = sheet
                .report
                .subjects()
                .iter()
                .map(|s| (s.subject.as_str(), s.correct))
                .chain(std::iter::once((TOTAL_SUBJECT, sheet.report.total())));
            for (subject, correct) in rows {
                insert
                    .execute(params![
                        evaluation_id,
                        evaluated_at,
                        sheet.student,
                        sheet.sheet_hash,
                        subject,
                        correct
                    ])
                    .map_err(db_err)?;
            }
        }
        tx.commit().map_err(db_err)?;

        debug!("result recorded");
        Ok(())
    }

    /// The most recent `limit` evaluations, newest first.
    pub fn recent(&self, limit: u32) -> Result<Vec<ResultEntry>, SheetgradeError> {
        let mut ids_stmt = self
            .conn
            .prepare(
                "SELECT evaluation_id FROM results
                 GROUP BY evaluation_id
                 ORDER BY MAX(id) DESC
                 LIMIT ?1",
            )
            .map_err(db_err)?;
        let ids = ids_stmt
            .query_map(params![limit], |row| row.get::<_, String>(0))
            .map_err(db_err)?
            .collect::<Result<Vec<_>, _>>()
            .map_err(db_err)?;

        ids.iter().map(|id| self.load(id)).collect()
    }

    /// Number of stored evaluations.
    pub fn count(&self) -> Result<u64, SheetgradeError> {
        self.conn
            .query_row(
                "SELECT COUNT(DISTINCT evaluation_id) FROM results",
                [],
                |row| row.get(0),
            )
            .map_err(db_err)
    }

    fn load(&self, evaluation_id: &str) -> Result<ResultEntry, SheetgradeError> {
        let mut stmt = self
            .conn
            .prepare(
                "SELECT evaluated_at, student, sheet_sha256, subject, correct
                 FROM results
                 WHERE evaluation_id = ?1
                 ORDER BY id ASC",
            )
            .map_err(db_err)?;

        let rows = stmt
            .query_map(params![evaluation_id], |row| {
                Ok((
                    row.get::<_, String>(0)?,
                    row.get::<_, String>(1)?,
                    row.get::<_, String>(2)?,
                    row.get::<_, String>(3)?,
                    row.get::<_, u32>(4)?,
                ))
            })
            .map_err(db_err)?;

        let mut entry: Option<ResultEntry> = None;
        for row in rows {
            let (evaluated_at, student, sheet_sha256, subject, correct) = row.map_err(db_err)?;
            if entry.is_none() {
                entry = Some(ResultEntry {
                    evaluation_id: evaluation_id.to_owned(),
                    evaluated_at: parse_timestamp(&evaluated_at)?,
                    student,
                    sheet_sha256,
                    subjects: Vec::new(),
                    total: 0,
                });
            }
            if let Some(current) = entry.as_mut() {
                if subject == TOTAL_SUBJECT {
                    current.total = correct;
                } else {
                    current.subjects.push(SubjectScore { subject, correct });
                }
            }
        }

        entry.ok_or_else(|| {
            SheetgradeError::Database(format!("evaluation {evaluation_id} has no rows"))
        })
    }
}

fn parse_timestamp(text: &str) -> Result<DateTime<Utc>, SheetgradeError> {
    DateTime::parse_from_rfc3339(text)
        .map(|t| t.with_timezone(&Utc))
        .map_err(|e| SheetgradeError::Database(format!("bad timestamp {text:?}: {e}")))
}

#[cfg(test)]
mod tests {
    use super::*;
    use sheetgrade_core::types::ScoreReport;

    fn make_db() -> ResultsDb {
        ResultsDb::open_in_memory().expect("open in-memory results db")
    }

    fn sheet(student: &str, counts: &[(&str, u32)]) -> ScoredSheet {
        let report = ScoreReport::from_counts(
            counts
                .iter()
                .map(|(subject, correct)| SubjectScore {
                    subject: (*subject).to_string(),
                    correct: *correct,
                })
                .collect(),
        );
        ScoredSheet::new(student.to_string(), "cafe".repeat(16), report)
    }

    #[test]
    fn record_and_count() {
        let mut db = make_db();
        assert_eq!(db.count().unwrap(), 0);

        db.record(&sheet("Ada", &[("Python", 18), ("Stats", 15)])).unwrap();
        db.record(&sheet("Grace", &[("Python", 20), ("Stats", 19)])).unwrap();

        assert_eq!(db.count().unwrap(), 2);
    }

    #[test]
    fn stored_entry_round_trips() {
        let mut db = make_db();
        let original = sheet("Ada", &[("Python", 18), ("EDA", 12), ("Stats", 15)]);
        db.record(&original).unwrap();

        let entries = db.recent(10).unwrap();
        assert_eq!(entries.len(), 1);
        let entry = &entries[0];
        assert_eq!(entry.evaluation_id, original.id.to_string());
        assert_eq!(entry.student, "Ada");
        assert_eq!(entry.sheet_sha256, original.sheet_hash);
        assert_eq!(entry.subjects, original.report.subjects());
        assert_eq!(entry.total, 45);
        assert_eq!(entry.evaluated_at.timestamp(), original.evaluated_at.timestamp());
    }

    #[test]
    fn recent_is_newest_first_and_limited() {
        let mut db = make_db();
        for i in 0..5 {
            db.record(&sheet(&format!("student_{i}"), &[("Python", i)])).unwrap();
        }

        let recent = db.recent(3).unwrap();
        assert_eq!(recent.len(), 3);
        assert_eq!(recent[0].student, "student_4");
        assert_eq!(recent[1].student, "student_3");
        assert_eq!(recent[2].student, "student_2");
    }

    #[test]
    fn file_database_persists_across_opens() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("results.db");

        ResultsDb::open(&path)
            .unwrap()
            .record(&sheet("Ada", &[("Python", 7)]))
            .unwrap();

        let reopened = ResultsDb::open(&path).unwrap();
        assert_eq!(reopened.count().unwrap(), 1);
        assert_eq!(reopened.recent(1).unwrap()[0].total, 7);
    }
}
