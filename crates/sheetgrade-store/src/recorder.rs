// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Result recording: fan a graded sheet out to every configured store.

use std::fs;
use std::path::Path;

use sheetgrade_core::config::StoreConfig;
use sheetgrade_core::error::SheetgradeError;
use sheetgrade_core::types::ScoredSheet;
use tracing::{info, instrument};

use crate::csv::ResultsCsv;
use crate::results::ResultsDb;

/// Destination for graded sheets.
pub trait ResultSink {
    fn record(&mut self, sheet: &ScoredSheet) -> Result<(), SheetgradeError>;
}

impl ResultSink for ResultsDb {
    fn record(&mut self, sheet: &ScoredSheet) -> Result<(), SheetgradeError> {
        ResultsDb::record(self, sheet)
    }
}

impl ResultSink for ResultsCsv {
    fn record(&mut self, sheet: &ScoredSheet) -> Result<(), SheetgradeError> {
        self.append(sheet)
    }
}

/// Writes each result to the database first, then the CSV file.
pub struct ResultRecorder {
    db: ResultsDb,
    csv: ResultsCsv,
}

impl ResultRecorder {
    pub fn new(db: ResultsDb, csv: ResultsCsv) -> Self {
        Self { db, csv }
    }

    /// Open both stores at the configured paths, creating parent directories.
    pub fn open(config: &StoreConfig) -> Result<Self, SheetgradeError> {
        ensure_parent(&config.database_path)?;
        ensure_parent(&config.csv_path)?;
        Ok(Self::new(
            ResultsDb::open(&config.database_path)?,
            ResultsCsv::new(&config.csv_path),
        ))
    }

    pub fn db(&self) -> &ResultsDb {
        &self.db
    }
}

impl ResultSink for ResultRecorder {
    #[instrument(skip_all, fields(student = %sheet.student, total = sheet.report.total()))]
    fn record(&mut self, sheet: &ScoredSheet) -> Result<(), SheetgradeError> {
        self.db.record(sheet)?;
        self.csv.append(sheet)?;
        info!("result stored");
        Ok(())
    }
}

fn ensure_parent(path: &Path) -> Result<(), SheetgradeError> {
    match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => Ok(fs::create_dir_all(parent)?),
        _ => Ok(()),
    }
}
