// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// sheetgrade-store: Persistence for graded sheets.
//
// Appends every score report to a SQLite results table and a flat CSV file,
// and fingerprints uploaded sheet images with SHA-256.

pub mod csv;
pub mod fingerprint;
pub mod recorder;
pub mod results;

pub use csv::ResultsCsv;
pub use fingerprint::sheet_fingerprint;
pub use recorder::{ResultRecorder, ResultSink};
pub use results::{ResultEntry, ResultsDb};
