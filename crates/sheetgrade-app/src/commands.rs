// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Command implementations. Each returns the text to print so the commands can
// be exercised without a terminal.

use std::fmt::Write as _;
use std::path::Path;

use sheetgrade_core::config::EvaluatorConfig;
use sheetgrade_core::error::{Result, SheetgradeError};
use sheetgrade_core::types::{AnswerKey, AnswerRecord, ScoredSheet};
use sheetgrade_store::{ResultRecorder, ResultSink, ResultsDb, sheet_fingerprint};
use sheetgrade_vision::{SheetEvaluator, decode_image};
use tracing::{info, warn};

use crate::EvaluateArgs;

pub fn load_config(path: Option<&Path>) -> Result<EvaluatorConfig> {
    match path {
        Some(path) => EvaluatorConfig::load(path),
        None => Ok(EvaluatorConfig::default()),
    }
}

/// Grade one sheet, optionally store it, and return the printable summary.
pub fn evaluate(config: &EvaluatorConfig, args: &EvaluateArgs) -> Result<String> {
    let bytes = std::fs::read(&args.image)?;
    let photo = decode_image(&bytes)?;
    let key = AnswerKey::from_json_file(&args.key, &config.subjects)?;

    let evaluator = SheetEvaluator::new(config)?;
    let evaluation = evaluator.evaluate(&photo, &key)?;
    if !evaluation.warped {
        warn!("sheet boundary not found; graded the photo as taken");
    }

    if let Some(path) = &args.save_mask {
        evaluation
            .mask
            .render(0, 255)
            .save(path)
            .map_err(|e| SheetgradeError::Io(std::io::Error::other(e)))?;
        info!(path = %path.display(), "mask saved");
    }
    if let Some(path) = &args.save_rectified {
        evaluation
            .color
            .save(path)
            .map_err(|e| SheetgradeError::Io(std::io::Error::other(e)))?;
        info!(path = %path.display(), "rectified sheet saved");
    }

    let sheet = ScoredSheet::new(
        args.student.clone(),
        sheet_fingerprint(&bytes),
        evaluation.report.clone(),
    );
    if !args.no_store {
        ResultRecorder::open(&config.store)?.record(&sheet)?;
    }

    let mut summary = answer_lines(&evaluation.record, &key, config.geometry.questions_per_subject);
    let _ = writeln!(summary, "{}", sheet.report);
    let _ = write!(
        summary,
        "{:.1}% ({} of {} questions unreadable)",
        sheet.report.percentage(config.geometry.total_questions()),
        evaluation.record.undetermined_count(),
        evaluation.record.len()
    );
    Ok(summary)
}

/// Recent stored results as a table or JSON.
pub fn results(config: &EvaluatorConfig, limit: u32, json: bool) -> Result<String> {
    let path = &config.store.database_path;
    if !path.exists() {
        info!(path = %path.display(), "no results database yet");
        return Ok(if json { "[]".into() } else { "no results stored yet".into() });
    }

    let db = ResultsDb::open(path)?;
    let entries = db.recent(limit)?;

    if json {
        return Ok(serde_json::to_string_pretty(&entries)?);
    }
    if entries.is_empty() {
        return Ok("no results stored yet".into());
    }

    let mut out = String::new();
    for entry in &entries {
        let subjects: Vec<String> = entry
            .subjects
            .iter()
            .map(|s| format!("{}: {}", s.subject, s.correct))
            .collect();
        let _ = writeln!(
            out,
            "{}  {:<20} {}  Total: {}",
            entry.evaluated_at.format("%Y-%m-%d %H:%M"),
            entry.student,
            subjects.join(", "),
            entry.total
        );
    }
    let _ = write!(out, "{} of {} evaluations", entries.len(), db.count()?);
    Ok(out)
}

/// One line per subject: the letters read, `-` for unreadable questions.
fn answer_lines(record: &AnswerRecord, key: &AnswerKey, per_subject: usize) -> String {
    let mut out = String::new();
    if per_subject == 0 {
        return out;
    }
    for (subject, answers) in key.subjects().iter().zip(record.answers().chunks(per_subject)) {
        let read: String = answers.iter().map(|a| a.to_string()).collect();
        let _ = writeln!(out, "{:<10} {read}", subject.name);
    }
    out
}
