// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Grid decoding: partition an ink mask into subject bands, question rows and
// option columns, then classify each question from the ink mass per option.

use std::ops::Range;

use sheetgrade_core::config::DecoderConfig;
use sheetgrade_core::error::{Result, SheetgradeError};
use sheetgrade_core::types::{Answer, AnswerRecord, GridGeometry, RemainderPolicy};
use tracing::{debug, instrument};

use crate::image::mask::BinaryMask;

/// Ink masses measured for one question, alongside the decision.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QuestionReading {
    pub subject: usize,
    pub question: usize,
    pub masses: Vec<u32>,
    pub answer: Answer,
}

/// Reads the marked option of every question on a binarized sheet.
#[derive(Debug, Clone)]
pub struct GridDecoder {
    geometry: GridGeometry,
    config: DecoderConfig,
}

impl GridDecoder {
    pub fn new(geometry: GridGeometry, config: DecoderConfig) -> Result<Self> {
        geometry.validate()?;
        Ok(Self { geometry, config })
    }

    pub fn geometry(&self) -> &GridGeometry {
        &self.geometry
    }

    pub fn config(&self) -> &DecoderConfig {
        &self.config
    }

    /// Answer record of length `subject_count * questions_per_subject`, in
    /// subject order then question order.
    pub fn decode(&self, mask: &BinaryMask) -> Result<AnswerRecord> {
        let readings = self.decode_detailed(mask)?;
        Ok(AnswerRecord::new(
            readings.into_iter().map(|r| r.answer).collect(),
        ))
    }

    /// Like [`decode`](Self::decode) but keeps the per-option ink masses.
    #[instrument(skip_all, fields(width = mask.width(), height = mask.height()))]
    pub fn decode_detailed(&self, mask: &BinaryMask) -> Result<Vec<QuestionReading>> {
        let g = &self.geometry;
        let policy = self.config.remainder;
        let (width, height) = mask.dimensions();

        if policy == RemainderPolicy::Exact {
            let rows = (g.subject_count * g.questions_per_subject) as u32;
            let options = g.options_per_question as u32;
            if height % rows != 0 || width % options != 0 {
                return Err(SheetgradeError::InvalidGeometry(format!(
                    "{width}x{height} mask does not divide into {rows} rows of {options} options"
                )));
            }
        }

        let columns = partition(0..width, g.options_per_question, policy);
        let mut readings = Vec::with_capacity(g.total_questions());

        for (subject, band) in partition(0..height, g.subject_count, policy)
            .into_iter()
            .enumerate()
        {
            for (question, row) in partition(band, g.questions_per_subject, policy)
                .into_iter()
                .enumerate()
            {
                let masses: Vec<u32> = columns
                    .iter()
                    .map(|col| mask.count_region(col.clone(), row.clone()))
                    .collect();
                let answer = classify(&masses, &self.config);
                readings.push(QuestionReading {
                    subject,
                    question,
                    masses,
                    answer,
                });
            }
        }

        debug!(
            questions = readings.len(),
            undetermined = readings.iter().filter(|r| !r.answer.is_determined()).count(),
            "grid decoded"
        );
        Ok(readings)
    }
}

/// Split `extent` into `parts` consecutive ranges.
///
/// `Drop` and `Exact` use equal integer-division sizes and leave any
/// remainder uncovered at the end; `Distribute` places boundaries at
/// `floor(i * len / parts)` so every position is covered.
pub fn partition(extent: Range<u32>, parts: usize, policy: RemainderPolicy) -> Vec<Range<u32>> {
    if parts == 0 {
        return Vec::new();
    }
    let start = extent.start as u64;
    let len = extent.end.saturating_sub(extent.start) as u64;
    let n = parts as u64;

    (0..n)
        .map(|i| {
            let (lo, hi) = match policy {
                RemainderPolicy::Distribute => (i * len / n, (i + 1) * len / n),
                RemainderPolicy::Drop | RemainderPolicy::Exact => {
                    let size = len / n;
                    (i * size, (i + 1) * size)
                }
            };
            (start + lo) as u32..(start + hi) as u32
        })
        .collect()
}

/// Decision rule over one question's option ink masses.
///
/// Blank when the heaviest option is below `blank_threshold`, ambiguous when
/// the two heaviest differ by less than `ambiguity_margin`, otherwise the
/// index of the heaviest option. Ties on the maximum resolve to the first.
/// A single-option question has no runner-up and skips the margin check.
pub fn classify(masses: &[u32], config: &DecoderConfig) -> Answer {
    let Some((best, &top)) = masses
        .iter()
        .enumerate()
        .rev()
        .max_by_key(|(_, mass)| **mass)
    else {
        return Answer::Undetermined;
    };

    if top < config.blank_threshold {
        return Answer::Undetermined;
    }

    let runner_up = masses
        .iter()
        .enumerate()
        .filter(|(i, _)| *i != best)
        .map(|(_, mass)| *mass)
        .max();

    match runner_up {
        Some(second) if top - second < config.ambiguity_margin => Answer::Undetermined,
        _ => Answer::Determined(best),
    }
}
