// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Evaluation pipeline: rectify, binarize, decode and score one photographed
// answer sheet.

use image::{DynamicImage, RgbImage};
use sheetgrade_core::config::EvaluatorConfig;
use sheetgrade_core::error::{Result, SheetgradeError};
use sheetgrade_core::score::score_answers;
use sheetgrade_core::types::{AnswerKey, AnswerRecord, GridGeometry, ScoreReport};
use tracing::{info, instrument};

use crate::geometry::{Geometry, ImageprocGeometry};
use crate::grid::GridDecoder;
use crate::image::mask::BinaryMask;
use crate::scan::{Binarizer, Rectifier};

/// Everything produced while evaluating one sheet.
#[derive(Debug, Clone)]
pub struct Evaluation {
    pub record: AnswerRecord,
    pub report: ScoreReport,
    /// Rectified color view, for display.
    pub color: RgbImage,
    pub mask: BinaryMask,
    /// Whether a perspective correction was applied.
    pub warped: bool,
}

/// Stateless evaluator for a fixed grid layout. Safe to share across threads;
/// each call works on its own buffers.
#[derive(Debug, Clone)]
pub struct SheetEvaluator<G = ImageprocGeometry> {
    rectifier: Rectifier<G>,
    binarizer: Binarizer<G>,
    decoder: GridDecoder,
}

impl SheetEvaluator<ImageprocGeometry> {
    pub fn new(config: &EvaluatorConfig) -> Result<Self> {
        Self::with_geometry(config, ImageprocGeometry)
    }
}

impl<G: Geometry + Clone> SheetEvaluator<G> {
    pub fn with_geometry(config: &EvaluatorConfig, geometry: G) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            rectifier: Rectifier::with_geometry(config.rectifier.clone(), geometry.clone()),
            binarizer: Binarizer::with_geometry(config.binarizer.clone(), geometry),
            decoder: GridDecoder::new(config.geometry, config.decoder.clone())?,
        })
    }

    pub fn geometry(&self) -> &GridGeometry {
        self.decoder.geometry()
    }

    /// Grade `image` against `key`. The key is checked against the grid
    /// before any image work.
    #[instrument(skip_all, fields(width = image.width(), height = image.height()))]
    pub fn evaluate(&self, image: &DynamicImage, key: &AnswerKey) -> Result<Evaluation> {
        key.validate(self.geometry())?;

        let sheet = self.rectifier.rectify(image)?;
        let mask = self.binarizer.binarize(&sheet.gray);
        let record = self.decoder.decode(&mask)?;
        let report = score_answers(&record, key, self.geometry())?;

        info!(
            total = report.total(),
            undetermined = record.undetermined_count(),
            warped = sheet.warped(),
            "sheet evaluated"
        );

        Ok(Evaluation {
            warped: sheet.warped(),
            record,
            report,
            color: sheet.color,
            mask,
        })
    }
}

/// Grade one image with default stage settings and the given layout.
pub fn evaluate(image: &DynamicImage, geometry: GridGeometry, key: &AnswerKey) -> Result<ScoreReport> {
    let config = EvaluatorConfig {
        geometry,
        subjects: Vec::new(),
        ..EvaluatorConfig::default()
    };
    Ok(SheetEvaluator::new(&config)?.evaluate(image, key)?.report)
}

/// Decode encoded image bytes (PNG, JPEG, ...) into pixels.
pub fn decode_image(bytes: &[u8]) -> Result<DynamicImage> {
    image::load_from_memory(bytes)
        .map_err(|e| SheetgradeError::InvalidImage(format!("cannot decode image: {e}")))
}
