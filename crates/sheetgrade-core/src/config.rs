// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Evaluator configuration. Every tunable constant of the pipeline lives here
// with its default, so stages never read module-level magic numbers.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::{Result, SheetgradeError};
use crate::types::{GridGeometry, RemainderPolicy};

/// Sheet rectification tunables.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RectifierConfig {
    /// CLAHE tile grid (tiles per axis).
    pub clahe_tiles: u32,
    /// CLAHE clip limit, relative to a uniform histogram bin.
    pub clahe_clip_limit: f32,
    /// Bilateral filter window diameter in pixels.
    pub bilateral_diameter: u32,
    pub bilateral_sigma_color: f32,
    pub bilateral_sigma_space: f32,
    /// Gaussian kernel size used to estimate the background illumination.
    pub background_kernel: u32,
    /// Gaussian kernel size applied before edge detection.
    pub edge_blur_kernel: u32,
    pub canny_low: f32,
    pub canny_high: f32,
    /// Polygon approximation tolerance as a fraction of the contour perimeter.
    pub polygon_epsilon_ratio: f64,
}

impl Default for RectifierConfig {
    fn default() -> Self {
        Self {
            clahe_tiles: 8,
            clahe_clip_limit: 3.0,
            bilateral_diameter: 9,
            bilateral_sigma_color: 75.0,
            bilateral_sigma_space: 75.0,
            background_kernel: 55,
            edge_blur_kernel: 5,
            canny_low: 50.0,
            canny_high: 150.0,
            polygon_epsilon_ratio: 0.02,
        }
    }
}

/// Ink mask extraction tunables.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BinarizerConfig {
    /// Side of the square neighbourhood used for the local mean (odd).
    pub block_size: u32,
    /// Amount subtracted from the local mean before comparison.
    pub offset: i32,
    /// Side of the square structuring element (odd).
    pub kernel_size: u32,
    pub close_iterations: u32,
    pub open_iterations: u32,
    /// Estimate and remove residual rotation.
    pub deskew: bool,
    /// Skew angles smaller than this (degrees) are left uncorrected.
    pub min_skew_degrees: f64,
    /// Apply the 5/-1 sharpening kernel after rotation.
    pub sharpen: bool,
}

impl Default for BinarizerConfig {
    fn default() -> Self {
        Self {
            block_size: 25,
            offset: 15,
            kernel_size: 3,
            close_iterations: 2,
            open_iterations: 1,
            deskew: true,
            min_skew_degrees: 0.05,
            sharpen: true,
        }
    }
}

/// Grid decoding tunables.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DecoderConfig {
    /// A question whose strongest option has fewer ink pixels is blank.
    pub blank_threshold: u32,
    /// Minimum lead of the strongest option over the runner-up.
    pub ambiguity_margin: u32,
    pub remainder: RemainderPolicy,
}

impl Default for DecoderConfig {
    fn default() -> Self {
        Self {
            blank_threshold: 200,
            ambiguity_margin: 100,
            remainder: RemainderPolicy::Drop,
        }
    }
}

/// Where evaluated sheets are recorded.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StoreConfig {
    pub database_path: PathBuf,
    pub csv_path: PathBuf,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            database_path: PathBuf::from("data/results/results.db"),
            csv_path: PathBuf::from("data/results/results.csv"),
        }
    }
}

/// Complete evaluator settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EvaluatorConfig {
    pub geometry: GridGeometry,
    /// Subject names in the order their bands appear on the sheet.
    pub subjects: Vec<String>,
    pub rectifier: RectifierConfig,
    pub binarizer: BinarizerConfig,
    pub decoder: DecoderConfig,
    pub store: StoreConfig,
}

impl Default for EvaluatorConfig {
    fn default() -> Self {
        Self {
            geometry: GridGeometry::default(),
            subjects: ["Python", "EDA", "MySQL", "PowerBI", "Stats"]
                .into_iter()
                .map(String::from)
                .collect(),
            rectifier: RectifierConfig::default(),
            binarizer: BinarizerConfig::default(),
            decoder: DecoderConfig::default(),
            store: StoreConfig::default(),
        }
    }
}

impl EvaluatorConfig {
    /// Load settings from a JSON file; absent fields keep their defaults.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let text = std::fs::read_to_string(path.as_ref())?;
        let config: Self = serde_json::from_str(&text)?;
        config.validate()?;
        Ok(config)
    }

    /// Check internal consistency of the settings.
    pub fn validate(&self) -> Result<()> {
        self.geometry.validate()?;

        if !self.subjects.is_empty() && self.subjects.len() != self.geometry.subject_count {
            return Err(SheetgradeError::Config(format!(
                "{} subject names configured for {} subject bands",
                self.subjects.len(),
                self.geometry.subject_count
            )));
        }

        let odd_kernels = [
            ("rectifier.background_kernel", self.rectifier.background_kernel),
            ("rectifier.edge_blur_kernel", self.rectifier.edge_blur_kernel),
            ("rectifier.bilateral_diameter", self.rectifier.bilateral_diameter),
            ("binarizer.block_size", self.binarizer.block_size),
            ("binarizer.kernel_size", self.binarizer.kernel_size),
        ];
        for (name, size) in odd_kernels {
            if size == 0 || size % 2 == 0 {
                return Err(SheetgradeError::Config(format!(
                    "{name} must be a positive odd number (got {size})"
                )));
            }
        }

        if self.rectifier.clahe_tiles == 0 {
            return Err(SheetgradeError::Config(
                "rectifier.clahe_tiles must be at least 1".into(),
            ));
        }
        if self.rectifier.canny_low > self.rectifier.canny_high {
            return Err(SheetgradeError::Config(format!(
                "rectifier.canny_low ({}) exceeds canny_high ({})",
                self.rectifier.canny_low, self.rectifier.canny_high
            )));
        }
        Ok(())
    }
}
