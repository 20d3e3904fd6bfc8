// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Sheetgrade: Core types, error definitions, configuration and scoring shared
// across all crates.

pub mod config;
pub mod error;
pub mod human_errors;
pub mod score;
pub mod types;

pub use config::EvaluatorConfig;
pub use error::SheetgradeError;
pub use score::score_answers;
pub use types::*;
