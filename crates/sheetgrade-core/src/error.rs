// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Unified error types for Sheetgrade.

use thiserror::Error;

/// Top-level error type for all Sheetgrade operations.
#[derive(Debug, Error)]
pub enum SheetgradeError {
    // -- Evaluation errors --
    #[error("invalid image: {0}")]
    InvalidImage(String),

    #[error("answer record has {actual} entries but the grid geometry expects {expected}")]
    GeometryMismatch { expected: usize, actual: usize },

    #[error("invalid grid geometry: {0}")]
    InvalidGeometry(String),

    #[error("invalid answer key: {0}")]
    AnswerKey(String),

    #[error("invalid configuration: {0}")]
    Config(String),

    // -- Storage / persistence --
    #[error("database error: {0}")]
    Database(String),

    #[error("file I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Alias used throughout the codebase.
pub type Result<T> = std::result::Result<T, SheetgradeError>;
