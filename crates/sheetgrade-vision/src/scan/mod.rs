// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Scanning stages: rectification of the photographed sheet and binarization
// into an ink mask.

pub mod binarize;
pub mod rectify;

pub use binarize::Binarizer;
pub use rectify::{RectifiedSheet, Rectifier};
