// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// sheetgrade-vision: Image side of Sheetgrade.
//
// Rectifies a photographed answer sheet (lighting normalization, boundary
// detection, perspective warp), binarizes it into an ink mask, decodes the
// bubble grid and scores the result against an answer key.

pub mod geometry;
pub mod grid;
pub mod image;
pub mod pipeline;
pub mod scan;

// Stage types and the pipeline entry points.
pub use geometry::{Geometry, ImageprocGeometry};
pub use grid::GridDecoder;
pub use self::image::BinaryMask;
pub use pipeline::{Evaluation, SheetEvaluator, decode_image, evaluate};
pub use scan::{Binarizer, RectifiedSheet, Rectifier};
