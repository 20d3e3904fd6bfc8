// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Image module: grayscale filters and the binary ink mask.

pub mod filters;
pub mod mask;

pub use mask::BinaryMask;
