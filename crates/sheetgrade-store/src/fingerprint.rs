// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Sheet fingerprinting: SHA-256 of the uploaded image bytes.

use sha2::{Digest, Sha256};

/// Lowercase hex SHA-256 digest of `bytes`.
///
/// Stored next to every result so a score can be traced back to the exact
/// photo it was computed from, and duplicate uploads can be spotted.
pub fn sheet_fingerprint(bytes: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(bytes);
    hex::encode(hasher.finalize())
}
