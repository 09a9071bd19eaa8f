// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Geometric correction — whole-sheet skew and per-region rectification.

pub mod rectify;
pub mod skew;

pub use rectify::{
    PerspectiveRectifier, RectifiedRegion, RectifyOutcome, order_corners, target_dimensions,
};
pub use skew::{SkewCorrection, SkewCorrector, azimuth_angle, skew_angle};
