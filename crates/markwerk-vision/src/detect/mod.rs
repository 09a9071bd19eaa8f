// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Detection — edge contours, region classification and corner anchors.

pub mod anchor;
pub mod classify;
pub mod contours;

pub use anchor::{anchor_points_by_pixels, anchor_points_by_squares, nearest_to_corners};
pub use classify::{Classification, RegionCandidate, RegionClassifier, Rejection, is_square_like};
pub use contours::{EdgeContourExtractor, trace_all};
