// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// markwerk-vision — Answer-sheet geometry for Markwerk.
//
// Provides marker-driven skew correction, edge contour extraction, content
// region classification, perspective rectification, corner anchors and fill
// sensing, wired together by `SheetPipeline`.

pub mod correct;
pub mod detect;
pub mod fill;
pub mod geometry;
pub mod marker;
pub mod pipeline;
pub mod raster;

// Re-export the primary structs so callers can use `markwerk_vision::SheetPipeline` etc.
pub use correct::{PerspectiveRectifier, RectifiedRegion, RectifyOutcome, SkewCorrector};
pub use detect::{EdgeContourExtractor, RegionCandidate, RegionClassifier};
pub use fill::FillRatioSensor;
pub use geometry::Contour;
pub use marker::{FixedMarker, MarkerDecoder, NoMarker};
pub use pipeline::{SheetPipeline, SheetRegion, SheetReport};
pub use raster::SheetImage;
