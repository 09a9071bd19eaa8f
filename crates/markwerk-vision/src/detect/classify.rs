// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Region classification — decide which traced contours are the sheet's
// printed content blocks, by size relative to the marker and by how well
// they fill their bounding box.

use markwerk_core::Rect;
use markwerk_core::config::{ClassifierConfig, SquareConfig};
use serde::Serialize;
use tracing::{debug, info, instrument};

use crate::geometry::Contour;

/// A contour with the metrics the classifier judges it by.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RegionCandidate {
    pub contour: Contour,
    pub perimeter: f64,
    pub bounding: Rect,
    pub bounding_area: u64,
    pub area: f64,
    pub aspect_ratio: f64,
}

impl RegionCandidate {
    pub fn from_contour(contour: Contour) -> Self {
        let bounding = contour.bounding_rect();
        Self {
            perimeter: contour.perimeter(),
            bounding_area: bounding.area(),
            area: contour.area(),
            aspect_ratio: bounding.aspect_ratio(),
            bounding,
            contour,
        }
    }
}

/// The first filter a rejected contour failed.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub enum Rejection {
    TooFewPoints { points: usize },
    PerimeterOutOfRange { perimeter: f64, min: f64, max: f64 },
    TooNarrow { width: u32, min: f64 },
    TooShort { height: u32, min: f64 },
    NotRectangular { area: f64, bounding_area: u64 },
}

impl std::fmt::Display for Rejection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::TooFewPoints { points } => write!(f, "only {points} points"),
            Self::PerimeterOutOfRange {
                perimeter,
                min,
                max,
            } => write!(f, "perimeter {perimeter:.1} outside [{min:.1}, {max:.1}]"),
            Self::TooNarrow { width, min } => write!(f, "width {width} below {min:.1}"),
            Self::TooShort { height, min } => write!(f, "height {height} below {min:.1}"),
            Self::NotRectangular {
                area,
                bounding_area,
            } => write!(f, "area {area:.0} too far from bounding area {bounding_area}"),
        }
    }
}

/// Outcome of one classification pass.
#[derive(Debug, Clone, Default)]
pub struct Classification {
    /// Accepted candidates in discovery order.
    pub accepted: Vec<RegionCandidate>,
    pub rejected: Vec<(RegionCandidate, Rejection)>,
}

impl Classification {
    pub fn accepted_count(&self) -> usize {
        self.accepted.len()
    }
}

/// Filters contours down to the sheet's content regions.
#[derive(Debug, Clone, Copy, Default)]
pub struct RegionClassifier {
    config: ClassifierConfig,
}

impl RegionClassifier {
    pub fn new(config: ClassifierConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &ClassifierConfig {
        &self.config
    }

    /// Classify `contours` against reference width `reference_width`.
    ///
    /// A lone contour is accepted without any checks.
    #[instrument(skip(self, contours), fields(contours = contours.len()))]
    pub fn classify(&self, contours: Vec<Contour>, reference_width: f64) -> Classification {
        let mut candidates: Vec<RegionCandidate> =
            contours.into_iter().map(RegionCandidate::from_contour).collect();

        if candidates.len() == 1 {
            debug!("Single contour accepted unconditionally");
            return Classification {
                accepted: candidates,
                rejected: Vec::new(),
            };
        }

        let mut result = Classification::default();
        for (index, candidate) in candidates.drain(..).enumerate() {
            match self.evaluate(&candidate, reference_width) {
                Ok(()) => result.accepted.push(candidate),
                Err(reason) => {
                    debug!(index, %reason, "Contour rejected");
                    result.rejected.push((candidate, reason));
                }
            }
        }

        info!(
            accepted = result.accepted.len(),
            rejected = result.rejected.len(),
            "Regions classified"
        );
        result
    }

    /// Apply the filters in order; the first failing one is returned.
    pub fn evaluate(
        &self,
        candidate: &RegionCandidate,
        reference_width: f64,
    ) -> Result<(), Rejection> {
        let cfg = &self.config;
        let w = reference_width;

        let points = candidate.contour.len();
        if points < 4 {
            return Err(Rejection::TooFewPoints { points });
        }

        let (min, max) = (cfg.min_perimeter_factor * w, cfg.max_perimeter_factor * w);
        if candidate.perimeter < min || candidate.perimeter > max {
            return Err(Rejection::PerimeterOutOfRange {
                perimeter: candidate.perimeter,
                min,
                max,
            });
        }

        let min_width = cfg.min_width_factor * w;
        if f64::from(candidate.bounding.width) < min_width {
            return Err(Rejection::TooNarrow {
                width: candidate.bounding.width,
                min: min_width,
            });
        }

        let min_height = w / cfg.height_divisor * cfg.min_height_factor;
        if f64::from(candidate.bounding.height) < min_height {
            return Err(Rejection::TooShort {
                height: candidate.bounding.height,
                min: min_height,
            });
        }

        let bounding_area = candidate.bounding_area as f64;
        if (candidate.area - bounding_area).abs() > cfg.rectangularity_tolerance * bounding_area {
            return Err(Rejection::NotRectangular {
                area: candidate.area,
                bounding_area: candidate.bounding_area,
            });
        }

        Ok(())
    }
}

/// Whether a contour looks like a small printed square: both bounding sides
/// within the configured range, the contour filling most of its box, and a
/// near-unit aspect ratio.
pub fn is_square_like(contour: &Contour, config: &SquareConfig) -> bool {
    let bounding = contour.bounding_rect();
    let side_ok = |side: u32| (config.min_side..=config.max_side).contains(&side);
    side_ok(bounding.width)
        && side_ok(bounding.height)
        && contour.area() >= config.min_fill * bounding.area() as f64
        && (bounding.aspect_ratio() - 1.0).abs() <= config.aspect_tolerance
}
