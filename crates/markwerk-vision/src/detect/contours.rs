// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Edge-based contour extraction. Smooth, run Canny, then trace borders of
// the edge map with imageproc's Suzuki–Abe follower and compress each chain
// to its direction-change vertices.

use image::GrayImage;
use imageproc::contours::{BorderType, find_contours};
use imageproc::edges::canny;
use imageproc::filter::separable_filter_equal;
use markwerk_core::Point;
use markwerk_core::config::EdgeParams;
use markwerk_core::error::Result;
use tracing::{debug, instrument};

use crate::geometry::{Contour, compress_chain};

/// Finds the outer boundaries of structures in a sheet buffer.
#[derive(Debug, Clone, Copy, Default)]
pub struct EdgeContourExtractor {
    params: EdgeParams,
}

impl EdgeContourExtractor {
    /// Build an extractor, rejecting parameters the edge detector cannot
    /// honour.
    pub fn new(params: EdgeParams) -> Result<Self> {
        params.validate()?;
        Ok(Self { params })
    }

    pub fn params(&self) -> &EdgeParams {
        &self.params
    }

    /// `gray` smoothed with the configured separable kernel, applied along
    /// both axes.
    pub fn smooth(&self, gray: &GrayImage) -> GrayImage {
        separable_filter_equal(gray, &self.params.blur_kernel())
    }

    /// Binary edge map of `gray`.
    ///
    /// An edge pixel must be strictly stronger than `threshold2` to seed a
    /// chain and strictly stronger than `threshold1` to extend one.
    #[instrument(skip_all, fields(width = gray.width(), height = gray.height()))]
    pub fn edge_map(&self, gray: &GrayImage) -> GrayImage {
        let smoothed = self.smooth(gray);
        // imageproc's hysteresis compares with `>=`; nudge both thresholds up
        // by one ulp so a zero low threshold does not admit flat pixels.
        canny(
            &smoothed,
            next_up(self.params.threshold1),
            next_up(self.params.threshold2),
        )
    }

    /// Outermost boundaries of the edge map: no holes and nothing nested
    /// inside another border.
    #[instrument(skip_all, fields(width = gray.width(), height = gray.height()))]
    pub fn extract(&self, gray: &GrayImage) -> Vec<Contour> {
        let edges = self.edge_map(gray);
        let traced = find_contours::<i32>(&edges);
        let total = traced.len();

        let outer: Vec<Contour> = traced
            .into_iter()
            .filter(|c| c.border_type == BorderType::Outer && c.parent.is_none())
            .map(|c| to_contour(&c.points))
            .collect();

        debug!(traced = total, outer = outer.len(), "Contours extracted");
        outer
    }
}

/// Every border of a binary image, outer and hole alike, compressed.
#[instrument(skip_all, fields(width = binary.width(), height = binary.height()))]
pub fn trace_all(binary: &GrayImage) -> Vec<Contour> {
    let contours: Vec<Contour> = find_contours::<i32>(binary)
        .iter()
        .map(|c| to_contour(&c.points))
        .collect();
    debug!(count = contours.len(), "Borders traced");
    contours
}

fn to_contour(points: &[imageproc::point::Point<i32>]) -> Contour {
    let raw: Vec<Point> = points.iter().map(|p| Point::new(p.x, p.y)).collect();
    Contour::new(compress_chain(&raw))
}

/// Smallest `f32` strictly greater than a finite, non-negative `value`.
fn next_up(value: f32) -> f32 {
    f32::from_bits(value.to_bits() + 1)
}
