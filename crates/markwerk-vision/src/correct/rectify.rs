// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Region rectification — order a quadrilateral's corners, estimate its true
// size, and resample it into an upright buffer through a perspective or
// affine transform.

use image::{GrayImage, Luma};
use imageproc::geometric_transformations::{Interpolation, Projection, warp_into};
use markwerk_core::Point;
use markwerk_core::config::{RectifierConfig, RectifyStrategy, Resampling};
use tracing::{debug, info, instrument, warn};

use crate::geometry::{Contour, approximate_closed, perimeter};

/// An upright crop of a source quadrilateral.
#[derive(Debug, Clone)]
pub struct RectifiedRegion {
    pub image: GrayImage,
    pub width: u32,
    pub height: u32,
    /// Source corners as used for the transform:
    /// `[top_left, top_right, bottom_right, bottom_left]`.
    pub corners: [Point; 4],
}

/// What rectifying one region produced.
#[derive(Debug, Clone)]
pub enum RectifyOutcome {
    Rectified(RectifiedRegion),
    /// The re-approximation did not yield a quadrilateral, or the
    /// quadrilateral has a zero-length side. Width and height are 0.
    Degenerate { vertices: usize },
    /// The corners admit no invertible transform.
    Singular,
}

impl RectifyOutcome {
    pub fn rectified(self) -> Option<RectifiedRegion> {
        match self {
            Self::Rectified(region) => Some(region),
            _ => None,
        }
    }

    /// Target `(width, height)`; `(0, 0)` when nothing was rectified.
    pub fn dimensions(&self) -> (u32, u32) {
        match self {
            Self::Rectified(region) => (region.width, region.height),
            _ => (0, 0),
        }
    }
}

/// Bring four corners into the `[top_left, top_right, bottom_right,
/// bottom_left]` cycle.
///
/// Two corrections run in order:
/// 1. If corner 1 lies left of corner 3 the cycle runs counter-clockwise;
///    swapping them makes it clockwise.
/// 2. If corner 0 and corner 3 are more than `tolerance_px` apart
///    horizontally, the cycle started one vertex late; rotating it by one
///    (last becomes first) fixes the start.
pub fn order_corners(mut corners: [Point; 4], tolerance_px: i32) -> [Point; 4] {
    if corners[1].x < corners[3].x {
        corners.swap(1, 3);
    }
    if (corners[0].x - corners[3].x).abs() > tolerance_px {
        corners.rotate_right(1);
    }
    corners
}

/// Output size of an ordered quadrilateral: the longer of each pair of
/// opposite sides, truncated to whole pixels.
pub fn target_dimensions(corners: &[Point; 4]) -> (u32, u32) {
    let [tl, tr, br, bl] = corners;
    let width = tl.distance(tr).max(br.distance(bl));
    let height = tl.distance(bl).max(tr.distance(br));
    (width as u32, height as u32)
}

/// Maps region quadrilaterals onto upright rectangles.
#[derive(Debug, Clone, Copy, Default)]
pub struct PerspectiveRectifier {
    config: RectifierConfig,
}

impl PerspectiveRectifier {
    pub fn new(config: RectifierConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &RectifierConfig {
        &self.config
    }

    /// Rectify the region bounded by `contour`.
    ///
    /// The contour is re-approximated at the configured fraction of its
    /// perimeter and must reduce to exactly four vertices.
    #[instrument(skip_all, fields(points = contour.len()))]
    pub fn rectify_contour(&self, source: &GrayImage, contour: &Contour) -> RectifyOutcome {
        self.rectify_points(source, &contour.points)
    }

    /// Rectify the quadrilateral with the given corners, in any order that
    /// follows the boundary.
    #[instrument(skip(self, source))]
    pub fn rectify_corners(&self, source: &GrayImage, corners: [Point; 4]) -> RectifyOutcome {
        self.rectify_points(source, &corners)
    }

    fn rectify_points(&self, source: &GrayImage, points: &[Point]) -> RectifyOutcome {
        let epsilon = perimeter(points) * self.config.approx_epsilon_ratio;
        let approx = approximate_closed(points, epsilon);
        let Ok(quad) = <[Point; 4]>::try_from(approx.as_slice()) else {
            warn!(
                vertices = approx.len(),
                epsilon, "Region does not approximate to a quadrilateral"
            );
            return RectifyOutcome::Degenerate {
                vertices: approx.len(),
            };
        };

        let corners = order_corners(quad, self.config.reorder_tolerance_px);
        debug!(?quad, ?corners, "Corners ordered");

        let (width, height) = target_dimensions(&corners);
        if width == 0 || height == 0 {
            warn!(width, height, "Quadrilateral has a zero-length side");
            return RectifyOutcome::Degenerate { vertices: 4 };
        }

        let Some(projection) = self.solve(&corners, width, height) else {
            warn!(?corners, "Rectifying transform is singular");
            return RectifyOutcome::Singular;
        };

        let mut output = GrayImage::new(width, height);
        warp_into(
            source,
            &projection,
            interpolation(self.config.resampling),
            Luma([0u8]),
            &mut output,
        );

        info!(width, height, strategy = ?self.config.strategy, "Region rectified");
        RectifyOutcome::Rectified(RectifiedRegion {
            image: output,
            width,
            height,
            corners,
        })
    }

    /// Transform taking the ordered corners onto the `width` x `height`
    /// output grid.
    fn solve(&self, corners: &[Point; 4], width: u32, height: u32) -> Option<Projection> {
        let (right, bottom) = ((width - 1) as f32, (height - 1) as f32);
        let dest = [(0.0, 0.0), (right, 0.0), (right, bottom), (0.0, bottom)];
        let src = corners.map(|p| (p.x as f32, p.y as f32));

        match self.config.strategy {
            RectifyStrategy::Perspective => Projection::from_control_points(src, dest),
            RectifyStrategy::Affine => {
                let matrix = affine_from_triangles(
                    [src[0], src[1], src[2]],
                    [dest[0], dest[1], dest[2]],
                )?;
                Projection::from_matrix(matrix)
            }
        }
    }
}

/// Row-major 3x3 matrix of the affine map taking `from[i]` to `to[i]`.
/// `None` when the source triangle is degenerate.
fn affine_from_triangles(from: [(f32, f32); 3], to: [(f32, f32); 3]) -> Option<[f32; 9]> {
    let [(x0, y0), (x1, y1), (x2, y2)] = from.map(|(x, y)| (f64::from(x), f64::from(y)));
    let det = x0 * (y1 - y2) - y0 * (x1 - x2) + (x1 * y2 - x2 * y1);
    if det.abs() < 1e-9 {
        return None;
    }

    // Cramer's rule on [x y 1] * [a b c]^T = target, once per output axis.
    let solve_axis = |t0: f64, t1: f64, t2: f64| -> (f64, f64, f64) {
        let a = (t0 * (y1 - y2) - y0 * (t1 - t2) + (t1 * y2 - t2 * y1)) / det;
        let b = (x0 * (t1 - t2) - t0 * (x1 - x2) + (x1 * t2 - x2 * t1)) / det;
        let c = (x0 * (y1 * t2 - y2 * t1) - y0 * (x1 * t2 - x2 * t1) + t0 * (x1 * y2 - x2 * y1))
            / det;
        (a, b, c)
    };
    let [(u0, v0), (u1, v1), (u2, v2)] = to.map(|(x, y)| (f64::from(x), f64::from(y)));
    let (a, b, c) = solve_axis(u0, u1, u2);
    let (d, e, f) = solve_axis(v0, v1, v2);

    Some([
        a as f32, b as f32, c as f32, d as f32, e as f32, f as f32, 0.0, 0.0, 1.0,
    ])
}

pub(crate) fn interpolation(resampling: Resampling) -> Interpolation {
    match resampling {
        Resampling::Nearest => Interpolation::Nearest,
        Resampling::Bilinear => Interpolation::Bilinear,
        Resampling::Bicubic => Interpolation::Bicubic,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn p(x: i32, y: i32) -> Point {
        Point::new(x, y)
    }

    /// Checkerboard of 10 px cells.
    fn checkerboard(width: u32, height: u32) -> GrayImage {
        GrayImage::from_fn(width, height, |x, y| {
            Luma([if (x / 10 + y / 10) % 2 == 0 { 0 } else { 255 }])
        })
    }

    #[test]
    fn clockwise_corners_stay_put() {
        let corners = [p(10, 10), p(210, 10), p(210, 60), p(10, 60)];
        assert_eq!(order_corners(corners, 100), corners);
    }

    #[test]
    fn counter_clockwise_corners_are_swapped() {
        let corners = [p(10, 10), p(10, 60), p(210, 60), p(210, 10)];
        assert_eq!(
            order_corners(corners, 100),
            [p(10, 10), p(210, 10), p(210, 60), p(10, 60)]
        );
    }

    #[test]
    fn late_start_is_rotated_back_to_top_left() {
        // Clockwise, but starting from the top-right corner.
        let corners = [p(210, 10), p(210, 60), p(10, 60), p(10, 10)];
        assert_eq!(
            order_corners(corners, 100),
            [p(10, 10), p(210, 10), p(210, 60), p(10, 60)]
        );
    }

    #[test]
    fn reorder_tolerance_is_configurable() {
        let corners = [p(210, 10), p(210, 60), p(10, 60), p(10, 10)];
        // 200 px apart does not exceed a 250 px tolerance.
        assert_eq!(order_corners(corners, 250), corners);
    }

    #[test]
    fn dimensions_take_longer_opposite_sides() {
        // Top edge 100, bottom edge 120; left edge 50, right edge ~50.99.
        let corners = [p(0, 0), p(100, 0), p(110, 50), p(-10, 50)];
        let (w, h) = target_dimensions(&corners);
        assert_eq!(w, 120);
        assert_eq!(h, 50);
    }

    #[test]
    fn axis_aligned_rectangle_matches_direct_crop() {
        let source = checkerboard(300, 200);
        let corners = [p(50, 40), p(150, 40), p(150, 100), p(50, 100)];
        let region = PerspectiveRectifier::default()
            .rectify_corners(&source, corners)
            .rectified()
            .expect("rectangle must rectify");

        assert_eq!((region.width, region.height), (100, 60));
        assert_eq!(region.image.dimensions(), (100, 60));

        // Every output pixel lies within the value range of the source pixels
        // one step around the matching crop position.
        for (u, v, pixel) in region.image.enumerate_pixels() {
            let (cx, cy) = (50 + u as i32, 40 + v as i32);
            let mut lo = 255u8;
            let mut hi = 0u8;
            for dy in -1..=1 {
                for dx in -1..=1 {
                    let value = source.get_pixel((cx + dx) as u32, (cy + dy) as u32).0[0];
                    lo = lo.min(value);
                    hi = hi.max(value);
                }
            }
            let value = pixel.0[0];
            assert!(
                (lo..=hi).contains(&value),
                "pixel ({u},{v}) = {value} outside crop neighbourhood [{lo},{hi}]"
            );
        }
    }

    #[test]
    fn counter_clockwise_input_keeps_reading_orientation() {
        // Dark block in the top-left of a white region.
        let mut source = GrayImage::from_pixel(320, 120, Luma([255]));
        for y in 10..40 {
            for x in 10..60 {
                source.put_pixel(x, y, Luma([0]));
            }
        }
        let ccw = [p(10, 10), p(10, 70), p(260, 70), p(260, 10)];
        let region = PerspectiveRectifier::default()
            .rectify_corners(&source, ccw)
            .rectified()
            .expect("rectangle must rectify");

        assert_eq!(region.corners, [p(10, 10), p(260, 10), p(260, 70), p(10, 70)]);
        assert_eq!((region.width, region.height), (250, 60));
        assert_eq!(region.image.get_pixel(5, 5).0[0], 0);
        assert_eq!(region.image.get_pixel(240, 50).0[0], 255);
    }

    #[test]
    fn affine_strategy_matches_perspective_on_rectangles() {
        let source = checkerboard(300, 200);
        let corners = [p(20, 20), p(220, 20), p(220, 120), p(20, 120)];
        let perspective = PerspectiveRectifier::default()
            .rectify_corners(&source, corners)
            .rectified()
            .unwrap();
        let affine = PerspectiveRectifier::new(RectifierConfig {
            strategy: RectifyStrategy::Affine,
            ..RectifierConfig::default()
        })
        .rectify_corners(&source, corners)
        .rectified()
        .unwrap();

        assert_eq!(affine.image.dimensions(), perspective.image.dimensions());
        let differing = affine
            .image
            .pixels()
            .zip(perspective.image.pixels())
            .filter(|(a, b)| (i32::from(a.0[0]) - i32::from(b.0[0])).abs() > 2)
            .count();
        assert_eq!(differing, 0);
    }

    #[test]
    fn triangle_contour_is_degenerate() {
        let source = GrayImage::new(100, 100);
        let triangle = Contour::new(vec![p(10, 10), p(90, 10), p(50, 80)]);
        let outcome = PerspectiveRectifier::default().rectify_contour(&source, &triangle);
        assert!(matches!(outcome, RectifyOutcome::Degenerate { vertices: 3 }));
        assert_eq!(outcome.dimensions(), (0, 0));
    }

    #[test]
    fn affine_solution_maps_control_points() {
        let from = [(10.0, 20.0), (110.0, 25.0), (105.0, 80.0)];
        let to = [(0.0, 0.0), (99.0, 0.0), (99.0, 59.0)];
        let m = affine_from_triangles(from, to).unwrap();
        for (src, dst) in from.iter().zip(to.iter()) {
            let x = m[0] * src.0 + m[1] * src.1 + m[2];
            let y = m[3] * src.0 + m[4] * src.1 + m[5];
            assert!((x - dst.0).abs() < 1e-3 && (y - dst.1).abs() < 1e-3);
        }
    }

    #[test]
    fn collinear_triangle_has_no_affine_solution() {
        let from = [(0.0, 0.0), (10.0, 10.0), (20.0, 20.0)];
        let to = [(0.0, 0.0), (9.0, 0.0), (9.0, 9.0)];
        assert!(affine_from_triangles(from, to).is_none());
    }
}
