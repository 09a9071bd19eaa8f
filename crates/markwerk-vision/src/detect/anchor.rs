// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Anchor location — the dark pixel or printed square vertex closest to each
// corner of the canvas.

use image::GrayImage;
use markwerk_core::Point;
use markwerk_core::config::SquareConfig;
use tracing::{debug, instrument};

use crate::detect::classify::is_square_like;
use crate::detect::contours::trace_all;

/// Nearest candidate to each canvas corner, in the order
/// `[top_left, top_right, bottom_right, bottom_left]`.
///
/// Distances are truncated to whole pixels; a later candidate only replaces
/// the current best when strictly closer. `None` when `candidates` is empty.
pub fn nearest_to_corners(
    width: u32,
    height: u32,
    candidates: impl IntoIterator<Item = Point>,
) -> Option<[Point; 4]> {
    let (w, h) = (width as i32, height as i32);
    let targets = [
        Point::new(0, 0),
        Point::new(w, 0),
        Point::new(w, h),
        Point::new(0, h),
    ];

    let best = candidates
        .into_iter()
        .fold(None::<[(i32, Point); 4]>, |best, p| {
            let scored = targets.map(|t| (p.truncated_distance(&t), p));
            Some(match best {
                None => scored,
                Some(mut current) => {
                    for (slot, candidate) in current.iter_mut().zip(scored) {
                        if candidate.0 < slot.0 {
                            *slot = candidate;
                        }
                    }
                    current
                }
            })
        })?;

    Some(best.map(|(_, p)| p))
}

/// Anchors from raw pixels: every pixel of value 0 outside the central box,
/// scanned column by column.
///
/// The central box covers the points strictly inside the middle third of both
/// axes (integer thirds).
#[instrument(skip_all, fields(width = binary.width(), height = binary.height()))]
pub fn anchor_points_by_pixels(binary: &GrayImage) -> Option<[Point; 4]> {
    let (cols, rows) = binary.dimensions();
    let (x_lo, x_hi) = (cols / 3, cols * 2 / 3);
    let (y_lo, y_hi) = (rows / 3, rows * 2 / 3);
    let in_centre = |x: u32, y: u32| x > x_lo && x < x_hi && y > y_lo && y < y_hi;

    let candidates = (0..cols)
        .flat_map(|x| (0..rows).map(move |y| (x, y)))
        .filter(|&(x, y)| !in_centre(x, y) && binary.get_pixel(x, y).0[0] == 0)
        .map(|(x, y)| Point::new(x as i32, y as i32));

    let anchors = nearest_to_corners(cols, rows, candidates);
    debug!(?anchors, "Pixel anchors located");
    anchors
}

/// Anchors from printed squares: every vertex of every square-like border
/// traced in `binary`.
#[instrument(skip_all, fields(width = binary.width(), height = binary.height()))]
pub fn anchor_points_by_squares(binary: &GrayImage, config: &SquareConfig) -> Option<[Point; 4]> {
    let squares: Vec<_> = trace_all(binary)
        .into_iter()
        .filter(|c| is_square_like(c, config))
        .collect();
    debug!(squares = squares.len(), "Square-like borders found");

    let (cols, rows) = binary.dimensions();
    let anchors = nearest_to_corners(
        cols,
        rows,
        squares.iter().flat_map(|c| c.points.iter().copied()),
    );
    debug!(?anchors, "Square anchors located");
    anchors
}
