// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Planar geometry over integer contours: perimeter, shoelace area, bounding
// rectangles, chain compression and closed-curve Douglas–Peucker.

use markwerk_core::{Point, Rect};
use serde::Serialize;

/// A closed polygonal boundary in trace order.
///
/// The last vertex connects back to the first; the closing point is not
/// repeated.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize)]
pub struct Contour {
    pub points: Vec<Point>,
}

impl Contour {
    pub fn new(points: Vec<Point>) -> Self {
        Self { points }
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    /// Closed perimeter.
    pub fn perimeter(&self) -> f64 {
        perimeter(&self.points)
    }

    /// Unsigned enclosed area.
    pub fn area(&self) -> f64 {
        polygon_area(&self.points)
    }

    pub fn bounding_rect(&self) -> Rect {
        bounding_rect(&self.points)
    }

    /// Douglas–Peucker simplification with `epsilon` in pixels.
    pub fn approximate(&self, epsilon: f64) -> Contour {
        Contour::new(approximate_closed(&self.points, epsilon))
    }
}

impl From<Vec<Point>> for Contour {
    fn from(points: Vec<Point>) -> Self {
        Self::new(points)
    }
}

/// Length of the closed polyline through `points`.
pub fn perimeter(points: &[Point]) -> f64 {
    if points.len() < 2 {
        return 0.0;
    }
    points
        .iter()
        .zip(points.iter().cycle().skip(1))
        .map(|(a, b)| a.distance(b))
        .sum()
}

/// Polygon area by the shoelace formula, orientation ignored.
pub fn polygon_area(points: &[Point]) -> f64 {
    let n = points.len();
    if n < 3 {
        return 0.0;
    }
    let twice: i64 = (0..n)
        .map(|i| {
            let a = points[i];
            let b = points[(i + 1) % n];
            i64::from(a.x) * i64::from(b.y) - i64::from(b.x) * i64::from(a.y)
        })
        .sum();
    twice.abs() as f64 / 2.0
}

/// Smallest upright rectangle covering every point, counted in whole pixels
/// (a single point has width and height 1).
pub fn bounding_rect(points: &[Point]) -> Rect {
    let Some(first) = points.first() else {
        return Rect::default();
    };
    let (min_x, min_y, max_x, max_y) = points.iter().fold(
        (first.x, first.y, first.x, first.y),
        |(min_x, min_y, max_x, max_y), p| {
            (min_x.min(p.x), min_y.min(p.y), max_x.max(p.x), max_y.max(p.y))
        },
    );
    Rect::new(
        min_x,
        min_y,
        (max_x - min_x + 1) as u32,
        (max_y - min_y + 1) as u32,
    )
}

/// Keep only the vertices of a closed chain where the direction changes, so
/// every straight run is represented by its two endpoints.
///
/// Consecutive duplicates are dropped first. A vertex survives unless the
/// incoming and outgoing steps are parallel and point the same way; reversals
/// (the tips of one-pixel spurs) are kept.
pub fn compress_chain(points: &[Point]) -> Vec<Point> {
    let mut deduped: Vec<Point> = Vec::with_capacity(points.len());
    for &p in points {
        if deduped.last() != Some(&p) {
            deduped.push(p);
        }
    }
    while deduped.len() > 1 && deduped.first() == deduped.last() {
        deduped.pop();
    }

    let n = deduped.len();
    if n < 3 {
        return deduped;
    }

    let kept: Vec<Point> = (0..n)
        .filter(|&i| {
            let prev = deduped[(i + n - 1) % n];
            let cur = deduped[i];
            let next = deduped[(i + 1) % n];
            let (ax, ay) = (cur.x - prev.x, cur.y - prev.y);
            let (bx, by) = (next.x - cur.x, next.y - cur.y);
            let cross = i64::from(ax) * i64::from(by) - i64::from(ay) * i64::from(bx);
            let dot = i64::from(ax) * i64::from(bx) + i64::from(ay) * i64::from(by);
            cross != 0 || dot < 0
        })
        .map(|i| deduped[i])
        .collect();

    // A closed chain that is one straight segment traced out and back keeps
    // its two tips; anything degenerate beyond that falls back to the input.
    if kept.is_empty() { deduped } else { kept }
}

/// Douglas–Peucker simplification of a closed curve.
///
/// The curve is split at two mutually distant vertices (the vertex farthest
/// from the first point, then the vertex farthest from that one), each half
/// is simplified as an open chain, and the result keeps the input's cyclic
/// order, starting from the surviving vertex with the lowest input index.
pub fn approximate_closed(points: &[Point], epsilon: f64) -> Vec<Point> {
    let n = points.len();
    if n <= 2 {
        return points.to_vec();
    }

    let farthest_from = |origin: usize| -> usize {
        (0..n)
            .max_by(|&a, &b| {
                let da = points[origin].distance(&points[a]);
                let db = points[origin].distance(&points[b]);
                da.total_cmp(&db).then(b.cmp(&a))
            })
            .unwrap_or(origin)
    };
    let a = farthest_from(0);
    let b = farthest_from(a);
    if a == b {
        return vec![points[0]];
    }

    // Indices along the cycle from `from` to `to`, both inclusive.
    let cycle = |from: usize, to: usize| -> Vec<usize> {
        let steps = (to + n - from) % n;
        (0..=steps).map(|k| (from + k) % n).collect()
    };

    let mut keep = vec![false; n];
    for chain in [cycle(a, b), cycle(b, a)] {
        simplify_open(points, &chain, epsilon, &mut keep);
    }

    keep.iter()
        .enumerate()
        .filter(|&(_, &kept)| kept)
        .map(|(i, _)| points[i])
        .collect()
}

/// Mark the vertices of the open chain `chain` (indices into `points`) that
/// survive Douglas–Peucker at `epsilon`. Endpoints always survive.
fn simplify_open(points: &[Point], chain: &[usize], epsilon: f64, keep: &mut [bool]) {
    let (Some(&first), Some(&last)) = (chain.first(), chain.last()) else {
        return;
    };
    keep[first] = true;
    keep[last] = true;

    let mut stack = vec![(0usize, chain.len() - 1)];
    while let Some((start, end)) = stack.pop() {
        if end <= start + 1 {
            continue;
        }
        let (p, q) = (points[chain[start]], points[chain[end]]);
        let (split, distance) = ((start + 1)..end)
            .map(|k| (k, segment_distance(points[chain[k]], p, q)))
            .fold((start, -1.0f64), |best, candidate| {
                if candidate.1 > best.1 { candidate } else { best }
            });
        if distance > epsilon {
            keep[chain[split]] = true;
            stack.push((start, split));
            stack.push((split, end));
        }
    }
}

/// Distance from `p` to the line through `a` and `b`; to `a` itself when the
/// two coincide.
fn segment_distance(p: Point, a: Point, b: Point) -> f64 {
    let (dx, dy) = (f64::from(b.x - a.x), f64::from(b.y - a.y));
    let length = dx.hypot(dy);
    if length == 0.0 {
        return p.distance(&a);
    }
    let cross = dx * f64::from(p.y - a.y) - dy * f64::from(p.x - a.x);
    cross.abs() / length
}
