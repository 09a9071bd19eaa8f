// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Core domain types for the Markwerk answer-sheet pipeline.

use serde::{Deserialize, Serialize};

/// Integer pixel coordinate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct Point {
    pub x: i32,
    pub y: i32,
}

impl Point {
    pub const fn new(x: i32, y: i32) -> Self {
        Self { x, y }
    }

    /// Euclidean distance to `other`.
    pub fn distance(&self, other: &Point) -> f64 {
        let dx = f64::from(self.x - other.x);
        let dy = f64::from(self.y - other.y);
        dx.hypot(dy)
    }

    /// Euclidean distance truncated towards zero, the unit used for marker
    /// widths and anchor distances.
    pub fn truncated_distance(&self, other: &Point) -> i32 {
        self.distance(other) as i32
    }
}

impl From<PointF> for Point {
    /// Truncates towards zero.
    fn from(p: PointF) -> Self {
        Self::new(p.x as i32, p.y as i32)
    }
}

/// Sub-pixel coordinate, as reported by marker decoders.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct PointF {
    pub x: f32,
    pub y: f32,
}

impl PointF {
    pub const fn new(x: f32, y: f32) -> Self {
        Self { x, y }
    }
}

impl From<Point> for PointF {
    fn from(p: Point) -> Self {
        Self::new(p.x as f32, p.y as f32)
    }
}

/// Axis-aligned integer rectangle. `x`/`y` is the top-left corner.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct Rect {
    pub x: i32,
    pub y: i32,
    pub width: u32,
    pub height: u32,
}

impl Rect {
    pub const fn new(x: i32, y: i32, width: u32, height: u32) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    /// Pixel area (`width * height`).
    pub fn area(&self) -> u64 {
        u64::from(self.width) * u64::from(self.height)
    }

    /// Width divided by height; `0.0` for a zero-height rectangle.
    pub fn aspect_ratio(&self) -> f64 {
        if self.height == 0 {
            return 0.0;
        }
        f64::from(self.width) / f64::from(self.height)
    }

    /// Whether the rectangle lies entirely inside a `width` x `height` buffer.
    pub fn fits_within(&self, width: u32, height: u32) -> bool {
        self.x >= 0
            && self.y >= 0
            && u64::from(self.x as u32) + u64::from(self.width) <= u64::from(width)
            && u64::from(self.y as u32) + u64::from(self.height) <= u64::from(height)
    }
}

/// What the upstream marker decoder reported for one sheet.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct MarkerDetection {
    /// Decoded payload; empty when nothing was decoded.
    pub payload: String,
    /// The four marker corners in decoder order, if located.
    pub corners: Option<[PointF; 4]>,
}

impl MarkerDetection {
    pub fn new(payload: impl Into<String>, corners: Option<[PointF; 4]>) -> Self {
        Self {
            payload: payload.into(),
            corners,
        }
    }

    /// A sheet with no readable marker.
    pub fn none() -> Self {
        Self::default()
    }

    /// True when both a non-blank payload and the corners are present.
    pub fn is_decoded(&self) -> bool {
        !self.payload.trim().is_empty() && self.corners.is_some()
    }

    /// Corners of a usable detection, or `None` for an unmarked sheet.
    pub fn decoded_corners(&self) -> Option<[PointF; 4]> {
        if self.is_decoded() { self.corners } else { None }
    }

    /// Pixel distance between corner 0 and corner 1, with both corners
    /// truncated to whole pixels first. `0` for an unmarked sheet.
    pub fn reference_width(&self) -> u32 {
        match self.decoded_corners() {
            Some(corners) => {
                let a = Point::from(corners[0]);
                let b = Point::from(corners[1]);
                a.truncated_distance(&b).max(0) as u32
            }
            None => 0,
        }
    }
}

/// Whether skew correction ran for a sheet.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum SkewStatus {
    /// The image was rotated by `angle_degrees` about its centre.
    Corrected { angle_degrees: f64 },
    /// No marker was decoded; the image passed through unrotated.
    Skipped,
}

/// Role of an accepted region, assigned by discovery order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum RegionRole {
    /// Answer bubbles for the questions.
    Questions,
    /// Subject selection block.
    Subject,
    /// Grade / class selection block.
    Grade,
    /// Any region beyond the first three.
    Auxiliary,
}

impl RegionRole {
    pub fn for_index(index: usize) -> Self {
        match index {
            0 => Self::Questions,
            1 => Self::Subject,
            2 => Self::Grade,
            _ => Self::Auxiliary,
        }
    }
}

/// A recoverable recognition problem on one sheet.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum SheetIssue {
    /// No marker payload or corners were decoded; skew was not corrected.
    MarkerNotFound,
    /// The classifier accepted a different number of regions than the layout
    /// requires. No regions were cropped or rectified.
    RegionCountMismatch { expected: usize, found: usize },
    /// A region's corner re-approximation did not produce a quadrilateral.
    DegenerateApproximation { region: usize, vertices: usize },
    /// The rectifying transform for a region could not be solved.
    SingularTransform { region: usize },
}

impl std::fmt::Display for SheetIssue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::MarkerNotFound => write!(f, "marker not found, skew correction skipped"),
            Self::RegionCountMismatch { expected, found } => {
                write!(f, "expected {expected} regions, found {found}")
            }
            Self::DegenerateApproximation { region, vertices } => write!(
                f,
                "region {region} approximates to {vertices} vertices instead of 4"
            ),
            Self::SingularTransform { region } => {
                write!(f, "region {region} has no solvable rectifying transform")
            }
        }
    }
}
