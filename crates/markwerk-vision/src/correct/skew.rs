// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Skew correction from the fiducial marker. The page angle is read off the
// marker's lower edge and the whole sheet is rotated rigidly about its
// centre, keeping the canvas size.

use image::{DynamicImage, Luma, Rgb, Rgba};
use imageproc::geometric_transformations::rotate_about_center;
use markwerk_core::config::SkewConfig;
use markwerk_core::{MarkerDetection, PointF, SkewStatus};
use tracing::{debug, info, instrument};

use super::rectify::interpolation;

/// Angle in degrees of the direction from `(x1, y1)` to `(x2, y2)`.
///
/// Vertical directions map to +90 (pointing down the page) or -90; all others
/// to `atan(dy / dx)`, so the result always lies in [-90, 90].
pub fn azimuth_angle(x1: f64, y1: f64, x2: f64, y2: f64) -> f64 {
    let dx = x2 - x1;
    let dy = y2 - y1;
    if dx == 0.0 {
        return if dy > 0.0 { 90.0 } else { -90.0 };
    }
    (dy / dx).atan().to_degrees()
}

/// Skew of a marker given its four corners in any order.
///
/// Corners are sorted by `y` then `x`; the angle is the azimuth from the third
/// to the fourth, i.e. along the two lowest corners.
pub fn skew_angle(corners: &[PointF; 4]) -> f64 {
    let mut sorted = *corners;
    sorted.sort_by(|a, b| a.y.total_cmp(&b.y).then(a.x.total_cmp(&b.x)));
    azimuth_angle(
        f64::from(sorted[2].x),
        f64::from(sorted[2].y),
        f64::from(sorted[3].x),
        f64::from(sorted[3].y),
    )
}

/// Result of the skew stage.
#[derive(Debug, Clone)]
pub struct SkewCorrection {
    /// The corrected sheet, or a copy of the input when skipped.
    pub image: DynamicImage,
    pub status: SkewStatus,
}

/// Rotates sheets upright using the marker corners.
#[derive(Debug, Clone, Copy, Default)]
pub struct SkewCorrector {
    config: SkewConfig,
}

impl SkewCorrector {
    pub fn new(config: SkewConfig) -> Self {
        Self { config }
    }

    /// Correct skew using `marker`. An unmarked sheet passes through
    /// unchanged with [`SkewStatus::Skipped`].
    #[instrument(skip_all, fields(width = image.width(), height = image.height()))]
    pub fn correct(&self, image: &DynamicImage, marker: &MarkerDetection) -> SkewCorrection {
        let Some(corners) = marker.decoded_corners() else {
            info!("No marker decoded; skew correction skipped");
            return SkewCorrection {
                image: image.clone(),
                status: SkewStatus::Skipped,
            };
        };

        let angle = skew_angle(&corners);
        debug!(angle, ?corners, "Marker skew measured");
        SkewCorrection {
            image: self.rotate(image, angle),
            status: SkewStatus::Corrected {
                angle_degrees: angle,
            },
        }
    }

    /// Rotate `image` about its centre by `degrees`, counter-clockwise as
    /// seen on screen, without rescaling. Uncovered pixels take the
    /// configured border value and pixels are sampled with the configured
    /// filter. A zero angle returns a copy.
    #[instrument(skip(self, image), fields(degrees))]
    pub fn rotate(&self, image: &DynamicImage, degrees: f64) -> DynamicImage {
        if degrees == 0.0 {
            return image.clone();
        }

        // imageproc rotates clockwise for positive theta.
        let theta = (-degrees).to_radians() as f32;
        let fill = self.config.border_value;
        let filter = interpolation(self.config.resampling);

        let rotated = match image {
            DynamicImage::ImageLuma8(gray) => DynamicImage::ImageLuma8(rotate_about_center(
                gray,
                theta,
                filter,
                Luma([fill]),
            )),
            DynamicImage::ImageRgb8(rgb) => DynamicImage::ImageRgb8(rotate_about_center(
                rgb,
                theta,
                filter,
                Rgb([fill, fill, fill]),
            )),
            other => DynamicImage::ImageRgba8(rotate_about_center(
                &other.to_rgba8(),
                theta,
                filter,
                Rgba([fill, fill, fill, 255]),
            )),
        };

        info!(degrees, "Sheet rotated");
        rotated
    }
}
