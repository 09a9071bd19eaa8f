// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Marker decoding seam. Reading the printed code is left to the caller; the
// pipeline only needs the payload and the four corners.

use image::DynamicImage;
use markwerk_core::MarkerDetection;

/// Reads the fiducial marker off a working-resolution sheet.
///
/// Report an empty payload or no corners when nothing decodes; the pipeline
/// treats that as an unmarked sheet.
pub trait MarkerDecoder {
    fn decode(&self, image: &DynamicImage) -> MarkerDetection;
}

impl<F> MarkerDecoder for F
where
    F: Fn(&DynamicImage) -> MarkerDetection,
{
    fn decode(&self, image: &DynamicImage) -> MarkerDetection {
        self(image)
    }
}

/// Decoder that never finds a marker.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoMarker;

impl MarkerDecoder for NoMarker {
    fn decode(&self, _image: &DynamicImage) -> MarkerDetection {
        MarkerDetection::none()
    }
}

/// Decoder that reports the same detection for every sheet, for sheets whose
/// marker was read elsewhere.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct FixedMarker(pub MarkerDetection);

impl MarkerDecoder for FixedMarker {
    fn decode(&self, _image: &DynamicImage) -> MarkerDetection {
        self.0.clone()
    }
}
