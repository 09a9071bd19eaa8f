// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Fill sensing — share of ink pixels inside a rectangle of a binary sheet.

use image::GrayImage;
use markwerk_core::Rect;
use markwerk_core::config::FillConfig;
use markwerk_core::error::{MarkwerkError, Result};
use serde::Serialize;

/// Unrounded fraction of pixels in `rect` that are zero (ink).
///
/// `rect` must be non-empty and lie entirely inside `binary`.
pub fn ink_ratio(binary: &GrayImage, rect: Rect) -> Result<f64> {
    if rect.area() == 0 || !rect.fits_within(binary.width(), binary.height()) {
        return Err(MarkwerkError::invalid("rect", format!("{rect:?}")));
    }

    let (x0, y0) = (rect.x as u32, rect.y as u32);
    let mut nonzero = 0u64;
    for y in y0..y0 + rect.height {
        for x in x0..x0 + rect.width {
            if binary.get_pixel(x, y).0[0] != 0 {
                nonzero += 1;
            }
        }
    }
    let total = rect.area();
    Ok((total - nonzero) as f64 / total as f64)
}

/// Ink fraction rounded to two decimals.
pub fn fill_rate(binary: &GrayImage, rect: Rect) -> Result<f64> {
    ink_ratio(binary, rect).map(|ratio| (ratio * 100.0).round() / 100.0)
}

/// Whether the unrounded ink fraction exceeds `threshold`.
pub fn is_filled(binary: &GrayImage, rect: Rect, threshold: f64) -> Result<bool> {
    ink_ratio(binary, rect).map(|ratio| ratio > threshold)
}

/// One fill measurement.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct FillReading {
    pub rect: Rect,
    /// Ink fraction rounded to two decimals.
    pub rate: f64,
    pub filled: bool,
}

/// Reads bubble fill against a configured threshold.
#[derive(Debug, Clone, Copy, Default)]
pub struct FillRatioSensor {
    config: FillConfig,
}

impl FillRatioSensor {
    pub fn new(config: FillConfig) -> Self {
        Self { config }
    }

    pub fn read(&self, binary: &GrayImage, rect: Rect) -> Result<FillReading> {
        let ratio = ink_ratio(binary, rect)?;
        Ok(FillReading {
            rect,
            rate: (ratio * 100.0).round() / 100.0,
            filled: ratio > self.config.filled_threshold,
        })
    }

    /// Readings for several rectangles at once; fails on the first bad one.
    pub fn read_all(&self, binary: &GrayImage, rects: &[Rect]) -> Result<Vec<FillReading>> {
        rects.iter().map(|&rect| self.read(binary, rect)).collect()
    }
}
