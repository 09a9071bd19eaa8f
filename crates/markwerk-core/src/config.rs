// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Pipeline configuration. Every empirically tuned threshold of the sheet
// pipeline lives here with its production default.

use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::{MarkwerkError, Result};

/// Complete settings for processing one answer sheet.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    /// Resize input to this width (aspect preserved) before anything else.
    /// `None` keeps the original resolution.
    pub working_width: Option<u32>,
    /// Global threshold for binarization: pixels above become white.
    pub binary_threshold: u8,
    /// Multiplier applied to the marker width to obtain the classifier's
    /// reference width.
    pub region_scale: f64,
    /// Rectify each accepted region in addition to cropping it.
    pub rectify_regions: bool,
    pub skew: SkewConfig,
    pub edges: EdgeParams,
    pub classifier: ClassifierConfig,
    pub square: SquareConfig,
    pub rectifier: RectifierConfig,
    pub fill: FillConfig,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            working_width: Some(2684),
            binary_threshold: 200,
            region_scale: 1.0,
            rectify_regions: true,
            skew: SkewConfig::default(),
            edges: EdgeParams::default(),
            classifier: ClassifierConfig::default(),
            square: SquareConfig::default(),
            rectifier: RectifierConfig::default(),
            fill: FillConfig::default(),
        }
    }
}

impl PipelineConfig {
    /// Parse a configuration from JSON. Missing fields take their defaults.
    pub fn from_json(json: &str) -> Result<Self> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    /// Serialize the configuration to pretty-printed JSON.
    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Reject settings no stage can honour.
    pub fn validate(&self) -> Result<()> {
        if self.working_width == Some(0) {
            return Err(MarkwerkError::invalid("working_width", 0));
        }
        if !(self.region_scale.is_finite() && self.region_scale > 0.0) {
            return Err(MarkwerkError::invalid("region_scale", self.region_scale));
        }
        self.edges.validate()?;
        self.classifier.validate()?;
        self.square.validate()?;
        self.rectifier.validate()?;
        self.fill.validate()
    }
}

/// Skew correction settings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct SkewConfig {
    /// Gray level written into canvas areas uncovered by the rotation
    /// (black by default).
    pub border_value: u8,
    /// Filter used for the rotation.
    pub resampling: Resampling,
}

/// Edge detection parameters.
///
/// Also parses from the compact `"threshold1,threshold2,aperture,precise"`
/// form, e.g. `"0,90,3,true"`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EdgeParams {
    /// Lower hysteresis threshold.
    pub threshold1: f32,
    /// Upper hysteresis threshold.
    pub threshold2: f32,
    /// Sobel aperture size. Only 3 is available.
    pub aperture_size: u32,
    /// Use the L2 gradient magnitude. Only `true` is available.
    pub precise_gradient: bool,
    /// Taps of the separable Gaussian smoothing kernel (odd, at least 3).
    pub blur_kernel_size: u32,
}

impl Default for EdgeParams {
    fn default() -> Self {
        Self {
            threshold1: 0.0,
            threshold2: 90.0,
            aperture_size: 3,
            precise_gradient: true,
            blur_kernel_size: 3,
        }
    }
}

impl EdgeParams {
    /// Gaussian sigma for the configured kernel size, using the usual
    /// `0.3 * ((k - 1) * 0.5 - 1) + 0.8` rule for an unspecified sigma.
    pub fn blur_sigma(&self) -> f32 {
        let k = self.blur_kernel_size as f32;
        0.3 * ((k - 1.0) * 0.5 - 1.0) + 0.8
    }

    /// One-dimensional smoothing kernel of exactly `blur_kernel_size` taps,
    /// summing to 1.
    ///
    /// Sizes 3, 5 and 7 use the binomial weights (`[1/4, 1/2, 1/4]` for 3);
    /// larger sizes sample a Gaussian at [`EdgeParams::blur_sigma`].
    pub fn blur_kernel(&self) -> Vec<f32> {
        match self.blur_kernel_size {
            3 => vec![0.25, 0.5, 0.25],
            5 => vec![0.0625, 0.25, 0.375, 0.25, 0.0625],
            7 => vec![
                0.03125, 0.109375, 0.21875, 0.28125, 0.21875, 0.109375, 0.03125,
            ],
            k => {
                let sigma = f64::from(self.blur_sigma());
                let centre = f64::from(k / 2);
                let raw: Vec<f64> = (0..k)
                    .map(|i| {
                        let d = f64::from(i) - centre;
                        (-(d * d) / (2.0 * sigma * sigma)).exp()
                    })
                    .collect();
                let sum: f64 = raw.iter().sum();
                raw.iter().map(|w| (w / sum) as f32).collect()
            }
        }
    }

    pub fn validate(&self) -> Result<()> {
        if !(self.threshold1.is_finite() && self.threshold1 >= 0.0) {
            return Err(MarkwerkError::invalid("edges.threshold1", self.threshold1));
        }
        if !(self.threshold2.is_finite() && self.threshold2 >= self.threshold1) {
            return Err(MarkwerkError::invalid("edges.threshold2", self.threshold2));
        }
        if self.aperture_size != 3 {
            return Err(MarkwerkError::invalid("edges.aperture_size", self.aperture_size));
        }
        if !self.precise_gradient {
            return Err(MarkwerkError::invalid("edges.precise_gradient", false));
        }
        if self.blur_kernel_size < 3 || self.blur_kernel_size % 2 == 0 {
            return Err(MarkwerkError::invalid(
                "edges.blur_kernel_size",
                self.blur_kernel_size,
            ));
        }
        Ok(())
    }
}

impl FromStr for EdgeParams {
    type Err = MarkwerkError;

    fn from_str(s: &str) -> Result<Self> {
        let fields: Vec<&str> = s.split(',').map(str::trim).collect();
        let [t1, t2, aperture, precise] = fields.as_slice() else {
            return Err(MarkwerkError::invalid("edges", s));
        };
        let params = Self {
            threshold1: t1
                .parse()
                .map_err(|_| MarkwerkError::invalid("edges.threshold1", t1))?,
            threshold2: t2
                .parse()
                .map_err(|_| MarkwerkError::invalid("edges.threshold2", t2))?,
            aperture_size: aperture
                .parse()
                .map_err(|_| MarkwerkError::invalid("edges.aperture_size", aperture))?,
            precise_gradient: precise
                .to_ascii_lowercase()
                .parse()
                .map_err(|_| MarkwerkError::invalid("edges.precise_gradient", precise))?,
            ..Self::default()
        };
        Ok(params)
    }
}

/// Accept/reject thresholds for content regions, all relative to the
/// reference width `W`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClassifierConfig {
    /// Perimeter must be at least this many `W`.
    pub min_perimeter_factor: f64,
    /// Perimeter must be at most this many `W`.
    pub max_perimeter_factor: f64,
    /// Bounding width must be at least this many `W`.
    pub min_width_factor: f64,
    /// Bounding height must be at least `W / height_divisor * min_height_factor`.
    pub height_divisor: f64,
    pub min_height_factor: f64,
    /// Allowed relative difference between contour area and bounding area.
    pub rectangularity_tolerance: f64,
    /// Number of regions the sheet layout defines.
    pub expected_regions: usize,
}

impl Default for ClassifierConfig {
    fn default() -> Self {
        Self {
            min_perimeter_factor: 2.0,
            max_perimeter_factor: 5.0,
            min_width_factor: 0.8,
            height_divisor: 21.0,
            min_height_factor: 0.5,
            rectangularity_tolerance: 0.2,
            expected_regions: 4,
        }
    }
}

impl ClassifierConfig {
    pub fn validate(&self) -> Result<()> {
        if !(self.min_perimeter_factor >= 0.0
            && self.max_perimeter_factor >= self.min_perimeter_factor)
        {
            return Err(MarkwerkError::invalid(
                "classifier.max_perimeter_factor",
                self.max_perimeter_factor,
            ));
        }
        if !(self.height_divisor > 0.0) {
            return Err(MarkwerkError::invalid(
                "classifier.height_divisor",
                self.height_divisor,
            ));
        }
        if !(0.0..=1.0).contains(&self.rectangularity_tolerance) {
            return Err(MarkwerkError::invalid(
                "classifier.rectangularity_tolerance",
                self.rectangularity_tolerance,
            ));
        }
        if self.expected_regions == 0 {
            return Err(MarkwerkError::invalid("classifier.expected_regions", 0));
        }
        Ok(())
    }
}

/// The square-like predicate used by the anchor locator.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SquareConfig {
    /// Smallest accepted bounding side, in pixels.
    pub min_side: u32,
    /// Largest accepted bounding side, in pixels.
    pub max_side: u32,
    /// Contour area must be at least this fraction of the bounding area.
    pub min_fill: f64,
    /// Allowed deviation of width/height from 1.0.
    pub aspect_tolerance: f64,
}

impl Default for SquareConfig {
    fn default() -> Self {
        Self {
            min_side: 10,
            max_side: 100,
            min_fill: 0.8,
            aspect_tolerance: 0.2,
        }
    }
}

impl SquareConfig {
    pub fn validate(&self) -> Result<()> {
        if self.max_side < self.min_side {
            return Err(MarkwerkError::invalid("square.max_side", self.max_side));
        }
        if !(0.0..=1.0).contains(&self.min_fill) {
            return Err(MarkwerkError::invalid("square.min_fill", self.min_fill));
        }
        Ok(())
    }
}

/// How a quadrilateral is mapped onto an upright rectangle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum RectifyStrategy {
    /// Four-point homography.
    #[default]
    Perspective,
    /// Three-point affine map (top-left, top-right, bottom-right).
    Affine,
}

/// Resampling filter, chosen separately for skew rotation and for
/// rectification.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum Resampling {
    Nearest,
    #[default]
    Bilinear,
    Bicubic,
}

/// Rectification settings.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RectifierConfig {
    /// Douglas–Peucker tolerance as a fraction of the contour perimeter.
    pub approx_epsilon_ratio: f64,
    /// Rotate the corner cycle by one when corner 0 and corner 3 are further
    /// apart than this horizontally.
    pub reorder_tolerance_px: i32,
    pub strategy: RectifyStrategy,
    pub resampling: Resampling,
}

impl Default for RectifierConfig {
    fn default() -> Self {
        Self {
            approx_epsilon_ratio: 0.02,
            reorder_tolerance_px: 100,
            strategy: RectifyStrategy::Perspective,
            resampling: Resampling::Bilinear,
        }
    }
}

impl RectifierConfig {
    pub fn validate(&self) -> Result<()> {
        if !(self.approx_epsilon_ratio > 0.0 && self.approx_epsilon_ratio < 1.0) {
            return Err(MarkwerkError::invalid(
                "rectifier.approx_epsilon_ratio",
                self.approx_epsilon_ratio,
            ));
        }
        if self.reorder_tolerance_px < 0 {
            return Err(MarkwerkError::invalid(
                "rectifier.reorder_tolerance_px",
                self.reorder_tolerance_px,
            ));
        }
        Ok(())
    }
}

/// Fill sensing settings.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FillConfig {
    /// A rectangle counts as filled when its ink ratio exceeds this.
    pub filled_threshold: f64,
}

impl Default for FillConfig {
    fn default() -> Self {
        Self {
            filled_threshold: 0.25,
        }
    }
}

impl FillConfig {
    pub fn validate(&self) -> Result<()> {
        if !(0.0..=1.0).contains(&self.filled_threshold) {
            return Err(MarkwerkError::invalid(
                "fill.filled_threshold",
                self.filled_threshold,
            ));
        }
        Ok(())
    }
}
