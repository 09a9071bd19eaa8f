// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Raster module — sheet loading, working-width resize, grayscale,
// binarization, morphology and crops.

pub mod processor;

pub use processor::{SheetImage, close, crop, dilate, erode, invert, threshold_binary};
