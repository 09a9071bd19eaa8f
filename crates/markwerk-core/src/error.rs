// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Unified error types for Markwerk.
//
// Only conditions that make a sheet unprocessable live here. Recognition
// failures (missing marker, wrong region count, degenerate quadrilateral) are
// ordinary values on the sheet report so a batch survives a bad sheet.

use thiserror::Error;

/// Top-level error type for all Markwerk operations.
#[derive(Debug, Error)]
pub enum MarkwerkError {
    // -- Input errors --
    #[error("input image unavailable: {0}")]
    InputUnavailable(String),

    #[error("image processing failed: {0}")]
    ImageError(String),

    // -- Configuration / query errors --
    #[error("invalid parameter: {parameter} = {value}")]
    InvalidParameter { parameter: String, value: String },

    // -- Storage / persistence --
    #[error("file I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl MarkwerkError {
    /// Shorthand for an [`MarkwerkError::InvalidParameter`].
    pub fn invalid(parameter: impl Into<String>, value: impl ToString) -> Self {
        Self::InvalidParameter {
            parameter: parameter.into(),
            value: value.to_string(),
        }
    }
}

/// Alias used throughout the codebase.
pub type Result<T> = std::result::Result<T, MarkwerkError>;
