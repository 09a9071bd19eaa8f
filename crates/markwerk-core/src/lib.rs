// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Markwerk — Core types, configuration and error definitions shared by the
// answer-sheet pipeline crates.

pub mod config;
pub mod error;
pub mod telemetry;
pub mod types;

pub use config::PipelineConfig;
pub use error::{MarkwerkError, Result};
pub use types::*;
