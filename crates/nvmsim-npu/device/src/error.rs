// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

/*
 * Copyright 2025 Neuraville Inc.
 *
 * Licensed under the Apache License, Version 2.0 (the "License");
 * you may not use this file except in compliance with the License.
 */

//! Device-layer error types

use thiserror::Error;

/// Errors raised while constructing device cells and arrays.
///
/// Per-pulse numeric conditions (saturation, degenerate energies) are never errors;
/// they are clamped or counted by the caller.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum DeviceError {
    #[error("Invalid device parameter '{field}': {reason}")]
    InvalidParameter { field: &'static str, reason: String },

    #[error("Weight bounds invalid: min {min} must be below max {max}")]
    InvalidWeightBounds { min: f64, max: f64 },

    #[error("Shape mismatch: expected {expected_cols}x{expected_rows}, got {cols}x{rows}")]
    ShapeMismatch {
        expected_cols: usize,
        expected_rows: usize,
        cols: usize,
        rows: usize,
    },

    #[error("Crossbar must have at least one row and one column (got {cols}x{rows})")]
    EmptyArray { cols: usize, rows: usize },
}

pub type Result<T> = std::result::Result<T, DeviceError>;
