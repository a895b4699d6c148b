// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

/*
 * Copyright 2025 Neuraville Inc.
 *
 * Licensed under the Apache License, Version 2.0 (the "License");
 * you may not use this file except in compliance with the License.
 */

//! Plasticity error types

use nvmsim_npu_device::DeviceError;
use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq)]
pub enum PlasticityError {
    #[error("Device error: {0}")]
    Device(#[from] DeviceError),

    #[error("Length mismatch for {what}: expected {expected}, got {got}")]
    LengthMismatch {
        what: &'static str,
        expected: usize,
        got: usize,
    },

    #[error("Invalid update setting '{field}': {reason}")]
    InvalidSetting { field: &'static str, reason: String },
}

pub type Result<T> = std::result::Result<T, PlasticityError>;
