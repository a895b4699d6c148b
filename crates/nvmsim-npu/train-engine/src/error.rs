// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

/*
 * Copyright 2025 Neuraville Inc.
 *
 * Licensed under the Apache License, Version 2.0 (the "License");
 * you may not use this file except in compliance with the License.
 */

use nvmsim_config::ConfigError;
use nvmsim_npu_device::DeviceError;
use nvmsim_npu_plasticity::PlasticityError;

#[derive(Debug, thiserror::Error)]
pub enum TrainError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Device error: {0}")]
    Device(#[from] DeviceError),

    #[error("Plasticity error: {0}")]
    Plasticity(#[from] PlasticityError),

    #[error("{what} has length {got}, expected {expected}")]
    ShapeMismatch {
        what: &'static str,
        expected: usize,
        got: usize,
    },

    #[error("Invalid dataset: {0}")]
    Dataset(String),

    #[error("Failed to build worker pool: {0}")]
    ThreadPool(#[from] rayon::ThreadPoolBuildError),

    #[error("Report serialization failed: {0}")]
    Serialization(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, TrainError>;
