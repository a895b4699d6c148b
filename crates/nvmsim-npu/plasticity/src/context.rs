// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

/*
 * Copyright 2025 Neuraville Inc.
 *
 * Licensed under the Apache License, Version 2.0 (the "License");
 * you may not use this file except in compliance with the License.
 */

//! Run-wide accumulators shared by every layer update

use serde::{Deserialize, Serialize};

/// Totals of one training run. Passed by `&mut` through the update calls and reset at
/// the start of a run.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SimulationContext {
    /// Sum over write batches of the largest clamped weight change in the batch
    pub total_weight_update: f64,
    /// Sum over write batches of the largest absolute pulse count in the batch
    pub total_num_pulse: u64,
    /// Synapse flushes dropped because the optimizer name was not recognized
    pub skipped_flushes: u64,
    /// Energy contributions discarded as NaN
    pub nan_energy_events: u64,
    /// Firing probabilities that had to be clamped into `[0, 1]`
    pub clamped_probabilities: u64,
    /// Writes that hit a device conductance bound
    pub saturated_writes: u64,
    pub transfer_passes: u64,
}

impl SimulationContext {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn reset(&mut self) {
        *self = Self::default();
    }
}
