// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

/*
 * Copyright 2025 Neuraville Inc.
 *
 * Licensed under the Apache License, Version 2.0 (the "License");
 * you may not use this file except in compliance with the License.
 */

//! Per-synapse gradient accumulator and optimizer state

use ndarray::Array2;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct SynapseHistory {
    /// Gradient accumulated since the last flush
    pub grad_sum: f64,
    /// First-moment state (Momentum, Adam)
    pub momentum_prev: f64,
    /// Second-moment state (RMSprop, Adam) or running square sum (Adagrad)
    pub grad_square_prev: f64,
    /// Sum of requested deltas over the run
    pub total_delta: f64,
    pub total_delta_abs: f64,
}

impl SynapseHistory {
    #[inline]
    pub fn record_delta(&mut self, delta: f64) {
        self.total_delta += delta;
        self.total_delta_abs += delta.abs();
    }
}

/// One history record per synapse, indexed `[[j, k]]` like the weight matrix.
pub type HistoryMatrix = Array2<SynapseHistory>;

pub fn new_history(num_col: usize, num_row: usize) -> HistoryMatrix {
    Array2::from_elem((num_col, num_row), SynapseHistory::default())
}

/// Sum of `total_delta_abs` over a layer.
pub fn total_requested_change(history: &HistoryMatrix) -> f64 {
    history.iter().map(|h| h.total_delta_abs).sum()
}
