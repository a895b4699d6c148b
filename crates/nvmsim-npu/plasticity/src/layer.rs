// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

/*
 * Copyright 2025 Neuraville Inc.
 *
 * Licensed under the Apache License, Version 2.0 (the "License");
 * you may not use this file except in compliance with the License.
 */

//! One synaptic layer: algorithmic weights, optimizer state, crossbar and peripherals

use ndarray::Array2;
use tracing::debug;

use nvmsim_npu_device::{CellTemplate, Crossbar, NeuronPeripherals, SubArray, Technology, WeightBounds};

use crate::error::{PlasticityError, Result};
use crate::history::{new_history, HistoryMatrix};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LayerId {
    /// Input to hidden
    InputHidden = 1,
    /// Hidden to output
    HiddenOutput = 2,
}

impl LayerId {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::InputHidden => "IH",
            Self::HiddenOutput => "HO",
        }
    }
}

#[derive(Debug, Clone)]
pub struct SynapticLayer {
    pub id: LayerId,
    /// `[[j, k]]`: output `j`, input `k`
    pub weights: Array2<f64>,
    pub history: HistoryMatrix,
    pub crossbar: Crossbar,
    pub subarray: SubArray,
}

impl SynapticLayer {
    /// Build the crossbar for `weights` and program it. Entries of `weights` are replaced by
    /// the values the cells actually hold.
    pub fn new(
        id: LayerId,
        mut weights: Array2<f64>,
        template: &CellTemplate,
        technology: &Technology,
        peripherals: NeuronPeripherals,
        bounds: &WeightBounds,
    ) -> Result<Self> {
        let (num_col, num_row) = weights.dim();
        if let Some(bad) = weights.iter().find(|w| !w.is_finite()) {
            return Err(PlasticityError::InvalidSetting {
                field: "weights",
                reason: format!("non-finite initial weight {}", bad),
            });
        }
        let mut crossbar = Crossbar::new(num_col, num_row, template, technology)?;
        crossbar.initialize_weights(&mut weights, bounds)?;
        let subarray = SubArray::new(num_row, num_col, crossbar.kind(), crossbar.cmos_access(), peripherals);
        debug!(
            target: "nvmsim-npu-plasticity",
            "Layer {} ready: {} outputs x {} inputs",
            id.as_str(),
            num_col,
            num_row
        );
        Ok(Self {
            id,
            weights,
            history: new_history(num_col, num_row),
            crossbar,
            subarray,
        })
    }

    #[inline]
    pub fn num_inputs(&self) -> usize {
        self.weights.ncols()
    }

    #[inline]
    pub fn num_outputs(&self) -> usize {
        self.weights.nrows()
    }

    /// Largest distance between an algorithmic weight and its cell's realized weight.
    pub fn max_weight_mismatch(&self, bounds: &WeightBounds) -> f64 {
        self.weights
            .indexed_iter()
            .map(|((j, k), w)| (self.crossbar.conductance_to_weight(j, k, bounds) - w).abs())
            .fold(0.0, f64::max)
    }
}
