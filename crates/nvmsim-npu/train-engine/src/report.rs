// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

/*
 * Copyright 2025 Neuraville Inc.
 *
 * Licensed under the Apache License, Version 2.0 (the "License");
 * you may not use this file except in compliance with the License.
 */

//! Run report

use serde::{Deserialize, Serialize};

use nvmsim_npu_plasticity::{SimulationContext, SynapticLayer};

use crate::error::Result;

/// Cumulative energy (J) and latency (s) of one crossbar and its peripherals.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ArrayReport {
    pub layer: String,
    pub num_col: usize,
    pub num_row: usize,

    pub array_read_energy: f64,
    pub array_write_energy: f64,
    pub array_transfer_energy: f64,
    pub array_transfer_read_energy: f64,
    pub array_transfer_write_energy: f64,

    pub read_dynamic_energy: f64,
    pub read_latency: f64,
    pub write_dynamic_energy: f64,
    pub write_latency: f64,
    pub transfer_read_dynamic_energy: f64,
    pub transfer_read_latency: f64,
    pub transfer_write_dynamic_energy: f64,
    pub transfer_write_latency: f64,
    pub transfer_dynamic_energy: f64,
    pub transfer_latency: f64,
}

impl ArrayReport {
    pub fn from_layer(layer: &SynapticLayer) -> Self {
        let c = &layer.crossbar;
        let s = &layer.subarray;
        Self {
            layer: layer.id.as_str().to_string(),
            num_col: c.num_col(),
            num_row: c.num_row(),
            array_read_energy: c.read_energy,
            array_write_energy: c.write_energy,
            array_transfer_energy: c.transfer_energy,
            array_transfer_read_energy: c.transfer_read_energy,
            array_transfer_write_energy: c.transfer_write_energy,
            read_dynamic_energy: s.read_dynamic_energy,
            read_latency: s.read_latency,
            write_dynamic_energy: s.write_dynamic_energy,
            write_latency: s.write_latency,
            transfer_read_dynamic_energy: s.transfer_read_dynamic_energy,
            transfer_read_latency: s.transfer_read_latency,
            transfer_write_dynamic_energy: s.transfer_write_dynamic_energy,
            transfer_write_latency: s.transfer_write_latency,
            transfer_dynamic_energy: s.transfer_dynamic_energy,
            transfer_latency: s.transfer_latency,
        }
    }

    /// Array plus peripheral energy of all phases.
    pub fn total_energy(&self) -> f64 {
        self.array_read_energy
            + self.array_write_energy
            + self.array_transfer_energy
            + self.read_dynamic_energy
            + self.write_dynamic_energy
            + self.transfer_dynamic_energy
    }

    pub fn total_latency(&self) -> f64 {
        self.read_latency + self.write_latency + self.transfer_latency
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TrainingReport {
    pub optimizer: String,
    pub cell: String,
    pub epochs: u32,
    pub samples_seen: u64,
    /// Mean squared output error per epoch
    pub epoch_loss: Vec<f64>,
    pub arrays: Vec<ArrayReport>,
    pub totals: SimulationContext,
}

impl TrainingReport {
    pub fn total_energy(&self) -> f64 {
        self.arrays.iter().map(ArrayReport::total_energy).sum()
    }

    pub fn total_latency(&self) -> f64 {
        self.arrays.iter().map(ArrayReport::total_latency).sum()
    }

    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_totals_sum_arrays() {
        let report = TrainingReport {
            arrays: vec![
                ArrayReport {
                    array_read_energy: 1.0,
                    write_dynamic_energy: 2.0,
                    read_latency: 0.5,
                    ..ArrayReport::default()
                },
                ArrayReport {
                    array_write_energy: 3.0,
                    write_latency: 1.5,
                    ..ArrayReport::default()
                },
            ],
            ..TrainingReport::default()
        };
        assert_eq!(report.total_energy(), 6.0);
        assert_eq!(report.total_latency(), 2.0);
    }

    #[test]
    fn test_json_roundtrip() {
        let report = TrainingReport {
            optimizer: "Adam".to_string(),
            epochs: 2,
            epoch_loss: vec![0.3, 0.2],
            ..TrainingReport::default()
        };
        let json = report.to_json().unwrap();
        let back: TrainingReport = serde_json::from_str(&json).unwrap();
        assert_eq!(back, report);
    }
}
