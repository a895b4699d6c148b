// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

/*
 * Copyright 2025 Neuraville Inc.
 *
 * Licensed under the Apache License, Version 2.0 (the "License");
 * you may not use this file except in compliance with the License.
 */

//! Peripheral circuit cost model
//!
//! The simulator only needs energy and latency numbers from the peripheral circuits; how
//! those are derived is behind [`PeripheralCostModel`]. [`AnalyticalCostModel`] is a
//! linear per-operation model.

use crate::cell::CellKind;
use crate::subarray::SubArray;

/// Energy (J) and latency (s) of one operation of a peripheral block.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct CircuitBlock {
    pub energy_per_op: f64,
    pub latency_per_op: f64,
}

impl CircuitBlock {
    pub const fn new(energy_per_op: f64, latency_per_op: f64) -> Self {
        Self {
            energy_per_op,
            latency_per_op,
        }
    }
}

/// Neuron-side peripherals of one column.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct NeuronPeripherals {
    pub adder: CircuitBlock,
    pub mux: CircuitBlock,
    pub mux_decoder: CircuitBlock,
    pub dff: CircuitBlock,
    pub subtractor: CircuitBlock,
}

impl Default for NeuronPeripherals {
    fn default() -> Self {
        Self {
            adder: CircuitBlock::new(2.0e-14, 1.0e-10),
            mux: CircuitBlock::new(1.0e-15, 2.0e-11),
            mux_decoder: CircuitBlock::new(5.0e-15, 5.0e-11),
            dff: CircuitBlock::new(2.0e-15, 3.0e-11),
            subtractor: CircuitBlock::new(2.0e-14, 1.0e-10),
        }
    }
}

pub trait PeripheralCostModel: Send + Sync {
    fn sub_array_read_energy(&self, sa: &SubArray) -> f64;
    fn sub_array_read_latency(&self, sa: &SubArray) -> f64;
    fn neuron_read_energy(&self, sa: &SubArray, peripherals: &NeuronPeripherals) -> f64;
    fn neuron_read_latency(&self, sa: &SubArray, peripherals: &NeuronPeripherals) -> f64;
    fn sub_array_write_energy(
        &self,
        sa: &SubArray,
        num_write_operation_per_row: f64,
        num_write_cell_per_operation: f64,
    ) -> f64;
    fn sub_array_write_latency(&self, sa: &SubArray, num_write_operation: f64, sum_write_latency_analog: f64) -> f64;
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AnalyticalCostModel {
    pub row_driver: CircuitBlock,
    pub sense_amp: CircuitBlock,
    /// Write driver energy per cell per pulse at `vdd`; latency per write operation
    pub write_driver: CircuitBlock,
    pub vdd: f64,
}

impl Default for AnalyticalCostModel {
    fn default() -> Self {
        Self {
            row_driver: CircuitBlock::new(5.0e-15, 1.0e-10),
            sense_amp: CircuitBlock::new(1.0e-14, 2.0e-10),
            write_driver: CircuitBlock::new(3.0e-15, 1.0e-10),
            vdd: 0.9,
        }
    }
}

impl AnalyticalCostModel {
    /// Write driver energy scales with the square of the applied write voltage.
    fn voltage_scale(&self, sa: &SubArray) -> f64 {
        if sa.write_voltage > 0.0 && self.vdd > 0.0 {
            (sa.write_voltage / self.vdd).powi(2)
        } else {
            1.0
        }
    }
}

impl PeripheralCostModel for AnalyticalCostModel {
    fn sub_array_read_energy(&self, sa: &SubArray) -> f64 {
        sa.activity_row_read * sa.num_row as f64 * self.row_driver.energy_per_op
            + sa.num_col as f64 * self.sense_amp.energy_per_op
    }

    fn sub_array_read_latency(&self, _sa: &SubArray) -> f64 {
        self.row_driver.latency_per_op + self.sense_amp.latency_per_op
    }

    fn neuron_read_energy(&self, sa: &SubArray, p: &NeuronPeripherals) -> f64 {
        sa.num_col as f64
            * (p.adder.energy_per_op
                + p.mux.energy_per_op
                + p.dff.energy_per_op
                + p.subtractor.energy_per_op)
            + p.mux_decoder.energy_per_op
    }

    fn neuron_read_latency(&self, _sa: &SubArray, p: &NeuronPeripherals) -> f64 {
        p.adder.latency_per_op
            + p.mux.latency_per_op
            + p.mux_decoder.latency_per_op
            + p.dff.latency_per_op
            + p.subtractor.latency_per_op
    }

    fn sub_array_write_energy(
        &self,
        sa: &SubArray,
        num_write_operation_per_row: f64,
        num_write_cell_per_operation: f64,
    ) -> f64 {
        let decode = num_write_operation_per_row * self.row_driver.energy_per_op;
        let drive = match sa.cell_kind {
            CellKind::Digital => {
                num_write_operation_per_row * num_write_cell_per_operation * self.write_driver.energy_per_op
            }
            _ => {
                num_write_operation_per_row
                    * num_write_cell_per_operation
                    * sa.num_write_pulse
                    * self.write_driver.energy_per_op
                    * self.voltage_scale(sa)
            }
        };
        decode + drive
    }

    fn sub_array_write_latency(&self, _sa: &SubArray, num_write_operation: f64, sum_write_latency_analog: f64) -> f64 {
        sum_write_latency_analog
            + num_write_operation * (self.row_driver.latency_per_op + self.write_driver.latency_per_op)
    }
}
