// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

/*
 * Copyright 2025 Neuraville Inc.
 *
 * Licensed under the Apache License, Version 2.0 (the "License");
 * you may not use this file except in compliance with the License.
 */

//! Peripheral accounting attached to one crossbar
//!
//! Holds the cumulative peripheral energies and latencies plus the per-operation inputs
//! (`activity_row_read`, `num_write_pulse`, `write_voltage`) the cost model reads.

use crate::cell::CellKind;
use crate::periphery::NeuronPeripherals;

#[derive(Debug, Clone, PartialEq)]
pub struct SubArray {
    pub num_row: usize,
    pub num_col: usize,
    pub cell_kind: CellKind,
    pub cmos_access: bool,
    pub peripherals: NeuronPeripherals,

    /// Fraction of rows active during the current read
    pub activity_row_read: f64,
    /// Average write pulses per cell of the last accounted row
    pub num_write_pulse: f64,
    /// RMS write voltage of the last accounted row
    pub write_voltage: f64,

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

impl SubArray {
    pub fn new(
        num_row: usize,
        num_col: usize,
        cell_kind: CellKind,
        cmos_access: bool,
        peripherals: NeuronPeripherals,
    ) -> Self {
        Self {
            num_row,
            num_col,
            cell_kind,
            cmos_access,
            peripherals,
            activity_row_read: 0.0,
            num_write_pulse: 0.0,
            write_voltage: 0.0,
            read_dynamic_energy: 0.0,
            read_latency: 0.0,
            write_dynamic_energy: 0.0,
            write_latency: 0.0,
            transfer_read_dynamic_energy: 0.0,
            transfer_read_latency: 0.0,
            transfer_write_dynamic_energy: 0.0,
            transfer_write_latency: 0.0,
            transfer_dynamic_energy: 0.0,
            transfer_latency: 0.0,
        }
    }

    /// Columns processed by one read cycle when `num_col_muxed` columns share a sense path.
    #[inline]
    pub fn read_batch(&self, num_col_muxed: usize) -> usize {
        batch_width(self.num_col, num_col_muxed)
    }

    /// Columns written together when `num_write_col_muxed` columns share a write driver.
    #[inline]
    pub fn write_batch(&self, num_write_col_muxed: usize) -> usize {
        batch_width(self.num_col, num_write_col_muxed)
    }

    pub fn reset(&mut self) {
        *self = Self::new(
            self.num_row,
            self.num_col,
            self.cell_kind,
            self.cmos_access,
            self.peripherals,
        );
    }
}

/// `ceil(num_col / muxed)`, never below one.
#[inline]
pub fn batch_width(num_col: usize, muxed: usize) -> usize {
    num_col.div_ceil(muxed.max(1)).max(1)
}
