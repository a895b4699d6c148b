// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

/*
 * Copyright 2025 Neuraville Inc.
 *
 * Licensed under the Apache License, Version 2.0 (the "License");
 * you may not use this file except in compliance with the License.
 */

//! # Crossbar array
//!
//! A 2D grid of [`DeviceCell`]s indexed `[[j, k]]`: column `j` is an output neuron, row `k`
//! an input. The array owns wire parasitics and cumulative array-level energies.

use ndarray::{Array2, Zip};
use tracing::debug;

use crate::bounds::WeightBounds;
use crate::cell::{CellKind, CellTemplate, DeviceCell, ReadWindow};
use crate::error::{DeviceError, Result};
use crate::technology::Technology;

/// Cell pitch in features for cross-point (4F^2) and 1T1R cells.
const CROSSPOINT_PITCH_F: f64 = 2.0;
const ONE_T_ONE_R_PITCH_F: f64 = 4.0;

/// Interconnect parasitics of one array.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct WireParasitics {
    /// Capacitance of one row wire (spans all columns)
    pub cap_row: f64,
    /// Capacitance of one column wire (spans all rows)
    pub cap_col: f64,
    /// Access-transistor gate capacitance on one word line (1T1R only)
    pub gate_cap_row: f64,
    /// Wire resistance of one cell pitch
    pub resistance_per_cell: f64,
}

impl WireParasitics {
    pub fn from_technology(tech: &Technology, num_col: usize, num_row: usize, cmos_access: bool) -> Self {
        let pitch = if cmos_access {
            tech.cell_pitch(ONE_T_ONE_R_PITCH_F)
        } else {
            tech.cell_pitch(CROSSPOINT_PITCH_F)
        };
        Self {
            cap_row: num_col as f64 * pitch * tech.wire_cap_per_meter,
            cap_col: num_row as f64 * pitch * tech.wire_cap_per_meter,
            gate_cap_row: if cmos_access {
                num_col as f64 * tech.gate_cap_per_cell
            } else {
                0.0
            },
            resistance_per_cell: pitch * tech.wire_resistance_per_meter,
        }
    }
}

#[derive(Debug, Clone)]
pub struct Crossbar {
    cells: Array2<DeviceCell>,
    kind: CellKind,
    cmos_access: bool,
    wire: WireParasitics,
    vdd: f64,
    pub read_energy: f64,
    pub write_energy: f64,
    pub transfer_energy: f64,
    pub transfer_read_energy: f64,
    pub transfer_write_energy: f64,
}

impl Crossbar {
    /// Build a `num_col x num_row` array of identical cells.
    pub fn new(num_col: usize, num_row: usize, template: &CellTemplate, tech: &Technology) -> Result<Self> {
        if num_col == 0 || num_row == 0 {
            return Err(DeviceError::EmptyArray {
                cols: num_col,
                rows: num_row,
            });
        }
        tech.validate()?;
        template.validate()?;
        let prototype = template.build()?;
        let cmos_access = template.cmos_access();
        let wire = WireParasitics::from_technology(tech, num_col, num_row, cmos_access);
        debug!(
            target: "nvmsim-npu-device",
            "Crossbar {}x{} of {} cells (cap_row={:.3e} F, cap_col={:.3e} F)",
            num_col,
            num_row,
            template.kind().as_str(),
            wire.cap_row,
            wire.cap_col
        );
        Ok(Self {
            cells: Array2::from_elem((num_col, num_row), prototype),
            kind: template.kind(),
            cmos_access,
            wire,
            vdd: tech.vdd,
            read_energy: 0.0,
            write_energy: 0.0,
            transfer_energy: 0.0,
            transfer_read_energy: 0.0,
            transfer_write_energy: 0.0,
        })
    }

    #[inline]
    pub fn num_col(&self) -> usize {
        self.cells.nrows()
    }

    /// Rows of the array (`arrayRowSize`, the input count).
    #[inline]
    pub fn num_row(&self) -> usize {
        self.cells.ncols()
    }

    pub fn kind(&self) -> CellKind {
        self.kind
    }

    pub fn cmos_access(&self) -> bool {
        self.cmos_access
    }

    pub fn wire(&self) -> &WireParasitics {
        &self.wire
    }

    pub fn vdd(&self) -> f64 {
        self.vdd
    }

    #[inline]
    pub fn cell(&self, j: usize, k: usize) -> &DeviceCell {
        &self.cells[[j, k]]
    }

    #[inline]
    pub fn cell_mut(&mut self, j: usize, k: usize) -> &mut DeviceCell {
        &mut self.cells[[j, k]]
    }

    pub fn cells(&self) -> &Array2<DeviceCell> {
        &self.cells
    }

    pub fn cells_mut(&mut self) -> &mut Array2<DeviceCell> {
        &mut self.cells
    }

    /// Interconnect resistance between the drivers and cell `(j, k)`.
    #[inline]
    pub fn wire_resistance(&self, j: usize, k: usize) -> f64 {
        self.wire.resistance_per_cell * (j + k + 2) as f64
    }

    #[inline]
    pub fn read_window(&self, j: usize, k: usize) -> ReadWindow {
        self.cells[[j, k]].read_window()
    }

    /// Read current of cell `(j, k)` at its read voltage.
    #[inline]
    pub fn read_cell(&self, j: usize, k: usize) -> f64 {
        self.cells[[j, k]].read_current(self.wire_resistance(j, k))
    }

    fn reference_current(&self, j: usize, k: usize, conductance: f64) -> f64 {
        let w = self.read_window(j, k);
        w.read_voltage / (1.0 / conductance + self.wire_resistance(j, k))
    }

    pub fn max_cell_read_current(&self, j: usize, k: usize) -> f64 {
        let g = self.read_window(j, k).max_conductance;
        self.reference_current(j, k, g)
    }

    pub fn min_cell_read_current(&self, j: usize, k: usize) -> f64 {
        let g = self.read_window(j, k).min_conductance;
        self.reference_current(j, k, g)
    }

    /// Current of the medium-conductance dummy cell used as the read reference.
    pub fn medium_cell_read_current(&self, j: usize, k: usize) -> f64 {
        let g = self.read_window(j, k).medium_conductance();
        self.reference_current(j, k, g)
    }

    pub fn apply_pulses(&mut self, j: usize, k: usize, pulses: i32) -> i32 {
        self.cells[[j, k]].apply_pulses(pulses)
    }

    pub fn write_cell(
        &mut self,
        j: usize,
        k: usize,
        delta: f64,
        weight: f64,
        bounds: &WeightBounds,
        regular: bool,
    ) -> f64 {
        self.cells[[j, k]].write_delta(delta, weight, bounds, regular)
    }

    #[inline]
    pub fn conductance_to_weight(&self, j: usize, k: usize, bounds: &WeightBounds) -> f64 {
        self.cells[[j, k]].conductance_to_weight(bounds)
    }

    /// Program every cell from `weights` and replace each entry by the weight the cell
    /// actually holds.
    pub fn initialize_weights(&mut self, weights: &mut Array2<f64>, bounds: &WeightBounds) -> Result<()> {
        if weights.dim() != self.cells.dim() {
            let (cols, rows) = weights.dim();
            return Err(DeviceError::ShapeMismatch {
                expected_cols: self.num_col(),
                expected_rows: self.num_row(),
                cols,
                rows,
            });
        }
        Zip::from(&mut self.cells)
            .and(weights)
            .for_each(|cell, w| {
                cell.initialize_weight(*w, bounds);
                *w = cell.conductance_to_weight(bounds);
            });
        Ok(())
    }

    /// Conductance of every cell, taken before a parallel write pass.
    pub fn conductance_snapshot(&self) -> Array2<f64> {
        self.cells.map(DeviceCell::conductance)
    }

    /// Per-cell half-select conductances `(LTP, LTD)`, taken before a parallel write pass.
    pub fn half_select_snapshot(&self) -> Array2<(f64, f64)> {
        self.cells.map(DeviceCell::half_select_conductance)
    }

    pub fn reset_energy(&mut self) {
        self.read_energy = 0.0;
        self.write_energy = 0.0;
        self.transfer_energy = 0.0;
        self.transfer_read_energy = 0.0;
        self.transfer_write_energy = 0.0;
    }
}
