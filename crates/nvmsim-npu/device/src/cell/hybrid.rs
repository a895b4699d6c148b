// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

/*
 * Copyright 2025 Neuraville Inc.
 *
 * Licensed under the Apache License, Version 2.0 (the "License");
 * you may not use this file except in compliance with the License.
 */
//! Hybrid precision synapse: a differential MSB pair (LTP/LTD) plus an LSB cell
//!
//! Normalized weight `u = u_lsb + significance * (u_msb_ltp - u_msb_ltd)`, clamped to
//! `[0, 1]`. Training writes the LSB only. A transfer moves the LSB deviation from mid-range
//! into the MSB pair with potentiating pulses on one side and resets the LSB.

use std::sync::Arc;

use super::analog::AnalogCell;
use super::analog::AnalogDeviceParams;
use super::{TransferOutcome, WritePhase};
use crate::bounds::WeightBounds;
use crate::error::{DeviceError, Result};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SubCell {
    MsbLtp,
    MsbLtd,
    Lsb,
}

#[derive(Debug, Clone)]
pub struct HybridCell {
    msb_ltp: AnalogCell,
    msb_ltd: AnalogCell,
    lsb: AnalogCell,
    significance: f64,
}

impl HybridCell {
    pub fn new(
        msb_params: Arc<AnalogDeviceParams>,
        lsb_params: Arc<AnalogDeviceParams>,
        significance: f64,
    ) -> Result<Self> {
        if !(significance.is_finite() && significance > 0.0) {
            return Err(DeviceError::InvalidParameter {
                field: "significance",
                reason: format!("must be positive, got {}", significance),
            });
        }
        let mut lsb = AnalogCell::new(lsb_params);
        lsb.set_unit(0.5);
        Ok(Self {
            msb_ltp: AnalogCell::new(Arc::clone(&msb_params)),
            msb_ltd: AnalogCell::new(msb_params),
            lsb,
            significance,
        })
    }

    pub fn sub_cell(&self, which: SubCell) -> &AnalogCell {
        match which {
            SubCell::MsbLtp => &self.msb_ltp,
            SubCell::MsbLtd => &self.msb_ltd,
            SubCell::Lsb => &self.lsb,
        }
    }

    /// Weight represented by one sub-cell alone.
    pub fn sub_cell_weight(&self, which: SubCell, bounds: &WeightBounds) -> f64 {
        self.sub_cell(which).conductance_to_weight(bounds)
    }

    pub fn significance(&self) -> f64 {
        self.significance
    }

    #[inline]
    fn unit(&self) -> f64 {
        (self.lsb.unit() + self.significance * (self.msb_ltp.unit() - self.msb_ltd.unit()))
            .clamp(0.0, 1.0)
    }

    /// Composite conductance seen on the read path, on the LSB device scale.
    pub fn conductance(&self) -> f64 {
        let p = self.lsb.params();
        p.min_conductance + self.unit() * (p.max_conductance - p.min_conductance)
    }

    pub fn conductance_to_weight(&self, bounds: &WeightBounds) -> f64 {
        bounds.denormalize(self.unit())
    }

    pub fn initialize_weight(&mut self, weight: f64, bounds: &WeightBounds) {
        let offset = bounds.normalize(weight) - 0.5;
        let msb = (offset.abs() / self.significance).min(1.0);
        if offset >= 0.0 {
            self.msb_ltp.set_unit(msb);
            self.msb_ltd.set_unit(0.0);
        } else {
            self.msb_ltp.set_unit(0.0);
            self.msb_ltd.set_unit(msb);
        }
        let residual = offset - self.significance * (self.msb_ltp.unit() - self.msb_ltd.unit());
        self.lsb.set_unit(0.5 + residual);
    }

    pub fn num_pulse(&self) -> i32 {
        self.lsb.num_pulse()
    }

    pub fn saturated(&self) -> bool {
        self.lsb.saturated()
    }

    pub fn phase(&self) -> WritePhase {
        self.lsb.phase()
    }

    pub fn apply_pulses(&mut self, pulses: i32) -> i32 {
        self.lsb.apply_pulses(pulses)
    }

    pub fn write_delta(&mut self, delta: f64, bounds: &WeightBounds) -> f64 {
        let pulses = self.lsb.pulses_for_delta(delta, bounds);
        self.lsb.apply_pulses(pulses);
        self.conductance_to_weight(bounds)
    }

    pub fn write_latency(&self) -> (f64, f64) {
        self.lsb.write_latency()
    }

    pub fn set_batch_latency(&mut self, ltp: f64, ltd: f64) {
        self.lsb.set_batch_latency(ltp, ltd);
    }

    pub fn write_voltage_square_sum(&self) -> f64 {
        self.lsb.write_voltage_square_sum()
    }

    pub fn compute_write_energy(&mut self, wire_cap_col: f64) -> f64 {
        self.lsb.compute_write_energy(wire_cap_col)
    }

    pub fn write_energy(&self) -> f64 {
        self.lsb.write_energy()
    }

    pub fn effective_write_voltages(&self) -> (f64, f64) {
        self.lsb.effective_write_voltages()
    }

    /// Move the LSB deviation into the MSB pair.
    ///
    /// The MSB side receiving the change always gets potentiating pulses, so
    /// `latency_ltd` in the outcome is the LTP write time of the MSB-LTD cell.
    pub fn transfer_weight(&mut self, wire_cap_col: f64) -> TransferOutcome {
        let read_energy: f64 = [&self.msb_ltp, &self.msb_ltd, &self.lsb]
            .iter()
            .map(|c| {
                let p = c.params();
                p.read_voltage * p.read_voltage * c.conductance() * p.read_pulse_width
            })
            .sum();

        let offset = self.lsb.unit() - 0.5;
        let significance = self.significance;
        let (target, idle) = if offset >= 0.0 {
            (&mut self.msb_ltp, &mut self.msb_ltd)
        } else {
            (&mut self.msb_ltd, &mut self.msb_ltp)
        };
        idle.apply_pulses(0);

        let before = target.unit();
        let goal = (before + offset.abs() / significance).min(1.0);
        let pulses = {
            let p = target.params();
            let (g_min, g_max) = (p.min_conductance, p.max_conductance);
            let g_goal = g_min + goal * (g_max - g_min);
            (p.ltp.pulse_at(g_goal, g_min, g_max) - p.ltp.pulse_at(target.conductance(), g_min, g_max))
                .round()
                .max(0.0) as i32
        };
        target.apply_pulses(pulses);
        let moved = target.unit() - before;
        let write_energy = target.compute_write_energy(wire_cap_col);

        let lsb_unit = self.lsb.unit() - offset.signum() * significance * moved;
        self.lsb.set_unit(lsb_unit);

        TransferOutcome {
            pulses_ltp: self.msb_ltp.num_pulse(),
            pulses_ltd: self.msb_ltd.num_pulse(),
            latency_ltp: self.msb_ltp.write_latency().0,
            latency_ltd: self.msb_ltd.write_latency().0,
            write_voltage_square_sum: self.msb_ltp.write_voltage_square_sum()
                + self.msb_ltd.write_voltage_square_sum(),
            read_energy,
            write_energy,
        }
    }

    #[inline]
    pub fn read_current(&self, wire_resistance: f64) -> f64 {
        super::analog::current_through(
            self.lsb.params().read_voltage,
            self.conductance(),
            wire_resistance,
        )
    }
}
