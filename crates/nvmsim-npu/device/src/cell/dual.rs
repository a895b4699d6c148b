// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

/*
 * Copyright 2025 Neuraville Inc.
 *
 * Licensed under the Apache License, Version 2.0 (the "License");
 * you may not use this file except in compliance with the License.
 */
//! 2T1F synapse: a slow nonlinear eNVM element plus a fast linear capacitor element
//!
//! Training pulses only touch the capacitor. Its charge is merged into the slow element
//! when it overflows during a write, and on every explicit transfer.

use std::sync::Arc;

use super::analog::{AnalogCell, AnalogDeviceParams};
use super::{TransferOutcome, WritePhase};
use crate::bounds::WeightBounds;
use crate::error::{DeviceError, Result};

#[derive(Debug, Clone, PartialEq)]
pub struct DualTransistorParams {
    /// Capacitor charge levels on each side of zero
    pub fast_num_level: u32,
    pub fast_write_voltage: f64,
    pub fast_write_pulse_width: f64,
    /// Storage capacitance charged by each fast pulse (F)
    pub storage_capacitance: f64,
    /// Duration of the merge pulse applied to a row during transfer (s)
    pub trans_pulse_width: f64,
}

impl Default for DualTransistorParams {
    fn default() -> Self {
        Self {
            fast_num_level: 32,
            fast_write_voltage: 1.0,
            fast_write_pulse_width: 10e-9,
            storage_capacitance: 10e-15,
            trans_pulse_width: 100e-6,
        }
    }
}

impl DualTransistorParams {
    pub fn validate(&self) -> Result<()> {
        if self.fast_num_level == 0 {
            return Err(DeviceError::InvalidParameter {
                field: "fast_num_level",
                reason: "must be at least 1".to_string(),
            });
        }
        if self.fast_write_pulse_width <= 0.0 || self.trans_pulse_width <= 0.0 {
            return Err(DeviceError::InvalidParameter {
                field: "pulse_width",
                reason: "fast write and transfer pulse widths must be positive".to_string(),
            });
        }
        Ok(())
    }
}

#[derive(Debug, Clone)]
pub struct DualTransistorCell {
    slow: AnalogCell,
    params: Arc<DualTransistorParams>,
    fast_level: i32,
    num_pulse: i32,
    write_latency_ltp: f64,
    write_latency_ltd: f64,
    write_energy: f64,
    /// Energy spent merging overflow into the slow element during the last write
    trans_write_energy: f64,
    trans_ltp: bool,
    trans_ltd: bool,
    trans_energy: f64,
    saturated: bool,
    phase: WritePhase,
}

impl DualTransistorCell {
    pub fn new(slow_params: Arc<AnalogDeviceParams>, params: Arc<DualTransistorParams>) -> Self {
        Self {
            slow: AnalogCell::new(slow_params),
            params,
            fast_level: 0,
            num_pulse: 0,
            write_latency_ltp: 0.0,
            write_latency_ltd: 0.0,
            write_energy: 0.0,
            trans_write_energy: 0.0,
            trans_ltp: false,
            trans_ltd: false,
            trans_energy: 0.0,
            saturated: false,
            phase: WritePhase::Idle,
        }
    }

    pub fn slow(&self) -> &AnalogCell {
        &self.slow
    }

    pub fn dual_params(&self) -> &DualTransistorParams {
        &self.params
    }

    #[inline]
    pub fn fast_level(&self) -> i32 {
        self.fast_level
    }

    #[inline]
    pub fn num_pulse(&self) -> i32 {
        self.num_pulse
    }

    #[inline]
    pub fn saturated(&self) -> bool {
        self.saturated
    }

    #[inline]
    pub fn phase(&self) -> WritePhase {
        self.phase
    }

    pub fn write_latency(&self) -> (f64, f64) {
        (self.write_latency_ltp, self.write_latency_ltd)
    }

    pub fn write_energy(&self) -> f64 {
        self.write_energy
    }

    pub fn trans_flags(&self) -> (bool, bool) {
        (self.trans_ltp, self.trans_ltd)
    }

    pub fn trans_energy(&self) -> f64 {
        self.trans_energy
    }

    /// Conductance change of one capacitor level.
    #[inline]
    fn fast_step(&self) -> f64 {
        let p = self.slow.params();
        (p.max_conductance - p.min_conductance) / p.ltp.max_num_level as f64
    }

    pub fn conductance(&self) -> f64 {
        let p = self.slow.params();
        (self.slow.conductance() + self.fast_level as f64 * self.fast_step())
            .clamp(p.min_conductance, p.max_conductance)
    }

    pub fn initialize_weight(&mut self, weight: f64, bounds: &WeightBounds) {
        self.slow.initialize_weight(weight, bounds);
        self.fast_level = 0;
        self.num_pulse = 0;
        self.phase = WritePhase::Idle;
    }

    pub fn conductance_to_weight(&self, bounds: &WeightBounds) -> f64 {
        let p = self.slow.params();
        bounds.denormalize(
            (self.conductance() - p.min_conductance) / (p.max_conductance - p.min_conductance),
        )
    }

    /// Move the capacitor charge into the slow element. Returns the slow pulses issued.
    fn merge(&mut self) -> i32 {
        let target = self.conductance();
        let p = self.slow.params();
        let (g_min, g_max) = (p.min_conductance, p.max_conductance);
        let g_now = self.slow.conductance();
        let pulses = if target >= g_now {
            (p.ltp.pulse_at(target, g_min, g_max) - p.ltp.pulse_at(g_now, g_min, g_max)).round()
                as i32
        } else {
            (p.ltd.pulse_at(target, g_min, g_max) - p.ltd.pulse_at(g_now, g_min, g_max)).round()
                as i32
        };
        let applied = self.slow.apply_pulses(pulses);
        let f = self.params.fast_num_level as i32;
        self.fast_level = (((target - self.slow.conductance()) / self.fast_step()).round() as i32)
            .clamp(-f, f);
        applied
    }

    /// Capacitor levels still usable towards LTP (`up`) or LTD. The second value is true
    /// when the conductance window, not the capacitor range, is the limit.
    fn headroom(&self, up: bool) -> (i32, bool) {
        let p = self.slow.params();
        let f = self.params.fast_num_level as i32;
        let step = self.fast_step();
        let g_slow = self.slow.conductance();
        if up {
            let window = ((p.max_conductance - g_slow) / step + 1e-9).floor() as i32 - self.fast_level;
            let cap = f - self.fast_level;
            if window <= cap {
                (window.max(0), true)
            } else {
                (cap, false)
            }
        } else {
            let window = ((p.min_conductance - g_slow) / step - 1e-9).ceil() as i32 - self.fast_level;
            let cap = -f - self.fast_level;
            if window >= cap {
                (window.min(0), true)
            } else {
                (cap, false)
            }
        }
    }

    /// Charge or discharge the capacitor by `pulses` levels, merging on overflow.
    ///
    /// Pulses that would push the total conductance past the device window are dropped and
    /// flag the write as saturated.
    pub fn apply_pulses(&mut self, pulses: i32) -> i32 {
        self.phase = WritePhase::Pulsing;
        self.saturated = false;
        self.trans_write_energy = 0.0;
        self.write_latency_ltp = 0.0;
        self.write_latency_ltd = 0.0;

        let mut remaining = pulses;
        let mut merges = 0u32;
        while remaining != 0 {
            let (room, at_window) = self.headroom(remaining > 0);
            let step = if remaining > 0 {
                remaining.min(room)
            } else {
                remaining.max(room)
            };
            self.fast_level += step;
            remaining -= step;
            if remaining == 0 {
                break;
            }
            if at_window {
                self.saturated = true;
                break;
            }
            merges += 1;
            let moved = self.merge();
            self.trans_write_energy += self.slow.compute_write_energy(0.0);
            if moved == 0 || merges > pulses.unsigned_abs() {
                self.saturated = true;
                break;
            }
        }

        let applied = pulses - remaining;
        self.num_pulse = applied;
        let width = applied.unsigned_abs() as f64 * self.params.fast_write_pulse_width;
        if applied > 0 {
            self.write_latency_ltp = width;
        } else if applied < 0 {
            self.write_latency_ltd = width;
        }
        self.phase = WritePhase::Settled;
        applied
    }

    pub fn write_delta(&mut self, delta: f64, bounds: &WeightBounds) -> f64 {
        let levels = self.slow.params().ltp.max_num_level as f64;
        self.apply_pulses((delta / bounds.span() * levels).round() as i32);
        self.conductance_to_weight(bounds)
    }

    pub fn set_batch_latency(&mut self, ltp: f64, ltd: f64) {
        self.write_latency_ltp = ltp;
        self.write_latency_ltd = ltd;
    }

    pub fn write_voltage_square_sum(&self) -> f64 {
        self.num_pulse.unsigned_abs() as f64 * self.params.fast_write_voltage.powi(2)
    }

    /// Capacitor charging energy plus any overflow merge of the last write.
    pub fn compute_write_energy(&mut self, wire_cap_col: f64) -> f64 {
        self.write_energy = self.write_voltage_square_sum()
            * (self.params.storage_capacitance + wire_cap_col)
            + self.trans_write_energy;
        self.write_energy
    }

    pub fn transfer_weight(&mut self) -> TransferOutcome {
        let pulses = self.merge();
        self.trans_ltp = pulses > 0;
        self.trans_ltd = pulses < 0;
        self.trans_energy = if pulses != 0 {
            self.slow.compute_write_energy(0.0)
        } else {
            0.0
        };
        let width = self.params.trans_pulse_width;
        TransferOutcome {
            pulses_ltp: pulses.max(0),
            pulses_ltd: pulses.min(0),
            latency_ltp: if self.trans_ltp { width } else { 0.0 },
            latency_ltd: if self.trans_ltd { width } else { 0.0 },
            write_voltage_square_sum: self.slow.write_voltage_square_sum(),
            read_energy: 0.0,
            write_energy: self.trans_energy,
        }
    }

    #[inline]
    pub fn read_current(&self, wire_resistance: f64) -> f64 {
        super::analog::current_through(
            self.slow.params().read_voltage,
            self.conductance(),
            wire_resistance,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cell::curve::ResponseCurve;

    fn cell(fast_levels: u32) -> DualTransistorCell {
        let slow = Arc::new(AnalogDeviceParams {
            ltp: ResponseCurve::linear(100),
            ltd: ResponseCurve::linear(100),
            ..AnalogDeviceParams::default()
        });
        let dual = Arc::new(DualTransistorParams {
            fast_num_level: fast_levels,
            ..DualTransistorParams::default()
        });
        DualTransistorCell::new(slow, dual)
    }

    #[test]
    fn test_fast_write_leaves_slow_untouched() {
        let bounds = WeightBounds::default();
        let mut c = cell(32);
        c.initialize_weight(0.0, &bounds);
        let g_slow = c.slow().conductance();
        c.apply_pulses(5);
        assert_eq!(c.slow().conductance(), g_slow);
        assert_eq!(c.fast_level(), 5);
        assert!((c.conductance_to_weight(&bounds) - 0.1).abs() < 1e-9);
    }

    #[test]
    fn test_overflow_merges_into_slow() {
        let bounds = WeightBounds::default();
        let mut c = cell(4);
        c.initialize_weight(0.0, &bounds);
        c.apply_pulses(10);
        assert_eq!(c.num_pulse(), 10);
        assert!((c.conductance_to_weight(&bounds) - 0.2).abs() < 1e-9);
        assert!(c.fast_level().abs() <= 4);
        assert!(c.slow().conductance_to_weight(&bounds) > 0.0);
    }

    #[test]
    fn test_transfer_empties_capacitor() {
        let bounds = WeightBounds::default();
        let mut c = cell(32);
        c.initialize_weight(0.0, &bounds);
        c.apply_pulses(-6);
        let before = c.conductance_to_weight(&bounds);
        let out = c.transfer_weight();
        assert_eq!(c.fast_level(), 0);
        assert_eq!(out.pulses_ltd, -6);
        assert_eq!(c.trans_flags(), (false, true));
        assert!((c.conductance_to_weight(&bounds) - before).abs() < 1e-9);
        assert!(out.write_energy > 0.0);
    }

    #[test]
    fn test_pulses_past_window_saturate() {
        let bounds = WeightBounds::default();
        let mut c = cell(32);
        c.initialize_weight(bounds.max, &bounds);
        assert_eq!(c.apply_pulses(5), 0);
        assert!(c.saturated());
        assert_eq!(c.fast_level(), 0);
        assert_eq!(c.write_voltage_square_sum(), 0.0);

        // no hidden charge left to absorb the LTD pulses
        assert_eq!(c.apply_pulses(-5), -5);
        assert!(!c.saturated());
        assert!((c.conductance_to_weight(&bounds) - (bounds.max - 5.0 * bounds.span() / 100.0)).abs() < 1e-9);
    }

    #[test]
    fn test_ltd_saturation_trims_applied_pulses() {
        let bounds = WeightBounds::default();
        let mut c = cell(32);
        c.initialize_weight(bounds.min + 3.0 * bounds.span() / 100.0, &bounds);
        assert_eq!(c.apply_pulses(-10), -3);
        assert!(c.saturated());
        assert!((c.conductance_to_weight(&bounds) - bounds.min).abs() < 1e-9);
        assert_eq!(c.write_latency(), (0.0, 3.0 * c.dual_params().fast_write_pulse_width));
    }
}
