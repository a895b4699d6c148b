// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

/*
 * Copyright 2025 Neuraville Inc.
 *
 * Licensed under the Apache License, Version 2.0 (the "License");
 * you may not use this file except in compliance with the License.
 */
//! Analog eNVM cell with asymmetric nonlinear LTP/LTD response
//!
//! Pulses move the cell along its LTP curve (potentiation) or LTD curve (depression).
//! Requests that would run past either end of a curve are clamped and flag saturation.

use std::sync::Arc;

use super::curve::ResponseCurve;
use super::WritePhase;
use crate::bounds::WeightBounds;
use crate::error::{DeviceError, Result};

/// Tolerance on fractional pulse indices recovered from a conductance.
const PULSE_EPS: f64 = 1e-9;

/// Incrementing pulse amplitudes: pulse `i` of a train is `v_init + i * v_step`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct NonIdenticalPulse {
    pub v_init_ltp: f64,
    pub v_step_ltp: f64,
    pub v_init_ltd: f64,
    pub v_step_ltd: f64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct AnalogDeviceParams {
    pub max_conductance: f64,
    pub min_conductance: f64,
    pub ltp: ResponseCurve,
    pub ltd: ResponseCurve,
    pub read_voltage: f64,
    pub read_pulse_width: f64,
    pub write_voltage_ltp: f64,
    pub write_voltage_ltd: f64,
    pub write_pulse_width_ltp: f64,
    pub write_pulse_width_ltd: f64,
    /// 1T1R when true, cross-point otherwise
    pub cmos_access: bool,
    pub non_identical_pulse: Option<NonIdenticalPulse>,
    /// Conductance at half write bias relative to the full-bias conductance
    pub half_select_ratio: f64,
}

impl Default for AnalogDeviceParams {
    /// Ag:a-Si synaptic device
    fn default() -> Self {
        Self {
            max_conductance: 3.8462e-8,
            min_conductance: 3.0769e-9,
            ltp: ResponseCurve {
                nonlinearity: 40.0,
                max_num_level: 97,
            },
            ltd: ResponseCurve {
                nonlinearity: -30.0,
                max_num_level: 100,
            },
            read_voltage: 0.5,
            read_pulse_width: 5e-9,
            write_voltage_ltp: 3.2,
            write_voltage_ltd: 2.8,
            write_pulse_width_ltp: 300e-6,
            write_pulse_width_ltd: 300e-6,
            cmos_access: true,
            non_identical_pulse: None,
            half_select_ratio: 0.1,
        }
    }
}

impl AnalogDeviceParams {
    pub fn validate(&self) -> Result<()> {
        if !(self.min_conductance > 0.0 && self.min_conductance < self.max_conductance) {
            return Err(DeviceError::InvalidParameter {
                field: "min_conductance",
                reason: format!(
                    "need 0 < min ({}) < max ({})",
                    self.min_conductance, self.max_conductance
                ),
            });
        }
        if self.ltp.max_num_level == 0 || self.ltd.max_num_level == 0 {
            return Err(DeviceError::InvalidParameter {
                field: "max_num_level",
                reason: "LTP and LTD curves need at least one level".to_string(),
            });
        }
        if self.read_pulse_width <= 0.0
            || self.write_pulse_width_ltp <= 0.0
            || self.write_pulse_width_ltd <= 0.0
        {
            return Err(DeviceError::InvalidParameter {
                field: "pulse_width",
                reason: "read and write pulse widths must be positive".to_string(),
            });
        }
        if !(0.0..=1.0).contains(&self.half_select_ratio) {
            return Err(DeviceError::InvalidParameter {
                field: "half_select_ratio",
                reason: format!("must be in [0, 1], got {}", self.half_select_ratio),
            });
        }
        Ok(())
    }

    #[inline]
    fn conductance_range(&self) -> f64 {
        self.max_conductance - self.min_conductance
    }

    /// Mean amplitude of a full incrementing train, used when a phase issued no pulses.
    pub fn average_write_voltages(&self) -> (f64, f64) {
        match self.non_identical_pulse {
            Some(np) => (
                np.v_init_ltp + 0.5 * np.v_step_ltp * self.ltp.max_num_level as f64,
                np.v_init_ltd + 0.5 * np.v_step_ltd * self.ltd.max_num_level as f64,
            ),
            None => (self.write_voltage_ltp, self.write_voltage_ltd),
        }
    }
}

#[derive(Debug, Clone)]
pub struct AnalogCell {
    params: Arc<AnalogDeviceParams>,
    conductance: f64,
    conductance_prev: f64,
    num_pulse: i32,
    write_latency_ltp: f64,
    write_latency_ltd: f64,
    write_voltage_square_sum: f64,
    write_energy: f64,
    saturated: bool,
    phase: WritePhase,
}

impl AnalogCell {
    pub fn new(params: Arc<AnalogDeviceParams>) -> Self {
        let g = params.min_conductance;
        Self {
            params,
            conductance: g,
            conductance_prev: g,
            num_pulse: 0,
            write_latency_ltp: 0.0,
            write_latency_ltd: 0.0,
            write_voltage_square_sum: 0.0,
            write_energy: 0.0,
            saturated: false,
            phase: WritePhase::Idle,
        }
    }

    pub fn params(&self) -> &AnalogDeviceParams {
        &self.params
    }

    #[inline]
    pub fn conductance(&self) -> f64 {
        self.conductance
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

    pub fn write_voltage_square_sum(&self) -> f64 {
        self.write_voltage_square_sum
    }

    pub fn write_energy(&self) -> f64 {
        self.write_energy
    }

    /// Conductance as a fraction of the device range.
    #[inline]
    pub fn unit(&self) -> f64 {
        ((self.conductance - self.params.min_conductance) / self.params.conductance_range())
            .clamp(0.0, 1.0)
    }

    /// Program the conductance directly (ideal write, no pulse accounting).
    pub fn set_unit(&mut self, unit: f64) {
        let p = &self.params;
        self.conductance = p.min_conductance + unit.clamp(0.0, 1.0) * p.conductance_range();
        self.conductance_prev = self.conductance;
        self.num_pulse = 0;
        self.phase = WritePhase::Idle;
    }

    pub fn initialize_weight(&mut self, weight: f64, bounds: &WeightBounds) {
        self.set_unit(bounds.normalize(weight));
    }

    pub fn conductance_to_weight(&self, bounds: &WeightBounds) -> f64 {
        bounds.denormalize(self.unit())
    }

    /// Signed pulse count that a weight change of `delta` maps to on the nominal grid.
    pub fn pulses_for_delta(&self, delta: f64, bounds: &WeightBounds) -> i32 {
        let levels = if delta >= 0.0 {
            self.params.ltp.max_num_level
        } else {
            self.params.ltd.max_num_level
        };
        (delta / bounds.span() * levels as f64).round() as i32
    }

    /// Apply a signed train of pulses. Positive is LTP, negative is LTD.
    ///
    /// Resets the previous write state, so `num_pulse` always reflects this call only.
    /// Returns the number of pulses actually issued after clamping at the curve ends.
    pub fn apply_pulses(&mut self, pulses: i32) -> i32 {
        self.phase = WritePhase::Pulsing;
        self.conductance_prev = self.conductance;
        self.num_pulse = 0;
        self.write_latency_ltp = 0.0;
        self.write_latency_ltd = 0.0;
        self.write_voltage_square_sum = 0.0;
        self.saturated = false;

        if pulses == 0 {
            self.phase = WritePhase::Settled;
            return 0;
        }

        let p = Arc::clone(&self.params);
        let (g_min, g_max) = (p.min_conductance, p.max_conductance);
        let curve = if pulses > 0 { &p.ltp } else { &p.ltd };
        let levels = curve.max_num_level as f64;
        let start = curve.pulse_at(self.conductance, g_min, g_max);
        let target = start + pulses as f64;

        let (end, applied) = if target > levels + PULSE_EPS {
            self.saturated = true;
            (levels, ((levels - start - PULSE_EPS).ceil() as i32).clamp(0, pulses))
        } else if target < -PULSE_EPS {
            self.saturated = true;
            (0.0, -((start - PULSE_EPS).ceil() as i32).clamp(0, -pulses))
        } else {
            (target.clamp(0.0, levels), pulses)
        };

        self.conductance = curve.conductance_at(end, g_min, g_max);
        self.num_pulse = applied;

        let issued = applied.unsigned_abs();
        if applied > 0 {
            self.write_latency_ltp = issued as f64 * p.write_pulse_width_ltp;
            self.write_voltage_square_sum = match p.non_identical_pulse {
                Some(np) => (0..issued)
                    .map(|i| {
                        let v = np.v_init_ltp + (start.floor() + i as f64) * np.v_step_ltp;
                        v * v
                    })
                    .sum(),
                None => issued as f64 * p.write_voltage_ltp * p.write_voltage_ltp,
            };
        } else if applied < 0 {
            self.write_latency_ltd = issued as f64 * p.write_pulse_width_ltd;
            self.write_voltage_square_sum = match p.non_identical_pulse {
                Some(np) => (0..issued)
                    .map(|i| {
                        let v = np.v_init_ltd + ((levels - start).floor() + i as f64) * np.v_step_ltd;
                        v * v
                    })
                    .sum(),
                None => issued as f64 * p.write_voltage_ltd * p.write_voltage_ltd,
            };
        }

        self.phase = WritePhase::Settled;
        applied
    }

    /// Program a weight change through the nominal pulse grid. Returns the realized weight.
    pub fn write_delta(&mut self, delta: f64, bounds: &WeightBounds) -> f64 {
        let pulses = self.pulses_for_delta(delta, bounds);
        self.apply_pulses(pulses);
        self.conductance_to_weight(bounds)
    }

    /// Overwrite the write latencies with the batch maxima before energy accounting.
    pub fn set_batch_latency(&mut self, ltp: f64, ltd: f64) {
        self.write_latency_ltp = ltp;
        self.write_latency_ltd = ltd;
    }

    /// Effective write voltages of the last write (RMS for incrementing trains).
    pub fn effective_write_voltages(&self) -> (f64, f64) {
        let (avg_ltp, avg_ltd) = self.params.average_write_voltages();
        if self.params.non_identical_pulse.is_none() || self.num_pulse == 0 {
            return (avg_ltp, avg_ltd);
        }
        let rms = (self.write_voltage_square_sum / self.num_pulse.unsigned_abs() as f64).sqrt();
        if self.num_pulse > 0 {
            (rms, avg_ltd)
        } else {
            (avg_ltp, rms)
        }
    }

    #[inline]
    pub fn half_select_conductance(&self) -> f64 {
        self.conductance * self.params.half_select_ratio
    }

    /// Energy of the last write, including the cell's own half-selected phase on cross-point
    /// arrays. Stores and returns the value.
    pub fn compute_write_energy(&mut self, wire_cap_col: f64) -> f64 {
        let p = &self.params;
        let g_avg = 0.5 * (self.conductance + self.conductance_prev);
        let g_half = self.half_select_conductance();
        let (v_ltp, v_ltd) = self.effective_write_voltages();
        let half_ltp = (0.5 * v_ltp).powi(2);
        let half_ltd = (0.5 * v_ltd).powi(2);

        let mut energy = 0.0;
        if self.num_pulse > 0 {
            energy += self.write_voltage_square_sum * g_avg * p.write_pulse_width_ltp;
            energy += wire_cap_col * self.write_voltage_square_sum;
            if !p.cmos_access {
                energy += half_ltd * g_half * self.write_latency_ltd + wire_cap_col * half_ltd;
            }
        } else if self.num_pulse < 0 {
            energy += self.write_voltage_square_sum * g_avg * p.write_pulse_width_ltd;
            energy += wire_cap_col * self.write_voltage_square_sum;
            if !p.cmos_access {
                energy += half_ltp * g_half * self.write_latency_ltp + wire_cap_col * half_ltp;
            }
        } else if !p.cmos_access {
            energy += half_ltp * g_half * self.write_latency_ltp + wire_cap_col * half_ltp;
            energy += half_ltd * g_half * self.write_latency_ltd + wire_cap_col * half_ltd;
        }
        self.write_energy = energy;
        energy
    }

    /// Read current through the cell plus `wire_resistance` of interconnect.
    #[inline]
    pub fn read_current(&self, wire_resistance: f64) -> f64 {
        current_through(self.params.read_voltage, self.conductance, wire_resistance)
    }
}

#[inline]
pub(crate) fn current_through(voltage: f64, conductance: f64, wire_resistance: f64) -> f64 {
    voltage / (1.0 / conductance + wire_resistance)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn linear_params() -> Arc<AnalogDeviceParams> {
        Arc::new(AnalogDeviceParams {
            ltp: ResponseCurve::linear(100),
            ltd: ResponseCurve::linear(100),
            ..AnalogDeviceParams::default()
        })
    }

    #[test]
    fn test_default_params_valid() {
        assert!(AnalogDeviceParams::default().validate().is_ok());
    }

    #[test]
    fn test_inverted_conductance_rejected() {
        let p = AnalogDeviceParams {
            min_conductance: 1e-6,
            max_conductance: 1e-7,
            ..AnalogDeviceParams::default()
        };
        assert!(p.validate().is_err());
    }

    #[test]
    fn test_linear_pulse_moves_one_level() {
        let bounds = WeightBounds::default();
        let mut cell = AnalogCell::new(linear_params());
        cell.initialize_weight(0.0, &bounds);
        assert_eq!(cell.apply_pulses(10), 10);
        assert!((cell.conductance_to_weight(&bounds) - 0.2).abs() < 1e-9);
        assert_eq!(cell.num_pulse(), 10);
        assert_eq!(cell.phase(), WritePhase::Settled);
        assert!(!cell.saturated());
    }

    #[test]
    fn test_saturation_clamps_and_trims_pulses() {
        let bounds = WeightBounds::default();
        let mut cell = AnalogCell::new(linear_params());
        cell.initialize_weight(0.9, &bounds);
        let applied = cell.apply_pulses(50);
        assert!(cell.saturated());
        assert_eq!(applied, 5);
        assert!((cell.conductance_to_weight(&bounds) - 1.0).abs() < 1e-12);

        let applied = cell.apply_pulses(-500);
        assert!(cell.saturated());
        assert_eq!(applied, -100);
        assert!((cell.conductance_to_weight(&bounds) + 1.0).abs() < 1e-12);
    }

    #[test]
    fn test_num_pulse_reset_each_write() {
        let bounds = WeightBounds::default();
        let mut cell = AnalogCell::new(linear_params());
        cell.initialize_weight(0.0, &bounds);
        cell.apply_pulses(3);
        cell.apply_pulses(0);
        assert_eq!(cell.num_pulse(), 0);
        assert_eq!(cell.write_latency(), (0.0, 0.0));
    }

    #[test]
    fn test_nonlinear_step_shrinks_towards_top() {
        let bounds = WeightBounds::default();
        let mut cell = AnalogCell::new(Arc::new(AnalogDeviceParams::default()));
        cell.initialize_weight(-1.0, &bounds);
        let w0 = cell.conductance_to_weight(&bounds);
        cell.apply_pulses(1);
        let first = cell.conductance_to_weight(&bounds) - w0;

        cell.initialize_weight(0.9, &bounds);
        let w1 = cell.conductance_to_weight(&bounds);
        cell.apply_pulses(1);
        let late = cell.conductance_to_weight(&bounds) - w1;
        assert!(first > late);
    }

    #[test]
    fn test_non_identical_rms_voltage() {
        let params = Arc::new(AnalogDeviceParams {
            ltp: ResponseCurve::linear(100),
            ltd: ResponseCurve::linear(100),
            non_identical_pulse: Some(NonIdenticalPulse {
                v_init_ltp: 1.0,
                v_step_ltp: 0.1,
                v_init_ltd: 1.0,
                v_step_ltd: 0.1,
            }),
            ..AnalogDeviceParams::default()
        });
        let mut cell = AnalogCell::new(params);
        cell.set_unit(0.0);
        cell.apply_pulses(2);
        // pulses at 1.0 V and 1.1 V
        let expected = ((1.0f64 + 1.21) / 2.0).sqrt();
        assert!((cell.effective_write_voltages().0 - expected).abs() < 1e-12);
    }

    #[test]
    fn test_write_energy_positive_after_write() {
        let bounds = WeightBounds::default();
        let mut cell = AnalogCell::new(linear_params());
        cell.initialize_weight(0.0, &bounds);
        cell.apply_pulses(-4);
        assert!(cell.compute_write_energy(1e-15) > 0.0);
        cell.apply_pulses(0);
        // 1T1R idle cell burns nothing
        assert_eq!(cell.compute_write_energy(1e-15), 0.0);
    }
}
