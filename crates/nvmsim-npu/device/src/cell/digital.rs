// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

/*
 * Copyright 2025 Neuraville Inc.
 *
 * Licensed under the Apache License, Version 2.0 (the "License");
 * you may not use this file except in compliance with the License.
 */
//! Multi-bit digital synapse (SRAM-like)
//!
//! The weight is an unsigned level over `num_bits` binary cells. Writes rewrite only the
//! bits that flip.

use std::sync::Arc;

use super::WritePhase;
use crate::bounds::WeightBounds;
use crate::error::{DeviceError, Result};

#[derive(Debug, Clone, PartialEq)]
pub struct DigitalDeviceParams {
    pub num_bits: u32,
    pub max_conductance: f64,
    pub min_conductance: f64,
    pub read_voltage: f64,
    pub read_pulse_width: f64,
    pub write_voltage: f64,
    pub write_pulse_width: f64,
    pub cmos_access: bool,
}

impl Default for DigitalDeviceParams {
    fn default() -> Self {
        Self {
            num_bits: 5,
            max_conductance: 1.0 / 5e3,
            min_conductance: 1.0 / 5e5,
            read_voltage: 0.5,
            read_pulse_width: 5e-9,
            write_voltage: 1.0,
            write_pulse_width: 10e-9,
            cmos_access: true,
        }
    }
}

impl DigitalDeviceParams {
    pub fn validate(&self) -> Result<()> {
        if self.num_bits == 0 || self.num_bits > 16 {
            return Err(DeviceError::InvalidParameter {
                field: "num_bits",
                reason: format!("must be in 1..=16, got {}", self.num_bits),
            });
        }
        if !(self.min_conductance > 0.0 && self.min_conductance < self.max_conductance) {
            return Err(DeviceError::InvalidParameter {
                field: "min_conductance",
                reason: "need 0 < min < max".to_string(),
            });
        }
        Ok(())
    }

    #[inline]
    fn max_level(&self) -> u32 {
        (1u32 << self.num_bits) - 1
    }
}

#[derive(Debug, Clone)]
pub struct DigitalCell {
    params: Arc<DigitalDeviceParams>,
    level: u32,
    num_pulse: i32,
    write_latency_ltp: f64,
    write_latency_ltd: f64,
    write_energy: f64,
    saturated: bool,
    phase: WritePhase,
}

impl DigitalCell {
    pub fn new(params: Arc<DigitalDeviceParams>) -> Self {
        Self {
            params,
            level: 0,
            num_pulse: 0,
            write_latency_ltp: 0.0,
            write_latency_ltd: 0.0,
            write_energy: 0.0,
            saturated: false,
            phase: WritePhase::Idle,
        }
    }

    pub fn params(&self) -> &DigitalDeviceParams {
        &self.params
    }

    #[inline]
    pub fn level(&self) -> u32 {
        self.level
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

    #[inline]
    fn unit(&self) -> f64 {
        self.level as f64 / self.params.max_level() as f64
    }

    pub fn conductance(&self) -> f64 {
        let p = &self.params;
        p.min_conductance + self.unit() * (p.max_conductance - p.min_conductance)
    }

    pub fn initialize_weight(&mut self, weight: f64, bounds: &WeightBounds) {
        self.level = (bounds.normalize(weight) * self.params.max_level() as f64).round() as u32;
        self.num_pulse = 0;
        self.phase = WritePhase::Idle;
    }

    pub fn conductance_to_weight(&self, bounds: &WeightBounds) -> f64 {
        bounds.denormalize(self.unit())
    }

    fn set_level(&mut self, new_level: u32) {
        self.phase = WritePhase::Pulsing;
        let flips = (self.level ^ new_level).count_ones() as i32;
        self.num_pulse = if new_level >= self.level { flips } else { -flips };
        self.write_latency_ltp = 0.0;
        self.write_latency_ltd = 0.0;
        if self.num_pulse > 0 {
            self.write_latency_ltp = self.params.write_pulse_width;
        } else if self.num_pulse < 0 {
            self.write_latency_ltd = self.params.write_pulse_width;
        }
        self.level = new_level;
        self.phase = WritePhase::Settled;
    }

    /// Step the level by `pulses` LSBs, clamped to the representable range.
    pub fn apply_pulses(&mut self, pulses: i32) -> i32 {
        let max = self.params.max_level() as i64;
        let wanted = self.level as i64 + pulses as i64;
        self.saturated = !(0..=max).contains(&wanted);
        let new_level = wanted.clamp(0, max) as u32;
        let stepped = new_level as i32 - self.level as i32;
        self.set_level(new_level);
        stepped
    }

    /// Quantize `weight + delta` onto the level grid and write it. Returns the realized weight.
    pub fn write_delta(&mut self, delta: f64, bounds: &WeightBounds) -> f64 {
        let wanted = self.conductance_to_weight(bounds) + delta;
        self.saturated = wanted < bounds.min || wanted > bounds.max;
        let new_level = (bounds.normalize(wanted) * self.params.max_level() as f64).round() as u32;
        self.set_level(new_level);
        self.conductance_to_weight(bounds)
    }

    pub fn set_batch_latency(&mut self, ltp: f64, ltd: f64) {
        self.write_latency_ltp = ltp;
        self.write_latency_ltd = ltd;
    }

    pub fn write_voltage_square_sum(&self) -> f64 {
        self.num_pulse.unsigned_abs() as f64 * self.params.write_voltage.powi(2)
    }

    pub fn compute_write_energy(&mut self, wire_cap_col: f64) -> f64 {
        let p = &self.params;
        let v2 = p.write_voltage.powi(2);
        let flips = self.num_pulse.unsigned_abs() as f64;
        self.write_energy = flips * (v2 * p.max_conductance * p.write_pulse_width + wire_cap_col * v2);
        self.write_energy
    }

    #[inline]
    pub fn read_current(&self, wire_resistance: f64) -> f64 {
        super::analog::current_through(self.params.read_voltage, self.conductance(), wire_resistance)
    }
}
