// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

/*
 * Copyright 2025 Neuraville Inc.
 *
 * Licensed under the Apache License, Version 2.0 (the "License");
 * you may not use this file except in compliance with the License.
 */
//! # Device cell models
//!
//! One synapse of a crossbar. [`DeviceCell`] is a closed tagged enum over the supported
//! technologies so the update engine stays subtype-agnostic and dispatch is a match.
//!
//! Every write follows `Idle -> Pulsing -> Settled`; `num_pulse` always reflects the most
//! recent write only.

pub mod analog;
pub mod curve;
pub mod digital;
pub mod dual;
pub mod hybrid;

use std::sync::Arc;

pub use analog::{AnalogCell, AnalogDeviceParams, NonIdenticalPulse};
pub use curve::ResponseCurve;
pub use digital::{DigitalCell, DigitalDeviceParams};
pub use dual::{DualTransistorCell, DualTransistorParams};
pub use hybrid::{HybridCell, SubCell};

use crate::bounds::WeightBounds;
use crate::error::Result;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum WritePhase {
    #[default]
    Idle,
    Pulsing,
    Settled,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CellKind {
    Digital,
    Analog,
    DualTransistor,
    Hybrid,
}

impl CellKind {
    pub fn from_name(name: &str) -> Option<Self> {
        match name.to_ascii_lowercase().as_str() {
            "digital" | "sram" => Some(Self::Digital),
            "analog" | "analognvm" => Some(Self::Analog),
            "2t1f" | "dual" | "dual_transistor" => Some(Self::DualTransistor),
            "hybrid" => Some(Self::Hybrid),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Digital => "digital",
            Self::Analog => "analog",
            Self::DualTransistor => "2t1f",
            Self::Hybrid => "hybrid",
        }
    }
}

/// Result of one weight-transfer call on a cell.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct TransferOutcome {
    /// Pulses on the potentiating path (MSB-LTP, or 2T1F slow LTP)
    pub pulses_ltp: i32,
    /// Pulses on the depressing path (MSB-LTD, or 2T1F slow LTD, negative)
    pub pulses_ltd: i32,
    pub latency_ltp: f64,
    pub latency_ltd: f64,
    pub write_voltage_square_sum: f64,
    pub read_energy: f64,
    pub write_energy: f64,
}

/// Shared parameters from which every cell of an array is built.
#[derive(Debug, Clone)]
pub enum CellTemplate {
    Digital(Arc<DigitalDeviceParams>),
    Analog(Arc<AnalogDeviceParams>),
    DualTransistor {
        slow: Arc<AnalogDeviceParams>,
        dual: Arc<DualTransistorParams>,
    },
    Hybrid {
        msb: Arc<AnalogDeviceParams>,
        lsb: Arc<AnalogDeviceParams>,
        significance: f64,
    },
}

impl CellTemplate {
    pub fn validate(&self) -> Result<()> {
        match self {
            Self::Digital(p) => p.validate(),
            Self::Analog(p) => p.validate(),
            Self::DualTransistor { slow, dual } => {
                slow.validate()?;
                dual.validate()
            }
            Self::Hybrid { msb, lsb, .. } => {
                msb.validate()?;
                lsb.validate()
            }
        }
    }

    pub fn kind(&self) -> CellKind {
        match self {
            Self::Digital(_) => CellKind::Digital,
            Self::Analog(_) => CellKind::Analog,
            Self::DualTransistor { .. } => CellKind::DualTransistor,
            Self::Hybrid { .. } => CellKind::Hybrid,
        }
    }

    pub fn cmos_access(&self) -> bool {
        match self {
            Self::Digital(p) => p.cmos_access,
            Self::Analog(p) => p.cmos_access,
            Self::DualTransistor { slow, .. } => slow.cmos_access,
            Self::Hybrid { lsb, .. } => lsb.cmos_access,
        }
    }

    pub fn build(&self) -> Result<DeviceCell> {
        Ok(match self {
            Self::Digital(p) => DeviceCell::Digital(DigitalCell::new(Arc::clone(p))),
            Self::Analog(p) => DeviceCell::Analog(AnalogCell::new(Arc::clone(p))),
            Self::DualTransistor { slow, dual } => DeviceCell::DualTransistor(
                DualTransistorCell::new(Arc::clone(slow), Arc::clone(dual)),
            ),
            Self::Hybrid {
                msb,
                lsb,
                significance,
            } => DeviceCell::Hybrid(HybridCell::new(
                Arc::clone(msb),
                Arc::clone(lsb),
                *significance,
            )?),
        })
    }
}

/// Conductance references of one cell for the read path.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ReadWindow {
    pub read_voltage: f64,
    pub read_pulse_width: f64,
    pub min_conductance: f64,
    pub max_conductance: f64,
}

impl ReadWindow {
    #[inline]
    pub fn medium_conductance(&self) -> f64 {
        0.5 * (self.min_conductance + self.max_conductance)
    }
}

#[derive(Debug, Clone)]
pub enum DeviceCell {
    Digital(DigitalCell),
    Analog(AnalogCell),
    DualTransistor(DualTransistorCell),
    Hybrid(HybridCell),
}

macro_rules! dispatch {
    ($self:expr, $cell:ident => $body:expr) => {
        match $self {
            DeviceCell::Digital($cell) => $body,
            DeviceCell::Analog($cell) => $body,
            DeviceCell::DualTransistor($cell) => $body,
            DeviceCell::Hybrid($cell) => $body,
        }
    };
}

impl DeviceCell {
    pub fn kind(&self) -> CellKind {
        match self {
            Self::Digital(_) => CellKind::Digital,
            Self::Analog(_) => CellKind::Analog,
            Self::DualTransistor(_) => CellKind::DualTransistor,
            Self::Hybrid(_) => CellKind::Hybrid,
        }
    }

    /// Everything except the digital cell is read through the analog current path.
    #[inline]
    pub fn is_analog(&self) -> bool {
        !matches!(self, Self::Digital(_))
    }

    pub fn read_window(&self) -> ReadWindow {
        match self {
            Self::Digital(c) => {
                let p = c.params();
                ReadWindow {
                    read_voltage: p.read_voltage,
                    read_pulse_width: p.read_pulse_width,
                    min_conductance: p.min_conductance,
                    max_conductance: p.max_conductance,
                }
            }
            Self::Analog(c) => analog_window(c.params()),
            Self::DualTransistor(c) => analog_window(c.slow().params()),
            Self::Hybrid(c) => analog_window(c.sub_cell(SubCell::Lsb).params()),
        }
    }

    pub fn cmos_access(&self) -> bool {
        match self {
            Self::Digital(c) => c.params().cmos_access,
            Self::Analog(c) => c.params().cmos_access,
            Self::DualTransistor(c) => c.slow().params().cmos_access,
            Self::Hybrid(c) => c.sub_cell(SubCell::Lsb).params().cmos_access,
        }
    }

    /// Whether writes use incrementing pulse amplitudes.
    pub fn non_identical_pulse(&self) -> bool {
        match self {
            Self::Digital(_) | Self::DualTransistor(_) => false,
            Self::Analog(c) => c.params().non_identical_pulse.is_some(),
            Self::Hybrid(c) => c.sub_cell(SubCell::Lsb).params().non_identical_pulse.is_some(),
        }
    }

    /// Nominal (average) write voltages, or RMS values of the last write for incrementing
    /// pulse schemes.
    pub fn write_voltages(&self) -> (f64, f64) {
        match self {
            Self::Digital(c) => (c.params().write_voltage, c.params().write_voltage),
            Self::Analog(c) => c.effective_write_voltages(),
            Self::DualTransistor(c) => {
                let v = c.dual_params().fast_write_voltage;
                (v, v)
            }
            Self::Hybrid(c) => c.effective_write_voltages(),
        }
    }

    /// Write voltages of a full pulse train, independent of the last write.
    pub fn nominal_write_voltages(&self) -> (f64, f64) {
        match self {
            Self::Digital(c) => (c.params().write_voltage, c.params().write_voltage),
            Self::Analog(c) => c.params().average_write_voltages(),
            Self::DualTransistor(c) => {
                let v = c.dual_params().fast_write_voltage;
                (v, v)
            }
            Self::Hybrid(c) => c.sub_cell(SubCell::Lsb).params().average_write_voltages(),
        }
    }

    #[inline]
    pub fn conductance(&self) -> f64 {
        dispatch!(self, c => c.conductance())
    }

    /// Conductance of the cell when biased at half the write voltage (LTP, LTD).
    pub fn half_select_conductance(&self) -> (f64, f64) {
        match self {
            Self::Digital(_) => (0.0, 0.0),
            Self::Analog(c) => {
                let g = c.half_select_conductance();
                (g, g)
            }
            Self::DualTransistor(c) => {
                let g = c.slow().half_select_conductance();
                (g, g)
            }
            Self::Hybrid(c) => {
                let g = c.sub_cell(SubCell::Lsb).half_select_conductance();
                (g, g)
            }
        }
    }

    pub fn initialize_weight(&mut self, weight: f64, bounds: &WeightBounds) {
        dispatch!(self, c => c.initialize_weight(weight, bounds))
    }

    pub fn conductance_to_weight(&self, bounds: &WeightBounds) -> f64 {
        dispatch!(self, c => c.conductance_to_weight(bounds))
    }

    /// Apply a signed pulse train; returns the pulses actually issued.
    pub fn apply_pulses(&mut self, pulses: i32) -> i32 {
        dispatch!(self, c => c.apply_pulses(pulses))
    }

    /// Write a desired weight change.
    ///
    /// `regular` writes go through the device's pulse grid. Non-regular writes program the
    /// target weight directly (ideal synchronization of an algorithmically trained weight).
    /// Returns the realized weight.
    pub fn write_delta(&mut self, delta: f64, weight: f64, bounds: &WeightBounds, regular: bool) -> f64 {
        if !regular {
            self.initialize_weight(bounds.clamp(weight), bounds);
            return self.conductance_to_weight(bounds);
        }
        dispatch!(self, c => c.write_delta(delta, bounds))
    }

    #[inline]
    pub fn num_pulse(&self) -> i32 {
        dispatch!(self, c => c.num_pulse())
    }

    #[inline]
    pub fn saturated(&self) -> bool {
        dispatch!(self, c => c.saturated())
    }

    pub fn phase(&self) -> WritePhase {
        dispatch!(self, c => c.phase())
    }

    /// (LTP, LTD) write latency of the last write, or the batch maxima once set.
    pub fn write_latency(&self) -> (f64, f64) {
        dispatch!(self, c => c.write_latency())
    }

    pub fn set_batch_latency(&mut self, ltp: f64, ltd: f64) {
        dispatch!(self, c => c.set_batch_latency(ltp, ltd))
    }

    pub fn write_voltage_square_sum(&self) -> f64 {
        dispatch!(self, c => c.write_voltage_square_sum())
    }

    /// Compute and store the energy of the last write.
    pub fn write_energy(&mut self, wire_cap_col: f64) -> f64 {
        dispatch!(self, c => c.compute_write_energy(wire_cap_col))
    }

    pub fn last_write_energy(&self) -> f64 {
        dispatch!(self, c => c.write_energy())
    }

    /// Run the technology's weight transfer. Cells without a transfer mechanism return
    /// `None`.
    pub fn transfer_weight(&mut self, wire_cap_col: f64) -> Option<TransferOutcome> {
        match self {
            Self::DualTransistor(c) => Some(c.transfer_weight()),
            Self::Hybrid(c) => Some(c.transfer_weight(wire_cap_col)),
            Self::Digital(_) | Self::Analog(_) => None,
        }
    }

    #[inline]
    pub fn read_current(&self, wire_resistance: f64) -> f64 {
        dispatch!(self, c => c.read_current(wire_resistance))
    }
}

fn analog_window(p: &AnalogDeviceParams) -> ReadWindow {
    ReadWindow {
        read_voltage: p.read_voltage,
        read_pulse_width: p.read_pulse_width,
        min_conductance: p.min_conductance,
        max_conductance: p.max_conductance,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cell_kind_names() {
        assert_eq!(CellKind::from_name("AnalogNVM"), Some(CellKind::Analog));
        assert_eq!(CellKind::from_name("2T1F"), Some(CellKind::DualTransistor));
        assert_eq!(CellKind::from_name("memristor"), None);
        for kind in [
            CellKind::Digital,
            CellKind::Analog,
            CellKind::DualTransistor,
            CellKind::Hybrid,
        ] {
            assert_eq!(CellKind::from_name(kind.as_str()), Some(kind));
        }
    }

    #[test]
    fn test_template_builds_matching_kind() {
        let analog = Arc::new(AnalogDeviceParams::default());
        let templates = [
            CellTemplate::Digital(Arc::new(DigitalDeviceParams::default())),
            CellTemplate::Analog(Arc::clone(&analog)),
            CellTemplate::DualTransistor {
                slow: Arc::clone(&analog),
                dual: Arc::new(DualTransistorParams::default()),
            },
            CellTemplate::Hybrid {
                msb: Arc::clone(&analog),
                lsb: analog,
                significance: 0.5,
            },
        ];
        for t in templates {
            let cell = t.build().unwrap();
            assert_eq!(cell.kind(), t.kind());
            assert_eq!(cell.is_analog(), t.kind() != CellKind::Digital);
        }
    }

    #[test]
    fn test_non_regular_write_sets_target() {
        let bounds = WeightBounds::default();
        let mut cell = CellTemplate::Analog(Arc::new(AnalogDeviceParams::default()))
            .build()
            .unwrap();
        let w = cell.write_delta(0.0, 0.25, &bounds, false);
        assert!((w - 0.25).abs() < 1e-9);
        assert_eq!(cell.num_pulse(), 0);
    }

    #[test]
    fn test_transfer_only_for_two_stage_cells() {
        let mut cell = CellTemplate::Analog(Arc::new(AnalogDeviceParams::default()))
            .build()
            .unwrap();
        assert!(cell.transfer_weight(0.0).is_none());
    }
}
