// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

/*
 * Copyright 2025 Neuraville Inc.
 *
 * Licensed under the Apache License, Version 2.0 (the "License");
 * you may not use this file except in compliance with the License.
 */

//! # nvmsim Device Layer
//!
//! Everything below the training algorithm:
//! - **Cells**: digital, analog eNVM, 2T1F and hybrid MSB/LSB synapses
//! - **Crossbar**: cell grid, wire parasitics, array energies
//! - **SubArray**: peripheral energy/latency accounting state
//! - **Periphery / ADC**: cost-model and quantizer seams with default implementations
//! - **Technology**: process constants

/// Crate version from Cargo.toml
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

pub mod adc;
pub mod array;
pub mod bounds;
pub mod cell;
pub mod error;
pub mod periphery;
pub mod subarray;
pub mod technology;

pub use adc::{AdcMapping, LinearAdc};
pub use array::{Crossbar, WireParasitics};
pub use bounds::WeightBounds;
pub use cell::{
    AnalogCell, AnalogDeviceParams, CellKind, CellTemplate, DeviceCell, DigitalCell,
    DigitalDeviceParams, DualTransistorCell, DualTransistorParams, HybridCell,
    NonIdenticalPulse, ReadWindow, ResponseCurve, SubCell, TransferOutcome, WritePhase,
};
pub use error::{DeviceError, Result};
pub use periphery::{AnalyticalCostModel, CircuitBlock, NeuronPeripherals, PeripheralCostModel};
pub use subarray::{batch_width, SubArray};
pub use technology::Technology;
