// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

//! Configuration type definitions
//!
//! Every struct maps to a section of `nvmsim_configuration.toml`. All sections are optional
//! in the file; missing keys take the defaults below.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Root configuration structure
#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct SimConfig {
    pub network: NetworkConfig,
    pub training: TrainingConfig,
    pub optimizer: OptimizerConfig,
    pub pulse: PulseConfig,
    pub device: DeviceConfig,
    pub technology: TechnologyConfig,
    pub periphery: PeripheryConfig,
    pub transfer: TransferConfig,
    pub parallel: ParallelConfig,
    pub logging: LoggingConfig,
}

/// Layer sizes, input digitization and weight range
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct NetworkConfig {
    pub num_input: usize,
    pub num_hidden: usize,
    pub num_output: usize,
    /// Bit-planes of the digitized input
    pub num_bit_input: u32,
    /// Activation levels `L` used when digitizing hidden activations
    pub num_input_level: u32,
    /// Rounding threshold of the hidden-layer digitization
    pub h_threshold: f64,
    pub min_weight: f64,
    pub max_weight: f64,
}

impl Default for NetworkConfig {
    fn default() -> Self {
        Self {
            num_input: 400,
            num_hidden: 100,
            num_output: 10,
            num_bit_input: 1,
            num_input_level: 2,
            h_threshold: 0.5,
            min_weight: -1.0,
            max_weight: 1.0,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct TrainingConfig {
    pub epochs: u32,
    /// Samples drawn per epoch
    pub num_train: usize,
    /// Samples per mini-batch (batch optimizers only)
    pub batch_size: usize,
    /// Learning rate of the input-hidden layer
    pub alpha1: f64,
    /// Learning rate of the hidden-output layer
    pub alpha2: f64,
    pub seed: u64,
    pub use_hardware_in_training_ff: bool,
    pub use_hardware_in_training_wu: bool,
    pub write_energy_report: bool,
    /// Draw a random training sample each step instead of walking the set in order
    pub random_sampling: bool,
}

impl Default for TrainingConfig {
    fn default() -> Self {
        Self {
            epochs: 1,
            num_train: 8000,
            batch_size: 1,
            alpha1: 0.4,
            alpha2: 0.2,
            seed: 0,
            use_hardware_in_training_ff: true,
            use_hardware_in_training_wu: true,
            write_energy_report: true,
            random_sampling: true,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct OptimizerConfig {
    /// `SGD`, `Momentum`, `Adagrad`, `RMSprop` or `Adam`
    pub name: String,
    pub momentum_gamma: f64,
    pub rmsprop_gamma: f64,
    pub rmsprop_epsilon: f64,
    pub adam_beta1: f64,
    pub adam_beta2: f64,
    pub adam_epsilon: f64,
    pub adagrad_epsilon: f64,
}

impl Default for OptimizerConfig {
    fn default() -> Self {
        Self {
            name: "SGD".to_string(),
            momentum_gamma: 0.3,
            rmsprop_gamma: 0.9,
            rmsprop_epsilon: 1e-5,
            adam_beta1: 0.9,
            adam_beta2: 0.9,
            adam_epsilon: 1e-5,
            adagrad_epsilon: 1e-2,
        }
    }
}

pub const OPTIMIZER_NAMES: &[&str] = &["sgd", "momentum", "adagrad", "rmsprop", "adam"];

/// Stochastic pulse generation
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct PulseConfig {
    pub stream_length: usize,
    pub probability_scale: f64,
    /// `stochastic` or `optimizer`
    pub scheme: String,
}

impl Default for PulseConfig {
    fn default() -> Self {
        Self {
            stream_length: 40,
            probability_scale: 0.05,
            scheme: "stochastic".to_string(),
        }
    }
}

pub const PULSE_SCHEMES: &[&str] = &["stochastic", "optimizer"];

/// Synaptic device technology
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct DeviceConfig {
    /// `analog`, `digital`, `2t1f` or `hybrid`
    pub cell: String,
    pub max_conductance: f64,
    pub min_conductance: f64,
    pub ltp_nonlinearity: f64,
    pub ltd_nonlinearity: f64,
    pub max_num_level_ltp: u32,
    pub max_num_level_ltd: u32,
    pub read_voltage: f64,
    pub read_pulse_width: f64,
    pub write_voltage_ltp: f64,
    pub write_voltage_ltd: f64,
    pub write_pulse_width_ltp: f64,
    pub write_pulse_width_ltd: f64,
    /// 1T1R when true, cross-point otherwise
    pub cmos_access: bool,
    pub half_select_ratio: f64,
    pub non_identical_pulse: Option<NonIdenticalPulseConfig>,
    pub digital: DigitalConfig,
    pub dual: DualTransistorConfig,
    /// Weight of the MSB pair relative to the LSB cell (hybrid only)
    pub significance: f64,
}

impl Default for DeviceConfig {
    fn default() -> Self {
        Self {
            cell: "analog".to_string(),
            max_conductance: 3.8462e-8,
            min_conductance: 3.0769e-9,
            ltp_nonlinearity: 40.0,
            ltd_nonlinearity: -30.0,
            max_num_level_ltp: 97,
            max_num_level_ltd: 100,
            read_voltage: 0.5,
            read_pulse_width: 5e-9,
            write_voltage_ltp: 3.2,
            write_voltage_ltd: 2.8,
            write_pulse_width_ltp: 300e-6,
            write_pulse_width_ltd: 300e-6,
            cmos_access: true,
            half_select_ratio: 0.1,
            non_identical_pulse: None,
            digital: DigitalConfig::default(),
            dual: DualTransistorConfig::default(),
            significance: 0.5,
        }
    }
}

pub const CELL_NAMES: &[&str] = &["analog", "analognvm", "digital", "sram", "2t1f", "dual", "dual_transistor", "hybrid"];

/// Incrementing write amplitudes `V_i = v_init + i * v_step`
#[derive(Debug, Clone, Copy, PartialEq, Deserialize, Serialize)]
pub struct NonIdenticalPulseConfig {
    pub v_init_ltp: f64,
    pub v_step_ltp: f64,
    pub v_init_ltd: f64,
    pub v_step_ltd: f64,
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct DigitalConfig {
    pub num_bits: u32,
    pub max_conductance: f64,
    pub min_conductance: f64,
    pub write_voltage: f64,
    pub write_pulse_width: f64,
}

impl Default for DigitalConfig {
    fn default() -> Self {
        Self {
            num_bits: 5,
            max_conductance: 1.0 / 5e3,
            min_conductance: 1.0 / 5e5,
            write_voltage: 1.0,
            write_pulse_width: 10e-9,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct DualTransistorConfig {
    pub fast_num_level: u32,
    pub fast_write_voltage: f64,
    pub fast_write_pulse_width: f64,
    pub storage_capacitance: f64,
    pub trans_pulse_width: f64,
}

impl Default for DualTransistorConfig {
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

/// Process constants
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct TechnologyConfig {
    pub vdd: f64,
    /// Feature size (m)
    pub feature_size: f64,
    pub wire_cap_per_meter: f64,
    pub wire_resistance_per_meter: f64,
    pub gate_cap_per_cell: f64,
}

impl Default for TechnologyConfig {
    fn default() -> Self {
        Self {
            vdd: 0.9,
            feature_size: 32e-9,
            wire_cap_per_meter: 2e-10,
            wire_resistance_per_meter: 1e7,
            gate_cap_per_cell: 1e-16,
        }
    }
}

/// Read-out and write-driver sharing
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct PeripheryConfig {
    /// Columns sharing one read-out circuit
    pub num_col_muxed: usize,
    /// Columns sharing one write driver
    pub num_write_col_muxed: usize,
    /// ADC resolution
    pub num_bit_partial_sum: u32,
}

impl Default for PeripheryConfig {
    fn default() -> Self {
        Self {
            num_col_muxed: 16,
            num_write_col_muxed: 16,
            num_bit_partial_sum: 8,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Default, Deserialize, Serialize)]
#[serde(default)]
pub struct TransferConfig {
    /// Samples between transfer passes; 0 disables transfer
    pub interval_samples: usize,
}

#[derive(Debug, Clone, PartialEq, Default, Deserialize, Serialize)]
#[serde(default)]
pub struct ParallelConfig {
    /// Worker threads; 0 = one per core
    pub num_threads: usize,
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct LoggingConfig {
    pub level: String,
    pub json: bool,
    /// Directory for rolling log files; empty disables file logging
    pub directory: PathBuf,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            json: false,
            directory: PathBuf::new(),
        }
    }
}
