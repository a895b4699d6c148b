// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

//! Configuration validation
//!
//! Every check runs; all problems are reported together.

use crate::types::{CELL_NAMES, OPTIMIZER_NAMES, PULSE_SCHEMES};
use crate::{ConfigError, ConfigResult, SimConfig};

/// Validation errors that can occur during config validation
#[derive(Debug, Clone, PartialEq)]
pub enum ConfigValidationError {
    OutOfRange { field: String, value: String, expected: String },
    UnknownName { field: String, value: String, known: Vec<String> },
    InvalidValue { field: String, reason: String },
}

impl std::fmt::Display for ConfigValidationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::OutOfRange {
                field,
                value,
                expected,
            } => write!(f, "{} = {} is out of range (expected {})", field, value, expected),
            Self::UnknownName { field, value, known } => write!(
                f,
                "{} = '{}' is not recognized (known: {})",
                field,
                value,
                known.join(", ")
            ),
            Self::InvalidValue { field, reason } => {
                write!(f, "Invalid configuration value for {}: {}", field, reason)
            }
        }
    }
}

/// Validate the complete configuration
///
/// # Errors
///
/// Returns `ConfigError::ValidationError` listing every problem found
pub fn validate_config(config: &SimConfig) -> ConfigResult<()> {
    let errors = collect_validation_errors(config);
    if errors.is_empty() {
        return Ok(());
    }
    let error_messages = errors
        .iter()
        .map(|e| format!("  - {}", e))
        .collect::<Vec<_>>()
        .join("\n");
    Err(ConfigError::ValidationError(format!(
        "Configuration validation failed:\n{}",
        error_messages
    )))
}

/// All problems in `config`, in section order.
pub fn collect_validation_errors(config: &SimConfig) -> Vec<ConfigValidationError> {
    let mut errors = Vec::new();
    validate_network(config, &mut errors);
    validate_training(config, &mut errors);
    validate_names(config, &mut errors);
    validate_optimizer(config, &mut errors);
    validate_device(config, &mut errors);
    validate_periphery(config, &mut errors);
    errors
}

fn positive(errors: &mut Vec<ConfigValidationError>, field: &str, value: f64) {
    if !(value.is_finite() && value > 0.0) {
        errors.push(ConfigValidationError::OutOfRange {
            field: field.to_string(),
            value: value.to_string(),
            expected: "> 0".to_string(),
        });
    }
}

fn nonzero(errors: &mut Vec<ConfigValidationError>, field: &str, value: usize) {
    if value == 0 {
        errors.push(ConfigValidationError::OutOfRange {
            field: field.to_string(),
            value: "0".to_string(),
            expected: ">= 1".to_string(),
        });
    }
}

fn unit_interval(errors: &mut Vec<ConfigValidationError>, field: &str, value: f64, open_top: bool) {
    let ok = value >= 0.0 && if open_top { value < 1.0 } else { value <= 1.0 };
    if !ok {
        errors.push(ConfigValidationError::OutOfRange {
            field: field.to_string(),
            value: value.to_string(),
            expected: if open_top { "[0, 1)" } else { "[0, 1]" }.to_string(),
        });
    }
}

fn validate_network(config: &SimConfig, errors: &mut Vec<ConfigValidationError>) {
    let n = &config.network;
    nonzero(errors, "network.num_input", n.num_input);
    nonzero(errors, "network.num_hidden", n.num_hidden);
    nonzero(errors, "network.num_output", n.num_output);
    if n.num_bit_input == 0 || n.num_bit_input > 16 {
        errors.push(ConfigValidationError::OutOfRange {
            field: "network.num_bit_input".to_string(),
            value: n.num_bit_input.to_string(),
            expected: "1..=16".to_string(),
        });
    }
    if n.num_input_level < 2 {
        errors.push(ConfigValidationError::OutOfRange {
            field: "network.num_input_level".to_string(),
            value: n.num_input_level.to_string(),
            expected: ">= 2".to_string(),
        });
    } else if n.num_bit_input <= 16 && u64::from(n.num_input_level) > 1u64 << n.num_bit_input {
        errors.push(ConfigValidationError::InvalidValue {
            field: "network.num_input_level".to_string(),
            reason: format!(
                "{} levels do not fit in {} input bit(s)",
                n.num_input_level, n.num_bit_input
            ),
        });
    }
    unit_interval(errors, "network.h_threshold", n.h_threshold, true);
    if !(n.min_weight.is_finite() && n.max_weight.is_finite() && n.min_weight < n.max_weight) {
        errors.push(ConfigValidationError::InvalidValue {
            field: "network.min_weight".to_string(),
            reason: format!(
                "weight bounds must be finite and ordered, got [{}, {}]",
                n.min_weight, n.max_weight
            ),
        });
    }
}

fn validate_training(config: &SimConfig, errors: &mut Vec<ConfigValidationError>) {
    let t = &config.training;
    nonzero(errors, "training.num_train", t.num_train);
    nonzero(errors, "training.batch_size", t.batch_size);
    positive(errors, "training.alpha1", t.alpha1);
    positive(errors, "training.alpha2", t.alpha2);
    nonzero(errors, "pulse.stream_length", config.pulse.stream_length);
    positive(errors, "pulse.probability_scale", config.pulse.probability_scale);
}

fn check_name(errors: &mut Vec<ConfigValidationError>, field: &str, value: &str, known: &[&str]) {
    let v = value.trim().to_ascii_lowercase();
    if !known.contains(&v.as_str()) {
        errors.push(ConfigValidationError::UnknownName {
            field: field.to_string(),
            value: value.to_string(),
            known: known.iter().map(|s| s.to_string()).collect(),
        });
    }
}

fn validate_names(config: &SimConfig, errors: &mut Vec<ConfigValidationError>) {
    check_name(errors, "optimizer.name", &config.optimizer.name, OPTIMIZER_NAMES);
    check_name(errors, "pulse.scheme", &config.pulse.scheme, PULSE_SCHEMES);
    check_name(errors, "device.cell", &config.device.cell, CELL_NAMES);
}

fn validate_optimizer(config: &SimConfig, errors: &mut Vec<ConfigValidationError>) {
    let o = &config.optimizer;
    unit_interval(errors, "optimizer.momentum_gamma", o.momentum_gamma, true);
    unit_interval(errors, "optimizer.rmsprop_gamma", o.rmsprop_gamma, true);
    unit_interval(errors, "optimizer.adam_beta1", o.adam_beta1, true);
    unit_interval(errors, "optimizer.adam_beta2", o.adam_beta2, true);
    positive(errors, "optimizer.rmsprop_epsilon", o.rmsprop_epsilon);
    positive(errors, "optimizer.adam_epsilon", o.adam_epsilon);
    positive(errors, "optimizer.adagrad_epsilon", o.adagrad_epsilon);
}

fn validate_device(config: &SimConfig, errors: &mut Vec<ConfigValidationError>) {
    let d = &config.device;
    if !(d.min_conductance > 0.0 && d.min_conductance < d.max_conductance) {
        errors.push(ConfigValidationError::InvalidValue {
            field: "device.min_conductance".to_string(),
            reason: format!(
                "expected 0 < min < max, got min {} max {}",
                d.min_conductance, d.max_conductance
            ),
        });
    }
    if !(d.digital.min_conductance > 0.0 && d.digital.min_conductance < d.digital.max_conductance) {
        errors.push(ConfigValidationError::InvalidValue {
            field: "device.digital.min_conductance".to_string(),
            reason: format!(
                "expected 0 < min < max, got min {} max {}",
                d.digital.min_conductance, d.digital.max_conductance
            ),
        });
    }
    nonzero(errors, "device.max_num_level_ltp", d.max_num_level_ltp as usize);
    nonzero(errors, "device.max_num_level_ltd", d.max_num_level_ltd as usize);
    nonzero(errors, "device.digital.num_bits", d.digital.num_bits as usize);
    nonzero(errors, "device.dual.fast_num_level", d.dual.fast_num_level as usize);
    positive(errors, "device.read_voltage", d.read_voltage);
    positive(errors, "device.read_pulse_width", d.read_pulse_width);
    positive(errors, "device.write_pulse_width_ltp", d.write_pulse_width_ltp);
    positive(errors, "device.write_pulse_width_ltd", d.write_pulse_width_ltd);
    positive(errors, "device.dual.trans_pulse_width", d.dual.trans_pulse_width);
    unit_interval(errors, "device.half_select_ratio", d.half_select_ratio, false);
    if !(d.significance > 0.0 && d.significance <= 1.0) {
        errors.push(ConfigValidationError::OutOfRange {
            field: "device.significance".to_string(),
            value: d.significance.to_string(),
            expected: "(0, 1]".to_string(),
        });
    }
    let t = &config.technology;
    positive(errors, "technology.vdd", t.vdd);
    positive(errors, "technology.feature_size", t.feature_size);
}

fn validate_periphery(config: &SimConfig, errors: &mut Vec<ConfigValidationError>) {
    let p = &config.periphery;
    nonzero(errors, "periphery.num_col_muxed", p.num_col_muxed);
    nonzero(errors, "periphery.num_write_col_muxed", p.num_write_col_muxed);
    if p.num_bit_partial_sum == 0 || p.num_bit_partial_sum > 52 {
        errors.push(ConfigValidationError::OutOfRange {
            field: "periphery.num_bit_partial_sum".to_string(),
            value: p.num_bit_partial_sum.to_string(),
            expected: "1..=52".to_string(),
        });
    }
}
