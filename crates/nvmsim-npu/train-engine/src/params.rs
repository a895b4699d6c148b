// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

/*
 * Copyright 2025 Neuraville Inc.
 *
 * Licensed under the Apache License, Version 2.0 (the "License");
 * you may not use this file except in compliance with the License.
 */

//! Engine-facing run parameters
//!
//! [`TrainingParams`] is built once from a validated [`SimConfig`] and stays read-only for
//! the whole run.

use std::sync::Arc;

use nvmsim_config::{validate_config, DeviceConfig, SimConfig, TechnologyConfig};
use nvmsim_npu_device::{
    AnalogDeviceParams, CellKind, CellTemplate, DigitalDeviceParams, DualTransistorParams,
    NeuronPeripherals, NonIdenticalPulse, ResponseCurve, Technology, WeightBounds,
};
use nvmsim_npu_plasticity::{Optimizer, OptimizerHyperParams, PulseScheme, UpdateSettings};

use crate::error::{Result, TrainError};

#[derive(Debug, Clone)]
pub struct TrainingParams {
    pub num_input: usize,
    pub num_hidden: usize,
    pub num_output: usize,
    pub num_bit_input: u32,
    pub num_input_level: u32,
    pub h_threshold: f64,
    pub bounds: WeightBounds,

    pub epochs: u32,
    pub num_train: usize,
    pub alpha1: f64,
    pub alpha2: f64,
    pub random_sampling: bool,
    pub seed: u64,

    pub num_col_muxed: usize,
    pub num_bit_partial_sum: u32,
    /// Samples between transfer passes; 0 disables transfer
    pub transfer_interval: usize,
    /// 0 = one worker per core
    pub num_threads: usize,

    pub update: UpdateSettings,
    pub template: CellTemplate,
    pub technology: Technology,
    pub peripherals: NeuronPeripherals,
}

impl TrainingParams {
    /// Validate `config` and build the engine parameters.
    pub fn from_config(config: &SimConfig) -> Result<Self> {
        validate_config(config)?;
        let n = &config.network;
        let t = &config.training;
        let bounds = WeightBounds::new(n.min_weight, n.max_weight)?;

        let o = &config.optimizer;
        let update = UpdateSettings {
            optimizer: Optimizer::from_name(&o.name),
            hyper: OptimizerHyperParams {
                momentum_gamma: o.momentum_gamma,
                rmsprop_gamma: o.rmsprop_gamma,
                rmsprop_epsilon: o.rmsprop_epsilon,
                adam_beta1: o.adam_beta1,
                adam_beta2: o.adam_beta2,
                adam_epsilon: o.adam_epsilon,
                adagrad_epsilon: o.adagrad_epsilon,
            },
            batch_size: t.batch_size,
            stream_length: config.pulse.stream_length,
            probability_scale: config.pulse.probability_scale,
            pulse_scheme: PulseScheme::from_name(&config.pulse.scheme).unwrap_or_default(),
            use_hardware_in_training_ff: t.use_hardware_in_training_ff,
            use_hardware_in_training_wu: t.use_hardware_in_training_wu,
            write_energy_report: t.write_energy_report,
            num_write_col_muxed: config.periphery.num_write_col_muxed,
            bounds,
            seed: t.seed,
        };
        update.validate()?;

        let template = cell_template(&config.device)?;
        let technology = technology(&config.technology);
        technology.validate()?;

        Ok(Self {
            num_input: n.num_input,
            num_hidden: n.num_hidden,
            num_output: n.num_output,
            num_bit_input: n.num_bit_input,
            num_input_level: n.num_input_level,
            h_threshold: n.h_threshold,
            bounds,
            epochs: t.epochs,
            num_train: t.num_train,
            alpha1: t.alpha1,
            alpha2: t.alpha2,
            random_sampling: t.random_sampling,
            seed: t.seed,
            num_col_muxed: config.periphery.num_col_muxed,
            num_bit_partial_sum: config.periphery.num_bit_partial_sum,
            transfer_interval: config.transfer.interval_samples,
            num_threads: config.parallel.num_threads,
            update,
            template,
            technology,
            peripherals: NeuronPeripherals::default(),
        })
    }

    #[inline]
    pub fn use_hardware_ff(&self) -> bool {
        self.update.use_hardware_in_training_ff
    }

    #[inline]
    pub fn use_hardware_wu(&self) -> bool {
        self.update.use_hardware_in_training_wu
    }
}

fn analog_params(d: &DeviceConfig) -> Result<AnalogDeviceParams> {
    Ok(AnalogDeviceParams {
        max_conductance: d.max_conductance,
        min_conductance: d.min_conductance,
        ltp: ResponseCurve::new(d.ltp_nonlinearity, d.max_num_level_ltp)?,
        ltd: ResponseCurve::new(d.ltd_nonlinearity, d.max_num_level_ltd)?,
        read_voltage: d.read_voltage,
        read_pulse_width: d.read_pulse_width,
        write_voltage_ltp: d.write_voltage_ltp,
        write_voltage_ltd: d.write_voltage_ltd,
        write_pulse_width_ltp: d.write_pulse_width_ltp,
        write_pulse_width_ltd: d.write_pulse_width_ltd,
        cmos_access: d.cmos_access,
        non_identical_pulse: d.non_identical_pulse.map(|p| NonIdenticalPulse {
            v_init_ltp: p.v_init_ltp,
            v_step_ltp: p.v_step_ltp,
            v_init_ltd: p.v_init_ltd,
            v_step_ltd: p.v_step_ltd,
        }),
        half_select_ratio: d.half_select_ratio,
    })
}

/// Cell template for the configured technology.
pub fn cell_template(d: &DeviceConfig) -> Result<CellTemplate> {
    let kind = CellKind::from_name(d.cell.trim())
        .ok_or_else(|| TrainError::Dataset(format!("unknown cell technology '{}'", d.cell)))?;
    let template = match kind {
        CellKind::Digital => CellTemplate::Digital(Arc::new(DigitalDeviceParams {
            num_bits: d.digital.num_bits,
            max_conductance: d.digital.max_conductance,
            min_conductance: d.digital.min_conductance,
            read_voltage: d.read_voltage,
            read_pulse_width: d.read_pulse_width,
            write_voltage: d.digital.write_voltage,
            write_pulse_width: d.digital.write_pulse_width,
            cmos_access: d.cmos_access,
        })),
        CellKind::Analog => CellTemplate::Analog(Arc::new(analog_params(d)?)),
        CellKind::DualTransistor => CellTemplate::DualTransistor {
            slow: Arc::new(analog_params(d)?),
            dual: Arc::new(DualTransistorParams {
                fast_num_level: d.dual.fast_num_level,
                fast_write_voltage: d.dual.fast_write_voltage,
                fast_write_pulse_width: d.dual.fast_write_pulse_width,
                storage_capacitance: d.dual.storage_capacitance,
                trans_pulse_width: d.dual.trans_pulse_width,
            }),
        },
        CellKind::Hybrid => {
            let analog = Arc::new(analog_params(d)?);
            CellTemplate::Hybrid {
                msb: Arc::clone(&analog),
                lsb: analog,
                significance: d.significance,
            }
        }
    };
    template.validate()?;
    Ok(template)
}

fn technology(t: &TechnologyConfig) -> Technology {
    Technology {
        vdd: t.vdd,
        feature_size: t.feature_size,
        wire_cap_per_meter: t.wire_cap_per_meter,
        wire_resistance_per_meter: t.wire_resistance_per_meter,
        gate_cap_per_cell: t.gate_cap_per_cell,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_build() {
        let params = TrainingParams::from_config(&SimConfig::default()).unwrap();
        assert_eq!(params.template.kind(), CellKind::Analog);
        assert_eq!(params.update.optimizer, Optimizer::Sgd);
        assert_eq!(params.update.stream_length, 40);
        assert!(params.use_hardware_ff());
    }

    #[test]
    fn test_every_cell_kind_builds() {
        for (name, kind) in [
            ("digital", CellKind::Digital),
            ("2t1f", CellKind::DualTransistor),
            ("Hybrid", CellKind::Hybrid),
        ] {
            let mut config = SimConfig::default();
            config.device.cell = name.to_string();
            let params = TrainingParams::from_config(&config).unwrap();
            assert_eq!(params.template.kind(), kind);
        }
    }

    #[test]
    fn test_invalid_config_rejected() {
        let mut config = SimConfig::default();
        config.optimizer.name = "lbfgs".to_string();
        assert!(matches!(
            TrainingParams::from_config(&config),
            Err(TrainError::Config(_))
        ));
    }
}
