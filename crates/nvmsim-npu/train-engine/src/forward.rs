// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

/*
 * Copyright 2025 Neuraville Inc.
 *
 * Licensed under the Apache License, Version 2.0 (the "License");
 * you may not use this file except in compliance with the License.
 */

//! # Forward inference
//!
//! Two ways through each layer:
//!
//! - **Algorithmic**: `out[j] = Σ_k w[j][k] x[k]` on the weight matrix.
//! - **Hardware**: the digitized input is applied one bit-plane at a time. For bit `n` the
//!   active rows of neuron `j` are those whose input level has bit `n` set. The summed cell
//!   current and the summed medium-conductance reference current are both quantized by the
//!   ADC against the column's full current range, and the code difference is scaled back to
//!   the algorithm domain with `2^n / (L - 1) * rows` as full scale.
//!
//! The reference subtraction removes `mid_weight` from every active cell; it is added back
//! afterwards so both paths compute the same product.
//!
//! Digital cells have no analog current path and are read as their stored weights, still one
//! bit-plane at a time.

use std::sync::Arc;

use ndarray::{Array1, ArrayView1, ArrayView2, Zip};
use rayon::prelude::*;
use tracing::{debug, trace};

use nvmsim_npu_device::{AdcMapping, Crossbar, LinearAdc, PeripheralCostModel, WeightBounds};
use nvmsim_npu_plasticity::{SimulationContext, SynapticLayer};

use crate::activation::{digitize, sigmoid};
use crate::error::{Result, TrainError};
use crate::network::TwoLayerNetwork;
use crate::params::TrainingParams;
use crate::sample::{active_rows, Sample};

/// Activations of one sample.
#[derive(Debug, Clone, PartialEq)]
pub struct ForwardPass {
    pub out1: Array1<f64>,
    pub a1: Array1<f64>,
    /// Hidden activations digitized to `num_input_level` levels; input of the hardware read
    /// of the second layer
    pub da1: Vec<u32>,
    pub out2: Array1<f64>,
    pub a2: Array1<f64>,
}

/// Result of one hardware neuron read.
#[derive(Debug, Clone, Copy, Default)]
struct NeuronRead {
    out: f64,
    energy: f64,
}

pub struct ForwardEngine {
    adc: Arc<dyn AdcMapping>,
    cost_model: Arc<dyn PeripheralCostModel>,
    hardware: bool,
    num_bit_input: u32,
    num_input_level: u32,
    h_threshold: f64,
    num_col_muxed: usize,
    bounds: WeightBounds,
}

impl ForwardEngine {
    /// Engine with a [`LinearAdc`] of `num_bit_partial_sum` bits.
    pub fn new(params: &TrainingParams, cost_model: Arc<dyn PeripheralCostModel>) -> Self {
        let adc = Arc::new(LinearAdc::new(params.num_bit_partial_sum, params.bounds.span()));
        Self::with_adc(params, cost_model, adc)
    }

    pub fn with_adc(
        params: &TrainingParams,
        cost_model: Arc<dyn PeripheralCostModel>,
        adc: Arc<dyn AdcMapping>,
    ) -> Self {
        Self {
            adc,
            cost_model,
            hardware: params.use_hardware_ff(),
            num_bit_input: params.num_bit_input.max(1),
            num_input_level: params.num_input_level.max(2),
            h_threshold: params.h_threshold,
            num_col_muxed: params.num_col_muxed,
            bounds: params.bounds,
        }
    }

    pub fn is_hardware(&self) -> bool {
        self.hardware
    }

    /// Full-scale algorithm value of input bit `n`, per active row.
    #[inline]
    fn bit_weight(&self, bit: u32) -> f64 {
        2f64.powi(bit as i32) / (self.num_input_level - 1) as f64
    }

    /// Run both layers for `sample`.
    pub fn run(
        &self,
        net: &mut TwoLayerNetwork,
        sample: &Sample,
        ctx: &mut SimulationContext,
    ) -> Result<ForwardPass> {
        if sample.input.len() != net.ih.num_inputs() {
            return Err(TrainError::ShapeMismatch {
                what: "sample input",
                expected: net.ih.num_inputs(),
                got: sample.input.len(),
            });
        }

        let out1 = if self.hardware {
            self.hardware_layer(&mut net.ih, &sample.digitized, ctx)
        } else {
            algorithmic_layer(net.ih.weights.view(), sample.input.view())
        };
        let a1 = out1.mapv(sigmoid);
        let da1: Vec<u32> = a1
            .iter()
            .map(|&a| digitize(a, self.num_input_level, self.h_threshold))
            .collect();

        let out2 = if self.hardware {
            self.hardware_layer(&mut net.ho, &da1, ctx)
        } else {
            algorithmic_layer(net.ho.weights.view(), a1.view())
        };
        let a2 = out2.mapv(sigmoid);

        Ok(ForwardPass {
            out1,
            a1,
            da1,
            out2,
            a2,
        })
    }

    /// Bit-sliced crossbar read of one layer. Array read energy goes to the crossbar and
    /// peripheral read energy/latency to the layer's subarray.
    pub fn hardware_layer(
        &self,
        layer: &mut SynapticLayer,
        levels: &[u32],
        ctx: &mut SimulationContext,
    ) -> Array1<f64> {
        let num_col = layer.crossbar.num_col();
        let crossbar = &layer.crossbar;
        let reads: Vec<NeuronRead> = (0..num_col)
            .into_par_iter()
            .map(|j| self.read_neuron(crossbar, j, levels))
            .collect();

        let mut energy = 0.0;
        for read in &reads {
            if read.energy.is_nan() {
                ctx.nan_energy_events += 1;
                debug!(
                    target: "nvmsim-npu-train-engine",
                    "Layer {} read energy is NaN; excluded",
                    layer.id.as_str()
                );
            } else {
                energy += read.energy;
            }
        }
        layer.crossbar.read_energy += energy;

        self.account_read_cycles(layer, levels);
        Array1::from_iter(reads.into_iter().map(|r| r.out))
    }

    fn read_neuron(&self, crossbar: &Crossbar, j: usize, levels: &[u32]) -> NeuronRead {
        let num_row = crossbar.num_row();
        let mut read = NeuronRead::default();

        if !crossbar.cell(0, 0).is_analog() {
            for bit in 0..self.num_bit_input {
                let scale = self.bit_weight(bit);
                read.out += active_rows(levels, bit)
                    .enumerate()
                    .filter(|(_, on)| *on)
                    .map(|(k, _)| crossbar.conductance_to_weight(j, k, &self.bounds) * scale)
                    .sum::<f64>();
            }
            return read;
        }

        let window = crossbar.read_window(0, 0);
        let wire = crossbar.wire();
        let vr = window.read_voltage;
        if crossbar.cmos_access() {
            let vdd = crossbar.vdd();
            read.energy += wire.gate_cap_row * vdd * vdd * num_row as f64;
        }

        for bit in 0..self.num_bit_input {
            let p_sum_max = self.bit_weight(bit) * num_row as f64;
            let mut i_sum = 0.0;
            let mut i_ref = 0.0;
            let mut i_max = 0.0;
            let mut i_min = 0.0;
            let mut active = 0usize;
            for (k, on) in active_rows(levels, bit).enumerate() {
                if on {
                    i_sum += crossbar.read_cell(j, k);
                    i_ref += crossbar.medium_cell_read_current(j, k);
                    read.energy += wire.cap_row * vr * vr;
                    active += 1;
                }
                i_max += crossbar.max_cell_read_current(j, k);
                i_min += crossbar.min_cell_read_current(j, k);
            }
            read.energy += i_sum * vr * window.read_pulse_width;

            let range = i_max - i_min;
            let digits = self.adc.current_to_digits(i_sum, range) - self.adc.current_to_digits(i_ref, range);
            read.out += self.adc.digits_to_algorithm(digits, p_sum_max)
                + self.bounds.midpoint() * self.bit_weight(bit) * active as f64;
        }
        read
    }

    /// One subarray and neuron read per read cycle.
    fn account_read_cycles(&self, layer: &mut SynapticLayer, levels: &[u32]) {
        let num_row = layer.num_inputs();
        let num_col = layer.num_outputs();
        let active: usize = (0..self.num_bit_input)
            .map(|bit| active_rows(levels, bit).filter(|on| *on).count())
            .sum();
        let subarray = &mut layer.subarray;
        let peripherals = subarray.peripherals;
        let batch = subarray.read_batch(self.num_col_muxed);
        let mut cycles = 0;
        for _ in (0..num_col).step_by(batch) {
            subarray.activity_row_read = active as f64 / num_row as f64 / self.num_bit_input as f64;
            subarray.read_dynamic_energy += self.cost_model.sub_array_read_energy(subarray);
            subarray.read_dynamic_energy += self.cost_model.neuron_read_energy(subarray, &peripherals);
            subarray.read_latency += self.cost_model.sub_array_read_latency(subarray);
            subarray.read_latency += self.cost_model.neuron_read_latency(subarray, &peripherals);
            cycles += 1;
        }
        trace!(
            target: "nvmsim-npu-train-engine",
            "Layer {} read: {} active rows over {} cycles",
            layer.id.as_str(),
            active,
            cycles
        );
    }
}

/// `out[j] = Σ_k w[j][k] x[k]`, one output neuron per task.
pub fn algorithmic_layer(weights: ArrayView2<f64>, inputs: ArrayView1<f64>) -> Array1<f64> {
    Zip::from(weights.rows()).par_map_collect(|row| row.dot(&inputs))
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;
    use nvmsim_config::SimConfig;
    use nvmsim_npu_device::AnalyticalCostModel;

    fn params(hardware: bool, cell: &str) -> TrainingParams {
        let mut config = SimConfig::default();
        config.network.num_input = 4;
        config.network.num_hidden = 3;
        config.network.num_output = 2;
        config.network.num_bit_input = 2;
        config.network.num_input_level = 4;
        config.periphery.num_bit_partial_sum = 24;
        config.periphery.num_col_muxed = 1;
        config.device.cell = cell.to_string();
        config.device.ltp_nonlinearity = 0.0;
        config.device.ltd_nonlinearity = 0.0;
        config.training.use_hardware_in_training_ff = hardware;
        TrainingParams::from_config(&config).unwrap()
    }

    fn weights() -> (ndarray::Array2<f64>, ndarray::Array2<f64>) {
        (
            array![[0.5, -0.25, 0.75, -1.0], [0.1, 0.2, -0.3, 0.4], [-0.6, 0.0, 0.9, 0.3]],
            array![[0.3, -0.7, 0.2], [-0.5, 0.6, 0.1]],
        )
    }

    fn engine(p: &TrainingParams) -> ForwardEngine {
        ForwardEngine::new(p, Arc::new(AnalyticalCostModel::default()))
    }

    #[test]
    fn test_algorithmic_layer_is_matvec() {
        let w = array![[1.0, 2.0], [-1.0, 0.5]];
        let x = array![0.5, 1.0];
        assert_eq!(algorithmic_layer(w.view(), x.view()), array![2.5, 0.0]);
    }

    #[test]
    fn test_hardware_read_matches_digitized_product() {
        let p = params(true, "analog");
        let (w1, w2) = weights();
        let mut net = TwoLayerNetwork::with_weights(w1, w2, &p).unwrap();
        let sample = Sample::new(array![1.0, 0.0, 0.67, 0.33], array![1.0, 0.0], 4, 0.5).unwrap();
        let x_hat = sample.digitized.iter().map(|&l| l as f64 / 3.0).collect::<Array1<f64>>();
        let expected = algorithmic_layer(net.ih.weights.view(), x_hat.view());

        let mut ctx = SimulationContext::new();
        let out = engine(&p).hardware_layer(&mut net.ih, &sample.digitized, &mut ctx);
        for (got, want) in out.iter().zip(expected.iter()) {
            assert!((got - want).abs() < 1e-3, "hardware {} vs algorithmic {}", got, want);
        }
        assert!(net.ih.crossbar.read_energy > 0.0);
        assert!(net.ih.subarray.read_dynamic_energy > 0.0);
        assert!(net.ih.subarray.read_latency > 0.0);
    }

    #[test]
    fn test_digital_cells_read_as_weights() {
        let p = params(true, "digital");
        let (w1, w2) = weights();
        let mut net = TwoLayerNetwork::with_weights(w1, w2, &p).unwrap();
        let levels = vec![3, 0, 1, 2];
        let x_hat = array![1.0, 0.0, 1.0 / 3.0, 2.0 / 3.0];
        let expected = algorithmic_layer(net.ih.weights.view(), x_hat.view());
        let mut ctx = SimulationContext::new();
        let out = engine(&p).hardware_layer(&mut net.ih, &levels, &mut ctx);
        for (got, want) in out.iter().zip(expected.iter()) {
            assert!((got - want).abs() < 1e-12);
        }
        assert_eq!(net.ih.crossbar.read_energy, 0.0);
    }

    #[test]
    fn test_read_cycles_follow_column_mux() {
        let mut p = params(true, "analog");
        p.num_col_muxed = 3;
        let (w1, w2) = weights();
        let mut net = TwoLayerNetwork::with_weights(w1, w2, &p).unwrap();
        let mut ctx = SimulationContext::new();
        engine(&p).hardware_layer(&mut net.ih, &[1, 1, 1, 1], &mut ctx);

        let model = AnalyticalCostModel::default();
        let sa = &net.ih.subarray;
        let per_cycle = model.sub_array_read_latency(sa) + model.neuron_read_latency(sa, &sa.peripherals);
        // 3 columns, batch ceil(3/3) = 1: three cycles
        assert!((sa.read_latency - 3.0 * per_cycle).abs() < 1e-18);
        assert!((sa.activity_row_read - 0.5).abs() < 1e-12);
    }

    #[test]
    fn test_run_produces_hidden_levels() {
        let p = params(false, "analog");
        let (w1, w2) = weights();
        let mut net = TwoLayerNetwork::with_weights(w1, w2, &p).unwrap();
        let sample = Sample::new(array![1.0, 0.0, 0.5, 0.25], array![1.0, 0.0], 4, 0.5).unwrap();
        let mut ctx = SimulationContext::new();
        let pass = engine(&p).run(&mut net, &sample, &mut ctx).unwrap();
        assert_eq!(pass.a1.len(), 3);
        assert_eq!(pass.a2.len(), 2);
        for (a, d) in pass.a1.iter().zip(pass.da1.iter()) {
            assert!((0.0..=1.0).contains(a));
            assert!(*d <= 3);
        }
        assert_eq!(net.ih.crossbar.read_energy, 0.0);
    }
}
