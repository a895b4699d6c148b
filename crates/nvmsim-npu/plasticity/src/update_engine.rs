// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

/*
 * Copyright 2025 Neuraville Inc.
 *
 * Licensed under the Apache License, Version 2.0 (the "License");
 * you may not use this file except in compliance with the License.
 */

//! # Weight-update engine
//!
//! Turns one sample's back-propagated deltas into cell writes for a layer:
//!
//! 1. `g = delta[j] * x[k]` per synapse, fed through the optimizer batch policy.
//! 2. The requested delta is clamped to the weight bounds for diagnostics.
//! 3. Analog cells receive a pulse count (stochastic coincidences, or the optimizer delta
//!    on the cell's pulse grid); digital cells receive the clamped delta. The realized
//!    weight is read back into the weight matrix.
//! 4. Columns are written in batches of `ceil(n_out / num_write_col_muxed)`; batch latency
//!    is the max over the batch.
//! 5. Array and peripheral write energy/latency are accumulated per row.
//!
//! Rows are processed in parallel. Each row returns a [`RowReport`] and the reports are
//! folded in row order afterwards, so totals do not depend on thread scheduling.

use std::sync::Arc;

use ndarray::{Array1, Array2, ArrayView1, ArrayViewMut1, Axis, Zip};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use tracing::{debug, trace, warn};

use nvmsim_npu_device::{DeviceCell, PeripheralCostModel, WeightBounds, WireParasitics};

use crate::context::SimulationContext;
use crate::error::{PlasticityError, Result};
use crate::history::SynapseHistory;
use crate::layer::SynapticLayer;
use crate::optimizer::{optimizer_step, BatchClock, Optimizer, OptimizerHyperParams, StepOutcome};
use crate::pulse_train::{net_pulses, stochastic_constant, EncodedOperand, Operand, StreamKey};

/// How analog cells turn an update into pulses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PulseScheme {
    /// Coincidences of stochastic input/delta bitstreams
    #[default]
    Stochastic,
    /// Optimizer delta mapped onto the cell's nominal pulse grid
    Optimizer,
}

impl PulseScheme {
    pub fn from_name(name: &str) -> Option<Self> {
        match name.trim().to_ascii_lowercase().as_str() {
            "stochastic" => Some(Self::Stochastic),
            "optimizer" => Some(Self::Optimizer),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct UpdateSettings {
    pub optimizer: Optimizer,
    pub hyper: OptimizerHyperParams,
    pub batch_size: usize,
    pub stream_length: usize,
    pub probability_scale: f64,
    pub pulse_scheme: PulseScheme,
    pub use_hardware_in_training_ff: bool,
    pub use_hardware_in_training_wu: bool,
    pub write_energy_report: bool,
    pub num_write_col_muxed: usize,
    pub bounds: WeightBounds,
    pub seed: u64,
}

impl Default for UpdateSettings {
    fn default() -> Self {
        Self {
            optimizer: Optimizer::Sgd,
            hyper: OptimizerHyperParams::default(),
            batch_size: 1,
            stream_length: 40,
            probability_scale: 0.05,
            pulse_scheme: PulseScheme::Stochastic,
            use_hardware_in_training_ff: true,
            use_hardware_in_training_wu: true,
            write_energy_report: true,
            num_write_col_muxed: 16,
            bounds: WeightBounds::default(),
            seed: 0,
        }
    }
}

impl UpdateSettings {
    pub fn validate(&self) -> Result<()> {
        if self.stream_length == 0 {
            return Err(PlasticityError::InvalidSetting {
                field: "stream_length",
                reason: "must be at least 1".to_string(),
            });
        }
        if !(self.probability_scale.is_finite() && self.probability_scale > 0.0) {
            return Err(PlasticityError::InvalidSetting {
                field: "probability_scale",
                reason: format!("must be positive, got {}", self.probability_scale),
            });
        }
        if self.batch_size == 0 {
            return Err(PlasticityError::InvalidSetting {
                field: "batch_size",
                reason: "must be at least 1".to_string(),
            });
        }
        Ok(())
    }
}

/// Per-row partial results of one layer update.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct RowReport {
    pub wrote: bool,
    /// Sum over batches of the largest clamped delta magnitude
    pub max_weight_updated: f64,
    /// Sum over batches of the largest pulse magnitude
    pub max_pulse_sum: u64,
    pub total_pulses: u64,
    pub saturated: u64,
    pub skipped_flushes: u64,
    pub nan_energy_events: u64,
    /// Cell, line and half-selected energy of this row
    pub array_write_energy: f64,
    /// Sum over batches of max LTP + max LTD latency
    pub sum_write_latency: f64,
    pub num_write_operation: f64,
    pub voltage_square_sum: f64,
    pub voltage_pulses: u64,
}

/// Summary of one layer update.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct LayerUpdateSummary {
    pub wrote: bool,
    pub total_pulses: u64,
    pub saturated: u64,
    pub array_write_energy: f64,
}

/// Half-selected conductance sums used on cross-point arrays.
struct HalfSelect {
    snapshot: Array2<(f64, f64)>,
    col_sums: Vec<(f64, f64)>,
    row_sums: Vec<(f64, f64)>,
}

impl HalfSelect {
    fn new(snapshot: Array2<(f64, f64)>) -> Self {
        let add = |a: (f64, f64), b: &(f64, f64)| (a.0 + b.0, a.1 + b.1);
        let col_sums = snapshot
            .axis_iter(Axis(0))
            .map(|col| col.iter().fold((0.0, 0.0), add))
            .collect();
        let row_sums = snapshot
            .axis_iter(Axis(1))
            .map(|row| row.iter().fold((0.0, 0.0), add))
            .collect();
        Self {
            snapshot,
            col_sums,
            row_sums,
        }
    }

    /// Half-selected conductance seen while row `k`, columns `start..end` are written.
    fn for_batch(&self, k: usize, start: usize, end: usize) -> (f64, f64) {
        let mut in_batch = (0.0, 0.0);
        let mut other_rows = (0.0, 0.0);
        for j in start..end {
            let g = self.snapshot[[j, k]];
            in_batch.0 += g.0;
            in_batch.1 += g.1;
            other_rows.0 += self.col_sums[j].0 - g.0;
            other_rows.1 += self.col_sums[j].1 - g.1;
        }
        let row = self.row_sums[k];
        (
            row.0 - in_batch.0 + other_rows.0,
            row.1 - in_batch.1 + other_rows.1,
        )
    }
}

/// Read-only state shared by all rows of one pass.
struct Pass<'a> {
    clock: &'a BatchClock,
    learning_rate: f64,
    inputs: ArrayView1<'a, f64>,
    deltas: ArrayView1<'a, f64>,
    enc_inputs: &'a [EncodedOperand],
    enc_deltas: &'a [EncodedOperand],
    write_now: bool,
    account: bool,
    batch: usize,
    num_row: usize,
    wire: WireParasitics,
    vdd: f64,
    cmos_access: bool,
    nominal_voltage: (f64, f64),
    half_select: Option<&'a HalfSelect>,
}

pub struct WeightUpdateEngine {
    settings: UpdateSettings,
    cost_model: Arc<dyn PeripheralCostModel>,
}

impl WeightUpdateEngine {
    pub fn new(settings: UpdateSettings, cost_model: Arc<dyn PeripheralCostModel>) -> Result<Self> {
        settings.validate()?;
        if !settings.optimizer.is_recognized() {
            warn!(
                target: "nvmsim-npu-plasticity",
                "Optimizer '{}' is not recognized; batch flushes will be skipped",
                settings.optimizer.name()
            );
        }
        Ok(Self {
            settings,
            cost_model,
        })
    }

    pub fn settings(&self) -> &UpdateSettings {
        &self.settings
    }

    pub fn cost_model(&self) -> &dyn PeripheralCostModel {
        self.cost_model.as_ref()
    }

    /// Apply one sample's update to `layer`.
    ///
    /// `inputs` are the layer's input activations (`x[k]`) and `deltas` the back-propagated
    /// error terms of its outputs (`s[j]`).
    pub fn update_layer(
        &self,
        layer: &mut SynapticLayer,
        inputs: ArrayView1<f64>,
        deltas: ArrayView1<f64>,
        learning_rate: f64,
        clock: &BatchClock,
        ctx: &mut SimulationContext,
    ) -> Result<LayerUpdateSummary> {
        let (num_col, num_row) = layer.weights.dim();
        if inputs.len() != num_row {
            return Err(PlasticityError::LengthMismatch {
                what: "inputs",
                expected: num_row,
                got: inputs.len(),
            });
        }
        if deltas.len() != num_col {
            return Err(PlasticityError::LengthMismatch {
                what: "deltas",
                expected: num_col,
                got: deltas.len(),
            });
        }

        let s = &self.settings;
        let write_now = s.optimizer.updates_every_sample() || clock.is_boundary();
        let hardware = s.use_hardware_in_training_wu;
        let analog = layer.crossbar.cell(0, 0).is_analog();
        let pulsing = hardware && analog && write_now;
        let account = hardware && write_now && s.write_energy_report;
        let batch = layer.subarray.write_batch(s.num_write_col_muxed);

        let (enc_inputs, enc_deltas, clamped) = if pulsing && s.pulse_scheme == PulseScheme::Stochastic {
            self.encode_operands(layer, inputs, deltas, learning_rate, clock)
        } else {
            (Vec::new(), Vec::new(), 0)
        };
        ctx.clamped_probabilities += clamped;

        let half_select = (account && !layer.crossbar.cmos_access())
            .then(|| HalfSelect::new(layer.crossbar.half_select_snapshot()));

        let pass = Pass {
            clock,
            learning_rate,
            inputs,
            deltas,
            enc_inputs: &enc_inputs,
            enc_deltas: &enc_deltas,
            write_now,
            account,
            batch,
            num_row,
            wire: *layer.crossbar.wire(),
            vdd: layer.crossbar.vdd(),
            cmos_access: layer.crossbar.cmos_access(),
            nominal_voltage: layer.crossbar.cell(0, 0).nominal_write_voltages(),
            half_select: half_select.as_ref(),
        };

        let SynapticLayer {
            id,
            weights,
            history,
            crossbar,
            subarray,
        } = layer;

        let reports: Array1<RowReport> = Zip::indexed(weights.columns_mut())
            .and(history.columns_mut())
            .and(crossbar.cells_mut().columns_mut())
            .par_map_collect(|k, w_col, h_col, c_col| self.update_row(k, w_col, h_col, c_col, &pass));

        let mut summary = LayerUpdateSummary::default();
        let mut sum_write_latency = 0.0;
        let mut num_write_operation = 0.0;
        let mut skipped = 0;
        for report in reports.iter() {
            ctx.total_weight_update += report.max_weight_updated;
            ctx.total_num_pulse += report.max_pulse_sum;
            ctx.saturated_writes += report.saturated;
            ctx.nan_energy_events += report.nan_energy_events;
            skipped += report.skipped_flushes;
            summary.wrote |= report.wrote;
            summary.total_pulses += report.total_pulses;
            summary.saturated += report.saturated;

            if account {
                crossbar.write_energy += report.array_write_energy;
                summary.array_write_energy += report.array_write_energy;
                if report.num_write_operation > 0.0 {
                    subarray.num_write_pulse = report.total_pulses as f64 / num_col as f64;
                    subarray.write_voltage = if report.voltage_pulses > 0 {
                        (report.voltage_square_sum / report.voltage_pulses as f64).sqrt()
                    } else {
                        0.5 * (pass.nominal_voltage.0 + pass.nominal_voltage.1)
                    };
                    subarray.write_dynamic_energy += self.cost_model.sub_array_write_energy(
                        subarray,
                        report.num_write_operation,
                        batch as f64,
                    );
                }
                sum_write_latency += report.sum_write_latency;
                num_write_operation += report.num_write_operation;
            }
        }
        if account {
            subarray.write_latency += self.cost_model.sub_array_write_latency(
                subarray,
                num_write_operation / num_row as f64,
                sum_write_latency,
            );
        }
        if skipped > 0 {
            ctx.skipped_flushes += skipped;
            warn!(
                target: "nvmsim-npu-plasticity",
                "Optimizer '{}' not recognized at batch boundary (epoch {}, step {}); skipped {} synapse updates on layer {}",
                s.optimizer.name(),
                clock.epoch,
                clock.step,
                skipped,
                id.as_str()
            );
        }
        trace!(
            target: "nvmsim-npu-plasticity",
            "Layer {} update: wrote={} pulses={} saturated={}",
            id.as_str(),
            summary.wrote,
            summary.total_pulses,
            summary.saturated
        );
        Ok(summary)
    }

    /// Encode every input and delta element into its sign and phase streams.
    fn encode_operands(
        &self,
        layer: &SynapticLayer,
        inputs: ArrayView1<f64>,
        deltas: ArrayView1<f64>,
        learning_rate: f64,
        clock: &BatchClock,
    ) -> (Vec<EncodedOperand>, Vec<EncodedOperand>, u64) {
        let s = &self.settings;
        let scale = stochastic_constant(learning_rate, clock.epoch, s.stream_length, s.probability_scale);
        let key = |operand, unit: usize| StreamKey {
            seed: s.seed,
            epoch: clock.epoch,
            step: clock.step as u64,
            layer: layer.id as u8,
            operand,
            unit: unit as u32,
        };
        let encode = |values: &ArrayView1<f64>, operand| -> Vec<(EncodedOperand, bool)> {
            (0..values.len())
                .into_par_iter()
                .map(|i| EncodedOperand::encode(values[i], scale, s.stream_length, &key(operand, i)))
                .collect()
        };
        let enc_inputs = encode(&inputs, Operand::Input);
        let enc_deltas = encode(&deltas, Operand::Delta);
        let clamped = enc_inputs
            .iter()
            .chain(enc_deltas.iter())
            .filter(|(_, c)| *c)
            .count() as u64;
        debug!(
            target: "nvmsim-npu-plasticity",
            "Layer {} stochastic scale C={:.4} (epoch {})",
            layer.id.as_str(),
            scale,
            clock.epoch
        );
        (
            enc_inputs.into_iter().map(|(e, _)| e).collect(),
            enc_deltas.into_iter().map(|(e, _)| e).collect(),
            clamped,
        )
    }

    fn update_row(
        &self,
        k: usize,
        mut weights: ArrayViewMut1<f64>,
        mut history: ArrayViewMut1<SynapseHistory>,
        mut cells: ArrayViewMut1<DeviceCell>,
        pass: &Pass,
    ) -> RowReport {
        let s = &self.settings;
        let bounds = &s.bounds;
        let x = pass.inputs[k];
        let num_col = weights.len();
        let mut report = RowReport::default();

        let mut start = 0;
        while start < num_col {
            let end = (start + pass.batch).min(num_col);
            let mut max_update = 0.0f64;
            let mut max_pulse = 0u32;
            let mut max_ltp = 0.0f64;
            let mut max_ltd = 0.0f64;
            let mut changed = false;

            for j in start..end {
                let gradient = pass.deltas[j] * x;
                let h = &mut history[j];
                let delta = match optimizer_step(&s.optimizer, &s.hyper, h, gradient, pass.learning_rate, pass.clock) {
                    StepOutcome::Delta(d) => d,
                    StepOutcome::Pending => continue,
                    StepOutcome::Skipped => {
                        report.skipped_flushes += 1;
                        continue;
                    }
                };
                h.record_delta(delta);

                let w_old = weights[j];
                let target = bounds.clamp(w_old + delta);
                let actual = target - w_old;
                max_update = max_update.max(actual.abs());
                let cell = &mut cells[j];

                if s.use_hardware_in_training_wu {
                    if cell.is_analog() {
                        match s.pulse_scheme {
                            PulseScheme::Stochastic => {
                                cell.apply_pulses(net_pulses(&pass.enc_inputs[k], &pass.enc_deltas[j]));
                            }
                            PulseScheme::Optimizer => {
                                cell.write_delta(delta, w_old + delta, bounds, true);
                            }
                        }
                    } else {
                        cell.write_delta(actual, target, bounds, true);
                    }
                    weights[j] = cell.conductance_to_weight(bounds);

                    let pulses = cell.num_pulse().unsigned_abs();
                    changed |= pulses != 0;
                    max_pulse = max_pulse.max(pulses);
                    report.total_pulses += pulses as u64;
                    if cell.saturated() {
                        report.saturated += 1;
                    }
                    let (ltp, ltd) = cell.write_latency();
                    max_ltp = max_ltp.max(ltp);
                    max_ltd = max_ltd.max(ltd);
                } else {
                    weights[j] = target;
                    if s.use_hardware_in_training_ff {
                        cell.write_delta(actual, target, bounds, false);
                    }
                }
            }

            if pass.write_now {
                report.wrote = true;
                report.max_weight_updated += max_update;
                report.max_pulse_sum += max_pulse as u64;
            }
            if pass.account {
                self.account_batch(k, start, end, (max_ltp, max_ltd), changed, &mut cells, pass, &mut report);
            }
            start = end;
        }
        report
    }

    /// Cell, line and half-selected energy of one write batch.
    ///
    /// Cell and line energy and the write operation count only apply when some cell of the
    /// batch took a pulse; half-selected cells of a cross-point array are always charged.
    #[allow(clippy::too_many_arguments)]
    fn account_batch(
        &self,
        k: usize,
        start: usize,
        end: usize,
        (max_ltp, max_ltd): (f64, f64),
        changed: bool,
        cells: &mut ArrayViewMut1<DeviceCell>,
        pass: &Pass,
        report: &mut RowReport,
    ) {
        let mut phase_sq = [0.0f64; 2];
        let mut phase_pulses = [0u64; 2];
        for j in start..end {
            let cell = &mut cells[j];
            cell.set_batch_latency(max_ltp, max_ltd);
            if !changed {
                continue;
            }
            add_energy(report, cell.write_energy(pass.wire.cap_col));
            let n = cell.num_pulse();
            if n != 0 {
                let phase = usize::from(n < 0);
                phase_sq[phase] += cell.write_voltage_square_sum();
                phase_pulses[phase] += n.unsigned_abs() as u64;
            }
        }
        report.voltage_square_sum += phase_sq[0] + phase_sq[1];
        report.voltage_pulses += phase_pulses[0] + phase_pulses[1];

        let rms = |phase: usize, nominal: f64| {
            if phase_pulses[phase] > 0 {
                (phase_sq[phase] / phase_pulses[phase] as f64).sqrt()
            } else {
                nominal
            }
        };
        let v_ltp = rms(0, pass.nominal_voltage.0);
        let v_ltd = rms(1, pass.nominal_voltage.1);
        let half_sq = (0.5 * v_ltp).powi(2) + (0.5 * v_ltd).powi(2);
        let batch_len = end - start;
        let num_col = cells.len();
        let wire = &pass.wire;

        if changed {
            let line_energy = if pass.cmos_access {
                wire.gate_cap_row * pass.vdd * pass.vdd * 2.0
                    + wire.cap_row * v_ltp * v_ltp
                    + wire.cap_col * v_ltp * v_ltp * (num_col - batch_len) as f64
            } else {
                wire.cap_row * (v_ltp * v_ltp + v_ltd * v_ltd)
                    + (pass.num_row - 1) as f64 * wire.cap_row * half_sq
                    + (num_col - batch_len) as f64 * wire.cap_col * half_sq
            };
            add_energy(report, line_energy);
            report.num_write_operation += 1.0;
        }

        if let Some(hs) = pass.half_select {
            let (g_ltp, g_ltd) = hs.for_batch(k, start, end);
            let e = (0.5 * v_ltp).powi(2) * g_ltp * max_ltp + (0.5 * v_ltd).powi(2) * g_ltd * max_ltd;
            add_energy(report, e);
        }

        report.sum_write_latency += max_ltp + max_ltd;
    }
}

#[inline]
fn add_energy(report: &mut RowReport, energy: f64) {
    if energy.is_nan() {
        report.nan_energy_events += 1;
    } else {
        report.array_write_energy += energy;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::layer::LayerId;
    use ndarray::{array, Array1};
    use nvmsim_npu_device::{
        AnalogDeviceParams, AnalyticalCostModel, CellTemplate, NeuronPeripherals, ResponseCurve,
        Technology,
    };

    fn layer(weights: Array2<f64>) -> SynapticLayer {
        let template = CellTemplate::Analog(Arc::new(AnalogDeviceParams {
            ltp: ResponseCurve::linear(100),
            ltd: ResponseCurve::linear(100),
            ..AnalogDeviceParams::default()
        }));
        SynapticLayer::new(
            LayerId::InputHidden,
            weights,
            &template,
            &Technology::default(),
            NeuronPeripherals::default(),
            &WeightBounds::default(),
        )
        .unwrap()
    }

    fn engine(settings: UpdateSettings) -> WeightUpdateEngine {
        WeightUpdateEngine::new(settings, Arc::new(AnalyticalCostModel::default())).unwrap()
    }

    #[test]
    fn test_length_mismatch() {
        let mut l = layer(Array2::zeros((2, 3)));
        let e = engine(UpdateSettings::default());
        let mut ctx = SimulationContext::new();
        let r = e.update_layer(
            &mut l,
            Array1::zeros(2).view(),
            Array1::zeros(2).view(),
            0.1,
            &BatchClock::new(0, 0, 1),
            &mut ctx,
        );
        assert!(matches!(r, Err(PlasticityError::LengthMismatch { what: "inputs", .. })));
    }

    #[test]
    fn test_software_update_matches_sgd() {
        let mut l = layer(array![[0.1, -0.2], [0.3, 0.0]]);
        let e = engine(UpdateSettings {
            use_hardware_in_training_wu: false,
            use_hardware_in_training_ff: false,
            ..UpdateSettings::default()
        });
        let mut ctx = SimulationContext::new();
        let x = array![1.0, 0.5];
        let s = array![0.2, -0.4];
        e.update_layer(&mut l, x.view(), s.view(), 0.5, &BatchClock::new(0, 0, 1), &mut ctx)
            .unwrap();
        let expected = array![[0.1 - 0.1, -0.2 - 0.05], [0.3 + 0.2, 0.0 + 0.1]];
        for (a, b) in l.weights.iter().zip(expected.iter()) {
            assert!((a - b).abs() < 1e-12);
        }
        assert!(ctx.total_weight_update > 0.0);
        assert_eq!(ctx.total_num_pulse, 0);
    }

    #[test]
    fn test_clamped_delta_respects_bounds() {
        let mut l = layer(array![[0.95]]);
        let e = engine(UpdateSettings {
            use_hardware_in_training_wu: false,
            ..UpdateSettings::default()
        });
        let mut ctx = SimulationContext::new();
        e.update_layer(&mut l, array![1.0].view(), array![-10.0].view(), 1.0, &BatchClock::new(0, 0, 1), &mut ctx)
            .unwrap();
        assert_eq!(l.weights[[0, 0]], 1.0);
        assert!((ctx.total_weight_update - 0.05).abs() < 1e-12);
        // hardware forward copy follows the clamped weight
        assert!((l.crossbar.conductance_to_weight(0, 0, &WeightBounds::default()) - 1.0).abs() < 1e-9);
    }

    #[test]
    fn test_stochastic_pulse_direction() {
        let mut l = layer(array![[0.0, 0.0]]);
        let e = engine(UpdateSettings {
            stream_length: 400,
            probability_scale: 0.01,
            ..UpdateSettings::default()
        });
        let mut ctx = SimulationContext::new();
        // x > 0 and s < 0: gradient negative, weight must rise
        e.update_layer(&mut l, array![1.0, 0.0].view(), array![-1.0].view(), 0.4, &BatchClock::new(0, 0, 1), &mut ctx)
            .unwrap();
        assert!(l.weights[[0, 0]] > 0.0);
        // zero input never fires
        assert!(l.weights[[0, 1]].abs() < 1e-12);
        assert!(l.crossbar.write_energy > 0.0);
        assert!(l.subarray.write_latency > 0.0);
        assert!(ctx.total_num_pulse > 0);
    }

    #[test]
    fn test_batch_optimizer_writes_only_at_boundary() {
        let mut l = layer(array![[0.0]]);
        let e = engine(UpdateSettings {
            optimizer: Optimizer::Momentum,
            batch_size: 3,
            pulse_scheme: PulseScheme::Optimizer,
            ..UpdateSettings::default()
        });
        let mut ctx = SimulationContext::new();
        let w0 = l.weights[[0, 0]];
        for step in 0..2 {
            let r = e
                .update_layer(&mut l, array![1.0].view(), array![-0.5].view(), 0.2, &BatchClock::new(0, step, 3), &mut ctx)
                .unwrap();
            assert!(!r.wrote);
            assert_eq!(l.weights[[0, 0]], w0);
            assert_eq!(l.crossbar.write_energy, 0.0);
        }
        let r = e
            .update_layer(&mut l, array![1.0].view(), array![-0.5].view(), 0.2, &BatchClock::new(0, 2, 3), &mut ctx)
            .unwrap();
        assert!(r.wrote);
        // m = 0.7 * -1.5, delta = -0.2 * m = 0.21 -> 11 pulses of 0.02
        assert!(l.weights[[0, 0]] > 0.19 && l.weights[[0, 0]] < 0.23);
        assert_eq!(l.history[[0, 0]].grad_sum, 0.0);
    }

    #[test]
    fn test_unrecognized_optimizer_skips_write() {
        let mut l = layer(array![[0.25]]);
        let e = engine(UpdateSettings {
            optimizer: Optimizer::from_name("nadam"),
            ..UpdateSettings::default()
        });
        let mut ctx = SimulationContext::new();
        e.update_layer(&mut l, array![1.0].view(), array![1.0].view(), 0.2, &BatchClock::new(0, 0, 1), &mut ctx)
            .unwrap();
        assert_eq!(ctx.skipped_flushes, 1);
        assert!((l.weights[[0, 0]] - 0.25).abs() < 1e-12);
    }

    #[test]
    fn test_invalid_settings_rejected() {
        let bad = UpdateSettings {
            stream_length: 0,
            ..UpdateSettings::default()
        };
        assert!(WeightUpdateEngine::new(bad, Arc::new(AnalyticalCostModel::default())).is_err());
    }

    #[test]
    fn test_zero_input_row_costs_no_write_energy() {
        let mut l = layer(Array2::zeros((6, 4)));
        let e = engine(UpdateSettings::default());
        let mut ctx = SimulationContext::new();
        let r = e
            .update_layer(
                &mut l,
                Array1::zeros(4).view(),
                Array1::from_elem(6, -0.5).view(),
                0.4,
                &BatchClock::new(0, 0, 1),
                &mut ctx,
            )
            .unwrap();
        assert_eq!(r.total_pulses, 0);
        assert_eq!(ctx.total_num_pulse, 0);
        assert_eq!(l.crossbar.write_energy, 0.0);
        assert_eq!(l.subarray.write_dynamic_energy, 0.0);
        assert_eq!(l.subarray.num_write_pulse, 0.0);
    }

    #[test]
    fn test_nan_energy_is_counted_and_excluded() {
        let mut report = RowReport::default();
        add_energy(&mut report, 2.0e-12);
        add_energy(&mut report, f64::NAN);
        add_energy(&mut report, 1.0e-12);
        assert_eq!(report.nan_energy_events, 1);
        assert!((report.array_write_energy - 3.0e-12).abs() < 1e-24);
    }
}
