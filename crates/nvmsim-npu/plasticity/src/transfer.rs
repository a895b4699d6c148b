// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

/*
 * Copyright 2025 Neuraville Inc.
 *
 * Licensed under the Apache License, Version 2.0 (the "License");
 * you may not use this file except in compliance with the License.
 */

//! Weight-transfer maintenance for two-stage synapses
//!
//! - 2T1F: merge every capacitor into its slow element. A row costs one transfer pulse
//!   width per polarity that any of its cells needed.
//! - Hybrid: read the whole array, move each LSB deviation into the MSB pair, then account
//!   the MSB writes per write batch like a regular update.
//!
//! Other technologies have nothing to transfer.

use tracing::debug;

use nvmsim_npu_device::{CellKind, PeripheralCostModel, WeightBounds};

use crate::context::SimulationContext;
use crate::layer::SynapticLayer;

#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct TransferSummary {
    pub cells_transferred: u64,
    pub pulses: u64,
    pub energy: f64,
    pub latency: f64,
}

/// Run one transfer pass over `layer` and refresh its weights from the cells.
pub fn transfer_layer(
    layer: &mut SynapticLayer,
    bounds: &WeightBounds,
    num_write_col_muxed: usize,
    cost_model: &dyn PeripheralCostModel,
    ctx: &mut SimulationContext,
) -> TransferSummary {
    let summary = match layer.crossbar.kind() {
        CellKind::DualTransistor => transfer_dual(layer, bounds, ctx),
        CellKind::Hybrid => transfer_hybrid(layer, bounds, num_write_col_muxed, cost_model, ctx),
        CellKind::Analog | CellKind::Digital => return TransferSummary::default(),
    };
    ctx.transfer_passes += 1;
    debug!(
        target: "nvmsim-npu-plasticity",
        "Transfer on layer {}: {} cells, {} pulses, {:.3e} J, {:.3e} s",
        layer.id.as_str(),
        summary.cells_transferred,
        summary.pulses,
        summary.energy,
        summary.latency
    );
    summary
}

fn transfer_dual(layer: &mut SynapticLayer, bounds: &WeightBounds, ctx: &mut SimulationContext) -> TransferSummary {
    let (num_col, num_row) = layer.weights.dim();
    let cap_col = layer.crossbar.wire().cap_col;
    let mut summary = TransferSummary::default();

    for k in 0..num_row {
        let mut row_ltp = 0.0f64;
        let mut row_ltd = 0.0f64;
        for j in 0..num_col {
            let cell = layer.crossbar.cell_mut(j, k);
            let Some(outcome) = cell.transfer_weight(cap_col) else {
                continue;
            };
            row_ltp = row_ltp.max(outcome.latency_ltp);
            row_ltd = row_ltd.max(outcome.latency_ltd);
            if outcome.pulses_ltp != 0 || outcome.pulses_ltd != 0 {
                summary.cells_transferred += 1;
            }
            summary.pulses += (outcome.pulses_ltp.unsigned_abs() + outcome.pulses_ltd.unsigned_abs()) as u64;
            if outcome.write_energy.is_nan() {
                ctx.nan_energy_events += 1;
            } else {
                layer.crossbar.transfer_energy += outcome.write_energy;
                summary.energy += outcome.write_energy;
            }
            layer.weights[[j, k]] = layer.crossbar.conductance_to_weight(j, k, bounds);
        }
        layer.subarray.transfer_latency += row_ltp + row_ltd;
        summary.latency += row_ltp + row_ltd;
    }
    summary
}

fn transfer_hybrid(
    layer: &mut SynapticLayer,
    bounds: &WeightBounds,
    num_write_col_muxed: usize,
    cost_model: &dyn PeripheralCostModel,
    ctx: &mut SimulationContext,
) -> TransferSummary {
    let (num_col, num_row) = layer.weights.dim();
    let wire = *layer.crossbar.wire();
    let vdd = layer.crossbar.vdd();
    let read_voltage = layer.crossbar.read_window(0, 0).read_voltage;
    let batch = layer.subarray.write_batch(num_write_col_muxed);
    let mut summary = TransferSummary::default();

    // whole-array read
    let line_read = num_row as f64
        * (wire.cap_row * read_voltage * read_voltage + wire.gate_cap_row * vdd * vdd);
    layer.crossbar.transfer_read_energy += line_read;
    summary.energy += line_read;
    layer.subarray.activity_row_read = 1.0;
    let read_energy = cost_model.sub_array_read_energy(&layer.subarray);
    let read_latency = num_row as f64 * cost_model.sub_array_read_latency(&layer.subarray);
    layer.subarray.transfer_read_dynamic_energy += read_energy;
    layer.subarray.transfer_read_latency += read_latency;

    let mut sum_write_latency = 0.0;
    let mut num_write_operation = 0.0;
    let mut write_dynamic = 0.0;

    for k in 0..num_row {
        let mut row_pulses = 0u64;
        let mut row_sq = 0.0;
        let mut operations = 0.0;
        let mut start = 0;
        while start < num_col {
            let end = (start + batch).min(num_col);
            let mut max_ltp = 0.0f64;
            let mut max_ltd = 0.0f64;
            for j in start..end {
                let Some(outcome) = layer.crossbar.cell_mut(j, k).transfer_weight(wire.cap_col) else {
                    continue;
                };
                max_ltp = max_ltp.max(outcome.latency_ltp);
                max_ltd = max_ltd.max(outcome.latency_ltd);
                let pulses = (outcome.pulses_ltp.unsigned_abs() + outcome.pulses_ltd.unsigned_abs()) as u64;
                if pulses > 0 {
                    summary.cells_transferred += 1;
                }
                row_pulses += pulses;
                row_sq += outcome.write_voltage_square_sum;
                for (energy, slot) in [
                    (outcome.read_energy, &mut layer.crossbar.transfer_read_energy),
                    (outcome.write_energy, &mut layer.crossbar.transfer_write_energy),
                ] {
                    if energy.is_nan() {
                        ctx.nan_energy_events += 1;
                    } else {
                        *slot += energy;
                        summary.energy += energy;
                    }
                }
                layer.weights[[j, k]] = layer.crossbar.conductance_to_weight(j, k, bounds);
            }
            sum_write_latency += max_ltp + max_ltd;
            operations += 1.0;
            start = end;
        }
        summary.pulses += row_pulses;
        num_write_operation += operations;

        layer.subarray.num_write_pulse = row_pulses as f64 / num_col as f64;
        if row_pulses > 0 {
            layer.subarray.write_voltage = (row_sq / row_pulses as f64).sqrt();
        }
        let e = cost_model.sub_array_write_energy(&layer.subarray, operations, batch as f64);
        layer.subarray.transfer_write_dynamic_energy += e;
        write_dynamic += e;
    }

    let write_latency = cost_model.sub_array_write_latency(
        &layer.subarray,
        num_write_operation / num_row as f64,
        sum_write_latency,
    );
    layer.subarray.transfer_write_latency += write_latency;
    layer.subarray.transfer_dynamic_energy += read_energy + write_dynamic;
    layer.subarray.transfer_latency += read_latency + write_latency;
    layer.crossbar.transfer_energy += summary.energy;
    summary.latency = read_latency + write_latency;
    summary
}
