// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

/*
 * Copyright 2025 Neuraville Inc.
 *
 * Licensed under the Apache License, Version 2.0 (the "License");
 * you may not use this file except in compliance with the License.
 */

//! # Training loop
//!
//! Per sample:
//!
//! 1. Forward through both layers (hardware or algorithmic).
//! 2. Back-propagate the output error with the pre-update weights.
//! 3. Update the input-to-hidden layer with the analog inputs and `s1`, then the
//!    hidden-to-output layer with `a1` and `s2`.
//! 4. Every `transfer_interval` samples, run a transfer pass on both arrays.
//!
//! Everything runs inside one rayon pool sized from the configuration.

use std::sync::Arc;

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use rayon::ThreadPool;
use tracing::{debug, info};

use nvmsim_npu_device::{AnalyticalCostModel, PeripheralCostModel};
use nvmsim_npu_plasticity::{
    transfer_layer, BatchClock, SimulationContext, TransferSummary, WeightUpdateEngine,
};

use crate::backprop::backpropagate;
use crate::error::{Result, TrainError};
use crate::forward::{ForwardEngine, ForwardPass};
use crate::network::TwoLayerNetwork;
use crate::params::TrainingParams;
use crate::report::{ArrayReport, TrainingReport};
use crate::sample::{Dataset, Sample};

/// Mixed into the run seed for the sample-selection stream.
const SAMPLING_SEED_SALT: u64 = 0x5a3b_1e00;

pub struct Trainer {
    params: TrainingParams,
    network: TwoLayerNetwork,
    forward: ForwardEngine,
    update: WeightUpdateEngine,
    cost_model: Arc<dyn PeripheralCostModel>,
    pool: Arc<ThreadPool>,
    ctx: SimulationContext,
    rng: StdRng,
    samples_seen: u64,
    epoch_loss: Vec<f64>,
}

impl Trainer {
    /// Randomly initialized network with the analytical cost model.
    pub fn new(params: TrainingParams) -> Result<Self> {
        let network = TwoLayerNetwork::new(&params)?;
        Self::with_network(params, network, Arc::new(AnalyticalCostModel::default()))
    }

    pub fn with_network(
        params: TrainingParams,
        network: TwoLayerNetwork,
        cost_model: Arc<dyn PeripheralCostModel>,
    ) -> Result<Self> {
        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(params.num_threads)
            .thread_name(|i| format!("nvmsim-train-{}", i))
            .build()?;
        let forward = ForwardEngine::new(&params, Arc::clone(&cost_model));
        let update = WeightUpdateEngine::new(params.update.clone(), Arc::clone(&cost_model))?;
        let rng = StdRng::seed_from_u64(params.seed ^ SAMPLING_SEED_SALT);
        Ok(Self {
            params,
            network,
            forward,
            update,
            cost_model,
            pool: Arc::new(pool),
            ctx: SimulationContext::new(),
            rng,
            samples_seen: 0,
            epoch_loss: Vec::new(),
        })
    }

    pub fn params(&self) -> &TrainingParams {
        &self.params
    }

    pub fn network(&self) -> &TwoLayerNetwork {
        &self.network
    }

    pub fn context(&self) -> &SimulationContext {
        &self.ctx
    }

    /// Run `epochs x num_train` steps over `dataset` and return the run report.
    ///
    /// Run totals and array energies start from zero on every call; weights and optimizer
    /// state carry over.
    pub fn train(&mut self, dataset: &Dataset) -> Result<TrainingReport> {
        dataset.check_shape(self.params.num_input, self.params.num_output)?;
        self.ctx.reset();
        for layer in self.network.layers_mut() {
            layer.crossbar.reset_energy();
            layer.subarray.reset();
        }
        self.samples_seen = 0;
        self.epoch_loss.clear();

        info!(
            target: "nvmsim-npu-train-engine",
            "Training {} epochs x {} samples ({} optimizer, hardware FF={}, WU={}, {} threads)",
            self.params.epochs,
            self.params.num_train,
            self.params.update.optimizer.name(),
            self.params.use_hardware_ff(),
            self.params.use_hardware_wu(),
            self.pool.current_num_threads()
        );

        let pool = Arc::clone(&self.pool);
        pool.install(|| {
            for epoch in 0..self.params.epochs {
                let loss = self.run_epoch(epoch, dataset)?;
                self.epoch_loss.push(loss);
                info!(
                    target: "nvmsim-npu-train-engine",
                    "Epoch {} done: mean squared error {:.6}, pulses {}",
                    epoch,
                    loss,
                    self.ctx.total_num_pulse
                );
            }
            Ok::<(), TrainError>(())
        })?;

        Ok(self.report())
    }

    fn run_epoch(&mut self, epoch: u32, dataset: &Dataset) -> Result<f64> {
        let mut loss_sum = 0.0;
        for step in 0..self.params.num_train {
            let index = if self.params.random_sampling {
                self.rng.gen_range(0..dataset.len())
            } else {
                step % dataset.len()
            };
            let sample = dataset
                .get(index)
                .ok_or_else(|| TrainError::Dataset(format!("sample {} out of range", index)))?;
            let clock = BatchClock::new(epoch, step, self.params.update.batch_size);
            let pass = self.train_step(sample, &clock)?;
            loss_sum += squared_error(&pass, sample);
        }
        Ok(loss_sum / self.params.num_train.max(1) as f64)
    }

    /// Forward, backprop and both layer updates for one sample.
    pub fn train_step(&mut self, sample: &Sample, clock: &BatchClock) -> Result<ForwardPass> {
        let pass = self.forward.run(&mut self.network, sample, &mut self.ctx)?;
        let terms = backpropagate(
            pass.a1.view(),
            pass.a2.view(),
            sample.target.view(),
            self.network.ho.weights.view(),
        )?;

        self.update.update_layer(
            &mut self.network.ih,
            sample.input.view(),
            terms.s1.view(),
            self.params.alpha1,
            clock,
            &mut self.ctx,
        )?;
        self.update.update_layer(
            &mut self.network.ho,
            pass.a1.view(),
            terms.s2.view(),
            self.params.alpha2,
            clock,
            &mut self.ctx,
        )?;

        self.samples_seen += 1;
        let interval = self.params.transfer_interval as u64;
        if interval > 0 && self.samples_seen % interval == 0 {
            self.transfer();
        }
        Ok(pass)
    }

    /// One transfer pass over both arrays.
    pub fn transfer(&mut self) -> [TransferSummary; 2] {
        let bounds = self.params.bounds;
        let muxed = self.params.update.num_write_col_muxed;
        let [ih, ho] = self.network.layers_mut();
        let summaries = [
            transfer_layer(ih, &bounds, muxed, self.cost_model.as_ref(), &mut self.ctx),
            transfer_layer(ho, &bounds, muxed, self.cost_model.as_ref(), &mut self.ctx),
        ];
        debug!(
            target: "nvmsim-npu-train-engine",
            "Transfer after {} samples: {} + {} cells",
            self.samples_seen,
            summaries[0].cells_transferred,
            summaries[1].cells_transferred
        );
        summaries
    }

    pub fn report(&self) -> TrainingReport {
        TrainingReport {
            optimizer: self.params.update.optimizer.name().to_string(),
            cell: self.params.template.kind().as_str().to_string(),
            epochs: self.params.epochs,
            samples_seen: self.samples_seen,
            epoch_loss: self.epoch_loss.clone(),
            arrays: vec![
                ArrayReport::from_layer(&self.network.ih),
                ArrayReport::from_layer(&self.network.ho),
            ],
            totals: self.ctx.clone(),
        }
    }
}

fn squared_error(pass: &ForwardPass, sample: &Sample) -> f64 {
    let n = sample.target.len().max(1) as f64;
    pass.a2
        .iter()
        .zip(sample.target.iter())
        .map(|(a, t)| (t - a).powi(2))
        .sum::<f64>()
        / n
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;
    use nvmsim_config::SimConfig;

    fn params(epochs: u32, num_train: usize) -> TrainingParams {
        let mut config = SimConfig::default();
        config.network.num_input = 2;
        config.network.num_hidden = 2;
        config.network.num_output = 1;
        config.training.epochs = epochs;
        config.training.num_train = num_train;
        config.training.random_sampling = false;
        config.parallel.num_threads = 1;
        TrainingParams::from_config(&config).unwrap()
    }

    fn dataset() -> Dataset {
        Dataset::from_arrays(&array![[1.0, 0.0], [0.0, 1.0]], &array![[1.0], [0.0]], 2, 0.5).unwrap()
    }

    #[test]
    fn test_train_counts_samples_and_epochs() {
        let mut trainer = Trainer::new(params(3, 4)).unwrap();
        let report = trainer.train(&dataset()).unwrap();
        assert_eq!(report.samples_seen, 12);
        assert_eq!(report.epoch_loss.len(), 3);
        assert_eq!(report.arrays.len(), 2);
        assert_eq!(report.arrays[0].layer, "IH");
    }

    #[test]
    fn test_train_rejects_wrong_dataset_width() {
        let mut trainer = Trainer::new(params(1, 1)).unwrap();
        let ds = Dataset::from_arrays(&array![[1.0, 0.0, 1.0]], &array![[1.0]], 2, 0.5).unwrap();
        assert!(matches!(trainer.train(&ds), Err(TrainError::ShapeMismatch { .. })));
    }

    #[test]
    fn test_weights_stay_in_bounds() {
        let p = params(2, 8);
        let bounds = p.bounds;
        let mut trainer = Trainer::new(p).unwrap();
        trainer.train(&dataset()).unwrap();
        let net = trainer.network();
        for w in net.ih.weights.iter().chain(net.ho.weights.iter()) {
            assert!(*w >= bounds.min && *w <= bounds.max);
        }
    }
}
