// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

//! End-to-end training scenarios

use ndarray::{array, Array1, Array2};
use nvmsim_config::SimConfig;
use nvmsim_npu_plasticity::BatchClock;
use nvmsim_npu_train_engine::activation::sigmoid;
use nvmsim_npu_train_engine::{Dataset, Sample, Trainer, TrainingParams, TwoLayerNetwork};

fn config_2_2_1() -> SimConfig {
    let mut config = SimConfig::default();
    config.network.num_input = 2;
    config.network.num_hidden = 2;
    config.network.num_output = 1;
    config.training.random_sampling = false;
    config.parallel.num_threads = 1;
    config
}

fn algorithmic(mut config: SimConfig) -> SimConfig {
    config.training.use_hardware_in_training_ff = false;
    config.training.use_hardware_in_training_wu = false;
    config
}

#[test]
fn test_single_sgd_step_matches_hand_computation() {
    let mut config = algorithmic(config_2_2_1());
    config.training.alpha1 = 0.1;
    config.training.alpha2 = 0.1;
    let params = TrainingParams::from_config(&config).unwrap();
    let bounds = params.bounds;

    let net = TwoLayerNetwork::with_weights(
        array![[0.2, -0.4], [0.7, 0.1]],
        array![[0.5, -0.3]],
        &params,
    )
    .unwrap();
    let w1 = net.ih.weights.clone();
    let w2 = net.ho.weights.clone();
    let mut trainer = Trainer::with_network(
        params,
        net,
        std::sync::Arc::new(nvmsim_npu_device::AnalyticalCostModel::default()),
    )
    .unwrap();

    let x = array![1.0, 0.0];
    let sample = Sample::new(x.clone(), array![1.0], 2, 0.5).unwrap();
    let pass = trainer.train_step(&sample, &BatchClock::new(0, 0, 1)).unwrap();

    // out1 = [0.2, 0.7], out2 = 0.5 a1[0] - 0.3 a1[1]
    let hand_a1 = [0.549833997312478, 0.6681877721681662];
    assert!((pass.out1[0] - 0.2).abs() < 1e-9 && (pass.out1[1] - 0.7).abs() < 1e-9);
    for (g, e) in pass.a1.iter().zip(hand_a1.iter()) {
        assert!((g - e).abs() < 1e-9, "a1 {} vs {}", g, e);
    }
    assert!((pass.out2[0] - 0.07446066700578913).abs() < 1e-9);
    assert!((pass.a2[0] - 0.5186065707039244).abs() < 1e-9, "a2 {}", pass.a2[0]);

    let a1: Array1<f64> = w1.dot(&x).mapv(sigmoid);
    let a2 = sigmoid(w2.row(0).dot(&a1));
    assert!((pass.a2[0] - a2).abs() < 1e-12);
    let s2 = -2.0 * a2 * (1.0 - a2) * (1.0 - a2);
    let s1: Array1<f64> = Array1::from_shape_fn(2, |j| a1[j] * (1.0 - a1[j]) * w2[[0, j]] * s2);

    let expect_w1 = Array2::from_shape_fn((2, 2), |(j, k)| bounds.clamp(w1[[j, k]] - 0.1 * s1[j] * x[k]));
    let expect_w2 = Array2::from_shape_fn((1, 2), |(j, k)| bounds.clamp(w2[[j, k]] - 0.1 * s2 * a1[k]));

    let got = trainer.network();
    for (g, e) in got.ih.weights.iter().zip(expect_w1.iter()) {
        assert!((g - e).abs() < 1e-9, "w1 {} vs {}", g, e);
    }
    for (g, e) in got.ho.weights.iter().zip(expect_w2.iter()) {
        assert!((g - e).abs() < 1e-9, "w2 {} vs {}", g, e);
    }
    // Input 1 is zero, so its column is untouched
    assert_eq!(got.ih.weights[[0, 1]], w1[[0, 1]]);
}

#[test]
fn test_batch_optimizer_writes_only_on_boundary() {
    let mut config = algorithmic(config_2_2_1());
    config.optimizer.name = "Momentum".to_string();
    config.training.batch_size = 3;
    let params = TrainingParams::from_config(&config).unwrap();
    let mut trainer = Trainer::new(params).unwrap();
    let sample = Sample::new(array![1.0, 1.0], array![1.0], 2, 0.5).unwrap();

    let before = trainer.network().ho.weights.clone();
    for step in 0..2 {
        trainer.train_step(&sample, &BatchClock::new(0, step, 3)).unwrap();
        assert_eq!(trainer.network().ho.weights, before, "changed at step {}", step);
    }
    trainer.train_step(&sample, &BatchClock::new(0, 2, 3)).unwrap();
    assert_ne!(trainer.network().ho.weights, before);
}

#[test]
fn test_fixed_seed_is_reproducible_across_thread_counts() {
    let dataset = Dataset::from_arrays(
        &array![[1.0, 0.0], [0.0, 1.0], [1.0, 1.0]],
        &array![[1.0], [0.0], [1.0]],
        2,
        0.5,
    )
    .unwrap();
    let run = |threads: usize| {
        let mut config = config_2_2_1();
        config.training.epochs = 2;
        config.training.num_train = 6;
        config.training.random_sampling = true;
        config.training.seed = 7;
        config.parallel.num_threads = threads;
        let mut trainer = Trainer::new(TrainingParams::from_config(&config).unwrap()).unwrap();
        let report = trainer.train(&dataset).unwrap();
        (report, trainer.network().ih.weights.clone(), trainer.network().ho.weights.clone())
    };

    let single = run(1);
    assert_eq!(single, run(1));
    assert_eq!(single, run(4));
    assert!(single.0.totals.total_num_pulse > 0);
    assert!(single.0.arrays[0].array_read_energy > 0.0);
}

#[test]
fn test_algorithmic_training_reduces_error() {
    let mut config = algorithmic(config_2_2_1());
    config.training.epochs = 200;
    config.training.num_train = 2;
    let dataset = Dataset::from_arrays(&array![[1.0, 0.0], [0.0, 1.0]], &array![[1.0], [0.0]], 2, 0.5).unwrap();
    let mut trainer = Trainer::new(TrainingParams::from_config(&config).unwrap()).unwrap();
    let report = trainer.train(&dataset).unwrap();
    let first = report.epoch_loss[0];
    let last = *report.epoch_loss.last().unwrap();
    assert!(last < first, "loss went from {} to {}", first, last);
}

#[test]
fn test_periodic_transfer_on_dual_transistor_cells() {
    let mut config = config_2_2_1();
    config.device.cell = "2t1f".to_string();
    config.transfer.interval_samples = 2;
    config.training.num_train = 4;
    let dataset = Dataset::from_arrays(&array![[1.0, 1.0]], &array![[1.0]], 2, 0.5).unwrap();
    let mut trainer = Trainer::new(TrainingParams::from_config(&config).unwrap()).unwrap();
    let report = trainer.train(&dataset).unwrap();
    // Two passes, each over both arrays
    assert_eq!(report.totals.transfer_passes, 4);
    assert_eq!(report.cell, "2t1f");
}
