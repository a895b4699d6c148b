// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

/*
 * Copyright 2025 Neuraville Inc.
 *
 * Licensed under the Apache License, Version 2.0 (the "License");
 * you may not use this file except in compliance with the License.
 */

//! Gradient-descent optimizers
//!
//! Pure functions mapping a gradient and per-synapse history to a desired weight delta,
//! plus the mini-batch policy deciding when a delta is produced.

use serde::{Deserialize, Serialize};

use crate::history::SynapseHistory;

/// Optimizer hyperparameters
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct OptimizerHyperParams {
    pub momentum_gamma: f64,
    pub rmsprop_gamma: f64,
    pub rmsprop_epsilon: f64,
    pub adam_beta1: f64,
    pub adam_beta2: f64,
    pub adam_epsilon: f64,
    pub adagrad_epsilon: f64,
}

impl Default for OptimizerHyperParams {
    fn default() -> Self {
        Self {
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

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Optimizer {
    Sgd,
    Momentum,
    Adagrad,
    RmsProp,
    Adam,
    /// Name that matched no known optimizer; flushes are reported and skipped
    Unrecognized(String),
}

impl Optimizer {
    /// Case-insensitive lookup.
    pub fn from_name(name: &str) -> Self {
        match name.trim().to_ascii_lowercase().as_str() {
            "sgd" => Self::Sgd,
            "momentum" => Self::Momentum,
            "adagrad" => Self::Adagrad,
            "rmsprop" => Self::RmsProp,
            "adam" => Self::Adam,
            _ => Self::Unrecognized(name.to_string()),
        }
    }

    pub fn name(&self) -> &str {
        match self {
            Self::Sgd => "SGD",
            Self::Momentum => "Momentum",
            Self::Adagrad => "Adagrad",
            Self::RmsProp => "RMSprop",
            Self::Adam => "Adam",
            Self::Unrecognized(name) => name,
        }
    }

    #[inline]
    pub fn is_recognized(&self) -> bool {
        !matches!(self, Self::Unrecognized(_))
    }

    /// SGD produces a delta every sample; everything else only at batch boundaries.
    #[inline]
    pub fn updates_every_sample(&self) -> bool {
        matches!(self, Self::Sgd)
    }
}

/// Position of the current sample inside its epoch.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BatchClock {
    pub epoch: u32,
    /// 0-based sample index within the epoch
    pub step: usize,
    pub batch_size: usize,
}

impl BatchClock {
    pub fn new(epoch: u32, step: usize, batch_size: usize) -> Self {
        Self {
            epoch,
            step,
            batch_size: batch_size.max(1),
        }
    }

    /// True for the sample completing a mini-batch.
    #[inline]
    pub fn is_boundary(&self) -> bool {
        (self.step + 1) % self.batch_size == 0
    }

    /// 1-based index of the mini-batch that this sample completes (Adam's `t`).
    #[inline]
    pub fn batch_index(&self) -> u32 {
        ((self.step + 1) / self.batch_size).max(1) as u32
    }
}

/// Outcome of feeding one sample's gradient through the batch policy.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum StepOutcome {
    /// A weight delta to apply this sample
    Delta(f64),
    /// Accumulating inside a mini-batch
    Pending,
    /// Batch boundary with an unrecognized optimizer; accumulator dropped
    Skipped,
}

/// Stochastic gradient descent.
///
/// # Example
/// ```
/// use nvmsim_npu_plasticity::optimizer::sgd;
///
/// assert_eq!(sgd(0.5, 0.1), -0.05);
/// ```
#[inline]
pub fn sgd(gradient: f64, learning_rate: f64) -> f64 {
    -learning_rate * gradient
}

/// Momentum: `m = gamma * m_prev + (1 - gamma) * g`, `delta = -lr * m`.
///
/// # Example
/// ```
/// use nvmsim_npu_plasticity::optimizer::momentum;
///
/// let mut m = 0.0;
/// let d = momentum(1.0, 0.1, &mut m, 0.3);
/// assert!((m - 0.7).abs() < 1e-12);
/// assert!((d + 0.07).abs() < 1e-12);
/// ```
#[inline]
pub fn momentum(gradient: f64, learning_rate: f64, momentum_prev: &mut f64, gamma: f64) -> f64 {
    let m = gamma * *momentum_prev + (1.0 - gamma) * gradient;
    *momentum_prev = m;
    -learning_rate * m
}

/// Adagrad: `G += g^2`, `delta = -lr * g / (sqrt(G) + eps)`.
#[inline]
pub fn adagrad(gradient: f64, learning_rate: f64, grad_square_sum: &mut f64, epsilon: f64) -> f64 {
    *grad_square_sum += gradient * gradient;
    -learning_rate * gradient / (grad_square_sum.sqrt() + epsilon)
}

/// RMSprop: `v = gamma * v_prev + (1 - gamma) * g^2`, `delta = -lr * g / (sqrt(v) + eps)`.
///
/// # Example
/// ```
/// use nvmsim_npu_plasticity::optimizer::rmsprop;
///
/// let mut v = 0.0;
/// let d = rmsprop(2.0, 0.01, &mut v, 0.9, 1e-5);
/// assert!((v - 0.4).abs() < 1e-12);
/// assert!(d < 0.0);
/// ```
#[inline]
pub fn rmsprop(
    gradient: f64,
    learning_rate: f64,
    grad_square_prev: &mut f64,
    gamma: f64,
    epsilon: f64,
) -> f64 {
    let v = gamma * *grad_square_prev + (1.0 - gamma) * gradient * gradient;
    *grad_square_prev = v;
    -learning_rate * gradient / (v.sqrt() + epsilon)
}

/// Adam with bias correction at step `t` (1-based).
#[inline]
#[allow(clippy::too_many_arguments)]
pub fn adam(
    gradient: f64,
    learning_rate: f64,
    momentum_prev: &mut f64,
    velocity_prev: &mut f64,
    beta1: f64,
    beta2: f64,
    epsilon: f64,
    t: u32,
) -> f64 {
    let m = beta1 * *momentum_prev + (1.0 - beta1) * gradient;
    let v = beta2 * *velocity_prev + (1.0 - beta2) * gradient * gradient;
    *momentum_prev = m;
    *velocity_prev = v;
    let t = t.max(1) as i32;
    let m_hat = m / (1.0 - beta1.powi(t));
    let v_hat = v / (1.0 - beta2.powi(t));
    -learning_rate * m_hat / (v_hat.sqrt() + epsilon)
}

/// Accumulate one sample's `gradient` and, when the policy says so, turn the accumulated
/// gradient into a delta.
///
/// Momentum consumes the summed batch gradient; Adagrad, RMSprop and Adam consume the
/// batch mean. The accumulator is zeroed whenever a batch is consumed or skipped.
pub fn optimizer_step(
    optimizer: &Optimizer,
    hyper: &OptimizerHyperParams,
    history: &mut SynapseHistory,
    gradient: f64,
    learning_rate: f64,
    clock: &BatchClock,
) -> StepOutcome {
    history.grad_sum += gradient;

    if optimizer.updates_every_sample() {
        history.grad_sum = 0.0;
        return StepOutcome::Delta(sgd(gradient, learning_rate));
    }
    if !clock.is_boundary() {
        return StepOutcome::Pending;
    }

    let sum = history.grad_sum;
    let mean = sum / clock.batch_size as f64;
    history.grad_sum = 0.0;
    let delta = match optimizer {
        Optimizer::Momentum => momentum(sum, learning_rate, &mut history.momentum_prev, hyper.momentum_gamma),
        Optimizer::Adagrad => adagrad(mean, learning_rate, &mut history.grad_square_prev, hyper.adagrad_epsilon),
        Optimizer::RmsProp => rmsprop(
            mean,
            learning_rate,
            &mut history.grad_square_prev,
            hyper.rmsprop_gamma,
            hyper.rmsprop_epsilon,
        ),
        Optimizer::Adam => adam(
            mean,
            learning_rate,
            &mut history.momentum_prev,
            &mut history.grad_square_prev,
            hyper.adam_beta1,
            hyper.adam_beta2,
            hyper.adam_epsilon,
            clock.batch_index(),
        ),
        Optimizer::Sgd => sgd(mean, learning_rate),
        Optimizer::Unrecognized(_) => return StepOutcome::Skipped,
    };
    StepOutcome::Delta(delta)
}
