// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

/*
 * Copyright 2025 Neuraville Inc.
 *
 * Licensed under the Apache License, Version 2.0 (the "License");
 * you may not use this file except in compliance with the License.
 */

//! # nvmsim Plasticity
//!
//! How a layer learns on the array:
//! - **Optimizers**: SGD, momentum, Adagrad, RMSprop and Adam with a batch policy
//! - **Pulse trains**: stochastic bitstream encoding of inputs and deltas
//! - **Update engine**: per-synapse writes plus write energy/latency accounting
//! - **Transfer**: periodic 2T1F / hybrid MSB-LSB maintenance
//!
//! All randomness is drawn from per-element streams derived from one run seed, so an update
//! is reproducible regardless of the rayon thread count.

/// Crate version from Cargo.toml
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

pub mod context;
pub mod error;
pub mod history;
pub mod layer;
pub mod optimizer;
pub mod pulse_train;
pub mod transfer;
pub mod update_engine;

pub use context::SimulationContext;
pub use error::{PlasticityError, Result};
pub use history::{new_history, total_requested_change, HistoryMatrix, SynapseHistory};
pub use layer::{LayerId, SynapticLayer};
pub use optimizer::{optimizer_step, BatchClock, Optimizer, OptimizerHyperParams, StepOutcome};
pub use pulse_train::{
    firing_probability, net_pulses, stochastic_constant, EncodedOperand, Operand, PulseTrain,
    StreamKey,
};
pub use transfer::{transfer_layer, TransferSummary};
pub use update_engine::{
    LayerUpdateSummary, PulseScheme, RowReport, UpdateSettings, WeightUpdateEngine,
};
