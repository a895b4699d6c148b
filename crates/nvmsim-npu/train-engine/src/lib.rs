// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

/*
 * Copyright 2025 Neuraville Inc.
 *
 * Licensed under the Apache License, Version 2.0 (the "License");
 * you may not use this file except in compliance with the License.
 */

//! # nvmsim Train Engine
//!
//! Drives training of the fixed input → hidden → output network on two crossbars:
//! - **Forward**: algorithmic mat-vec or bit-sliced crossbar read through the ADC
//! - **Backprop**: output and hidden error terms
//! - **Trainer**: sample loop, per-layer weight updates, periodic transfer
//! - **Report**: per-array energy/latency and run totals, serializable to JSON
//!
//! ```no_run
//! use nvmsim_config::SimConfig;
//! use nvmsim_npu_train_engine::{Dataset, Trainer, TrainingParams};
//! # fn load() -> Dataset { unimplemented!() }
//!
//! let params = TrainingParams::from_config(&SimConfig::default())?;
//! let mut trainer = Trainer::new(params)?;
//! let report = trainer.train(&load())?;
//! println!("{}", report.to_json()?);
//! # Ok::<(), nvmsim_npu_train_engine::TrainError>(())
//! ```

/// Crate version from Cargo.toml
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

pub mod activation;
pub mod backprop;
pub mod error;
pub mod forward;
pub mod network;
pub mod params;
pub mod report;
pub mod sample;
pub mod trainer;

pub use backprop::{backpropagate, ErrorTerms};
pub use error::{Result, TrainError};
pub use forward::{algorithmic_layer, ForwardEngine, ForwardPass};
pub use network::TwoLayerNetwork;
pub use params::{cell_template, TrainingParams};
pub use report::{ArrayReport, TrainingReport};
pub use sample::{one_hot, Dataset, Sample};
pub use trainer::Trainer;
