//! # nvmsim - hardware-emulated training on eNVM crossbars
//!
//! nvmsim trains a fixed input → hidden → output network whose weights live in two
//! crossbar arrays of emerging non-volatile memory cells. Forward passes read the arrays
//! bit-plane by bit-plane through an ADC, weight updates are applied as pulse trains, and
//! every read, write and transfer is charged with energy and latency.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use nvmsim::prelude::*;
//!
//! let config = load_config_or_default(None, None)?;
//! let params = TrainingParams::from_config(&config)?;
//! let dataset = nvmsim::data::synthetic_patterns(&params, 200, 0.05, 1)?;
//!
//! let mut trainer = Trainer::new(params)?;
//! let report = trainer.train(&dataset)?;
//! println!("{:.3e} J", report.total_energy());
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────┐
//! │  Foundation: nvmsim-config, nvmsim-observability        │
//! │  (TOML run config, logging setup)                       │
//! └─────────────────────────────────────────────────────────┘
//!                         ↓
//! ┌─────────────────────────────────────────────────────────┐
//! │  Device: nvmsim-npu-device                              │
//! │  (cells, crossbar, subarray accounting, ADC)            │
//! └─────────────────────────────────────────────────────────┘
//!                         ↓
//! ┌─────────────────────────────────────────────────────────┐
//! │  Learning: nvmsim-npu-plasticity                        │
//! │  (optimizers, pulse trains, weight update, transfer)    │
//! └─────────────────────────────────────────────────────────┘
//!                         ↓
//! ┌─────────────────────────────────────────────────────────┐
//! │  Training: nvmsim-npu-train-engine                      │
//! │  (forward, backprop, trainer, reports)                  │
//! └─────────────────────────────────────────────────────────┘
//! ```
//!
//! ## License
//!
//! Apache-2.0

// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

pub use nvmsim_config as config;
pub use nvmsim_npu_device as device;
pub use nvmsim_npu_plasticity as plasticity;
pub use nvmsim_npu_train_engine as train;
pub use nvmsim_observability as observability;

pub mod data;

/// Prelude - commonly used types and traits
pub mod prelude {
    pub use crate::config::{load_config, load_config_or_default, validate_config, SimConfig};
    pub use crate::device::{
        AdcMapping, AnalyticalCostModel, CellKind, CellTemplate, Crossbar, DeviceCell,
        LinearAdc, PeripheralCostModel, SubArray, Technology, WeightBounds,
    };
    pub use crate::plasticity::{
        BatchClock, LayerId, Optimizer, PulseScheme, SimulationContext, SynapticLayer,
        UpdateSettings, WeightUpdateEngine,
    };
    pub use crate::train::{
        Dataset, ForwardEngine, ForwardPass, Sample, Trainer, TrainingParams, TrainingReport,
        TwoLayerNetwork,
    };
}

#[cfg(test)]
mod tests {
    #[test]
    fn test_facade_imports() {
        use crate::prelude::*;
        let config = SimConfig::default();
        assert!(validate_config(&config).is_ok());
        assert_eq!(Optimizer::from_name(&config.optimizer.name), Optimizer::Sgd);
    }
}
