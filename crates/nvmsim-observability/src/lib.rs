// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

//! # nvmsim-observability
//!
//! Logging setup shared by the nvmsim binaries and tests, with per-crate debug flags.
//!
//! ## Features
//! - `file-logging`: JSON log file per run in a timestamped folder

/// Crate version from Cargo.toml
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

pub mod cli;
pub mod config;
pub mod init;

pub use cli::*;
pub use config::*;
pub use init::*;

/// Known nvmsim crate names for debug flags
pub const KNOWN_CRATES: &[&str] = &[
    "nvmsim",
    "nvmsim-config",
    "nvmsim-npu-device",
    "nvmsim-npu-plasticity",
    "nvmsim-npu-train-engine",
];
