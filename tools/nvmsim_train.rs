// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

/*!
Crossbar Training Tool

Trains the two-layer network on emulated eNVM crossbars and prints the run report as JSON.

Usage:
  cargo run --bin nvmsim_train -- [--config <file.toml>] [--data <dataset.json>]
      [--synthetic <num_samples>] [--noise <p>] [--output <report.json>]
      [--set key=value ...] [--debug-<crate> | --debug-all]

Run with `--help` for the full option list.

Without `--data`, a synthetic dataset of noisy prototypes is generated.

Copyright 2025 Neuraville Inc.
Licensed under the Apache License, Version 2.0
*/

use std::collections::HashMap;
use std::env;
use std::fs;
use std::path::PathBuf;

use anyhow::{bail, Context, Result};
use clap::Parser;
use tracing::info;

use nvmsim::config::{load_config_or_default, SimConfig};
use nvmsim::observability::{debug_flags_help, init_logging, parse_debug_flags, LogFormat, LoggingOptions};
use nvmsim::train::{Trainer, TrainingParams};

/// Train the two-layer network on emulated eNVM crossbars
#[derive(Parser, Debug)]
#[command(name = "nvmsim_train", version, author, long_about = None, after_help = debug_flags_help())]
struct Args {
    /// Run configuration (TOML); searched for when omitted
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Dataset file with `inputs` and `labels` arrays (JSON)
    #[arg(short, long)]
    data: Option<PathBuf>,

    /// Number of synthetic samples when no dataset is given
    #[arg(long, default_value_t = 1000)]
    synthetic: usize,

    /// Pixel flip probability of synthetic samples
    #[arg(long, default_value_t = 0.05)]
    noise: f64,

    /// Write the JSON report here instead of stdout
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Configuration override `key=value` (optimizer, seed, epochs, num_train, batch_size,
    /// stream_length, pulse_scheme, cell, hardware_ff, hardware_wu, threads,
    /// transfer_interval, log_level); repeatable
    #[arg(long = "set", value_name = "KEY=VALUE")]
    overrides: Vec<String>,
}

impl Args {
    /// `--debug-*` flags belong to the logging setup and are not seen by clap.
    fn parse_without_debug_flags() -> Self {
        Self::parse_from(env::args().filter(|arg| !arg.starts_with("--debug-")))
    }

    fn override_map(&self) -> Result<HashMap<String, String>> {
        self.overrides
            .iter()
            .map(|pair| match pair.split_once('=') {
                Some((key, value)) => Ok((key.trim().to_string(), value.trim().to_string())),
                None => bail!("Override '{}' is not of the form key=value", pair),
            })
            .collect()
    }
}

fn logging_options(config: &SimConfig) -> LoggingOptions {
    LoggingOptions {
        level: config.logging.level.clone(),
        format: if config.logging.json {
            LogFormat::Json
        } else {
            LogFormat::Text
        },
        directory: (!config.logging.directory.as_os_str().is_empty()).then(|| config.logging.directory.clone()),
    }
}

fn main() -> Result<()> {
    let args = Args::parse_without_debug_flags();
    let overrides = args.override_map()?;
    let config = load_config_or_default(args.config.as_deref(), Some(&overrides))
        .context("Failed to load configuration")?;
    let _guard = init_logging(&parse_debug_flags(), &logging_options(&config))?;

    let params = TrainingParams::from_config(&config)?;
    let dataset = match &args.data {
        Some(path) => nvmsim::data::load_json(path, &params)?,
        None => nvmsim::data::synthetic_patterns(&params, args.synthetic.max(1), args.noise, params.seed)?,
    };
    info!(
        target: "nvmsim",
        "Loaded {} samples ({} inputs, {} classes)",
        dataset.len(),
        dataset.num_input(),
        dataset.num_output()
    );

    let mut trainer = Trainer::new(params)?;
    let report = trainer.train(&dataset)?;
    let json = report.to_json()?;
    match &args.output {
        Some(path) => {
            fs::write(path, &json).with_context(|| format!("Failed to write report {}", path.display()))?;
            info!(target: "nvmsim", "Report written to {}", path.display());
        }
        None => println!("{json}"),
    }
    info!(
        target: "nvmsim",
        "Total energy {:.4e} J, latency {:.4e} s",
        report.total_energy(),
        report.total_latency()
    );
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_repeated_overrides_and_defaults() {
        let args = Args::try_parse_from([
            "nvmsim_train",
            "--set",
            "epochs=3",
            "--set",
            " optimizer = Adam ",
            "--noise",
            "0.1",
        ])
        .unwrap();
        assert_eq!(args.synthetic, 1000);
        assert_eq!(args.noise, 0.1);
        assert!(args.config.is_none());
        let map = args.override_map().unwrap();
        assert_eq!(map.get("epochs").map(String::as_str), Some("3"));
        assert_eq!(map.get("optimizer").map(String::as_str), Some("Adam"));
    }

    #[test]
    fn test_malformed_override_rejected() {
        let args = Args::try_parse_from(["nvmsim_train", "--set", "epochs"]).unwrap();
        assert!(args.override_map().is_err());
        assert!(Args::try_parse_from(["nvmsim_train", "--synthetic", "many"]).is_err());
    }
}
