// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

//! Subscriber setup
//!
//! Console output always; with `file-logging` a JSON log per run in a timestamped folder.

use anyhow::{Context, Result};
use std::path::{Path, PathBuf};
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{EnvFilter, Layer, Registry};

use crate::cli::CrateDebugFlags;
use crate::config::{LogFormat, LoggingOptions};

/// Keeps file writers alive; logs are flushed when dropped.
pub struct LoggingGuard {
    #[cfg(feature = "file-logging")]
    _file_guard: Option<tracing_appender::non_blocking::WorkerGuard>,
    log_dir: Option<PathBuf>,
}

impl LoggingGuard {
    pub fn log_dir(&self) -> Option<&Path> {
        self.log_dir.as_deref()
    }
}

/// Build the filter: `RUST_LOG` when set, otherwise debug flags over `options.level`.
pub fn build_filter(debug_flags: &CrateDebugFlags, options: &LoggingOptions) -> Result<EnvFilter> {
    if let Ok(directives) = std::env::var(EnvFilter::DEFAULT_ENV) {
        return EnvFilter::try_new(&directives)
            .with_context(|| format!("Invalid {} directives: {}", EnvFilter::DEFAULT_ENV, directives));
    }
    let filter = debug_flags.to_filter_string(&options.level.to_lowercase());
    EnvFilter::try_new(&filter).with_context(|| format!("Invalid log filter: {}", filter))
}

/// Install the global subscriber.
///
/// # Errors
/// Fails on an invalid filter, an unusable log directory, or when a global subscriber is
/// already installed.
pub fn init_logging(debug_flags: &CrateDebugFlags, options: &LoggingOptions) -> Result<LoggingGuard> {
    let env_filter = build_filter(debug_flags, options)?;
    let mut layers = Vec::new();

    let console_layer = match options.format {
        LogFormat::Text => tracing_subscriber::fmt::layer()
            .with_target(true)
            .with_file(false)
            .with_line_number(false)
            .with_filter(env_filter)
            .boxed(),
        LogFormat::Json => tracing_subscriber::fmt::layer()
            .json()
            .with_target(true)
            .with_filter(env_filter)
            .boxed(),
    };
    layers.push(console_layer);

    #[cfg(feature = "file-logging")]
    let (file_guard, log_dir) = match &options.directory {
        Some(base) => {
            let timestamp = chrono::Utc::now().format("%Y%m%d_%H%M%S");
            let run_folder = base.join(format!("run_{}", timestamp));
            std::fs::create_dir_all(&run_folder)
                .with_context(|| format!("Failed to create log directory: {}", run_folder.display()))?;
            let appender = tracing_appender::rolling::never(&run_folder, "nvmsim.log");
            let (non_blocking, guard) = tracing_appender::non_blocking(appender);
            let file_layer = tracing_subscriber::fmt::layer()
                .with_writer(non_blocking)
                .with_target(true)
                .with_file(true)
                .with_line_number(true)
                .json()
                .with_filter(build_filter(debug_flags, options)?)
                .boxed();
            layers.push(file_layer);
            (Some(guard), Some(run_folder))
        }
        None => (None, None),
    };
    #[cfg(not(feature = "file-logging"))]
    let log_dir: Option<PathBuf> = None;

    Registry::default()
        .with(layers)
        .try_init()
        .context("A global tracing subscriber is already installed")?;

    Ok(LoggingGuard {
        #[cfg(feature = "file-logging")]
        _file_guard: file_guard,
        log_dir,
    })
}

/// Console logging at `info`, with the process's debug flags applied.
pub fn init_logging_default() -> Result<LoggingGuard> {
    init_logging(&crate::cli::parse_debug_flags(), &LoggingOptions::default())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_filter_from_flags() {
        if std::env::var(EnvFilter::DEFAULT_ENV).is_ok() {
            return;
        }
        let flags = CrateDebugFlags::from_args(vec!["--debug-nvmsim-npu-device".to_string()]);
        let options = LoggingOptions {
            level: "WARN".to_string(),
            ..LoggingOptions::default()
        };
        let filter = build_filter(&flags, &options).unwrap();
        let rendered = filter.to_string();
        assert!(rendered.contains("nvmsim-npu-device=debug"));
        assert!(rendered.contains("warn"));
    }
}
