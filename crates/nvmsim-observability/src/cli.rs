// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

//! Per-crate debug flags
//!
//! Supports flags like `--debug-nvmsim-npu-plasticity` and `--debug-all`, plus the
//! `NVMSIM_DEBUG` environment variable.

use std::collections::BTreeSet;
use std::env;

use crate::KNOWN_CRATES;

pub const DEBUG_ENV: &str = "NVMSIM_DEBUG";

/// Parse debug flags from command-line arguments
///
/// # Example
/// ```rust
/// use nvmsim_observability::CrateDebugFlags;
///
/// let flags = CrateDebugFlags::from_args(vec!["--debug-nvmsim-npu-device".to_string()]);
/// assert!(flags.is_enabled("nvmsim-npu-device"));
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CrateDebugFlags {
    pub enabled_crates: BTreeSet<String>,
}

impl CrateDebugFlags {
    /// Looks for arguments matching `--debug-{crate-name}`; `--debug-all` enables every
    /// known crate.
    pub fn from_args<I>(args: I) -> Self
    where
        I: IntoIterator<Item = String>,
    {
        let mut flags = Self::default();
        for arg in args {
            if arg == "--debug-all" {
                flags.enable_all();
            } else if let Some(crate_name) = arg.strip_prefix("--debug-") {
                flags.enabled_crates.insert(crate_name.to_string());
            }
        }
        flags
    }

    /// Merge a comma-separated crate list, or `all`.
    pub fn merge_list(&mut self, list: &str) {
        if list.trim() == "all" {
            self.enable_all();
            return;
        }
        for crate_name in list.split(',') {
            let crate_name = crate_name.trim();
            if !crate_name.is_empty() {
                self.enabled_crates.insert(crate_name.to_string());
            }
        }
    }

    fn enable_all(&mut self) {
        self.enabled_crates
            .extend(KNOWN_CRATES.iter().map(|c| c.to_string()));
    }

    pub fn is_enabled(&self, crate_name: &str) -> bool {
        self.enabled_crates.contains(crate_name)
    }

    pub fn any_enabled(&self) -> bool {
        !self.enabled_crates.is_empty()
    }

    /// `DEBUG` for enabled crates, `INFO` otherwise.
    pub fn log_level(&self, crate_name: &str) -> tracing::Level {
        if self.is_enabled(crate_name) {
            tracing::Level::DEBUG
        } else {
            tracing::Level::INFO
        }
    }

    /// `EnvFilter` directive string, e.g. `nvmsim-npu-device=debug,info`.
    ///
    /// Engine crates log with their package name as target, so the directives match
    /// `--debug-<package>` directly.
    pub fn to_filter_string(&self, default_level: &str) -> String {
        let mut filters: Vec<String> = self
            .enabled_crates
            .iter()
            .map(|c| format!("{}=debug", c))
            .collect();
        filters.push(default_level.to_string());
        filters.join(",")
    }
}

/// Flags from the process arguments and `NVMSIM_DEBUG`.
pub fn parse_debug_flags() -> CrateDebugFlags {
    let mut flags = CrateDebugFlags::from_args(env::args());
    if let Ok(env_var) = env::var(DEBUG_ENV) {
        flags.merge_list(&env_var);
    }
    flags
}

pub fn debug_flags_help() -> String {
    format!(
        r#"Debug Flags:
  --debug-all                    Enable debug logging for all crates
  --debug-{{crate-name}}          Enable debug logging for specific crate

Available crates:
  {}

Environment Variable:
  {}={{crate-name}}[,{{crate-name}}]
  {}=all
"#,
        KNOWN_CRATES.join(", "),
        DEBUG_ENV,
        DEBUG_ENV
    )
}
