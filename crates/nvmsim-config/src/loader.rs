// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

//! Configuration file loading with override support
//!
//! Three tiers, later ones win:
//! 1. TOML file
//! 2. `NVMSIM_*` environment variables
//! 3. CLI arguments

use crate::{ConfigError, ConfigResult, SimConfig};
use std::collections::HashMap;
use std::env;
use std::fs;
use std::path::{Path, PathBuf};

pub const CONFIG_FILE_NAME: &str = "nvmsim_configuration.toml";
pub const CONFIG_PATH_ENV: &str = "NVMSIM_CONFIG_PATH";

/// Find the nvmsim configuration file
///
/// Search order:
/// 1. `NVMSIM_CONFIG_PATH` environment variable
/// 2. Current working directory
/// 3. Up to five parent directories
///
/// # Errors
///
/// Returns `ConfigError::FileNotFound` if no config file is found in any location
pub fn find_config_file() -> ConfigResult<PathBuf> {
    if let Ok(env_path) = env::var(CONFIG_PATH_ENV) {
        let path = PathBuf::from(env_path);
        if path.exists() {
            return Ok(path);
        }
        return Err(ConfigError::FileNotFound(format!(
            "Config file specified by {} not found: {}",
            CONFIG_PATH_ENV,
            path.display()
        )));
    }

    let mut search_paths = Vec::new();
    if let Ok(cwd) = env::current_dir() {
        search_paths.push(cwd.join(CONFIG_FILE_NAME));
        let mut current = cwd.as_path();
        for _ in 0..5 {
            match current.parent() {
                Some(parent) => {
                    search_paths.push(parent.join(CONFIG_FILE_NAME));
                    current = parent;
                }
                None => break,
            }
        }
    }

    if let Some(found) = search_paths.iter().find(|p| p.exists()) {
        return Ok(found.clone());
    }

    let search_list = search_paths
        .iter()
        .map(|p| format!("  - {}", p.display()))
        .collect::<Vec<_>>()
        .join("\n");

    Err(ConfigError::FileNotFound(format!(
        "'{}' not found in any of these locations:\n{}\n\nSet {} to specify a custom location.",
        CONFIG_FILE_NAME, search_list, CONFIG_PATH_ENV
    )))
}

/// Load configuration from a TOML file and apply overrides
///
/// With `config_path` set to `None` the file is searched for; a missing file is an error.
/// Use [`load_config_or_default`] when running without a file is acceptable.
pub fn load_config(
    config_path: Option<&Path>,
    cli_args: Option<&HashMap<String, String>>,
) -> ConfigResult<SimConfig> {
    let config_file = match config_path {
        Some(path) => path.to_path_buf(),
        None => find_config_file()?,
    };
    let content = fs::read_to_string(&config_file)?;
    let mut config: SimConfig = toml::from_str(&content)?;
    apply_overrides(&mut config, cli_args);
    Ok(config)
}

/// Like [`load_config`], but falls back to defaults when no file can be found.
pub fn load_config_or_default(
    config_path: Option<&Path>,
    cli_args: Option<&HashMap<String, String>>,
) -> ConfigResult<SimConfig> {
    match load_config(config_path, cli_args) {
        Err(ConfigError::FileNotFound(_)) if config_path.is_none() => {
            let mut config = SimConfig::default();
            apply_overrides(&mut config, cli_args);
            Ok(config)
        }
        other => other,
    }
}

fn apply_overrides(config: &mut SimConfig, cli_args: Option<&HashMap<String, String>>) {
    apply_environment_overrides(config);
    if let Some(cli) = cli_args {
        apply_cli_overrides(config, cli);
    }
}

fn parse_bool(value: &str) -> bool {
    let v = value.to_lowercase();
    v == "true" || v == "1" || v == "yes"
}

/// Apply environment variable overrides to configuration
///
/// Supported environment variables:
/// - `NVMSIM_OPTIMIZER` -> `optimizer.name`
/// - `NVMSIM_SEED` -> `training.seed`
/// - `NVMSIM_EPOCHS` -> `training.epochs`
/// - `NVMSIM_STREAM_LENGTH` -> `pulse.stream_length`
/// - `NVMSIM_CELL` -> `device.cell`
/// - `NVMSIM_HARDWARE_FF` -> `training.use_hardware_in_training_ff`
/// - `NVMSIM_HARDWARE_WU` -> `training.use_hardware_in_training_wu`
/// - `NVMSIM_THREADS` -> `parallel.num_threads`
/// - `NVMSIM_LOG_LEVEL` -> `logging.level`
pub fn apply_environment_overrides(config: &mut SimConfig) {
    if let Ok(value) = env::var("NVMSIM_OPTIMIZER") {
        config.optimizer.name = value;
    }
    if let Ok(value) = env::var("NVMSIM_SEED") {
        if let Ok(seed) = value.parse::<u64>() {
            config.training.seed = seed;
        }
    }
    if let Ok(value) = env::var("NVMSIM_EPOCHS") {
        if let Ok(epochs) = value.parse::<u32>() {
            config.training.epochs = epochs;
        }
    }
    if let Ok(value) = env::var("NVMSIM_STREAM_LENGTH") {
        if let Ok(len) = value.parse::<usize>() {
            config.pulse.stream_length = len;
        }
    }
    if let Ok(value) = env::var("NVMSIM_CELL") {
        config.device.cell = value;
    }
    if let Ok(value) = env::var("NVMSIM_HARDWARE_FF") {
        config.training.use_hardware_in_training_ff = parse_bool(&value);
    }
    if let Ok(value) = env::var("NVMSIM_HARDWARE_WU") {
        config.training.use_hardware_in_training_wu = parse_bool(&value);
    }
    if let Ok(value) = env::var("NVMSIM_THREADS") {
        if let Ok(threads) = value.parse::<usize>() {
            config.parallel.num_threads = threads;
        }
    }
    if let Ok(value) = env::var("NVMSIM_LOG_LEVEL") {
        config.logging.level = value;
    }
}

/// Apply CLI argument overrides to configuration
///
/// `cli_args` uses snake_case keys, e.g. `{"optimizer": "Adam", "epochs": "5"}`. Values that
/// fail to parse are ignored.
pub fn apply_cli_overrides(config: &mut SimConfig, cli_args: &HashMap<String, String>) {
    if let Some(value) = cli_args.get("optimizer") {
        config.optimizer.name = value.clone();
    }
    if let Some(value) = cli_args.get("seed") {
        if let Ok(seed) = value.parse::<u64>() {
            config.training.seed = seed;
        }
    }
    if let Some(value) = cli_args.get("epochs") {
        if let Ok(epochs) = value.parse::<u32>() {
            config.training.epochs = epochs;
        }
    }
    if let Some(value) = cli_args.get("num_train") {
        if let Ok(n) = value.parse::<usize>() {
            config.training.num_train = n;
        }
    }
    if let Some(value) = cli_args.get("batch_size") {
        if let Ok(n) = value.parse::<usize>() {
            config.training.batch_size = n;
        }
    }
    if let Some(value) = cli_args.get("stream_length") {
        if let Ok(len) = value.parse::<usize>() {
            config.pulse.stream_length = len;
        }
    }
    if let Some(value) = cli_args.get("pulse_scheme") {
        config.pulse.scheme = value.clone();
    }
    if let Some(value) = cli_args.get("cell") {
        config.device.cell = value.clone();
    }
    if let Some(value) = cli_args.get("hardware_ff") {
        config.training.use_hardware_in_training_ff = parse_bool(value);
    }
    if let Some(value) = cli_args.get("hardware_wu") {
        config.training.use_hardware_in_training_wu = parse_bool(value);
    }
    if let Some(value) = cli_args.get("threads") {
        if let Ok(threads) = value.parse::<usize>() {
            config.parallel.num_threads = threads;
        }
    }
    if let Some(value) = cli_args.get("transfer_interval") {
        if let Ok(n) = value.parse::<usize>() {
            config.transfer.interval_samples = n;
        }
    }
    if let Some(value) = cli_args.get("log_level") {
        config.logging.level = value.clone();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs::File;
    use std::io::Write;
    use std::sync::Mutex;
    use tempfile::tempdir;

    static ENV_LOCK: Mutex<()> = Mutex::new(());

    #[test]
    fn test_find_config_file_env_var() {
        let _env_lock = ENV_LOCK.lock().unwrap();
        let dir = tempdir().unwrap();
        let config_path = dir.path().join("custom_config.toml");
        File::create(&config_path).unwrap();

        env::set_var(CONFIG_PATH_ENV, config_path.to_str().unwrap());
        let result = find_config_file();
        env::remove_var(CONFIG_PATH_ENV);

        assert_eq!(result.unwrap(), config_path);
    }

    #[test]
    fn test_missing_env_path_is_an_error() {
        let _env_lock = ENV_LOCK.lock().unwrap();
        let dir = tempdir().unwrap();
        env::set_var(CONFIG_PATH_ENV, dir.path().join("absent.toml"));
        let result = find_config_file();
        env::remove_var(CONFIG_PATH_ENV);
        assert!(matches!(result, Err(ConfigError::FileNotFound(_))));
    }

    #[test]
    fn test_load_minimal_config() {
        let _env_lock = ENV_LOCK.lock().unwrap();
        let saved = env::var("NVMSIM_OPTIMIZER").ok();
        env::remove_var("NVMSIM_OPTIMIZER");
        let dir = tempdir().unwrap();
        let config_path = dir.path().join(CONFIG_FILE_NAME);

        let mut file = File::create(&config_path).unwrap();
        writeln!(file, "[training]").unwrap();
        writeln!(file, "epochs = 4").unwrap();
        writeln!(file, "[optimizer]").unwrap();
        writeln!(file, "name = \"Adam\"").unwrap();

        let config = load_config(Some(&config_path), None).unwrap();
        assert_eq!(config.training.epochs, 4);
        assert_eq!(config.optimizer.name, "Adam");
        assert_eq!(config.pulse.stream_length, 40);

        if let Some(value) = saved {
            env::set_var("NVMSIM_OPTIMIZER", value);
        }
    }

    #[test]
    fn test_invalid_toml_reports_parse_error() {
        let dir = tempdir().unwrap();
        let config_path = dir.path().join(CONFIG_FILE_NAME);
        fs::write(&config_path, "[training\nepochs = ").unwrap();
        let err = load_config(Some(&config_path), None).unwrap_err();
        assert!(matches!(err, ConfigError::ParseError(_)));
    }

    #[test]
    fn test_explicit_missing_file_is_not_defaulted() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("nope.toml");
        assert!(matches!(
            load_config_or_default(Some(&path), None),
            Err(ConfigError::IoError(_))
        ));
    }

    #[test]
    fn test_environment_overrides() {
        let _env_lock = ENV_LOCK.lock().unwrap();
        let mut config = SimConfig::default();

        env::set_var("NVMSIM_SEED", "1234");
        env::set_var("NVMSIM_STREAM_LENGTH", "not-a-number");
        env::set_var("NVMSIM_HARDWARE_WU", "no");

        apply_environment_overrides(&mut config);

        env::remove_var("NVMSIM_SEED");
        env::remove_var("NVMSIM_STREAM_LENGTH");
        env::remove_var("NVMSIM_HARDWARE_WU");

        assert_eq!(config.training.seed, 1234);
        assert_eq!(config.pulse.stream_length, 40);
        assert!(!config.training.use_hardware_in_training_wu);
    }

    #[test]
    fn test_cli_overrides() {
        let mut config = SimConfig::default();
        let mut cli_args = HashMap::new();
        cli_args.insert("optimizer".to_string(), "Momentum".to_string());
        cli_args.insert("batch_size".to_string(), "8".to_string());
        cli_args.insert("transfer_interval".to_string(), "100".to_string());

        apply_cli_overrides(&mut config, &cli_args);

        assert_eq!(config.optimizer.name, "Momentum");
        assert_eq!(config.training.batch_size, 8);
        assert_eq!(config.transfer.interval_samples, 100);
    }

    #[test]
    fn test_override_precedence() {
        let _env_lock = ENV_LOCK.lock().unwrap();
        let dir = tempdir().unwrap();
        let config_path = dir.path().join(CONFIG_FILE_NAME);

        let mut file = File::create(&config_path).unwrap();
        writeln!(file, "[optimizer]").unwrap();
        writeln!(file, "name = \"RMSprop\"").unwrap();
        writeln!(file, "[training]").unwrap();
        writeln!(file, "seed = 1").unwrap();

        env::set_var("NVMSIM_OPTIMIZER", "Adam");
        env::set_var("NVMSIM_SEED", "2");

        let mut cli_args = HashMap::new();
        cli_args.insert("optimizer".to_string(), "SGD".to_string());

        let config = load_config(Some(&config_path), Some(&cli_args)).unwrap();

        env::remove_var("NVMSIM_OPTIMIZER");
        env::remove_var("NVMSIM_SEED");

        // CLI wins for the optimizer, env wins for the seed
        assert_eq!(config.optimizer.name, "SGD");
        assert_eq!(config.training.seed, 2);
    }
}
