// Imports the `Colorize` trait for adding color to console output.
use colored::Colorize;
use std::path::PathBuf;
use crate::{log_debug, log_info};
use crate::libs::utilities::path_helpers::expand_tilde;

/// Config file used when `--config` is not given, relative to the working directory.
pub const DEFAULT_CONFIG_FILE: &str = "engine-setup.yaml";

/// Resolves the configuration file path.
///
/// # Arguments
/// * `config_path`: The value of `--config`, if any. `~` is expanded.
///
/// # Returns
/// The path to read (or, for `generate`, to write).
pub fn resolve_config_path(config_path: Option<String>) -> PathBuf {
    log_debug!("[Paths] --config parameter: {:?}", config_path);

    let resolved = expand_tilde(config_path.as_deref().unwrap_or(DEFAULT_CONFIG_FILE));
    log_info!("Using configuration file: {}", resolved.display().to_string().cyan());
    resolved
}
