use crate::libs::errors::ConfigError;
use crate::libs::fetcher::FetchSources;
use crate::schemas::setup_config::SetupConfig;
use crate::{log_debug, log_info};
use colored::Colorize;
use std::fs;
use std::path::{Path, PathBuf};

/// A parsed config together with the directory its relative paths resolve against.
#[derive(Debug, Clone)]
pub struct LoadedConfig {
    pub config: SetupConfig,
    pub path: PathBuf,
    pub base_dir: PathBuf,
}

/// Reads, parses and validates `engine-setup.yaml`.
///
/// # Arguments
/// * `path`: The config file. Its parent directory becomes the base for every
///           relative path in the file.
///
/// # Returns
/// * `Ok(LoadedConfig)` when the file parses and every dependency is well formed.
/// * `Err(ConfigError)` describing the first problem found.
pub fn load_setup_config(path: &Path) -> Result<LoadedConfig, ConfigError> {
    log_debug!("[Config] Loading {}", path.display().to_string().blue());

    let contents = fs::read_to_string(path).map_err(|source| ConfigError::Read {
        path: path.to_path_buf(),
        source,
    })?;
    let config = parse_setup_config(&contents).map_err(|e| match e {
        ParseFailure::Yaml(source) => ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        },
        ParseFailure::Invalid(message) => ConfigError::Invalid(message),
    })?;

    let base_dir = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
        _ => PathBuf::from("."),
    };

    log_info!(
        "[Config] Loaded {} dependencies and {} requirements from {}",
        config.dependencies.len(),
        config.requirements.len(),
        path.display().to_string().cyan()
    );
    Ok(LoadedConfig {
        config,
        path: path.to_path_buf(),
        base_dir,
    })
}

enum ParseFailure {
    Yaml(serde_yaml::Error),
    Invalid(String),
}

fn parse_setup_config(contents: &str) -> Result<SetupConfig, ParseFailure> {
    let config: SetupConfig = serde_yaml::from_str(contents).map_err(ParseFailure::Yaml)?;
    validate(&config).map_err(ParseFailure::Invalid)?;
    Ok(config)
}

/// Catches mistakes at load time instead of halfway through a download.
fn validate(config: &SetupConfig) -> Result<(), String> {
    if config.http.user_agent.trim().is_empty() {
        return Err("http.user_agent must not be empty".to_string());
    }

    for dep in &config.dependencies {
        if dep.name.trim().is_empty() {
            return Err("every dependency needs a name".to_string());
        }
        if dep.artifacts.is_empty() {
            return Err(format!("dependency '{}' has no artifacts", dep.name));
        }
        for artifact in &dep.artifacts {
            if artifact.file.trim().is_empty() {
                return Err(format!("dependency '{}' has an artifact without a file name", dep.name));
            }
            // The archive itself cannot mark an installation it deletes.
            if artifact.extract && artifact.delete_archive && artifact.installed.is_none() {
                return Err(format!(
                    "dependency '{}': artifact '{}' is extracted and deleted, so it needs an `installed` marker",
                    dep.name, artifact.file
                ));
            }
            FetchSources::try_from(&artifact.sources)
                .map_err(|e| format!("dependency '{}': {}", dep.name, e))?;
        }
        for extra in &dep.extras {
            if extra.file.trim().is_empty() {
                return Err(format!("dependency '{}' has an extra file without a name", dep.name));
            }
            FetchSources::try_from(&extra.sources)
                .map_err(|e| format!("dependency '{}' extra '{}': {}", dep.name, extra.file, e))?;
        }
    }

    for req in &config.requirements {
        if req.env.trim().is_empty() {
            return Err(format!("requirement '{}' names no environment variable", req.name));
        }
    }
    Ok(())
}
