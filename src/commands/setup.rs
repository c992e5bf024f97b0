// The `setup` command: loads `engine-setup.yaml` and installs every dependency
// that is missing for the current OS, asking before each download unless
// `--yes` was given.

use crate::libs::config_loading::load_setup_config;
use crate::libs::dependency_installer::DependencyInstaller;
use crate::libs::paths::resolve_config_path;
use crate::libs::progress::ConsoleProgress;
use crate::libs::prompt::ConsolePrompt;
use crate::{log_debug, log_info, log_warn};
use anyhow::Context;
use colored::Colorize;

/// Entry point for `engine-setup setup`.
///
/// # Arguments
/// * `config`: `--config`, defaults to `./engine-setup.yaml`.
/// * `yes`: `--yes`, answer every confirmation with "yes".
pub fn run(config: Option<String>, yes: bool) -> anyhow::Result<()> {
    log_debug!("[Setup] Starting with config={:?}, yes={}", config, yes);
    let config_path = resolve_config_path(config);
    let loaded = load_setup_config(&config_path)?;

    let mut prompt = ConsolePrompt;
    let mut progress = ConsoleProgress::new();
    let mut installer = DependencyInstaller::new(&loaded, &mut prompt, &mut progress).assume_yes(yes);
    let summary = installer
        .install_all()
        .with_context(|| format!("setup from {} did not complete", config_path.display()))?;

    eprintln!("{}", "==============================================================".bright_blue());
    log_info!(
        "[Setup] Installed: {} | Already present: {} | Declined: {} | No artifact for this OS: {}",
        summary.installed.len().to_string().green(),
        summary.already_installed.len(),
        summary.declined.len().to_string().yellow(),
        summary.unsupported.len()
    );
    if !summary.declined.is_empty() {
        log_warn!(
            "[Setup] Still missing: {}. Run `engine-setup setup` again to install them.",
            summary.declined.join(", ").yellow()
        );
    }
    Ok(())
}
