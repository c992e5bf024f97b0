// The `check` command prints which dependencies are on disk and which
// toolchain requirements are satisfied. It never downloads or writes anything.

use crate::libs::config_loading::load_setup_config;
use crate::libs::dependency_installer::{DependencyInstaller, DependencyStatus, RequirementStatus, evaluate_requirements};
use crate::libs::paths::resolve_config_path;
use crate::libs::progress::SilentProgress;
use crate::log_info;
use colored::Colorize;
use prettytable::{Table, format, row};

/// Entry point for `engine-setup check`. Fails when anything is missing so the
/// process exits non-zero.
pub fn run(config: Option<String>) -> anyhow::Result<()> {
    let config_path = resolve_config_path(config);
    let loaded = load_setup_config(&config_path)?;

    // `check` never installs, so nothing is ever asked.
    let mut never = |_: &str| false;
    let mut progress = SilentProgress;
    let installer = DependencyInstaller::new(&loaded, &mut never, &mut progress);

    let dependencies = installer.status()?;
    let requirements = evaluate_requirements(&loaded.config.requirements, |key| std::env::var(key).ok());

    dependency_table(&dependencies).printstd();
    if !requirements.is_empty() {
        requirement_table(&requirements).printstd();
    }

    let missing = dependencies.iter().filter(|d| d.artifact.is_some() && !d.installed).count()
        + requirements.iter().filter(|r| !r.satisfied).count();
    if missing > 0 {
        anyhow::bail!("{missing} item(s) missing; run `engine-setup setup` to install dependencies");
    }
    log_info!("[Check] Everything is in place.");
    Ok(())
}

fn dependency_table(statuses: &[DependencyStatus<'_>]) -> Table {
    let mut table = Table::new();
    table.set_format(*format::consts::FORMAT_NO_BORDER_LINE_SEPARATOR);
    table.set_titles(row!["Dependency", "Version", "Directory", "Status"]);
    for status in statuses {
        let state = match (&status.artifact, status.installed) {
            (None, _) => "no artifact for this OS".dimmed().to_string(),
            (Some(_), true) => "installed".green().to_string(),
            (Some(_), false) => "missing".red().to_string(),
        };
        table.add_row(row![
            status.dependency.name,
            status.dependency.version.as_deref().unwrap_or("-"),
            status.directory.display(),
            state
        ]);
    }
    table
}

fn requirement_table(statuses: &[RequirementStatus]) -> Table {
    let mut table = Table::new();
    table.set_format(*format::consts::FORMAT_NO_BORDER_LINE_SEPARATOR);
    table.set_titles(row!["Requirement", "Variable", "Value", "Status"]);
    for status in statuses {
        let state = if status.satisfied { "ok".green() } else { "missing".red() };
        table.add_row(row![
            status.name,
            status.env,
            status.value.as_deref().unwrap_or("<unset>"),
            state
        ]);
    }
    table
}
