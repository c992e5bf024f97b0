// This module drives the installation of the third-party dependencies listed in
// `engine-setup.yaml`. For every dependency it picks the artifact for the
// current OS, checks the installed marker, asks for confirmation, then hands
// the download to the `Fetcher` and the archive to the `Unpacker`.
//
// Requirements (toolchains the user installs themselves, such as a graphics
// SDK) are only evaluated here, never installed.

use crate::libs::config_loading::LoadedConfig;
use crate::libs::errors::SetupError;
use crate::libs::fetcher::{FetchRequest, FetchSources, Fetcher};
use crate::libs::progress::ProgressReporter;
use crate::libs::prompt::Confirmation;
use crate::libs::unpacker::Unpacker;
use crate::libs::utilities::path_helpers::{resolve_against, substitute_version};
use crate::libs::utilities::platform::{detect_os, os_matches};
use crate::schemas::setup_config::{Artifact, Dependency, Requirement};
use crate::{log_debug, log_info, log_warn};
use colored::Colorize;
use std::path::PathBuf;

/// What `install` did for one dependency.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InstallOutcome {
    /// The installed marker was already on disk; nothing was downloaded.
    AlreadyInstalled,
    Installed,
    /// The user answered "no". Nothing was touched.
    Declined,
    /// No artifact matches the current OS.
    Unsupported,
}

/// The artifact chosen for this OS, with `{version}` substituted and paths
/// resolved against the config file.
#[derive(Debug, Clone)]
pub struct ResolvedArtifact<'a> {
    pub artifact: &'a Artifact,
    pub sources: FetchSources,
    /// Where the download is written.
    pub download_path: PathBuf,
    /// Its presence means the dependency is installed.
    pub marker: PathBuf,
}

/// Presence of one dependency on disk, as shown by `check`.
#[derive(Debug, Clone)]
pub struct DependencyStatus<'a> {
    pub dependency: &'a Dependency,
    pub directory: PathBuf,
    /// `None` when no artifact matches the current OS.
    pub artifact: Option<ResolvedArtifact<'a>>,
    pub installed: bool,
}

/// Names per outcome after `install_all`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct InstallSummary {
    pub installed: Vec<String>,
    pub already_installed: Vec<String>,
    pub declined: Vec<String>,
    pub unsupported: Vec<String>,
}

impl InstallSummary {
    fn record(&mut self, name: &str, outcome: InstallOutcome) {
        let bucket = match outcome {
            InstallOutcome::Installed => &mut self.installed,
            InstallOutcome::AlreadyInstalled => &mut self.already_installed,
            InstallOutcome::Declined => &mut self.declined,
            InstallOutcome::Unsupported => &mut self.unsupported,
        };
        bucket.push(name.to_string());
    }
}

/// Installs the dependencies of one loaded config.
pub struct DependencyInstaller<'a> {
    loaded: &'a LoadedConfig,
    fetcher: Fetcher,
    confirmation: &'a mut dyn Confirmation,
    reporter: &'a mut dyn ProgressReporter,
    os: String,
    assume_yes: bool,
}

impl<'a> DependencyInstaller<'a> {
    pub fn new(
        loaded: &'a LoadedConfig,
        confirmation: &'a mut dyn Confirmation,
        reporter: &'a mut dyn ProgressReporter,
    ) -> Self {
        Self {
            loaded,
            fetcher: Fetcher::new(&loaded.config.http),
            confirmation,
            reporter,
            os: detect_os(),
            assume_yes: false,
        }
    }

    /// Installs artifacts for `os` instead of the running system.
    pub fn for_os(mut self, os: &str) -> Self {
        self.os = os.to_string();
        self
    }

    /// Skip every confirmation (`--yes`).
    pub fn assume_yes(mut self, yes: bool) -> Self {
        self.assume_yes = yes;
        self
    }

    /// Where `dependency` lives on disk.
    pub fn directory_of(&self, dependency: &Dependency) -> PathBuf {
        let dir = substitute_version(&dependency.directory, dependency.version.as_deref());
        resolve_against(&self.loaded.base_dir, &dir)
    }

    /// Picks the first artifact declared for the current OS.
    pub fn resolve_artifact<'d>(&self, dependency: &'d Dependency) -> Result<Option<ResolvedArtifact<'d>>, SetupError> {
        let Some(artifact) = dependency
            .artifacts
            .iter()
            .find(|a| os_matches(a.os.as_deref(), &self.os))
        else {
            return Ok(None);
        };

        let version = dependency.version.as_deref();
        let directory = self.directory_of(dependency);
        let sources = FetchSources::try_from(&artifact.sources)?.map_urls(|url| substitute_version(url, version));
        let file = substitute_version(&artifact.file, version);
        let marker = artifact
            .installed
            .as_deref()
            .map(|m| substitute_version(m, version))
            .unwrap_or_else(|| file.clone());

        Ok(Some(ResolvedArtifact {
            artifact,
            sources,
            download_path: directory.join(file),
            marker: directory.join(marker),
        }))
    }

    /// Reports, for every dependency, whether its installed marker exists.
    pub fn status(&self) -> Result<Vec<DependencyStatus<'a>>, SetupError> {
        self.loaded
            .config
            .dependencies
            .iter()
            .map(|dependency| {
                let artifact = self.resolve_artifact(dependency)?;
                let installed = artifact.as_ref().is_some_and(|a| a.marker.exists());
                Ok(DependencyStatus {
                    dependency,
                    directory: self.directory_of(dependency),
                    artifact,
                    installed,
                })
            })
            .collect()
    }

    /// Makes sure one dependency is on disk.
    ///
    /// The confirmation is asked before any download or directory creation.
    /// After the artifact is fetched (and extracted when configured) the extra
    /// files are fetched, then the installed marker must exist.
    ///
    /// # Returns
    /// * `Ok(InstallOutcome)`: what was done.
    /// * `Err(SetupError)`: a download, extraction or marker failure.
    pub fn install(&mut self, dependency: &Dependency) -> Result<InstallOutcome, SetupError> {
        let name = dependency.name.as_str();
        let Some(resolved) = self.resolve_artifact(dependency)? else {
            log_warn!(
                "[Setup] {} has no artifact for '{}'. Skipping.",
                name.bold(),
                self.os.yellow()
            );
            return Ok(InstallOutcome::Unsupported);
        };

        if resolved.marker.exists() {
            log_info!(
                "[Setup] {} is already installed at {}",
                name.bold(),
                resolved.marker.display().to_string().green()
            );
            return Ok(InstallOutcome::AlreadyInstalled);
        }

        if dependency.prompt && !self.assume_yes {
            let question = match dependency.version.as_deref() {
                Some(version) => format!("Would you like to download {name} {version}?"),
                None => format!("Would you like to download {name}?"),
            };
            if !self.confirmation.confirm(&question) {
                log_warn!("[Setup] {} is required but was not installed.", name.bold());
                return Ok(InstallOutcome::Declined);
            }
        }

        log_info!("[Setup] Installing {}", name.bright_blue().bold());
        log_debug!("[Setup] Artifact for {}: {:?}", name, resolved.artifact);

        let request = FetchRequest::new(resolved.sources.clone(), resolved.download_path.clone())
            .with_sha256(resolved.artifact.sha256.clone());
        self.fetcher.fetch_with_progress(&request, &mut *self.reporter)?;

        if resolved.artifact.extract {
            let directory = self.directory_of(dependency);
            let report = Unpacker::with_format(resolved.artifact.format).extract_into(
                &resolved.download_path,
                &directory,
                resolved.artifact.delete_archive,
                &mut *self.reporter,
            )?;
            if let Some(warning) = report.cleanup_warning {
                log_warn!("[Setup] {}: {}", name, warning);
            }
        }

        self.fetch_extras(dependency)?;

        if !resolved.marker.exists() {
            return Err(SetupError::MarkerMissing {
                name: name.to_string(),
                marker: resolved.marker,
            });
        }
        log_info!("[Setup] {} installed", name.green().bold());
        Ok(InstallOutcome::Installed)
    }

    /// Extra single files (license texts). Files already present are kept.
    fn fetch_extras(&mut self, dependency: &Dependency) -> Result<(), SetupError> {
        let version = dependency.version.as_deref();
        let directory = self.directory_of(dependency);
        for extra in &dependency.extras {
            let destination = directory.join(substitute_version(&extra.file, version));
            if destination.exists() {
                log_debug!("[Setup] Keeping existing {}", destination.display());
                continue;
            }
            let sources = FetchSources::try_from(&extra.sources)?.map_urls(|url| substitute_version(url, version));
            let request = FetchRequest::new(sources, destination).with_sha256(extra.sha256.clone());
            self.fetcher.fetch_with_progress(&request, &mut *self.reporter)?;
        }
        Ok(())
    }

    /// Runs `install` for every configured dependency, stopping at the first error.
    pub fn install_all(&mut self) -> Result<InstallSummary, SetupError> {
        let loaded = self.loaded;
        let mut summary = InstallSummary::default();
        for dependency in &loaded.config.dependencies {
            let outcome = self.install(dependency)?;
            summary.record(&dependency.name, outcome);
        }
        Ok(summary)
    }
}

/// Result of checking one requirement against the environment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RequirementStatus {
    pub name: String,
    pub env: String,
    /// The variable's current value, if set.
    pub value: Option<String>,
    pub satisfied: bool,
}

/// Checks requirements with `lookup` (normally `std::env::var`).
/// A variable that is set and contains the expected text is satisfied;
/// anything else is flagged. Nothing is ever written.
pub fn evaluate_requirements(
    requirements: &[Requirement],
    lookup: impl Fn(&str) -> Option<String>,
) -> Vec<RequirementStatus> {
    requirements
        .iter()
        .map(|req| {
            let value = lookup(&req.env);
            let satisfied = match (&value, req.contains.as_deref()) {
                (None, _) => false,
                (Some(v), Some(expected)) => v.contains(expected),
                (Some(v), None) => !v.trim().is_empty(),
            };
            if !satisfied {
                log_warn!(
                    "[Check] {} not satisfied: {}={:?}",
                    req.name.bold(),
                    req.env,
                    value.as_deref().unwrap_or("<unset>")
                );
            }
            RequirementStatus {
                name: req.name.clone(),
                env: req.env.clone(),
                value,
                satisfied,
            }
        })
        .collect()
}
