// Data structures for `engine-setup.yaml`.
// The file is parsed once into a `SetupConfig`, which is then only read:
// HTTP settings go to the fetcher, the dependency list to the installer.
use crate::libs::utilities::assets::ArchiveFormat;
use serde::{Deserialize, Serialize};

/// Default `User-Agent`. Some download hosts reject requests without one.
pub const DEFAULT_USER_AGENT: &str = concat!("engine-setup/", env!("CARGO_PKG_VERSION"));

/// The whole configuration file.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SetupConfig {
    #[serde(default)]
    pub http: HttpSettings,
    #[serde(default)]
    pub dependencies: Vec<Dependency>,
    /// Toolchain requirements that are only checked, never installed.
    #[serde(default)]
    pub requirements: Vec<Requirement>,
}

/// Transport settings for every download.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HttpSettings {
    #[serde(default = "default_user_agent")]
    pub user_agent: String,
    /// `None` leaves the connect phase unbounded.
    #[serde(default)]
    pub connect_timeout_secs: Option<u64>,
    /// Maximum silence between two reads of the body; `None` waits forever.
    #[serde(default)]
    pub read_timeout_secs: Option<u64>,
}

fn default_user_agent() -> String {
    DEFAULT_USER_AGENT.to_string()
}

impl Default for HttpSettings {
    fn default() -> Self {
        Self {
            user_agent: default_user_agent(),
            connect_timeout_secs: Some(30),
            read_timeout_secs: None,
        }
    }
}

/// A third-party tool the workspace needs on disk (e.g. Premake).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Dependency {
    pub name: String,
    /// Substituted for `{version}` in sources and file names.
    #[serde(default)]
    pub version: Option<String>,
    /// Where the dependency lives, relative to the config file.
    pub directory: String,
    /// Ask before downloading. `--yes` skips the question.
    #[serde(default = "default_true")]
    pub prompt: bool,
    /// One entry per platform; the first matching the current OS is used.
    #[serde(default)]
    pub artifacts: Vec<Artifact>,
    /// Extra single files fetched after the artifact (license texts and the like).
    #[serde(default)]
    pub extras: Vec<ExtraFile>,
}

/// The downloadable form of a dependency for one OS.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Artifact {
    /// "linux", "windows", "macos"; omitted means every OS.
    #[serde(default)]
    pub os: Option<String>,
    /// A URL or an ordered list of fallback URLs. Kept loose here and
    /// validated when the config is loaded.
    pub sources: serde_yaml::Value,
    /// File name of the download inside the dependency directory.
    pub file: String,
    /// File (relative to the dependency directory) whose presence means
    /// "installed". Defaults to `file`.
    #[serde(default)]
    pub installed: Option<String>,
    #[serde(default = "default_true")]
    pub extract: bool,
    #[serde(default = "default_true")]
    pub delete_archive: bool,
    /// Overrides detection from the file name.
    #[serde(default)]
    pub format: Option<ArchiveFormat>,
    #[serde(default)]
    pub sha256: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExtraFile {
    pub sources: serde_yaml::Value,
    pub file: String,
    #[serde(default)]
    pub sha256: Option<String>,
}

/// An environment variable that must be set, optionally containing a version.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Requirement {
    pub name: String,
    pub env: String,
    #[serde(default)]
    pub contains: Option<String>,
}

fn default_true() -> bool {
    true
}
