// Error types for the fetch / extract core and the setup flow around it.
// Each failure class gets its own variant so callers can tell a bad request
// from an exhausted source list from a broken archive.

use std::fmt;
use std::io;
use std::path::PathBuf;
use thiserror::Error;

/// How a single source failed. Only used for reporting; every class is
/// recovered the same way (move on to the next source).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureClass {
    /// DNS, connect, TLS, or the connection dropping mid-body.
    Network,
    /// The server answered, but with an error status or the wrong content
    /// (length or checksum mismatch).
    Protocol,
    /// Anything else, e.g. the local disk refusing the write.
    Unknown,
}

impl fmt::Display for FailureClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            FailureClass::Network => "network",
            FailureClass::Protocol => "protocol",
            FailureClass::Unknown => "unknown",
        };
        f.write_str(label)
    }
}

#[derive(Debug, Error)]
pub enum FetchError {
    /// The sources were neither a single location nor a list of locations.
    #[error("invalid fetch request: {0}")]
    InvalidArgument(String),

    /// One source failed. Swallowed by the fallback loop when more sources remain.
    #[error("{class} error while downloading {url}: {message}")]
    TransientSourceFailure {
        url: String,
        class: FailureClass,
        message: String,
    },

    #[error("failed to download {}: every source failed", destination.display())]
    AllSourcesExhausted { destination: PathBuf },

    /// The destination side could not be prepared (parent directory, staging
    /// file, final rename). Not tied to a source, so it is never retried.
    #[error("cannot write {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

impl FetchError {
    pub(crate) fn transient(url: &str, class: FailureClass, message: impl Into<String>) -> Self {
        FetchError::TransientSourceFailure {
            url: url.to_string(),
            class,
            message: message.into(),
        }
    }
}

#[derive(Debug, Error)]
pub enum ExtractError {
    #[error("cannot open archive {}: {source}", path.display())]
    Open {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("cannot read archive {}: {message}", path.display())]
    Read { path: PathBuf, message: String },

    #[error("unsupported archive format: {0}")]
    UnsupportedFormat(String),

    /// Absolute paths, `..` escapes and links pointing outside the destination.
    #[error("archive entry '{entry}' would be written outside the destination")]
    UnsafeEntry { entry: String },

    #[error("cannot write {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

/// The archive was extracted but could not be removed afterwards.
/// Recorded in the extraction report; never turns a success into a failure.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CleanupWarning {
    pub path: PathBuf,
    pub message: String,
}

impl fmt::Display for CleanupWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "could not remove {}: {}", self.path.display(), self.message)
    }
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("cannot read config {}: {source}", path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("cannot parse config {}: {source}", path.display())]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_yaml::Error,
    },

    #[error("invalid config: {0}")]
    Invalid(String),
}

#[derive(Debug, Error)]
pub enum SetupError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Fetch(#[from] FetchError),

    #[error(transparent)]
    Extract(#[from] ExtractError),

    /// Download and extraction succeeded but the file that marks the
    /// dependency as installed is still missing.
    #[error("{name} was unpacked but {} is still missing", marker.display())]
    MarkerMissing { name: String, marker: PathBuf },
}
