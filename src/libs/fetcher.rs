//! # Fetcher
//!
//! Downloads a file from one of several candidate sources.
//!
//! Sources are tried in order. Each attempt streams the response body into a
//! staging file next to the destination; only a complete transfer (body
//! length matches `Content-Length`, checksum matches when one is configured)
//! is renamed onto the destination. A failed attempt drops its staging file,
//! so the destination never holds a partial download.

use crate::libs::errors::{FailureClass, FetchError};
use crate::libs::progress::{ConsoleProgress, FetchProgress, ProgressReporter};
use crate::schemas::setup_config::HttpSettings;
use crate::{log_debug, log_error, log_info, log_warn};
use colored::Colorize;
use sha2::{Digest, Sha256};
use std::fs;
use std::io::{self, Read, Write};
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

/// Known sizes are split into roughly this many chunks.
pub const TARGET_CHUNK_COUNT: u64 = 1000;
/// Smallest chunk used when the size is known.
pub const MIN_CHUNK_SIZE: u64 = 1024 * 1024;
/// Chunk used when the server does not announce a size.
pub const UNKNOWN_SIZE_CHUNK: u64 = 256 * 1024;

/// One location or an ordered list of fallback locations.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FetchSources {
    Single(String),
    List(Vec<String>),
}

impl FetchSources {
    /// All locations in the order they will be tried.
    pub fn urls(&self) -> Vec<&str> {
        match self {
            FetchSources::Single(url) => vec![url.as_str()],
            FetchSources::List(urls) => urls.iter().map(String::as_str).collect(),
        }
    }

    /// Applies `f` to every location, keeping the shape.
    pub fn map_urls(&self, f: impl Fn(&str) -> String) -> Self {
        match self {
            FetchSources::Single(url) => FetchSources::Single(f(url)),
            FetchSources::List(urls) => FetchSources::List(urls.iter().map(|u| f(u)).collect()),
        }
    }
}

impl From<&str> for FetchSources {
    fn from(url: &str) -> Self {
        FetchSources::Single(url.to_string())
    }
}

impl From<Vec<String>> for FetchSources {
    fn from(urls: Vec<String>) -> Self {
        FetchSources::List(urls)
    }
}

impl TryFrom<&serde_yaml::Value> for FetchSources {
    type Error = FetchError;

    /// Accepts a string or a non-empty list of strings; every other shape is
    /// an `InvalidArgument`.
    fn try_from(value: &serde_yaml::Value) -> Result<Self, Self::Error> {
        match value {
            serde_yaml::Value::String(url) if !url.trim().is_empty() => {
                Ok(FetchSources::Single(url.trim().to_string()))
            }
            serde_yaml::Value::Sequence(items) if !items.is_empty() => items
                .iter()
                .map(|item| match item {
                    serde_yaml::Value::String(url) if !url.trim().is_empty() => Ok(url.trim().to_string()),
                    other => Err(FetchError::InvalidArgument(format!(
                        "source list entries must be non-empty strings, got {other:?}"
                    ))),
                })
                .collect::<Result<Vec<_>, _>>()
                .map(FetchSources::List),
            other => Err(FetchError::InvalidArgument(format!(
                "sources must be a location or a non-empty list of locations, got {other:?}"
            ))),
        }
    }
}

/// A single download: where from, where to, and optionally what it must hash to.
#[derive(Debug, Clone)]
pub struct FetchRequest {
    pub sources: FetchSources,
    pub destination: PathBuf,
    /// Lowercase hex SHA-256 of the expected content.
    pub sha256: Option<String>,
}

impl FetchRequest {
    pub fn new(sources: impl Into<FetchSources>, destination: impl Into<PathBuf>) -> Self {
        Self {
            sources: sources.into(),
            destination: destination.into(),
            sha256: None,
        }
    }

    pub fn with_sha256(mut self, sha256: Option<String>) -> Self {
        self.sha256 = sha256.map(|s| s.trim().to_lowercase());
        self
    }
}

/// Picks the chunk size for a body of `total` bytes: about a thousand chunks,
/// never less than 1 MiB; a fixed size when the total is unknown.
pub fn chunk_size_for(total: Option<u64>) -> u64 {
    match total {
        Some(total) => (total / TARGET_CHUNK_COUNT).max(MIN_CHUNK_SIZE),
        None => UNKNOWN_SIZE_CHUNK,
    }
}

/// Blocking HTTP downloader configured once from [`HttpSettings`].
pub struct Fetcher {
    agent: ureq::Agent,
}

impl Fetcher {
    pub fn new(settings: &HttpSettings) -> Self {
        let mut builder = ureq::AgentBuilder::new().user_agent(&settings.user_agent);
        if let Some(secs) = settings.connect_timeout_secs {
            builder = builder.timeout_connect(Duration::from_secs(secs));
        }
        if let Some(secs) = settings.read_timeout_secs {
            builder = builder.timeout_read(Duration::from_secs(secs));
        }
        Self { agent: builder.build() }
    }

    /// Downloads `sources` to `destination` with a console progress bar.
    pub fn fetch(&self, sources: &FetchSources, destination: &Path) -> Result<PathBuf, FetchError> {
        let request = FetchRequest::new(sources.clone(), destination);
        self.fetch_with_progress(&request, &mut ConsoleProgress::new())
    }

    /// Downloads `request`, reporting every chunk to `reporter`.
    ///
    /// # Returns
    /// * `Ok(PathBuf)`: the destination, now holding the complete file.
    /// * `Err(FetchError::TransientSourceFailure)`: the single source failed.
    /// * `Err(FetchError::AllSourcesExhausted)`: every listed source failed.
    /// * `Err(FetchError::InvalidArgument)`: an empty source list.
    /// * `Err(FetchError::Io)`: the destination directory could not be prepared.
    pub fn fetch_with_progress(
        &self,
        request: &FetchRequest,
        reporter: &mut dyn ProgressReporter,
    ) -> Result<PathBuf, FetchError> {
        let destination = request.destination.as_path();
        if matches!(&request.sources, FetchSources::List(urls) if urls.is_empty()) {
            return Err(FetchError::InvalidArgument("source list is empty".to_string()));
        }
        prepare_parent(destination)?;

        match &request.sources {
            FetchSources::Single(url) => {
                log_debug!("[Fetch] Single source for {}", destination.display());
                self.fetch_one(url, request, reporter)?;
                Ok(destination.to_path_buf())
            }
            FetchSources::List(urls) => {
                for (index, url) in urls.iter().enumerate() {
                    log_info!("[Fetch] Downloading {} ({}/{})", url.blue(), index + 1, urls.len());
                    match self.fetch_one(url, request, reporter) {
                        Ok(_) => return Ok(destination.to_path_buf()),
                        Err(FetchError::TransientSourceFailure { class, message, .. }) => {
                            log_warn!(
                                "[Fetch] {} error from {}: {}. Proceeding with backup...",
                                class.to_string().yellow(),
                                url,
                                message
                            );
                        }
                        Err(other) => return Err(other),
                    }
                }
                log_error!(
                    "[Fetch] Failed to download {}: no source left to try",
                    destination.display().to_string().red()
                );
                Err(FetchError::AllSourcesExhausted {
                    destination: destination.to_path_buf(),
                })
            }
        }
    }

    /// One attempt against one source. The staging file is deleted on every
    /// error path when it goes out of scope.
    fn fetch_one(
        &self,
        url: &str,
        request: &FetchRequest,
        reporter: &mut dyn ProgressReporter,
    ) -> Result<u64, FetchError> {
        let destination = request.destination.as_path();
        let staging_dir = parent_dir(destination);
        let mut staging = tempfile::Builder::new()
            .prefix(".engine-setup-")
            .suffix(".part")
            .tempfile_in(staging_dir)
            .map_err(|source| FetchError::Io {
                path: staging_dir.to_path_buf(),
                source,
            })?;

        let response = self.agent.get(url).call().map_err(|e| classify_request_error(url, e))?;
        let total = response
            .header("Content-Length")
            .and_then(|value| value.trim().parse::<u64>().ok());
        log_debug!("[Fetch] {} announced {:?} bytes", url, total);

        let mut reader = response.into_reader();
        let outcome = stream_body(
            &mut reader,
            staging.as_file_mut(),
            total,
            request.sha256.is_some(),
            reporter,
        );
        reporter.finish();
        let (written, digest) = outcome.map_err(|(class, e)| FetchError::transient(url, class, e.to_string()))?;

        if let Some(expected) = total {
            if written != expected {
                return Err(FetchError::transient(
                    url,
                    FailureClass::Protocol,
                    format!("received {written} of {expected} announced bytes"),
                ));
            }
        }
        if let (Some(expected), Some(actual)) = (request.sha256.as_deref(), digest.as_deref()) {
            if expected != actual {
                return Err(FetchError::transient(
                    url,
                    FailureClass::Protocol,
                    format!("checksum mismatch: expected {expected}, got {actual}"),
                ));
            }
        }

        staging
            .as_file()
            .sync_all()
            .map_err(|e| FetchError::transient(url, FailureClass::Unknown, e.to_string()))?;
        staging.persist(destination).map_err(|e| FetchError::Io {
            path: destination.to_path_buf(),
            source: e.error,
        })?;

        log_info!(
            "[Fetch] Saved {} bytes to {}",
            written,
            destination.display().to_string().green()
        );
        Ok(written)
    }
}

/// Creates the destination's parent directories. Existing directories are fine.
fn prepare_parent(destination: &Path) -> Result<(), FetchError> {
    let parent = parent_dir(destination);
    fs::create_dir_all(parent).map_err(|source| FetchError::Io {
        path: parent.to_path_buf(),
        source,
    })
}

fn parent_dir(path: &Path) -> &Path {
    match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    }
}

fn classify_request_error(url: &str, error: ureq::Error) -> FetchError {
    match error {
        ureq::Error::Status(code, response) => FetchError::transient(
            url,
            FailureClass::Protocol,
            format!("HTTP {} {}", code, response.status_text()),
        ),
        ureq::Error::Transport(transport) => {
            FetchError::transient(url, FailureClass::Network, transport.to_string())
        }
    }
}

/// Copies `reader` into `writer` chunk by chunk.
///
/// Read failures are network failures; write failures are local (unknown).
/// Returns the byte count and, when `hash` is set, the SHA-256 of the body.
fn stream_body(
    reader: &mut dyn Read,
    writer: &mut dyn Write,
    total: Option<u64>,
    hash: bool,
    reporter: &mut dyn ProgressReporter,
) -> Result<(u64, Option<String>), (FailureClass, io::Error)> {
    let chunk_size = chunk_size_for(total) as usize;
    let mut buffer = vec![0u8; chunk_size];
    let mut hasher = hash.then(Sha256::new);
    let mut downloaded = 0u64;
    let started = Instant::now();

    loop {
        let filled = fill_chunk(reader, &mut buffer).map_err(|e| (FailureClass::Network, e))?;
        if filled == 0 {
            break;
        }
        writer
            .write_all(&buffer[..filled])
            .map_err(|e| (FailureClass::Unknown, e))?;
        if let Some(hasher) = hasher.as_mut() {
            hasher.update(&buffer[..filled]);
        }
        downloaded += filled as u64;
        reporter.fetch_progress(&FetchProgress {
            downloaded,
            total,
            elapsed: started.elapsed(),
        });
    }
    writer.flush().map_err(|e| (FailureClass::Unknown, e))?;

    let digest = hasher.map(|h| format!("{:x}", h.finalize()));
    Ok((downloaded, digest))
}

/// Reads until `buffer` is full or the stream ends.
fn fill_chunk(reader: &mut dyn Read, buffer: &mut [u8]) -> io::Result<usize> {
    let mut filled = 0;
    while filled < buffer.len() {
        match reader.read(&mut buffer[filled..]) {
            Ok(0) => break,
            Ok(n) => filled += n,
            Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
            Err(e) => return Err(e),
        }
    }
    Ok(filled)
}
