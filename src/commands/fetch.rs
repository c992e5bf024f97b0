// The `fetch` command: download one file, trying each source in order.

use crate::libs::fetcher::{FetchRequest, FetchSources, Fetcher};
use crate::libs::progress::ConsoleProgress;
use crate::schemas::setup_config::HttpSettings;
use crate::{log_debug, log_info};
use colored::Colorize;
use std::path::PathBuf;

/// Entry point for `engine-setup fetch <DEST> <SOURCE>...`.
///
/// A single source fails with that source's error; several sources fail only
/// once all of them did.
pub fn run(destination: PathBuf, sources: Vec<String>, sha256: Option<String>) -> anyhow::Result<()> {
    log_debug!("[Fetch] {} source(s) for {}", sources.len(), destination.display());

    let sources = match <[String; 1]>::try_from(sources) {
        Ok([single]) => FetchSources::Single(single),
        Err(list) => FetchSources::List(list),
    };
    let request = FetchRequest::new(sources, destination).with_sha256(sha256);

    let fetcher = Fetcher::new(&HttpSettings::default());
    let saved = fetcher.fetch_with_progress(&request, &mut ConsoleProgress::new())?;
    log_info!("[Fetch] Ready: {}", saved.display().to_string().green());
    Ok(())
}
