// The `extract` command: unpack an archive by hand.

use crate::libs::progress::ConsoleProgress;
use crate::libs::unpacker::Unpacker;
use crate::libs::utilities::assets::ArchiveFormat;
use crate::{log_info, log_warn};
use colored::Colorize;
use std::path::{Path, PathBuf};

/// Entry point for `engine-setup extract <ARCHIVE> [--into DIR] [--format F] [--keep]`.
///
/// # Arguments
/// * `archive`: The archive on disk.
/// * `into`: Target directory; defaults to the archive's own directory.
/// * `format`: Overrides detection from the file name.
/// * `keep`: Keep the archive after a successful extraction.
pub fn run(archive: PathBuf, into: Option<PathBuf>, format: Option<ArchiveFormat>, keep: bool) -> anyhow::Result<()> {
    let unpacker = Unpacker::with_format(format);
    let report = match into {
        Some(dir) => unpacker.extract_into(&archive, &dir, !keep, &mut ConsoleProgress::new())?,
        None => unpacker.extract(&archive, !keep)?,
    };

    log_info!(
        "[Extract] {} of {} entries written into {}",
        report.entries_extracted,
        report.entries_total,
        report.destination.display().to_string().cyan()
    );
    if let Some(warning) = report.cleanup_warning {
        log_warn!("[Extract] Archive left behind: {}", warning);
    } else if report.archive_removed {
        log_info!("[Extract] Removed {}", display_name(&archive));
    }
    Ok(())
}

fn display_name(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string())
}
