//! # Unpacker
//!
//! Extracts zip and tar-family archives while skipping entries that already
//! exist on disk.
//!
//! Extraction runs in two steps:
//!
//! 1. **Plan** - every entry and its uncompressed size is listed before
//!    anything is written (zip: central directory; tar: a header-only pass
//!    over the stream). Entries whose destination file already exists are
//!    marked present and excluded from the byte total.
//! 2. **Write** - entries are visited in archive order; present ones are
//!    skipped, the rest are written, and a progress snapshot is emitted per
//!    entry.
//!
//! Re-running an extraction over a finished tree therefore writes nothing and
//! reports 100%.

use crate::libs::errors::{CleanupWarning, ExtractError};
use crate::libs::progress::{ConsoleProgress, ExtractProgress, ProgressReporter};
use crate::libs::utilities::assets::ArchiveFormat;
use crate::{log_debug, log_info, log_warn};
use bzip2::read::BzDecoder;
use colored::Colorize;
use flate2::read::GzDecoder;
use std::fs::{self, File};
use std::io::{self, BufReader, Read};
use std::path::{Component, Path, PathBuf};
use std::time::Instant;
use xz2::read::XzDecoder;
use zip::ZipArchive;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntryKind {
    File,
    Directory,
    Symlink,
    HardLink,
    /// Headers that produce nothing on disk (pax globals, devices, fifos).
    Other,
}

/// One entry of the archive index.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArchiveEntry {
    /// Relative path inside the archive, already checked to stay inside the destination.
    pub path: PathBuf,
    /// Uncompressed size; zero for everything but regular files.
    pub size: u64,
    pub kind: EntryKind,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlannedEntry {
    pub entry: ArchiveEntry,
    /// Something already exists at the destination, so the entry is skipped.
    pub present: bool,
}

/// The archive index checked against the destination directory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExtractionPlan {
    pub destination: PathBuf,
    pub entries: Vec<PlannedEntry>,
}

impl ExtractionPlan {
    pub fn new(entries: Vec<ArchiveEntry>, destination: &Path) -> Self {
        let entries = entries
            .into_iter()
            .map(|entry| {
                let present = is_present(&destination.join(&entry.path), entry.kind);
                PlannedEntry { entry, present }
            })
            .collect();
        Self {
            destination: destination.to_path_buf(),
            entries,
        }
    }

    /// Bytes that will actually be written.
    pub fn total_to_extract(&self) -> u64 {
        self.entries.iter().filter(|p| !p.present).map(|p| p.entry.size).sum()
    }

    /// Bytes of entries already on disk.
    pub fn skipped_bytes(&self) -> u64 {
        self.entries.iter().filter(|p| p.present).map(|p| p.entry.size).sum()
    }

    pub fn pending(&self) -> usize {
        self.entries.iter().filter(|p| !p.present).count()
    }
}

fn is_present(target: &Path, kind: EntryKind) -> bool {
    match kind {
        EntryKind::File => target.is_file(),
        EntryKind::Symlink | EntryKind::HardLink => fs::symlink_metadata(target).is_ok(),
        // Directories are cheap to (re)create and carry no bytes.
        EntryKind::Directory | EntryKind::Other => false,
    }
}

/// Outcome of a successful extraction.
#[derive(Debug, Clone, PartialEq)]
pub struct ExtractReport {
    pub destination: PathBuf,
    pub entries_total: usize,
    pub entries_extracted: usize,
    pub entries_skipped: usize,
    pub bytes_extracted: u64,
    pub total_to_extract: u64,
    pub archive_removed: bool,
    pub cleanup_warning: Option<CleanupWarning>,
}

/// Extracts archives; the format is fixed at construction or detected per call.
#[derive(Debug, Clone, Copy, Default)]
pub struct Unpacker {
    format: Option<ArchiveFormat>,
}

impl Unpacker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Forces a format instead of detecting it from the file name.
    pub fn with_format(format: Option<ArchiveFormat>) -> Self {
        Self { format }
    }

    /// The format used for `archive`: the forced one, else the file name, else
    /// the platform default.
    pub fn format_for(&self, archive: &Path) -> ArchiveFormat {
        self.format
            .or_else(|| ArchiveFormat::detect(archive))
            .unwrap_or_else(ArchiveFormat::platform_default)
    }

    /// Extracts `archive` next to itself, with a console progress bar.
    pub fn extract(&self, archive: &Path, delete_archive_after: bool) -> Result<ExtractReport, ExtractError> {
        let destination = match archive.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
            _ => PathBuf::from("."),
        };
        self.extract_into(archive, &destination, delete_archive_after, &mut ConsoleProgress::new())
    }

    /// Extracts `archive` into `destination`.
    ///
    /// # Arguments
    /// * `archive`: The archive on disk.
    /// * `destination`: Directory the entries are written under; created if missing.
    /// * `delete_archive_after`: Remove the archive once every entry is in place.
    /// * `reporter`: Receives one snapshot per entry.
    ///
    /// # Returns
    /// * `Ok(ExtractReport)`: counts, plus a cleanup warning if the archive could not be removed.
    /// * `Err(ExtractError)`: the archive could not be opened or read, or an entry was unsafe.
    pub fn extract_into(
        &self,
        archive: &Path,
        destination: &Path,
        delete_archive_after: bool,
        reporter: &mut dyn ProgressReporter,
    ) -> Result<ExtractReport, ExtractError> {
        let format = self.format_for(archive);
        log_info!(
            "[Extract] Extracting {} ({}) into {}",
            archive.display().to_string().blue(),
            format,
            destination.display().to_string().cyan()
        );

        fs::create_dir_all(destination).map_err(|source| ExtractError::Io {
            path: destination.to_path_buf(),
            source,
        })?;

        let entries = self.list_entries(archive)?;
        let plan = ExtractionPlan::new(entries, destination);
        log_debug!(
            "[Extract] {} entries, {} to write, {} bytes to extract, {} bytes already present",
            plan.entries.len(),
            plan.pending(),
            plan.total_to_extract(),
            plan.skipped_bytes()
        );

        let mut tracker = Tracker::new(&plan, reporter);
        let written = match format {
            ArchiveFormat::Zip => write_zip(archive, &plan, &mut tracker),
            _ => write_tar(archive, format, &plan, &mut tracker),
        };
        let bytes_extracted = tracker.extracted_bytes;
        tracker.reporter.finish();
        written?;

        let mut report = ExtractReport {
            destination: destination.to_path_buf(),
            entries_total: plan.entries.len(),
            entries_extracted: plan.pending(),
            entries_skipped: plan.entries.len() - plan.pending(),
            bytes_extracted,
            total_to_extract: plan.total_to_extract(),
            archive_removed: false,
            cleanup_warning: None,
        };

        if delete_archive_after {
            match fs::remove_file(archive) {
                Ok(()) => {
                    log_debug!("[Extract] Removed {}", archive.display());
                    report.archive_removed = true;
                }
                Err(e) => {
                    let warning = CleanupWarning {
                        path: archive.to_path_buf(),
                        message: e.to_string(),
                    };
                    log_warn!("[Extract] {}", warning);
                    report.cleanup_warning = Some(warning);
                }
            }
        }

        log_info!(
            "[Extract] Done: {} written, {} already present",
            report.entries_extracted.to_string().green(),
            report.entries_skipped
        );
        Ok(report)
    }

    /// Lists the archive's entries without writing anything.
    pub fn list_entries(&self, archive: &Path) -> Result<Vec<ArchiveEntry>, ExtractError> {
        let entries = match self.format_for(archive) {
            ArchiveFormat::Zip => list_zip(archive)?,
            format => list_tar(archive, format)?,
        };
        reject_paths_through_links(&entries)?;
        Ok(entries)
    }
}

/// Running counters shared by both format writers.
struct Tracker<'a> {
    reporter: &'a mut dyn ProgressReporter,
    started: Instant,
    entries_done: usize,
    entries_total: usize,
    extracted_bytes: u64,
    total_to_extract: u64,
}

impl<'a> Tracker<'a> {
    fn new(plan: &ExtractionPlan, reporter: &'a mut dyn ProgressReporter) -> Self {
        Self {
            reporter,
            started: Instant::now(),
            entries_done: 0,
            entries_total: plan.entries.len(),
            extracted_bytes: 0,
            total_to_extract: plan.total_to_extract(),
        }
    }

    fn entry_done(&mut self, written_bytes: u64) {
        self.entries_done += 1;
        self.extracted_bytes += written_bytes;
        self.reporter.extract_progress(&ExtractProgress {
            entries_done: self.entries_done,
            entries_total: self.entries_total,
            extracted_bytes: self.extracted_bytes,
            total_to_extract: self.total_to_extract,
            elapsed: self.started.elapsed(),
        });
    }
}

/// Turns an archive path into a relative path that cannot leave the destination.
/// `.` components are dropped; absolute paths and `..` are rejected.
fn sanitize_entry_path(raw: &Path) -> Result<PathBuf, ExtractError> {
    let mut clean = PathBuf::new();
    for component in raw.components() {
        match component {
            Component::Normal(part) => clean.push(part),
            Component::CurDir => {}
            Component::ParentDir | Component::RootDir | Component::Prefix(_) => {
                return Err(ExtractError::UnsafeEntry {
                    entry: raw.display().to_string(),
                });
            }
        }
    }
    Ok(clean)
}

/// Checks that a link at `entry` pointing to `target` stays inside the archive root.
fn ensure_link_within(entry: &Path, target: &Path) -> Result<(), ExtractError> {
    let unsafe_link = || ExtractError::UnsafeEntry {
        entry: format!("{} -> {}", entry.display(), target.display()),
    };
    // Depth below the destination root of the link's parent directory.
    let mut depth = entry.parent().map(|p| p.components().count()).unwrap_or(0) as i64;
    for component in target.components() {
        match component {
            Component::Normal(_) => depth += 1,
            Component::CurDir => {}
            Component::ParentDir => {
                depth -= 1;
                if depth < 0 {
                    return Err(unsafe_link());
                }
            }
            Component::RootDir | Component::Prefix(_) => return Err(unsafe_link()),
        }
    }
    Ok(())
}

/// Rejects entries that sit below a symlink entry of the same archive.
/// Once the link exists on disk such an entry would land wherever the link
/// points, so each link being safe on its own is not enough.
fn reject_paths_through_links(entries: &[ArchiveEntry]) -> Result<(), ExtractError> {
    let links: Vec<&Path> = entries
        .iter()
        .filter(|e| e.kind == EntryKind::Symlink)
        .map(|e| e.path.as_path())
        .collect();
    for entry in entries {
        if let Some(link) = links.iter().find(|link| entry.path != **link && entry.path.starts_with(link)) {
            return Err(ExtractError::UnsafeEntry {
                entry: format!("{} (below link {})", entry.path.display(), link.display()),
            });
        }
    }
    Ok(())
}

/// The destination with every link resolved. Written paths are checked against it.
fn canonical_root(destination: &Path) -> Result<PathBuf, ExtractError> {
    fs::canonicalize(destination).map_err(|source| ExtractError::Io {
        path: destination.to_path_buf(),
        source,
    })
}

/// Creates `dir` after checking that its closest existing ancestor, links
/// resolved, is still inside `root`. Links already on disk (left by an
/// earlier run or by the user) are caught here.
fn prepare_dir(root: &Path, dir: &Path, entry: &Path) -> Result<(), ExtractError> {
    if let Some(existing) = dir.ancestors().find(|p| p.exists()) {
        let resolved = fs::canonicalize(existing).map_err(|source| ExtractError::Io {
            path: existing.to_path_buf(),
            source,
        })?;
        if !resolved.starts_with(root) {
            return Err(ExtractError::UnsafeEntry {
                entry: entry.display().to_string(),
            });
        }
    }
    fs::create_dir_all(dir).map_err(|source| ExtractError::Io {
        path: dir.to_path_buf(),
        source,
    })
}

/// Prepares the parent of a file or link target. A dangling link sitting at
/// `target` itself is removed so the write replaces it instead of following it.
fn prepare_target(root: &Path, target: &Path, entry: &Path) -> Result<(), ExtractError> {
    prepare_dir(root, target.parent().unwrap_or(root), entry)?;
    let dangling_link = fs::symlink_metadata(target).is_ok_and(|m| m.file_type().is_symlink()) && !target.exists();
    if dangling_link {
        fs::remove_file(target).map_err(|source| ExtractError::Io {
            path: target.to_path_buf(),
            source,
        })?;
    }
    Ok(())
}

fn open_archive(archive: &Path) -> Result<File, ExtractError> {
    File::open(archive).map_err(|source| ExtractError::Open {
        path: archive.to_path_buf(),
        source,
    })
}

fn read_error(archive: &Path, error: impl ToString) -> ExtractError {
    ExtractError::Read {
        path: archive.to_path_buf(),
        message: error.to_string(),
    }
}

// Zip

fn open_zip(archive: &Path) -> Result<ZipArchive<BufReader<File>>, ExtractError> {
    let file = open_archive(archive)?;
    ZipArchive::new(BufReader::new(file)).map_err(|e| read_error(archive, e))
}

fn list_zip(archive: &Path) -> Result<Vec<ArchiveEntry>, ExtractError> {
    let mut zip = open_zip(archive)?;
    let mut entries = Vec::with_capacity(zip.len());
    for index in 0..zip.len() {
        let (path, kind, size) = {
            let file = zip.by_index_raw(index).map_err(|e| read_error(archive, e))?;
            let path = sanitize_entry_path(Path::new(file.name()))?;
            let kind = if file.is_dir() {
                EntryKind::Directory
            } else if file.unix_mode().is_some_and(is_symlink_mode) {
                EntryKind::Symlink
            } else {
                EntryKind::File
            };
            (path, kind, file.size())
        };

        if kind == EntryKind::Symlink {
            let target = read_zip_link(&mut zip, index, archive)?;
            ensure_link_within(&path, Path::new(&target))?;
        }
        let size = if kind == EntryKind::File { size } else { 0 };
        entries.push(ArchiveEntry { path, size, kind });
    }
    Ok(entries)
}

/// `S_IFLNK` in the file-type bits of a unix mode.
fn is_symlink_mode(mode: u32) -> bool {
    mode & 0o170000 == 0o120000
}

/// A zip symlink stores its target as the entry's content.
fn read_zip_link(zip: &mut ZipArchive<BufReader<File>>, index: usize, archive: &Path) -> Result<String, ExtractError> {
    let mut file = zip.by_index(index).map_err(|e| read_error(archive, e))?;
    let mut target = String::new();
    file.read_to_string(&mut target).map_err(|e| read_error(archive, e))?;
    Ok(target)
}

fn write_zip(archive: &Path, plan: &ExtractionPlan, tracker: &mut Tracker<'_>) -> Result<(), ExtractError> {
    let mut zip = open_zip(archive)?;
    let root = canonical_root(&plan.destination)?;
    for (index, planned) in plan.entries.iter().enumerate() {
        if planned.present {
            log_debug!("[Extract] Skipping existing {}", planned.entry.path.display());
            tracker.entry_done(0);
            continue;
        }

        let entry_path = planned.entry.path.as_path();
        let target = plan.destination.join(entry_path);
        match planned.entry.kind {
            EntryKind::Directory => {
                prepare_dir(&root, &target, entry_path)?;
                tracker.entry_done(0);
            }
            EntryKind::Symlink => {
                let link = read_zip_link(&mut zip, index, archive)?;
                prepare_target(&root, &target, entry_path)?;
                write_zip_link(&link, &target)?;
                tracker.entry_done(0);
            }
            _ => {
                prepare_target(&root, &target, entry_path)?;
                let mut file = zip.by_index(index).map_err(|e| read_error(archive, e))?;
                let mut out = File::create(&target).map_err(|source| ExtractError::Io { path: target.clone(), source })?;
                let copied = io::copy(&mut file, &mut out).map_err(|e| read_error(archive, e))?;
                #[cfg(unix)]
                if let Some(mode) = file.unix_mode() {
                    use std::os::unix::fs::PermissionsExt;
                    fs::set_permissions(&target, fs::Permissions::from_mode(mode & 0o777))
                        .map_err(|source| ExtractError::Io { path: target.clone(), source })?;
                }
                tracker.entry_done(copied);
            }
        }
    }
    Ok(())
}

#[cfg(unix)]
fn write_zip_link(link: &str, target: &Path) -> Result<(), ExtractError> {
    std::os::unix::fs::symlink(link, target).map_err(|source| ExtractError::Io {
        path: target.to_path_buf(),
        source,
    })
}

// Without unix symlinks the link is written as a plain file holding its target.
#[cfg(not(unix))]
fn write_zip_link(link: &str, target: &Path) -> Result<(), ExtractError> {
    fs::write(target, link).map_err(|source| ExtractError::Io {
        path: target.to_path_buf(),
        source,
    })
}

// Tar family

fn open_tar(archive: &Path, format: ArchiveFormat) -> Result<tar::Archive<Box<dyn Read>>, ExtractError> {
    let file = BufReader::new(open_archive(archive)?);
    let stream: Box<dyn Read> = match format {
        ArchiveFormat::Tar => Box::new(file),
        ArchiveFormat::TarGz => Box::new(GzDecoder::new(file)),
        ArchiveFormat::TarBz2 => Box::new(BzDecoder::new(file)),
        ArchiveFormat::TarXz => Box::new(XzDecoder::new(file)),
        ArchiveFormat::Zip => return Err(ExtractError::UnsupportedFormat("zip is not a tar stream".to_string())),
    };
    Ok(tar::Archive::new(stream))
}

fn tar_kind(entry_type: tar::EntryType) -> EntryKind {
    match entry_type {
        tar::EntryType::Regular | tar::EntryType::Continuous | tar::EntryType::GNUSparse => EntryKind::File,
        tar::EntryType::Directory => EntryKind::Directory,
        tar::EntryType::Symlink => EntryKind::Symlink,
        tar::EntryType::Link => EntryKind::HardLink,
        _ => EntryKind::Other,
    }
}

fn list_tar(archive: &Path, format: ArchiveFormat) -> Result<Vec<ArchiveEntry>, ExtractError> {
    let mut tar = open_tar(archive, format)?;
    let mut entries = Vec::new();
    for entry in tar.entries().map_err(|e| read_error(archive, e))? {
        let entry = entry.map_err(|e| read_error(archive, e))?;
        let raw = entry.path().map_err(|e| read_error(archive, e))?.into_owned();
        let path = sanitize_entry_path(&raw)?;
        let kind = tar_kind(entry.header().entry_type());

        if matches!(kind, EntryKind::Symlink | EntryKind::HardLink) {
            let target = entry
                .link_name()
                .map_err(|e| read_error(archive, e))?
                .ok_or_else(|| ExtractError::UnsafeEntry {
                    entry: format!("{} (link without target)", raw.display()),
                })?;
            if kind == EntryKind::HardLink {
                // Hard link targets are archive paths, not paths relative to the link.
                sanitize_entry_path(&target)?;
            } else {
                ensure_link_within(&path, &target)?;
            }
        }

        let size = if kind == EntryKind::File { entry.size() } else { 0 };
        entries.push(ArchiveEntry { path, size, kind });
    }
    Ok(entries)
}

fn write_tar(
    archive: &Path,
    format: ArchiveFormat,
    plan: &ExtractionPlan,
    tracker: &mut Tracker<'_>,
) -> Result<(), ExtractError> {
    let mut tar = open_tar(archive, format)?;
    let root = canonical_root(&plan.destination)?;
    let mut planned_entries = plan.entries.iter();

    for entry in tar.entries().map_err(|e| read_error(archive, e))? {
        let mut entry = entry.map_err(|e| read_error(archive, e))?;
        let planned = planned_entries
            .next()
            .ok_or_else(|| read_error(archive, "archive changed between listing and extraction"))?;

        if planned.present {
            log_debug!("[Extract] Skipping existing {}", planned.entry.path.display());
            tracker.entry_done(0);
            continue;
        }

        let entry_path = planned.entry.path.as_path();
        let target = plan.destination.join(entry_path);
        match planned.entry.kind {
            EntryKind::Directory => {
                prepare_dir(&root, &target, entry_path)?;
            }
            EntryKind::HardLink => {
                let link = entry.link_name().map_err(|e| read_error(archive, e))?;
                let source_path = link
                    .map(|l| sanitize_entry_path(&l))
                    .transpose()?
                    .map(|l| plan.destination.join(l))
                    .ok_or_else(|| read_error(archive, "hard link without target"))?;
                let resolved = fs::canonicalize(&source_path).map_err(|source| ExtractError::Io {
                    path: source_path.clone(),
                    source,
                })?;
                if !resolved.starts_with(&root) {
                    return Err(ExtractError::UnsafeEntry {
                        entry: format!("{} => {}", entry_path.display(), source_path.display()),
                    });
                }
                prepare_target(&root, &target, entry_path)?;
                // Fall back to a copy where hard links are not supported.
                if fs::hard_link(&resolved, &target).is_err() {
                    fs::copy(&resolved, &target).map_err(|source| ExtractError::Io { path: target.clone(), source })?;
                }
            }
            EntryKind::Other => {}
            EntryKind::File | EntryKind::Symlink => {
                prepare_target(&root, &target, entry_path)?;
                entry.unpack(&target).map_err(|e| read_error(archive, e))?;
            }
        }
        tracker.entry_done(planned.entry.size);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::libs::progress::{FetchProgress, SilentProgress};
    use std::io::Write;
    use zip::write::FileOptions;

    #[derive(Default)]
    struct Recorder(Vec<ExtractProgress>);

    impl ProgressReporter for Recorder {
        fn fetch_progress(&mut self, _progress: &FetchProgress) {}
        fn extract_progress(&mut self, progress: &ExtractProgress) {
            self.0.push(*progress);
        }
    }

    fn write_zip_fixture(path: &Path, files: &[(&str, &str)]) {
        let mut zip = zip::ZipWriter::new(File::create(path).unwrap());
        for (name, data) in files {
            zip.start_file(*name, FileOptions::default()).unwrap();
            zip.write_all(data.as_bytes()).unwrap();
        }
        zip.finish().unwrap();
    }

    /// Writes `files` as a tar stream into `writer` and hands the writer back
    /// so the caller can finish its compressor.
    fn write_tar_fixture<W: Write>(writer: W, files: &[(&str, &str)]) -> W {
        let mut builder = tar::Builder::new(writer);
        for (name, data) in files {
            let mut header = tar::Header::new_gnu();
            header.set_size(data.len() as u64);
            header.set_mode(0o755);
            header.set_cksum();
            builder.append_data(&mut header, name, data.as_bytes()).unwrap();
        }
        builder.into_inner().unwrap()
    }

    fn write_tar_gz_fixture(path: &Path, files: &[(&str, &str)]) {
        let encoder = flate2::write::GzEncoder::new(File::create(path).unwrap(), flate2::Compression::default());
        write_tar_fixture(encoder, files).finish().unwrap();
    }

    #[test]
    fn existing_files_are_skipped_and_excluded_from_the_total() {
        let dir = tempfile::tempdir().unwrap();
        let archive = dir.path().join("x.zip");
        write_zip_fixture(&archive, &[("a.txt", "aaaaaaaaaa"), ("b/c.txt", "cccccccccccccccccccc")]);
        fs::write(dir.path().join("a.txt"), b"keep me").unwrap();

        let mut recorder = Recorder::default();
        let report = Unpacker::new()
            .extract_into(&archive, dir.path(), false, &mut recorder)
            .unwrap();

        assert_eq!(report.total_to_extract, 20);
        assert_eq!(report.bytes_extracted, 20);
        assert_eq!(report.entries_skipped, 1);
        assert_eq!(fs::read(dir.path().join("a.txt")).unwrap(), b"keep me");
        assert_eq!(fs::read_to_string(dir.path().join("b/c.txt")).unwrap(), "c".repeat(20));
        let last = recorder.0.last().unwrap();
        assert_eq!(last.total_to_extract, 20);
        assert_eq!(last.percentage(), 100.0);
        assert_eq!(recorder.0.len(), 2);
    }

    #[test]
    fn extracting_twice_writes_nothing_the_second_time() {
        let dir = tempfile::tempdir().unwrap();
        let archive = dir.path().join("bundle.tar.gz");
        write_tar_gz_fixture(&archive, &[("bin/premake5", "#!/bin/sh\n"), ("LICENSE.txt", "BSD")]);

        let unpacker = Unpacker::new();
        let first = unpacker.extract_into(&archive, dir.path(), false, &mut SilentProgress).unwrap();
        assert_eq!(first.entries_extracted, 2);

        let mut recorder = Recorder::default();
        let second = unpacker.extract_into(&archive, dir.path(), false, &mut recorder).unwrap();
        assert_eq!(second.entries_extracted, 0);
        assert_eq!(second.total_to_extract, 0);
        assert_eq!(second.bytes_extracted, 0);
        assert!(recorder.0.iter().all(|p| p.percentage() == 100.0));
    }

    #[cfg(unix)]
    #[test]
    fn tar_permissions_survive_extraction() {
        use std::os::unix::fs::PermissionsExt;

        let dir = tempfile::tempdir().unwrap();
        let archive = dir.path().join("premake.tar.gz");
        write_tar_gz_fixture(&archive, &[("premake5", "binary")]);

        Unpacker::new().extract_into(&archive, dir.path(), false, &mut SilentProgress).unwrap();

        let mode = fs::metadata(dir.path().join("premake5")).unwrap().permissions().mode();
        assert_eq!(mode & 0o111, 0o111);
    }

    #[test]
    fn archive_is_removed_only_when_asked() {
        let dir = tempfile::tempdir().unwrap();
        let archive = dir.path().join("x.zip");
        write_zip_fixture(&archive, &[("a.txt", "a")]);

        let kept = Unpacker::new().extract_into(&archive, dir.path(), false, &mut SilentProgress).unwrap();
        assert!(!kept.archive_removed);
        assert!(archive.exists());

        let removed = Unpacker::new().extract_into(&archive, dir.path(), true, &mut SilentProgress).unwrap();
        assert!(removed.archive_removed);
        assert!(removed.cleanup_warning.is_none());
        assert!(!archive.exists());
    }

    #[test]
    fn extract_defaults_to_the_archive_directory() {
        let dir = tempfile::tempdir().unwrap();
        let archive = dir.path().join("nested").join("x.zip");
        fs::create_dir_all(archive.parent().unwrap()).unwrap();
        write_zip_fixture(&archive, &[("inner/file.txt", "hello")]);

        Unpacker::new().extract(&archive, true).unwrap();

        assert_eq!(fs::read(dir.path().join("nested/inner/file.txt")).unwrap(), b"hello");
        assert!(!archive.exists());
    }

    #[test]
    fn escaping_entries_are_rejected_before_writing() {
        let dir = tempfile::tempdir().unwrap();
        let archive = dir.path().join("evil.tar");
        {
            let mut builder = tar::Builder::new(File::create(&archive).unwrap());
            let data = b"pwned";
            let mut header = tar::Header::new_gnu();
            header.set_size(data.len() as u64);
            header.set_mode(0o644);
            // `set_path` refuses `..`, so write the raw name bytes.
            let name = b"../escape.txt";
            header.as_old_mut().name[..name.len()].copy_from_slice(name);
            header.set_cksum();
            builder.append(&header, &data[..]).unwrap();
            builder.finish().unwrap();
        }

        let out = dir.path().join("out");
        let result = Unpacker::new().extract_into(&archive, &out, false, &mut SilentProgress);

        assert!(matches!(result, Err(ExtractError::UnsafeEntry { .. })));
        assert!(!dir.path().join("escape.txt").exists());
    }

    #[test]
    fn symlink_chains_cannot_escape_the_destination() {
        let dir = tempfile::tempdir().unwrap();
        let archive = dir.path().join("chain.tar");
        {
            let mut builder = tar::Builder::new(File::create(&archive).unwrap());
            // Each link is harmless alone; together `a/b` resolves to the parent of `out`.
            for (name, target) in [("a", "."), ("a/b", "..")] {
                let mut header = tar::Header::new_gnu();
                header.set_entry_type(tar::EntryType::Symlink);
                header.set_size(0);
                header.set_mode(0o777);
                builder.append_link(&mut header, name, target).unwrap();
            }
            let data = b"pwned";
            let mut header = tar::Header::new_gnu();
            header.set_size(data.len() as u64);
            header.set_mode(0o644);
            header.set_cksum();
            builder.append_data(&mut header, "a/b/escape.txt", &data[..]).unwrap();
            builder.finish().unwrap();
        }

        let out = dir.path().join("out");
        let result = Unpacker::new().extract_into(&archive, &out, false, &mut SilentProgress);

        assert!(matches!(result, Err(ExtractError::UnsafeEntry { .. })));
        assert!(!dir.path().join("escape.txt").exists());
        assert!(fs::symlink_metadata(out.join("a")).is_err());
    }

    #[cfg(unix)]
    #[test]
    fn links_already_on_disk_are_not_followed_out() {
        let dir = tempfile::tempdir().unwrap();
        let outside = dir.path().join("outside");
        let out = dir.path().join("out");
        fs::create_dir_all(&outside).unwrap();
        fs::create_dir_all(&out).unwrap();
        std::os::unix::fs::symlink("../outside", out.join("link")).unwrap();

        let archive = dir.path().join("x.tar.gz");
        write_tar_gz_fixture(&archive, &[("link/file.txt", "pwned")]);
        let result = Unpacker::new().extract_into(&archive, &out, false, &mut SilentProgress);

        assert!(matches!(result, Err(ExtractError::UnsafeEntry { .. })));
        assert!(!outside.join("file.txt").exists());
    }

    #[cfg(unix)]
    #[test]
    fn zip_symlinks_are_restored_as_links() {
        let dir = tempfile::tempdir().unwrap();
        let archive = dir.path().join("libs.zip");
        {
            let mut zip = zip::ZipWriter::new(File::create(&archive).unwrap());
            zip.add_symlink("lib/libfoo.so", "libfoo.so.1", FileOptions::default()).unwrap();
            zip.start_file("lib/libfoo.so.1", FileOptions::default()).unwrap();
            zip.write_all(b"ELF").unwrap();
            zip.finish().unwrap();
        }

        let out = dir.path().join("out");
        let report = Unpacker::new().extract_into(&archive, &out, false, &mut SilentProgress).unwrap();

        assert_eq!(report.total_to_extract, 3);
        assert_eq!(fs::read_link(out.join("lib/libfoo.so")).unwrap(), PathBuf::from("libfoo.so.1"));
        assert_eq!(fs::read(out.join("lib/libfoo.so")).unwrap(), b"ELF");
    }

    #[test]
    fn escaping_zip_symlinks_are_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let archive = dir.path().join("evil.zip");
        {
            let mut zip = zip::ZipWriter::new(File::create(&archive).unwrap());
            zip.add_symlink("etc", "../../etc", FileOptions::default()).unwrap();
            zip.finish().unwrap();
        }

        let out = dir.path().join("out");
        let result = Unpacker::new().extract_into(&archive, &out, false, &mut SilentProgress);

        assert!(matches!(result, Err(ExtractError::UnsafeEntry { .. })));
        assert!(fs::symlink_metadata(out.join("etc")).is_err());
    }

    #[test]
    fn bzip2_and_xz_tarballs_extract() {
        let dir = tempfile::tempdir().unwrap();
        let files = [("bin/premake5", "#!/bin/sh\n"), ("LICENSE.txt", "BSD")];

        let bz2 = dir.path().join("premake.tar.bz2");
        let encoder = bzip2::write::BzEncoder::new(File::create(&bz2).unwrap(), bzip2::Compression::default());
        write_tar_fixture(encoder, &files).finish().unwrap();

        let xz = dir.path().join("premake.tar.xz");
        let encoder = xz2::write::XzEncoder::new(File::create(&xz).unwrap(), 6);
        write_tar_fixture(encoder, &files).finish().unwrap();

        for archive in [&bz2, &xz] {
            let out = dir.path().join(format!("{}-out", archive.file_name().unwrap().to_string_lossy()));
            let report = Unpacker::new().extract_into(archive, &out, false, &mut SilentProgress).unwrap();
            assert_eq!(report.entries_extracted, 2, "{}", archive.display());
            assert_eq!(fs::read_to_string(out.join("bin/premake5")).unwrap(), "#!/bin/sh\n");
            assert_eq!(fs::read_to_string(out.join("LICENSE.txt")).unwrap(), "BSD");
        }
    }

    #[cfg(unix)]
    #[test]
    fn failed_archive_removal_is_only_a_warning() {
        /// Deletes the archive while it is being extracted, so the final removal fails.
        struct RemovesArchive(PathBuf);

        impl ProgressReporter for RemovesArchive {
            fn fetch_progress(&mut self, _progress: &FetchProgress) {}
            fn extract_progress(&mut self, _progress: &ExtractProgress) {
                let _ = fs::remove_file(&self.0);
            }
        }

        let dir = tempfile::tempdir().unwrap();
        let archive = dir.path().join("x.tar.gz");
        write_tar_gz_fixture(&archive, &[("premake5", "binary")]);

        let out = dir.path().join("out");
        let mut reporter = RemovesArchive(archive.clone());
        let report = Unpacker::new().extract_into(&archive, &out, true, &mut reporter).unwrap();

        assert!(!report.archive_removed);
        let warning = report.cleanup_warning.unwrap();
        assert_eq!(warning.path, archive);
        assert_eq!(fs::read_to_string(out.join("premake5")).unwrap(), "binary");
    }

    #[test]
    fn unreadable_archives_are_read_errors() {
        let dir = tempfile::tempdir().unwrap();
        let archive = dir.path().join("broken.zip");
        fs::write(&archive, b"definitely not a zip").unwrap();

        let result = Unpacker::new().extract_into(&archive, dir.path(), true, &mut SilentProgress);

        assert!(matches!(result, Err(ExtractError::Read { .. })));
        assert!(archive.exists(), "a failed extraction must not delete the archive");
    }

    #[test]
    fn missing_archive_is_an_open_error() {
        let dir = tempfile::tempdir().unwrap();
        let result = Unpacker::new().extract_into(&dir.path().join("nope.zip"), dir.path(), false, &mut SilentProgress);
        assert!(matches!(result, Err(ExtractError::Open { .. })));
    }

    #[test]
    fn link_targets_must_stay_inside() {
        assert!(ensure_link_within(Path::new("lib/libfoo.so"), Path::new("libfoo.so.1")).is_ok());
        assert!(ensure_link_within(Path::new("lib/libfoo.so"), Path::new("../bin/foo")).is_ok());
        assert!(ensure_link_within(Path::new("lib/libfoo.so"), Path::new("../../etc/passwd")).is_err());
        assert!(ensure_link_within(Path::new("foo"), Path::new("/etc/passwd")).is_err());
    }

    #[test]
    fn sanitize_drops_current_dir_components() {
        assert_eq!(sanitize_entry_path(Path::new("./a/./b")).unwrap(), PathBuf::from("a/b"));
        assert!(sanitize_entry_path(Path::new("a/../../b")).is_err());
    }
}
