//! Progress accounting for downloads and extraction.
//!
//! The fetcher and unpacker compute a snapshot after every chunk / entry and
//! hand it to a [`ProgressReporter`]. Reporting is purely observational: a
//! reporter cannot fail and cannot influence the transfer.

use indicatif::{ProgressBar, ProgressStyle};
use std::time::Duration;

/// Snapshot of a running download.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FetchProgress {
    pub downloaded: u64,
    /// `None` when the source did not send a `Content-Length`.
    pub total: Option<u64>,
    pub elapsed: Duration,
}

impl FetchProgress {
    /// Percentage in `0.0..=100.0`, only when the total size is known.
    pub fn percentage(&self) -> Option<f64> {
        match self.total {
            Some(0) => Some(100.0),
            Some(total) => Some(self.downloaded as f64 / total as f64 * 100.0),
            None => None,
        }
    }

    pub fn throughput_kb_per_sec(&self) -> f64 {
        kb_per_sec(self.downloaded, self.elapsed)
    }
}

/// Snapshot of a running extraction, emitted once per archive entry.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ExtractProgress {
    pub entries_done: usize,
    pub entries_total: usize,
    pub extracted_bytes: u64,
    /// Bytes that actually need writing; entries already on disk are excluded.
    pub total_to_extract: u64,
    pub elapsed: Duration,
}

impl ExtractProgress {
    /// Fraction of the work done. Nothing to extract counts as finished.
    pub fn done_ratio(&self) -> f64 {
        if self.total_to_extract == 0 {
            1.0
        } else {
            (self.extracted_bytes as f64 / self.total_to_extract as f64).min(1.0)
        }
    }

    pub fn percentage(&self) -> f64 {
        self.done_ratio() * 100.0
    }

    pub fn throughput_kb_per_sec(&self) -> f64 {
        kb_per_sec(self.extracted_bytes, self.elapsed)
    }
}

fn kb_per_sec(bytes: u64, elapsed: Duration) -> f64 {
    let secs = elapsed.as_secs_f64();
    if secs <= 0.0 {
        return 0.0;
    }
    (bytes as f64 / 1024.0) / secs
}

/// Formats a throughput given in KB/s, switching to MB/s above 1024 KB/s.
pub fn format_throughput(kb_per_sec: f64) -> String {
    if kb_per_sec > 1024.0 {
        format!("{:.2} MB/s", kb_per_sec / 1024.0)
    } else {
        format!("{:.2} KB/s", kb_per_sec)
    }
}

/// Receives progress snapshots.
pub trait ProgressReporter {
    fn fetch_progress(&mut self, progress: &FetchProgress);
    fn extract_progress(&mut self, progress: &ExtractProgress);
    /// Called once when a download or extraction ends, successfully or not.
    fn finish(&mut self) {}
}

/// Discards every snapshot. Used by `check` and by tests.
#[derive(Debug, Default)]
pub struct SilentProgress;

impl ProgressReporter for SilentProgress {
    fn fetch_progress(&mut self, _progress: &FetchProgress) {}
    fn extract_progress(&mut self, _progress: &ExtractProgress) {}
}

/// Draws progress on stderr with indicatif.
#[derive(Default)]
pub struct ConsoleProgress {
    bar: Option<ProgressBar>,
}

impl ConsoleProgress {
    pub fn new() -> Self {
        Self::default()
    }

    fn bar_for(&mut self, length: Option<u64>) -> &ProgressBar {
        self.bar.get_or_insert_with(|| match length {
            Some(len) => {
                let bar = ProgressBar::new(len);
                bar.set_style(
                    ProgressStyle::with_template("{bar:50} {msg}")
                        .unwrap_or_else(|_| ProgressStyle::default_bar())
                        .progress_chars("█▉."),
                );
                bar
            }
            None => {
                let bar = ProgressBar::new_spinner();
                bar.set_style(
                    ProgressStyle::with_template("{spinner} {bytes} {msg}")
                        .unwrap_or_else(|_| ProgressStyle::default_spinner()),
                );
                bar
            }
        })
    }
}

impl ProgressReporter for ConsoleProgress {
    fn fetch_progress(&mut self, progress: &FetchProgress) {
        let speed = format_throughput(progress.throughput_kb_per_sec());
        let bar = self.bar_for(progress.total);
        bar.set_position(progress.downloaded);
        match progress.percentage() {
            Some(pct) => bar.set_message(format!("{pct:.2}% ({speed})")),
            None => bar.set_message(format!("({speed})")),
        }
    }

    fn extract_progress(&mut self, progress: &ExtractProgress) {
        let speed = format_throughput(progress.throughput_kb_per_sec());
        // A zero-length bar never draws as full, so an empty plan gets a 1-unit bar.
        let length = progress.total_to_extract.max(1);
        let bar = self.bar_for(Some(length));
        let position = if progress.total_to_extract == 0 {
            1
        } else {
            progress.extracted_bytes
        };
        bar.set_position(position);
        bar.set_message(format!(
            "{:.2}% ({}) {}/{}",
            progress.percentage(),
            speed,
            progress.entries_done,
            progress.entries_total
        ));
    }

    fn finish(&mut self) {
        if let Some(bar) = self.bar.take() {
            bar.finish();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn throughput_switches_to_mb_above_1024_kb() {
        assert_eq!(format_throughput(512.0), "512.00 KB/s");
        assert_eq!(format_throughput(1024.0), "1024.00 KB/s");
        assert_eq!(format_throughput(2048.0), "2.00 MB/s");
    }

    #[test]
    fn zero_elapsed_time_reports_zero_throughput() {
        let progress = FetchProgress {
            downloaded: 4096,
            total: Some(8192),
            elapsed: Duration::ZERO,
        };
        assert_eq!(progress.throughput_kb_per_sec(), 0.0);
        assert_eq!(progress.percentage(), Some(50.0));
    }

    #[test]
    fn unknown_total_has_no_percentage() {
        let progress = FetchProgress {
            downloaded: 10,
            total: None,
            elapsed: Duration::from_secs(1),
        };
        assert_eq!(progress.percentage(), None);
    }

    #[test]
    fn empty_extraction_is_complete() {
        let progress = ExtractProgress {
            entries_done: 2,
            entries_total: 2,
            extracted_bytes: 0,
            total_to_extract: 0,
            elapsed: Duration::from_millis(3),
        };
        assert_eq!(progress.done_ratio(), 1.0);
        assert_eq!(progress.percentage(), 100.0);
    }
}
