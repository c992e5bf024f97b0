// Operating system detection, used to pick the right artifact of a dependency
// (zip for Windows, tar.gz for Linux, ...).
use crate::log_warn;
use colored::Colorize;

/// Detects the current operating system as a canonical name
/// ("macos", "linux", "windows").
pub fn detect_os() -> String {
    // `std::env::consts::OS` is the target the binary was compiled for.
    normalize_os(std::env::consts::OS)
}

/// Maps the many spellings of an OS name to a single lowercase form.
///
/// # Arguments
/// * `os`: e.g. "macOS", "Darwin", "Win64", "Linux".
///
/// # Returns
/// * `String`: "macos", "linux" or "windows"; unknown names come back lowercased.
pub fn normalize_os(os: &str) -> String {
    match os.trim().to_lowercase().as_str() {
        "macos" | "darwin" | "osx" | "apple-darwin" => "macos".to_string(),
        "linux" => "linux".to_string(),
        "windows" | "win32" | "win64" => "windows".to_string(),
        other => {
            log_warn!("[Platform] Unknown OS variant '{}', using as-is.", other.purple());
            other.to_string()
        }
    }
}

/// Whether an artifact declared for `artifact_os` applies to `current_os`.
/// Artifacts without an OS apply everywhere.
pub fn os_matches(artifact_os: Option<&str>, current_os: &str) -> bool {
    match artifact_os {
        None => true,
        Some(os) => normalize_os(os) == normalize_os(current_os),
    }
}
