// Path helpers shared by config loading and the setup flow.
use crate::log_debug;
// The 'colored' crate helps us make our console output look pretty and readable.
use colored::Colorize;
use std::path::{Path, PathBuf};

/// Resolves paths that start with `~` to the user's home directory.
///
/// # Arguments
/// * `path`: A path string which might start with `~`.
///
/// # Returns
/// * `PathBuf`: The expanded path, or the input unchanged when it has no leading `~`
///              or the home directory cannot be determined.
pub fn expand_tilde(path: &str) -> PathBuf {
    if let Some(rest) = path.strip_prefix('~') {
        // `~user` forms are left alone; only `~` and `~/...` are expanded.
        if rest.is_empty() || rest.starts_with('/') || rest.starts_with('\\') {
            if let Some(home) = dirs::home_dir() {
                return home.join(rest.trim_start_matches(['/', '\\']));
            }
        }
    }
    PathBuf::from(path)
}

/// Resolves a path from the config file against the config file's directory.
/// Absolute and `~` paths are used as they are.
pub fn resolve_against(base_dir: &Path, path: &str) -> PathBuf {
    let expanded = expand_tilde(path);
    if expanded.is_absolute() {
        expanded
    } else {
        let joined = base_dir.join(expanded);
        log_debug!("[Paths] Resolved '{}' to {}", path, joined.display().to_string().cyan());
        joined
    }
}

/// Replaces every `{version}` placeholder. Missing versions leave the text untouched.
pub fn substitute_version(template: &str, version: Option<&str>) -> String {
    match version {
        Some(v) => template.replace("{version}", v),
        None => template.to_string(),
    }
}
