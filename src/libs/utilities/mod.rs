// Small helpers shared by the fetch / extract core and the setup flow.

// `~` expansion, config-relative paths and `{version}` placeholders.
pub mod path_helpers;
// OS detection and name normalisation for per-platform artifacts.
pub mod platform;
// Archive format names and detection from file names.
pub mod assets;
