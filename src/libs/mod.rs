// Core library modules of `engine-setup`.

// Error enums for fetching, extracting, config loading and setup.
pub mod errors;
// Progress snapshots and the reporters that display them.
pub mod progress;
// Downloads with multi-source fallback.
pub mod fetcher;
// Archive extraction that skips files already on disk.
pub mod unpacker;
// Yes/no confirmation before optional downloads.
pub mod prompt;
// Reads and validates `engine-setup.yaml`.
pub mod config_loading;
// Resolves where the config file lives.
pub mod paths;
// Installs the configured dependencies and checks requirements.
pub mod dependency_installer;
pub mod utilities;
