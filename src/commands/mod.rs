// Register application subcommands.
// Each module corresponds to one `engine-setup` command-line action and
// returns `anyhow::Result` so `main` can report failures uniformly.

// Reports which dependencies and requirements are missing.
pub mod check;
// Extracts an archive by hand.
pub mod extract;
// Downloads a file by hand, with fallback sources.
pub mod fetch;
// Writes a default `engine-setup.yaml`.
pub mod generate;
// Installs every missing dependency.
pub mod setup;
// Displays the version of engine-setup.
pub mod version;
