// Prints the version of `engine-setup`, taken from `Cargo.toml` at build time.

/// Entry point for `engine-setup version`. Printed on stdout so scripts can read it.
pub fn run() -> anyhow::Result<()> {
    println!("{} {}", env!("CARGO_PKG_NAME"), env!("CARGO_PKG_VERSION"));
    Ok(())
}
