// src/commands/generate.rs
// Writes a starter `engine-setup.yaml` describing the engine's default
// dependencies, so a fresh checkout can run `engine-setup setup` right away.

use crate::libs::paths::resolve_config_path;
use crate::{log_debug, log_info, log_warn};
use anyhow::Context;
use colored::Colorize;
use std::fs;
use std::path::Path;

/// The default content of `engine-setup.yaml`.
/// Premake is fetched per OS together with its license; the Vulkan SDK is only
/// checked through `VULKAN_SDK` since its installer is run by hand.
pub const CONFIG_TEMPLATE: &str = r#"http:
  user_agent: "Mozilla/5.0 (Windows NT 10.0; Win64; x64) engine-setup"
  connect_timeout_secs: 30

dependencies:
  - name: Premake
    version: "5.0.0-beta2"
    directory: Scripts/premake
    prompt: true
    artifacts:
      - os: windows
        sources:
          - https://github.com/premake/premake-core/releases/download/v{version}/premake-{version}-windows.zip
        file: premake-{version}-windows.zip
        installed: premake5.exe
      - os: linux
        sources:
          - https://github.com/premake/premake-core/releases/download/v{version}/premake-{version}-linux.tar.gz
        file: premake-{version}-linux.tar.gz
        installed: premake5
      - os: macos
        sources:
          - https://github.com/premake/premake-core/releases/download/v{version}/premake-{version}-macosx.tar.gz
        file: premake-{version}-macosx.tar.gz
        installed: premake5
    extras:
      - sources: https://raw.githubusercontent.com/premake/premake-core/master/LICENSE.txt
        file: LICENSE.txt

requirements:
  - name: Vulkan SDK
    env: VULKAN_SDK
    contains: "1.3"
"#;

/// Entry point for `engine-setup generate`.
///
/// # Arguments
/// * `config`: Where to write; defaults to `./engine-setup.yaml`.
/// * `force`: Overwrite an existing file.
pub fn run(config: Option<String>, force: bool) -> anyhow::Result<()> {
    let path = resolve_config_path(config);
    log_debug!("[Generate] Target {:?}, force={}", path, force);

    if path.exists() && !force {
        log_warn!(
            "[Generate] Skipping existing file {}. Pass --force to overwrite it.",
            path.display().to_string().yellow()
        );
        return Ok(());
    }
    write_template(&path)?;
    log_info!("[Generate] Wrote default config to {}", path.display().to_string().green());
    Ok(())
}

fn write_template(path: &Path) -> anyhow::Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent).with_context(|| format!("cannot create {}", parent.display()))?;
    }
    fs::write(path, CONFIG_TEMPLATE).with_context(|| format!("cannot write {}", path.display()))
}
