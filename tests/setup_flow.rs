// End-to-end installs driven by a config file: fetch with fallback, unpack
// next to the download, fetch the license, then verify the installed marker.

use engine_setup::libs::config_loading::{LoadedConfig, load_setup_config};
use engine_setup::libs::dependency_installer::{DependencyInstaller, InstallOutcome};
use engine_setup::libs::errors::SetupError;
use engine_setup::libs::progress::SilentProgress;
use flate2::Compression;
use flate2::write::GzEncoder;
use std::fs;
use std::io::{Cursor, Write};
use std::path::Path;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

const PREMAKE_SCRIPT: &[u8] = b"#!/bin/sh\necho premake\n";

fn premake_tar_gz() -> Vec<u8> {
    let mut builder = tar::Builder::new(GzEncoder::new(Vec::new(), Compression::default()));
    let mut header = tar::Header::new_gnu();
    header.set_size(PREMAKE_SCRIPT.len() as u64);
    header.set_mode(0o755);
    builder.append_data(&mut header, "premake5", PREMAKE_SCRIPT).unwrap();
    builder.into_inner().unwrap().finish().unwrap()
}

fn premake_zip() -> Vec<u8> {
    let mut writer = zip::ZipWriter::new(Cursor::new(Vec::new()));
    writer
        .start_file("premake5.exe", zip::write::FileOptions::default())
        .unwrap();
    writer.write_all(b"MZ").unwrap();
    writer.finish().unwrap().into_inner()
}

async fn serve(server: &MockServer, route: &str, body: Vec<u8>) {
    Mock::given(method("GET"))
        .and(path(route))
        .respond_with(ResponseTemplate::new(200).set_body_bytes(body))
        .mount(server)
        .await;
}

fn write_config(dir: &Path, server_uri: &str) -> LoadedConfig {
    let yaml = format!(
        r#"
dependencies:
  - name: Premake
    version: "5.0.0-beta2"
    directory: Scripts/premake
    artifacts:
      - os: windows
        sources: {uri}/premake-{{version}}-windows.zip
        file: premake-{{version}}-windows.zip
        installed: premake5.exe
      - os: linux
        sources:
          - http://127.0.0.1:1/premake-{{version}}-linux.tar.gz
          - {uri}/premake-{{version}}-linux.tar.gz
        file: premake-{{version}}-linux.tar.gz
        installed: premake5
    extras:
      - sources: {uri}/LICENSE.txt
        file: LICENSE.txt
"#,
        uri = server_uri
    );
    let path = dir.join("engine-setup.yaml");
    fs::write(&path, yaml).unwrap();
    load_setup_config(&path).unwrap()
}

#[tokio::test]
async fn installs_from_the_backup_source_and_is_idempotent() {
    let server = MockServer::start().await;
    serve(&server, "/premake-5.0.0-beta2-linux.tar.gz", premake_tar_gz()).await;
    serve(&server, "/LICENSE.txt", b"BSD 3-Clause".to_vec()).await;

    let dir = tempfile::tempdir().unwrap();
    let loaded = write_config(dir.path(), &server.uri());

    let (first, second) = tokio::task::spawn_blocking(move || {
        let mut yes = |_: &str| true;
        let mut progress = SilentProgress;
        let mut installer = DependencyInstaller::new(&loaded, &mut yes, &mut progress).for_os("linux");
        let dependency = &loaded.config.dependencies[0];
        let first = installer.install(dependency).unwrap();
        let second = installer.install(dependency).unwrap();
        (first, second)
    })
    .await
    .unwrap();

    assert_eq!(first, InstallOutcome::Installed);
    assert_eq!(second, InstallOutcome::AlreadyInstalled);

    let premake_dir = dir.path().join("Scripts/premake");
    assert_eq!(fs::read(premake_dir.join("premake5")).unwrap(), PREMAKE_SCRIPT);
    assert_eq!(fs::read_to_string(premake_dir.join("LICENSE.txt")).unwrap(), "BSD 3-Clause");
    assert!(!premake_dir.join("premake-5.0.0-beta2-linux.tar.gz").exists());

    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        let mode = fs::metadata(premake_dir.join("premake5")).unwrap().permissions().mode();
        assert_eq!(mode & 0o111, 0o111);
    }
}

#[tokio::test]
async fn windows_artifact_is_a_zip() {
    let server = MockServer::start().await;
    serve(&server, "/premake-5.0.0-beta2-windows.zip", premake_zip()).await;
    serve(&server, "/LICENSE.txt", b"BSD 3-Clause".to_vec()).await;

    let dir = tempfile::tempdir().unwrap();
    let loaded = write_config(dir.path(), &server.uri());

    let summary = tokio::task::spawn_blocking(move || {
        let mut yes = |_: &str| true;
        let mut progress = SilentProgress;
        DependencyInstaller::new(&loaded, &mut yes, &mut progress)
            .for_os("windows")
            .install_all()
            .unwrap()
    })
    .await
    .unwrap();

    assert_eq!(summary.installed, vec!["Premake".to_string()]);
    assert_eq!(
        fs::read(dir.path().join("Scripts/premake/premake5.exe")).unwrap(),
        b"MZ"
    );
}

#[tokio::test]
async fn declined_prompt_downloads_nothing() {
    let server = MockServer::start().await;
    let dir = tempfile::tempdir().unwrap();
    let loaded = write_config(dir.path(), &server.uri());

    let outcome = tokio::task::spawn_blocking(move || {
        let mut no = |_: &str| false;
        let mut progress = SilentProgress;
        let mut installer = DependencyInstaller::new(&loaded, &mut no, &mut progress).for_os("linux");
        installer.install(&loaded.config.dependencies[0]).unwrap()
    })
    .await
    .unwrap();

    assert_eq!(outcome, InstallOutcome::Declined);
    assert!(!dir.path().join("Scripts").exists());
    assert!(server.received_requests().await.unwrap_or_default().is_empty());
}

#[tokio::test]
async fn archive_without_the_marker_is_reported() {
    let server = MockServer::start().await;
    // A valid archive that does not contain `premake5`.
    let mut builder = tar::Builder::new(GzEncoder::new(Vec::new(), Compression::default()));
    let mut header = tar::Header::new_gnu();
    header.set_size(5);
    header.set_mode(0o644);
    builder.append_data(&mut header, "README", &b"hello"[..]).unwrap();
    let archive = builder.into_inner().unwrap().finish().unwrap();
    serve(&server, "/premake-5.0.0-beta2-linux.tar.gz", archive).await;
    serve(&server, "/LICENSE.txt", b"BSD 3-Clause".to_vec()).await;

    let dir = tempfile::tempdir().unwrap();
    let loaded = write_config(dir.path(), &server.uri());

    let err = tokio::task::spawn_blocking(move || {
        let mut yes = |_: &str| true;
        let mut progress = SilentProgress;
        let mut installer = DependencyInstaller::new(&loaded, &mut yes, &mut progress).for_os("linux");
        installer.install(&loaded.config.dependencies[0]).unwrap_err()
    })
    .await
    .unwrap();

    assert!(matches!(err, SetupError::MarkerMissing { ref name, .. } if name == "Premake"));
}
