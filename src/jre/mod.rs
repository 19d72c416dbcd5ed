use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use flate2::read::GzDecoder;
use log::{debug, info, warn};
use tar::Archive;
use walkdir::WalkDir;
use zip::read::ZipArchive;

use crate::env::LauncherPaths;
use crate::error::LauncherError;
use crate::networking::NetworkClient;

const ADOPTIUM_API: &str = "https://api.adoptium.net/v3/binary/latest";
/// Runtime used for profiles that do not declare a Java version.
pub const DEFAULT_JAVA_MAJOR: u32 = 8;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum ArchiveKind {
    TarGz,
    Zip,
}

impl ArchiveKind {
    fn extension(self) -> &'static str {
        match self {
            ArchiveKind::TarGz => ".tar.gz",
            ArchiveKind::Zip => ".zip",
        }
    }
}

/// Locates or provisions the Java runtime a game version needs.
///
/// An explicit executable (from `--java` or `KOVARA_JAVA`) always wins. Otherwise
/// runtimes live under `<data>/jre/<major>` and are fetched from Adoptium the
/// first time a major version is requested.
#[derive(Clone)]
pub struct JreManager {
    jre_dir: PathBuf,
    cache_dir: PathBuf,
    java_override: Option<PathBuf>,
    download_base: String,
    network: NetworkClient,
}

impl JreManager {
    pub fn new(paths: &LauncherPaths, network: NetworkClient) -> Self {
        Self {
            jre_dir: paths.jre_dir(),
            cache_dir: paths.data_dir.join("cache"),
            java_override: paths.java_override.clone(),
            download_base: ADOPTIUM_API.to_owned(),
            network,
        }
    }

    #[cfg(test)]
    fn with_download_base(mut self, base: String) -> Self {
        self.download_base = base;
        self
    }

    fn runtime_dir(&self, major: u32) -> PathBuf {
        self.jre_dir.join(major.to_string())
    }

    /// Java executable of an already provisioned runtime.
    pub fn installed_runtime(&self, major: u32) -> Option<PathBuf> {
        find_java(&self.runtime_dir(major))
    }

    pub async fn resolve_java<F>(
        &self,
        major: Option<u32>,
        progress: F,
    ) -> Result<PathBuf, LauncherError>
    where
        F: FnMut(u64, Option<u64>, &str) + Send,
    {
        if let Some(java) = &self.java_override {
            if java.is_file() {
                debug!("jre: using configured executable {}", java.display());
                return Ok(java.clone());
            }
            return Err(LauncherError::NotFound(format!(
                "configured Java executable {} does not exist",
                java.display()
            )));
        }

        let major = major.unwrap_or(DEFAULT_JAVA_MAJOR);
        if let Some(java) = self.installed_runtime(major) {
            debug!("jre: runtime {major} already present at {}", java.display());
            return Ok(java);
        }
        self.install_runtime(major, progress).await
    }

    async fn install_runtime<F>(&self, major: u32, progress: F) -> Result<PathBuf, LauncherError>
    where
        F: FnMut(u64, Option<u64>, &str) + Send,
    {
        let (os, arch, archive) = adoptium_platform();
        let url = format!(
            "{}/{major}/ga/{os}/{arch}/jre/hotspot/normal/eclipse",
            self.download_base.trim_end_matches('/')
        );
        info!("jre: downloading Java {major} for {os}/{arch}");

        let archive_path = self
            .cache_dir
            .join(format!("jre-{major}{}", archive.extension()));
        self.network
            .download_to_path(&url, &archive_path, None, progress)
            .await
            .map_err(|e| e.context(format!("Java {major} runtime")))?;

        let target = self.runtime_dir(major);
        let staging = self.jre_dir.join(format!("{major}.staging"));
        let unpack_target = staging.clone();
        let unpack_archive = archive_path.clone();
        tokio::task::spawn_blocking(move || {
            if unpack_target.exists() {
                fs::remove_dir_all(&unpack_target)?;
            }
            fs::create_dir_all(&unpack_target)?;
            extract_archive(&unpack_archive, &unpack_target, archive)
        })
        .await
        .map_err(|e| LauncherError::IoError(format!("runtime extraction task failed: {e}")))??;

        if target.exists() {
            fs::remove_dir_all(&target)?;
        }
        fs::rename(&staging, &target)?;
        if let Err(err) = fs::remove_file(&archive_path) {
            warn!("jre: unable to remove {}: {err}", archive_path.display());
        }

        let java = find_java(&target).ok_or_else(|| {
            LauncherError::NotFound(format!(
                "no java executable inside the downloaded Java {major} runtime"
            ))
        })?;
        info!("jre: Java {major} ready at {}", java.display());
        Ok(java)
    }
}

fn java_file_name() -> &'static str {
    if cfg!(target_os = "windows") {
        "java.exe"
    } else {
        "java"
    }
}

/// Find `bin/java` anywhere below `dir`. Archives nest the runtime one or two
/// levels deep (`jdk-17.0.9+9-jre/bin`, `Contents/Home/bin` on macOS).
pub fn find_java(dir: &Path) -> Option<PathBuf> {
    WalkDir::new(dir)
        .max_depth(5)
        .into_iter()
        .filter_map(Result::ok)
        .filter(|entry| entry.file_type().is_file())
        .find(|entry| {
            entry.file_name() == java_file_name()
                && entry
                    .path()
                    .parent()
                    .and_then(Path::file_name)
                    .is_some_and(|parent| parent == "bin")
        })
        .map(walkdir::DirEntry::into_path)
}

fn extract_archive(archive: &Path, dest: &Path, kind: ArchiveKind) -> Result<(), LauncherError> {
    info!("jre: extracting {} as {:?}", archive.display(), kind);
    match kind {
        ArchiveKind::TarGz => extract_targz(archive, dest),
        ArchiveKind::Zip => extract_zip(archive, dest),
    }
}

fn extract_targz(archive: &Path, dest: &Path) -> Result<(), LauncherError> {
    let file = fs::File::open(archive)?;
    let mut archive = Archive::new(GzDecoder::new(file));
    archive
        .unpack(dest)
        .map_err(|e| LauncherError::IoError(format!("tar.gz extract error: {e}")))
}

fn extract_zip(archive: &Path, dest: &Path) -> Result<(), LauncherError> {
    let file = fs::File::open(archive)?;
    let mut archive = ZipArchive::new(file)?;
    for i in 0..archive.len() {
        let mut entry = archive.by_index(i)?;
        let Some(relative) = entry.enclosed_name() else {
            continue;
        };
        let out_path = dest.join(relative);
        if entry.is_dir() {
            fs::create_dir_all(&out_path)?;
            continue;
        }
        if let Some(parent) = out_path.parent() {
            fs::create_dir_all(parent)?;
        }
        let mut out_file = fs::File::create(&out_path)?;
        io::copy(&mut entry, &mut out_file)?;
        #[cfg(unix)]
        if let Some(mode) = entry.unix_mode() {
            use std::os::unix::fs::PermissionsExt;
            fs::set_permissions(&out_path, fs::Permissions::from_mode(mode))?;
        }
    }
    Ok(())
}

fn adoptium_platform() -> (&'static str, &'static str, ArchiveKind) {
    let os = if cfg!(target_os = "windows") {
        "windows"
    } else if cfg!(target_os = "macos") {
        "mac"
    } else {
        "linux"
    };

    let arch = if cfg!(target_arch = "x86_64") {
        "x64"
    } else if cfg!(target_arch = "aarch64") {
        "aarch64"
    } else if cfg!(target_arch = "x86") {
        "x86"
    } else {
        std::env::consts::ARCH
    };

    let archive = if cfg!(target_os = "windows") {
        ArchiveKind::Zip
    } else {
        ArchiveKind::TarGz
    };

    (os, arch, archive)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn manager(root: &Path) -> JreManager {
        JreManager::new(&LauncherPaths::rooted_at(root), NetworkClient::new())
    }

    fn fake_runtime(dir: &Path) -> PathBuf {
        let bin = dir.join("jdk-17.0.9+9-jre").join("bin");
        fs::create_dir_all(&bin).unwrap();
        let java = bin.join(java_file_name());
        fs::write(&java, b"#!/bin/sh\n").unwrap();
        java
    }

    #[test]
    fn finds_nested_java_binary() {
        let tmp = tempfile::tempdir().unwrap();
        fs::create_dir_all(tmp.path().join("legal")).unwrap();
        let java = fake_runtime(tmp.path());
        assert_eq!(find_java(tmp.path()), Some(java));
        assert_eq!(find_java(&tmp.path().join("missing")), None);
    }

    #[tokio::test]
    async fn override_must_exist() {
        let tmp = tempfile::tempdir().unwrap();
        let mut paths = LauncherPaths::rooted_at(tmp.path());
        paths.java_override = Some(tmp.path().join("nope").join("java"));
        let jre = JreManager::new(&paths, NetworkClient::new());
        let err = jre.resolve_java(Some(17), |_, _, _| {}).await.unwrap_err();
        assert!(matches!(err, LauncherError::NotFound(_)));

        let java = tmp.path().join("java");
        fs::write(&java, b"").unwrap();
        paths.java_override = Some(java.clone());
        let jre = JreManager::new(&paths, NetworkClient::new());
        assert_eq!(jre.resolve_java(Some(17), |_, _, _| {}).await.unwrap(), java);
    }

    #[tokio::test]
    async fn provisioned_runtime_is_reused_per_major() {
        let tmp = tempfile::tempdir().unwrap();
        let jre = manager(tmp.path());
        let java = fake_runtime(&tmp.path().join("data").join("jre").join("17"));
        assert_eq!(jre.resolve_java(Some(17), |_, _, _| {}).await.unwrap(), java);
        assert_eq!(jre.installed_runtime(21), None);
    }

    #[cfg(not(windows))]
    #[tokio::test]
    async fn downloads_and_unpacks_missing_runtime() {
        use flate2::Compression;
        use flate2::write::GzEncoder;

        use crate::networking::test_server::TestServer;

        let mut bytes = Vec::new();
        {
            let encoder = GzEncoder::new(&mut bytes, Compression::fast());
            let mut builder = tar::Builder::new(encoder);
            let body = b"#!/bin/sh\n";
            let mut header = tar::Header::new_gnu();
            header.set_size(body.len() as u64);
            header.set_mode(0o755);
            header.set_cksum();
            builder
                .append_data(&mut header, "jdk-8u402-jre/bin/java", &body[..])
                .unwrap();
            builder.into_inner().unwrap().finish().unwrap();
        }

        let server = TestServer::start().await;
        let (os, arch, _) = adoptium_platform();
        server.route(
            &format!("/binary/8/ga/{os}/{arch}/jre/hotspot/normal/eclipse"),
            200,
            bytes,
        );

        let tmp = tempfile::tempdir().unwrap();
        let jre = manager(tmp.path()).with_download_base(server.url("/binary"));
        let java = jre.resolve_java(None, |_, _, _| {}).await.unwrap();
        assert!(java.ends_with("8/jdk-8u402-jre/bin/java"));
        assert!(!tmp.path().join("data/jre/8.staging").exists());
        assert!(!tmp.path().join("data/cache/jre-8.tar.gz").exists());

        // Second resolution is served from disk.
        let hits = server.hits();
        assert_eq!(jre.resolve_java(Some(8), |_, _, _| {}).await.unwrap(), java);
        assert_eq!(server.hits(), hits);
    }
}
