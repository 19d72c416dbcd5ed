use std::path::{Path, PathBuf};

use chrono::{DateTime, Local};
use log::{info, warn};
use walkdir::WalkDir;

use crate::error::LauncherError;
use crate::networking::NetworkClient;

/// A mod file in the mods directory. The file name is its identity.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModEntry {
    pub file_name: String,
    pub path: PathBuf,
    pub size: u64,
    /// Last modification time, formatted for display.
    pub modified: Option<String>,
}

impl ModEntry {
    fn from_path(path: &Path) -> Option<Self> {
        let file_name = path.file_name()?.to_string_lossy().into_owned();
        let meta = std::fs::metadata(path).ok()?;
        let modified = meta
            .modified()
            .ok()
            .map(|time| DateTime::<Local>::from(time).format("%Y-%m-%d %H:%M").to_string());
        Some(Self {
            file_name,
            path: path.to_path_buf(),
            size: meta.len(),
            modified,
        })
    }
}

/// Derive the destination file name from a mod URL: the last path segment,
/// without query string or fragment.
pub fn file_name_from_url(url: &str) -> Result<String, LauncherError> {
    let without_fragment = url.split('#').next().unwrap_or_default();
    let without_query = without_fragment.split('?').next().unwrap_or_default();
    let after_scheme = without_query
        .split_once("://")
        .map_or(without_query, |(_, rest)| rest);
    let name = match after_scheme.split_once('/') {
        Some((_host, path)) => path.rsplit('/').next().unwrap_or_default(),
        None => "",
    };
    if name.is_empty() || name == "." || name == ".." || name.contains('\\') {
        return Err(LauncherError::InvalidInput(format!(
            "the URL {url:?} does not end in a file name"
        )));
    }
    Ok(name.to_owned())
}

#[derive(Clone)]
pub struct ModStore {
    mods_dir: PathBuf,
    network: NetworkClient,
}

impl ModStore {
    pub fn new(mods_dir: PathBuf, network: NetworkClient) -> Self {
        Self { mods_dir, network }
    }

    pub fn dir(&self) -> &Path {
        &self.mods_dir
    }

    /// Fetch a mod into the mods directory, replacing a file of the same name.
    pub async fn download<F>(&self, url: &str, progress: F) -> Result<ModEntry, LauncherError>
    where
        F: FnMut(u64, Option<u64>, &str) + Send,
    {
        let url = url.trim();
        if url.is_empty() {
            return Err(LauncherError::InvalidInput("Enter a mod URL.".into()));
        }
        let file_name = file_name_from_url(url)?;
        let dest = self.mods_dir.join(&file_name);
        if dest.exists() {
            info!("mods: replacing existing {file_name}");
        }

        self.network
            .download_to_path(url, &dest, None, progress)
            .await
            .map_err(|e| e.context(format!("downloading {file_name}")))?;
        info!("mods: downloaded {file_name} from {url}");

        ModEntry::from_path(&dest).ok_or_else(|| {
            LauncherError::IoError(format!("{} vanished after download", dest.display()))
        })
    }

    /// `.jar` files in the mods directory, sorted by name. A missing directory
    /// is an empty list.
    pub fn list(&self) -> Vec<ModEntry> {
        if !self.mods_dir.is_dir() {
            return Vec::new();
        }
        let mut entries: Vec<ModEntry> = WalkDir::new(&self.mods_dir)
            .min_depth(1)
            .max_depth(1)
            .into_iter()
            .filter_map(|entry| match entry {
                Ok(entry) => Some(entry),
                Err(err) => {
                    warn!("mods: skipping unreadable entry: {err}");
                    None
                }
            })
            .filter(|entry| entry.file_type().is_file())
            .filter(|entry| {
                entry
                    .path()
                    .extension()
                    .is_some_and(|ext| ext.eq_ignore_ascii_case("jar"))
            })
            .filter_map(|entry| ModEntry::from_path(entry.path()))
            .collect();
        entries.sort_by(|a, b| a.file_name.cmp(&b.file_name));
        entries
    }

    pub fn contains(&self, file_name: &str) -> bool {
        !file_name.is_empty()
            && Path::new(file_name).file_name().is_some_and(|n| n == file_name)
            && self.mods_dir.join(file_name).is_file()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::networking::test_server::TestServer;

    fn store(dir: &Path) -> ModStore {
        ModStore::new(dir.join("mods"), NetworkClient::new())
    }

    #[test]
    fn file_name_is_last_segment_without_query() {
        assert_eq!(
            file_name_from_url("https://cdn.example.com/files/sodium-0.5.jar?token=1#x").unwrap(),
            "sodium-0.5.jar"
        );
        assert!(file_name_from_url("https://cdn.example.com/files/").is_err());
        assert!(file_name_from_url("https://cdn.example.com").is_err());
        assert!(file_name_from_url("https://cdn.example.com/..").is_err());
    }

    #[tokio::test]
    async fn downloads_into_mods_dir_and_overwrites() {
        let server = TestServer::start().await;
        server.route("/path/name.jar", 200, b"first".to_vec());
        let tmp = tempfile::tempdir().unwrap();
        let mods = store(tmp.path());

        let entry = mods
            .download(&server.url("/path/name.jar"), |_, _, _| {})
            .await
            .unwrap();
        assert_eq!(entry.file_name, "name.jar");
        assert_eq!(entry.size, 5);
        assert!(entry.modified.is_some());

        server.route("/path/name.jar", 200, b"second".to_vec());
        mods.download(&format!("  {}  ", server.url("/path/name.jar")), |_, _, _| {})
            .await
            .unwrap();

        let listed = mods.list();
        assert_eq!(listed.len(), 1);
        assert_eq!(std::fs::read(&listed[0].path).unwrap(), b"second");
        assert!(mods.contains("name.jar"));
        assert!(!mods.contains("../name.jar"));
    }

    #[tokio::test]
    async fn empty_url_is_rejected_without_network() {
        let server = TestServer::start().await;
        let tmp = tempfile::tempdir().unwrap();
        let err = store(tmp.path())
            .download("   ", |_, _, _| {})
            .await
            .unwrap_err();
        assert!(matches!(err, LauncherError::InvalidInput(_)));
        assert_eq!(server.hits(), 0);
    }

    #[tokio::test]
    async fn failed_status_leaves_no_file() {
        let server = TestServer::start().await;
        let tmp = tempfile::tempdir().unwrap();
        let mods = store(tmp.path());
        let err = mods
            .download(&server.url("/gone/missing.jar"), |_, _, _| {})
            .await
            .unwrap_err();
        assert!(matches!(err, LauncherError::NetworkError(_)));
        assert!(err.message().contains("missing.jar"));
        assert!(mods.list().is_empty());
        assert!(!tmp.path().join("mods").join("missing.jar").exists());
    }

    #[test]
    fn list_only_reports_jars_sorted() {
        let tmp = tempfile::tempdir().unwrap();
        let mods = store(tmp.path());
        assert!(mods.list().is_empty());
        std::fs::create_dir_all(mods.dir().join("nested")).unwrap();
        std::fs::write(mods.dir().join("zeta.jar"), b"z").unwrap();
        std::fs::write(mods.dir().join("Alpha.JAR"), b"a").unwrap();
        std::fs::write(mods.dir().join("readme.txt"), b"r").unwrap();
        std::fs::write(mods.dir().join("nested").join("inner.jar"), b"i").unwrap();
        let names: Vec<String> = mods.list().into_iter().map(|m| m.file_name).collect();
        assert_eq!(names, ["Alpha.JAR", "zeta.jar"]);
    }
}
