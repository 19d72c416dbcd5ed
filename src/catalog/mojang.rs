use std::collections::BTreeMap;
use std::fs::File;
use std::io;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use futures_util::{StreamExt, stream};
use log::{debug, info, warn};
use serde::Deserialize;
use tokio::fs;
use zip::read::ZipArchive;

use super::loaders::LoaderMeta;
use super::profile::{
    CommandInputs, Platform, VersionProfile, assemble_arguments, rules_allow,
};
use super::{
    GameCatalog, InstallProgress, ModLoader, ProgressFn, RuntimeCommand, RuntimeOptions,
    VersionId,
};
use crate::env::LauncherPaths;
use crate::error::LauncherError;
use crate::networking::NetworkClient;
use crate::util::{progress_percent, write_atomically};

pub const VERSION_MANIFEST_URL: &str =
    "https://piston-meta.mojang.com/mc/game/version_manifest_v2.json";
pub const RESOURCES_URL: &str = "https://resources.download.minecraft.net";
pub const FABRIC_META_URL: &str = "https://meta.fabricmc.net/v2";
pub const QUILT_META_URL: &str = "https://meta.quiltmc.org/v3";

const ASSET_CONCURRENCY: usize = 16;
const MAX_INHERITANCE_DEPTH: usize = 8;

/// Remote services the catalog talks to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CatalogEndpoints {
    pub manifest: String,
    pub resources: String,
    pub fabric_meta: String,
    pub quilt_meta: String,
}

impl Default for CatalogEndpoints {
    fn default() -> Self {
        Self {
            manifest: VERSION_MANIFEST_URL.to_owned(),
            resources: RESOURCES_URL.to_owned(),
            fabric_meta: FABRIC_META_URL.to_owned(),
            quilt_meta: QUILT_META_URL.to_owned(),
        }
    }
}

#[derive(Debug, Deserialize)]
struct VersionManifest {
    versions: Vec<ManifestEntry>,
}

#[derive(Debug, Deserialize)]
struct ManifestEntry {
    id: String,
    url: String,
}

#[derive(Debug, Deserialize)]
struct AssetIndex {
    #[serde(default)]
    objects: BTreeMap<String, AssetObject>,
}

#[derive(Debug, Deserialize)]
struct AssetObject {
    hash: String,
    size: u64,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct InstalledStub {
    #[serde(default)]
    release_time: Option<String>,
}

fn silent(_: InstallProgress) {}

async fn is_complete(dest: &Path, size: Option<u64>) -> bool {
    fs::metadata(dest)
        .await
        .map(|meta| meta.is_file() && size.is_none_or(|size| meta.len() == size))
        .unwrap_or(false)
}

/// Catalog backed by Mojang's piston-meta manifest, the Fabric and Quilt
/// metadata services and a local `.minecraft`-style game directory.
pub struct MojangCatalog {
    paths: LauncherPaths,
    network: NetworkClient,
    endpoints: CatalogEndpoints,
    platform: Platform,
}

impl MojangCatalog {
    pub fn new(paths: LauncherPaths, network: NetworkClient) -> Self {
        Self::with_endpoints(paths, network, CatalogEndpoints::default())
    }

    pub fn with_endpoints(
        paths: LauncherPaths,
        network: NetworkClient,
        endpoints: CatalogEndpoints,
    ) -> Self {
        Self {
            paths,
            network,
            endpoints,
            platform: Platform::current(),
        }
    }

    fn profile_path(&self, id: &str) -> PathBuf {
        self.paths.version_dir(id).join(format!("{id}.json"))
    }

    async fn manifest(&self) -> Result<VersionManifest, LauncherError> {
        self.network
            .get_json(&self.endpoints.manifest)
            .await
            .map_err(|e| e.context("fetching the version manifest"))
    }

    async fn fetch_file(
        &self,
        url: &str,
        dest: &Path,
        size: Option<u64>,
        label: &str,
        progress: &ProgressFn<'_>,
    ) -> Result<(), LauncherError> {
        if is_complete(dest, size).await {
            debug!("catalog: {} already present", dest.display());
            return Ok(());
        }
        self.network
            .download_to_path(url, dest, size, |done, total, speed| {
                progress(InstallProgress {
                    file: label.to_owned(),
                    progress: progress_percent(done, total),
                    speed: speed.to_owned(),
                });
            })
            .await?;
        Ok(())
    }

    /// Read an installed profile without following `inheritsFrom`.
    pub async fn load_profile(&self, id: &str) -> Result<VersionProfile, LauncherError> {
        let path = self.profile_path(id);
        let bytes = match fs::read(&path).await {
            Ok(bytes) => bytes,
            Err(err) if err.kind() == io::ErrorKind::NotFound => {
                return Err(LauncherError::NotFound(format!(
                    "version {id} is not installed"
                )));
            }
            Err(err) => {
                return Err(LauncherError::IoError(format!(
                    "unable to read {}: {err}",
                    path.display()
                )));
            }
        };
        serde_json::from_slice(&bytes).map_err(|e| {
            LauncherError::ExternalToolError(format!("profile for {id} is malformed: {e}"))
        })
    }

    /// Load a profile and fold every ancestor into it.
    pub async fn resolve_profile(&self, id: &str) -> Result<VersionProfile, LauncherError> {
        let mut profile = self.load_profile(id).await?;
        let mut depth = 0;
        while let Some(parent_id) = profile.inherits_from.clone() {
            depth += 1;
            if depth > MAX_INHERITANCE_DEPTH {
                return Err(LauncherError::ExternalToolError(format!(
                    "profile {id} has an inheritance chain deeper than {MAX_INHERITANCE_DEPTH}"
                )));
            }
            let parent = self
                .load_profile(&parent_id)
                .await
                .map_err(|e| e.context(format!("{id} inherits from {parent_id}")))?;
            profile = profile.merged_with(parent);
        }
        Ok(profile)
    }

    async fn install_client(
        &self,
        profile: &VersionProfile,
        progress: &ProgressFn<'_>,
    ) -> Result<(), LauncherError> {
        let Some(client) = profile.downloads.as_ref().and_then(|d| d.client.as_ref()) else {
            return Err(LauncherError::ExternalToolError(format!(
                "version {} has no client download",
                profile.id
            )));
        };
        let dest = self
            .paths
            .version_dir(&profile.id)
            .join(format!("{}.jar", profile.id));
        self.fetch_file(
            &client.url,
            &dest,
            client.size,
            &format!("{}.jar", profile.id),
            progress,
        )
        .await
    }

    /// Download every library the profile allows on this platform and unpack
    /// legacy natives next to the version.
    pub(crate) async fn install_libraries(
        &self,
        profile: &VersionProfile,
        progress: &ProgressFn<'_>,
    ) -> Result<(), LauncherError> {
        let libraries_dir = self.paths.libraries_dir();
        let natives_dir = self.paths.version_dir(&profile.id).join("natives");
        for library in profile
            .libraries
            .iter()
            .filter(|lib| rules_allow(&lib.rules, self.platform))
        {
            if let Some(artifact) = library.artifact() {
                let dest = libraries_dir.join(&artifact.path);
                self.fetch_file(&artifact.url, &dest, artifact.size, &library.name, progress)
                    .await?;
            }
            if let Some(native) = library.native(self.platform) {
                let dest = libraries_dir.join(&native.path);
                self.fetch_file(&native.url, &dest, native.size, &library.name, progress)
                    .await?;
                let target = natives_dir.clone();
                let excludes = library.extract_excludes();
                tokio::task::spawn_blocking(move || extract_natives(&dest, &target, &excludes))
                    .await
                    .map_err(|e| {
                        LauncherError::IoError(format!("natives extraction task failed: {e}"))
                    })??;
            }
        }
        Ok(())
    }

    async fn install_assets(
        &self,
        profile: &VersionProfile,
        progress: &ProgressFn<'_>,
    ) -> Result<(), LauncherError> {
        let Some(index_ref) = profile.asset_index.as_ref() else {
            warn!("catalog: {} declares no asset index", profile.id);
            return Ok(());
        };
        let assets_dir = self.paths.assets_dir();
        let index_path = assets_dir
            .join("indexes")
            .join(format!("{}.json", index_ref.id));
        self.fetch_file(
            &index_ref.url,
            &index_path,
            index_ref.size,
            &format!("assets/{}.json", index_ref.id),
            progress,
        )
        .await?;

        let bytes = fs::read(&index_path).await?;
        let index: AssetIndex = serde_json::from_slice(&bytes).map_err(|e| {
            LauncherError::ExternalToolError(format!(
                "asset index {} is malformed: {e}",
                index_ref.id
            ))
        })?;

        // Several names may share one object; fetch each hash once.
        let objects: BTreeMap<String, u64> = index
            .objects
            .into_values()
            .map(|object| (object.hash, object.size))
            .collect();
        let total = objects.len() as u64;
        let objects_dir = assets_dir.join("objects");
        let objects_dir = &objects_dir;
        let resources = self.endpoints.resources.trim_end_matches('/');

        let jobs = objects.into_iter().map(move |(hash, size)| async move {
            let prefix = hash.get(..2).ok_or_else(|| {
                LauncherError::ExternalToolError(format!("asset hash {hash:?} is too short"))
            })?;
            let url = format!("{resources}/{prefix}/{hash}");
            let dest = objects_dir.join(prefix).join(&hash);
            self.fetch_file(&url, &dest, Some(size), &hash, &silent).await
        });

        let mut results = stream::iter(jobs).buffer_unordered(ASSET_CONCURRENCY);
        let mut done = 0u64;
        while let Some(result) = results.next().await {
            result?;
            done += 1;
            if done % 64 == 0 || done == total {
                progress(InstallProgress {
                    file: format!("assets ({done}/{total})"),
                    progress: progress_percent(done, Some(total)),
                    speed: String::new(),
                });
            }
        }
        Ok(())
    }
}

/// Unpack a natives jar into `dest`, skipping entries under any excluded prefix.
fn extract_natives(archive: &Path, dest: &Path, excludes: &[String]) -> Result<(), LauncherError> {
    let file = File::open(archive)?;
    let mut zip = ZipArchive::new(file)?;
    std::fs::create_dir_all(dest)?;
    for i in 0..zip.len() {
        let mut entry = zip.by_index(i)?;
        if entry.is_dir() {
            continue;
        }
        let name = entry.name().to_owned();
        if excludes.iter().any(|prefix| name.starts_with(prefix.as_str())) {
            continue;
        }
        let Some(relative) = entry.enclosed_name() else {
            warn!("catalog: skipping unsafe natives entry {name}");
            continue;
        };
        let out_path = dest.join(relative);
        if let Some(parent) = out_path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let mut out = File::create(&out_path)?;
        io::copy(&mut entry, &mut out)?;
    }
    Ok(())
}

#[async_trait]
impl GameCatalog for MojangCatalog {
    async fn available_versions(&self) -> Result<Vec<VersionId>, LauncherError> {
        let manifest = self.manifest().await?;
        Ok(manifest.versions.into_iter().map(|v| v.id).collect())
    }

    async fn installed_versions(&self) -> Result<Vec<VersionId>, LauncherError> {
        let versions_dir = self.paths.versions_dir();
        let mut entries = match fs::read_dir(&versions_dir).await {
            Ok(entries) => entries,
            Err(err) if err.kind() == io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(err) => {
                return Err(LauncherError::IoError(format!(
                    "unable to read {}: {err}",
                    versions_dir.display()
                )));
            }
        };

        let mut found: Vec<(Option<String>, String)> = Vec::new();
        while let Some(entry) = entries.next_entry().await? {
            if !entry.file_type().await?.is_dir() {
                continue;
            }
            let id = entry.file_name().to_string_lossy().into_owned();
            let Ok(bytes) = fs::read(entry.path().join(format!("{id}.json"))).await else {
                continue;
            };
            let release_time = serde_json::from_slice::<InstalledStub>(&bytes)
                .ok()
                .and_then(|stub| stub.release_time);
            found.push((release_time, id));
        }
        found.sort_by(|a, b| b.cmp(a));
        Ok(found.into_iter().map(|(_, id)| id).collect())
    }

    async fn install_version(
        &self,
        version: &str,
        progress: &ProgressFn<'_>,
    ) -> Result<(), LauncherError> {
        fs::create_dir_all(&self.paths.game_dir).await.map_err(|e| {
            LauncherError::IoError(format!(
                "unable to create {}: {e}",
                self.paths.game_dir.display()
            ))
        })?;

        let manifest = self.manifest().await?;
        let entry = manifest
            .versions
            .into_iter()
            .find(|entry| entry.id == version)
            .ok_or_else(|| {
                LauncherError::NotFound(format!("version {version} is not offered by Mojang"))
            })?;

        let raw = self.network.get_text(&entry.url).await?;
        let profile: VersionProfile = serde_json::from_str(&raw).map_err(|e| {
            LauncherError::ExternalToolError(format!("profile for {version} is malformed: {e}"))
        })?;

        self.install_client(&profile, progress).await?;
        self.install_libraries(&profile, progress).await?;
        self.install_assets(&profile, progress).await?;

        // The profile goes last so a partial install is never listed.
        write_atomically(&self.profile_path(version), raw.as_bytes()).await?;
        info!("catalog: installed {version}");
        Ok(())
    }

    async fn install_loader(
        &self,
        loader: ModLoader,
        version: &str,
        progress: &ProgressFn<'_>,
    ) -> Result<VersionId, LauncherError> {
        let meta = LoaderMeta::new(loader, &self.endpoints, &self.network).ok_or_else(|| {
            LauncherError::InvalidInput("no mod loader selected".into())
        })?;
        let loader_version = meta.latest_loader(version).await?;
        let (profile, raw) = meta.profile(version, &loader_version).await?;

        self.install_libraries(&profile, progress).await?;
        write_atomically(&self.profile_path(&profile.id), raw.as_bytes()).await?;
        info!("catalog: installed {loader} {loader_version} as {}", profile.id);
        Ok(profile.id)
    }

    async fn runtime_command(
        &self,
        version: &str,
        options: &RuntimeOptions,
    ) -> Result<RuntimeCommand, LauncherError> {
        let profile = self.resolve_profile(version).await?;
        let jar_id = profile.jar_id().to_owned();
        let jar_dir = self.paths.version_dir(&jar_id);
        let inputs = CommandInputs {
            game_dir: self.paths.game_dir.clone(),
            libraries_dir: self.paths.libraries_dir(),
            assets_dir: self.paths.assets_dir(),
            natives_dir: jar_dir.join("natives"),
            client_jar: jar_dir.join(format!("{jar_id}.jar")),
            username: options.username.clone(),
            uuid: options.uuid.clone(),
            access_token: options.access_token.clone(),
        };
        let args = assemble_arguments(&profile, &inputs, self.platform)?;
        Ok(RuntimeCommand {
            executable: PathBuf::from("java"),
            args,
            java_major: profile.java_major(),
        })
    }
}

#[cfg(test)]
mod tests {
    use std::io::Write;

    use serde_json::json;

    use super::*;
    use crate::networking::test_server::TestServer;

    fn catalog_for(server: &TestServer, root: &Path) -> MojangCatalog {
        let endpoints = CatalogEndpoints {
            manifest: server.url("/manifest.json"),
            resources: server.url("/objects"),
            fabric_meta: server.url("/fabric"),
            quilt_meta: server.url("/quilt"),
        };
        MojangCatalog::with_endpoints(
            LauncherPaths::rooted_at(root),
            NetworkClient::new(),
            endpoints,
        )
    }

    fn publish_version(server: &TestServer, id: &str) {
        let manifest = json!({
            "latest": {"release": id},
            "versions": [{"id": id, "type": "release", "url": server.url(&format!("/v/{id}.json"))}]
        });
        server.route("/manifest.json", 200, manifest.to_string().into_bytes());

        let profile = json!({
            "id": id,
            "type": "release",
            "releaseTime": "2023-06-12T13:25:51+00:00",
            "mainClass": "net.minecraft.client.main.Main",
            "javaVersion": {"majorVersion": 17},
            "assetIndex": {"id": "5", "url": server.url("/index/5.json"), "size": null},
            "downloads": {"client": {"url": server.url("/client.jar"), "size": 6}},
            "arguments": {
                "game": ["--username", "${auth_player_name}", "--gameDir", "${game_directory}"],
                "jvm": ["-cp", "${classpath}"]
            },
            "libraries": [
                {"name": "com.example:lib:1.0",
                 "downloads": {"artifact": {"path": "com/example/lib/1.0/lib-1.0.jar",
                                            "url": server.url("/lib.jar"), "size": 3}}},
                {"name": "com.example:mac-only:1.0",
                 "rules": [{"action": "allow", "os": {"name": "plan9"}}],
                 "downloads": {"artifact": {"path": "mac.jar", "url": server.url("/mac.jar")}}}
            ]
        });
        server.route(
            &format!("/v/{id}.json"),
            200,
            profile.to_string().into_bytes(),
        );
        server.route("/client.jar", 200, b"client".to_vec());
        server.route("/lib.jar", 200, b"lib".to_vec());
        let index = json!({"objects": {
            "icons/a.png": {"hash": "ab0001", "size": 2},
            "icons/b.png": {"hash": "ab0001", "size": 2},
            "sounds/c.ogg": {"hash": "cd0002", "size": 3}
        }});
        server.route("/index/5.json", 200, index.to_string().into_bytes());
        server.route("/objects/ab/ab0001", 200, b"aa".to_vec());
        server.route("/objects/cd/cd0002", 200, b"ccc".to_vec());
    }

    #[tokio::test]
    async fn installs_version_files_and_lists_it() {
        let server = TestServer::start().await;
        publish_version(&server, "1.20.1");
        let tmp = tempfile::tempdir().unwrap();
        let catalog = catalog_for(&server, tmp.path());
        let game = tmp.path().join("game");

        assert_eq!(catalog.available_versions().await.unwrap(), ["1.20.1"]);
        assert!(catalog.installed_versions().await.unwrap().is_empty());

        catalog.install_version("1.20.1", &silent).await.unwrap();

        assert_eq!(
            std::fs::read(game.join("versions/1.20.1/1.20.1.jar")).unwrap(),
            b"client"
        );
        assert!(game.join("libraries/com/example/lib/1.0/lib-1.0.jar").is_file());
        assert!(!game.join("libraries/mac.jar").exists());
        assert!(game.join("assets/indexes/5.json").is_file());
        assert_eq!(
            std::fs::read(game.join("assets/objects/cd/cd0002")).unwrap(),
            b"ccc"
        );
        assert_eq!(catalog.installed_versions().await.unwrap(), ["1.20.1"]);

        // A second install finds every file complete and downloads nothing new.
        let hits = server.hits();
        catalog.install_version("1.20.1", &silent).await.unwrap();
        assert_eq!(server.hits(), hits + 2);
    }

    #[tokio::test]
    async fn unknown_version_is_not_found_and_leaves_nothing_listed() {
        let server = TestServer::start().await;
        publish_version(&server, "1.20.1");
        let tmp = tempfile::tempdir().unwrap();
        let catalog = catalog_for(&server, tmp.path());

        let err = catalog.install_version("9.9.9", &silent).await.unwrap_err();
        assert!(matches!(err, LauncherError::NotFound(_)));
        assert!(err.message().contains("9.9.9"));
        assert!(catalog.installed_versions().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn failed_asset_download_does_not_register_the_version() {
        let server = TestServer::start().await;
        publish_version(&server, "1.20.1");
        server.route("/objects/cd/cd0002", 500, Vec::new());
        let tmp = tempfile::tempdir().unwrap();
        let catalog = catalog_for(&server, tmp.path());

        let err = catalog.install_version("1.20.1", &silent).await.unwrap_err();
        assert!(matches!(err, LauncherError::NetworkError(_)));
        assert!(catalog.installed_versions().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn runtime_command_uses_installed_profile() {
        let server = TestServer::start().await;
        publish_version(&server, "1.20.1");
        let tmp = tempfile::tempdir().unwrap();
        let catalog = catalog_for(&server, tmp.path());
        catalog.install_version("1.20.1", &silent).await.unwrap();

        let options = RuntimeOptions {
            username: "Alex".into(),
            uuid: "u".into(),
            access_token: "t".into(),
        };
        let command = catalog.runtime_command("1.20.1", &options).await.unwrap();
        assert_eq!(command.java_major, Some(17));
        assert_eq!(command.args[0], "-cp");
        assert!(command.args[1].ends_with("1.20.1.jar"));
        assert_eq!(command.args[2], "net.minecraft.client.main.Main");
        assert_eq!(command.args[3..5], ["--username", "Alex"]);

        let err = catalog.runtime_command("1.8.9", &options).await.unwrap_err();
        assert!(matches!(err, LauncherError::NotFound(_)));
    }

    #[tokio::test]
    async fn installs_fabric_profile_that_inherits_the_base() {
        let server = TestServer::start().await;
        publish_version(&server, "1.20.1");
        server.route(
            "/fabric/versions/loader/1.20.1",
            200,
            json!([
                {"loader": {"version": "0.16.0-beta.1", "stable": false}},
                {"loader": {"version": "0.15.11", "stable": true}}
            ])
            .to_string()
            .into_bytes(),
        );
        let loader_profile = json!({
            "id": "fabric-loader-0.15.11-1.20.1",
            "inheritsFrom": "1.20.1",
            "releaseTime": "2024-05-01T00:00:00+00:00",
            "mainClass": "net.fabricmc.loader.impl.launch.knot.KnotClient",
            "arguments": {"game": [], "jvm": ["-DFabricMcEmu= net.minecraft.client.main.Main "]},
            "libraries": [{"name": "net.fabricmc:fabric-loader:0.15.11", "url": server.url("/maven/")}]
        });
        server.route(
            "/fabric/versions/loader/1.20.1/0.15.11/profile/json",
            200,
            loader_profile.to_string().into_bytes(),
        );
        server.route(
            "/maven/net/fabricmc/fabric-loader/0.15.11/fabric-loader-0.15.11.jar",
            200,
            b"loader".to_vec(),
        );

        let tmp = tempfile::tempdir().unwrap();
        let catalog = catalog_for(&server, tmp.path());
        catalog.install_version("1.20.1", &silent).await.unwrap();
        let id = catalog
            .install_loader(ModLoader::Fabric, "1.20.1", &silent)
            .await
            .unwrap();
        assert_eq!(id, "fabric-loader-0.15.11-1.20.1");
        assert_eq!(
            catalog.installed_versions().await.unwrap(),
            ["fabric-loader-0.15.11-1.20.1", "1.20.1"]
        );

        let options = RuntimeOptions {
            username: "Alex".into(),
            uuid: "u".into(),
            access_token: "t".into(),
        };
        let command = catalog.runtime_command(&id, &options).await.unwrap();
        assert_eq!(command.java_major, Some(17));
        assert!(command.args[1].contains("fabric-loader-0.15.11.jar"));
        assert!(command.args[1].ends_with("versions/1.20.1/1.20.1.jar"));
        assert!(
            command
                .args
                .iter()
                .any(|arg| arg == "net.fabricmc.loader.impl.launch.knot.KnotClient")
        );
    }

    #[tokio::test]
    async fn quilt_without_builds_is_an_installer_error() {
        let server = TestServer::start().await;
        server.route("/quilt/versions/loader/1.20.1", 200, b"[]".to_vec());
        let tmp = tempfile::tempdir().unwrap();
        let catalog = catalog_for(&server, tmp.path());
        let err = catalog
            .install_loader(ModLoader::Quilt, "1.20.1", &silent)
            .await
            .unwrap_err();
        assert!(matches!(err, LauncherError::ExternalToolError(_)));
        assert!(err.message().contains("1.20.1"));
    }

    #[tokio::test]
    async fn library_install_unpacks_platform_natives() {
        let server = TestServer::start().await;
        let mut jar = std::io::Cursor::new(Vec::new());
        {
            let mut writer = zip::ZipWriter::new(&mut jar);
            let options = zip::write::SimpleFileOptions::default();
            writer.start_file("liblwjgl.so", options).unwrap();
            writer.write_all(b"so").unwrap();
            writer.start_file("META-INF/MANIFEST.MF", options).unwrap();
            writer.write_all(b"mf").unwrap();
            writer.finish().unwrap();
        }
        server.route("/natives.jar", 200, jar.into_inner());
        let mut natives = serde_json::Map::new();
        natives.insert(Platform::current().os.to_owned(), json!("natives-test"));
        let profile: VersionProfile = serde_json::from_value(json!({
            "id": "1.12.2",
            "libraries": [{
                "name": "org.lwjgl:lwjgl-platform:2.9.4",
                "natives": natives,
                "extract": {"exclude": ["META-INF/"]},
                "downloads": {"classifiers": {"natives-test": {
                    "path": "org/lwjgl/lwjgl-platform-natives.jar",
                    "url": server.url("/natives.jar")
                }}}
            }]
        }))
        .unwrap();
        let tmp = tempfile::tempdir().unwrap();
        let catalog = catalog_for(&server, tmp.path());

        catalog.install_libraries(&profile, &silent).await.unwrap();

        let natives = tmp.path().join("game/versions/1.12.2/natives");
        assert_eq!(std::fs::read(natives.join("liblwjgl.so")).unwrap(), b"so");
        assert!(!natives.join("META-INF").exists());
    }

    #[test]
    fn natives_extraction_honours_excludes() {
        let tmp = tempfile::tempdir().unwrap();
        let archive = tmp.path().join("natives.jar");
        {
            let file = File::create(&archive).unwrap();
            let mut writer = zip::ZipWriter::new(file);
            let options = zip::write::SimpleFileOptions::default();
            writer.start_file("liblwjgl.so", options).unwrap();
            writer.write_all(b"so").unwrap();
            writer.start_file("META-INF/MANIFEST.MF", options).unwrap();
            writer.write_all(b"mf").unwrap();
            writer.finish().unwrap();
        }
        let dest = tmp.path().join("natives");
        extract_natives(&archive, &dest, &["META-INF/".to_owned()]).unwrap();
        assert_eq!(std::fs::read(dest.join("liblwjgl.so")).unwrap(), b"so");
        assert!(!dest.join("META-INF").exists());
    }
}
