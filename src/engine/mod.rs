use std::path::{Path, PathBuf};
use std::sync::Arc;

use log::{debug, error, info, warn};
use tokio::sync::mpsc;

use crate::catalog::{
    self, CatalogListing, GameCatalog, InstallProgress, InstallReport, ModLoader, MojangCatalog,
    ProgressFn, VersionId,
};
use crate::cosmetics::CosmeticStore;
use crate::engine::state::{AppState, EngineEvent, FolderKind, Notification, UserAction};
use crate::env::LauncherPaths;
use crate::error::LauncherError;
use crate::jre::JreManager;
use crate::mods::{ModEntry, ModStore};
use crate::networking::NetworkClient;
use crate::process::{CommandLine, LaunchOrchestrator, LaunchRequest, ProcessHandle};
use crate::settings::{SettingsRecord, SettingsStore};
use crate::updater::{self, UpdateStatus};
use crate::util::progress_percent;

pub mod state;

pub type EventSender = mpsc::UnboundedSender<EngineEvent>;

/// Owns every launcher service and the current settings. The UI drives it with
/// [`UserAction`]s; the CLI calls the service methods directly.
pub struct LauncherEngine {
    pub state: AppState,
    paths: LauncherPaths,
    network: NetworkClient,
    settings_store: SettingsStore,
    settings: SettingsRecord,
    catalog: Arc<dyn GameCatalog>,
    mods: ModStore,
    cosmetics: CosmeticStore,
    orchestrator: LaunchOrchestrator,
}

impl LauncherEngine {
    pub fn new(paths: LauncherPaths) -> Self {
        let network = NetworkClient::new();
        let catalog: Arc<dyn GameCatalog> =
            Arc::new(MojangCatalog::new(paths.clone(), network.clone()));
        Self::with_catalog(paths, network, catalog)
    }

    pub fn with_catalog(
        paths: LauncherPaths,
        network: NetworkClient,
        catalog: Arc<dyn GameCatalog>,
    ) -> Self {
        let mods = ModStore::new(paths.mods_dir(), network.clone());
        let jre = JreManager::new(&paths, network.clone());
        let orchestrator =
            LaunchOrchestrator::new(paths.clone(), catalog.clone(), mods.clone(), jre);
        Self {
            state: AppState::Idle,
            settings_store: SettingsStore::new(paths.settings_file()),
            settings: SettingsRecord::default(),
            cosmetics: CosmeticStore::new(paths.cosmetic_file()),
            paths,
            network,
            catalog,
            mods,
            orchestrator,
        }
    }

    pub fn settings(&self) -> &SettingsRecord {
        &self.settings
    }

    pub async fn load_settings(&mut self) -> &SettingsRecord {
        self.settings = self.settings_store.load().await;
        &self.settings
    }

    pub async fn save_settings(&mut self, record: SettingsRecord) -> Result<(), LauncherError> {
        self.settings_store.save(&record).await?;
        self.settings = SettingsRecord {
            username: record.username.trim().to_owned(),
            ..record
        };
        Ok(())
    }

    /// Available and installed versions; failures are carried in the listings.
    pub async fn listings(&self) -> (CatalogListing, CatalogListing) {
        let available = catalog::list_available(self.catalog.as_ref()).await;
        let installed = catalog::list_installed(self.catalog.as_ref()).await;
        (available, installed)
    }

    pub async fn install_versions(
        &self,
        versions: &[VersionId],
        loader: ModLoader,
        progress: &ProgressFn<'_>,
    ) -> Result<InstallReport, LauncherError> {
        if versions.is_empty() {
            return Err(LauncherError::InvalidInput(
                "Select at least one version to install.".into(),
            ));
        }
        Ok(catalog::install_batch(self.catalog.as_ref(), versions, loader, progress).await)
    }

    pub async fn launch<F>(
        &self,
        request: &LaunchRequest,
        progress: F,
    ) -> Result<(CommandLine, ProcessHandle), LauncherError>
    where
        F: FnMut(u64, Option<u64>, &str) + Send,
    {
        let command = self
            .orchestrator
            .build_command(request, &self.settings, progress)
            .await?;
        let handle = self.orchestrator.launch(&command)?;
        Ok((command, handle))
    }

    pub async fn download_mod<F>(&self, url: &str, progress: F) -> Result<ModEntry, LauncherError>
    where
        F: FnMut(u64, Option<u64>, &str) + Send,
    {
        self.mods.download(url, progress).await
    }

    pub fn mods(&self) -> Vec<ModEntry> {
        self.mods.list()
    }

    pub async fn upload_cosmetic(&self, source: &Path) -> Result<PathBuf, LauncherError> {
        self.cosmetics.upload(source).await
    }

    pub async fn check_for_updates(&self) -> UpdateStatus {
        let Some(url) = self.paths.update_url.as_deref() else {
            return UpdateStatus::NotConfigured;
        };
        match updater::check_for_updates(&self.network, url, env!("CARGO_PKG_VERSION")).await {
            Ok(status) => status,
            Err(err) => {
                warn!("updater: {err}");
                UpdateStatus::CheckFailed(err.message().to_owned())
            }
        }
    }

    pub fn folder_path(&self, kind: FolderKind) -> PathBuf {
        match kind {
            FolderKind::Mods => self.mods.dir().to_path_buf(),
            FolderKind::Game => self.paths.game_dir.clone(),
            FolderKind::Data => self.paths.data_dir.clone(),
        }
    }

    fn set_state(&mut self, state: AppState, events: &EventSender) {
        self.state = state.clone();
        let _ = events.send(EngineEvent::State(state));
    }

    async fn publish_catalog(&self, events: &EventSender) {
        let (available, installed) = self.listings().await;
        let _ = events.send(EngineEvent::Catalog {
            available,
            installed,
        });
    }

    fn publish_mods(&self, events: &EventSender) {
        let _ = events.send(EngineEvent::Mods(self.mods()));
    }

    pub async fn bootstrap(&mut self, events: &EventSender) {
        info!("bootstrap: loading launcher state");
        self.set_state(AppState::Busy("Loading".into()), events);
        if let Err(err) = self.paths.ensure_dirs() {
            warn!(
                "bootstrap: unable to create {}: {err}",
                self.paths.data_dir.display()
            );
        }
        let settings = self.load_settings().await.clone();
        let _ = events.send(EngineEvent::Settings(settings));
        self.publish_mods(events);
        self.set_state(AppState::Busy("Fetching versions".into()), events);
        self.publish_catalog(events).await;
        let _ = events.send(EngineEvent::Update(self.check_for_updates().await));
        self.set_state(AppState::Idle, events);
    }

    pub async fn handle_action(&mut self, action: UserAction, events: &EventSender) {
        let title = error_title(&action);
        let result = match action {
            UserAction::Bootstrap => {
                self.bootstrap(events).await;
                return;
            }
            UserAction::RefreshVersions => {
                info!("action: RefreshVersions");
                self.set_state(AppState::Busy("Fetching versions".into()), events);
                self.publish_catalog(events).await;
                Ok(None)
            }
            UserAction::InstallVersions { versions, loader } => {
                info!("action: InstallVersions {versions:?} with loader {loader}");
                self.install_action(&versions, loader, events).await
            }
            UserAction::Launch {
                version,
                username,
                mods,
            } => {
                info!("action: Launch {version} as {username}");
                let request = LaunchRequest {
                    version,
                    username,
                    mods,
                };
                self.launch_action(&request, events).await
            }
            UserAction::SaveSettings(record) => {
                info!("action: SaveSettings");
                match self.save_settings(record).await {
                    Ok(()) => {
                        let _ = events.send(EngineEvent::Settings(self.settings.clone()));
                        Ok(Some(Notification::info("Settings", "Settings saved.")))
                    }
                    Err(err) => Err(err),
                }
            }
            UserAction::DownloadMod { url } => {
                info!("action: DownloadMod {url}");
                self.download_mod_action(&url, events).await
            }
            UserAction::RefreshMods => {
                self.publish_mods(events);
                Ok(None)
            }
            UserAction::UploadCosmetic { path } => {
                info!("action: UploadCosmetic {}", path.display());
                self.set_state(AppState::Busy("Uploading cosmetic".into()), events);
                self.upload_cosmetic(&path).await.map(|dest| {
                    Some(Notification::info(
                        "Upload",
                        format!("Cosmetic uploaded to {}", dest.display()),
                    ))
                })
            }
            UserAction::CheckForUpdates => {
                let status = self.check_for_updates().await;
                let _ = events.send(EngineEvent::Update(status));
                Ok(None)
            }
            UserAction::OpenFolder(kind) => self.open_folder(kind).map(|()| None),
        };

        match result {
            Ok(notice) => {
                if !matches!(self.state, AppState::Playing { .. }) {
                    self.set_state(AppState::Idle, events);
                }
                if let Some(notice) = notice {
                    let _ = events.send(EngineEvent::Notice(notice));
                }
            }
            Err(err) => {
                error!("{title}: {err}");
                self.set_state(AppState::Error(err.message().to_owned()), events);
                let _ = events.send(EngineEvent::Notice(Notification::error(
                    title,
                    err.message(),
                )));
            }
        }
    }

    async fn install_action(
        &mut self,
        versions: &[VersionId],
        loader: ModLoader,
        events: &EventSender,
    ) -> Result<Option<Notification>, LauncherError> {
        self.set_state(AppState::Busy("Installing".into()), events);
        let progress = |update: InstallProgress| {
            let _ = events.send(EngineEvent::State(AppState::Downloading {
                file: update.file,
                progress: update.progress,
                speed: update.speed,
            }));
        };
        let report = self.install_versions(versions, loader, &progress).await?;
        self.publish_catalog(events).await;
        let launchable = report.launchable();
        if !launchable.is_empty() {
            let _ = events.send(EngineEvent::Installed(launchable));
        }
        let summary = report.summary();
        if report.is_success() {
            Ok(Some(Notification::info("Install", summary)))
        } else {
            Ok(Some(Notification::error("Install Error", summary)))
        }
    }

    async fn launch_action(
        &mut self,
        request: &LaunchRequest,
        events: &EventSender,
    ) -> Result<Option<Notification>, LauncherError> {
        self.set_state(AppState::Busy(format!("Starting {}", request.version)), events);
        let (command, handle) = self
            .launch(request, |done, total, speed| {
                let _ = events.send(EngineEvent::State(AppState::Downloading {
                    file: "Java runtime".into(),
                    progress: progress_percent(done, total),
                    speed: speed.to_owned(),
                }));
            })
            .await?;
        debug!("launch: {}", command.argv().join(" "));
        self.set_state(
            AppState::Playing {
                version: request.version.trim().to_owned(),
                pid: handle.pid(),
            },
            events,
        );
        Ok(None)
    }

    async fn download_mod_action(
        &mut self,
        url: &str,
        events: &EventSender,
    ) -> Result<Option<Notification>, LauncherError> {
        self.set_state(AppState::Busy("Downloading mod".into()), events);
        let label = url.trim().to_owned();
        let entry = self
            .download_mod(url, |done, total, speed| {
                let _ = events.send(EngineEvent::State(AppState::Downloading {
                    file: label.clone(),
                    progress: progress_percent(done, total),
                    speed: speed.to_owned(),
                }));
            })
            .await?;
        self.publish_mods(events);
        Ok(Some(Notification::info(
            "Download",
            format!("Mod {} downloaded successfully!", entry.file_name),
        )))
    }

    fn open_folder(&self, kind: FolderKind) -> Result<(), LauncherError> {
        let path = self.folder_path(kind);
        std::fs::create_dir_all(&path)?;
        open::that(&path).map_err(|e| {
            LauncherError::IoError(format!("unable to open {}: {e}", path.display()))
        })
    }
}

fn error_title(action: &UserAction) -> &'static str {
    match action {
        UserAction::Bootstrap | UserAction::RefreshVersions => "Versions",
        UserAction::InstallVersions { .. } => "Install Error",
        UserAction::Launch { .. } => "Launch Error",
        UserAction::SaveSettings(_) => "Settings Error",
        UserAction::DownloadMod { .. } | UserAction::RefreshMods => "Download Error",
        UserAction::UploadCosmetic { .. } => "Upload Error",
        UserAction::CheckForUpdates => "Update Check",
        UserAction::OpenFolder(_) => "Open Folder",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::fake::FakeCatalog;

    fn engine_with(root: &Path, catalog: FakeCatalog) -> (LauncherEngine, Arc<FakeCatalog>) {
        let catalog = Arc::new(catalog);
        let engine = LauncherEngine::with_catalog(
            LauncherPaths::rooted_at(root),
            NetworkClient::new(),
            catalog.clone(),
        );
        (engine, catalog)
    }

    fn drain(rx: &mut mpsc::UnboundedReceiver<EngineEvent>) -> Vec<EngineEvent> {
        let mut out = Vec::new();
        while let Ok(event) = rx.try_recv() {
            out.push(event);
        }
        out
    }

    fn notices(events: &[EngineEvent]) -> Vec<Notification> {
        events
            .iter()
            .filter_map(|event| match event {
                EngineEvent::Notice(notice) => Some(notice.clone()),
                _ => None,
            })
            .collect()
    }

    #[tokio::test]
    async fn bootstrap_publishes_settings_lists_and_update_status() {
        let tmp = tempfile::tempdir().unwrap();
        let (mut engine, _) = engine_with(
            tmp.path(),
            FakeCatalog {
                available: vec!["1.20.1".into(), "1.19.4".into()],
                ..FakeCatalog::default()
            },
        );
        let (tx, mut rx) = mpsc::unbounded_channel();
        engine.handle_action(UserAction::Bootstrap, &tx).await;
        let events = drain(&mut rx);

        assert!(events.iter().any(
            |e| matches!(e, EngineEvent::Settings(s) if *s == SettingsRecord::default())
        ));
        assert!(events.iter().any(|e| matches!(
            e,
            EngineEvent::Catalog { available, .. } if available.versions == ["1.20.1", "1.19.4"]
        )));
        assert!(events.iter().any(|e| matches!(e, EngineEvent::Mods(m) if m.is_empty())));
        assert!(
            events
                .iter()
                .any(|e| matches!(e, EngineEvent::Update(UpdateStatus::NotConfigured)))
        );
        assert!(notices(&events).is_empty());
        assert_eq!(engine.state, AppState::Idle);
        assert!(tmp.path().join("data").join("mods").is_dir());
    }

    #[tokio::test]
    async fn partial_install_reports_each_failure() {
        let tmp = tempfile::tempdir().unwrap();
        let (mut engine, catalog) = engine_with(
            tmp.path(),
            FakeCatalog {
                failing: ["1.19.4".to_owned()].into(),
                ..FakeCatalog::default()
            },
        );
        let (tx, mut rx) = mpsc::unbounded_channel();
        let versions = vec!["1.20.1".into(), "1.19.4".into(), "1.18.2".into()];
        engine
            .handle_action(
                UserAction::InstallVersions {
                    versions,
                    loader: ModLoader::None,
                },
                &tx,
            )
            .await;
        let events = drain(&mut rx);
        let notices = notices(&events);

        assert_eq!(notices.len(), 1);
        assert!(notices[0].is_error());
        assert!(notices[0].body().contains("Installed 2 of 3"));
        assert!(notices[0].body().contains("1.19.4"));
        assert!(catalog.calls().contains(&"install 1.18.2".to_owned()));
        assert!(events.iter().any(|e| matches!(
            e,
            EngineEvent::Catalog { installed, .. } if installed.versions == ["1.20.1", "1.18.2"]
        )));
    }

    #[tokio::test]
    async fn install_streams_progress_and_names_launchable_versions() {
        let tmp = tempfile::tempdir().unwrap();
        let (mut engine, _) = engine_with(tmp.path(), FakeCatalog::default());
        let (tx, mut rx) = mpsc::unbounded_channel();
        engine
            .handle_action(
                UserAction::InstallVersions {
                    versions: vec!["1.20.1".into()],
                    loader: ModLoader::Fabric,
                },
                &tx,
            )
            .await;
        let events = drain(&mut rx);

        assert!(events.iter().any(|e| matches!(
            e,
            EngineEvent::State(AppState::Downloading { file, .. }) if file == "1.20.1.jar"
        )));
        assert!(events.iter().any(|e| matches!(
            e,
            EngineEvent::Installed(ids) if *ids == ["1.20.1", "fabric-1.20.1"]
        )));
        assert!(!notices(&events)[0].is_error());
        assert_eq!(engine.state, AppState::Idle);
    }

    #[tokio::test]
    async fn empty_install_selection_is_rejected() {
        let tmp = tempfile::tempdir().unwrap();
        let (mut engine, catalog) = engine_with(tmp.path(), FakeCatalog::default());
        let (tx, mut rx) = mpsc::unbounded_channel();
        engine
            .handle_action(
                UserAction::InstallVersions {
                    versions: Vec::new(),
                    loader: ModLoader::Fabric,
                },
                &tx,
            )
            .await;
        let notices = notices(&drain(&mut rx));
        assert_eq!(notices[0].title(), "Install Error");
        assert!(catalog.calls().is_empty());
        assert!(matches!(engine.state, AppState::Error(_)));
    }

    #[tokio::test]
    async fn launch_of_uninstalled_version_is_reported() {
        let tmp = tempfile::tempdir().unwrap();
        let (mut engine, catalog) = engine_with(tmp.path(), FakeCatalog::default());
        std::fs::create_dir_all(tmp.path().join("game")).unwrap();
        let (tx, mut rx) = mpsc::unbounded_channel();
        engine
            .handle_action(
                UserAction::Launch {
                    version: "1.20.1".into(),
                    username: "Steve".into(),
                    mods: Vec::new(),
                },
                &tx,
            )
            .await;
        let notices = notices(&drain(&mut rx));
        assert_eq!(notices.len(), 1);
        assert_eq!(notices[0].title(), "Launch Error");
        assert!(notices[0].body().contains("not installed"));
        assert!(catalog.calls().is_empty());
    }

    #[tokio::test]
    async fn settings_are_saved_and_republished() {
        let tmp = tempfile::tempdir().unwrap();
        let (mut engine, _) = engine_with(tmp.path(), FakeCatalog::default());
        let (tx, mut rx) = mpsc::unbounded_channel();
        let record = SettingsRecord {
            ram_megabytes: 3072,
            username: " Alex ".into(),
            ..SettingsRecord::default()
        };
        engine
            .handle_action(UserAction::SaveSettings(record), &tx)
            .await;
        let events = drain(&mut rx);
        assert!(events.iter().any(
            |e| matches!(e, EngineEvent::Settings(s) if s.username == "Alex" && s.ram_megabytes == 3072)
        ));
        assert_eq!(notices(&events)[0], Notification::info("Settings", "Settings saved."));
        assert_eq!(engine.load_settings().await.username, "Alex");
    }

    #[tokio::test]
    async fn blank_mod_url_becomes_an_error_notice() {
        let tmp = tempfile::tempdir().unwrap();
        let (mut engine, _) = engine_with(tmp.path(), FakeCatalog::default());
        let (tx, mut rx) = mpsc::unbounded_channel();
        engine
            .handle_action(UserAction::DownloadMod { url: " ".into() }, &tx)
            .await;
        let notices = notices(&drain(&mut rx));
        assert_eq!(notices.len(), 1);
        assert_eq!(notices[0].title(), "Download Error");
        assert_eq!(notices[0].body(), "Enter a mod URL.");
    }
}
