use std::path::PathBuf;

use crate::catalog::{CatalogListing, ModLoader, VersionId};
use crate::mods::ModEntry;
use crate::settings::SettingsRecord;
use crate::updater::UpdateStatus;

// What the launcher is doing right now, as shown by the UI.
#[derive(Clone, Debug, PartialEq)]
pub enum AppState {
    Idle,
    Busy(String),
    Downloading {
        file: String,
        progress: f32,
        speed: String,
    },
    Playing {
        version: String,
        pid: u32,
    },
    Error(String),
}

impl AppState {
    pub fn is_busy(&self) -> bool {
        matches!(self, AppState::Busy(_) | AppState::Downloading { .. })
    }
}

/// Message surfaced to the user in a dialog.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Notification {
    Info { title: String, body: String },
    Error { title: String, body: String },
}

impl Notification {
    pub fn info(title: impl Into<String>, body: impl Into<String>) -> Self {
        Notification::Info {
            title: title.into(),
            body: body.into(),
        }
    }

    pub fn error(title: impl Into<String>, body: impl Into<String>) -> Self {
        Notification::Error {
            title: title.into(),
            body: body.into(),
        }
    }

    pub fn title(&self) -> &str {
        match self {
            Notification::Info { title, .. } | Notification::Error { title, .. } => title,
        }
    }

    pub fn body(&self) -> &str {
        match self {
            Notification::Info { body, .. } | Notification::Error { body, .. } => body,
        }
    }

    pub fn is_error(&self) -> bool {
        matches!(self, Notification::Error { .. })
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum FolderKind {
    Mods,
    Game,
    Data,
}

// Actions triggered by the user from the UI layer.
#[derive(Clone, Debug)]
pub enum UserAction {
    Bootstrap,
    RefreshVersions,
    InstallVersions {
        versions: Vec<VersionId>,
        loader: ModLoader,
    },
    Launch {
        version: VersionId,
        username: String,
        mods: Vec<String>,
    },
    SaveSettings(SettingsRecord),
    DownloadMod {
        url: String,
    },
    RefreshMods,
    UploadCosmetic {
        path: PathBuf,
    },
    CheckForUpdates,
    OpenFolder(FolderKind),
}

// Everything the engine publishes back to the UI.
#[derive(Clone, Debug)]
pub enum EngineEvent {
    State(AppState),
    Notice(Notification),
    Catalog {
        available: CatalogListing,
        installed: CatalogListing,
    },
    /// Versions that became launchable in the last install, loader ids included.
    Installed(Vec<VersionId>),
    Mods(Vec<ModEntry>),
    Settings(SettingsRecord),
    Update(UpdateStatus),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn only_running_work_counts_as_busy() {
        assert!(AppState::Busy("Installing".into()).is_busy());
        assert!(
            AppState::Downloading {
                file: "1.20.1.jar".into(),
                progress: 40.0,
                speed: "1.0 MB/s".into(),
            }
            .is_busy()
        );
        assert!(!AppState::Idle.is_busy());
        assert!(!AppState::Error("offline".into()).is_busy());
        assert!(
            !AppState::Playing {
                version: "1.20.1".into(),
                pid: 42,
            }
            .is_busy()
        );
    }
}
