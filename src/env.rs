use std::env;
use std::fs;
use std::path::PathBuf;

const APP_DIR_NAME: &str = "kovara-launcher";
const SETTINGS_FILE: &str = "settings.json";
const COSMETIC_FILE: &str = "skin.png";

/// Returns the root directory used by the launcher for its own data.
pub fn default_app_dir() -> PathBuf {
    let base = match env::consts::OS {
        "windows" => env::var_os("LOCALAPPDATA")
            .or_else(|| env::var_os("APPDATA"))
            .map(PathBuf::from),
        "macos" => env::var_os("HOME")
            .map(PathBuf::from)
            .map(|home| home.join("Library").join("Application Support")),
        _ => env::var_os("HOME")
            .map(PathBuf::from)
            .map(|home| home.join(".local").join("share")),
    }
    .unwrap_or_else(|| PathBuf::from("."));

    base.join(APP_DIR_NAME)
}

/// Returns the conventional game directory for the current platform.
pub fn default_game_dir() -> PathBuf {
    match env::consts::OS {
        "windows" => env::var_os("APPDATA")
            .map(PathBuf::from)
            .unwrap_or_else(|| PathBuf::from("."))
            .join(".minecraft"),
        "macos" => env::var_os("HOME")
            .map(PathBuf::from)
            .unwrap_or_else(|| PathBuf::from("."))
            .join("Library")
            .join("Application Support")
            .join("minecraft"),
        _ => env::var_os("HOME")
            .map(PathBuf::from)
            .unwrap_or_else(|| PathBuf::from("."))
            .join(".minecraft"),
    }
}

/// Values that take precedence over environment variables and platform defaults.
#[derive(Debug, Clone, Default)]
pub struct PathOverrides {
    pub data_dir: Option<PathBuf>,
    pub game_dir: Option<PathBuf>,
    pub java: Option<PathBuf>,
}

/// Filesystem layout and endpoints, resolved once at startup and handed to
/// every component that touches the disk.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LauncherPaths {
    pub data_dir: PathBuf,
    pub game_dir: PathBuf,
    pub java_override: Option<PathBuf>,
    pub update_url: Option<String>,
}

impl LauncherPaths {
    /// Resolution order: explicit overrides, `KOVARA_*` variables, platform defaults.
    pub fn resolve(overrides: PathOverrides) -> Self {
        let data_dir = overrides
            .data_dir
            .or_else(|| env::var_os("KOVARA_HOME").map(PathBuf::from))
            .unwrap_or_else(default_app_dir);
        let game_dir = overrides
            .game_dir
            .or_else(|| env::var_os("KOVARA_GAME_DIR").map(PathBuf::from))
            .unwrap_or_else(default_game_dir);
        let java_override = overrides
            .java
            .or_else(|| env::var_os("KOVARA_JAVA").map(PathBuf::from));
        let update_url = env::var("KOVARA_UPDATE_URL")
            .ok()
            .map(|url| url.trim().to_owned())
            .filter(|url| !url.is_empty());
        Self {
            data_dir,
            game_dir,
            java_override,
            update_url,
        }
    }

    /// Layout rooted at `root`, with the game directory inside it.
    #[cfg(test)]
    pub fn rooted_at(root: impl AsRef<std::path::Path>) -> Self {
        let root = root.as_ref();
        Self {
            data_dir: root.join("data"),
            game_dir: root.join("game"),
            java_override: None,
            update_url: None,
        }
    }

    pub fn settings_file(&self) -> PathBuf {
        self.data_dir.join(SETTINGS_FILE)
    }

    pub fn mods_dir(&self) -> PathBuf {
        self.data_dir.join("mods")
    }

    pub fn cosmetic_file(&self) -> PathBuf {
        self.data_dir.join("cosmetics").join(COSMETIC_FILE)
    }

    pub fn jre_dir(&self) -> PathBuf {
        self.data_dir.join("jre")
    }

    pub fn versions_dir(&self) -> PathBuf {
        self.game_dir.join("versions")
    }

    pub fn version_dir(&self, version: &str) -> PathBuf {
        self.versions_dir().join(version)
    }

    pub fn libraries_dir(&self) -> PathBuf {
        self.game_dir.join("libraries")
    }

    pub fn assets_dir(&self) -> PathBuf {
        self.game_dir.join("assets")
    }

    /// Create the launcher-owned folders. The game directory is created lazily
    /// by the first install so that a missing one can still be reported.
    pub fn ensure_dirs(&self) -> std::io::Result<()> {
        let folders = [
            self.data_dir.clone(),
            self.mods_dir(),
            self.jre_dir(),
            self.data_dir.join("cosmetics"),
        ];
        for dir in folders {
            fs::create_dir_all(dir)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn explicit_overrides_win() {
        let paths = LauncherPaths::resolve(PathOverrides {
            data_dir: Some(PathBuf::from("/tmp/kovara-data")),
            game_dir: Some(PathBuf::from("/tmp/kovara-game")),
            java: Some(PathBuf::from("/opt/java/bin/java")),
        });
        assert_eq!(paths.data_dir, PathBuf::from("/tmp/kovara-data"));
        assert_eq!(paths.game_dir, PathBuf::from("/tmp/kovara-game"));
        assert_eq!(
            paths.java_override,
            Some(PathBuf::from("/opt/java/bin/java"))
        );
        assert_eq!(
            paths.settings_file(),
            PathBuf::from("/tmp/kovara-data/settings.json")
        );
    }

    #[test]
    fn derived_layout_is_under_roots() {
        let paths = LauncherPaths::rooted_at("/srv/k");
        assert_eq!(paths.mods_dir(), PathBuf::from("/srv/k/data/mods"));
        assert_eq!(
            paths.version_dir("1.20.1"),
            PathBuf::from("/srv/k/game/versions/1.20.1")
        );
        assert_eq!(
            paths.cosmetic_file(),
            PathBuf::from("/srv/k/data/cosmetics/skin.png")
        );
    }

    #[test]
    fn ensure_dirs_creates_launcher_folders_only() {
        let tmp = tempfile::tempdir().unwrap();
        let paths = LauncherPaths::rooted_at(tmp.path());
        paths.ensure_dirs().unwrap();
        assert!(paths.mods_dir().is_dir());
        assert!(paths.jre_dir().is_dir());
        assert!(!paths.game_dir.exists());
    }
}
