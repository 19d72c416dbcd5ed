use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Parser, Subcommand, ValueEnum};
use env_logger::Env;
use log::{debug, error, info};

mod catalog;
mod cosmetics;
mod engine;
mod env;
mod error;
mod jre;
mod mods;
mod networking;
mod process;
mod settings;
mod ui;
mod updater;
mod util;

use crate::catalog::{InstallProgress, ModLoader};
use crate::engine::LauncherEngine;
use crate::env::{LauncherPaths, PathOverrides};
use crate::error::LauncherError;
use crate::process::LaunchRequest;

#[derive(Parser, Debug)]
#[command(
    name = "Kovara Launcher",
    author,
    version,
    about = "Minecraft launcher with version installs, mod downloads and cosmetics"
)]
struct Cli {
    /// Launcher data directory (settings, mods, runtimes).
    #[arg(long, global = true)]
    data_dir: Option<PathBuf>,
    /// Minecraft game directory.
    #[arg(long, global = true)]
    game_dir: Option<PathBuf>,
    /// Java executable to use instead of a managed runtime.
    #[arg(long, global = true)]
    java: Option<PathBuf>,
    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// List versions offered for install, or installed ones.
    Versions {
        #[arg(long)]
        installed: bool,
    },
    /// Install one or more versions, optionally with a mod loader.
    Install {
        #[arg(required = true)]
        versions: Vec<String>,
        #[arg(long, value_enum, default_value_t = LoaderArg::None)]
        loader: LoaderArg,
    },
    /// Launch an installed version and wait for it to exit.
    Launch {
        version: String,
        #[arg(long)]
        username: Option<String>,
        /// Mod file name from the mods directory; repeatable.
        #[arg(long = "mod")]
        mods: Vec<String>,
    },
    /// Download a mod jar into the mods directory.
    Mod { url: String },
    /// List downloaded mods.
    Mods,
    /// Upload a skin image.
    Cosmetic { path: PathBuf },
    /// Show settings, updating any values given.
    Settings {
        #[arg(long)]
        ram: Option<String>,
        #[arg(long)]
        username: Option<String>,
        #[arg(long)]
        fps_limit: Option<bool>,
        #[arg(long)]
        vsync: Option<bool>,
        #[arg(long)]
        fullscreen: Option<bool>,
    },
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
enum LoaderArg {
    None,
    Fabric,
    Quilt,
}

impl From<LoaderArg> for ModLoader {
    fn from(arg: LoaderArg) -> Self {
        match arg {
            LoaderArg::None => ModLoader::None,
            LoaderArg::Fabric => ModLoader::Fabric,
            LoaderArg::Quilt => ModLoader::Quilt,
        }
    }
}

fn main() -> ExitCode {
    env_logger::Builder::from_env(Env::default().default_filter_or("info")).init();

    let cli = Cli::parse();
    let paths = LauncherPaths::resolve(PathOverrides {
        data_dir: cli.data_dir,
        game_dir: cli.game_dir,
        java: cli.java,
    });
    debug!(
        "paths: data {}, game {}",
        paths.data_dir.display(),
        paths.game_dir.display()
    );

    match cli.command {
        Some(command) => run_cli(paths, command),
        None => run_gui(paths),
    }
}

fn run_gui(paths: LauncherPaths) -> ExitCode {
    let options = eframe::NativeOptions {
        viewport: eframe::egui::ViewportBuilder::default()
            .with_icon(app_icon())
            .with_inner_size(eframe::egui::vec2(980.0, 700.0))
            .with_min_inner_size(eframe::egui::vec2(720.0, 520.0)),
        ..Default::default()
    };
    let result = eframe::run_native(
        "Kovara Launcher",
        options,
        Box::new(|cc| Ok(Box::new(ui::LauncherApp::new(cc, paths)))),
    );
    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            error!("ui: {err}");
            ExitCode::FAILURE
        }
    }
}

fn run_cli(paths: LauncherPaths, command: Command) -> ExitCode {
    let runtime = match tokio::runtime::Runtime::new() {
        Ok(rt) => rt,
        Err(err) => {
            error!("cli: failed to create Tokio runtime: {err}");
            return ExitCode::FAILURE;
        }
    };
    match runtime.block_on(execute(paths, command)) {
        Ok(code) => code,
        Err(err) => {
            eprintln!("{err}");
            ExitCode::FAILURE
        }
    }
}

async fn execute(paths: LauncherPaths, command: Command) -> Result<ExitCode, LauncherError> {
    paths.ensure_dirs()?;
    let mut engine = LauncherEngine::new(paths);
    engine.load_settings().await;

    match command {
        Command::Versions { installed } => {
            let (available, installed_listing) = engine.listings().await;
            let listing = if installed {
                installed_listing
            } else {
                available
            };
            if let Some(err) = listing.error {
                return Err(LauncherError::NetworkError(err));
            }
            for version in listing.versions {
                println!("{version}");
            }
        }
        Command::Install { versions, loader } => {
            let progress = |p: InstallProgress| {
                debug!("install: {} {:.0}% {}", p.file, p.progress, p.speed);
            };
            let report = engine
                .install_versions(&versions, loader.into(), &progress)
                .await?;
            println!("{}", report.summary());
            if !report.is_success() {
                return Ok(ExitCode::FAILURE);
            }
        }
        Command::Launch {
            version,
            username,
            mods,
        } => {
            let request = LaunchRequest {
                version,
                username: username.unwrap_or_else(|| engine.settings().username.clone()),
                mods,
            };
            let (_, handle) = engine
                .launch(&request, |done, total, speed| {
                    debug!("java runtime: {done}/{} bytes at {speed}", total.unwrap_or_default());
                })
                .await?;
            println!("Started {} (pid {}).", request.version, handle.pid());
            let code = tokio::task::spawn_blocking(move || handle.wait())
                .await
                .unwrap_or_default();
            info!("cli: game exited with code {code:?}");
            return Ok(match code {
                Some(0) => ExitCode::SUCCESS,
                _ => ExitCode::FAILURE,
            });
        }
        Command::Mod { url } => {
            let entry = engine
                .download_mod(&url, |done, total, speed| {
                    debug!("mod: {done}/{} bytes at {speed}", total.unwrap_or_default());
                })
                .await?;
            println!("Downloaded {} to {}", entry.file_name, entry.path.display());
        }
        Command::Mods => {
            for entry in engine.mods() {
                println!(
                    "{}\t{}\t{}",
                    entry.file_name,
                    entry.size,
                    entry.modified.unwrap_or_default()
                );
            }
        }
        Command::Cosmetic { path } => {
            let dest = engine.upload_cosmetic(&path).await?;
            println!("Uploaded {} to {}", path.display(), dest.display());
        }
        Command::Settings {
            ram,
            username,
            fps_limit,
            vsync,
            fullscreen,
        } => {
            let mut record = engine.settings().clone();
            let changed = ram.is_some()
                || username.is_some()
                || fps_limit.is_some()
                || vsync.is_some()
                || fullscreen.is_some();
            if let Some(ram) = ram {
                record = record.with_ram_text(&ram)?;
            }
            if let Some(username) = username {
                record.username = username;
            }
            record.fps_limit = fps_limit.unwrap_or(record.fps_limit);
            record.vsync = vsync.unwrap_or(record.vsync);
            record.fullscreen = fullscreen.unwrap_or(record.fullscreen);
            if changed {
                engine.save_settings(record).await?;
            }
            let record = engine.settings();
            println!("ram = {}", record.ram_megabytes);
            println!("fps_limit = {}", record.fps_limit);
            println!("vsync = {}", record.vsync);
            println!("fullscreen = {}", record.fullscreen);
            println!("username = {}", record.username);
        }
    }
    Ok(ExitCode::SUCCESS)
}

fn app_icon() -> eframe::egui::IconData {
    // 2x2 grass-block colours: green top, dirt below.
    let rgba: Vec<u8> = vec![
        96, 168, 60, 255, 118, 200, 84, 255, //
        121, 85, 58, 255, 134, 96, 67, 255,
    ];
    eframe::egui::IconData {
        rgba,
        width: 2,
        height: 2,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_install_with_loader() {
        let cli = Cli::parse_from(["kovara", "install", "1.20.1", "1.19.4", "--loader", "fabric"]);
        match cli.command {
            Some(Command::Install { versions, loader }) => {
                assert_eq!(versions, vec!["1.20.1", "1.19.4"]);
                assert_eq!(ModLoader::from(loader), ModLoader::Fabric);
            }
            other => panic!("unexpected command: {other:?}"),
        }
    }

    #[test]
    fn no_subcommand_starts_gui() {
        let cli = Cli::parse_from(["kovara", "--data-dir", "/tmp/kovara"]);
        assert!(cli.command.is_none());
        assert_eq!(cli.data_dir, Some(PathBuf::from("/tmp/kovara")));
    }

    #[test]
    fn launch_collects_repeated_mods() {
        let cli = Cli::parse_from([
            "kovara", "launch", "1.20.1", "--mod", "a.jar", "--mod", "b.jar",
        ]);
        match cli.command {
            Some(Command::Launch { version, mods, .. }) => {
                assert_eq!(version, "1.20.1");
                assert_eq!(mods, vec!["a.jar", "b.jar"]);
            }
            other => panic!("unexpected command: {other:?}"),
        }
    }

    #[tokio::test]
    async fn settings_command_persists_changes() {
        let tmp = tempfile::tempdir().unwrap();
        let paths = LauncherPaths::rooted_at(tmp.path());
        let command = Command::Settings {
            ram: Some("4096".into()),
            username: Some("Steve".into()),
            fps_limit: None,
            vsync: Some(false),
            fullscreen: None,
        };
        execute(paths.clone(), command).await.unwrap();

        let mut engine = LauncherEngine::new(paths);
        let record = engine.load_settings().await;
        assert_eq!(record.ram_megabytes, 4096);
        assert_eq!(record.username, "Steve");
        assert!(!record.vsync);
    }

    #[tokio::test]
    async fn bad_ram_is_rejected() {
        let tmp = tempfile::tempdir().unwrap();
        let command = Command::Settings {
            ram: Some("lots".into()),
            username: None,
            fps_limit: None,
            vsync: None,
            fullscreen: None,
        };
        let err = execute(LauncherPaths::rooted_at(tmp.path()), command)
            .await
            .unwrap_err();
        assert!(matches!(err, LauncherError::InvalidInput(_)));
    }
}
