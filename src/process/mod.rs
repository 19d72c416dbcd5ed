use std::io::{BufRead, BufReader, Read};
use std::path::PathBuf;
use std::process::{Child, Command, Stdio};
use std::sync::{Arc, mpsc};
use std::thread;

use log::{debug, info, warn};
use sysinfo::System;

use crate::catalog::{GameCatalog, RuntimeOptions};
use crate::env::LauncherPaths;
use crate::error::LauncherError;
use crate::jre::JreManager;
use crate::mods::ModStore;
use crate::settings::SettingsRecord;

/// Offline identity handed to the game; there is no account sign-in.
pub const PLACEHOLDER_UUID: &str = "00000000-0000-0000-0000-000000000000";
pub const PLACEHOLDER_ACCESS_TOKEN: &str = "offline";

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LaunchRequest {
    pub version: String,
    pub username: String,
    /// Mod file names selected in the mods directory.
    pub mods: Vec<String>,
}

/// Fully resolved process invocation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandLine {
    pub program: PathBuf,
    pub args: Vec<String>,
    pub working_dir: PathBuf,
}

impl CommandLine {
    /// Program and arguments as one vector, program first.
    pub fn argv(&self) -> Vec<String> {
        let mut argv = Vec::with_capacity(self.args.len() + 1);
        argv.push(self.program.to_string_lossy().into_owned());
        argv.extend(self.args.iter().cloned());
        argv
    }
}

/// A started game process. Output is forwarded to the log.
#[derive(Debug)]
pub struct ProcessHandle {
    pid: u32,
    exit: mpsc::Receiver<Option<i32>>,
}

impl ProcessHandle {
    pub fn pid(&self) -> u32 {
        self.pid
    }

    /// Block until the game exits and return its exit code, if it had one.
    pub fn wait(self) -> Option<i32> {
        self.exit.recv().ok().flatten()
    }
}

/// JVM flags derived from the settings record, in launch order.
pub fn java_flags(settings: &SettingsRecord) -> Vec<String> {
    let ram = settings.ram_megabytes;
    let mut flags = vec![format!("-Xmx{ram}M"), format!("-Xms{ram}M")];
    if settings.fps_limit {
        flags.push("-Dfml.noDisplay=true".to_owned());
    }
    if settings.vsync {
        flags.push("-Dvsync=true".to_owned());
    }
    if settings.fullscreen {
        flags.push("-Dfullscreen=true".to_owned());
    }
    flags
}

fn physical_memory_mb() -> Option<u64> {
    let mut system = System::new();
    system.refresh_memory();
    match system.total_memory() {
        0 => None,
        bytes => Some(bytes / (1024 * 1024)),
    }
}

#[derive(Clone)]
pub struct LaunchOrchestrator {
    paths: LauncherPaths,
    catalog: Arc<dyn GameCatalog>,
    mods: ModStore,
    jre: JreManager,
}

impl LaunchOrchestrator {
    pub fn new(
        paths: LauncherPaths,
        catalog: Arc<dyn GameCatalog>,
        mods: ModStore,
        jre: JreManager,
    ) -> Self {
        Self {
            paths,
            catalog,
            mods,
            jre,
        }
    }

    /// Validate the request and assemble the process invocation. Nothing is
    /// spawned; a missing Java runtime may be downloaded.
    pub async fn build_command<F>(
        &self,
        request: &LaunchRequest,
        settings: &SettingsRecord,
        progress: F,
    ) -> Result<CommandLine, LauncherError>
    where
        F: FnMut(u64, Option<u64>, &str) + Send,
    {
        let version = request.version.trim();
        if version.is_empty() {
            return Err(LauncherError::InvalidInput("Select a version to launch.".into()));
        }
        let username = request.username.trim();
        if username.is_empty() {
            return Err(LauncherError::InvalidInput("Enter a username.".into()));
        }
        if !self.paths.game_dir.is_dir() {
            return Err(LauncherError::NotFound(format!(
                "game directory {} does not exist; install a version first",
                self.paths.game_dir.display()
            )));
        }
        if !self.paths.version_dir(version).is_dir() {
            return Err(LauncherError::NotFound(format!(
                "version {version} is not installed"
            )));
        }
        if let Some(missing) = request.mods.iter().find(|name| !self.mods.contains(name)) {
            return Err(LauncherError::NotFound(format!("mod file {missing} is missing")));
        }
        if !request.mods.is_empty() {
            debug!(
                "launch: {} mod(s) selected: {}",
                request.mods.len(),
                request.mods.join(", ")
            );
        }

        let options = RuntimeOptions {
            username: username.to_owned(),
            uuid: PLACEHOLDER_UUID.to_owned(),
            access_token: PLACEHOLDER_ACCESS_TOKEN.to_owned(),
        };
        let runtime = self
            .catalog
            .runtime_command(version, &options)
            .await
            .map_err(|e| e.context(format!("preparing {version}")))?;
        let java = self.jre.resolve_java(runtime.java_major, progress).await?;

        if let Some(total) = physical_memory_mb()
            && u64::from(settings.ram_megabytes) > total
        {
            warn!(
                "launch: {} MB requested but only {total} MB of physical memory",
                settings.ram_megabytes
            );
        }

        let mut args = java_flags(settings);
        args.extend(runtime.args);
        Ok(CommandLine {
            program: java,
            args,
            working_dir: self.paths.game_dir.clone(),
        })
    }

    /// Start the game. Returns once the process is running.
    pub fn launch(&self, command: &CommandLine) -> Result<ProcessHandle, LauncherError> {
        debug!("launch: {}", command.argv().join(" "));
        let mut cmd = Command::new(&command.program);
        cmd.args(&command.args)
            .current_dir(&command.working_dir)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped());

        #[cfg(target_os = "windows")]
        {
            use std::os::windows::process::CommandExt;
            // CREATE_NO_WINDOW
            cmd.creation_flags(0x08000000);
        }

        let mut child = cmd.spawn().map_err(|e| {
            LauncherError::SpawnError(format!(
                "failed to start {}: {e}",
                command.program.display()
            ))
        })?;
        let pid = child.id();
        if let Some(stdout) = child.stdout.take() {
            forward_output(stdout, "stdout");
        }
        if let Some(stderr) = child.stderr.take() {
            forward_output(stderr, "stderr");
        }
        let (tx, exit) = mpsc::channel();
        reap(child, tx);
        info!("launch: process {pid} started");
        Ok(ProcessHandle { pid, exit })
    }
}

fn forward_output<R: Read + Send + 'static>(stream: R, name: &'static str) {
    thread::spawn(move || {
        for line in BufReader::new(stream).lines() {
            match line {
                Ok(line) => info!(target: "game", "[{name}] {line}"),
                Err(_) => break,
            }
        }
    });
}

fn reap(mut child: Child, exit: mpsc::Sender<Option<i32>>) {
    thread::spawn(move || {
        let code = match child.wait() {
            Ok(status) => {
                info!("launch: game exited with {status}");
                status.code()
            }
            Err(err) => {
                warn!("launch: unable to wait for game process: {err}");
                None
            }
        };
        let _ = exit.send(code);
    });
}
