use std::path::{Path, PathBuf};

use tokio::fs;

use crate::error::LauncherError;

/// Render a human-friendly transfer speed string.
#[must_use]
pub fn format_speed(bytes_per_sec: f32) -> String {
    const KIB: f32 = 1024.0;
    const MIB: f32 = KIB * 1024.0;

    if bytes_per_sec < KIB {
        format!("{bytes_per_sec:.0} B/s")
    } else if bytes_per_sec < MIB {
        format!("{:.1} KB/s", bytes_per_sec / KIB)
    } else {
        format!("{:.1} MB/s", bytes_per_sec / MIB)
    }
}

/// Compute download progress as a percentage.
#[must_use]
pub fn progress_percent(downloaded: u64, total: Option<u64>) -> f32 {
    match total {
        Some(total) if total > 0 => (downloaded as f32 / total as f32) * 100.0,
        _ => 0.0,
    }
}

/// Sibling path used while a file is being written.
#[must_use]
pub fn partial_path(dest: &Path) -> PathBuf {
    let mut name = dest
        .file_name()
        .map(|name| name.to_os_string())
        .unwrap_or_default();
    name.push(".part");
    dest.with_file_name(name)
}

/// Write `bytes` next to `dest` and rename over it, so readers never observe a
/// half-written file.
pub async fn write_atomically(dest: &Path, bytes: &[u8]) -> Result<(), LauncherError> {
    if let Some(parent) = dest.parent() {
        fs::create_dir_all(parent).await.map_err(|e| {
            LauncherError::IoError(format!("unable to create {}: {e}", parent.display()))
        })?;
    }
    let tmp = partial_path(dest);
    if let Err(err) = fs::write(&tmp, bytes).await {
        let _ = fs::remove_file(&tmp).await;
        return Err(LauncherError::IoError(format!(
            "unable to write {}: {err}",
            dest.display()
        )));
    }
    if let Err(err) = fs::rename(&tmp, dest).await {
        let _ = fs::remove_file(&tmp).await;
        return Err(LauncherError::IoError(format!(
            "unable to replace {}: {err}",
            dest.display()
        )));
    }
    Ok(())
}
