use std::cmp::Ordering;

use log::{debug, info};

use crate::error::LauncherError;
use crate::networking::NetworkClient;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UpdateStatus {
    /// No version-check URL is configured.
    NotConfigured,
    UpToDate,
    UpdateAvailable { latest_version: String },
    CheckFailed(String),
}

impl UpdateStatus {
    pub fn label(&self) -> String {
        match self {
            UpdateStatus::NotConfigured => String::new(),
            UpdateStatus::UpToDate => "Up to date".to_owned(),
            UpdateStatus::UpdateAvailable { latest_version } => {
                format!("Update available: {latest_version}")
            }
            UpdateStatus::CheckFailed(err) => format!("Update check failed: {err}"),
        }
    }
}

/// Fetch the published launcher version from `url` (a plain-text body such as
/// `v1.4.0`) and compare it with `current_version`.
///
/// # Errors
/// `NetworkError` when the request fails, `ExternalToolError` when the body
/// holds no version number.
pub async fn check_for_updates(
    network: &NetworkClient,
    url: &str,
    current_version: &str,
) -> Result<UpdateStatus, LauncherError> {
    let body = network.get_text(url).await?;
    let published = body
        .lines()
        .map(str::trim)
        .find(|line| !line.is_empty())
        .unwrap_or_default();
    if parse_version_parts(&normalize_version(published)).is_empty() {
        return Err(LauncherError::ExternalToolError(format!(
            "{url} did not return a version number"
        )));
    }
    debug!("updater: published {published}, running {current_version}");

    let latest = normalize_version(published);
    let current = normalize_version(current_version);
    if compare_versions(&latest, &current) == Ordering::Greater {
        info!("updater: version {published} is available");
        Ok(UpdateStatus::UpdateAvailable {
            latest_version: published.to_owned(),
        })
    } else {
        Ok(UpdateStatus::UpToDate)
    }
}

/// Normalize version string by removing 'v' prefix and cleaning up.
fn normalize_version(version: &str) -> String {
    version.trim().trim_start_matches(['v', 'V']).to_owned()
}

/// Compare dot-separated versions numerically; missing parts count as zero.
fn compare_versions(a: &str, b: &str) -> Ordering {
    let parts_a = parse_version_parts(a);
    let parts_b = parse_version_parts(b);
    let max_len = parts_a.len().max(parts_b.len());

    for i in 0..max_len {
        let a_part = parts_a.get(i).copied().unwrap_or(0);
        let b_part = parts_b.get(i).copied().unwrap_or(0);
        match a_part.cmp(&b_part) {
            Ordering::Equal => continue,
            other => return other,
        }
    }
    Ordering::Equal
}

/// Parse version string into parts (e.g., "0.1.5-beta" -> [0, 1, 5]).
fn parse_version_parts(version: &str) -> Vec<u32> {
    version
        .split('.')
        .map_while(|part| {
            let digits: String = part.chars().take_while(char::is_ascii_digit).collect();
            digits.parse::<u32>().ok()
        })
        .collect()
}
