//! Fabric and Quilt metadata services. Both expose the same layout:
//! `versions/loader/<game>` lists loader builds and
//! `versions/loader/<game>/<loader>/profile/json` returns a launcher profile
//! that inherits from the base game version.

use log::debug;
use serde::Deserialize;

use super::ModLoader;
use super::mojang::CatalogEndpoints;
use super::profile::VersionProfile;
use crate::error::LauncherError;
use crate::networking::NetworkClient;

#[derive(Debug, Clone, Deserialize)]
pub struct LoaderBuild {
    pub loader: LoaderInfo,
}

#[derive(Debug, Clone, Deserialize)]
pub struct LoaderInfo {
    pub version: String,
    /// Fabric marks releases explicitly; Quilt omits the flag.
    #[serde(default)]
    pub stable: Option<bool>,
}

/// Pick the newest stable build. Builds are listed newest first.
pub fn pick_loader(builds: &[LoaderBuild]) -> Option<&str> {
    builds
        .iter()
        .find(|build| build.loader.stable == Some(true))
        .or_else(|| {
            builds
                .iter()
                .find(|build| build.loader.stable.is_none() && !build.loader.version.contains('-'))
        })
        .or_else(|| builds.first())
        .map(|build| build.loader.version.as_str())
}

pub struct LoaderMeta<'a> {
    loader: ModLoader,
    base_url: &'a str,
    network: &'a NetworkClient,
}

impl<'a> LoaderMeta<'a> {
    /// `None` for [`ModLoader::None`].
    pub fn new(
        loader: ModLoader,
        endpoints: &'a CatalogEndpoints,
        network: &'a NetworkClient,
    ) -> Option<Self> {
        let base_url = match loader {
            ModLoader::None => return None,
            ModLoader::Fabric => endpoints.fabric_meta.as_str(),
            ModLoader::Quilt => endpoints.quilt_meta.as_str(),
        };
        Some(Self {
            loader,
            base_url: base_url.trim_end_matches('/'),
            network,
        })
    }

    pub async fn latest_loader(&self, game_version: &str) -> Result<String, LauncherError> {
        let url = format!("{}/versions/loader/{game_version}", self.base_url);
        let builds: Vec<LoaderBuild> = self
            .network
            .get_json(&url)
            .await
            .map_err(|e| e.context(format!("{} for {game_version}", self.loader)))?;
        let picked = pick_loader(&builds).ok_or_else(|| {
            LauncherError::ExternalToolError(format!(
                "{} has no loader build for Minecraft {game_version}",
                self.loader
            ))
        })?;
        debug!("loader: {} {picked} selected for {game_version}", self.loader);
        Ok(picked.to_owned())
    }

    /// Fetch the launcher profile, returning it parsed and as the raw text that
    /// gets written into the versions directory.
    pub async fn profile(
        &self,
        game_version: &str,
        loader_version: &str,
    ) -> Result<(VersionProfile, String), LauncherError> {
        let url = format!(
            "{}/versions/loader/{game_version}/{loader_version}/profile/json",
            self.base_url
        );
        let raw = self.network.get_text(&url).await?;
        let profile: VersionProfile = serde_json::from_str(&raw).map_err(|e| {
            LauncherError::ExternalToolError(format!(
                "{} profile for {game_version} is malformed: {e}",
                self.loader
            ))
        })?;
        if profile.id.trim().is_empty() {
            return Err(LauncherError::ExternalToolError(format!(
                "{} profile for {game_version} has no id",
                self.loader
            )));
        }
        Ok((profile, raw))
    }
}
