//! Game version catalog: what can be installed, what is installed, how to
//! install it and how to run it.
//!
//! [`GameCatalog`] is the seam between the launcher and the Minecraft
//! distribution network. [`mojang::MojangCatalog`] is the production
//! implementation; the free functions in this module adapt any catalog into
//! listings and batch reports that never abort part-way.

pub mod loaders;
pub mod mojang;
pub mod profile;

use std::fmt;
use std::path::PathBuf;

use async_trait::async_trait;
use log::{info, warn};

use crate::error::LauncherError;

pub use mojang::MojangCatalog;

pub type VersionId = String;

/// Callback receiving install progress. Implementations must be cheap; they
/// are called from download loops.
pub type ProgressFn<'a> = dyn Fn(InstallProgress) + Send + Sync + 'a;

#[derive(Debug, Clone, PartialEq)]
pub struct InstallProgress {
    pub file: String,
    pub progress: f32,
    pub speed: String,
}

/// Optional mod loader installed on top of a base version.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ModLoader {
    #[default]
    None,
    Fabric,
    Quilt,
}

impl ModLoader {
    pub const ALL: [ModLoader; 3] = [ModLoader::None, ModLoader::Fabric, ModLoader::Quilt];

    pub fn label(self) -> &'static str {
        match self {
            ModLoader::None => "None",
            ModLoader::Fabric => "Fabric",
            ModLoader::Quilt => "Quilt",
        }
    }
}

impl fmt::Display for ModLoader {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Identity values substituted into the runtime command.
#[derive(Debug, Clone)]
pub struct RuntimeOptions {
    pub username: String,
    pub uuid: String,
    pub access_token: String,
}

/// Command line as produced by the catalog. `args` excludes the executable.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RuntimeCommand {
    pub executable: PathBuf,
    pub args: Vec<String>,
    pub java_major: Option<u32>,
}

#[async_trait]
pub trait GameCatalog: Send + Sync {
    /// Every version the distribution network offers, newest first.
    async fn available_versions(&self) -> Result<Vec<VersionId>, LauncherError>;

    /// Versions present in the local game directory.
    async fn installed_versions(&self) -> Result<Vec<VersionId>, LauncherError>;

    async fn install_version(
        &self,
        version: &str,
        progress: &ProgressFn<'_>,
    ) -> Result<(), LauncherError>;

    /// Install `loader` for the base `version` and return the id of the
    /// resulting launchable version.
    async fn install_loader(
        &self,
        loader: ModLoader,
        version: &str,
        progress: &ProgressFn<'_>,
    ) -> Result<VersionId, LauncherError>;

    async fn runtime_command(
        &self,
        version: &str,
        options: &RuntimeOptions,
    ) -> Result<RuntimeCommand, LauncherError>;
}

/// A version list together with the reason it may be empty.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CatalogListing {
    pub versions: Vec<VersionId>,
    pub error: Option<String>,
}

impl CatalogListing {
    fn from_result(what: &str, result: Result<Vec<VersionId>, LauncherError>) -> Self {
        match result {
            Ok(versions) => Self {
                versions,
                error: None,
            },
            Err(err) => {
                warn!("catalog: unable to list {what} versions: {err}");
                Self {
                    versions: Vec::new(),
                    error: Some(err.to_string()),
                }
            }
        }
    }
}

pub async fn list_available(catalog: &dyn GameCatalog) -> CatalogListing {
    CatalogListing::from_result("available", catalog.available_versions().await)
}

pub async fn list_installed(catalog: &dyn GameCatalog) -> CatalogListing {
    CatalogListing::from_result("installed", catalog.installed_versions().await)
}

/// Result of installing one requested version.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InstallOutcome {
    pub version: VersionId,
    pub base: Result<(), String>,
    /// Loader step, absent when no loader was requested.
    pub loader: Option<(ModLoader, Result<VersionId, String>)>,
}

impl InstallOutcome {
    pub fn succeeded(&self) -> bool {
        self.base.is_ok() && self.loader.as_ref().is_none_or(|(_, result)| result.is_ok())
    }

    /// Human readable lines describing each failed step.
    pub fn failure_messages(&self) -> Vec<String> {
        let mut out = Vec::new();
        if let Err(err) = &self.base {
            out.push(format!("{}: {err}", self.version));
        }
        if let Some((loader, Err(err))) = &self.loader {
            out.push(format!("{} ({loader}): {err}", self.version));
        }
        out
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct InstallReport {
    pub outcomes: Vec<InstallOutcome>,
}

impl InstallReport {
    pub fn successes(&self) -> impl Iterator<Item = &InstallOutcome> {
        self.outcomes.iter().filter(|o| o.succeeded())
    }

    pub fn failures(&self) -> impl Iterator<Item = &InstallOutcome> {
        self.outcomes.iter().filter(|o| !o.succeeded())
    }

    pub fn is_success(&self) -> bool {
        self.outcomes.iter().all(InstallOutcome::succeeded)
    }

    /// Ids that became launchable, loader versions included.
    pub fn launchable(&self) -> Vec<VersionId> {
        let mut ids = Vec::new();
        for outcome in &self.outcomes {
            if outcome.base.is_ok() {
                ids.push(outcome.version.clone());
            }
            if let Some((_, Ok(id))) = &outcome.loader {
                ids.push(id.clone());
            }
        }
        ids
    }

    pub fn summary(&self) -> String {
        let failures: Vec<String> = self
            .failures()
            .flat_map(InstallOutcome::failure_messages)
            .collect();
        let ok = self.successes().count();
        if failures.is_empty() {
            format!("Installed {ok} version(s).")
        } else {
            format!(
                "Installed {ok} of {} version(s).\n{}",
                self.outcomes.len(),
                failures.join("\n")
            )
        }
    }
}

/// Install each version, then the loader for it when one is requested. A
/// failure in any step is recorded and the remaining steps still run.
pub async fn install_batch(
    catalog: &dyn GameCatalog,
    versions: &[VersionId],
    loader: ModLoader,
    progress: &ProgressFn<'_>,
) -> InstallReport {
    let mut report = InstallReport::default();
    for version in versions {
        info!("catalog: installing {version}");
        let base = catalog
            .install_version(version, progress)
            .await
            .map_err(|err| {
                warn!("catalog: install of {version} failed: {err}");
                err.to_string()
            });

        let loader_result = if loader == ModLoader::None {
            None
        } else {
            let result = catalog
                .install_loader(loader, version, progress)
                .await
                .map_err(|err| {
                    warn!("catalog: {loader} install for {version} failed: {err}");
                    err.to_string()
                });
            Some((loader, result))
        };

        report.outcomes.push(InstallOutcome {
            version: version.clone(),
            base,
            loader: loader_result,
        });
    }
    report
}


#[cfg(test)]
mod tests {
    use std::sync::Mutex;

    use super::fake::FakeCatalog;
    use super::*;

    fn ignore(_: InstallProgress) {}

    fn ids(list: &[&str]) -> Vec<VersionId> {
        list.iter().map(|s| (*s).to_owned()).collect()
    }

    #[tokio::test]
    async fn failed_version_does_not_stop_the_batch() {
        let catalog = FakeCatalog {
            failing: ["1.19.4".to_owned()].into(),
            ..FakeCatalog::default()
        };
        let report = install_batch(
            &catalog,
            &ids(&["1.20.1", "1.19.4", "1.18.2"]),
            ModLoader::None,
            &ignore,
        )
        .await;

        assert_eq!(report.outcomes.len(), 3);
        assert_eq!(report.successes().count(), 2);
        let failures: Vec<_> = report.failures().collect();
        assert_eq!(failures.len(), 1);
        assert_eq!(failures[0].version, "1.19.4");
        assert!(report.summary().contains("1.19.4"));
        assert_eq!(
            catalog.calls(),
            ["install 1.20.1", "install 1.19.4", "install 1.18.2"]
        );
    }

    #[tokio::test]
    async fn loader_is_attempted_even_when_base_fails() {
        let catalog = FakeCatalog {
            failing: ["1.20.1".to_owned()].into(),
            failing_loaders: ["1.19.4".to_owned()].into(),
            ..FakeCatalog::default()
        };
        let report = install_batch(
            &catalog,
            &ids(&["1.20.1", "1.19.4"]),
            ModLoader::Fabric,
            &ignore,
        )
        .await;

        assert_eq!(
            catalog.calls(),
            [
                "install 1.20.1",
                "loader Fabric 1.20.1",
                "install 1.19.4",
                "loader Fabric 1.19.4"
            ]
        );
        assert!(!report.is_success());
        assert_eq!(
            report.outcomes[0].loader,
            Some((ModLoader::Fabric, Ok("fabric-1.20.1".to_owned())))
        );
        assert_eq!(report.launchable(), ["fabric-1.20.1", "1.19.4"]);
        let messages = report.outcomes[1].failure_messages();
        assert_eq!(messages.len(), 1);
        assert!(messages[0].starts_with("1.19.4 (Fabric)"));
    }

    #[tokio::test]
    async fn progress_is_forwarded() {
        let catalog = FakeCatalog::default();
        let seen = Mutex::new(Vec::new());
        let sink = |p: InstallProgress| seen.lock().unwrap().push(p.file);
        let report = install_batch(&catalog, &ids(&["1.20.1"]), ModLoader::None, &sink).await;
        assert!(report.is_success());
        assert_eq!(report.summary(), "Installed 1 version(s).");
        assert_eq!(*seen.lock().unwrap(), ["1.20.1.jar"]);
    }

    #[tokio::test]
    async fn listing_surfaces_errors_instead_of_hiding_them() {
        let catalog = FakeCatalog {
            available_error: Some("offline".into()),
            ..FakeCatalog::default()
        };
        let listing = list_available(&catalog).await;
        assert!(listing.versions.is_empty());
        assert!(listing.error.as_deref().unwrap().contains("offline"));

        let installed = list_installed(&catalog).await;
        assert_eq!(installed, CatalogListing::default());
    }
}
