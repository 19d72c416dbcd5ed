//! Version profile documents (`versions/<id>/<id>.json`) and the rules used to
//! turn them into a runtime command line.

use std::collections::{HashMap, HashSet};
use std::path::{Path, PathBuf};

use serde::Deserialize;

use crate::error::LauncherError;

const MOJANG_LIBRARIES: &str = "https://libraries.minecraft.net/";

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VersionProfile {
    pub id: String,
    #[serde(default)]
    pub inherits_from: Option<String>,
    #[serde(default)]
    pub main_class: Option<String>,
    #[serde(default, rename = "type")]
    pub kind: Option<String>,
    #[serde(default)]
    pub release_time: Option<String>,
    #[serde(default)]
    pub minecraft_arguments: Option<String>,
    #[serde(default)]
    pub arguments: Option<Arguments>,
    #[serde(default)]
    pub libraries: Vec<Library>,
    #[serde(default)]
    pub asset_index: Option<AssetIndexRef>,
    #[serde(default)]
    pub assets: Option<String>,
    #[serde(default)]
    pub downloads: Option<VersionDownloads>,
    #[serde(default)]
    pub java_version: Option<JavaVersion>,
    #[serde(default)]
    pub jar: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct Arguments {
    #[serde(default)]
    pub game: Vec<Argument>,
    #[serde(default)]
    pub jvm: Vec<Argument>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum Argument {
    Plain(String),
    Conditional { rules: Vec<Rule>, value: ArgValue },
}

#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum ArgValue {
    One(String),
    Many(Vec<String>),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RuleAction {
    Allow,
    Disallow,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Rule {
    pub action: RuleAction,
    #[serde(default)]
    pub os: Option<OsRule>,
    #[serde(default)]
    pub features: Option<HashMap<String, bool>>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct OsRule {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub arch: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct Library {
    pub name: String,
    #[serde(default)]
    pub downloads: Option<LibraryDownloads>,
    /// Maven repository base used by loader profiles that omit `downloads`.
    #[serde(default)]
    pub url: Option<String>,
    #[serde(default)]
    pub rules: Vec<Rule>,
    #[serde(default)]
    pub natives: Option<HashMap<String, String>>,
    #[serde(default)]
    pub extract: Option<ExtractRules>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct LibraryDownloads {
    #[serde(default)]
    pub artifact: Option<Artifact>,
    #[serde(default)]
    pub classifiers: HashMap<String, Artifact>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ExtractRules {
    #[serde(default)]
    pub exclude: Vec<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct Artifact {
    #[serde(default)]
    pub path: Option<String>,
    pub url: String,
    #[serde(default)]
    pub size: Option<u64>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AssetIndexRef {
    pub id: String,
    pub url: String,
    #[serde(default)]
    pub size: Option<u64>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct VersionDownloads {
    #[serde(default)]
    pub client: Option<Artifact>,
}

#[derive(Debug, Clone, Copy, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct JavaVersion {
    pub major_version: u32,
}

/// Operating system and architecture names as they appear in profile rules.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Platform {
    pub os: &'static str,
    pub arch: &'static str,
}

impl Platform {
    pub fn current() -> Self {
        let os = if cfg!(target_os = "windows") {
            "windows"
        } else if cfg!(target_os = "macos") {
            "osx"
        } else {
            "linux"
        };
        let arch = if cfg!(target_arch = "x86") {
            "x86"
        } else if cfg!(target_arch = "aarch64") {
            "arm64"
        } else {
            "x86_64"
        };
        Self { os, arch }
    }

    pub fn classpath_separator(self) -> &'static str {
        if self.os == "windows" { ";" } else { ":" }
    }

    fn pointer_width(self) -> &'static str {
        if self.arch == "x86" { "32" } else { "64" }
    }
}

impl Rule {
    fn matches(&self, platform: Platform) -> bool {
        if let Some(os) = &self.os {
            if let Some(name) = &os.name
                && name != platform.os
            {
                return false;
            }
            if let Some(arch) = &os.arch
                && arch != platform.arch
            {
                return false;
            }
        }
        // No optional features (demo mode, custom resolution, quick play) are
        // ever enabled, so a rule that requires one never applies.
        match &self.features {
            Some(features) => features.values().all(|required| !required),
            None => true,
        }
    }
}

/// The last matching rule decides; an empty rule list allows.
pub fn rules_allow(rules: &[Rule], platform: Platform) -> bool {
    if rules.is_empty() {
        return true;
    }
    let mut allowed = false;
    for rule in rules {
        if rule.matches(platform) {
            allowed = rule.action == RuleAction::Allow;
        }
    }
    allowed
}

/// Convert a Maven coordinate (`group:artifact:version[:classifier][@ext]`) to a
/// repository-relative path.
pub fn maven_path(coord: &str) -> Option<String> {
    let coord = coord.trim();
    let (left, ext) = match coord.split_once('@') {
        Some((left, ext)) if !ext.is_empty() => (left, ext),
        _ => (coord, "jar"),
    };
    let parts: Vec<&str> = left.split(':').collect();
    if parts.len() < 3 || parts[..3].iter().any(|part| part.is_empty()) {
        return None;
    }
    let (group, artifact, version) = (parts[0], parts[1], parts[2]);
    let file_name = match parts.get(3).filter(|c| !c.is_empty()) {
        Some(classifier) => format!("{artifact}-{version}-{classifier}.{ext}"),
        None => format!("{artifact}-{version}.{ext}"),
    };
    Some(format!(
        "{}/{artifact}/{version}/{file_name}",
        group.replace('.', "/")
    ))
}

fn join_url(base: &str, path: &str) -> String {
    format!(
        "{}/{}",
        base.trim_end_matches('/'),
        path.trim_start_matches('/')
    )
}

/// A file a library contributes, relative to the libraries directory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LibraryFile {
    pub path: String,
    pub url: String,
    pub size: Option<u64>,
}

impl Library {
    /// Main jar of the library, if it has one.
    pub fn artifact(&self) -> Option<LibraryFile> {
        if let Some(artifact) = self.downloads.as_ref().and_then(|d| d.artifact.as_ref()) {
            let path = artifact.path.clone().or_else(|| maven_path(&self.name))?;
            return Some(LibraryFile {
                path,
                url: artifact.url.clone(),
                size: artifact.size,
            });
        }
        if self.natives.is_some() && self.downloads.is_some() {
            return None;
        }
        let path = maven_path(&self.name)?;
        let base = self.url.as_deref().unwrap_or(MOJANG_LIBRARIES);
        Some(LibraryFile {
            url: join_url(base, &path),
            path,
            size: None,
        })
    }

    /// Platform natives archive for legacy profiles that use `natives` maps.
    pub fn native(&self, platform: Platform) -> Option<LibraryFile> {
        let classifier = self
            .natives
            .as_ref()?
            .get(platform.os)?
            .replace("${arch}", platform.pointer_width());
        let artifact = self.downloads.as_ref()?.classifiers.get(&classifier)?;
        let path = artifact
            .path
            .clone()
            .or_else(|| maven_path(&format!("{}:{classifier}", self.name)))?;
        Some(LibraryFile {
            path,
            url: artifact.url.clone(),
            size: artifact.size,
        })
    }

    pub fn extract_excludes(&self) -> Vec<String> {
        self.extract
            .as_ref()
            .map(|e| e.exclude.clone())
            .unwrap_or_default()
    }

    /// `group:artifact[:classifier]`, used to let a child profile replace a
    /// library its parent also declares.
    fn identity(&self) -> String {
        let left = self.name.split('@').next().unwrap_or(&self.name);
        let parts: Vec<&str> = left.split(':').collect();
        match parts.as_slice() {
            [group, artifact, _version, classifier, ..] => {
                format!("{group}:{artifact}:{classifier}")
            }
            [group, artifact, ..] => format!("{group}:{artifact}"),
            _ => left.to_owned(),
        }
    }
}

impl VersionProfile {
    pub fn java_major(&self) -> Option<u32> {
        self.java_version.map(|java| java.major_version)
    }

    /// Id of the version whose client jar (and natives) this profile runs on.
    pub fn jar_id(&self) -> &str {
        self.jar.as_deref().unwrap_or(&self.id)
    }

    pub fn asset_index_name(&self) -> &str {
        self.asset_index
            .as_ref()
            .map(|index| index.id.as_str())
            .or(self.assets.as_deref())
            .unwrap_or("legacy")
    }

    /// Fold `parent` into `self`, the child profile. Child values win, library
    /// lists are concatenated child-first without duplicate identities, and
    /// argument lists are concatenated parent-first.
    #[must_use]
    pub fn merged_with(self, parent: VersionProfile) -> VersionProfile {
        let mut seen = HashSet::new();
        let libraries = self
            .libraries
            .into_iter()
            .chain(parent.libraries)
            .filter(|lib| seen.insert(lib.identity()))
            .collect();

        let arguments = match (parent.arguments, self.arguments) {
            (None, None) => None,
            (Some(args), None) | (None, Some(args)) => Some(args),
            (Some(mut base), Some(child)) => {
                base.game.extend(child.game);
                base.jvm.extend(child.jvm);
                Some(base)
            }
        };

        let jar = self.jar.or(parent.jar).or_else(|| Some(parent.id.clone()));
        VersionProfile {
            id: self.id,
            inherits_from: parent.inherits_from,
            main_class: self.main_class.or(parent.main_class),
            kind: self.kind.or(parent.kind),
            release_time: self.release_time.or(parent.release_time),
            minecraft_arguments: self.minecraft_arguments.or(parent.minecraft_arguments),
            arguments,
            libraries,
            asset_index: self.asset_index.or(parent.asset_index),
            assets: self.assets.or(parent.assets),
            downloads: self.downloads.or(parent.downloads),
            java_version: self.java_version.or(parent.java_version),
            jar,
        }
    }
}

/// Everything outside the profile that the command line refers to.
#[derive(Debug, Clone)]
pub struct CommandInputs {
    pub game_dir: PathBuf,
    pub libraries_dir: PathBuf,
    pub assets_dir: PathBuf,
    pub natives_dir: PathBuf,
    pub client_jar: PathBuf,
    pub username: String,
    pub uuid: String,
    pub access_token: String,
}

fn path_text(path: &Path) -> String {
    path.to_string_lossy().into_owned()
}

/// Replace `${name}` placeholders; unknown names are left verbatim.
pub fn substitute(template: &str, vars: &HashMap<&str, String>) -> String {
    let mut out = String::with_capacity(template.len());
    let mut rest = template;
    while let Some(start) = rest.find("${") {
        out.push_str(&rest[..start]);
        let after = &rest[start + 2..];
        match after.find('}') {
            Some(end) => {
                let key = &after[..end];
                match vars.get(key) {
                    Some(value) => out.push_str(value),
                    None => {
                        out.push_str("${");
                        out.push_str(key);
                        out.push('}');
                    }
                }
                rest = &after[end + 1..];
            }
            None => {
                out.push_str(&rest[start..]);
                rest = "";
            }
        }
    }
    out.push_str(rest);
    out
}

fn expand(arguments: &[Argument], platform: Platform) -> Vec<String> {
    let mut out = Vec::new();
    for argument in arguments {
        match argument {
            Argument::Plain(value) => out.push(value.clone()),
            Argument::Conditional { rules, value } if rules_allow(rules, platform) => match value {
                ArgValue::One(value) => out.push(value.clone()),
                ArgValue::Many(values) => out.extend(values.iter().cloned()),
            },
            Argument::Conditional { .. } => {}
        }
    }
    out
}

/// Classpath entries for a fully merged profile, client jar last.
pub fn classpath(profile: &VersionProfile, inputs: &CommandInputs, platform: Platform) -> Vec<PathBuf> {
    let mut entries: Vec<PathBuf> = profile
        .libraries
        .iter()
        .filter(|lib| rules_allow(&lib.rules, platform))
        .filter_map(Library::artifact)
        .map(|file| inputs.libraries_dir.join(file.path))
        .collect();
    entries.push(inputs.client_jar.clone());
    entries
}

/// Build `[main_class-ready argv]` for a fully merged profile: JVM arguments,
/// main class, then game arguments. The Java executable is not included.
pub fn assemble_arguments(
    profile: &VersionProfile,
    inputs: &CommandInputs,
    platform: Platform,
) -> Result<Vec<String>, LauncherError> {
    let main_class = profile.main_class.as_deref().ok_or_else(|| {
        LauncherError::ExternalToolError(format!("profile {} has no main class", profile.id))
    })?;

    let separator = platform.classpath_separator();
    let classpath = classpath(profile, inputs, platform)
        .iter()
        .map(|path| path_text(path))
        .collect::<Vec<_>>()
        .join(separator);

    let vars: HashMap<&str, String> = HashMap::from([
        ("auth_player_name", inputs.username.clone()),
        ("version_name", profile.id.clone()),
        ("game_directory", path_text(&inputs.game_dir)),
        ("assets_root", path_text(&inputs.assets_dir)),
        ("game_assets", path_text(&inputs.assets_dir)),
        ("assets_index_name", profile.asset_index_name().to_owned()),
        ("auth_uuid", inputs.uuid.clone()),
        ("auth_access_token", inputs.access_token.clone()),
        ("auth_session", inputs.access_token.clone()),
        ("auth_xuid", "0".to_owned()),
        ("clientid", "0".to_owned()),
        ("user_type", "legacy".to_owned()),
        ("user_properties", "{}".to_owned()),
        (
            "version_type",
            profile.kind.clone().unwrap_or_else(|| "release".to_owned()),
        ),
        ("natives_directory", path_text(&inputs.natives_dir)),
        ("library_directory", path_text(&inputs.libraries_dir)),
        ("classpath_separator", separator.to_owned()),
        ("launcher_name", env!("CARGO_PKG_NAME").to_owned()),
        ("launcher_version", env!("CARGO_PKG_VERSION").to_owned()),
        ("classpath", classpath),
    ]);

    let legacy_game = profile.minecraft_arguments.as_deref().map(|line| {
        line.split_whitespace()
            .map(str::to_owned)
            .collect::<Vec<_>>()
    });
    let (jvm_templates, game_templates) = match (&profile.arguments, legacy_game) {
        // A loader profile with modern arguments layered over a legacy parent.
        (Some(arguments), Some(mut game)) => {
            let mut jvm = legacy_jvm_arguments();
            jvm.extend(expand(&arguments.jvm, platform));
            game.extend(expand(&arguments.game, platform));
            (jvm, game)
        }
        (Some(arguments), None) if !arguments.jvm.is_empty() || !arguments.game.is_empty() => {
            let mut jvm = expand(&arguments.jvm, platform);
            if jvm.is_empty() {
                jvm = legacy_jvm_arguments();
            }
            (jvm, expand(&arguments.game, platform))
        }
        (_, game) => (legacy_jvm_arguments(), game.unwrap_or_default()),
    };

    let mut argv: Vec<String> = jvm_templates
        .iter()
        .map(|template| substitute(template, &vars))
        .collect();
    argv.push(main_class.to_owned());
    argv.extend(game_templates.iter().map(|template| substitute(template, &vars)));
    Ok(argv)
}

fn legacy_jvm_arguments() -> Vec<String> {
    vec![
        "-Djava.library.path=${natives_directory}".to_owned(),
        "-cp".to_owned(),
        "${classpath}".to_owned(),
    ]
}
