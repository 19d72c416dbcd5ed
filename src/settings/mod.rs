use std::path::PathBuf;

use log::{debug, info, warn};
use serde::{Deserialize, Serialize};
use tokio::fs;

use crate::error::LauncherError;
use crate::util::write_atomically;

pub const DEFAULT_RAM_MB: u32 = 2048;
pub const DEFAULT_USERNAME: &str = "Player123";

/// Persisted launcher preferences.
///
/// `ram_megabytes` is stored as text under the `ram` key so files written by
/// older launchers keep loading.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SettingsRecord {
    #[serde(rename = "ram", with = "ram_text")]
    pub ram_megabytes: u32,
    pub fps_limit: bool,
    pub vsync: bool,
    pub fullscreen: bool,
    pub username: String,
}

impl Default for SettingsRecord {
    fn default() -> Self {
        Self {
            ram_megabytes: DEFAULT_RAM_MB,
            fps_limit: true,
            vsync: false,
            fullscreen: true,
            username: DEFAULT_USERNAME.to_owned(),
        }
    }
}

impl SettingsRecord {
    /// Replace the RAM allocation with a value typed by the user.
    pub fn with_ram_text(mut self, text: &str) -> Result<Self, LauncherError> {
        self.ram_megabytes = parse_ram(text)?;
        Ok(self)
    }

    pub fn validate(&self) -> Result<(), LauncherError> {
        if self.ram_megabytes == 0 {
            return Err(LauncherError::InvalidInput(
                "RAM allocation must be a positive number of megabytes".into(),
            ));
        }
        if self.username.trim().is_empty() {
            return Err(LauncherError::InvalidInput("Enter a username.".into()));
        }
        Ok(())
    }
}

pub fn parse_ram(text: &str) -> Result<u32, LauncherError> {
    match text.trim().parse::<u32>() {
        Ok(value) if value > 0 => Ok(value),
        _ => Err(LauncherError::InvalidInput(format!(
            "RAM allocation must be a positive number of megabytes, got {:?}",
            text.trim()
        ))),
    }
}

mod ram_text {
    use serde::{Deserialize, Deserializer, Serializer, de};

    pub fn serialize<S: Serializer>(value: &u32, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&value.to_string())
    }

    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Raw {
        Text(String),
        Number(u64),
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<u32, D::Error> {
        let parsed = match Raw::deserialize(deserializer)? {
            Raw::Text(text) => text.trim().parse::<u32>().ok(),
            Raw::Number(number) => u32::try_from(number).ok(),
        };
        parsed
            .filter(|value| *value > 0)
            .ok_or_else(|| de::Error::custom("ram must be a positive integer"))
    }
}

/// Reads and writes the settings record at a fixed path.
#[derive(Clone, Debug)]
pub struct SettingsStore {
    path: PathBuf,
}

impl SettingsStore {
    pub fn new(path: PathBuf) -> Self {
        Self { path }
    }

    #[cfg(test)]
    pub fn path(&self) -> &PathBuf {
        &self.path
    }

    /// Load the record, falling back to the defaults wholesale when the file is
    /// absent or anything in it is unusable.
    pub async fn load(&self) -> SettingsRecord {
        let bytes = match fs::read(&self.path).await {
            Ok(bytes) => bytes,
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => {
                debug!("settings: {} absent, using defaults", self.path.display());
                return SettingsRecord::default();
            }
            Err(err) => {
                warn!(
                    "settings: unable to read {} ({err}); using defaults",
                    self.path.display()
                );
                return SettingsRecord::default();
            }
        };

        match serde_json::from_slice::<SettingsRecord>(&bytes) {
            Ok(record) if record.validate().is_ok() => record,
            Ok(_) => {
                warn!(
                    "settings: {} holds invalid values; using defaults",
                    self.path.display()
                );
                SettingsRecord::default()
            }
            Err(err) => {
                warn!(
                    "settings: {} is corrupt ({err}); using defaults",
                    self.path.display()
                );
                SettingsRecord::default()
            }
        }
    }

    pub async fn save(&self, record: &SettingsRecord) -> Result<(), LauncherError> {
        record.validate()?;
        let mut record = record.clone();
        record.username = record.username.trim().to_owned();
        let bytes = serde_json::to_vec_pretty(&record)
            .map_err(|e| LauncherError::IoError(format!("failed to serialize settings: {e}")))?;
        write_atomically(&self.path, &bytes).await?;
        info!("settings: saved to {}", self.path.display());
        Ok(())
    }
}
