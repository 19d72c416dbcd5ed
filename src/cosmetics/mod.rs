use std::path::{Path, PathBuf};

use log::info;
use tokio::fs;

use crate::error::LauncherError;
use crate::util::write_atomically;

const ALLOWED_EXTENSIONS: [&str; 3] = ["png", "jpg", "jpeg"];

/// Stores the single cosmetic skin image at a fixed destination.
#[derive(Clone, Debug)]
pub struct CosmeticStore {
    destination: PathBuf,
}

impl CosmeticStore {
    pub fn new(destination: PathBuf) -> Self {
        Self { destination }
    }

    #[cfg(test)]
    pub fn destination(&self) -> &Path {
        &self.destination
    }

    /// Copy `source` over the destination. The image is stored under the fixed
    /// name whatever its original format.
    pub async fn upload(&self, source: &Path) -> Result<PathBuf, LauncherError> {
        let supported = source
            .extension()
            .and_then(|ext| ext.to_str())
            .is_some_and(|ext| {
                ALLOWED_EXTENSIONS
                    .iter()
                    .any(|allowed| ext.eq_ignore_ascii_case(allowed))
            });
        if !supported {
            return Err(LauncherError::InvalidInput(format!(
                "{} is not a PNG or JPEG image",
                source.display()
            )));
        }

        let bytes = fs::read(source).await.map_err(|e| {
            LauncherError::IoError(format!("unable to read {}: {e}", source.display()))
        })?;
        write_atomically(&self.destination, &bytes).await?;
        info!(
            "cosmetics: {} uploaded to {}",
            source.display(),
            self.destination.display()
        );
        Ok(self.destination.clone())
    }
}
