use std::fmt;

/// Failure categories surfaced by every launcher operation.
///
/// Each variant carries a human-readable message that already names the
/// object involved (version id, URL, path), so callers can show it as-is.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LauncherError {
    /// Missing username, empty URL, unsupported file type and similar.
    InvalidInput(String),
    /// Version, mod, directory or executable missing on disk or in a catalog.
    NotFound(String),
    /// Transport failure, timeout or non-success HTTP status.
    NetworkError(String),
    /// The catalog or a mod-loader installer could not complete a step.
    ExternalToolError(String),
    IoError(String),
    /// The game process could not be started.
    SpawnError(String),
}

impl LauncherError {
    pub fn kind(&self) -> &'static str {
        match self {
            LauncherError::InvalidInput(_) => "invalid input",
            LauncherError::NotFound(_) => "not found",
            LauncherError::NetworkError(_) => "network error",
            LauncherError::ExternalToolError(_) => "installer error",
            LauncherError::IoError(_) => "I/O error",
            LauncherError::SpawnError(_) => "spawn error",
        }
    }

    pub fn message(&self) -> &str {
        match self {
            LauncherError::InvalidInput(msg)
            | LauncherError::NotFound(msg)
            | LauncherError::NetworkError(msg)
            | LauncherError::ExternalToolError(msg)
            | LauncherError::IoError(msg)
            | LauncherError::SpawnError(msg) => msg,
        }
    }

    /// Prefix the message with some context, keeping the variant.
    #[must_use]
    pub fn context(self, context: impl fmt::Display) -> Self {
        let wrap = |msg: String| format!("{context}: {msg}");
        match self {
            LauncherError::InvalidInput(msg) => LauncherError::InvalidInput(wrap(msg)),
            LauncherError::NotFound(msg) => LauncherError::NotFound(wrap(msg)),
            LauncherError::NetworkError(msg) => LauncherError::NetworkError(wrap(msg)),
            LauncherError::ExternalToolError(msg) => LauncherError::ExternalToolError(wrap(msg)),
            LauncherError::IoError(msg) => LauncherError::IoError(wrap(msg)),
            LauncherError::SpawnError(msg) => LauncherError::SpawnError(wrap(msg)),
        }
    }
}

impl fmt::Display for LauncherError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.kind(), self.message())
    }
}

impl std::error::Error for LauncherError {}

impl From<std::io::Error> for LauncherError {
    fn from(error: std::io::Error) -> Self {
        if error.kind() == std::io::ErrorKind::NotFound {
            return LauncherError::NotFound(error.to_string());
        }
        LauncherError::IoError(error.to_string())
    }
}

impl From<reqwest::Error> for LauncherError {
    fn from(error: reqwest::Error) -> Self {
        LauncherError::NetworkError(error.to_string())
    }
}

impl From<serde_json::Error> for LauncherError {
    fn from(error: serde_json::Error) -> Self {
        LauncherError::ExternalToolError(format!("malformed JSON: {error}"))
    }
}

impl From<zip::result::ZipError> for LauncherError {
    fn from(error: zip::result::ZipError) -> Self {
        LauncherError::IoError(format!("archive error: {error}"))
    }
}
