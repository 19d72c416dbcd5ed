use std::path::Path;
use std::time::{Duration, Instant};

use futures_util::StreamExt;
use log::{debug, warn};
use reqwest::Client;
use serde::de::DeserializeOwned;
use tokio::fs::{self, File};
use tokio::io::AsyncWriteExt;

use crate::error::LauncherError;
use crate::util::{format_speed, partial_path};

#[cfg(test)]
pub mod test_server;

const USER_AGENT: &str = concat!("kovara-launcher/", env!("CARGO_PKG_VERSION"));

/// Shared HTTP client. Cloning is cheap and reuses the connection pool.
#[derive(Clone)]
pub struct NetworkClient {
    client: Client,
}

impl NetworkClient {
    pub fn new() -> Self {
        let client = Client::builder()
            .connect_timeout(Duration::from_secs(15))
            .read_timeout(Duration::from_secs(30))
            .user_agent(USER_AGENT)
            .build()
            .unwrap_or_else(|err| {
                warn!("network client: falling back to default HTTP client configuration ({err})");
                Client::new()
            });
        Self { client }
    }

    async fn get(&self, url: &str) -> Result<reqwest::Response, LauncherError> {
        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| LauncherError::NetworkError(format!("GET {url} failed: {e}")))?;
        let status = response.status();
        if !status.is_success() {
            return Err(LauncherError::NetworkError(format!(
                "GET {url} returned {status}"
            )));
        }
        Ok(response)
    }

    pub async fn get_text(&self, url: &str) -> Result<String, LauncherError> {
        self.get(url)
            .await?
            .text()
            .await
            .map_err(|e| LauncherError::NetworkError(format!("reading {url} failed: {e}")))
    }

    pub async fn get_json<T: DeserializeOwned>(&self, url: &str) -> Result<T, LauncherError> {
        let body = self
            .get(url)
            .await?
            .bytes()
            .await
            .map_err(|e| LauncherError::NetworkError(format!("reading {url} failed: {e}")))?;
        serde_json::from_slice(&body).map_err(|e| {
            LauncherError::ExternalToolError(format!("unexpected response from {url}: {e}"))
        })
    }

    /// Download a file to `dest`, calling `progress` with (downloaded, total, speed_text).
    ///
    /// The body is streamed into a `.part` sibling which is renamed over `dest`
    /// only after the transfer completed; on any failure the partial file is
    /// removed and `dest` is left as it was.
    pub async fn download_to_path<F>(
        &self,
        url: &str,
        dest: &Path,
        expected_size: Option<u64>,
        mut progress: F,
    ) -> Result<u64, LauncherError>
    where
        F: FnMut(u64, Option<u64>, &str) + Send,
    {
        let response = self.get(url).await?;

        if let Some(parent) = dest.parent() {
            fs::create_dir_all(parent).await.map_err(|e| {
                LauncherError::IoError(format!("failed to create {}: {e}", parent.display()))
            })?;
        }

        let tmp = partial_path(dest);
        let total = response.content_length().or(expected_size);
        let result = stream_body(response, &tmp, total, &mut progress).await;
        let downloaded = match result {
            Ok(downloaded) => downloaded,
            Err(err) => {
                let _ = fs::remove_file(&tmp).await;
                return Err(err);
            }
        };

        if let Some(total) = total
            && downloaded < total
        {
            let _ = fs::remove_file(&tmp).await;
            return Err(LauncherError::NetworkError(format!(
                "download of {url} incomplete: received {downloaded} of {total} bytes"
            )));
        }

        if let Err(e) = fs::rename(&tmp, dest).await {
            let _ = fs::remove_file(&tmp).await;
            return Err(LauncherError::IoError(format!(
                "failed to move download into {}: {e}",
                dest.display()
            )));
        }
        debug!("download: {} -> {} ({downloaded} bytes)", url, dest.display());
        Ok(downloaded)
    }
}

impl Default for NetworkClient {
    fn default() -> Self {
        Self::new()
    }
}

async fn stream_body<F>(
    response: reqwest::Response,
    tmp: &Path,
    total: Option<u64>,
    progress: &mut F,
) -> Result<u64, LauncherError>
where
    F: FnMut(u64, Option<u64>, &str) + Send,
{
    let mut file = File::create(tmp)
        .await
        .map_err(|e| LauncherError::IoError(format!("failed to create {}: {e}", tmp.display())))?;

    let mut stream = response.bytes_stream();
    let mut downloaded: u64 = 0;
    let mut last_tick = Instant::now();
    let mut last_bytes = 0u64;

    while let Some(chunk) = stream.next().await {
        let chunk =
            chunk.map_err(|e| LauncherError::NetworkError(format!("stream error: {e}")))?;
        file.write_all(&chunk)
            .await
            .map_err(|e| LauncherError::IoError(format!("write error: {e}")))?;
        downloaded += chunk.len() as u64;

        let since = last_tick.elapsed().as_secs_f32();
        if since > 0.2 {
            let speed = (downloaded - last_bytes) as f32 / since;
            progress(downloaded, total, &format_speed(speed));
            last_tick = Instant::now();
            last_bytes = downloaded;
        }
    }

    // Final callback.
    progress(downloaded, total, "0 B/s");

    file.flush()
        .await
        .map_err(|e| LauncherError::IoError(format!("flush error: {e}")))?;
    Ok(downloaded)
}

#[cfg(test)]
mod tests {
    use super::test_server::TestServer;
    use super::*;

    #[tokio::test]
    async fn downloads_body_and_reports_final_progress() {
        let server = TestServer::start().await;
        server.route("/files/a.bin", 200, b"hello world".to_vec());
        let tmp = tempfile::tempdir().unwrap();
        let dest = tmp.path().join("a.bin");

        let mut last = None;
        let written = NetworkClient::new()
            .download_to_path(&server.url("/files/a.bin"), &dest, None, |d, t, _| {
                last = Some((d, t));
            })
            .await
            .unwrap();

        assert_eq!(written, 11);
        assert_eq!(last, Some((11, Some(11))));
        assert_eq!(std::fs::read(&dest).unwrap(), b"hello world");
    }

    #[tokio::test]
    async fn error_status_leaves_destination_untouched() {
        let server = TestServer::start().await;
        server.route("/missing", 404, b"nope".to_vec());
        let tmp = tempfile::tempdir().unwrap();
        let dest = tmp.path().join("keep.txt");
        std::fs::write(&dest, b"original").unwrap();

        let err = NetworkClient::new()
            .download_to_path(&server.url("/missing"), &dest, None, |_, _, _| {})
            .await
            .unwrap_err();

        assert!(matches!(err, LauncherError::NetworkError(_)));
        assert_eq!(std::fs::read(&dest).unwrap(), b"original");
        assert!(!partial_path(&dest).exists());
    }

    #[tokio::test]
    async fn failed_rename_removes_partial_file() {
        let server = TestServer::start().await;
        server.route("/name.jar", 200, b"jar".to_vec());
        let tmp = tempfile::tempdir().unwrap();
        let dest = tmp.path().join("name.jar");
        std::fs::create_dir_all(dest.join("occupied")).unwrap();

        let err = NetworkClient::new()
            .download_to_path(&server.url("/name.jar"), &dest, None, |_, _, _| {})
            .await
            .unwrap_err();

        assert!(matches!(err, LauncherError::IoError(_)));
        assert!(dest.is_dir());
        assert!(!partial_path(&dest).exists());
    }

    #[tokio::test]
    async fn get_json_reports_malformed_bodies() {
        let server = TestServer::start().await;
        server.route("/bad.json", 200, b"{not json".to_vec());
        let err = NetworkClient::new()
            .get_json::<serde_json::Value>(&server.url("/bad.json"))
            .await
            .unwrap_err();
        assert!(matches!(err, LauncherError::ExternalToolError(_)));
    }

    #[tokio::test]
    async fn unreachable_host_is_a_network_error() {
        let err = NetworkClient::new()
            .get_text("http://127.0.0.1:9/version.txt")
            .await
            .unwrap_err();
        assert!(matches!(err, LauncherError::NetworkError(_)));
    }
}
