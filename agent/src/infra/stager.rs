//! HTTP artifact downloader — implements `ArtifactStager`.
//!
//! Layout of the staging area after a successful `stage`:
//!
//! ```text
//! staging/
//!   bin/<binary_name>
//!   files/<aux file paths...>
//! ```
//!
//! The whole area is wiped before every attempt, and every response body is
//! streamed against a byte cap so an oversized artifact never lands whole.

use std::path::{Path, PathBuf};
use std::time::Duration;

use async_trait::async_trait;
use outpost_common::{AgentConfig, Release};
use tokio::io::AsyncWriteExt;
use tracing::{debug, info, warn};

use crate::application::ports::{ArtifactStager, StagedArtifacts};
use crate::domain::DownloadError;
use crate::domain::release::{STAGED_BINARY_DIR, STAGED_FILES_DIR, aux_file_url, select_binary_asset};

/// Settings for [`HttpArtifactStager`].
#[derive(Debug, Clone)]
pub struct StagerSettings {
    pub staging_dir: PathBuf,
    pub release_repo: String,
    pub raw_base_url: String,
    pub aux_files: Vec<String>,
    pub binary_name: String,
    pub max_bytes: u64,
    pub per_file_timeout: Duration,
    /// `std::env::consts::ARCH` in production; overridable in tests.
    pub arch: String,
}

impl StagerSettings {
    #[must_use]
    pub fn from_config(config: &AgentConfig) -> Self {
        Self {
            staging_dir: config.staging_path(),
            release_repo: config.release_repo.clone(),
            raw_base_url: config.raw_base_url.clone(),
            aux_files: config.aux_files.clone(),
            binary_name: config.binary_name.clone(),
            max_bytes: config.max_artifact_bytes,
            per_file_timeout: config.download_timeout(),
            arch: std::env::consts::ARCH.to_string(),
        }
    }
}

pub struct HttpArtifactStager {
    client: reqwest::Client,
    settings: StagerSettings,
}

impl HttpArtifactStager {
    #[must_use]
    pub fn new(client: reqwest::Client, settings: StagerSettings) -> Self {
        Self { client, settings }
    }

    fn reset_staging(&self) -> Result<(), DownloadError> {
        let dir = &self.settings.staging_dir;
        match std::fs::remove_dir_all(dir) {
            Err(e) if e.kind() != std::io::ErrorKind::NotFound => {
                return Err(io_error(dir, e));
            }
            _ => {}
        }
        std::fs::create_dir_all(dir).map_err(|e| io_error(dir, e))
    }

    /// Streams `url` into `dest`, failing once more than `max_bytes` arrive.
    async fn fetch_to(&self, url: &str, dest: &Path, name: &str) -> Result<(), DownloadError> {
        let transport = |e: reqwest::Error| DownloadError::Transport {
            url: url.to_string(),
            message: e.to_string(),
        };

        let mut response = self
            .client
            .get(url)
            .timeout(self.settings.per_file_timeout)
            .send()
            .await
            .map_err(transport)?;
        let status = response.status();
        if !status.is_success() {
            return Err(DownloadError::Http {
                url: url.to_string(),
                status: status.as_u16(),
            });
        }
        let limit = self.settings.max_bytes;
        if response.content_length().is_some_and(|len| len > limit) {
            return Err(DownloadError::OversizedArtifact {
                name: name.to_string(),
                limit,
            });
        }

        if let Some(parent) = dest.parent() {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|e| io_error(parent, e))?;
        }
        let mut file = tokio::fs::File::create(dest)
            .await
            .map_err(|e| io_error(dest, e))?;

        let mut written: u64 = 0;
        loop {
            let chunk = match response.chunk().await {
                Ok(Some(chunk)) => chunk,
                Ok(None) => break,
                Err(e) => {
                    drop(file);
                    let _ = tokio::fs::remove_file(dest).await;
                    return Err(transport(e));
                }
            };
            written += chunk.len() as u64;
            if written > limit {
                drop(file);
                let _ = tokio::fs::remove_file(dest).await;
                return Err(DownloadError::OversizedArtifact {
                    name: name.to_string(),
                    limit,
                });
            }
            file.write_all(&chunk).await.map_err(|e| io_error(dest, e))?;
        }
        file.flush().await.map_err(|e| io_error(dest, e))?;
        debug!(name, bytes = written, "artifact downloaded");
        Ok(())
    }
}

#[async_trait]
impl ArtifactStager for HttpArtifactStager {
    async fn stage(&self, release: &Release) -> Result<StagedArtifacts, DownloadError> {
        let s = &self.settings;
        // Resolve the binary before touching the network for anything else.
        let asset = select_binary_asset(release, &s.arch)?;
        self.reset_staging()?;

        let files_dir = s.staging_dir.join(STAGED_FILES_DIR);
        let mut files = Vec::with_capacity(s.aux_files.len());
        for file in &s.aux_files {
            let url = aux_file_url(&s.raw_base_url, &s.release_repo, &release.tag, file);
            let dest = files_dir.join(file);
            self.fetch_to(&url, &dest, file).await?;
            files.push(dest);
        }

        let binary = s.staging_dir.join(STAGED_BINARY_DIR).join(&s.binary_name);
        self.fetch_to(&asset.url, &binary, &asset.name).await?;

        info!(tag = %release.tag, asset = %asset.name, files = files.len(), "release staged");
        Ok(StagedArtifacts { binary, files })
    }

    fn clear(&self) {
        let dir = &self.settings.staging_dir;
        match std::fs::remove_dir_all(dir) {
            Err(e) if e.kind() != std::io::ErrorKind::NotFound => {
                warn!(path = %dir.display(), error = %e, "cannot purge staging area");
            }
            _ => {}
        }
    }
}

fn io_error(path: &Path, source: std::io::Error) -> DownloadError {
    DownloadError::Io {
        path: path.to_path_buf(),
        source,
    }
}
