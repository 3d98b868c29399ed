//! GitHub releases feed — implements `ReleaseFeed`.

use std::time::Duration;

use async_trait::async_trait;
use outpost_common::{AgentConfig, Release, ReleaseAsset};
use serde::Deserialize;

use crate::application::ports::ReleaseFeed;
use crate::domain::FetchError;

/// `User-Agent` sent with every request; GitHub rejects requests without one.
pub const USER_AGENT: &str = concat!("outpost/", env!("CARGO_PKG_VERSION"));

#[derive(Debug, Deserialize)]
struct GithubRelease {
    tag_name: String,
    #[serde(default)]
    body: Option<String>,
    #[serde(default)]
    assets: Vec<GithubAsset>,
}

#[derive(Debug, Deserialize)]
struct GithubAsset {
    name: String,
    browser_download_url: String,
}

impl From<GithubRelease> for Release {
    fn from(raw: GithubRelease) -> Self {
        Self {
            tag: raw.tag_name,
            assets: raw
                .assets
                .into_iter()
                .map(|a| ReleaseAsset {
                    name: a.name,
                    url: a.browser_download_url,
                })
                .collect(),
            body: raw.body.unwrap_or_default(),
        }
    }
}

pub struct GithubReleaseFeed {
    client: reqwest::Client,
    url: String,
    timeout: Duration,
}

impl GithubReleaseFeed {
    #[must_use]
    pub fn new(client: reqwest::Client, api_base: &str, repo: &str, timeout: Duration) -> Self {
        Self {
            client,
            url: format!(
                "{}/repos/{repo}/releases/latest",
                api_base.trim_end_matches('/')
            ),
            timeout,
        }
    }

    #[must_use]
    pub fn from_config(client: reqwest::Client, config: &AgentConfig) -> Self {
        Self::new(
            client,
            &config.github_api_base,
            &config.release_repo,
            config.feed_timeout(),
        )
    }

    #[must_use]
    pub fn url(&self) -> &str {
        &self.url
    }
}

#[async_trait]
impl ReleaseFeed for GithubReleaseFeed {
    async fn fetch_latest(&self) -> Result<Release, FetchError> {
        let response = self
            .client
            .get(&self.url)
            .header(reqwest::header::ACCEPT, "application/vnd.github+json")
            .timeout(self.timeout)
            .send()
            .await
            .map_err(|e| FetchError::Unreachable(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            return Err(FetchError::Status(status.as_u16()));
        }
        let bytes = response
            .bytes()
            .await
            .map_err(|e| FetchError::Unreachable(e.to_string()))?;
        parse_release(&bytes)
    }
}

/// Decodes a `releases/latest` payload.
///
/// # Errors
///
/// Returns [`FetchError::Malformed`] if the JSON does not carry a tag.
pub fn parse_release(bytes: &[u8]) -> Result<Release, FetchError> {
    let raw: GithubRelease =
        serde_json::from_slice(bytes).map_err(|e| FetchError::Malformed(e.to_string()))?;
    if raw.tag_name.trim().is_empty() {
        return Err(FetchError::Malformed("empty tag_name".to_string()));
    }
    Ok(raw.into())
}
