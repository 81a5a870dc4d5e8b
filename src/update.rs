//! Release feed check
//!
//! Fetches the latest release from a GitHub-style `releases/latest` endpoint,
//! compares its tag with the running version and downloads the matching asset.

use serde::Deserialize;
use std::path::{Path, PathBuf};
use tokio::io::AsyncWriteExt;

use crate::config::UpdateConfig;
use crate::error::Result;

/// A newer release the host may offer to install
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReleaseInfo {
    /// Release tag as published (e.g. "v1.6.0")
    pub version: String,
    /// Download URL of the matching asset
    pub download_url: String,
    /// Release notes
    pub notes: String,
}

/// Outcome of an update check
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UpdateStatus {
    /// A newer release with a matching asset exists
    Available(ReleaseInfo),
    /// The running version is current (or the newer release has no matching asset)
    UpToDate {
        /// Tag of the latest published release
        latest: String,
    },
}

#[derive(Debug, Deserialize)]
struct ReleaseFeed {
    tag_name: String,
    #[serde(default)]
    body: Option<String>,
    #[serde(default)]
    assets: Vec<ReleaseAsset>,
}

#[derive(Debug, Deserialize)]
struct ReleaseAsset {
    browser_download_url: String,
}

/// Whether `remote` is a newer version than `local`
///
/// Versions are dot-separated numeric components compared left to right. A
/// leading `v` is ignored, missing trailing components count as zero and so
/// do components that are not numbers.
///
/// ```
/// use media_dl::is_newer;
///
/// assert!(is_newer("1.6.0", "1.5.9"));
/// assert!(!is_newer("1.6", "1.6.0"));
/// assert!(is_newer("v2.0", "1.9.9"));
/// ```
pub fn is_newer(remote: &str, local: &str) -> bool {
    let remote = components(remote);
    let local = components(local);
    let len = remote.len().max(local.len());

    for i in 0..len {
        let r = remote.get(i).copied().unwrap_or(0);
        let l = local.get(i).copied().unwrap_or(0);
        if r != l {
            return r > l;
        }
    }
    false
}

fn components(version: &str) -> Vec<u64> {
    let version = version.trim();
    version
        .strip_prefix('v')
        .unwrap_or(version)
        .split('.')
        .map(|part| part.trim().parse().unwrap_or(0))
        .collect()
}

/// Client for the release feed
#[derive(Debug, Clone)]
pub struct UpdateChecker {
    client: reqwest::Client,
    config: UpdateConfig,
}

impl UpdateChecker {
    /// Create a checker for the configured feed
    pub fn new(config: UpdateConfig) -> Result<Self> {
        let client = reqwest::Client::builder()
            .user_agent(config.user_agent.clone())
            .build()?;
        Ok(Self { client, config })
    }

    /// Check the feed against `current_version`
    ///
    /// # Errors
    ///
    /// Returns [`crate::Error::Network`] if the request fails or the feed answers
    /// with a non-success status. A body that is not a release document is
    /// reported the same way.
    pub async fn check(&self, current_version: &str) -> Result<UpdateStatus> {
        tracing::debug!(feed = %self.config.feed_url, current_version, "checking for updates");

        let feed: ReleaseFeed = self
            .client
            .get(&self.config.feed_url)
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;

        if !is_newer(&feed.tag_name, current_version) {
            return Ok(UpdateStatus::UpToDate {
                latest: feed.tag_name,
            });
        }

        let asset = feed
            .assets
            .iter()
            .find(|asset| asset.browser_download_url.ends_with(&self.config.asset_suffix));
        let Some(asset) = asset else {
            tracing::warn!(
                latest = %feed.tag_name,
                suffix = %self.config.asset_suffix,
                "newer release has no matching asset"
            );
            return Ok(UpdateStatus::UpToDate {
                latest: feed.tag_name,
            });
        };

        tracing::info!(latest = %feed.tag_name, current_version, "update available");
        Ok(UpdateStatus::Available(ReleaseInfo {
            download_url: asset.browser_download_url.clone(),
            notes: feed.body.unwrap_or_else(|| "No release notes".to_string()),
            version: feed.tag_name,
        }))
    }

    /// Download the asset of `release` into `dir`
    ///
    /// `on_progress` receives whole percents, each value once, and only when
    /// the server announces a content length. The file is written under a
    /// `.part` name and renamed when complete; a failed download leaves
    /// nothing behind.
    ///
    /// # Errors
    ///
    /// Returns [`crate::Error::Network`] for request or status failures and
    /// [`crate::Error::Io`] if the file cannot be written.
    pub async fn download_asset<F>(
        &self,
        release: &ReleaseInfo,
        dir: &Path,
        mut on_progress: F,
    ) -> Result<PathBuf>
    where
        F: FnMut(u8) + Send,
    {
        let name = asset_file_name(&release.download_url, &self.config.asset_suffix);
        let target = dir.join(&name);
        let partial = dir.join(format!("{name}.part"));

        tracing::info!(
            url = %release.download_url,
            target = %target.display(),
            "downloading release asset"
        );
        if let Err(e) = self
            .fetch_to_file(&release.download_url, &partial, &mut on_progress)
            .await
        {
            tokio::fs::remove_file(&partial).await.ok();
            return Err(e);
        }
        tokio::fs::rename(&partial, &target).await?;

        tracing::info!(
            version = %release.version,
            target = %target.display(),
            "release asset downloaded"
        );
        Ok(target)
    }

    async fn fetch_to_file(
        &self,
        url: &str,
        path: &Path,
        on_progress: &mut (dyn FnMut(u8) + Send),
    ) -> Result<()> {
        let mut response = self.client.get(url).send().await?.error_for_status()?;
        let total = response.content_length().filter(|len| *len > 0);

        let mut file = tokio::fs::File::create(path).await?;
        let mut received: u64 = 0;
        let mut last_percent = None;
        while let Some(chunk) = response.chunk().await? {
            file.write_all(&chunk).await?;
            received += chunk.len() as u64;

            if let Some(total) = total {
                let percent = u8::try_from(received.saturating_mul(100) / total)
                    .unwrap_or(100)
                    .min(100);
                if last_percent != Some(percent) {
                    last_percent = Some(percent);
                    on_progress(percent);
                }
            }
        }
        file.flush().await?;
        Ok(())
    }

    /// Feed URL this checker queries
    pub fn feed_url(&self) -> &str {
        &self.config.feed_url
    }
}

/// File name for a downloaded asset: the URL's last path segment
fn asset_file_name(url: &str, suffix: &str) -> String {
    url.split(['?', '#'])
        .next()
        .and_then(|path| path.rsplit('/').next())
        .filter(|name| !name.is_empty() && *name != "." && *name != "..")
        .map(str::to_string)
        .unwrap_or_else(|| format!("update{suffix}"))
}
