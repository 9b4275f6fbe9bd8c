use reqwest::{Client, StatusCode};
use serde::Deserialize;
use thiserror::Error;
use tracing::debug;

use crate::catalog::ResolutionTarget;
use crate::config::CatalogConfig;

#[derive(Error, Debug)]
pub enum PlaylistError {
    /// Valid identifiers but no playable source (removed or restricted content).
    #[error("no playable source for this title")]
    ContentNotAvailable,
    /// Transient service or network failure; safe for the caller to retry.
    #[error("catalog service error: {0}")]
    ServiceError(#[from] reqwest::Error),
}

/// One retrievable chunk of a manifest's media payload.
#[derive(Debug, Clone, Deserialize)]
pub struct Segment {
    pub url: String,
}

/// Resolved description of the retrievable media for one title or episode.
///
/// Single-use: created per resolution, handed to the transfer engine, never
/// cached. Declared segment order is the assembly order.
#[derive(Debug, Clone, Deserialize)]
pub struct Manifest {
    #[serde(default)]
    pub quality: Option<String>,
    pub segments: Vec<Segment>,
}

impl Manifest {
    pub fn total_segments(&self) -> usize {
        self.segments.len()
    }
}

pub struct PlaylistClient {
    client: Client,
    base_url: String,
}

impl PlaylistClient {
    pub fn new(config: &CatalogConfig) -> Result<Self, PlaylistError> {
        Self::with_base_url(&config.url, config.timeout())
    }

    /// Create a client with an explicit base URL (for testing)
    pub fn with_base_url(
        base_url: &str,
        timeout: std::time::Duration,
    ) -> Result<Self, PlaylistError> {
        let client = Client::builder().timeout(timeout).build()?;
        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    /// Exchange a resolution target for a playable manifest.
    ///
    /// No retry policy lives here; transient failures are classified as
    /// [`PlaylistError::ServiceError`] and left to the caller.
    pub async fn get_playlist(&self, target: &ResolutionTarget) -> Result<Manifest, PlaylistError> {
        let mut url = format!(
            "{}/api/playlist?movie_id={}",
            self.base_url,
            urlencoding::encode(&target.movie_id)
        );
        if let Some(ref episode_id) = target.episode_id {
            url.push_str(&format!("&episode_id={}", urlencoding::encode(episode_id)));
        }

        debug!(movie_id = %target.movie_id, episode_id = ?target.episode_id, "retrieving playlist");

        let response = self.client.get(&url).send().await?;

        match response.status() {
            StatusCode::NOT_FOUND | StatusCode::GONE => Err(PlaylistError::ContentNotAvailable),
            _ => {
                let manifest: Manifest = response.error_for_status()?.json().await?;
                debug!(
                    segments = manifest.total_segments(),
                    quality = ?manifest.quality,
                    "playlist resolved"
                );
                Ok(manifest)
            }
        }
    }
}
