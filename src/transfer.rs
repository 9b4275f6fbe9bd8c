use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use reqwest::Client;
use thiserror::Error;
use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::config::TransferConfig;
use crate::playlist::Manifest;

#[derive(Error, Debug)]
pub enum TransferError {
    #[error("transfer aborted: segment {index} failed after {attempts} attempts: {reason}")]
    Aborted {
        index: usize,
        attempts: u32,
        reason: String,
    },
    #[error("destination not writable: {0}")]
    SinkUnwritable(#[from] std::io::Error),
    #[error("transfer cancelled")]
    Cancelled,
    #[error("manifest has no segments")]
    EmptyManifest,
    #[error("failed to build http client: {0}")]
    ClientError(#[from] reqwest::Error),
}

/// Retry-with-backoff settings for segment fetches.
/// Actual delay for attempt n is base * 2^n, capped at `max_delay`.
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    pub max_retries: u32,
    pub base_delay: Duration,
    pub max_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: 3,
            base_delay: Duration::from_millis(500),
            max_delay: Duration::from_secs(10),
        }
    }
}

impl RetryPolicy {
    fn delay_for_attempt(&self, attempt: u32) -> Duration {
        // checked shift so misconfigured attempt counts saturate instead of overflowing
        let multiplier = 1u32.checked_shl(attempt).unwrap_or(u32::MAX);
        self.base_delay
            .checked_mul(multiplier)
            .unwrap_or(self.max_delay)
            .min(self.max_delay)
    }
}

/// Snapshot handed to the progress observer after each completed segment.
#[derive(Debug, Clone, Copy)]
pub struct TransferProgress {
    pub segments_done: u64,
    pub segments_total: u64,
    pub bytes_done: u64,
}

pub type ProgressFn = Arc<dyn Fn(TransferProgress) + Send + Sync>;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransferReport {
    pub bytes_written: u64,
    pub segments: usize,
}

pub struct TransferEngine {
    client: Client,
    concurrency: usize,
    retry: RetryPolicy,
    progress: Option<ProgressFn>,
}

impl TransferEngine {
    pub fn new(config: &TransferConfig) -> Result<Self, TransferError> {
        let client = Client::builder().timeout(config.timeout()).build()?;
        Ok(Self {
            client,
            concurrency: config.concurrency.max(1),
            retry: config.retry_policy(),
            progress: None,
        })
    }

    /// Attach a progress observer. Reporting only, never affects control flow.
    pub fn with_progress(mut self, progress: ProgressFn) -> Self {
        self.progress = Some(progress);
        self
    }

    /// Fetch every segment of `manifest` and make the assembled payload
    /// visible at `dest` in a single rename.
    ///
    /// Segments are fetched with bounded parallelism and each fetch retries
    /// transient failures with exponential backoff. Assembly follows the
    /// manifest's declared order regardless of completion order. On any
    /// failure or cancellation nothing is left at `dest`.
    pub async fn download(
        &self,
        manifest: &Manifest,
        dest: &Path,
        token: CancellationToken,
    ) -> Result<TransferReport, TransferError> {
        if manifest.segments.is_empty() {
            return Err(TransferError::EmptyManifest);
        }

        let total = manifest.segments.len();
        info!(segments = total, dest = %dest.display(), "starting transfer");

        let semaphore = Arc::new(Semaphore::new(self.concurrency));
        let segments_done = Arc::new(AtomicU64::new(0));
        let bytes_done = Arc::new(AtomicU64::new(0));

        let mut tasks: JoinSet<Result<(usize, Vec<u8>), TransferError>> = JoinSet::new();
        for (index, segment) in manifest.segments.iter().enumerate() {
            let url = segment.url.clone();
            let client = self.client.clone();
            let retry = self.retry.clone();
            let semaphore = semaphore.clone();
            let token = token.clone();
            let segments_done = segments_done.clone();
            let bytes_done = bytes_done.clone();
            let progress = self.progress.clone();
            let total = total as u64;

            tasks.spawn(async move {
                let _permit = semaphore
                    .acquire_owned()
                    .await
                    .map_err(|_| TransferError::Cancelled)?;

                let data = fetch_with_retry(&client, &url, index, &retry, &token).await?;

                let done = segments_done.fetch_add(1, Ordering::Relaxed) + 1;
                let bytes = bytes_done.fetch_add(data.len() as u64, Ordering::Relaxed)
                    + data.len() as u64;
                if let Some(ref observer) = progress {
                    observer(TransferProgress {
                        segments_done: done,
                        segments_total: total,
                        bytes_done: bytes,
                    });
                }

                Ok((index, data))
            });
        }

        // one slot per manifest index; each is written exactly once
        let mut slots: Vec<Option<Vec<u8>>> = (0..total).map(|_| None).collect();
        while let Some(joined) = tasks.join_next().await {
            let result = joined.map_err(|e| TransferError::Aborted {
                index: 0,
                attempts: 0,
                reason: format!("worker panicked: {e}"),
            })?;
            match result {
                Ok((index, data)) => slots[index] = Some(data),
                Err(err) => {
                    tasks.abort_all();
                    return Err(err);
                }
            }
        }

        // assemble strictly in manifest order, never arrival order
        let mut payload =
            Vec::with_capacity(slots.iter().map(|s| s.as_ref().map_or(0, Vec::len)).sum());
        for (index, slot) in slots.into_iter().enumerate() {
            match slot {
                Some(data) => payload.extend_from_slice(&data),
                None => {
                    return Err(TransferError::Aborted {
                        index,
                        attempts: 0,
                        reason: "segment missing after fetch".to_string(),
                    });
                }
            }
        }

        if token.is_cancelled() {
            return Err(TransferError::Cancelled);
        }

        self.persist(&payload, dest, &token).await?;

        info!(bytes = payload.len(), dest = %dest.display(), "transfer complete");
        Ok(TransferReport {
            bytes_written: payload.len() as u64,
            segments: total,
        })
    }

    /// Write to a temp file next to `dest`, then finalize with one rename so
    /// the destination only ever holds a complete payload.
    async fn persist(
        &self,
        payload: &[u8],
        dest: &Path,
        token: &CancellationToken,
    ) -> Result<(), TransferError> {
        let tmp = temp_path(dest);
        debug!(tmp = %tmp.display(), "persisting payload");

        tokio::fs::write(&tmp, payload).await?;

        if token.is_cancelled() {
            let _ = tokio::fs::remove_file(&tmp).await;
            return Err(TransferError::Cancelled);
        }

        if let Err(e) = tokio::fs::rename(&tmp, dest).await {
            let _ = tokio::fs::remove_file(&tmp).await;
            return Err(TransferError::SinkUnwritable(e));
        }

        Ok(())
    }
}

fn temp_path(dest: &Path) -> PathBuf {
    let mut name = dest.file_name().unwrap_or_default().to_os_string();
    name.push(".part");
    dest.with_file_name(name)
}

async fn fetch_with_retry(
    client: &Client,
    url: &str,
    index: usize,
    policy: &RetryPolicy,
    token: &CancellationToken,
) -> Result<Vec<u8>, TransferError> {
    let mut attempt = 0u32;
    loop {
        let result = tokio::select! {
            _ = token.cancelled() => return Err(TransferError::Cancelled),
            result = fetch_once(client, url) => result,
        };

        match result {
            Ok(data) => {
                debug!(index, bytes = data.len(), "segment fetched");
                return Ok(data);
            }
            Err(err) if attempt < policy.max_retries && is_retryable(&err) => {
                let delay = policy.delay_for_attempt(attempt);
                warn!(
                    index,
                    attempt = attempt + 1,
                    max = policy.max_retries,
                    delay_ms = delay.as_millis() as u64,
                    error = %err,
                    "segment fetch failed, retrying"
                );
                tokio::select! {
                    _ = token.cancelled() => return Err(TransferError::Cancelled),
                    _ = tokio::time::sleep(delay) => {}
                }
                attempt += 1;
            }
            Err(err) => {
                return Err(TransferError::Aborted {
                    index,
                    attempts: attempt + 1,
                    reason: err.to_string(),
                });
            }
        }
    }
}

async fn fetch_once(client: &Client, url: &str) -> Result<Vec<u8>, reqwest::Error> {
    let response = client.get(url).send().await?.error_for_status()?;
    Ok(response.bytes().await?.to_vec())
}

/// Timeouts and transport failures retry; 5xx retries; 4xx does not.
fn is_retryable(e: &reqwest::Error) -> bool {
    e.is_connect()
        || e.is_timeout()
        || e.is_request()
        || e.is_body()
        || e.status().is_some_and(|s| s.is_server_error())
}
