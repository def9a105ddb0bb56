//! Update checker - polls the release manifest for newer versions.
//!
//! The bridge never replaces its own binary; a newer release is reported
//! (logged and queryable over the API) and left to the operator.

use std::sync::Arc;
use std::time::Duration;

use anyhow::{anyhow, Result};
use chrono::{DateTime, Utc};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tokio::sync::RwLock;
use tokio::time::interval;
use tokio_util::sync::CancellationToken;

const DEFAULT_POLL_INTERVAL_MINUTES: u64 = 60;
const MANIFEST_BASE_URL: &str =
    "https://raw.githubusercontent.com/open-horizon-labs/ir-control-bridge";

/// Release manifest published alongside the code files.
#[derive(Debug, Deserialize)]
struct Manifest {
    updater: ManifestUpdater,
}

#[derive(Debug, Deserialize)]
struct ManifestUpdater {
    version: String,
    #[serde(rename = "releaseNotes", default)]
    release_notes: Option<String>,
}

/// Last known update state, served on the status endpoint.
#[derive(Debug, Clone, Serialize, Default)]
pub struct UpdateStatus {
    pub current: String,
    pub latest: Option<String>,
    pub release_notes: Option<String>,
    pub update_available: bool,
    pub checked_at: Option<DateTime<Utc>>,
}

/// Update checking service.
pub struct UpdateChecker {
    client: Client,
    branch: String,
    status: Arc<RwLock<UpdateStatus>>,
    shutdown: CancellationToken,
}

impl UpdateChecker {
    pub fn new(branch: impl Into<String>) -> Self {
        #[allow(clippy::expect_used)] // HTTP client creation only fails if TLS setup fails
        let client = Client::builder()
            .user_agent("ir-control-bridge")
            .timeout(Duration::from_secs(30))
            .build()
            .expect("Failed to create HTTP client");

        Self {
            client,
            branch: branch.into(),
            status: Arc::new(RwLock::new(UpdateStatus {
                current: env!("ICB_VERSION").to_string(),
                ..UpdateStatus::default()
            })),
            shutdown: CancellationToken::new(),
        }
    }

    /// Stop the polling service.
    pub fn stop(&self) {
        self.shutdown.cancel();
        tracing::info!("Update checker stopped");
    }

    /// Last known update state.
    pub async fn status(&self) -> UpdateStatus {
        self.status.read().await.clone()
    }

    async fn fetch_manifest(&self) -> Result<Manifest> {
        let url = format!("{}/{}/manifest.json", MANIFEST_BASE_URL, self.branch);
        let response = self.client.get(&url).send().await?;

        if !response.status().is_success() {
            return Err(anyhow!("manifest fetch failed: {}", response.status()));
        }

        // The raw host serves JSON as text/plain, so parse the body
        // instead of trusting the content type.
        let body = response.text().await?;
        Ok(serde_json::from_str(&body)?)
    }

    /// Compare versions (returns true if remote > local)
    fn is_newer_version(remote: &str, local: &str) -> bool {
        let parse = |v: &str| -> Vec<u32> {
            v.trim_start_matches('v')
                .split('-')
                .next()
                .unwrap_or("")
                .split('.')
                .filter_map(|s| s.parse().ok())
                .collect()
        };

        let remote_parts = parse(remote);
        let local_parts = parse(local);

        for i in 0..3 {
            let r = remote_parts.get(i).unwrap_or(&0);
            let l = local_parts.get(i).unwrap_or(&0);
            if r > l {
                return true;
            }
            if r < l {
                return false;
            }
        }
        false
    }

    /// Check the manifest once; returns true when a newer release exists.
    pub async fn check(&self) -> Result<bool> {
        let manifest = self.fetch_manifest().await?;
        let latest = manifest.updater.version;
        let current = env!("ICB_VERSION");

        let newer = Self::is_newer_version(&latest, current);
        if newer {
            tracing::info!(
                "A newer release is available: v{} (running v{})",
                latest,
                current
            );
        } else {
            tracing::debug!("Running the latest release (v{})", current);
        }

        let mut status = self.status.write().await;
        status.latest = Some(latest);
        status.release_notes = manifest.updater.release_notes;
        status.update_available = newer;
        status.checked_at = Some(Utc::now());

        Ok(newer)
    }

    /// Start periodic polling; checks once immediately, then every
    /// `poll_interval_minutes`.
    pub fn start_polling(self: Arc<Self>, poll_interval_minutes: u64) {
        let interval_mins = if poll_interval_minutes > 0 {
            poll_interval_minutes
        } else {
            DEFAULT_POLL_INTERVAL_MINUTES
        };

        let shutdown = self.shutdown.clone();
        tokio::spawn(async move {
            if let Err(e) = self.check().await {
                tracing::warn!("Initial update check failed: {}", e);
            }

            let mut ticker = interval(Duration::from_secs(interval_mins * 60));
            ticker.tick().await; // Skip first tick (we already checked)

            loop {
                tokio::select! {
                    _ = shutdown.cancelled() => {
                        tracing::debug!("Update polling shutdown requested");
                        break;
                    }
                    _ = ticker.tick() => {
                        if let Err(e) = self.check().await {
                            tracing::warn!("Update check failed: {}", e);
                        }
                    }
                }
            }
        });
    }
}
