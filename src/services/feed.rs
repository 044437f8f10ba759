// src/services/feed.rs

//! Snapshot fetcher for the upstream listing feed.

use async_trait::async_trait;
use chrono::Utc;
use reqwest::Client;
use reqwest::header::ACCEPT;

use crate::error::{AppError, Result};
use crate::models::{FeedConfig, Snapshot};
use crate::utils::http::create_async_client;
use crate::utils::with_cache_buster;

/// Source of full listing snapshots.
#[async_trait]
pub trait SnapshotSource: Send + Sync {
    /// Retrieve the current full listing set.
    ///
    /// Malformed individual records are skipped; only an unusable response
    /// is an error.
    async fn fetch(&self) -> Result<Snapshot>;
}

/// HTTP client for the JSON feed.
pub struct FeedClient {
    client: Client,
    url: String,
    cache_bust: bool,
}

impl FeedClient {
    /// Create a feed client from configuration.
    pub fn new(config: &FeedConfig) -> Result<Self> {
        let client = create_async_client(&config.user_agent, config.timeout_secs)?;
        Ok(Self::with_client(client, &config.url, config.cache_bust))
    }

    /// Create a feed client around an existing HTTP client.
    pub fn with_client(client: Client, url: impl Into<String>, cache_bust: bool) -> Self {
        Self {
            client,
            url: url.into(),
            cache_bust,
        }
    }

    fn request_url(&self) -> Result<String> {
        if self.cache_bust {
            Ok(with_cache_buster(&self.url, Utc::now().timestamp_millis())?)
        } else {
            Ok(self.url.clone())
        }
    }
}

#[async_trait]
impl SnapshotSource for FeedClient {
    async fn fetch(&self) -> Result<Snapshot> {
        let url = self.request_url()?;
        log::debug!("[fetch] GET {}", url);

        let response = self
            .client
            .get(&url)
            .header(ACCEPT, "application/json")
            .send()
            .await
            .map_err(|e| AppError::fetch(format!("request to {} failed: {}", self.url, e)))?;

        let status = response.status();
        if !status.is_success() {
            return Err(AppError::fetch(format!(
                "{} answered HTTP {}",
                self.url, status
            )));
        }

        let body = response
            .text()
            .await
            .map_err(|e| AppError::fetch(format!("reading body from {} failed: {}", self.url, e)))?;

        let snapshot = Snapshot::parse(body.trim_start_matches('\u{feff}'))?;
        log::info!(
            "[fetch] {} listings fetched ({} skipped, upstream updated {})",
            snapshot.listings.len(),
            snapshot.skipped,
            snapshot.updated.as_deref().unwrap_or("unknown")
        );
        Ok(snapshot)
    }
}
