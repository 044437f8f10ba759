// src/storage/state.rs

//! JSON file backed state store.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tokio::io::AsyncWriteExt;

use crate::error::{AppError, Result};
use crate::models::{Listing, ListingStatus};

/// Persisted snapshot of one listing.
///
/// `status` and `documents` are `None` for ids imported from the legacy
/// id-only state format; unknown fields never count as changed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SeenRecord {
    #[serde(default)]
    pub company_name: String,

    #[serde(default)]
    pub listing_date: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<ListingStatus>,

    #[serde(default)]
    pub has_phip: bool,

    #[serde(default)]
    pub posting_date: String,

    /// Sorted document fingerprints
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub documents: Option<Vec<String>>,

    /// When the id was first recorded
    pub first_seen: DateTime<Utc>,

    /// When the recorded content last changed
    pub updated_at: DateTime<Utc>,
}

impl SeenRecord {
    fn from_listing(listing: &Listing, now: DateTime<Utc>) -> Self {
        Self {
            company_name: listing.company_name.clone(),
            listing_date: listing.listing_date.clone(),
            status: Some(listing.status.clone()),
            has_phip: listing.has_phip,
            posting_date: listing.posting_date.clone(),
            documents: Some(listing.document_fingerprints()),
            first_seen: now,
            updated_at: now,
        }
    }

    fn legacy(now: DateTime<Utc>) -> Self {
        Self {
            company_name: String::new(),
            listing_date: String::new(),
            status: None,
            has_phip: false,
            posting_date: String::new(),
            documents: None,
            first_seen: now,
            updated_at: now,
        }
    }

    /// Whether the recorded content equals the listing's current content.
    fn matches(&self, listing: &Listing) -> bool {
        self.company_name == listing.company_name
            && self.listing_date == listing.listing_date
            && self.status.as_ref() == Some(&listing.status)
            && self.has_phip == listing.has_phip
            && self.posting_date == listing.posting_date
            && self.documents.as_deref() == Some(listing.document_fingerprints().as_slice())
    }
}

/// Display-relevant fields that differ from the recorded state.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FieldChanges {
    pub status: bool,
    pub documents: bool,
}

impl FieldChanges {
    /// Whether any display-relevant field changed.
    pub fn any(&self) -> bool {
        self.status || self.documents
    }
}

/// Id-only state written by earlier versions of the monitor.
#[derive(Debug, Deserialize)]
struct LegacyState {
    seen_ids: Vec<u64>,
}

/// Durable mapping from listing id to its last-known fields.
#[derive(Debug, Clone)]
pub struct StateStore {
    path: PathBuf,
    records: BTreeMap<u64, SeenRecord>,
}

impl StateStore {
    /// Create an empty store that will persist to `path`.
    pub fn empty(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            records: BTreeMap::new(),
        }
    }

    /// Load the store from disk.
    ///
    /// A missing or unreadable file yields an empty store and a warning,
    /// never an error.
    pub async fn load(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let bytes = match tokio::fs::read(&path).await {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                log::warn!(
                    "No state file at {}, starting with no prior knowledge",
                    path.display()
                );
                return Self::empty(path);
            }
            Err(e) => {
                log::warn!(
                    "Could not read state file {}: {}. Starting with no prior knowledge",
                    path.display(),
                    e
                );
                return Self::empty(path);
            }
        };

        match Self::decode(&bytes) {
            Ok(records) => {
                log::info!(
                    "Loaded {} previously seen listings from {}",
                    records.len(),
                    path.display()
                );
                Self { path, records }
            }
            Err(e) => {
                log::warn!(
                    "State file {} is corrupt: {}. Starting with no prior knowledge",
                    path.display(),
                    e
                );
                Self::empty(path)
            }
        }
    }

    fn decode(bytes: &[u8]) -> Result<BTreeMap<u64, SeenRecord>> {
        let value: Value = serde_json::from_slice(bytes)?;

        if value.get("seen_ids").is_some() {
            let legacy: LegacyState = serde_json::from_value(value)?;
            let now = Utc::now();
            log::info!(
                "Importing {} ids from legacy state format",
                legacy.seen_ids.len()
            );
            return Ok(legacy
                .seen_ids
                .into_iter()
                .map(|id| (id, SeenRecord::legacy(now)))
                .collect());
        }

        Ok(serde_json::from_value(value)?)
    }

    /// Path the store persists to.
    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Whether the id has been recorded.
    pub fn contains(&self, id: u64) -> bool {
        self.records.contains_key(&id)
    }

    pub fn get(&self, id: u64) -> Option<&SeenRecord> {
        self.records.get(&id)
    }

    /// Records ordered by id.
    pub fn iter(&self) -> impl Iterator<Item = (u64, &SeenRecord)> {
        self.records.iter().map(|(id, record)| (*id, record))
    }

    /// Display-relevant fields of a known listing that changed since recorded.
    ///
    /// Unknown ids report no changes.
    pub fn changed_fields(&self, listing: &Listing) -> FieldChanges {
        let Some(record) = self.records.get(&listing.id) else {
            return FieldChanges::default();
        };

        FieldChanges {
            status: record
                .status
                .as_ref()
                .is_some_and(|status| *status != listing.status),
            documents: record
                .documents
                .as_ref()
                .is_some_and(|docs| *docs != listing.document_fingerprints()),
        }
    }

    /// True if the id is known and its status or documents changed.
    pub fn diff_fields(&self, listing: &Listing) -> bool {
        self.changed_fields(listing).any()
    }

    /// Insert or overwrite the record for a listing.
    ///
    /// Returns `true` when the stored content changed.
    pub fn record(&mut self, listing: &Listing) -> bool {
        let now = Utc::now();
        match self.records.get_mut(&listing.id) {
            Some(existing) if existing.matches(listing) => false,
            Some(existing) => {
                let first_seen = existing.first_seen;
                *existing = SeenRecord {
                    first_seen,
                    ..SeenRecord::from_listing(listing, now)
                };
                true
            }
            None => {
                self.records
                    .insert(listing.id, SeenRecord::from_listing(listing, now));
                true
            }
        }
    }

    /// Remove an id. Polling never calls this.
    pub fn forget(&mut self, id: u64) -> Option<SeenRecord> {
        self.records.remove(&id)
    }

    /// Atomically write the whole mapping to disk.
    ///
    /// Writes to a temporary file next to the target, then renames over it.
    pub async fn persist(&self) -> Result<()> {
        self.write_atomic()
            .await
            .map_err(|e| AppError::persistence(self.path.display().to_string(), e))
    }

    async fn write_atomic(&self) -> Result<()> {
        let bytes = serde_json::to_vec_pretty(&self.records)?;

        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                tokio::fs::create_dir_all(parent).await?;
            }
        }

        let tmp = tmp_path(&self.path);
        let mut file = tokio::fs::File::create(&tmp).await?;
        file.write_all(&bytes).await?;
        file.flush().await?;
        file.sync_all().await?;
        drop(file);

        tokio::fs::rename(&tmp, &self.path).await?;
        Ok(())
    }
}

/// `<path>.tmp`, keeping any existing extension.
fn tmp_path(path: &Path) -> PathBuf {
    let mut name = path.as_os_str().to_os_string();
    name.push(".tmp");
    PathBuf::from(name)
}
