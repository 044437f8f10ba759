// src/models/feed.rs

//! Upstream feed schema.
//!
//! The feed uses terse keys (`a`, `d`, `s`, `ls`, `u1`, ...). They are mapped
//! here into [`Listing`] and [`Document`] so the rest of the crate never sees
//! raw keys. Records are parsed one at a time: a bad record is skipped, the
//! rest of the snapshot survives.

use chrono::{DateTime, TimeZone, Utc};
use serde::Deserialize;
use serde_json::Value;

use crate::error::{AppError, Result};
use crate::models::{Document, Listing, ListingStatus};

/// Top-level feed object.
#[derive(Debug, Deserialize)]
struct FeedEnvelope {
    /// Generation time in epoch milliseconds
    #[serde(rename = "genDate", default)]
    generated_at: Option<Value>,

    /// Upstream "last updated" text
    #[serde(rename = "uDate", default)]
    updated: Option<String>,

    /// Listing records, parsed individually
    app: Vec<Value>,
}

/// A listing id that may arrive as a number or a numeric string.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum RawId {
    Number(u64),
    Text(String),
}

#[derive(Debug, Deserialize)]
struct RawListing {
    id: RawId,
    #[serde(rename = "a")]
    company_name: String,
    #[serde(rename = "d", default)]
    listing_date: Option<String>,
    #[serde(rename = "s", default)]
    status: Option<String>,
    #[serde(rename = "hasPhip", default)]
    has_phip: Option<bool>,
    #[serde(rename = "postingDate", default)]
    posting_date: Option<String>,
    #[serde(rename = "ls", default)]
    documents: Option<Vec<RawDocument>>,
}

#[derive(Debug, Deserialize)]
struct RawDocument {
    #[serde(rename = "d", default)]
    date: Option<String>,
    #[serde(rename = "nF", default)]
    label: Option<String>,
    #[serde(rename = "nS1", default)]
    primary_label: Option<String>,
    #[serde(rename = "nS2", default)]
    secondary_label: Option<String>,
    #[serde(rename = "u1", default)]
    relative_url_primary: Option<String>,
    #[serde(rename = "u2", default)]
    relative_url_secondary: Option<String>,
}

impl From<RawDocument> for Document {
    fn from(raw: RawDocument) -> Self {
        Self {
            label: raw.label.unwrap_or_default(),
            primary_label: raw.primary_label.unwrap_or_default(),
            secondary_label: raw.secondary_label.unwrap_or_default(),
            relative_url_primary: raw.relative_url_primary.unwrap_or_default(),
            relative_url_secondary: raw.relative_url_secondary.unwrap_or_default(),
            date: raw.date.unwrap_or_default(),
        }
    }
}

impl TryFrom<RawListing> for Listing {
    type Error = String;

    fn try_from(raw: RawListing) -> std::result::Result<Self, Self::Error> {
        let id = match raw.id {
            RawId::Number(id) => id,
            RawId::Text(text) => text
                .trim()
                .parse()
                .map_err(|_| format!("id {text:?} is not an integer"))?,
        };

        Ok(Self {
            id,
            company_name: raw.company_name.trim().to_string(),
            listing_date: raw.listing_date.unwrap_or_default(),
            status: ListingStatus::from(raw.status.unwrap_or_default()),
            has_phip: raw.has_phip.unwrap_or(false),
            posting_date: raw.posting_date.unwrap_or_default(),
            documents: raw
                .documents
                .unwrap_or_default()
                .into_iter()
                .map(Document::from)
                .collect(),
        })
    }
}

/// One parsed fetch result.
#[derive(Debug, Clone, Default)]
pub struct Snapshot {
    /// Upstream generation time, when present
    pub generated_at: Option<DateTime<Utc>>,

    /// Upstream "last updated" text, when present
    pub updated: Option<String>,

    /// Well-formed listings in upstream order
    pub listings: Vec<Listing>,

    /// Number of records skipped as malformed
    pub skipped: usize,
}

impl Snapshot {
    /// Build a snapshot directly from listings.
    pub fn from_listings(listings: Vec<Listing>) -> Self {
        Self {
            listings,
            ..Self::default()
        }
    }

    /// Parse a feed body.
    ///
    /// Fails only when the envelope itself is unusable.
    pub fn parse(body: &str) -> Result<Self> {
        let envelope: FeedEnvelope = serde_json::from_str(body)
            .map_err(|e| AppError::fetch(format!("malformed feed body: {e}")))?;

        let mut snapshot = Snapshot {
            generated_at: envelope.generated_at.as_ref().and_then(epoch_millis),
            updated: envelope.updated,
            ..Snapshot::default()
        };

        for (index, value) in envelope.app.into_iter().enumerate() {
            match parse_record(index, value) {
                Ok(listing) => snapshot.listings.push(listing),
                Err(e) => {
                    snapshot.skipped += 1;
                    log::warn!("[parse] Skipping malformed record: {}", e);
                }
            }
        }

        Ok(snapshot)
    }
}

fn parse_record(index: usize, value: Value) -> Result<Listing> {
    let raw: RawListing = serde_json::from_value(value).map_err(|e| AppError::parse(index, e))?;
    Listing::try_from(raw).map_err(|e| AppError::parse(index, e))
}

fn epoch_millis(value: &Value) -> Option<DateTime<Utc>> {
    let millis = match value {
        Value::Number(n) => n.as_i64()?,
        Value::String(s) => s.trim().parse().ok()?,
        _ => return None,
    };
    Utc.timestamp_millis_opt(millis).single()
}
