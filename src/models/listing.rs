// src/models/listing.rs

//! Listing and document data structures.

use std::fmt;

use serde::{Deserialize, Serialize};
use url::Url;

use crate::utils::{is_absolute_http, resolve_url};

/// Filing status as published upstream.
///
/// Unknown codes are kept verbatim in [`ListingStatus::Other`].
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum ListingStatus {
    Active,
    Inactive,
    Withdrawn,
    Other(String),
}

impl ListingStatus {
    /// Upstream status code.
    pub fn code(&self) -> &str {
        match self {
            Self::Active => "A",
            Self::Inactive => "I",
            Self::Withdrawn => "W",
            Self::Other(code) => code.as_str(),
        }
    }

    /// Human-readable label used in alerts.
    pub fn label(&self) -> &str {
        match self {
            Self::Active => "Active (Application Proof)",
            Self::Inactive => "Inactive",
            Self::Withdrawn => "Withdrawn",
            Self::Other(code) if code.is_empty() => "Unknown",
            Self::Other(code) => code.as_str(),
        }
    }
}

impl From<String> for ListingStatus {
    fn from(code: String) -> Self {
        match code.as_str() {
            "A" => Self::Active,
            "I" => Self::Inactive,
            "W" => Self::Withdrawn,
            _ => Self::Other(code),
        }
    }
}

impl From<ListingStatus> for String {
    fn from(status: ListingStatus) -> Self {
        status.code().to_string()
    }
}

impl fmt::Display for ListingStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// A file reference attached to a listing.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Document {
    /// Document nature, e.g. "Application Proof (1st submission)"
    pub label: String,

    /// Label of the single-file view (usually "full document")
    pub primary_label: String,

    /// Label of the grouped view (usually "multi-file")
    pub secondary_label: String,

    /// Upstream-relative path of the full PDF
    pub relative_url_primary: String,

    /// Upstream-relative path of the multi-file HTML index
    pub relative_url_secondary: String,

    /// Document date as supplied upstream
    pub date: String,
}

impl Document {
    /// Name shown in alerts.
    pub fn display_name(&self) -> &str {
        [
            self.label.as_str(),
            self.secondary_label.as_str(),
            self.primary_label.as_str(),
        ]
        .into_iter()
        .map(str::trim)
        .find(|s| !s.is_empty())
        .unwrap_or("Document")
    }

    /// Pick the path to link to.
    ///
    /// The multi-file HTML view wins over a raw PDF when both exist.
    pub fn preferred_path(&self) -> Option<&str> {
        let candidates: Vec<&str> = [
            self.relative_url_secondary.as_str(),
            self.relative_url_primary.as_str(),
        ]
        .into_iter()
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .collect();

        candidates
            .iter()
            .find(|path| !looks_like_pdf(path))
            .or_else(|| candidates.first())
            .copied()
    }

    /// Absolute URL for this document, if any path is present.
    pub fn resolved_url(&self, base: &Url) -> Option<String> {
        let path = self.preferred_path()?;
        if is_absolute_http(path) {
            return Some(path.to_string());
        }
        Some(resolve_url(base, path))
    }

    /// Identity of the document for change detection.
    pub fn fingerprint(&self) -> String {
        format!(
            "{}|{}|{}",
            self.label.trim(),
            self.relative_url_primary.trim(),
            self.relative_url_secondary.trim()
        )
    }
}

fn looks_like_pdf(path: &str) -> bool {
    let path = path.split(['?', '#']).next().unwrap_or(path);
    path.to_ascii_lowercase().ends_with(".pdf")
}

/// One exchange filing from a snapshot.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Listing {
    /// Stable upstream identifier
    pub id: u64,

    /// Applicant name, may be in Chinese
    pub company_name: String,

    /// Listing date in upstream format
    pub listing_date: String,

    pub status: ListingStatus,

    /// Whether a post-hearing information pack was published
    pub has_phip: bool,

    /// Posting date in upstream format
    pub posting_date: String,

    /// Attached documents in upstream order
    pub documents: Vec<Document>,
}

impl Listing {
    /// Sorted, de-duplicated document fingerprints.
    ///
    /// Upstream order is irrelevant for identity.
    pub fn document_fingerprints(&self) -> Vec<String> {
        let mut prints: Vec<String> = self.documents.iter().map(Document::fingerprint).collect();
        prints.sort();
        prints.dedup();
        prints
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn base() -> Url {
        Url::parse("https://www1.hkexnews.hk/app/").unwrap()
    }

    fn doc(u1: &str, u2: &str) -> Document {
        Document {
            label: "申請版本(第一次呈交)".to_string(),
            primary_label: "全文檔案".to_string(),
            secondary_label: "多檔案".to_string(),
            relative_url_primary: u1.to_string(),
            relative_url_secondary: u2.to_string(),
            date: "02/01/2026".to_string(),
        }
    }

    #[test]
    fn test_status_codes() {
        assert_eq!(ListingStatus::from("A".to_string()), ListingStatus::Active);
        assert_eq!(ListingStatus::from("W".to_string()), ListingStatus::Withdrawn);
        assert_eq!(
            ListingStatus::from("R".to_string()),
            ListingStatus::Other("R".to_string())
        );
        assert_eq!(ListingStatus::Other("R".to_string()).code(), "R");
        assert_eq!(ListingStatus::Inactive.to_string(), "Inactive");
    }

    #[test]
    fn test_status_serde_keeps_unknown_codes() {
        let status: ListingStatus = serde_json::from_str("\"X\"").unwrap();
        assert_eq!(status, ListingStatus::Other("X".to_string()));
        assert_eq!(serde_json::to_string(&status).unwrap(), "\"X\"");
    }

    #[test]
    fn test_prefers_multi_file_html() {
        let d = doc(
            "sehk/2026/106123/documents/sehk26010200123.pdf",
            "sehk/2026/106123/sehk26010200124_c.htm",
        );
        assert_eq!(
            d.resolved_url(&base()).as_deref(),
            Some("https://www1.hkexnews.hk/app/sehk/2026/106123/sehk26010200124_c.htm")
        );
    }

    #[test]
    fn test_prefers_html_even_in_primary_slot() {
        let d = doc("sehk/2026/106123/index.htm", "sehk/2026/106123/full.PDF");
        assert_eq!(d.preferred_path(), Some("sehk/2026/106123/index.htm"));
    }

    #[test]
    fn test_falls_back_to_pdf() {
        let d = doc("sehk/2026/106123/full.pdf", "");
        assert_eq!(
            d.resolved_url(&base()).as_deref(),
            Some("https://www1.hkexnews.hk/app/sehk/2026/106123/full.pdf")
        );
    }

    #[test]
    fn test_absolute_url_kept() {
        let d = doc("", "https://example.com/a.htm");
        assert_eq!(
            d.resolved_url(&base()).as_deref(),
            Some("https://example.com/a.htm")
        );
    }

    #[test]
    fn test_no_paths() {
        assert_eq!(doc("", "  ").resolved_url(&base()), None);
    }

    #[test]
    fn test_display_name_fallbacks() {
        let mut d = doc("a.pdf", "");
        assert_eq!(d.display_name(), "申請版本(第一次呈交)");
        d.label.clear();
        assert_eq!(d.display_name(), "多檔案");
        d.secondary_label.clear();
        d.primary_label.clear();
        assert_eq!(d.display_name(), "Document");
    }

    #[test]
    fn test_fingerprints_ignore_order() {
        let a = doc("a.pdf", "a.htm");
        let b = doc("b.pdf", "b.htm");
        let listing = |documents| Listing {
            id: 1,
            company_name: "測試有限公司".to_string(),
            listing_date: "02/01/2026".to_string(),
            status: ListingStatus::Active,
            has_phip: false,
            posting_date: "02/01/2026".to_string(),
            documents,
        };

        assert_eq!(
            listing(vec![a.clone(), b.clone()]).document_fingerprints(),
            listing(vec![b, a]).document_fingerprints()
        );
    }
}
