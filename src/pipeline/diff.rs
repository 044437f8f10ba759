//! Change detection between a fresh snapshot and the state store.
//!
//! Each listing is classified as [`ChangeKind::New`] when its id was never
//! recorded, [`ChangeKind::Updated`] when a display-relevant field changed and
//! the detection policy announces that field, or omitted otherwise. Output
//! keeps snapshot order, which is the order alerts go out in.

use std::collections::HashMap;
use std::fmt;

use crate::models::{DetectionConfig, Listing};
use crate::storage::{FieldChanges, StateStore};

/// Why a listing is announced.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChangeKind {
    New,
    Updated,
}

impl fmt::Display for ChangeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::New => f.write_str("new"),
            Self::Updated => f.write_str("updated"),
        }
    }
}

/// A listing selected for announcement.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Change {
    pub listing: Listing,
    pub kind: ChangeKind,
    /// Which fields triggered an update (all false for new listings)
    pub fields: FieldChanges,
}

/// Calculator for snapshot deltas.
#[derive(Debug, Clone, Copy, Default)]
pub struct ChangeDetector {
    policy: DetectionConfig,
}

impl ChangeDetector {
    /// Create a detector with the given update policy.
    pub fn new(policy: DetectionConfig) -> Self {
        Self { policy }
    }

    /// Create a detector that only reports unseen ids.
    pub fn new_only() -> Self {
        Self::new(DetectionConfig::new_only())
    }

    /// Classify a snapshot against the store.
    ///
    /// Does not mutate the store, so repeated calls agree.
    pub fn detect(&self, snapshot: &[Listing], store: &StateStore) -> Vec<Change> {
        // Duplicate ids: the last occurrence wins.
        let last_index: HashMap<u64, usize> = snapshot
            .iter()
            .enumerate()
            .map(|(index, listing)| (listing.id, index))
            .collect();

        snapshot
            .iter()
            .enumerate()
            .filter(|(index, listing)| last_index.get(&listing.id) == Some(index))
            .filter_map(|(_, listing)| self.classify(listing, store))
            .collect()
    }

    fn classify(&self, listing: &Listing, store: &StateStore) -> Option<Change> {
        if !store.contains(listing.id) {
            return Some(Change {
                listing: listing.clone(),
                kind: ChangeKind::New,
                fields: FieldChanges::default(),
            });
        }

        let changed = store.changed_fields(listing);
        let announced = FieldChanges {
            status: changed.status && self.policy.notify_on_status_change,
            documents: changed.documents && self.policy.notify_on_document_change,
        };

        announced.any().then(|| Change {
            listing: listing.clone(),
            kind: ChangeKind::Updated,
            fields: announced,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Document, ListingStatus};

    fn make_listing(id: u64, status: ListingStatus) -> Listing {
        Listing {
            id,
            company_name: format!("Company {id}"),
            listing_date: "02/02/2026".into(),
            status,
            has_phip: false,
            posting_date: "02/02/2026".into(),
            documents: vec![Document {
                label: "Application Proof".into(),
                relative_url_primary: format!("sehk/2026/{id}/full.pdf"),
                ..Document::default()
            }],
        }
    }

    fn ids(changes: &[Change]) -> Vec<u64> {
        changes.iter().map(|c| c.listing.id).collect()
    }

    fn store_with(listings: &[Listing]) -> StateStore {
        let mut store = StateStore::empty("unused.json");
        for listing in listings {
            store.record(listing);
        }
        store
    }

    #[test]
    fn test_empty_snapshot() {
        let store = store_with(&[make_listing(1, ListingStatus::Active)]);
        assert!(ChangeDetector::default().detect(&[], &store).is_empty());
    }

    #[test]
    fn test_all_new_on_empty_store() {
        let snapshot: Vec<_> = [3, 1, 2]
            .into_iter()
            .map(|id| make_listing(id, ListingStatus::Active))
            .collect();
        let store = StateStore::empty("unused.json");

        let changes = ChangeDetector::default().detect(&snapshot, &store);
        assert_eq!(ids(&changes), vec![3, 1, 2]);
        assert!(changes.iter().all(|c| c.kind == ChangeKind::New));
    }

    #[test]
    fn test_no_changes() {
        let snapshot = vec![
            make_listing(1, ListingStatus::Active),
            make_listing(2, ListingStatus::Inactive),
        ];
        let store = store_with(&snapshot);

        assert!(ChangeDetector::default().detect(&snapshot, &store).is_empty());
    }

    #[test]
    fn test_detection_is_idempotent() {
        let known = make_listing(1, ListingStatus::Active);
        let store = store_with(&[known]);
        let snapshot = vec![
            make_listing(1, ListingStatus::Withdrawn),
            make_listing(2, ListingStatus::Active),
        ];

        let detector = ChangeDetector::default();
        let first = detector.detect(&snapshot, &store);
        let second = detector.detect(&snapshot, &store);
        assert_eq!(first, second);
        assert_eq!(first.len(), 2);
    }

    #[test]
    fn test_status_change_is_update() {
        let store = store_with(&[make_listing(1, ListingStatus::Active)]);
        let snapshot = vec![make_listing(1, ListingStatus::Withdrawn)];

        let changes = ChangeDetector::default().detect(&snapshot, &store);
        assert_eq!(changes.len(), 1);
        assert_eq!(changes[0].kind, ChangeKind::Updated);
        assert!(changes[0].fields.status);
        assert!(!changes[0].fields.documents);
    }

    #[test]
    fn test_document_change_is_update() {
        let store = store_with(&[make_listing(1, ListingStatus::Active)]);
        let mut changed = make_listing(1, ListingStatus::Active);
        changed.documents.push(Document {
            label: "PHIP".into(),
            relative_url_secondary: "sehk/2026/1/phip.htm".into(),
            ..Document::default()
        });

        let changes = ChangeDetector::default().detect(&[changed], &store);
        assert_eq!(changes.len(), 1);
        assert!(changes[0].fields.documents);
    }

    #[test]
    fn test_policy_suppresses_updates() {
        let store = store_with(&[make_listing(1, ListingStatus::Active)]);
        let snapshot = vec![
            make_listing(1, ListingStatus::Withdrawn),
            make_listing(2, ListingStatus::Active),
        ];

        let changes = ChangeDetector::new_only().detect(&snapshot, &store);
        assert_eq!(ids(&changes), vec![2]);
        assert_eq!(changes[0].kind, ChangeKind::New);

        let status_only = ChangeDetector::new(DetectionConfig {
            notify_on_status_change: true,
            notify_on_document_change: false,
        });
        assert_eq!(status_only.detect(&snapshot, &store).len(), 2);
    }

    #[test]
    fn test_untracked_field_drift_is_silent() {
        let store = store_with(&[make_listing(1, ListingStatus::Active)]);
        let mut drifted = make_listing(1, ListingStatus::Active);
        drifted.posting_date = "09/09/2026".into();
        drifted.has_phip = true;

        assert!(ChangeDetector::default().detect(&[drifted], &store).is_empty());
    }

    #[test]
    fn test_duplicate_ids_last_occurrence_wins() {
        let store = store_with(&[make_listing(1, ListingStatus::Active)]);
        let snapshot = vec![
            make_listing(1, ListingStatus::Withdrawn),
            make_listing(2, ListingStatus::Active),
            make_listing(1, ListingStatus::Active),
        ];

        let changes = ChangeDetector::default().detect(&snapshot, &store);
        assert_eq!(ids(&changes), vec![2]);
    }
}
