// src/pipeline/monitor.rs

//! Poll loop orchestration.
//!
//! One cycle is fetch → detect → notify → persist. Cycles never overlap and
//! nothing below this module stops the process: fetch failures skip the
//! cycle, delivery failures skip the listing, persistence failures are
//! logged and retried with the next cycle's write.
//!
//! Listings are recorded only after their alert was delivered (or when no
//! alert was due), so a crash between notify and persist can duplicate an
//! alert but never lose one.

use std::collections::HashSet;
use std::fmt;
use std::future::Future;
use std::time::Duration;

use crate::models::{Config, Snapshot};
use crate::pipeline::{ChangeDetector, ChangeKind};
use crate::services::{Notifier, SnapshotSource};
use crate::storage::StateStore;

/// Where the loop currently is.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CyclePhase {
    Idle,
    Fetching,
    Detecting,
    Notifying,
    Persisting,
    Sleeping,
}

impl fmt::Display for CyclePhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Idle => "idle",
            Self::Fetching => "fetching",
            Self::Detecting => "detecting",
            Self::Notifying => "notifying",
            Self::Persisting => "persisting",
            Self::Sleeping => "sleeping",
        };
        f.write_str(name)
    }
}

/// Summary of one cycle.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CycleReport {
    /// This cycle recorded the snapshot without alerting
    pub seeded: bool,
    pub fetch_failed: bool,
    pub fetched: usize,
    pub skipped: usize,
    pub new: usize,
    pub updated: usize,
    pub delivered: usize,
    pub failed: usize,
    pub persisted: bool,
}

impl fmt::Display for CycleReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.fetch_failed {
            return f.write_str("fetch failed, cycle skipped");
        }
        if self.seeded {
            return write!(
                f,
                "seeded {} listings silently (persisted: {})",
                self.fetched, self.persisted
            );
        }
        write!(
            f,
            "{} fetched, {} skipped, {} new, {} updated, {} delivered, {} failed (persisted: {})",
            self.fetched,
            self.skipped,
            self.new,
            self.updated,
            self.delivered,
            self.failed,
            self.persisted
        )
    }
}

/// Owns the state store and drives the poll loop.
pub struct Monitor {
    source: Box<dyn SnapshotSource>,
    notifier: Box<dyn Notifier>,
    store: StateStore,
    detector: ChangeDetector,
    interval: Duration,
    send_delay: Duration,
    seeding: bool,
    phase: CyclePhase,
}

impl Monitor {
    /// Create a monitor.
    ///
    /// Starts in seeding mode when the store is empty and
    /// `monitor.seed_silently` is set.
    pub fn new(
        source: Box<dyn SnapshotSource>,
        notifier: Box<dyn Notifier>,
        store: StateStore,
        config: &Config,
    ) -> Self {
        let seeding = config.monitor.seed_silently && store.is_empty();
        Self {
            source,
            notifier,
            store,
            detector: ChangeDetector::new(config.detection),
            interval: Duration::from_secs(config.monitor.poll_interval_secs),
            send_delay: Duration::from_millis(config.telegram.send_delay_ms),
            seeding,
            phase: CyclePhase::Idle,
        }
    }

    /// Override the poll interval.
    pub fn with_interval(mut self, interval: Duration) -> Self {
        self.interval = interval;
        self
    }

    /// Force seeding mode on or off.
    pub fn with_seeding(mut self, seeding: bool) -> Self {
        self.seeding = seeding;
        self
    }

    pub fn store(&self) -> &StateStore {
        &self.store
    }

    pub fn into_store(self) -> StateStore {
        self.store
    }

    /// Whether the next successful cycle will record without alerting.
    pub fn is_seeding(&self) -> bool {
        self.seeding
    }

    pub fn phase(&self) -> CyclePhase {
        self.phase
    }

    fn enter(&mut self, phase: CyclePhase) {
        log::debug!("[monitor] {} -> {}", self.phase, phase);
        self.phase = phase;
    }

    /// Run one full cycle.
    pub async fn run_cycle(&mut self) -> CycleReport {
        let mut report = CycleReport::default();

        self.enter(CyclePhase::Fetching);
        let snapshot = match self.source.fetch().await {
            Ok(snapshot) => snapshot,
            Err(e) => {
                log::error!("[fetch] {}. Skipping this cycle", e);
                report.fetch_failed = true;
                return report;
            }
        };
        report.fetched = snapshot.listings.len();
        report.skipped = snapshot.skipped;

        if snapshot.listings.is_empty() && !self.store.is_empty() {
            log::warn!(
                "[fetch] Upstream returned no listings while {} are known",
                self.store.len()
            );
        }
        if let Some(generated_at) = snapshot.generated_at {
            log::debug!("[fetch] Snapshot generated at {}", generated_at);
        }

        if self.seeding {
            self.seed(&snapshot, &mut report).await;
            return report;
        }

        self.enter(CyclePhase::Detecting);
        let changes = self.detector.detect(&snapshot.listings, &self.store);
        report.new = changes.iter().filter(|c| c.kind == ChangeKind::New).count();
        report.updated = changes.len() - report.new;
        if changes.is_empty() {
            log::info!("[detect] No new listings to report");
        } else {
            log::info!(
                "[detect] {} new, {} updated listings",
                report.new,
                report.updated
            );
        }

        self.enter(CyclePhase::Notifying);
        let mut undelivered = HashSet::new();
        for (index, change) in changes.iter().enumerate() {
            if index > 0 && !self.send_delay.is_zero() {
                tokio::time::sleep(self.send_delay).await;
            }
            match self.notifier.notify(change).await {
                Ok(()) => report.delivered += 1,
                Err(e) => {
                    log::error!(
                        "[notify] Listing {} ({}) not announced, retrying next cycle: {}",
                        change.listing.id,
                        change.kind,
                        e
                    );
                    report.failed += 1;
                    undelivered.insert(change.listing.id);
                }
            }
        }

        self.enter(CyclePhase::Persisting);
        for listing in &snapshot.listings {
            if !undelivered.contains(&listing.id) {
                self.store.record(listing);
            }
        }
        report.persisted = self.persist().await;

        log::info!("[monitor] Cycle complete: {}", report);
        report
    }

    /// Record a whole snapshot without alerting.
    async fn seed(&mut self, snapshot: &Snapshot, report: &mut CycleReport) {
        if snapshot.listings.is_empty() && self.store.is_empty() {
            log::warn!("[seed] Upstream returned no listings, deferring first-run seeding");
            log::info!("[monitor] Cycle complete: {}", report);
            return;
        }

        self.enter(CyclePhase::Persisting);
        log::info!(
            "[seed] First run: recording {} listings without alerts",
            snapshot.listings.len()
        );
        for listing in &snapshot.listings {
            self.store.record(listing);
        }
        self.seeding = false;
        report.seeded = true;
        report.persisted = self.persist().await;
        log::info!("[monitor] Cycle complete: {}", report);
    }

    async fn persist(&mut self) -> bool {
        match self.store.persist().await {
            Ok(()) => {
                log::debug!(
                    "[persist] {} records written to {}",
                    self.store.len(),
                    self.store.path().display()
                );
                true
            }
            Err(e) => {
                log::error!(
                    "[persist] {}. A restart before the next successful write may repeat alerts",
                    e
                );
                false
            }
        }
    }

    /// Run cycles forever, sleeping between them.
    pub async fn run_forever(&mut self) {
        log::info!(
            "Starting monitor (interval: {}s, {} known listings{})",
            self.interval.as_secs(),
            self.store.len(),
            if self.seeding { ", seeding" } else { "" }
        );

        loop {
            self.run_cycle().await;
            self.enter(CyclePhase::Sleeping);
            log::debug!("Sleeping for {} seconds", self.interval.as_secs());
            tokio::time::sleep(self.interval).await;
        }
    }

    /// Run cycles until `shutdown` completes.
    ///
    /// Shutdown may interrupt a cycle; only the last persisted state counts.
    pub async fn run_until<F>(&mut self, shutdown: F)
    where
        F: Future<Output = ()>,
    {
        tokio::select! {
            _ = self.run_forever() => {}
            _ = shutdown => {
                log::info!("Shutdown requested, stopping monitor");
            }
        }
        self.phase = CyclePhase::Idle;
    }
}
