//! Catalog Metrics Collection
//!
//! Operation counters for monitoring catalog health.

use std::sync::atomic::{AtomicU64, Ordering};

/// Catalog metrics collector
#[derive(Debug, Default)]
pub struct CatalogMetrics {
    // Mutations
    adds: AtomicU64,
    updates: AtomicU64,
    deletes: AtomicU64,
    expired: AtomicU64,
    rejected: AtomicU64,

    // Reads
    lookups: AtomicU64,
    misses: AtomicU64,
    listings: AtomicU64,
    filter_queries: AtomicU64,

    // Invariant violations
    consistency_errors: AtomicU64,
}

impl CatalogMetrics {
    /// Create a new metrics collector
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record_add(&self) {
        self.adds.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_update(&self) {
        self.updates.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_delete(&self) {
        self.deletes.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_expired(&self, count: u64) {
        self.expired.fetch_add(count, Ordering::Relaxed);
    }

    /// A write refused because of invalid input
    pub fn record_rejected(&self) {
        self.rejected.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_lookup(&self, found: bool) {
        self.lookups.fetch_add(1, Ordering::Relaxed);
        if !found {
            self.misses.fetch_add(1, Ordering::Relaxed);
        }
    }

    pub fn record_listing(&self) {
        self.listings.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_filter_query(&self) {
        self.filter_queries.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_consistency_error(&self) {
        self.consistency_errors.fetch_add(1, Ordering::Relaxed);
    }

    pub fn expired(&self) -> u64 {
        self.expired.load(Ordering::Relaxed)
    }

    pub fn lookups(&self) -> u64 {
        self.lookups.load(Ordering::Relaxed)
    }

    pub fn misses(&self) -> u64 {
        self.misses.load(Ordering::Relaxed)
    }

    pub fn hit_ratio(&self) -> f64 {
        let lookups = self.lookups() as f64;
        if lookups == 0.0 {
            0.0
        } else {
            (lookups - self.misses() as f64) / lookups
        }
    }

    /// Take a point-in-time copy of every counter
    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            adds: self.adds.load(Ordering::Relaxed),
            updates: self.updates.load(Ordering::Relaxed),
            deletes: self.deletes.load(Ordering::Relaxed),
            expired: self.expired.load(Ordering::Relaxed),
            rejected: self.rejected.load(Ordering::Relaxed),
            lookups: self.lookups.load(Ordering::Relaxed),
            misses: self.misses.load(Ordering::Relaxed),
            listings: self.listings.load(Ordering::Relaxed),
            filter_queries: self.filter_queries.load(Ordering::Relaxed),
            consistency_errors: self.consistency_errors.load(Ordering::Relaxed),
        }
    }

    /// Reset all counters
    pub fn reset(&self) {
        for counter in [
            &self.adds,
            &self.updates,
            &self.deletes,
            &self.expired,
            &self.rejected,
            &self.lookups,
            &self.misses,
            &self.listings,
            &self.filter_queries,
            &self.consistency_errors,
        ] {
            counter.store(0, Ordering::Relaxed);
        }
    }
}

/// Point-in-time copy of [`CatalogMetrics`]
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, serde::Serialize)]
pub struct MetricsSnapshot {
    pub adds: u64,
    pub updates: u64,
    pub deletes: u64,
    pub expired: u64,
    pub rejected: u64,
    pub lookups: u64,
    pub misses: u64,
    pub listings: u64,
    pub filter_queries: u64,
    pub consistency_errors: u64,
}

impl MetricsSnapshot {
    /// `(operation, count)` pairs, for exporters keyed by an `op` label
    pub fn operations(&self) -> [(&'static str, u64); 10] {
        [
            ("add", self.adds),
            ("update", self.updates),
            ("delete", self.deletes),
            ("expire", self.expired),
            ("reject", self.rejected),
            ("lookup", self.lookups),
            ("miss", self.misses),
            ("list", self.listings),
            ("filter", self.filter_queries),
            ("consistency_error", self.consistency_errors),
        ]
    }
}
